pub use board::*;
pub use io::*;
pub use rules::*;

mod board;
mod io;
mod rules;
pub mod stable;
