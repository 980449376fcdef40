pub mod othello;
