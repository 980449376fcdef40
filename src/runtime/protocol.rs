//! The line based protocol between the host and a python worker process.
//!
//! Host to worker:
//! * `init <my_color> <opp_color>`
//! * `go <size> <cell>*`, all cells in row-major order as wire values
//! * `quit`
//!
//! Worker to host:
//! * `loaded <class>`, `noclass`, `ambiguous <class>,<class>,...` or `loaderror <message>` once after startup
//! * `ready` or `error <message>` after `init`
//! * `move <row> <col>`, `invalid <repr>` or `error <message>` after `go`
use std::fmt::{Display, Formatter};

use itertools::Itertools;

use crate::board::Color;
use crate::games::othello::OthelloBoard;

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Reply<'a> {
    Loaded(&'a str),
    NoClass,
    Ambiguous(Vec<&'a str>),
    LoadError(&'a str),
    Ready,
    Move(i64, i64),
    Invalid(&'a str),
    Error(&'a str),
}

#[derive(Debug, Copy, Clone)]
pub enum Request<'a> {
    Init { my_color: Color, opp_color: Color },
    Go(&'a OthelloBoard),
    Quit,
}

impl<'a> Reply<'a> {
    pub fn parse(input: &'a str) -> Result<Reply<'a>, nom::Err<nom::error::Error<&'a str>>> {
        parse::reply()(input).map(|(_, reply)| reply)
    }
}

impl Display for Request<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Request::Init { my_color, opp_color } => write!(f, "init {} {}", my_color.to_wire(), opp_color.to_wire()),
            Request::Go(board) => write!(
                f,
                "go {} {}",
                board.size(),
                board.to_wire_cells().iter().join(" ")
            ),
            Request::Quit => write!(f, "quit"),
        }
    }
}

mod parse {
    use nom::branch::alt;
    use nom::bytes::complete::{tag, take_while1};
    use nom::character::complete::{char, i64 as int};
    use nom::combinator::{eof, map, rest, value};
    use nom::multi::separated_list1;
    use nom::sequence::{preceded, separated_pair, terminated};
    use nom::IResult;

    use super::*;

    pub fn reply<'a>() -> impl FnMut(&'a str) -> IResult<&'a str, Reply<'a>> {
        let name = || take_while1(|c: char| c != ',' && !c.is_whitespace());

        let loaded = map(preceded(tag("loaded "), name()), Reply::Loaded);
        let ambiguous = map(
            preceded(tag("ambiguous "), separated_list1(char(','), name())),
            Reply::Ambiguous,
        );
        let load_error = map(preceded(tag("loaderror "), rest), Reply::LoadError);

        let mv = map(
            preceded(tag("move "), separated_pair(int, char(' '), int)),
            |(row, col)| Reply::Move(row, col),
        );
        let invalid = map(preceded(tag("invalid "), rest), Reply::Invalid);
        let error = map(preceded(tag("error "), rest), Reply::Error);

        let main = alt((
            value(Reply::NoClass, tag("noclass")),
            value(Reply::Ready, tag("ready")),
            loaded,
            ambiguous,
            load_error,
            mv,
            invalid,
            error,
        ));

        terminated(main, eof)
    }
}
