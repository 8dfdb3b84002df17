use std::error::Error;
use std::fmt;
use std::io;

use path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub file: String,
    pub line: usize,
}

impl Line {
    pub fn new<S: Into<String>>(file: S, line: usize) -> Self {
        Line {
            file: file.into(),
            line: line,
        }
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

#[derive(Debug)]
pub enum ParseError {
    InvalidSection(Path, Path),
    UnknownPartial(String, Line),
    IllegalCodeInExtend(Line),
    UnusedOverride(Vec<(String, Line)>),
    Syntax(String, String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ParseError::InvalidSection(ref open, ref close) => {
                write!(f, "Section open and close must match: {}, {}", open, close)
            }
            ParseError::UnknownPartial(ref name, ref line) => {
                write!(f, "Unknown partial '{}' at {}", name, line)
            }
            ParseError::IllegalCodeInExtend(ref line) => {
                write!(f, "Only {{$name}} overrides are allowed inside {{<name}} at {}", line)
            }
            ParseError::UnusedOverride(ref unused) => {
                let list = unused
                    .iter()
                    .map(|(name, line)| format!("'{}' at {}", name, line))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "Overrides match no region in the parent: {}", list)
            }
            ParseError::Syntax(ref file, ref message) => {
                write!(f, "Error parsing {}\n{}", file, message)
            }
        }
    }
}

impl Error for ParseError {}

#[derive(Debug)]
pub enum RenderError {
    Io(io::Error),
    NotAFunction(String, Line),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            RenderError::Io(ref err) => write!(f, "write failed: {}", err),
            RenderError::NotAFunction(ref name, ref line) => {
                write!(f, "'{}' is not a function at {}", name, line)
            }
        }
    }
}

impl Error for RenderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match *self {
            RenderError::Io(ref err) => Some(err),
            RenderError::NotAFunction(..) => None,
        }
    }
}

impl From<io::Error> for RenderError {
    fn from(err: io::Error) -> Self {
        RenderError::Io(err)
    }
}
