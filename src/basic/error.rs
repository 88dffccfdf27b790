use std::error;
use std::fmt;
use std::io;

/// Errors that abort detokenizing a program.  Damage that still leaves a
/// usable listing is reported inline with marker text instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BasicError {
    /// A byte that neither encodes a literal nor maps to a keyword.
    UnknownToken { token: u8, line_number: u16 },
}

impl error::Error for BasicError {}

impl fmt::Display for BasicError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            BasicError::UnknownToken { token, line_number } => write!(
                f,
                "unknown token {} on line number {}",
                token, line_number
            ),
        }
    }
}

impl From<BasicError> for io::Error {
    fn from(error: BasicError) -> io::Error {
        io::Error::new(io::ErrorKind::InvalidData, error)
    }
}
