use std::error;
use std::fmt;
use std::io;

/// Errors that can be returned from disk image operations.  These are
/// generally converted into `io::Error`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiskError {
    /// The image size matches neither the single- nor double-sided layout
    InvalidImageSize(usize),
    /// Track index outside of the image
    InvalidLocation(usize),
    /// File not found
    NotFound,
    /// No terminator slot is left in the directory
    DirectoryFull,
    /// A file must occupy at least one track
    EmptyChain,
    /// Chain loop detected
    ChainLoop,
}

impl error::Error for DiskError {
    /// Provide terse descriptions of the errors.
    fn description(&self) -> &str {
        self.message()
    }
}

impl fmt::Display for DiskError {
    /// Provide human-readable descriptions of the errors
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            DiskError::InvalidImageSize(size) => {
                write!(f, "{}: {} bytes", self.message(), size)
            }
            DiskError::InvalidLocation(track) => write!(f, "{}: {}", self.message(), track),
            _ => write!(f, "{}", self.message()),
        }
    }
}

impl From<DiskError> for io::Error {
    fn from(error: DiskError) -> io::Error {
        use self::DiskError::*;
        use std::io::ErrorKind::*;
        match error {
            InvalidImageSize(_) => io::Error::new(InvalidData, error),
            InvalidLocation(_) => io::Error::new(InvalidInput, error),
            self::DiskError::NotFound => io::Error::new(io::ErrorKind::NotFound, error),
            DirectoryFull => io::Error::new(Other, error),
            EmptyChain => io::Error::new(InvalidInput, error),
            ChainLoop => io::Error::new(InvalidData, error),
        }
    }
}

impl DiskError {
    /// If the provided `io::Error` contains a `DiskError`, return the
    /// underlying `DiskError`.  If not, return None.
    pub fn from_io_error(error: &io::Error) -> Option<DiskError> {
        error
            .get_ref()
            .and_then(|e| e.downcast_ref::<DiskError>())
            .cloned()
    }

    /// This is sometimes useful instead of .into() when the compiler doesn't
    /// have enough information to perform type inference.
    pub fn to_io_error(&self) -> io::Error {
        self.clone().into()
    }

    /// Provide terse descriptions of the errors.
    fn message(&self) -> &str {
        use self::DiskError::*;
        match *self {
            InvalidImageSize(_) => "invalid image size",
            InvalidLocation(_) => "track does not exist",
            NotFound => "file not found",
            DirectoryFull => "directory is full",
            EmptyChain => "a file needs at least one track",
            ChainLoop => "chain loop detected",
        }
    }
}

impl PartialEq<io::Error> for DiskError {
    fn eq(&self, other: &io::Error) -> bool {
        match DiskError::from_io_error(other) {
            Some(ref e) if e == self => true,
            _ => false,
        }
    }
}

impl PartialEq<DiskError> for io::Error {
    fn eq(&self, other: &DiskError) -> bool {
        match DiskError::from_io_error(self) {
            Some(ref e) if e == other => true,
            _ => false,
        }
    }
}
