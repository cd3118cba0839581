use core::fmt::{Debug, Display, Formatter, Result};

/// Filesystem content that does not hold up
#[derive(Copy, Clone, Debug, displaydoc::Display, thiserror::Error, PartialEq, Eq)]
pub enum DataError {
    /// Not ExFAT filesystem
    NotExFAT,
    /// Unsupported sector or cluster size
    Geometry,
    /// Broken FAT chain
    FATChain,
    /// Corrupted metadata
    Metadata,
    /// Upcase table missing
    UpcaseTableMissing,
}

pub enum Error<E> {
    IO(E),
    Data(DataError),
    TexFATNotSupported,
    NotFound,
}

impl<E> From<DataError> for Error<E> {
    fn from(error: DataError) -> Self {
        Self::Data(error)
    }
}

impl<E: Display> Display for Error<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            Self::IO(e) => write!(f, "IO({})", e),
            Self::Data(e) => write!(f, "{}", e),
            Self::TexFATNotSupported => write!(f, "TexFAT not supported"),
            Self::NotFound => write!(f, "No such file or directory"),
        }
    }
}

impl<E: Debug> Debug for Error<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            Self::IO(e) => f.debug_tuple("IO").field(e).finish(),
            Self::Data(e) => f.debug_tuple("Data").field(e).finish(),
            Self::TexFATNotSupported => write!(f, "TexFATNotSupported"),
            Self::NotFound => write!(f, "NotFound"),
        }
    }
}

impl<E: Debug + Display> std::error::Error for Error<E> {}
