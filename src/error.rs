//! Crate-wide error and result types.

use std::fmt;
use std::io;

/// Result alias used throughout sarchive.
pub type Result<T> = std::result::Result<T, Error>;

/// The error taxonomy this crate can produce (see `spec.md` §7).
///
/// Error messages are kept intentionally terse; callers that need richer
/// context should wrap `Error` in their own type.
#[derive(Debug)]
pub enum Error {
    /// `openArchive` was handed a stream whose magic does not match `SARC`.
    Unsupported,
    /// SFAT/SFNT data is structurally inconsistent, or a rebuild found two
    /// entries with the same filename hash (see `spec.md` §8, "Hash
    /// monotonicity").
    Corrupt(&'static str),
    /// A heap allocation or [`crate::vmem::Region`] reservation failed.
    OutOfMemory,
    /// The requested operation is not permitted: `remove` on any archive,
    /// a write through a clean (non-`Owned`) entry, or similar API misuse.
    ReadOnly(&'static str),
    /// `openRead`/`openWrite` targeted a directory entry.
    NotAFile,
    /// A read-mode seek went past the entry's current size.
    PastEof,
    /// The backing [`crate::io::IoStream`] failed.
    Io(io::Error),
    /// The Zstandard decoder reported an error.
    Zstd,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Unsupported => write!(f, "not a SARC archive"),
            Error::Corrupt(s) => write!(f, "corrupt archive: {s}"),
            Error::OutOfMemory => write!(f, "out of memory"),
            Error::ReadOnly(s) => write!(f, "read-only: {s}"),
            Error::NotAFile => write!(f, "not a file"),
            Error::PastEof => write!(f, "seek past end of file"),
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::Zstd => write!(f, "zstd decompression failed"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        if let Error::Io(e) = self {
            Some(e)
        } else {
            None
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Io(e) => e,
            Error::PastEof => io::Error::new(io::ErrorKind::UnexpectedEof, e.to_string()),
            other => io::Error::other(other.to_string()),
        }
    }
}
