use std::io;

/// Errors produced by bitmap, bloom filter and scaling bloom filter
/// operations.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A constructor was called with a parameter outside its valid domain
    /// (non-positive size, `k < 1`, a probability outside `(0, 1)`, a
    /// bitmap too small to hold the bloom filter header, etc).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A file, mmap or syscall operation failed.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// A bit or byte-range operation was attempted outside the bounds of
    /// the bitmap.
    #[error("index {index} out of range for bitmap of length {len}")]
    IndexOutOfRange { index: usize, len: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
