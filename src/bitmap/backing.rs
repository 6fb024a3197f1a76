use std::fs::File;
use std::path::Path;
#[cfg(feature = "mmap")]
use std::path::PathBuf;

use crate::error::Result;

/// How a file-backed [`Bitmap`](crate::Bitmap) shares its mapping with the
/// underlying file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sharing {
    /// Writes are visible to other mappings of the same file and are
    /// written back by the kernel (and by explicit `flush`).
    Shared,
    /// Writes are copy-on-write and never reach the file.
    Private,
}

/// The storage backing a [`Bitmap`](crate::Bitmap): either an anonymous,
/// heap-allocated region, or a memory-mapped file.
pub(crate) enum Backing {
    Anonymous(Box<[u8]>),
    #[cfg(feature = "mmap")]
    File {
        path: PathBuf,
        file: File,
        mmap: memmap2::MmapMut,
    },
}

impl Backing {
    pub(crate) fn anonymous(size_bytes: usize) -> Self {
        Backing::Anonymous(vec![0u8; size_bytes].into_boxed_slice())
    }

    #[cfg(feature = "mmap")]
    pub(crate) fn file(path: &Path, size_bytes: usize, sharing: Sharing) -> Result<Self> {
        let mut file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;

        zero_extend(&mut file, size_bytes as u64)?;

        let mmap = match sharing {
            Sharing::Shared => unsafe {
                memmap2::MmapOptions::new().len(size_bytes).map_mut(&file)?
            },
            Sharing::Private => unsafe {
                memmap2::MmapOptions::new().len(size_bytes).map_copy(&file)?
            },
        };

        Ok(Backing::File {
            path: path.to_path_buf(),
            file,
            mmap,
        })
    }

    #[cfg(not(feature = "mmap"))]
    pub(crate) fn file(_path: &Path, _size_bytes: usize, _sharing: Sharing) -> Result<Self> {
        Err(crate::error::Error::InvalidArgument(
            "file-backed bitmaps require the `mmap` feature".to_string(),
        ))
    }

    pub(crate) fn as_slice(&self) -> &[u8] {
        match self {
            Backing::Anonymous(b) => b,
            #[cfg(feature = "mmap")]
            Backing::File { mmap, .. } => mmap,
        }
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [u8] {
        match self {
            Backing::Anonymous(b) => b,
            #[cfg(feature = "mmap")]
            Backing::File { mmap, .. } => mmap,
        }
    }

    /// `msync` the mapping (if file-backed) followed by `fsync` of the file
    /// descriptor. Anonymous maps are a no-op.
    pub(crate) fn flush(&self) -> Result<()> {
        match self {
            Backing::Anonymous(_) => Ok(()),
            #[cfg(feature = "mmap")]
            Backing::File { file, mmap, path } => {
                log::trace!("flushing bitmap {}", path.display());
                mmap.flush()?;
                file.sync_all()?;
                Ok(())
            }
        }
    }
}

/// Grow `file` to at least `size_bytes` by appending zeros in bounded
/// chunks, re-checking the file length between each append.
///
/// Mapping a short file and writing past EOF is undefined on some
/// platforms; zero-extending up front keeps mmap behaviour deterministic.
pub(crate) fn zero_extend(file: &mut File, size_bytes: u64) -> Result<()> {
    use std::io::{Seek, SeekFrom, Write};

    const MAX_CHUNK: u64 = 100_000;

    loop {
        let current = file.metadata()?.len();
        if current >= size_bytes {
            break;
        }

        let diff = size_bytes - current;
        let chunk_len = diff.min(MAX_CHUNK) as usize;
        file.seek(SeekFrom::End(0))?;
        file.write_all(&vec![0u8; chunk_len])?;
    }

    Ok(())
}
