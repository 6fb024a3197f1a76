//! [`BloomFilter`]: a partitioned, k-hash classic bloom filter over a
//! [`Bitmap`], with a persistent trailing header storing `count` and `k`.

use std::path::Path;

use crate::bitmap::{Bitmap, Sharing};
use crate::error::{Error, Result};
use crate::hash::compute_hashes;
use crate::params;

/// Bytes reserved at the tail of the bitmap for the persistent header:
/// an 8 byte little-endian `count` followed by a 4 byte little-endian `k`.
pub const HEADER_BYTES: usize = 12;

/// A classic, partitioned bloom filter backed by a [`Bitmap`].
///
/// Each of the `k` hash functions is confined to its own contiguous,
/// non-overlapping partition of the bitmap's bit storage, which is what
/// lets [`ScalingBloomFilter`](crate::ScalingBloomFilter) reason about the
/// aggregate false-positive rate across layers.
pub struct BloomFilter {
    bitmap: Bitmap,
    k: u32,
    bitmap_size_bits: usize,
    offset: usize,
    count: u64,
    hash_scratch: Vec<u64>,
}

impl BloomFilter {
    /// Construct a filter over `bitmap` using `k` hash functions.
    ///
    /// If the bitmap's header is freshly zeroed (stored `k == 0`), `k` is
    /// installed and persisted. Otherwise the bitmap's stored `k` wins and
    /// the caller's argument is ignored, preserving compatibility across
    /// reopenings of the same file.
    pub fn new(bitmap: Bitmap, k: u32) -> Result<Self> {
        if bitmap.size_bytes() <= HEADER_BYTES {
            return Err(Error::InvalidArgument(format!(
                "bitmap of {} bytes is too small to hold the {} byte header",
                bitmap.size_bytes(),
                HEADER_BYTES
            )));
        }
        if k < 1 {
            return Err(Error::InvalidArgument("k must be >= 1".to_string()));
        }

        let bitmap_size_bits = bitmap.len_bits() - HEADER_BYTES * 8;
        let header_start = bitmap_size_bits / 8;

        let header = bitmap.get_slice(header_start, header_start + HEADER_BYTES)?;
        let stored_count = u64::from_le_bytes(header[0..8].try_into().unwrap());
        let stored_k = u32::from_le_bytes(header[8..12].try_into().unwrap());

        let (k, count, needs_init) = if stored_k == 0 {
            (k, 0u64, true)
        } else {
            (stored_k, stored_count, false)
        };

        let offset = bitmap_size_bits / k as usize;
        if offset == 0 {
            return Err(Error::InvalidArgument(format!(
                "k={k} is too large for a bitmap with {bitmap_size_bits} usable bits"
            )));
        }

        let mut filter = Self {
            bitmap,
            k,
            bitmap_size_bits,
            offset,
            count,
            hash_scratch: Vec::with_capacity(k as usize),
        };

        if needs_init {
            log::debug!("bloom filter: initialising fresh header with k={k}");
            filter.write_header()?;
            filter.bitmap.flush()?;
        }

        Ok(filter)
    }

    /// Convenience constructor: compute the ideal `(bytes, k)` for
    /// `expected_items` at `false_positive_rate` via
    /// [`params_for_capacity`](BloomFilter::params_for_capacity), allocate a
    /// matching [`Bitmap`] (file-backed if `path` is given), and build the
    /// filter over it.
    pub fn for_capacity(
        expected_items: usize,
        false_positive_rate: f64,
        path: Option<&Path>,
    ) -> Result<Self> {
        let (bytes, k) = Self::params_for_capacity(expected_items, false_positive_rate);
        let bitmap = Bitmap::new(bytes, path, None)?;
        Self::new(bitmap, k)
    }

    /// The number of hash functions / partitions.
    pub fn k(&self) -> u32 {
        self.k
    }

    /// The number of successful `add` calls recorded so far.
    ///
    /// This counts insertion *attempts* deemed novel, not true cardinality:
    /// with `check_first = false` and duplicate keys, `count` may exceed
    /// the number of distinct keys ever inserted.
    pub fn len(&self) -> usize {
        self.count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Insert `key`. If `check_first` is true and `key` is already present,
    /// returns `false` without modifying state; otherwise sets the
    /// partitioned bits, increments `count`, and returns `true`.
    pub fn add(&mut self, key: &[u8], check_first: bool) -> bool {
        if check_first && self.contains(key) {
            return false;
        }

        compute_hashes(key, self.k, &mut self.hash_scratch);
        for j in 0..self.k as usize {
            let idx = self.bit_index(j, self.hash_scratch[j]);
            self.bitmap.set(idx, 1);
        }
        self.count += 1;
        true
    }

    /// Return `true` iff every partitioned bit for `key` is set.
    pub fn contains(&mut self, key: &[u8]) -> bool {
        compute_hashes(key, self.k, &mut self.hash_scratch);
        (0..self.k as usize).all(|j| {
            let idx = self.bit_index(j, self.hash_scratch[j]);
            self.bitmap.get(idx) != 0
        })
    }

    #[inline(always)]
    fn bit_index(&self, slot: usize, hash: u64) -> usize {
        slot * self.offset + (hash as usize % self.offset)
    }

    fn write_header(&mut self) -> Result<()> {
        let header_start = self.bitmap_size_bits / 8;
        let mut header = [0u8; HEADER_BYTES];
        header[0..8].copy_from_slice(&self.count.to_le_bytes());
        header[8..12].copy_from_slice(&self.k.to_le_bytes());
        self.bitmap
            .set_slice(header_start, header_start + HEADER_BYTES, &header)
    }

    /// Persist `count` into the header and flush the underlying bitmap.
    pub fn flush(&mut self) -> Result<()> {
        self.write_header()?;
        self.bitmap.flush()
    }

    /// Flush, then release the underlying bitmap's resources.
    pub fn close(mut self) -> Result<()> {
        self.flush()?;
        self.bitmap.close(false)
    }

    /// The raw bitmap's sharing mode.
    pub fn sharing(&self) -> Sharing {
        self.bitmap.sharing()
    }

    /// The path backing this filter's bitmap, if any. `None` for an
    /// anonymous (heap-backed) filter.
    pub fn path(&self) -> Option<&Path> {
        self.bitmap.path()
    }

    /// Minimum number of bits needed to hold `n` entries at false-positive
    /// probability `p`.
    pub fn required_bits(n: usize, p: f64) -> usize {
        params::required_bits(n, p)
    }

    /// Minimum number of bytes needed to hold `n` entries at false-positive
    /// probability `p` (bit storage only, header excluded).
    pub fn required_bytes(n: usize, p: f64) -> usize {
        params::required_bytes(n, p)
    }

    /// The false-positive probability of a filter with `bits` bits holding
    /// `n` entries.
    pub fn expected_probability(bits: usize, n: usize) -> f64 {
        params::expected_probability(bits, n)
    }

    /// The capacity a filter of `bits` bits can hold at false-positive
    /// probability `p`.
    pub fn expected_capacity(bits: usize, p: f64) -> f64 {
        params::expected_capacity(bits, p)
    }

    /// The ideal (possibly fractional) number of hash functions.
    pub fn ideal_k(bits: usize, n: usize) -> f64 {
        params::ideal_k(bits, n)
    }

    /// Bytes reserved for the header beyond bit storage.
    pub fn extra_buffer() -> usize {
        params::extra_buffer()
    }

    /// `(total_bytes, k)` for a filter sized to hold `n` entries at
    /// false-positive probability `p`, `total_bytes` including the header.
    pub fn params_for_capacity(n: usize, p: f64) -> (usize, u32) {
        params::params_for_capacity(n, p)
    }
}
