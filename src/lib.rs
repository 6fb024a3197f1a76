//! mmbloom implements memory-mapped, persistent bloom filters: a
//! bit-addressable [`Bitmap`] over an (optionally file-backed) mmap region,
//! a fixed-capacity [`BloomFilter`] layered on top of it, and a
//! [`ScalingBloomFilter`] that composes a growing sequence of classic
//! filters while keeping the aggregate false-positive rate bounded.
//!
//! ## Layering
//!
//! ```text
//! ScalingBloomFilter -> BloomFilter (x N layers) -> Bitmap -> mmap
//! ```
//!
//! `Bitmap` owns the mapped region and knows only about bits and bytes.
//! `BloomFilter` owns a `Bitmap`, computes partitioned hash positions, and
//! persists a small header (`count`, `k`) in the bitmap's trailing bytes.
//! `ScalingBloomFilter` owns an ordered sequence of `BloomFilter`s, writing
//! only to the newest and probing every layer on lookup.
//!
//! ## Durability
//!
//! A file-backed `Bitmap`'s `flush` performs a synchronous `msync` followed
//! by `fsync`; only after that call returns `Ok(())` are prior writes
//! guaranteed durable. Anonymous bitmaps are always in-memory only.
//!
//! ## Features
//!
//! * `mmap` (default) - enables file-backed bitmaps via `memmap2`. With
//!   this feature disabled, only anonymous (heap-backed) bitmaps are
//!   available.
//! * `serde` - derive `Serialize`/`Deserialize` for the small, non-mmap
//!   parameter types exposed by this crate.

mod bitmap;
mod bloom;
mod error;
mod hash;
mod params;
mod scaling;

pub use bitmap::{Bitmap, Sharing};
pub use bloom::{BloomFilter, HEADER_BYTES};
pub use error::{Error, Result};
pub use params::{
    expected_capacity, expected_probability, extra_buffer, ideal_k, params_for_capacity,
    required_bits, required_bytes,
};
pub use scaling::{
    BitmapFactory, ScalingBloomFilter, ScalingBloomFilterBuilder, ScalingBloomFilterConfig,
};
