//! Sizing math for a classic bloom filter: converting between expected
//! capacity, target false-positive probability, bit count and the ideal
//! number of hash functions `k`.
//!
//! These are pure functions of the standard bloom filter formulae and hold
//! no state; [`BloomFilter::params_for_capacity`](crate::BloomFilter::params_for_capacity)
//! is the one most callers want.

use std::f64::consts::LN_2;

use crate::bloom::HEADER_BYTES;

/// Minimum number of bits needed to hold `n` entries at false-positive
/// probability `p`.
pub fn required_bits(n: usize, p: f64) -> usize {
    (-(n as f64) * p.ln() / (LN_2 * LN_2)).ceil() as usize
}

/// Minimum number of bytes needed to hold `n` entries at false-positive
/// probability `p` (bit storage only, header not included).
pub fn required_bytes(n: usize, p: f64) -> usize {
    (required_bits(n, p) as f64 / 8.0).ceil() as usize
}

/// The false-positive probability of a filter with `bits` bits holding `n`
/// entries.
pub fn expected_probability(bits: usize, n: usize) -> f64 {
    (-(bits as f64 / n as f64) * (LN_2 * LN_2)).exp()
}

/// The capacity a filter of `bits` bits can hold while keeping the
/// false-positive probability at or below `p`.
pub fn expected_capacity(bits: usize, p: f64) -> f64 {
    -(bits as f64) / p.ln() * (LN_2 * LN_2)
}

/// The ideal (possibly fractional) number of hash functions for a filter of
/// `bits` bits holding `n` entries.
pub fn ideal_k(bits: usize, n: usize) -> f64 {
    LN_2 * bits as f64 / n as f64
}

/// The number of bytes reserved for metadata beyond the bit storage itself
/// (the trailing `count`/`k` header).
pub fn extra_buffer() -> usize {
    HEADER_BYTES
}

/// Compute `(total_bytes, k)` for a filter sized to hold `n` entries at
/// false-positive probability `p`, where `total_bytes` includes the
/// trailing header.
pub fn params_for_capacity(n: usize, p: f64) -> (usize, u32) {
    let bytes = required_bytes(n, p);
    let bits = bytes * 8;
    let k = ideal_k(bits, n).ceil().max(1.0) as u32;
    (bytes + extra_buffer(), k)
}
