//! The partitioned bloom filter hash scheme: four classical string hashes
//! (djb2, a Dek-style rotate-xor, FNV-1, and a Bernstein/JS hash) evaluated
//! together in rounds of four, with each round after the first salted by
//! the previous round's combined output.
//!
//! This produces `k` independent-enough 64-bit hash values from a single
//! key without re-hashing from scratch for every partition - see
//! `BloomFilter`'s bit-position mapping for how each value is folded into
//! its own partition.

const FNV_PRIME: u64 = 0x811C_9DC5;
const DJB_SEED: u64 = 5381;
const JS_SEED: u64 = 1_315_423_911;

/// Fill `out` with `k` hash values derived from `key`. `out` is resized to
/// exactly `k` entries.
pub(crate) fn compute_hashes(key: &[u8], k: u32, out: &mut Vec<u64>) {
    out.clear();

    let rounds = (k as usize).div_ceil(4);
    let mut salt: Option<u64> = None;

    for _round in 0..rounds {
        let mut djb = DJB_SEED;
        let mut dek = key.len() as u64;
        let mut fnv = 0u64;
        let mut js = JS_SEED;

        if let Some(s) = salt {
            dek += 8;
            for j in 0..8u32 {
                let b = ((s >> (j * 8)) & 0xFF) as u8;
                mix(&mut djb, &mut dek, &mut fnv, &mut js, b);
            }
        }

        for &b in key {
            mix(&mut djb, &mut dek, &mut fnv, &mut js, b);
        }

        for v in [djb, dek, fnv, js] {
            if out.len() < k as usize {
                out.push(v);
            }
        }

        salt = Some(djb ^ dek ^ fnv ^ js);
    }
}

#[inline(always)]
fn mix(djb: &mut u64, dek: &mut u64, fnv: &mut u64, js: &mut u64, b: u8) {
    let b = b as u64;
    *djb = (*djb << 5).wrapping_add(*djb).wrapping_add(b);
    *dek = ((*dek << 6) ^ (*dek >> 27)) ^ b;
    *fnv = fnv.wrapping_mul(FNV_PRIME);
    *fnv ^= b;
    *js ^= (*js << 5).wrapping_add(b).wrapping_add(*js >> 2);
}
