//! Index-seeded pseudo-random scalars.
//!
//! Particle initialization derives every random value from the instance
//! index through a stateless integer hash, so a buffer seeded twice with the
//! same parameters is bit-identical. There is no RNG state to carry across
//! parallel execution, which makes the initializer safe to run in any order.
//!
//! The mixer here is the same one the generated WGSL uses (see
//! [`crate::shader::HASH_WGSL`]); CPU and GPU initialization agree exactly
//! on the integer stream.

/// Mix a `u32` into a well-distributed pseudo-random `u32`.
#[inline]
pub fn hash_u32(n: u32) -> u32 {
    let mut x = n;
    x ^= x >> 17;
    x = x.wrapping_mul(0xed5a_d4bb);
    x ^= x >> 11;
    x = x.wrapping_mul(0xac4c_1b51);
    x ^= x >> 15;
    x = x.wrapping_mul(0x3184_8bab);
    x ^= x >> 14;
    x
}

/// Pseudo-random float in `[0, 1]` for the given seed.
#[inline]
pub fn hash01(seed: u32) -> f32 {
    hash_u32(seed) as f32 / u32::MAX as f32
}

/// Pseudo-random float in `[min, max]` for the given seed.
#[inline]
pub fn hash_range(seed: u32, min: f32, max: f32) -> f32 {
    min + hash01(seed) * (max - min)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_deterministic() {
        for seed in [0u32, 1, 7, 12345, u32::MAX] {
            assert_eq!(hash_u32(seed), hash_u32(seed));
            assert_eq!(hash01(seed), hash01(seed));
        }
    }

    #[test]
    fn test_hash_unit_interval() {
        for seed in 0..10_000u32 {
            let v = hash01(seed);
            assert!((0.0..=1.0).contains(&v), "hash01({}) = {}", seed, v);
        }
    }

    #[test]
    fn test_hash_adjacent_seeds_decorrelated() {
        // Consecutive indices must not produce visibly correlated values.
        let a = hash01(100);
        let b = hash01(101);
        let c = hash01(102);
        assert!((a - b).abs() > 1e-4);
        assert!((b - c).abs() > 1e-4);
    }

    #[test]
    fn test_hash_roughly_uniform() {
        let n = 100_000u32;
        let mean: f64 = (0..n).map(|s| hash01(s) as f64).sum::<f64>() / n as f64;
        assert!((mean - 0.5).abs() < 0.01, "mean = {}", mean);
    }

    #[test]
    fn test_hash_range_bounds() {
        for seed in 0..1000u32 {
            let v = hash_range(seed, 0.25, 1.0);
            assert!((0.25..=1.0).contains(&v));
        }
    }
}
