/// Fast 2-value hash with xorshift
#[inline(always)]
pub fn hash2(a: u64, b: u64) -> u64 {
    let mut seed = a.wrapping_mul(2654435761).wrapping_add(b.wrapping_mul(2246822519));
    seed ^= seed << 13;
    seed ^= seed >> 7;
    seed ^= seed << 17;
    seed
}

/// Fold a stream of floats into one fingerprint.
///
/// Uses the raw bit pattern, so `0.0` and `-0.0` hash differently. That is
/// fine for cache identity: identical inputs always produce identical keys.
#[inline]
pub fn fold_f64(seed: u64, values: impl IntoIterator<Item = f64>) -> u64 {
    values
        .into_iter()
        .fold(seed, |acc, v| hash2(acc, v.to_bits()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_is_order_sensitive() {
        let a = fold_f64(1, [1.0, 2.0]);
        let b = fold_f64(1, [2.0, 1.0]);
        assert_ne!(a, b);
        assert_eq!(a, fold_f64(1, [1.0, 2.0]));
    }
}
