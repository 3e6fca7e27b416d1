// MODULAR ARITHMETIC
// Binary exponentiation and extended-Euclid inverses over u64 residues.
//
// SAFETY CONSTRAINTS:
// 1. Every product is formed in u128, so no intermediate can overflow
// 2. A modulus below 2 has no meaningful residue ring and yields 0 / None

use rand::Rng;

/// Multiply two residues modulo `modulus` using a 128-bit intermediate.
pub fn mod_mul(a: u64, b: u64, modulus: u64) -> u64 {
    if modulus < 2 {
        return 0;
    }
    ((a as u128 * b as u128) % modulus as u128) as u64
}

/// Compute `base^exp mod modulus` by square-and-multiply.
///
/// # Arguments
/// * `base` - Any u64, reduced before use
/// * `exp` - Exponent
/// * `modulus` - Modulus; values below 2 return 0
pub fn mod_pow(base: u64, exp: u64, modulus: u64) -> u64 {
    if modulus < 2 {
        return 0;
    }

    let m = modulus as u128;
    let mut result: u128 = 1;
    let mut b = base as u128 % m;
    let mut e = exp;

    while e > 0 {
        if e & 1 == 1 {
            result = result * b % m;
        }
        b = b * b % m;
        e >>= 1;
    }

    result as u64
}

/// Modular inverse of `a` modulo `modulus` via the extended Euclidean algorithm.
///
/// # Returns
/// - `Some(x)` with `a * x ≡ 1 (mod modulus)`
/// - `None` if `gcd(a, modulus) != 1` or the modulus is below 2
pub fn mod_inverse(a: u64, modulus: u64) -> Option<u64> {
    if modulus < 2 {
        return None;
    }

    let m = modulus as i128;
    let (mut old_r, mut r) = ((a % modulus) as i128, m);
    let (mut old_s, mut s) = (1i128, 0i128);

    while r != 0 {
        let q = old_r / r;
        (old_r, r) = (r, old_r - q * r);
        (old_s, s) = (s, old_s - q * s);
    }

    if old_r != 1 {
        return None;
    }

    Some(old_s.rem_euclid(m) as u64)
}

/// Uniform draw from the inclusive range `[lo, hi]`. Returns `lo` when the
/// range is empty.
pub fn random_in_range<R: Rng + ?Sized>(rng: &mut R, lo: u64, hi: u64) -> u64 {
    if hi <= lo {
        return lo;
    }
    rng.gen_range(lo..=hi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_mod_pow_small_values() {
        assert_eq!(mod_pow(2, 10, 1_000), 24);
        assert_eq!(mod_pow(3, 0, 7), 1);
        assert_eq!(mod_pow(0, 5, 7), 0);
        assert_eq!(mod_pow(5, 3, 1), 0);
    }

    #[test]
    fn test_mod_pow_fermat_on_large_prime() {
        let p = 4_294_967_311u64;
        assert_eq!(mod_pow(2, p - 1, p), 1);
        assert_eq!(mod_pow(123_456_789, p - 1, p), 1);
    }

    #[test]
    fn test_mod_mul_does_not_overflow() {
        let p = 4_294_967_477u64;
        let a = p - 1;
        // (p-1)^2 ≡ 1 (mod p)
        assert_eq!(mod_mul(a, a, p), 1);
    }

    #[test]
    fn test_mod_inverse() {
        assert_eq!(mod_inverse(3, 11), Some(4));
        assert_eq!(mod_inverse(10, 17), Some(12));
        assert_eq!(mod_inverse(6, 9), None);
        assert_eq!(mod_inverse(0, 7), None);
        assert_eq!(mod_inverse(3, 1), None);

        let p = 2_147_483_647u64;
        let x = 987_654_321u64;
        let inv = mod_inverse(x, p).unwrap();
        assert_eq!(mod_mul(x, inv, p), 1);
    }

    #[test]
    fn test_random_in_range_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let v = random_in_range(&mut rng, 100, 110);
            assert!((100..=110).contains(&v));
        }
        assert_eq!(random_in_range(&mut rng, 9, 3), 9);
    }
}
