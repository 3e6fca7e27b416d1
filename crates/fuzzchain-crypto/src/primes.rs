//! Fixed pool of large primes used as ElGamal moduli.

use rand::seq::SliceRandom;
use rand::Rng;

/// Moduli available for key generation. Three bands: near 2^30, near 2^31
/// and just around 2^32. Every entry is prime and larger than any byte.
pub const PRIME_POOL: [u64; 27] = [
    982_451_653,
    982_451_707,
    982_451_737,
    982_451_809,
    982_451_819,
    982_451_863,
    982_451_927,
    982_451_933,
    982_451_941,
    2_147_483_647,
    2_147_483_659,
    2_147_483_693,
    2_147_483_713,
    2_147_483_743,
    2_147_483_777,
    2_147_483_783,
    2_147_483_813,
    2_147_483_857,
    4_294_967_291,
    4_294_967_311,
    4_294_967_357,
    4_294_967_371,
    4_294_967_377,
    4_294_967_387,
    4_294_967_389,
    4_294_967_459,
    4_294_967_477,
];

/// Pick a modulus from the pool.
pub fn random_prime<R: Rng + ?Sized>(rng: &mut R) -> u64 {
    // The pool is a non-empty constant.
    *PRIME_POOL.choose(rng).unwrap_or(&PRIME_POOL[0])
}

/// Deterministic trial-division primality test over 6k±1 candidates.
pub fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    if n < 4 {
        return true;
    }
    if n % 2 == 0 || n % 3 == 0 {
        return false;
    }

    let mut i = 5u64;
    while i.saturating_mul(i) <= n {
        if n % i == 0 || n % (i + 2) == 0 {
            return false;
        }
        i += 6;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_pool_entries_are_prime() {
        for p in PRIME_POOL {
            assert!(is_prime(p), "{} is not prime", p);
            assert!(p > 255);
        }
    }

    #[test]
    fn test_is_prime_small_numbers() {
        let primes: Vec<u64> = (0..30).filter(|n| is_prime(*n)).collect();
        assert_eq!(primes, vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29]);
        assert!(!is_prime(982_451_743));
        assert!(!is_prime(4_294_967_491));
    }

    #[test]
    fn test_random_prime_comes_from_pool() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            assert!(PRIME_POOL.contains(&random_prime(&mut rng)));
        }
    }
}
