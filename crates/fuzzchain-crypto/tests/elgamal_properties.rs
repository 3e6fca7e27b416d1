use fuzzchain_crypto::{decrypt, encrypt, hash, is_hash_valid, KeyPair, PRIME_POOL};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_decrypt_inverts_encrypt(
        payload in proptest::collection::vec(any::<u8>(), 0..64),
        seed in any::<u64>(),
        r in 100u64..900_000_000,
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let kp = KeyPair::generate(&mut rng);
        let ct = encrypt(&payload, r, &kp.public_key());
        prop_assert_eq!(decrypt(&ct, &kp).unwrap(), payload);
    }

    #[test]
    fn prop_roundtrip_on_every_pool_modulus(
        idx in 0usize..PRIME_POOL.len(),
        d in 2u64..900_000_000,
        text in "[ -~]{1,40}",
    ) {
        let kp = KeyPair::from_parts(PRIME_POOL[idx], 2, d).unwrap();
        let ct = encrypt(text.as_bytes(), d / 3 + 100, &kp.public_key());
        prop_assert_eq!(decrypt(&ct, &kp).unwrap(), text.into_bytes());
    }

    #[test]
    fn prop_hash_validity_matches_prefix(data in ".*", difficulty in 0usize..8) {
        let digest = hash(&data);
        let expected = digest.chars().take(difficulty).all(|c| c == '0');
        prop_assert_eq!(is_hash_valid(&digest, difficulty), expected);
    }
}
