use fuzzchain_core::{Block, Blockchain, DecryptResult, MiningEngine};
use fuzzchain_crypto::{is_hash_valid, HashAlgorithm};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn test_mined_blocks_validate_at_every_difficulty() {
    let mut rng = StdRng::seed_from_u64(99);

    for difficulty in 1..=6usize {
        // Eight times the expected search length for this many hex zeros.
        let budget = 16u64.pow(difficulty as u32) * 8;
        let engine = MiningEngine::new(difficulty, budget);
        let mut block = Block::create(difficulty as u64, "property payload", "0", &mut rng);

        let result = engine.mine(&mut block);
        let zeros = "0".repeat(difficulty);
        assert!(
            result.success,
            "difficulty {} not reached in {} attempts",
            difficulty,
            result.attempts
        );
        assert!(engine.validate_mined_block(&block));
        assert!(is_hash_valid(&block.mining_hash(), difficulty));
        assert!(block.mining_hash().starts_with(&zeros));
        assert_eq!(result.digest, block.mining_hash());
        assert_eq!(block.nonce(), result.nonce);
        assert_eq!(result.attempts, result.nonce + 1);
    }
}

#[test]
fn test_foreign_copy_of_mined_block_stays_valid() {
    let mut rng = StdRng::seed_from_u64(4);
    let mut chain = Blockchain::with_params(2, HashAlgorithm::Sha256);
    let engine = MiningEngine::new(2, 1_000_000);

    let mut block = Block::create(1, "Transaction_1", chain.latest_block().identifier(), &mut rng);
    assert!(engine.mine(&mut block).success);

    let foreign = Block::deserialize(&block.serialize()).unwrap();
    assert_eq!(foreign.data(), DecryptResult::Unavailable);
    assert!(foreign.is_valid_with(2, HashAlgorithm::Sha256));

    chain.add_block(foreign).unwrap();
    assert_eq!(chain.len(), 2);
    assert!(chain.is_chain_valid());
}

#[test]
fn test_independent_chains_share_genesis() {
    let a = Blockchain::new();
    let b = Blockchain::new();
    assert_eq!(
        a.latest_block().identifier(),
        b.latest_block().identifier()
    );
    assert_eq!(a.serialize(), b.serialize());
}
