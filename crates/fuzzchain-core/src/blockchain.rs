// APPEND-ONLY CHAIN
// Ordered blocks rooted at the shared genesis block.
//
// SAFETY INVARIANTS:
// 1. Index 0 is the canonical genesis block with previous reference "0"
// 2. For i > 0, chain[i].previous_ref == identifier(chain[i-1])
// 3. Every non-genesis block satisfies the validity predicate
// 4. The chain only grows by validated append or longest-valid replacement

use fuzzchain_crypto::HashAlgorithm;
use log::{debug, info, warn};

use crate::block::{Block, BLOCK_VALIDITY_DIFFICULTY, GENESIS_PREVIOUS_REF};
use crate::error::{CoreError, CoreResult};

/// Fields per block in the wire form.
const FIELDS_PER_BLOCK: usize = 6;

pub struct Blockchain {
    blocks: Vec<Block>,
    difficulty: usize,
    algorithm: HashAlgorithm,
    genesis_id: String,
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new()
    }
}

impl Blockchain {
    /// Chain holding only genesis, validating at difficulty 4 with SHA-256.
    pub fn new() -> Self {
        Self::with_params(BLOCK_VALIDITY_DIFFICULTY, HashAlgorithm::default())
    }

    pub fn with_params(difficulty: usize, algorithm: HashAlgorithm) -> Self {
        let genesis = Block::genesis();
        Blockchain {
            genesis_id: genesis.identifier(),
            blocks: vec![genesis],
            difficulty,
            algorithm,
        }
    }

    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Never true: genesis is always present.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn latest_block(&self) -> &Block {
        // Genesis is inserted at construction and never removed.
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn block_at(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    /// Index the next appended block must carry.
    pub fn next_index(&self) -> u64 {
        self.blocks.len() as u64
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.blocks.iter().any(|b| b.identifier() == identifier)
    }

    /// Append `block` if it links to the tip and passes validation.
    ///
    /// # Returns
    /// - `Err(LinkMismatch)` if `previous_ref` is not the tip identifier
    /// - `Err(InvalidBlock)` if the block fails validity or has the wrong index
    pub fn add_block(&mut self, block: Block) -> CoreResult<()> {
        let tip = self.latest_block().identifier();
        if block.previous_ref() != tip {
            return Err(CoreError::LinkMismatch {
                index: block.index(),
                expected: tip,
                got: block.previous_ref().to_string(),
            });
        }
        if block.index() != self.next_index() || !self.block_is_valid(&block) {
            return Err(CoreError::InvalidBlock { index: block.index() });
        }

        debug!("Appending block {} ({})", block.index(), block.identifier());
        self.blocks.push(block);
        Ok(())
    }

    /// Full validation of this chain.
    pub fn is_chain_valid(&self) -> bool {
        self.validate_blocks(&self.blocks)
    }

    /// Validate an arbitrary block sequence under this chain's rules.
    pub fn validate_blocks(&self, blocks: &[Block]) -> bool {
        let Some(genesis) = blocks.first() else {
            return false;
        };
        if genesis.index() != 0
            || genesis.previous_ref() != GENESIS_PREVIOUS_REF
            || genesis.identifier() != self.genesis_id
        {
            return false;
        }

        blocks.windows(2).all(|pair| {
            let (prev, cur) = (&pair[0], &pair[1]);
            cur.previous_ref() == prev.identifier()
                && cur.index() == prev.index() + 1
                && self.block_is_valid(cur)
        })
    }

    /// Adopt `candidate` iff it is strictly longer and fully valid.
    pub fn replace_chain(&mut self, candidate: Vec<Block>) -> bool {
        if candidate.len() <= self.blocks.len() {
            debug!(
                "Rejecting candidate chain: length {} <= {}",
                candidate.len(),
                self.blocks.len()
            );
            return false;
        }
        if !self.validate_blocks(&candidate) {
            warn!("Rejecting candidate chain of length {}: invalid", candidate.len());
            return false;
        }

        info!(
            "Replacing chain: {} -> {} blocks",
            self.blocks.len(),
            candidate.len()
        );
        self.blocks = candidate;
        true
    }

    /// Blocks in wire form joined by `;`.
    pub fn serialize(&self) -> String {
        self.blocks
            .iter()
            .map(Block::serialize)
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Parse a chain wire form into foreign blocks.
    ///
    /// Ciphertexts also contain `;`, so the text is split on `|` and only the
    /// sixth field of each block (the hex session hash) is split at its first
    /// `;` to find where the next block starts.
    pub fn deserialize(text: &str) -> CoreResult<Vec<Block>> {
        let tokens: Vec<&str> = text.split('|').collect();
        let mut blocks = Vec::new();
        let mut fields: Vec<&str> = Vec::with_capacity(FIELDS_PER_BLOCK);

        for (i, token) in tokens.iter().enumerate() {
            let last = i + 1 == tokens.len();
            if fields.len() + 1 < FIELDS_PER_BLOCK {
                fields.push(token);
                continue;
            }

            let (hash, rest) = match token.split_once(';') {
                Some((hash, rest)) if !last => (hash, Some(rest)),
                None if last => (*token, None),
                _ => {
                    return Err(CoreError::MalformedMessage(format!(
                        "bad block boundary after block {}",
                        blocks.len()
                    )))
                }
            };

            fields.push(hash);
            blocks.push(Block::deserialize(&fields.join("|"))?);
            fields.clear();
            if let Some(next_index) = rest {
                fields.push(next_index);
            }
        }

        if !fields.is_empty() || blocks.is_empty() {
            return Err(CoreError::MalformedMessage(format!(
                "truncated chain: {} dangling fields",
                fields.len()
            )));
        }
        Ok(blocks)
    }

    fn block_is_valid(&self, block: &Block) -> bool {
        block.is_valid_with(self.difficulty, self.algorithm)
    }
}
