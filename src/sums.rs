//! Checksum records produced for basis blocks.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

pub(crate) fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    bytes.iter().fold(String::new(), |mut s, b| {
        let _ = write!(s, "{b:02x}");
        s
    })
}

/// A weak/strong checksum pair for one block.
///
/// The weak half is the 32-bit rolling checksum; the strong half is the
/// truncated strong digest. Equality is componentwise; hashing uses only
/// the weak half (the strong half is expensive to compare and rarely
/// needed to discriminate).
///
/// Pairs carry no offset; see [`BlockChecksum`] for located sums.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecksumPair {
    /// The weak, rolling checksum.
    pub weak: u32,
    /// The strong checksum, truncated to the configured length.
    pub strong: Vec<u8>,
}

impl ChecksumPair {
    /// Create a new pair.
    #[must_use]
    pub fn new(weak: u32, strong: Vec<u8>) -> Self {
        Self { weak, strong }
    }
}

impl Hash for ChecksumPair {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u32(self.weak);
    }
}

impl std::fmt::Debug for ChecksumPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ChecksumPair(weak={:08x}, strong={})",
            self.weak,
            to_hex(&self.strong)
        )
    }
}

/// A [`ChecksumPair`] plus the location of the block it was computed over.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockChecksum {
    /// The weak/strong sums of the block.
    pub pair: ChecksumPair,
    /// Byte offset in the basis where the block begins.
    pub offset: u64,
    /// Bytes covered; only the final block of a basis may fall short of
    /// the configured block length.
    pub length: u32,
    /// Zero-based sequence number of the block.
    pub seq: u32,
}

impl BlockChecksum {
    /// Create a new located checksum.
    #[must_use]
    pub fn new(pair: ChecksumPair, offset: u64, length: u32, seq: u32) -> Self {
        Self {
            pair,
            offset,
            length,
            seq,
        }
    }
}

impl std::fmt::Debug for BlockChecksum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "BlockChecksum({:?}, offset={}, length={}, seq={})",
            self.pair, self.offset, self.length, self.seq
        )
    }
}
