//! Strong block digests.
//!
//! The rolling checksum only filters candidates; a strong digest confirms
//! that a candidate block really is byte-identical. The algorithm is chosen
//! per [`crate::Configuration`]: MD4 (classic rsync), MD5, or XXH64 when
//! both sides agree a non-cryptographic 64-bit digest is acceptable.

use md4::Digest;
use xxhash_rust::xxh64::Xxh64;

/// Selects the strong digest algorithm for a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrongDigestAlgorithm {
    /// MD4, the digest of classic rsync. 16-byte output.
    Md4,
    /// MD5. 16-byte output.
    Md5,
    /// XXH64, non-cryptographic. 8-byte output.
    Xxh64,
}

impl StrongDigestAlgorithm {
    /// The natural output size of this algorithm, in bytes.
    #[must_use]
    pub const fn digest_size(self) -> usize {
        match self {
            Self::Md4 | Self::Md5 => 16,
            Self::Xxh64 => 8,
        }
    }

    /// Create a fresh hasher for this algorithm.
    #[must_use]
    pub fn hasher(self) -> StrongDigest {
        match self {
            Self::Md4 => StrongDigest::Md4(md4::Md4::new()),
            Self::Md5 => StrongDigest::Md5(md5::Md5::new()),
            Self::Xxh64 => StrongDigest::Xxh64(Xxh64::new(0)),
        }
    }
}

/// A strong digest in progress.
///
/// One instance belongs to one pipeline; it is reused across blocks via
/// [`digest`](Self::digest), which finalizes and resets in one step.
#[derive(Clone)]
pub enum StrongDigest {
    /// MD4 state.
    Md4(md4::Md4),
    /// MD5 state.
    Md5(md5::Md5),
    /// XXH64 state.
    Xxh64(Xxh64),
}

impl std::fmt::Debug for StrongDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StrongDigest({:?})", self.algorithm())
    }
}

impl StrongDigest {
    /// The algorithm backing this hasher.
    #[must_use]
    pub const fn algorithm(&self) -> StrongDigestAlgorithm {
        match self {
            Self::Md4(_) => StrongDigestAlgorithm::Md4,
            Self::Md5(_) => StrongDigestAlgorithm::Md5,
            Self::Xxh64(_) => StrongDigestAlgorithm::Xxh64,
        }
    }

    /// The output size in bytes.
    #[must_use]
    pub const fn digest_size(&self) -> usize {
        self.algorithm().digest_size()
    }

    /// Discard any absorbed input.
    pub fn reset(&mut self) {
        match self {
            Self::Md4(h) => Digest::reset(h),
            Self::Md5(h) => Digest::reset(h),
            Self::Xxh64(h) => h.reset(0),
        }
    }

    /// Absorb input bytes.
    pub fn update(&mut self, data: &[u8]) {
        match self {
            Self::Md4(h) => Digest::update(h, data),
            Self::Md5(h) => Digest::update(h, data),
            Self::Xxh64(h) => h.update(data),
        }
    }

    /// Finalize the digest over everything absorbed since the last reset,
    /// returning the full output and resetting the state.
    pub fn digest(&mut self) -> Vec<u8> {
        match self {
            Self::Md4(h) => h.finalize_reset().to_vec(),
            Self::Md5(h) => h.finalize_reset().to_vec(),
            Self::Xxh64(h) => {
                let value = h.digest();
                h.reset(0);
                value.to_be_bytes().to_vec()
            }
        }
    }
}
