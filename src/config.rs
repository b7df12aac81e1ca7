//! Pipeline configuration.
//!
//! A [`Configuration`] holds the tunables both sides of a transfer must
//! agree on. It is immutable once built and safe to share read-only; each
//! pipeline constructs its own mutable checksum state from it.

use crate::checksum::Checksum32;
use crate::error::{Result, SyncError};
use crate::hash::{StrongDigest, StrongDigestAlgorithm};

/// The default block length, in bytes.
pub const DEFAULT_BLOCK_LENGTH: usize = 700;

/// The default matcher buffer size, in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 32 * 1024;

/// Immutable tunables shared by the generator, matcher, and rebuilder.
///
/// Build one with [`Configuration::builder`]; validation happens in one
/// place, [`ConfigurationBuilder::build`].
///
/// ```rust
/// use rollsync::{Configuration, StrongDigestAlgorithm};
///
/// let config = Configuration::builder()
///     .block_length(2048)
///     .strong(StrongDigestAlgorithm::Md4)
///     .strong_sum_length(8)
///     .build()
///     .unwrap();
/// assert_eq!(config.block_length(), 2048);
/// ```
#[derive(Debug, Clone)]
pub struct Configuration {
    block_length: usize,
    strong_sum_length: usize,
    chunk_size: usize,
    char_offset: u32,
    checksum_seed: Option<Vec<u8>>,
    seed_is_prefix: bool,
    strong: StrongDigestAlgorithm,
}

impl Configuration {
    /// Start building a configuration with the defaults: 700-byte blocks,
    /// 32 KiB chunks, MD5 at full digest length, no seed, zero bias.
    #[must_use]
    pub fn builder() -> ConfigurationBuilder {
        ConfigurationBuilder::default()
    }

    /// Nominal block size in bytes; only a basis's final block may be
    /// shorter.
    #[must_use]
    pub const fn block_length(&self) -> usize {
        self.block_length
    }

    /// How many leading bytes of the strong digest are retained.
    #[must_use]
    pub const fn strong_sum_length(&self) -> usize {
        self.strong_sum_length
    }

    /// Matcher window/buffer size; always at least `block_length`.
    #[must_use]
    pub const fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Per-byte bias of the rolling checksum.
    #[must_use]
    pub const fn char_offset(&self) -> u32 {
        self.char_offset
    }

    /// Optional seed mixed into every strong digest.
    #[must_use]
    pub fn checksum_seed(&self) -> Option<&[u8]> {
        self.checksum_seed.as_deref()
    }

    /// Whether the seed is hashed before the block bytes (after otherwise).
    #[must_use]
    pub const fn seed_is_prefix(&self) -> bool {
        self.seed_is_prefix
    }

    /// The configured strong digest algorithm.
    #[must_use]
    pub const fn strong_algorithm(&self) -> StrongDigestAlgorithm {
        self.strong
    }

    /// Create a fresh rolling checksum for a pipeline.
    #[must_use]
    pub fn weak_sum(&self) -> Checksum32 {
        Checksum32::new(self.char_offset)
    }

    /// Create a fresh strong digest hasher for a pipeline.
    #[must_use]
    pub fn strong_digest(&self) -> StrongDigest {
        self.strong.hasher()
    }

    /// Compute the truncated, seed-mixed strong sum of a block, reusing
    /// `hasher` for the digest state.
    #[must_use]
    pub fn strong_sum_of(&self, hasher: &mut StrongDigest, block: &[u8]) -> Vec<u8> {
        hasher.reset();
        if self.seed_is_prefix {
            if let Some(seed) = &self.checksum_seed {
                hasher.update(seed);
            }
        }
        hasher.update(block);
        if !self.seed_is_prefix {
            if let Some(seed) = &self.checksum_seed {
                hasher.update(seed);
            }
        }
        let mut digest = hasher.digest();
        digest.truncate(self.strong_sum_length);
        digest
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            block_length: DEFAULT_BLOCK_LENGTH,
            strong_sum_length: StrongDigestAlgorithm::Md5.digest_size(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            char_offset: 0,
            checksum_seed: None,
            seed_is_prefix: false,
            strong: StrongDigestAlgorithm::Md5,
        }
    }
}

/// Builder for [`Configuration`]; all settings are optional.
#[derive(Debug, Clone, Default)]
pub struct ConfigurationBuilder {
    block_length: Option<usize>,
    strong_sum_length: Option<usize>,
    chunk_size: Option<usize>,
    char_offset: u32,
    checksum_seed: Option<Vec<u8>>,
    seed_is_prefix: bool,
    strong: Option<StrongDigestAlgorithm>,
}

impl ConfigurationBuilder {
    /// Set the block length.
    #[must_use]
    pub fn block_length(mut self, block_length: usize) -> Self {
        self.block_length = Some(block_length);
        self
    }

    /// Set how many leading bytes of the strong digest to retain. Defaults
    /// to the digest size of the chosen algorithm.
    #[must_use]
    pub fn strong_sum_length(mut self, strong_sum_length: usize) -> Self {
        self.strong_sum_length = Some(strong_sum_length);
        self
    }

    /// Set the matcher buffer size.
    #[must_use]
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    /// Set the rolling checksum's per-byte bias. rsync uses 0, librsync 31.
    #[must_use]
    pub fn char_offset(mut self, char_offset: u32) -> Self {
        self.char_offset = char_offset;
        self
    }

    /// Set the seed mixed into every strong digest.
    #[must_use]
    pub fn checksum_seed(mut self, seed: impl Into<Vec<u8>>) -> Self {
        self.checksum_seed = Some(seed.into());
        self
    }

    /// Hash the seed before the block bytes instead of after.
    #[must_use]
    pub fn seed_is_prefix(mut self, seed_is_prefix: bool) -> Self {
        self.seed_is_prefix = seed_is_prefix;
        self
    }

    /// Select the strong digest algorithm.
    #[must_use]
    pub fn strong(mut self, strong: StrongDigestAlgorithm) -> Self {
        self.strong = Some(strong);
        self
    }

    /// Validate the settings and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidConfiguration`] when `block_length` is
    /// zero, `chunk_size` is smaller than `block_length`, or
    /// `strong_sum_length` is zero or exceeds the digest size.
    pub fn build(self) -> Result<Configuration> {
        let strong = self.strong.unwrap_or(StrongDigestAlgorithm::Md5);
        let block_length = self.block_length.unwrap_or(DEFAULT_BLOCK_LENGTH);
        let chunk_size = self.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE);
        let strong_sum_length = self.strong_sum_length.unwrap_or(strong.digest_size());

        if block_length == 0 {
            return Err(SyncError::InvalidConfiguration(
                "block_length must be positive".into(),
            ));
        }
        if chunk_size < block_length {
            return Err(SyncError::InvalidConfiguration(format!(
                "chunk_size {chunk_size} < block_length {block_length}"
            )));
        }
        if strong_sum_length == 0 || strong_sum_length > strong.digest_size() {
            return Err(SyncError::InvalidConfiguration(format!(
                "strong_sum_length {strong_sum_length} not in 1..={}",
                strong.digest_size()
            )));
        }

        Ok(Configuration {
            block_length,
            strong_sum_length,
            chunk_size,
            char_offset: self.char_offset,
            checksum_seed: self.checksum_seed,
            seed_is_prefix: self.seed_is_prefix,
            strong,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Configuration::default();
        assert_eq!(config.block_length(), 700);
        assert_eq!(config.chunk_size(), 32 * 1024);
        assert_eq!(config.strong_algorithm(), StrongDigestAlgorithm::Md5);
        assert_eq!(config.strong_sum_length(), 16);
        assert_eq!(config.char_offset(), 0);
        assert!(config.checksum_seed().is_none());
    }

    #[test]
    fn builder_matches_default() {
        let built = Configuration::builder().build().unwrap();
        assert_eq!(built.block_length(), Configuration::default().block_length());
        assert_eq!(built.strong_sum_length(), 16);
    }

    #[test]
    fn builder_overrides() {
        let config = Configuration::builder()
            .block_length(1024)
            .chunk_size(4096)
            .char_offset(31)
            .strong(StrongDigestAlgorithm::Xxh64)
            .checksum_seed(vec![1, 2, 3, 4])
            .seed_is_prefix(true)
            .build()
            .unwrap();
        assert_eq!(config.block_length(), 1024);
        assert_eq!(config.chunk_size(), 4096);
        assert_eq!(config.char_offset(), 31);
        assert_eq!(config.strong_algorithm(), StrongDigestAlgorithm::Xxh64);
        assert_eq!(config.strong_sum_length(), 8);
        assert_eq!(config.checksum_seed(), Some(&[1u8, 2, 3, 4][..]));
        assert!(config.seed_is_prefix());
    }

    #[test]
    fn zero_block_length_rejected() {
        let err = Configuration::builder().block_length(0).build().unwrap_err();
        assert!(matches!(err, SyncError::InvalidConfiguration(_)));
    }

    #[test]
    fn chunk_smaller_than_block_rejected() {
        let err = Configuration::builder()
            .block_length(1024)
            .chunk_size(512)
            .build()
            .unwrap_err();
        assert!(matches!(err, SyncError::InvalidConfiguration(_)));
    }

    #[test]
    fn strong_sum_length_bounds() {
        assert!(Configuration::builder()
            .strong_sum_length(0)
            .build()
            .is_err());
        assert!(Configuration::builder()
            .strong_sum_length(17)
            .build()
            .is_err());
        assert!(Configuration::builder()
            .strong(StrongDigestAlgorithm::Xxh64)
            .strong_sum_length(8)
            .build()
            .is_ok());
        assert!(Configuration::builder()
            .strong(StrongDigestAlgorithm::Xxh64)
            .strong_sum_length(9)
            .build()
            .is_err());
    }

    #[test]
    fn strong_sum_of_truncates() {
        let config = Configuration::builder()
            .strong_sum_length(8)
            .build()
            .unwrap();
        let mut hasher = config.strong_digest();
        let sum = config.strong_sum_of(&mut hasher, b"some block");
        assert_eq!(sum.len(), 8);

        let full = Configuration::builder().build().unwrap();
        let mut full_hasher = full.strong_digest();
        let full_sum = full.strong_sum_of(&mut full_hasher, b"some block");
        assert_eq!(&full_sum[..8], &sum[..]);
    }

    #[test]
    fn seed_changes_the_sum() {
        let plain = Configuration::builder().build().unwrap();
        let seeded = Configuration::builder()
            .checksum_seed(vec![9u8; 4])
            .build()
            .unwrap();
        let mut h1 = plain.strong_digest();
        let mut h2 = seeded.strong_digest();
        assert_ne!(
            plain.strong_sum_of(&mut h1, b"block"),
            seeded.strong_sum_of(&mut h2, b"block")
        );
    }

    #[test]
    fn seed_prefix_and_suffix_differ() {
        let suffix = Configuration::builder()
            .checksum_seed(vec![9u8; 4])
            .build()
            .unwrap();
        let prefix = Configuration::builder()
            .checksum_seed(vec![9u8; 4])
            .seed_is_prefix(true)
            .build()
            .unwrap();
        let mut h1 = suffix.strong_digest();
        let mut h2 = prefix.strong_digest();
        assert_ne!(
            suffix.strong_sum_of(&mut h1, b"block"),
            prefix.strong_sum_of(&mut h2, b"block")
        );
    }

    #[test]
    fn strong_sum_of_is_reusable() {
        let config = Configuration::default();
        let mut hasher = config.strong_digest();
        let first = config.strong_sum_of(&mut hasher, b"one");
        let _ = config.strong_sum_of(&mut hasher, b"interleaved");
        let again = config.strong_sum_of(&mut hasher, b"one");
        assert_eq!(first, again);
    }
}
