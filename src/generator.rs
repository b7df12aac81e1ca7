//! Checksum generation over a basis.
//!
//! The generator partitions a basis into `block_length`-sized blocks (the
//! final block may be shorter) and produces one [`BlockChecksum`] per
//! block. [`GeneratorStream`] is the incremental form fed byte chunks;
//! [`Generator`] is the one-shot convenience over a whole buffer or reader.

use std::io::Read;

use rayon::prelude::*;

use crate::config::Configuration;
use crate::error::{notify_all, ListenerError, Result};
use crate::hash::StrongDigest;
use crate::sums::{BlockChecksum, ChecksumPair};

/// Inputs larger than this are hashed block-parallel in the one-shot path.
const PARALLEL_THRESHOLD: usize = 64 * 1024;

/// Receives [`BlockChecksum`] events as the generator produces them.
///
/// Any `FnMut(&BlockChecksum) -> Result<(), ListenerError>` closure is a
/// listener.
pub trait GeneratorListener {
    /// Called once per block, in `seq` order.
    ///
    /// # Errors
    ///
    /// A listener may fail; failures from all listeners of one emission are
    /// collected into a [`crate::ListenerFailures`] chain.
    fn block(&mut self, sum: &BlockChecksum) -> std::result::Result<(), ListenerError>;
}

impl<F> GeneratorListener for F
where
    F: FnMut(&BlockChecksum) -> std::result::Result<(), ListenerError>,
{
    fn block(&mut self, sum: &BlockChecksum) -> std::result::Result<(), ListenerError> {
        self(sum)
    }
}

/// Streaming checksum generator.
///
/// Feed bytes with [`update`](Self::update); whenever a full block has
/// accumulated, one [`BlockChecksum`] is emitted to every listener.
/// [`finish`](Self::finish) flushes the final short block, if any, and
/// resets the stream for another run.
pub struct GeneratorStream {
    config: Configuration,
    strong: StrongDigest,
    buffer: Vec<u8>,
    base_offset: u64,
    offset: u64,
    seq: u32,
    listeners: Vec<Box<dyn GeneratorListener>>,
}

impl GeneratorStream {
    /// Create a stream whose block offsets start at zero.
    #[must_use]
    pub fn new(config: Configuration) -> Self {
        Self::with_base_offset(config, 0)
    }

    /// Create a stream whose block offsets start at `base_offset`.
    #[must_use]
    pub fn with_base_offset(config: Configuration, base_offset: u64) -> Self {
        let strong = config.strong_digest();
        let block_length = config.block_length();
        Self {
            config,
            strong,
            buffer: Vec::with_capacity(block_length),
            base_offset,
            offset: base_offset,
            seq: 0,
            listeners: Vec::new(),
        }
    }

    /// Register a listener.
    pub fn add_listener<L: GeneratorListener + 'static>(&mut self, listener: L) {
        self.listeners.push(Box::new(listener));
    }

    /// Drop all registered listeners.
    pub fn clear_listeners(&mut self) {
        self.listeners.clear();
    }

    /// Reset buffered data and counters, keeping listeners and the base
    /// offset.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.offset = self.base_offset;
        self.seq = 0;
    }

    /// Feed bytes into the stream.
    ///
    /// # Errors
    ///
    /// Propagates listener failures as a [`crate::SyncError::Listener`]
    /// chain.
    pub fn update(&mut self, mut input: &[u8]) -> Result<()> {
        let block_length = self.config.block_length();
        while !input.is_empty() {
            let take = (block_length - self.buffer.len()).min(input.len());
            self.buffer.extend_from_slice(&input[..take]);
            input = &input[take..];
            if self.buffer.len() == block_length {
                self.emit_block()?;
            }
        }
        Ok(())
    }

    /// Flush the final short block (if any bytes are buffered) and reset.
    ///
    /// # Errors
    ///
    /// Propagates listener failures.
    pub fn finish(&mut self) -> Result<()> {
        if !self.buffer.is_empty() {
            self.emit_block()?;
        }
        self.reset();
        Ok(())
    }

    fn emit_block(&mut self) -> Result<()> {
        let mut weak = self.config.weak_sum();
        weak.check(&self.buffer);
        let strong = self.config.strong_sum_of(&mut self.strong, &self.buffer);
        let sum = BlockChecksum::new(
            ChecksumPair::new(weak.value(), strong),
            self.offset,
            self.buffer.len() as u32,
            self.seq,
        );
        self.offset += self.buffer.len() as u64;
        self.seq += 1;
        self.buffer.clear();
        notify_all(&mut self.listeners, |listener| listener.block(&sum))
    }
}

/// One-shot checksum generation.
#[derive(Debug, Clone)]
pub struct Generator {
    config: Configuration,
}

impl Generator {
    /// Create a generator for the given configuration.
    #[must_use]
    pub fn new(config: Configuration) -> Self {
        Self { config }
    }

    /// Checksums for every block of `basis`, offsets starting at zero.
    #[must_use]
    pub fn checksums(&self, basis: &[u8]) -> Vec<BlockChecksum> {
        self.checksums_at(basis, 0)
    }

    /// Checksums for every block of `basis`, offsets starting at
    /// `base_offset`.
    ///
    /// Large inputs are hashed block-parallel; the output is identical to
    /// the streaming form either way.
    #[must_use]
    pub fn checksums_at(&self, basis: &[u8], base_offset: u64) -> Vec<BlockChecksum> {
        let block_length = self.config.block_length();
        let compute = |(i, block): (usize, &[u8])| {
            let mut weak = self.config.weak_sum();
            weak.check(block);
            let mut strong = self.config.strong_digest();
            let strong_sum = self.config.strong_sum_of(&mut strong, block);
            BlockChecksum::new(
                ChecksumPair::new(weak.value(), strong_sum),
                base_offset + (i * block_length) as u64,
                block.len() as u32,
                i as u32,
            )
        };
        if basis.len() > PARALLEL_THRESHOLD {
            basis.par_chunks(block_length).enumerate().map(compute).collect()
        } else {
            basis.chunks(block_length).enumerate().map(compute).collect()
        }
    }

    /// Checksums for every block read from `reader`.
    ///
    /// # Errors
    ///
    /// Propagates read failures.
    pub fn checksums_from_reader<R: Read>(&self, mut reader: R) -> Result<Vec<BlockChecksum>> {
        let mut basis = Vec::new();
        reader.read_to_end(&mut basis)?;
        Ok(self.checksums(&basis))
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Block lengths always sum to the basis length and offsets are
        /// contiguous.
        #[test]
        fn blocks_partition_exactly(
            data in prop::collection::vec(any::<u8>(), 0..5000),
            block_length in prop::sample::select(vec![1usize, 7, 100, 700])
        ) {
            let config = Configuration::builder()
                .block_length(block_length)
                .build()
                .unwrap();
            let sums = Generator::new(config).checksums(&data);

            let total: u64 = sums.iter().map(|s| u64::from(s.length)).sum();
            prop_assert_eq!(total, data.len() as u64);
            let mut offset = 0u64;
            for (i, sum) in sums.iter().enumerate() {
                prop_assert_eq!(sum.offset, offset);
                prop_assert_eq!(sum.seq, i as u32);
                if i + 1 < sums.len() {
                    prop_assert_eq!(sum.length as usize, block_length);
                } else {
                    prop_assert!(sum.length as usize <= block_length);
                    prop_assert!(sum.length > 0);
                }
                offset += u64::from(sum.length);
            }
        }

        /// Chunked feeding is equivalent to one-shot generation.
        #[test]
        fn feeding_pattern_is_irrelevant(
            data in prop::collection::vec(any::<u8>(), 0..2000),
            chunk in 1usize..64
        ) {
            let config = Configuration::builder().block_length(50).build().unwrap();
            let one_shot = Generator::new(config.clone()).checksums(&data);

            let collected = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
            let sink = std::rc::Rc::clone(&collected);
            let mut stream = GeneratorStream::new(config);
            stream.add_listener(move |sum: &BlockChecksum| {
                sink.borrow_mut().push(sum.clone());
                Ok(())
            });
            for piece in data.chunks(chunk) {
                stream.update(piece).unwrap();
            }
            stream.finish().unwrap();

            prop_assert_eq!(one_shot, collected.borrow().clone());
        }
    }
}
