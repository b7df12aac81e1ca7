//! Block matching: turning a target byte stream into a delta.
//!
//! The index search is the expensive half of the rsync algorithm, and it
//! is often undesirable to wait for a whole target before sending deltas.
//! [`MatcherStream`] therefore emits each [`Delta`] to its listeners the
//! moment it is known; [`Matcher`] is the collecting convenience on top.

use std::io::Read;

use tracing::trace;

use crate::checksum::Checksum32;
use crate::config::Configuration;
use crate::delta::Delta;
use crate::error::{notify_all, ListenerError, Result};
use crate::hash::StrongDigest;
use crate::index::BlockIndex;
use crate::sums::{BlockChecksum, ChecksumPair};

/// Receives [`Delta`] events in non-decreasing write-offset order.
///
/// Any `FnMut(&Delta) -> Result<(), ListenerError>` closure is a listener.
pub trait MatcherListener {
    /// Called for each emitted delta. The literal preceding a match is
    /// always delivered before the copy for that match.
    ///
    /// # Errors
    ///
    /// A listener may fail; failures from all listeners of one emission
    /// cycle are collected into a [`crate::ListenerFailures`] chain.
    fn delta(&mut self, delta: &Delta) -> std::result::Result<(), ListenerError>;
}

impl<F> MatcherListener for F
where
    F: FnMut(&Delta) -> std::result::Result<(), ListenerError>,
{
    fn delta(&mut self, delta: &Delta) -> std::result::Result<(), ListenerError> {
        self(delta)
    }
}

/// Streaming block matcher.
///
/// Call [`set_checksums`](Self::set_checksums) with the basis block sums,
/// register at least one listener, feed target bytes through
/// [`update`](Self::update), and call [`finish`](Self::finish) to flush
/// the residue. Emitted literals and copies tile the target exactly once,
/// in ascending write-offset order.
pub struct MatcherStream {
    config: Configuration,
    index: BlockIndex<u64>,
    weak: Checksum32,
    strong: StrongDigest,
    /// Holds unmatched target bytes plus the current rolling window.
    buffer: Vec<u8>,
    /// Bytes currently held in `buffer` since the last emission boundary.
    ndx: usize,
    /// Total target bytes consumed.
    count: u64,
    listeners: Vec<Box<dyn MatcherListener>>,
}

impl MatcherStream {
    /// Create a matcher stream for the given configuration.
    #[must_use]
    pub fn new(config: Configuration) -> Self {
        let weak = config.weak_sum();
        let strong = config.strong_digest();
        let buffer = vec![0u8; config.chunk_size()];
        Self {
            config,
            index: BlockIndex::new(),
            weak,
            strong,
            buffer,
            ndx: 0,
            count: 0,
            listeners: Vec::new(),
        }
    }

    /// Register a listener.
    pub fn add_listener<L: MatcherListener + 'static>(&mut self, listener: L) {
        self.listeners.push(Box::new(listener));
    }

    /// Drop all registered listeners.
    pub fn clear_listeners(&mut self) {
        self.listeners.clear();
    }

    /// Replace the set of basis checksums searched by this matcher.
    ///
    /// Must be called before [`update`](Self::update). When several blocks
    /// share a `(weak, strong)` pair the last one wins; the blocks are
    /// byte-identical, so either offset is a valid copy source.
    pub fn set_checksums<I: IntoIterator<Item = BlockChecksum>>(&mut self, sums: I) {
        self.index.clear();
        for sum in sums {
            self.index.insert(sum.pair, sum.offset);
        }
    }

    /// Reset counters and drop the checksum set, ready for another target.
    pub fn reset(&mut self) {
        self.ndx = 0;
        self.count = 0;
        self.index.clear();
    }

    /// Feed target bytes into the matcher.
    ///
    /// # Errors
    ///
    /// Propagates listener failures as a [`crate::SyncError::Listener`]
    /// chain.
    pub fn update(&mut self, input: &[u8]) -> Result<()> {
        let block_length = self.config.block_length();
        let chunk_size = self.config.chunk_size();
        for &byte in input {
            self.buffer[self.ndx] = byte;
            self.ndx += 1;
            self.count += 1;
            if self.ndx < block_length {
                // No full window since the last emission boundary yet.
                continue;
            }
            if self.ndx == block_length {
                self.weak.check(&self.buffer[..block_length]);
            } else {
                self.weak.roll(byte);
            }
            let window_start = self.ndx - block_length;
            let matched = Self::hash_search(
                &self.config,
                &self.index,
                &mut self.strong,
                self.weak.value(),
                &self.buffer[window_start..self.ndx],
            );
            if let Some(old_offset) = matched {
                let mut events = Vec::with_capacity(2);
                if self.ndx > block_length {
                    // Bytes that preceded the match and were never absorbed
                    // by an earlier one.
                    events.push(Delta::literal(
                        self.count - self.ndx as u64,
                        self.buffer[..window_start].to_vec(),
                    ));
                }
                events.push(Delta::copy(
                    old_offset,
                    self.count - block_length as u64,
                    block_length as u32,
                ));
                Self::emit(&mut self.listeners, &events)?;
                self.ndx = 0;
            } else if self.ndx == chunk_size {
                // Buffer exhausted: flush everything except the trailing
                // block_length - 1 bytes, which the next byte may complete
                // into a match.
                let keep = block_length - 1;
                let flush = chunk_size - keep;
                let literal = Delta::literal(
                    self.count - self.ndx as u64,
                    self.buffer[..flush].to_vec(),
                );
                Self::emit(&mut self.listeners, std::slice::from_ref(&literal))?;
                self.buffer.copy_within(flush.., 0);
                self.ndx = keep;
            }
        }
        Ok(())
    }

    /// Flush buffered residue, attempting one final (possibly short) match,
    /// then reset.
    ///
    /// # Errors
    ///
    /// Propagates listener failures.
    pub fn finish(&mut self) -> Result<()> {
        if self.ndx > 0 {
            let block_length = self.config.block_length();
            let off = self.ndx.saturating_sub(block_length);
            let len = self.ndx.min(block_length);
            self.weak.check(&self.buffer[off..off + len]);
            let matched = Self::hash_search(
                &self.config,
                &self.index,
                &mut self.strong,
                self.weak.value(),
                &self.buffer[off..off + len],
            );
            let mut events = Vec::with_capacity(2);
            if let Some(old_offset) = matched {
                if off > 0 {
                    events.push(Delta::literal(
                        self.count - self.ndx as u64,
                        self.buffer[..off].to_vec(),
                    ));
                }
                events.push(Delta::copy(old_offset, self.count - len as u64, len as u32));
            } else {
                events.push(Delta::literal(
                    self.count - self.ndx as u64,
                    self.buffer[..self.ndx].to_vec(),
                ));
            }
            Self::emit(&mut self.listeners, &events)?;
        }
        self.reset();
        Ok(())
    }

    /// Probe the index for the current window, computing the strong sum
    /// only when the weak probe signals a likely hit.
    fn hash_search(
        config: &Configuration,
        index: &BlockIndex<u64>,
        strong: &mut StrongDigest,
        weak: u32,
        window: &[u8],
    ) -> Option<u64> {
        if !index.contains_weak(weak) {
            return None;
        }
        trace!("hash hit on weak key {:08x}", weak);
        let strong_sum = config.strong_sum_of(strong, window);
        let found = index.lookup(&ChecksumPair::new(weak, strong_sum)).copied();
        trace!("strong lookup returned {:?}", found);
        found
    }

    /// Deliver one emission cycle to every listener. A listener that fails
    /// skips its remaining events; other listeners still see all of them.
    fn emit(listeners: &mut [Box<dyn MatcherListener>], events: &[Delta]) -> Result<()> {
        notify_all(listeners, |listener| {
            for event in events {
                listener.delta(event)?;
            }
            Ok(())
        })
    }
}

/// One-shot matcher collecting the ordered delta sequence.
#[derive(Debug, Clone)]
pub struct Matcher {
    config: Configuration,
}

impl Matcher {
    /// Create a matcher for the given configuration.
    #[must_use]
    pub fn new(config: Configuration) -> Self {
        Self { config }
    }

    /// Compute the delta turning the basis described by `sums` into
    /// `target`.
    ///
    /// # Errors
    ///
    /// Never fails on in-memory input; the `Result` carries listener
    /// failures for parity with the streaming form.
    pub fn deltas(&self, sums: Vec<BlockChecksum>, target: &[u8]) -> Result<Vec<Delta>> {
        self.collect(sums, |stream| stream.update(target))
    }

    /// Compute the delta for a target read in chunks from `reader`.
    ///
    /// # Errors
    ///
    /// Propagates read failures.
    pub fn deltas_from_reader<R: Read>(
        &self,
        sums: Vec<BlockChecksum>,
        mut reader: R,
    ) -> Result<Vec<Delta>> {
        self.collect(sums, |stream| {
            let mut buf = [0u8; 8192];
            loop {
                let n = reader.read(&mut buf)?;
                if n == 0 {
                    return Ok(());
                }
                stream.update(&buf[..n])?;
            }
        })
    }

    fn collect(
        &self,
        sums: Vec<BlockChecksum>,
        feed: impl FnOnce(&mut MatcherStream) -> Result<()>,
    ) -> Result<Vec<Delta>> {
        use std::cell::RefCell;
        use std::rc::Rc;

        let collected = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&collected);
        let mut stream = MatcherStream::new(self.config.clone());
        stream.set_checksums(sums);
        stream.add_listener(move |delta: &Delta| {
            sink.borrow_mut().push(delta.clone());
            Ok(())
        });
        feed(&mut stream)?;
        stream.finish()?;
        drop(stream);
        Ok(Rc::try_unwrap(collected)
            .unwrap_or_default()
            .into_inner())
    }
}
