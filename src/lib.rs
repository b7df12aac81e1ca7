//! # Rollsync
//!
//! Content synchronization implementing the rsync algorithm in pure Rust.
//!
//! Given a *basis* byte sequence known to one party and a *target* known to
//! the other, rollsync computes a compact delta from which the basis-holding
//! party reconstructs the target:
//!
//! - **[`Generator`]** partitions the basis into blocks and computes, for
//!   each, a fast 32-bit rolling checksum plus a truncated strong digest.
//! - **[`Matcher`]** scans the target with a rolling window, consults a
//!   two-level hash index of the basis sums, and emits literal and copy
//!   instructions.
//! - **[`rebuilder`]** replays a delta against the basis, out-of-place or
//!   in-place (where overlapping copies are dependency-ordered and cycles
//!   are broken by materializing their bytes up front).
//!
//! ## Example
//!
//! ```rust
//! use rollsync::{rebuilder, Configuration, Generator, Matcher};
//!
//! let config = Configuration::builder().block_length(8).build().unwrap();
//!
//! let basis = b"the quick brown fox jumps over the lazy dog";
//! let target = b"the quick red fox jumps over the lazy dog!";
//!
//! // Basis side: checksums travel to the target side.
//! let sums = Generator::new(config.clone()).checksums(basis);
//!
//! // Target side: the delta travels back.
//! let deltas = Matcher::new(config).deltas(sums, target).unwrap();
//!
//! // Basis side: reconstruct the target.
//! let rebuilt = rebuilder::rebuild(basis, &deltas).unwrap();
//! assert_eq!(rebuilt, target);
//! ```
//!
//! Streaming forms ([`GeneratorStream`], [`MatcherStream`],
//! [`RebuilderStream`]) emit events to listeners as soon as they are known,
//! for pipelines where waiting on whole inputs is undesirable.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

mod checksum;
mod config;
mod delta;
pub mod encoding;
mod error;
mod generator;
mod hash;
mod index;
mod matcher;
pub mod rebuilder;
mod sums;

pub use checksum::Checksum32;
pub use config::{Configuration, ConfigurationBuilder, DEFAULT_BLOCK_LENGTH, DEFAULT_CHUNK_SIZE};
pub use delta::{Delta, DeltaStats};
pub use error::{ListenerError, ListenerFailures, Result, SyncError};
pub use generator::{Generator, GeneratorListener, GeneratorStream};
pub use hash::{StrongDigest, StrongDigestAlgorithm};
pub use index::BlockIndex;
pub use matcher::{Matcher, MatcherListener, MatcherStream};
pub use rebuilder::{RebuilderEvent, RebuilderListener, RebuilderStream};
pub use sums::{BlockChecksum, ChecksumPair};
