//! Delta instructions.
//!
//! A delta is one of two things: a block of new bytes and the offset to
//! write them at, or a pair of offsets describing basis bytes that moved.
//! A matcher emits deltas in ascending write-offset order, tiling the
//! target exactly once.

use serde::{Deserialize, Serialize};

/// A single edit instruction against a basis.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Delta {
    /// Inject `data` at `write_offset` in the target.
    Literal {
        /// The bytes to insert.
        data: Vec<u8>,
        /// Destination offset in the target.
        write_offset: u64,
    },
    /// Copy `length` basis bytes starting at `old_offset` to `new_offset`
    /// in the target.
    Copy {
        /// Source offset in the basis.
        old_offset: u64,
        /// Destination offset in the target.
        new_offset: u64,
        /// Number of bytes to copy.
        length: u32,
    },
}

impl Delta {
    /// Create a literal instruction.
    #[must_use]
    pub fn literal(write_offset: u64, data: impl Into<Vec<u8>>) -> Self {
        Self::Literal {
            data: data.into(),
            write_offset,
        }
    }

    /// Create a copy instruction.
    #[must_use]
    pub const fn copy(old_offset: u64, new_offset: u64, length: u32) -> Self {
        Self::Copy {
            old_offset,
            new_offset,
            length,
        }
    }

    /// The destination position of this instruction in the target.
    #[must_use]
    pub const fn write_offset(&self) -> u64 {
        match self {
            Self::Literal { write_offset, .. } => *write_offset,
            Self::Copy { new_offset, .. } => *new_offset,
        }
    }

    /// The number of target bytes this instruction produces.
    #[must_use]
    pub fn block_length(&self) -> usize {
        match self {
            Self::Literal { data, .. } => data.len(),
            Self::Copy { length, .. } => *length as usize,
        }
    }

    /// Whether this is a copy instruction.
    #[must_use]
    pub const fn is_copy(&self) -> bool {
        matches!(self, Self::Copy { .. })
    }

    /// Whether this is a literal instruction.
    #[must_use]
    pub const fn is_literal(&self) -> bool {
        matches!(self, Self::Literal { .. })
    }
}

impl std::fmt::Debug for Delta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Literal { data, write_offset } => {
                write!(f, "Literal(write_offset={write_offset}, len={})", data.len())
            }
            Self::Copy {
                old_offset,
                new_offset,
                length,
            } => write!(f, "Copy(old={old_offset}, new={new_offset}, len={length})"),
        }
    }
}

/// Aggregate statistics over a delta sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeltaStats {
    /// Number of copy instructions.
    pub copy_ops: usize,
    /// Number of literal instructions.
    pub literal_ops: usize,
    /// Total bytes copied from the basis.
    pub bytes_copied: u64,
    /// Total literal bytes carried inline.
    pub bytes_literal: u64,
}

impl DeltaStats {
    /// Compute statistics over a delta sequence.
    #[must_use]
    pub fn from_deltas(deltas: &[Delta]) -> Self {
        let mut stats = Self::default();
        for delta in deltas {
            match delta {
                Delta::Copy { length, .. } => {
                    stats.copy_ops += 1;
                    stats.bytes_copied += u64::from(*length);
                }
                Delta::Literal { data, .. } => {
                    stats.literal_ops += 1;
                    stats.bytes_literal += data.len() as u64;
                }
            }
        }
        stats
    }

    /// Total target bytes the sequence produces.
    #[must_use]
    pub const fn output_len(&self) -> u64 {
        self.bytes_copied + self.bytes_literal
    }
}
