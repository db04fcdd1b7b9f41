//! Non-fatal conditions reported while processing a stream.
//!
//! None of these abort a run. They are logged when they happen and tallied in
//! [`Diagnostics`] so that a caller can inspect what was skipped.

use serde::Serialize;
use thiserror::Error;

use crate::block::{Axis, Identity};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Condition {
    #[error("body record for block {block_index} with no open block")]
    NoOpenBlock { block_index: u32 },

    #[error("skipping body with wrong block index ({got} vs {open})")]
    BlockIndexMismatch { got: u32, open: u32 },

    #[error("skipping body ({seq}) for block {block_index} with holes in it")]
    TaintedBlock { block_index: u32, seq: u32 },

    #[error("body ({seq}) for block {block_index} has unequal axis lengths ({x}, {y}, {z})")]
    RaggedBody {
        block_index: u32,
        seq: u32,
        x: usize,
        y: usize,
        z: usize,
    },

    #[error("block {block_index} has holes in it: expected sequence {expected}, got {got}")]
    SequenceGap {
        block_index: u32,
        expected: u32,
        got: u32,
    },

    #[error("invalid sequence for window overlap: {reason}")]
    InvalidOverlapSequence { reason: String },

    #[error("no data for {identity} axis {axis} in block {block_index}")]
    EmptyAxisData {
        identity: Identity,
        axis: Axis,
        block_index: u32,
    },
}

impl Condition {
    /// Records that were dropped, as opposed to blocks or axes that were skipped.
    pub fn is_dropped_record(&self) -> bool {
        matches!(
            self,
            Condition::NoOpenBlock { .. }
                | Condition::BlockIndexMismatch { .. }
                | Condition::TaintedBlock { .. }
                | Condition::RaggedBody { .. }
        )
    }
}

/// Tally of conditions seen during a run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub dropped_records: u64,
    pub sequence_gaps: u64,
    pub invalid_overlaps: u64,
    pub empty_axes: u64,
}

impl Diagnostics {
    /// Log and count a condition.
    pub fn report(&mut self, c: &Condition) {
        warn!("{}", c);

        match c {
            Condition::SequenceGap { .. } => self.sequence_gaps += 1,
            Condition::InvalidOverlapSequence { .. } => self.invalid_overlaps += 1,
            Condition::EmptyAxisData { .. } => self.empty_axes += 1,
            c => {
                debug_assert!(c.is_dropped_record());
                self.dropped_records += 1
            }
        }
    }

    pub fn total(&self) -> u64 {
        self.dropped_records + self.sequence_gaps + self.invalid_overlaps + self.empty_axes
    }

    pub fn merge(&mut self, other: &Diagnostics) {
        self.dropped_records += other.dropped_records;
        self.sequence_gaps += other.sequence_gaps;
        self.invalid_overlaps += other.invalid_overlaps;
        self.empty_axes += other.empty_axes;
    }
}
