//! 50% window overlap between consecutive blocks of the same sensor.
//!
//! For every pair of consecutive blocks `P`, `B` of one sensor, a synthetic block made from
//! the second half of `P` and the first half of `B` is estimated as well. This recovers the
//! samples that the window attenuates at the block edges.

use std::collections::HashMap;

use crate::block::{Axes, Identity, SampleBlock};
use crate::error::Condition;

/// Keeps the most recently closed block for every sensor.
#[derive(Debug, Default)]
pub struct Overlap {
    previous: HashMap<Identity, SampleBlock>,
}

impl Overlap {
    pub fn new() -> Overlap {
        Overlap::default()
    }

    /// Register a newly closed block and return the overlapping block between it and the
    /// previous block of the same sensor. The new block always replaces the previous one, even
    /// when no overlap could be made.
    pub fn close(&mut self, block: &SampleBlock) -> Result<Option<SampleBlock>, Condition> {
        let overlap = match self.previous.get(&block.identity) {
            Some(prev) => synthesize(prev, block).map(Some),
            None => Ok(None),
        };

        self.previous.insert(block.identity, block.clone());

        overlap
    }
}

/// Join the second half of `prev` with the first half of `next`. The result carries the
/// metadata of `next`.
pub fn synthesize(prev: &SampleBlock, next: &SampleBlock) -> Result<SampleBlock, Condition> {
    let invalid = |reason: String| Condition::InvalidOverlapSequence { reason };

    if prev.identity != next.identity {
        return Err(invalid(format!(
            "sensor mismatch ({} vs {})",
            prev.identity, next.identity
        )));
    }

    if next.block_index <= prev.block_index {
        return Err(invalid(format!(
            "{}: block {} does not follow {}",
            next.identity, next.block_index, prev.block_index
        )));
    }

    if prev.len() != next.len() {
        return Err(invalid(format!(
            "{}: length of block {} ({}) differs from block {} ({})",
            next.identity,
            next.block_index,
            next.len(),
            prev.block_index,
            prev.len()
        )));
    }

    let n = next.len();
    if n == 0 || n % 2 != 0 {
        return Err(invalid(format!(
            "{}: block {} with {} samples cannot be split in two halves",
            next.identity, next.block_index, n
        )));
    }

    let half = n / 2;
    let axes: Axes = [0, 1, 2].map(|i| {
        let mut a = Vec::with_capacity(n);
        a.extend_from_slice(&prev.axes()[i][half..]);
        a.extend_from_slice(&next.axes()[i][..half]);
        a
    });

    trace!(
        "{}: overlap between block {} and {}",
        next.identity,
        prev.block_index,
        next.block_index
    );

    Ok(SampleBlock::new(
        next.identity,
        next.block_index,
        next.sample_rate_hz,
        next.scale_factor,
        axes,
    ))
}
