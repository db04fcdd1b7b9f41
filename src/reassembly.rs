//! Stitch header and body records into contiguous sample blocks.
//!
//! A header opens a block, bodies with the same block index are appended in sequence order
//! and the next header (or the end of the stream) closes it. A skipped sequence number
//! taints the block: the samples collected so far are kept, everything after is dropped.

use crate::block::{BlockBuilder, SampleBlock};
use crate::error::{Condition, Diagnostics};
use crate::record::{Body, Header, Record};

#[derive(Debug, Default)]
pub struct Reassembler {
    open: Option<BlockBuilder>,
}

impl Reassembler {
    pub fn new() -> Reassembler {
        Reassembler { open: None }
    }

    /// Feed the next record. Returns the block closed by a header, if there was one open.
    pub fn push(&mut self, record: Record) -> Result<Option<SampleBlock>, Condition> {
        match record {
            Record::Header(h) => Ok(self.header(h)),
            Record::Body(b) => self.body(b).map(|_| None),
        }
    }

    /// Close the open block at the end of the stream.
    pub fn finish(&mut self) -> Option<SampleBlock> {
        self.open.take().map(close)
    }

    fn header(&mut self, h: Header) -> Option<SampleBlock> {
        trace!("header: {:?}", h);
        let closed = self.open.take().map(close);

        self.open = Some(BlockBuilder::new(
            h.identity(),
            h.block_index,
            h.sample_rate_hz,
            h.scale_factor,
        ));

        closed
    }

    fn body(&mut self, b: Body) -> Result<(), Condition> {
        let block = match self.open.as_mut() {
            Some(block) => block,
            None => {
                return Err(Condition::NoOpenBlock {
                    block_index: b.block_index,
                })
            }
        };

        if b.block_index != block.block_index() {
            return Err(Condition::BlockIndexMismatch {
                got: b.block_index,
                open: block.block_index(),
            });
        }

        if block.tainted {
            return Err(Condition::TaintedBlock {
                block_index: b.block_index,
                seq: b.seq,
            });
        }

        if b.seq != block.next_seq {
            block.tainted = true;
            return Err(Condition::SequenceGap {
                block_index: b.block_index,
                expected: block.next_seq,
                got: b.seq,
            });
        }

        if b.x.len() != b.y.len() || b.y.len() != b.z.len() {
            return Err(Condition::RaggedBody {
                block_index: b.block_index,
                seq: b.seq,
                x: b.x.len(),
                y: b.y.len(),
                z: b.z.len(),
            });
        }

        trace!("body: {} ({}): {} samples", b.block_index, b.seq, b.x.len());
        block.extend(&b.x, &b.y, &b.z);

        Ok(())
    }
}

fn close(b: BlockBuilder) -> SampleBlock {
    let b = b.finish();
    debug!(
        "closing block {} for {}: {} samples{}",
        b.block_index,
        b.identity,
        b.len(),
        if b.tainted { " (tainted)" } else { "" }
    );
    b
}

/// Lazy sequence of closed blocks over a record source. Conditions are reported to the
/// diagnostics and otherwise skipped. Not restartable: once the records end the open block is
/// closed and the iterator is exhausted.
pub struct Blocks<I: Iterator<Item = Record>> {
    records: I,
    reassembler: Reassembler,
    diagnostics: Diagnostics,
    count: u64,
    done: bool,
}

impl<I: Iterator<Item = Record>> Blocks<I> {
    pub fn new(records: impl IntoIterator<Item = Record, IntoIter = I>) -> Blocks<I> {
        Blocks {
            records: records.into_iter(),
            reassembler: Reassembler::new(),
            diagnostics: Diagnostics::default(),
            count: 0,
            done: false,
        }
    }

    /// Records consumed so far.
    pub fn records(&self) -> u64 {
        self.count
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }
}

impl<I: Iterator<Item = Record>> Iterator for Blocks<I> {
    type Item = SampleBlock;

    fn next(&mut self) -> Option<SampleBlock> {
        if self.done {
            return None;
        }

        for r in self.records.by_ref() {
            self.count += 1;
            if self.count % crate::PROGRESS_INTERVAL == 0 {
                debug!("processed {} records..", self.count);
            }

            match self.reassembler.push(r) {
                Ok(Some(block)) => return Some(block),
                Ok(None) => (),
                Err(c) => self.diagnostics.report(&c),
            }
        }

        self.done = true;
        self.reassembler.finish()
    }
}
