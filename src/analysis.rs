//! Single pass over a record stream: reassemble, overlap, estimate and normalize.

use std::time::{Duration, Instant};

use crate::config::Config;
use crate::error::Diagnostics;
use crate::normalize::{self, Spectrum, SpectrumSink};
use crate::overlap::Overlap;
use crate::reassembly::Blocks;
use crate::record::Record;
use crate::welch::Welch;

/// Result of a run.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub spectra: Vec<Spectrum>,
    pub diagnostics: Diagnostics,

    /// Records consumed.
    pub records: u64,

    /// Blocks closed by the reassembler.
    pub blocks: u64,

    /// Overlapping blocks synthesized between consecutive blocks.
    pub overlaps: u64,
    pub elapsed: Duration,
}

impl Analysis {
    /// Blocks estimated, original and synthesized.
    pub fn data_sets(&self) -> u64 {
        self.blocks + self.overlaps
    }

    pub fn emit(self, sink: &mut impl SpectrumSink) -> eyre::Result<()> {
        for s in self.spectra {
            sink.emit(s)?;
        }

        Ok(())
    }
}

/// Run the full estimation over `records`. The record source is consumed in order and the
/// spectra are produced once it ends.
pub fn analyze(records: impl IntoIterator<Item = Record>, config: &Config) -> Analysis {
    let start = Instant::now();

    let mut blocks = Blocks::new(records);
    let mut overlap = Overlap::new();
    let mut welch = Welch::new(config.window);
    let mut diagnostics = Diagnostics::default();

    let mut nblocks = 0;
    let mut noverlaps = 0;

    for block in blocks.by_ref() {
        nblocks += 1;

        if config.overlap {
            match overlap.close(&block) {
                Ok(Some(o)) => {
                    welch.add(&o, &mut diagnostics);
                    noverlaps += 1;
                }
                Ok(None) => (),
                Err(c) => diagnostics.report(&c),
            }
        }

        welch.add(&block, &mut diagnostics);
    }

    let records = blocks.records();
    diagnostics.merge(blocks.diagnostics());

    let elapsed = start.elapsed();
    let rate = records as f64 / elapsed.as_secs_f64().max(1e-9);
    info!("{} messages, {:.0} messages/second", records, rate);
    info!("Extracted {} fft data sets", nblocks + noverlaps);

    if diagnostics.total() > 0 {
        warn!("{:?}", diagnostics);
    }

    let spectra = normalize::normalize(welch.accumulators(), config.output, config.scale);

    Analysis {
        spectra,
        diagnostics,
        records,
        blocks: nblocks,
        overlaps: noverlaps,
        elapsed,
    }
}
