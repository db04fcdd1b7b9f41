//! Reassemble batch-sampled IMU blocks from a stream of header and body records and
//! estimate averaged (Welch) spectra for every sensor.
//!
//! The flow of a run is:
//!
//! records -> [`reassembly::Blocks`] -> [`overlap::Overlap`] -> [`welch::Welch`] -> [`normalize`]
//!
//! [`analysis::analyze`] drives all of it in a single pass.

#[macro_use]
extern crate log;

pub mod analysis;
pub mod block;
pub mod config;
pub mod error;
pub mod normalize;
pub mod overlap;
pub mod reassembly;
pub mod record;
pub mod welch;
pub mod window;

pub use analysis::{analyze, Analysis};
pub use block::{Axis, Identity, SampleBlock, SensorType};
pub use config::Config;
pub use error::{Condition, Diagnostics};
pub use normalize::{Spectrum, SpectrumSink};
pub use record::{Body, Header, Record};

/// Records between progress messages.
pub const PROGRESS_INTERVAL: u64 = 1000;
