//! Reassembled sample blocks.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of axes per sample.
pub const SAMPLE_SZ: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum SensorType {
    Accel,
    Gyro,
    Unknown(u8),
}

impl SensorType {
    pub fn prefix(&self) -> &'static str {
        match self {
            SensorType::Accel => "Accel",
            SensorType::Gyro => "Gyro",
            SensorType::Unknown(_) => "?Unknown Sensor Type?",
        }
    }
}

impl From<u8> for SensorType {
    fn from(v: u8) -> SensorType {
        match v {
            0 => SensorType::Accel,
            1 => SensorType::Gyro,
            v => SensorType::Unknown(v),
        }
    }
}

impl From<SensorType> for u8 {
    fn from(t: SensorType) -> u8 {
        match t {
            SensorType::Accel => 0,
            SensorType::Gyro => 1,
            SensorType::Unknown(v) => v,
        }
    }
}

/// Identifies one physical sensor. All grouping (overlap, averaging) is done on this key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub sensor_type: SensorType,
    pub instance: u8,
}

impl Identity {
    pub fn new(sensor_type: SensorType, instance: u8) -> Identity {
        Identity {
            sensor_type,
            instance,
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.sensor_type.prefix(), self.instance)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; SAMPLE_SZ] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(&self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
        };
        f.write_str(s)
    }
}

/// Samples for the X, Y and Z axis. All three always have the same length.
pub type Axes = [Vec<f64>; SAMPLE_SZ];

/// A closed block of samples from one sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBlock {
    pub identity: Identity,

    /// Reassembly epoch assigned by the source.
    pub block_index: u32,
    pub sample_rate_hz: f64,

    /// Raw samples are divided by this to get physical units.
    pub scale_factor: f64,

    /// A sequence gap was seen while collecting, the samples stop at the gap.
    pub tainted: bool,

    axes: Axes,
}

impl SampleBlock {
    /// Panics if the axes do not have the same length.
    pub fn new(
        identity: Identity,
        block_index: u32,
        sample_rate_hz: f64,
        scale_factor: f64,
        axes: Axes,
    ) -> SampleBlock {
        assert!(
            axes.iter().all(|a| a.len() == axes[0].len()),
            "axes must have equal length"
        );

        SampleBlock {
            identity,
            block_index,
            sample_rate_hz,
            scale_factor,
            tainted: false,
            axes,
        }
    }

    pub fn axis(&self, axis: Axis) -> &[f64] {
        &self.axes[axis.index()]
    }

    pub fn axes(&self) -> &Axes {
        &self.axes
    }

    /// Number of samples in each axis.
    pub fn len(&self) -> usize {
        self.axes[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The block currently being reassembled.
#[derive(Debug)]
pub struct BlockBuilder {
    identity: Identity,
    block_index: u32,
    sample_rate_hz: f64,
    scale_factor: f64,

    pub(crate) next_seq: u32,
    pub(crate) tainted: bool,

    axes: Axes,
}

impl BlockBuilder {
    pub fn new(
        identity: Identity,
        block_index: u32,
        sample_rate_hz: f64,
        scale_factor: f64,
    ) -> BlockBuilder {
        BlockBuilder {
            identity,
            block_index,
            sample_rate_hz,
            scale_factor,
            next_seq: 0,
            tainted: false,
            axes: Default::default(),
        }
    }

    pub fn identity(&self) -> Identity {
        self.identity
    }

    pub fn block_index(&self) -> u32 {
        self.block_index
    }

    /// Append one sample triplet of equal length slices. Only the reassembler may do this,
    /// after it has checked the sequence number.
    pub(crate) fn extend(&mut self, x: &[f64], y: &[f64], z: &[f64]) {
        debug_assert!(x.len() == y.len() && y.len() == z.len());

        self.axes[0].extend_from_slice(x);
        self.axes[1].extend_from_slice(y);
        self.axes[2].extend_from_slice(z);
        self.next_seq += 1;
    }

    pub fn finish(self) -> SampleBlock {
        SampleBlock {
            identity: self.identity,
            block_index: self.block_index,
            sample_rate_hz: self.sample_rate_hz,
            scale_factor: self.scale_factor,
            tainted: self.tainted,
            axes: self.axes,
        }
    }
}
