//! Turn accumulated spectra into averaged power or linear spectral densities.

use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::block::{Axis, Identity, SensorType};
use crate::welch::{Accumulator, Key};

/// Power or linear (amplitude) spectral density.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Output {
    #[default]
    Psd,
    Lsd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scale {
    #[default]
    Db,
    Linear,
}

impl FromStr for Output {
    type Err = String;

    fn from_str(s: &str) -> Result<Output, String> {
        match s.to_ascii_lowercase().as_str() {
            "psd" => Ok(Output::Psd),
            "lsd" => Ok(Output::Lsd),
            _ => Err(format!("unknown output: {} (expected psd or lsd)", s)),
        }
    }
}

impl FromStr for Scale {
    type Err = String;

    fn from_str(s: &str) -> Result<Scale, String> {
        match s.to_ascii_lowercase().as_str() {
            "db" => Ok(Scale::Db),
            "linear" => Ok(Scale::Linear),
            _ => Err(format!("unknown scale: {} (expected db or linear)", s)),
        }
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Output::Psd => "PSD",
            Output::Lsd => "LSD",
        })
    }
}

/// Unit of the magnitudes for a sensor, output and scale.
pub fn unit_label(sensor_type: SensorType, output: Output, scale: Scale) -> String {
    let unit = match (sensor_type, output) {
        (SensorType::Gyro, Output::Psd) => "d^2/s^2/Hz",
        (SensorType::Gyro, Output::Lsd) => "d/s/sqrt(Hz)",
        (_, Output::Psd) => "m^2/s^4/Hz",
        (_, Output::Lsd) => "m/s^2/sqrt(Hz)",
    };

    match scale {
        Scale::Db => format!("{} dB {}", output, unit),
        Scale::Linear => format!("{} {}", output, unit),
    }
}

/// Final spectrum of one axis of one sensor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Spectrum {
    pub identity: Identity,
    pub label: String,
    pub axis: Axis,

    /// Samples per block.
    pub block_len: usize,

    /// Number of blocks averaged.
    pub count: u32,
    pub unit: String,
    pub frequencies: Vec<f64>,

    /// JSON has no -inf or NaN, these are written as the strings `"-inf"`, `"inf"` and `"NaN"`.
    #[serde(serialize_with = "non_finite_as_str")]
    pub values: Vec<f64>,
}

fn non_finite_as_str<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
    let mut seq = serializer.serialize_seq(Some(values.len()))?;
    for v in values {
        match v {
            v if v.is_finite() => seq.serialize_element(v)?,
            v if v.is_nan() => seq.serialize_element("NaN")?,
            v if *v > 0. => seq.serialize_element("inf")?,
            _ => seq.serialize_element("-inf")?,
        }
    }
    seq.end()
}

/// Receives the final spectra after the stream has ended.
pub trait SpectrumSink {
    fn emit(&mut self, spectrum: Spectrum) -> eyre::Result<()>;
}

impl SpectrumSink for Vec<Spectrum> {
    fn emit(&mut self, spectrum: Spectrum) -> eyre::Result<()> {
        self.push(spectrum);
        Ok(())
    }
}

/// Averaged power spectral density of one axis:
///
/// `2 * (sum / count) / (fs * S2)`
///
/// The factor 2 folds the negative frequencies onto the one-sided spectrum.
pub fn psd(acc: &Accumulator, axis: Axis) -> Vec<f64> {
    let count = acc.count as f64;
    let norm = acc.sample_rate_hz * acc.s2;

    acc.sum[axis.index()]
        .iter()
        .map(|s| 2. * (s / count) / norm)
        .collect()
}

/// Convert PSD values to the requested output and scale. Zero gives -inf and negative values
/// NaN in dB, these are passed on as they are.
pub fn scale(mut v: Vec<f64>, output: Output, scale: Scale) -> Vec<f64> {
    if output == Output::Lsd {
        v.iter_mut().for_each(|v| *v = v.sqrt());
    }

    if scale == Scale::Db {
        v.iter_mut().for_each(|v| *v = 10. * v.log10());
    }

    v
}

/// Normalize all accumulators with blocks in them, in sensor order with axes X, Y, Z.
pub fn normalize(
    accumulators: &BTreeMap<Key, Accumulator>,
    output: Output,
    scale_: Scale,
) -> Vec<Spectrum> {
    // sensors with more than one block length get the length in the label.
    let mut lengths: HashMap<Identity, usize> = HashMap::new();
    for k in accumulators.keys() {
        *lengths.entry(k.identity).or_default() += 1;
    }

    let mut out = Vec::with_capacity(accumulators.len() * Axis::ALL.len());

    for (key, acc) in accumulators.iter().filter(|(_, a)| a.count > 0) {
        let label = if lengths[&key.identity] > 1 {
            format!("{} (N={})", key.identity, key.len)
        } else {
            key.identity.to_string()
        };

        info!("Sensor: {} ({} blocks)", label, acc.count);

        for axis in Axis::ALL {
            let values = scale(psd(acc, axis), output, scale_);

            out.push(Spectrum {
                identity: key.identity,
                label: label.clone(),
                axis,
                block_len: key.len,
                count: acc.count,
                unit: unit_label(key.identity.sensor_type, output, scale_),
                frequencies: acc.freq.clone(),
                values,
            });
        }
    }

    out
}
