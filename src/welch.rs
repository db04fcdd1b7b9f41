//! Welch spectrum estimation: window each block, take the one-sided FFT and sum the
//! squared magnitudes for every sensor.
//!
//! See <https://holometer.fnal.gov/GH_FFT.pdf> for a description of the techniques used here.

use num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::block::{Axis, Identity, SampleBlock, SensorType, SAMPLE_SZ};
use crate::error::{Condition, Diagnostics};
use crate::window::{Window, WindowCache};

/// Accumulators are kept apart for every sensor and block length, so that a sensor that
/// changes its block length mid-stream gets one spectrum per length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key {
    pub identity: Identity,
    pub len: usize,
}

/// Running sum of squared spectra for one sensor.
#[derive(Debug, Clone)]
pub struct Accumulator {
    pub sum: [Vec<f64>; SAMPLE_SZ],

    /// Number of blocks added.
    pub count: u32,
    pub freq: Vec<f64>,
    pub sample_rate_hz: f64,

    /// `S2` of the window used for this block length.
    pub s2: f64,

    rate_warned: bool,
}

impl Accumulator {
    fn new(len: usize, sample_rate_hz: f64, s2: f64) -> Accumulator {
        let nbins = len / 2 + 1;

        Accumulator {
            sum: [vec![0.; nbins], vec![0.; nbins], vec![0.; nbins]],
            count: 0,
            freq: rfft_freq(len, sample_rate_hz),
            sample_rate_hz,
            s2,
            rate_warned: false,
        }
    }

    pub fn nbins(&self) -> usize {
        self.freq.len()
    }
}

/// Frequencies of the one-sided FFT bins for `n` samples at `fs`.
pub fn rfft_freq(n: usize, fs: f64) -> Vec<f64> {
    (0..=n / 2).map(|k| k as f64 * fs / n as f64).collect()
}

/// Convert raw samples to physical units. Gyro samples are in radians and are converted to
/// degrees, which gives more meaningful magnitudes.
pub fn to_physical(sensor_type: SensorType, scale_factor: f64, raw: &[f64]) -> Vec<f64> {
    match sensor_type {
        SensorType::Gyro => raw.iter().map(|v| v.to_degrees() / scale_factor).collect(),
        _ => raw.iter().map(|v| v / scale_factor).collect(),
    }
}

/// The estimator state of a run: windows, FFT plans and accumulators.
pub struct Welch {
    window: Window,
    windows: HashMap<usize, WindowCache>,
    planner: FftPlanner<f64>,
    plans: HashMap<usize, Arc<dyn Fft<f64>>>,
    accumulators: BTreeMap<Key, Accumulator>,
    blocks: u64,
}

impl Welch {
    pub fn new(window: Window) -> Welch {
        Welch {
            window,
            windows: HashMap::new(),
            planner: FftPlanner::new(),
            plans: HashMap::new(),
            accumulators: BTreeMap::new(),
            blocks: 0,
        }
    }

    /// Blocks that contributed to any accumulator.
    pub fn blocks(&self) -> u64 {
        self.blocks
    }

    pub fn accumulators(&self) -> &BTreeMap<Key, Accumulator> {
        &self.accumulators
    }

    pub fn accumulator(&self, identity: Identity, len: usize) -> Option<&Accumulator> {
        self.accumulators.get(&Key { identity, len })
    }

    /// Squared magnitude spectrum of one axis of physical samples, with the DC and Nyquist
    /// bins zeroed. Returns `None` for an empty axis.
    pub fn spectrum(&mut self, mut v: Vec<f64>) -> Option<Vec<f64>> {
        let n = v.len();
        if n == 0 {
            return None;
        }

        let window = self.window;
        let w = self
            .windows
            .entry(n)
            .or_insert_with(|| WindowCache::new(window, n));

        w.apply(&mut v);

        let mut buf: Vec<Complex<f64>> = v.iter().map(|v| Complex::new(*v, 0.)).collect();

        let planner = &mut self.planner;
        let fft = self
            .plans
            .entry(n)
            .or_insert_with(|| planner.plan_fft_forward(n));
        fft.process(&mut buf);

        let mut spec = buf[..n / 2 + 1]
            .iter()
            .map(|c| c.norm_sqr())
            .collect::<Vec<_>>();

        // remove DC and Nyquist.
        let last = spec.len() - 1;
        spec[0] = 0.;
        spec[last] = 0.;

        Some(spec)
    }

    /// `S2` of the window for `n` samples, if it has been computed.
    pub fn s2(&self, n: usize) -> Option<f64> {
        self.windows.get(&n).map(|w| w.s2())
    }

    /// Add the spectra of all axes of a block to the accumulator of its sensor. Empty axes are
    /// reported and skipped.
    pub fn add(&mut self, block: &SampleBlock, diagnostics: &mut Diagnostics) {
        let n = block.len();
        let key = Key {
            identity: block.identity,
            len: n,
        };

        let mut contributed = false;

        for axis in Axis::ALL {
            let d = to_physical(
                block.identity.sensor_type,
                block.scale_factor,
                block.axis(axis),
            );

            let spec = match self.spectrum(d) {
                Some(spec) => spec,
                None => {
                    diagnostics.report(&Condition::EmptyAxisData {
                        identity: block.identity,
                        axis,
                        block_index: block.block_index,
                    });
                    continue;
                }
            };

            let s2 = self.windows[&n].s2();
            let acc = self.accumulators.entry(key).or_insert_with(|| {
                debug!("{}: new accumulator for blocks of {} samples", key.identity, n);
                Accumulator::new(n, block.sample_rate_hz, s2)
            });

            for (s, v) in acc.sum[axis.index()].iter_mut().zip(&spec) {
                *s += v;
            }

            contributed = true;
        }

        if contributed {
            if let Some(acc) = self.accumulators.get_mut(&key) {
                if acc.sample_rate_hz != block.sample_rate_hz && !acc.rate_warned {
                    warn!(
                        "{}: block {} has sample rate {} Hz, accumulator uses {} Hz",
                        block.identity, block.block_index, block.sample_rate_hz, acc.sample_rate_hz
                    );
                    acc.rate_warned = true;
                }

                acc.count += 1;
            }
            self.blocks += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    fn sine(n: usize, fs: f64, f: f64, a: f64) -> Vec<f64> {
        (0..n)
            .map(|i| a * (2. * PI * f * i as f64 / fs).sin())
            .collect()
    }

    fn block(identity: Identity, block_index: u32, v: Vec<f64>) -> SampleBlock {
        SampleBlock::new(identity, block_index, 1000., 1., [v.clone(), v.clone(), v])
    }

    #[test]
    fn frequencies() {
        let f = rfft_freq(256, 1000.);
        assert_eq!(f.len(), 129);
        assert_eq!(f[0], 0.);
        assert_eq!(f[128], 500.);
        assert_abs_diff_eq!(f[1], 1000. / 256., epsilon = 1e-12);

        let f = rfft_freq(5, 10.);
        assert_eq!(f, vec![0., 2., 4.]);
    }

    #[test]
    fn physical_units() {
        assert_eq!(to_physical(SensorType::Accel, 2., &[2., 4.]), vec![1., 2.]);
        let g = to_physical(SensorType::Gyro, 2., &[PI]);
        assert_abs_diff_eq!(g[0], 90., epsilon = 1e-12);
        assert_eq!(to_physical(SensorType::Unknown(4), 4., &[2.]), vec![0.5]);
    }

    #[test]
    fn dc_and_nyquist_are_zero() {
        let mut w = Welch::new(Window::Rectangular);

        let v = (0..64).map(|i| 1. + (i % 2) as f64).collect::<Vec<_>>();
        let s = w.spectrum(v).unwrap();
        assert_eq!(s.len(), 33);
        assert_eq!(s[0], 0.);
        assert_eq!(s[32], 0.);

        let s = w.spectrum(vec![3., 1., 4.]).unwrap();
        assert_eq!(s.len(), 2);
        assert_eq!(s, vec![0., 0.]);
    }

    #[test]
    fn peak_at_sine_frequency() {
        let mut w = Welch::new(Window::Hanning);
        let fs = 1000.;
        let v = sine(256, fs, 125., 1.);
        let s = w.spectrum(v).unwrap();

        let peak = s
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .unwrap()
            .0;
        assert_eq!(peak, 32);
        assert_abs_diff_eq!(rfft_freq(256, fs)[peak], 125., epsilon = 1e-9);
    }

    #[test]
    fn rectangular_bin_energy() {
        // a sine exactly on a bin has |X_k| = a n / 2.
        let mut w = Welch::new(Window::Rectangular);
        let s = w.spectrum(sine(128, 128., 16., 2.)).unwrap();
        assert_abs_diff_eq!(s[16], (2. * 128. / 2.) * (2. * 128. / 2.), epsilon = 1e-6);
        assert_abs_diff_eq!(s[15], 0., epsilon = 1e-6);
    }

    #[test]
    fn window_is_applied() {
        let v = sine(64, 1000., 90., 1.);

        let mut hann = Welch::new(Window::Hanning);
        let s = hann.spectrum(v.clone()).unwrap();

        let windowed = v
            .iter()
            .zip(Window::Hanning.coefficients(64))
            .map(|(v, c)| v * c)
            .collect::<Vec<_>>();
        let mut rect = Welch::new(Window::Rectangular);
        let r = rect.spectrum(windowed).unwrap();

        assert_abs_diff_eq!(s.as_slice(), r.as_slice(), epsilon = 1e-9);
        assert_abs_diff_eq!(hann.s2(64).unwrap(), 3. * 63. / 8., epsilon = 1e-9);
    }

    #[test]
    fn accumulate() {
        let id = Identity::new(SensorType::Accel, 0);
        let mut d = Diagnostics::default();
        let mut w = Welch::new(Window::Hanning);

        let v = sine(256, 1000., 50., 1.);
        w.add(&block(id, 1, v.clone()), &mut d);
        w.add(&block(id, 2, v.clone()), &mut d);

        let single = w.spectrum(v).unwrap();
        let acc = w.accumulator(id, 256).unwrap();
        assert_eq!(acc.count, 2);
        assert_eq!(acc.nbins(), 129);
        assert_eq!(acc.sample_rate_hz, 1000.);
        for (s, a) in single.iter().zip(&acc.sum[0]) {
            assert_abs_diff_eq!(2. * s, *a, epsilon = 1e-9);
        }
        assert_eq!(d.total(), 0);
        assert_eq!(w.blocks(), 2);
    }

    #[test]
    fn empty_block() {
        let id = Identity::new(SensorType::Gyro, 1);
        let mut d = Diagnostics::default();
        let mut w = Welch::new(Window::Hanning);

        w.add(&block(id, 1, vec![]), &mut d);
        assert_eq!(d.empty_axes, 3);
        assert!(w.accumulators().is_empty());
        assert_eq!(w.blocks(), 0);
    }

    #[test]
    fn separate_lengths() {
        let id = Identity::new(SensorType::Accel, 0);
        let mut d = Diagnostics::default();
        let mut w = Welch::new(Window::Blackman);

        w.add(&block(id, 1, sine(256, 1000., 50., 1.)), &mut d);
        w.add(&block(id, 2, sine(128, 1000., 50., 1.)), &mut d);

        assert_eq!(w.accumulators().len(), 2);
        assert_eq!(w.accumulator(id, 128).unwrap().nbins(), 65);
        assert_eq!(w.accumulator(id, 256).unwrap().count, 1);
        assert!(w.s2(128).unwrap() < w.s2(256).unwrap());
    }

    #[test]
    fn sample_rate_change() {
        let id = Identity::new(SensorType::Accel, 0);
        let mut d = Diagnostics::default();
        let mut w = Welch::new(Window::Hanning);

        let v = sine(64, 1000., 50., 1.);
        w.add(&block(id, 1, v.clone()), &mut d);
        let freq = w.accumulator(id, 64).unwrap().freq.clone();
        assert!(!w.accumulator(id, 64).unwrap().rate_warned);

        let slow = |block_index| {
            SampleBlock::new(id, block_index, 500., 1., [v.clone(), v.clone(), v.clone()])
        };

        w.add(&slow(2), &mut d);
        let acc = w.accumulator(id, 64).unwrap();
        assert_eq!(acc.count, 2);
        assert_eq!(acc.sample_rate_hz, 1000.);
        assert_eq!(acc.freq, freq);
        assert!(acc.rate_warned);

        // still accumulated, the flag stays set.
        w.add(&slow(3), &mut d);
        let acc = w.accumulator(id, 64).unwrap();
        assert_eq!(acc.count, 3);
        assert_eq!(acc.freq[32], 500.);
        assert!(acc.rate_warned);
        assert_eq!(w.accumulators().len(), 1);
        assert_eq!(d.total(), 0);
    }
}
