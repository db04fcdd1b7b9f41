//! Window functions applied to each block before the FFT.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Window {
    #[default]
    Hanning,
    Blackman,

    /// All ones.
    #[serde(rename = "none", alias = "rectangular")]
    Rectangular,
}

impl Window {
    /// Symmetric window coefficients of length `n`.
    pub fn coefficients(&self, n: usize) -> Vec<f64> {
        if n == 1 {
            return vec![1.0];
        }

        let m = (n as f64) - 1.;

        (0..n)
            .map(|i| {
                let x = i as f64 / m;
                match self {
                    Window::Hanning => 0.5 - 0.5 * (2. * PI * x).cos(),
                    Window::Blackman => {
                        0.42 - 0.5 * (2. * PI * x).cos() + 0.08 * (4. * PI * x).cos()
                    }
                    Window::Rectangular => 1.0,
                }
            })
            .collect()
    }
}

impl FromStr for Window {
    type Err = String;

    fn from_str(s: &str) -> Result<Window, String> {
        match s.to_ascii_lowercase().as_str() {
            "hanning" | "hann" => Ok(Window::Hanning),
            "blackman" => Ok(Window::Blackman),
            "none" | "rectangular" => Ok(Window::Rectangular),
            _ => Err(format!(
                "unknown window: {} (expected hanning, blackman or none)",
                s
            )),
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Window::Hanning => "hanning",
            Window::Blackman => "blackman",
            Window::Rectangular => "none",
        };
        f.write_str(s)
    }
}

/// Pre-computed window for one block length.
#[derive(Debug, Clone)]
pub struct WindowCache {
    coeffs: Vec<f64>,

    /// Noise equivalent bandwidth normalization: the window's inner product with itself.
    s2: f64,
}

impl WindowCache {
    pub fn new(window: Window, n: usize) -> WindowCache {
        let coeffs = window.coefficients(n);
        let s2 = coeffs.iter().map(|c| c * c).sum();

        debug!("{} window of length {}, S2: {}", window, n, s2);

        WindowCache { coeffs, s2 }
    }

    pub fn s2(&self) -> f64 {
        self.s2
    }

    /// Multiply samples by the window in place.
    pub fn apply(&self, v: &mut [f64]) {
        debug_assert_eq!(v.len(), self.coeffs.len());

        for (v, c) in v.iter_mut().zip(&self.coeffs) {
            *v *= c;
        }
    }
}
