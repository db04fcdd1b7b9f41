use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::normalize::{Output, Scale};
use crate::window::Window;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// Window applied to each block before the FFT.
    pub window: Window,

    /// Add a 50% overlapping block between consecutive blocks of a sensor.
    pub overlap: bool,
    pub output: Output,
    pub scale: Scale,

    /// Filter expression handed to the record source.
    pub condition: Option<String>,
}

impl Config {
    #[cfg(test)]
    pub fn test_config() -> Config {
        Config {
            window: Window::Hanning,
            overlap: false,
            output: Output::Psd,
            scale: Scale::Linear,
            condition: None,
        }
    }

    pub fn from_path<P: AsRef<Path>>(p: P) -> eyre::Result<Config> {
        let p = p.as_ref();
        debug!("loading config from: {:?}", p);

        let f = fs::read_to_string(p)
            .map_err(|e| eyre::eyre!("could not read config file {}: {}", p.display(), e))?;
        Config::from_str(&f)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> eyre::Result<Config> {
        toml::from_str(s).map_err(|e| eyre::eyre!("could not parse config file: {}", e))
    }
}
