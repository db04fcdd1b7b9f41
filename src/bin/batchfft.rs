#[macro_use]
extern crate log;

use argh::FromArgs;
use env_logger::Env;
use serde_json as json;
use std::io::{self, Write};
use std::path::PathBuf;

use batch_fft::normalize::{Output, Scale, Spectrum, SpectrumSink};
use batch_fft::record::JsonLines;
use batch_fft::window::Window;
use batch_fft::{analyze, Config};

#[derive(FromArgs)]
/// Reassemble batch-sampler blocks from record logs and print averaged spectra.
struct BatchFft {
    #[argh(positional, description = "record logs (JSON lines)")]
    logs: Vec<PathBuf>,

    /// configuration file.
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,

    /// select records by condition.
    #[argh(option)]
    condition: Option<String>,

    /// scale of the magnitudes: 'db' or 'linear'.
    #[argh(option)]
    scale: Option<Scale>,

    /// window function: 'hanning', 'blackman' or 'none'.
    #[argh(option)]
    window: Option<Window>,

    /// use 50% window overlap between blocks.
    #[argh(switch)]
    overlap: bool,

    /// power or linear spectral density: 'psd' or 'lsd'.
    #[argh(option)]
    output: Option<Output>,

    /// write CSV instead of JSON.
    #[argh(switch)]
    csv: bool,
}

impl BatchFft {
    fn config(&self) -> eyre::Result<Config> {
        let mut config = match &self.config {
            Some(p) => Config::from_path(p)?,
            None => Config::default(),
        };

        if let Some(w) = self.window {
            config.window = w;
        }
        if let Some(o) = self.output {
            config.output = o;
        }
        if let Some(s) = self.scale {
            config.scale = s;
        }
        if self.overlap {
            config.overlap = true;
        }
        if self.condition.is_some() {
            config.condition = self.condition.clone();
        }

        Ok(config)
    }
}

/// One row per frequency.
struct CsvSink<W: Write> {
    w: csv::Writer<W>,
    log: String,
}

impl<W: Write> SpectrumSink for CsvSink<W> {
    fn emit(&mut self, s: Spectrum) -> eyre::Result<()> {
        for (f, v) in s.frequencies.iter().zip(&s.values) {
            self.w.write_record([
                self.log.as_str(),
                s.label.as_str(),
                s.axis.to_string().as_str(),
                s.unit.as_str(),
                f.to_string().as_str(),
                v.to_string().as_str(),
            ])?;
        }

        Ok(())
    }
}

#[derive(serde::Serialize)]
struct LogSpectra {
    log: String,
    spectra: Vec<Spectrum>,
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    env_logger::Builder::from_env(
        Env::default().default_filter_or("warn,batch_fft=info,batchfft=info"),
    )
    .init();

    let args: BatchFft = argh::from_env();
    if args.logs.is_empty() {
        return Err(eyre::eyre!("no logs specified"));
    }

    let config = args.config()?;
    debug!("config: {:?}", config);

    let stdout = io::stdout();
    let mut csv_sink = if args.csv {
        let mut w = csv::Writer::from_writer(stdout.lock());
        w.write_record(["log", "sensor", "axis", "unit", "frequency", "value"])?;
        Some(CsvSink {
            w,
            log: String::new(),
        })
    } else {
        None
    };

    let mut out = Vec::new();

    for log in &args.logs {
        info!("Processing log {}", log.display());

        let records = JsonLines::open(log, config.condition.as_deref())?;
        let a = analyze(records, &config);

        let name = log.to_string_lossy().into_owned();
        match csv_sink.as_mut() {
            Some(sink) => {
                sink.log = name;
                a.emit(sink)?;
            }
            None => {
                let mut spectra: Vec<Spectrum> = Vec::new();
                a.emit(&mut spectra)?;
                out.push(LogSpectra { log: name, spectra });
            }
        }
    }

    match csv_sink {
        Some(mut sink) => sink.w.flush()?,
        None => println!("{}", json::to_string_pretty(&out)?),
    }

    Ok(())
}
