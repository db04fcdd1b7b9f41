//! Records delivered by the record source: a header opens a block and the following bodies
//! carry its samples.
//!
//! The core accepts any `IntoIterator<Item = Record>`. [`JsonLines`] is a simple source that
//! reads one externally tagged record per line:
//!
//! ```text
//! {"Header":{"sensor_type":0,"instance":0,"block_index":1,"sample_rate_hz":1000.0,"scale_factor":1.0}}
//! {"Body":{"block_index":1,"seq":0,"x":[1,2],"y":[3,4],"z":[5,6]}}
//! ```

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::block::{Identity, SensorType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub sensor_type: SensorType,
    pub instance: u8,
    pub block_index: u32,
    pub sample_rate_hz: f64,
    pub scale_factor: f64,
}

impl Header {
    pub fn identity(&self) -> Identity {
        Identity::new(self.sensor_type, self.instance)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub block_index: u32,

    /// Sequence number of this body within its block, starting at 0.
    pub seq: u32,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Record {
    Header(Header),
    Body(Body),
}

/// Reads newline separated JSON records. Lines that cannot be parsed (including lines that
/// are not UTF-8) are logged and skipped, the source ends at end of file or on the first I/O
/// error.
pub struct JsonLines<R: BufRead> {
    reader: R,
    buf: Vec<u8>,
    line: u64,
}

impl<R: BufRead> JsonLines<R> {
    /// `condition` is a filter expression for the underlying log. Plain JSON records have no
    /// such filter, so it is only logged.
    pub fn new(reader: R, condition: Option<&str>) -> JsonLines<R> {
        if let Some(c) = condition {
            warn!("json record source ignores condition: {}", c);
        }

        JsonLines {
            reader,
            buf: Vec::new(),
            line: 0,
        }
    }
}

impl JsonLines<BufReader<File>> {
    pub fn open(
        path: impl AsRef<Path>,
        condition: Option<&str>,
    ) -> eyre::Result<JsonLines<BufReader<File>>> {
        let path = path.as_ref();
        debug!("opening records: {:?}", path);

        let f = File::open(path)
            .map_err(|e| eyre::eyre!("could not open {}: {}", path.display(), e))?;
        Ok(JsonLines::new(BufReader::new(f), condition))
    }
}

impl<R: BufRead> Iterator for JsonLines<R> {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => (),
                Err(e) => {
                    error!("failed to read line {}: {}", self.line + 1, e);
                    return None;
                }
            }
            self.line += 1;

            if self.buf.iter().all(|b| b.is_ascii_whitespace()) {
                continue;
            }

            match serde_json::from_slice(&self.buf) {
                Ok(r) => return Some(r),
                Err(e) => {
                    warn!("failed to parse record on line {}: {}", self.line, e);
                }
            }
        }
    }
}
