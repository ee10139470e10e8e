mod sampler;

pub use sampler::{WeightSample, WeightSampler, DEFAULT_SAMPLE_COUNT};

use std::io::{BufRead, BufReader};
use std::thread;
use std::time::Duration;

use serialport::ClearBuffer;

use crate::error::SensorError;

/// A line-oriented numeric stream. `open` hands back exclusive ownership
/// of the channel; dropping the reader releases it, on every exit path.
pub trait SensorPort: Send + Sync {
    fn open(&self) -> Result<Box<dyn BufRead + Send>, SensorError>;
}

/// Serial-backed weight sensor channel. After opening, the device gets a
/// fixed settle period and the input buffer is flushed so a partial line
/// emitted mid-open is never parsed as a reading.
pub struct SerialSensorPort {
    path: String,
    baud: u32,
    settle: Duration,
    read_timeout: Duration,
}

impl SerialSensorPort {
    pub fn new(path: impl Into<String>, baud: u32, settle: Duration, read_timeout: Duration) -> Self {
        Self {
            path: path.into(),
            baud,
            settle,
            read_timeout,
        }
    }
}

impl SensorPort for SerialSensorPort {
    fn open(&self) -> Result<Box<dyn BufRead + Send>, SensorError> {
        let port = serialport::new(self.path.as_str(), self.baud)
            // Hard per-read bound so a silent sensor cannot stall a weigh forever.
            .timeout(self.read_timeout)
            .open()
            .map_err(|err| SensorError::Open(format!("{}: {err}", self.path)))?;

        thread::sleep(self.settle);
        port.clear(ClearBuffer::Input)
            .map_err(|err| SensorError::Open(format!("{}: {err}", self.path)))?;

        Ok(Box::new(BufReader::new(port)))
    }
}
