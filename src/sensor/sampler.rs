use std::sync::Arc;

use log::info;
use serde::Serialize;

use super::SensorPort;
use crate::error::SensorError;

pub const DEFAULT_SAMPLE_COUNT: usize = 5;

/// The averaged result of one weighing attempt.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightSample {
    pub raw_readings: Vec<f64>,
    pub averaged_kg: f64,
}

/// Drives the weight sensor: opens the channel, reads a fixed number of
/// readings and averages them. Any unreadable or unparsable line fails
/// the whole attempt; a partial average is never reported, because a
/// silently low weight is worse than an explicit retry.
pub struct WeightSampler {
    port: Arc<dyn SensorPort>,
    count: usize,
}

impl WeightSampler {
    pub fn new(port: Arc<dyn SensorPort>, count: usize) -> Self {
        Self { port, count }
    }

    pub fn sample(&self) -> Result<WeightSample, SensorError> {
        let mut reader = self.port.open()?;

        let mut readings = Vec::with_capacity(self.count);
        for got in 0..self.count {
            let mut line = String::new();
            let bytes = reader.read_line(&mut line)?;
            if bytes == 0 {
                return Err(SensorError::ChannelClosed {
                    got,
                    want: self.count,
                });
            }

            let text = line.trim();
            let value: f64 = text
                .parse()
                .map_err(|_| SensorError::BadReading(text.to_string()))?;
            readings.push(value);
        }

        let mean = readings.iter().sum::<f64>() / readings.len() as f64;
        // Negative tare drift reads as zero, never as a negative sale weight.
        let averaged_kg = mean.max(0.0);

        info!("weight sample: {readings:?} -> {averaged_kg:.3} kg");

        Ok(WeightSample {
            raw_readings: readings,
            averaged_kg,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, Cursor};

    struct ScriptedPort {
        data: &'static str,
    }

    impl ScriptedPort {
        fn boxed(data: &'static str) -> Arc<dyn SensorPort> {
            Arc::new(Self { data })
        }
    }

    impl SensorPort for ScriptedPort {
        fn open(&self) -> Result<Box<dyn BufRead + Send>, SensorError> {
            Ok(Box::new(Cursor::new(self.data.as_bytes().to_vec())))
        }
    }

    struct FailingPort;

    impl SensorPort for FailingPort {
        fn open(&self) -> Result<Box<dyn BufRead + Send>, SensorError> {
            Err(SensorError::Open("no such device".into()))
        }
    }

    #[test]
    fn averages_five_clean_readings() {
        let sampler = WeightSampler::new(ScriptedPort::boxed("0.450\n0.452\n0.454\n0.451\n0.453\n"), 5);
        let sample = sampler.sample().unwrap();
        assert_eq!(sample.raw_readings.len(), 5);
        assert!((sample.averaged_kg - 0.452).abs() < 1e-9);
    }

    #[test]
    fn any_bad_line_fails_the_whole_batch() {
        let sampler = WeightSampler::new(ScriptedPort::boxed("0.450\ngarbage\n0.454\n0.451\n0.453\n"), 5);
        let err = sampler.sample().unwrap_err();
        assert!(matches!(err, SensorError::BadReading(ref text) if text == "garbage"));
    }

    #[test]
    fn negative_average_is_clamped_to_zero() {
        let sampler = WeightSampler::new(ScriptedPort::boxed("-0.010\n-0.012\n-0.008\n-0.011\n-0.009\n"), 5);
        let sample = sampler.sample().unwrap();
        assert_eq!(sample.averaged_kg, 0.0);
        // Raw readings keep their true signs for diagnostics.
        assert!(sample.raw_readings.iter().all(|value| *value < 0.0));
    }

    #[test]
    fn short_stream_fails_with_channel_closed() {
        let sampler = WeightSampler::new(ScriptedPort::boxed("0.450\n0.452\n"), 5);
        let err = sampler.sample().unwrap_err();
        assert!(matches!(err, SensorError::ChannelClosed { got: 2, want: 5 }));
    }

    #[test]
    fn open_failure_propagates() {
        let sampler = WeightSampler::new(Arc::new(FailingPort), 5);
        assert!(matches!(sampler.sample(), Err(SensorError::Open(_))));
    }
}
