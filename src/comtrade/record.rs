use log::warn;

use crate::comtrade::data::{parse_ascii, parse_binary, RawSamples};
use crate::comtrade::{ComtradeError, DataFormat, RecordConfig};

/// Timestamps in the data file are microseconds before the multiplier.
const TIMESTAMP_BASE_SECONDS: f64 = 1e-6;

/// A decoded COMTRADE record: configuration, time axis and analog values in
/// the channel's engineering units (`a * raw + b`).
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub config: RecordConfig,
    pub time: Vec<f64>,
    pub analog: Vec<Vec<f64>>, // channel -> samples
    pub digital: Vec<Vec<bool>>,
}

impl Record {
    pub fn parse(cfg_text: &str, dat: &[u8]) -> Result<Self, ComtradeError> {
        let config = RecordConfig::parse(cfg_text)?;
        let raw = match config.format {
            DataFormat::Ascii => parse_ascii(&String::from_utf8_lossy(dat), &config)?,
            _ => parse_binary(dat, &config)?,
        };
        Ok(Self::from_raw(config, raw))
    }

    pub fn from_raw(config: RecordConfig, raw: RawSamples) -> Self {
        let expected = config.expected_samples();
        if expected != raw.len() as u64 {
            warn!(
                "{}: configuration promises {expected} samples, data file has {}",
                config.station_name,
                raw.len()
            );
        }
        let time = if config.uses_sample_rates() {
            raw.sample_numbers
                .iter()
                .map(|&n| config.time_of_sample(n).unwrap_or(f64::NAN))
                .collect()
        } else {
            raw.timestamps
                .iter()
                .map(|ts| ts * config.time_multiplier * TIMESTAMP_BASE_SECONDS)
                .collect()
        };
        let analog = config
            .analog
            .iter()
            .zip(raw.analog)
            .map(|(channel, samples)| {
                samples
                    .into_iter()
                    .map(|v| channel.multiplier * v + channel.offset)
                    .collect()
            })
            .collect();
        Self {
            config,
            time,
            analog,
            digital: raw.digital,
        }
    }

    pub fn sample_count(&self) -> usize {
        self.time.len()
    }

    pub fn analog_ids(&self) -> impl Iterator<Item = &str> {
        self.config.analog.iter().map(|c| c.id.as_str())
    }
}
