// src/channels.rs
//! Label-addressed channel sets built from COMTRADE records.
use log::{debug, info, warn};
use ndarray::Array1;
use thiserror::Error;

use crate::comtrade::{AnalogChannel, ComtradeError, MeterSide, Record, RecordSource};
use crate::normalize::Normalizer;

/// Reserved label of the time axis.
pub const TIME_LABEL: &str = "t";

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error(transparent)]
    Load(#[from] ComtradeError),
    #[error("channel `{0}` not found")]
    Missing(String),
    #[error("channel `{label}` has {actual} samples, time axis has {expected}")]
    LengthMismatch {
        label: String,
        expected: usize,
        actual: usize,
    },
    #[error("channel `{label}` has unusable ratio {primary}/{secondary}")]
    BadRatio {
        label: String,
        primary: f64,
        secondary: f64,
    },
    #[error("sample {index} out of range for channel `{label}` ({len} samples)")]
    OutOfRange {
        label: String,
        index: usize,
        len: usize,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Channel {
    pub label: String,
    pub unit: String,
    pub samples: Array1<f64>,
}

/// Time axis plus analog channels, all of equal length and in file order.
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelSet {
    source: String,
    time: Array1<f64>,
    channels: Vec<Channel>,
}

impl ChannelSet {
    pub fn new(source: impl Into<String>, time: Array1<f64>) -> Self {
        Self {
            source: source.into(),
            time,
            channels: Vec::new(),
        }
    }

    /// Loads a record and logs what was found.
    pub fn load(source: &mut impl RecordSource) -> Result<Self, ChannelError> {
        let name = source.describe();
        let record = source.load_record()?;
        let set = Self::from_record(&name, &record)?;
        info!(
            "{} channels ({} points) read from {}.cfg",
            set.channels.len(),
            set.len(),
            name
        );
        Ok(set)
    }

    pub fn from_record(source: &str, record: &Record) -> Result<Self, ChannelError> {
        let mut set = Self::new(source, Array1::from(record.time.clone()));
        for (config, samples) in record.config.analog.iter().zip(&record.analog) {
            let label = channel_label(&config.id);
            let scale = meter_ratio(config).ok_or_else(|| ChannelError::BadRatio {
                label: label.clone(),
                primary: config.primary,
                secondary: config.secondary,
            })?;
            debug!("  \"{label}\" [{}] scale={scale:.6e}", config.unit);
            let samples = Array1::from(samples.clone()) * scale;
            set.insert(label, config.unit.clone(), samples)?;
        }
        Ok(set)
    }

    /// Adds a channel. A repeated label replaces the earlier samples in place.
    pub fn insert(
        &mut self,
        label: impl Into<String>,
        unit: impl Into<String>,
        samples: Array1<f64>,
    ) -> Result<(), ChannelError> {
        let label = label.into();
        if samples.len() != self.time.len() {
            return Err(ChannelError::LengthMismatch {
                label,
                expected: self.time.len(),
                actual: samples.len(),
            });
        }
        let channel = Channel {
            label,
            unit: unit.into(),
            samples,
        };
        match self.channels.iter_mut().find(|c| c.label == channel.label) {
            Some(existing) => {
                warn!(
                    "{}: duplicate channel `{}` replaces the earlier one",
                    self.source, channel.label
                );
                *existing = channel;
            }
            None => self.channels.push(channel),
        }
        Ok(())
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Number of points on the time axis.
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn time(&self) -> &Array1<f64> {
        &self.time
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.channels.iter().map(|c| c.label.as_str())
    }

    pub fn get(&self, label: &str) -> Result<&Channel, ChannelError> {
        self.channels
            .iter()
            .find(|c| c.label == label)
            .ok_or_else(|| ChannelError::Missing(label.to_string()))
    }

    /// Samples for `label`; the reserved time label returns the time axis.
    pub fn samples(&self, label: &str) -> Result<&Array1<f64>, ChannelError> {
        if label == TIME_LABEL {
            return Ok(&self.time);
        }
        self.get(label).map(|c| &c.samples)
    }

    pub fn unit(&self, label: &str) -> Option<&str> {
        self.get(label).ok().map(|c| c.unit.as_str())
    }

    /// Samples multiplied by the normalizer's factor for this label.
    pub fn scaled(&self, label: &str, normalizer: &Normalizer) -> Result<Array1<f64>, ChannelError> {
        let samples = self.samples(label)?;
        Ok(samples * normalizer.scale_factor(label))
    }

    pub fn set_sample(&mut self, label: &str, index: usize, value: f64) -> Result<(), ChannelError> {
        let channel = self
            .channels
            .iter_mut()
            .find(|c| c.label == label)
            .ok_or_else(|| ChannelError::Missing(label.to_string()))?;
        let len = channel.samples.len();
        let slot = channel
            .samples
            .get_mut(index)
            .ok_or_else(|| ChannelError::OutOfRange {
                label: label.to_string(),
                index,
                len,
            })?;
        *slot = value;
        Ok(())
    }
}

/// Channel id with PSCAD's `:suffix` removed.
pub fn channel_label(id: &str) -> String {
    let id = id.trim();
    match id.find(':') {
        Some(idx) => id[..idx].to_string(),
        None => id.to_string(),
    }
}

/// Instrument transformer correction. `None` when the ratio is not finite.
pub fn ratio_scale(primary: f64, secondary: f64, side: MeterSide) -> Option<f64> {
    let scale = match side {
        MeterSide::Primary => secondary / primary,
        MeterSide::Secondary => primary / secondary,
        MeterSide::Unspecified => 1.0,
    };
    scale.is_finite().then_some(scale)
}

fn meter_ratio(channel: &AnalogChannel) -> Option<f64> {
    ratio_scale(channel.primary, channel.secondary, channel.side)
}
