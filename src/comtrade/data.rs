//! Decoders for the COMTRADE data (`.dat`) file.
use crate::comtrade::{ComtradeError, DataFormat, RecordConfig};

/// ASCII marker for a missing analog value (1999 and later).
const ASCII_MISSING: &str = "99999";
/// Binary timestamp marker for a missing timestamp.
const TIMESTAMP_MISSING: u32 = u32::MAX;

/// Data rows before the channel multipliers are applied.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawSamples {
    pub sample_numbers: Vec<u64>,
    /// Timestamps in file units, `NaN` where absent.
    pub timestamps: Vec<f64>,
    pub analog: Vec<Vec<f64>>, // channel -> samples
    pub digital: Vec<Vec<bool>>,
}

impl RawSamples {
    fn with_channels(analog: usize, digital: usize, capacity: usize) -> Self {
        Self {
            sample_numbers: Vec::with_capacity(capacity),
            timestamps: Vec::with_capacity(capacity),
            analog: (0..analog).map(|_| Vec::with_capacity(capacity)).collect(),
            digital: (0..digital).map(|_| Vec::with_capacity(capacity)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.sample_numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sample_numbers.is_empty()
    }
}

pub fn parse_ascii(text: &str, cfg: &RecordConfig) -> Result<RawSamples, ComtradeError> {
    let analog_count = cfg.analog.len();
    let digital_count = cfg.digital.len();
    let expected = 2 + analog_count + digital_count;
    let mut raw = RawSamples::with_channels(
        analog_count,
        digital_count,
        cfg.expected_samples() as usize,
    );
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let row = idx + 1;
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() < expected {
            return Err(ComtradeError::ShortRow {
                row,
                expected,
                actual: fields.len(),
            });
        }
        let sample_number = fields[0]
            .parse::<u64>()
            .map_err(|_| bad_value(row, 1, fields[0]))?;
        let timestamp = if fields[1].is_empty() {
            f64::NAN
        } else {
            fields[1]
                .parse::<f64>()
                .map_err(|_| bad_value(row, 2, fields[1]))?
        };
        raw.sample_numbers.push(sample_number);
        raw.timestamps.push(timestamp);
        for (ch, samples) in raw.analog.iter_mut().enumerate() {
            let field = fields[2 + ch];
            let value = if field.is_empty() || field == ASCII_MISSING {
                f64::NAN
            } else {
                field
                    .parse::<f64>()
                    .map_err(|_| bad_value(row, 3 + ch, field))?
            };
            samples.push(value);
        }
        for (ch, samples) in raw.digital.iter_mut().enumerate() {
            let field = fields[2 + analog_count + ch];
            let state = if field.is_empty() {
                0
            } else {
                field
                    .parse::<u8>()
                    .map_err(|_| bad_value(row, 3 + analog_count + ch, field))?
            };
            samples.push(state != 0);
        }
    }
    Ok(raw)
}

pub fn parse_binary(bytes: &[u8], cfg: &RecordConfig) -> Result<RawSamples, ComtradeError> {
    let width = cfg.format.analog_width();
    if width == 0 {
        return Err(ComtradeError::UnsupportedFormat("ASCII data read as binary".into()));
    }
    let record = cfg.binary_record_len();
    if bytes.len() % record != 0 {
        return Err(ComtradeError::TruncatedBinary {
            len: bytes.len(),
            record,
        });
    }
    let analog_count = cfg.analog.len();
    let words = cfg.digital.len().div_ceil(16);
    let mut raw = RawSamples::with_channels(analog_count, cfg.digital.len(), bytes.len() / record);
    for chunk in bytes.chunks_exact(record) {
        raw.sample_numbers.push(u64::from(le_u32(&chunk[0..4])));
        let timestamp = le_u32(&chunk[4..8]);
        raw.timestamps.push(if timestamp == TIMESTAMP_MISSING {
            f64::NAN
        } else {
            f64::from(timestamp)
        });
        let analog_bytes = &chunk[8..8 + analog_count * width];
        for (samples, value) in raw.analog.iter_mut().zip(analog_bytes.chunks_exact(width)) {
            samples.push(decode_analog(cfg.format, value));
        }
        let digital_bytes = &chunk[8 + analog_count * width..];
        for word_idx in 0..words {
            let word = u16::from_le_bytes([digital_bytes[2 * word_idx], digital_bytes[2 * word_idx + 1]]);
            for bit in 0..16 {
                if let Some(samples) = raw.digital.get_mut(word_idx * 16 + bit) {
                    samples.push(word & (1 << bit) != 0);
                }
            }
        }
    }
    Ok(raw)
}

fn decode_analog(format: DataFormat, bytes: &[u8]) -> f64 {
    match format {
        DataFormat::Binary => {
            let v = i16::from_le_bytes([bytes[0], bytes[1]]);
            if v == i16::MIN {
                f64::NAN
            } else {
                f64::from(v)
            }
        }
        DataFormat::Binary32 => {
            let v = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            if v == i32::MIN {
                f64::NAN
            } else {
                f64::from(v)
            }
        }
        DataFormat::Float32 => f64::from(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
        DataFormat::Ascii => f64::NAN,
    }
}

fn le_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn bad_value(row: usize, field: usize, value: &str) -> ComtradeError {
    ComtradeError::BadValue {
        row,
        field,
        value: value.to_string(),
    }
}
