//! Parser for the COMTRADE configuration (`.cfg`) file.
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use log::warn;

use crate::comtrade::ComtradeError;

/// Layout of the companion `.dat` file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataFormat {
    Ascii,
    Binary,
    Binary32,
    Float32,
}

impl DataFormat {
    /// Bytes per analog value in a binary record. Zero for ASCII.
    pub fn analog_width(self) -> usize {
        match self {
            DataFormat::Ascii => 0,
            DataFormat::Binary => 2,
            DataFormat::Binary32 | DataFormat::Float32 => 4,
        }
    }
}

impl FromStr for DataFormat {
    type Err = ComtradeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ASCII" => Ok(DataFormat::Ascii),
            "BINARY" => Ok(DataFormat::Binary),
            "BINARY32" => Ok(DataFormat::Binary32),
            "FLOAT32" => Ok(DataFormat::Float32),
            other => Err(ComtradeError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Instrument transformer side the recorded value refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum MeterSide {
    #[default]
    Primary,
    Secondary,
    Unspecified,
}

impl MeterSide {
    pub fn parse(flag: &str) -> Self {
        match flag.trim().to_ascii_uppercase().as_str() {
            "P" => MeterSide::Primary,
            "S" => MeterSide::Secondary,
            _ => MeterSide::Unspecified,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AnalogChannel {
    pub index: usize,
    pub id: String,
    pub phase: String,
    pub circuit: String,
    pub unit: String,
    pub multiplier: f64,
    pub offset: f64,
    pub skew: f64,
    pub min: f64,
    pub max: f64,
    pub primary: f64,
    pub secondary: f64,
    pub side: MeterSide,
}

impl AnalogChannel {
    /// Channel with unit gain and a 1:1 primary ratio.
    pub fn new(index: usize, id: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            index,
            id: id.into(),
            phase: String::new(),
            circuit: String::new(),
            unit: unit.into(),
            multiplier: 1.0,
            offset: 0.0,
            skew: 0.0,
            min: 0.0,
            max: 0.0,
            primary: 1.0,
            secondary: 1.0,
            side: MeterSide::Primary,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DigitalChannel {
    pub index: usize,
    pub id: String,
    pub phase: String,
    pub circuit: String,
    pub normal_state: u8,
}

/// One `samp,endsamp` line.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SampleRate {
    pub rate_hz: f64,
    pub end_sample: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecordConfig {
    pub station_name: String,
    pub device_id: String,
    pub revision: u16,
    pub analog: Vec<AnalogChannel>,
    pub digital: Vec<DigitalChannel>,
    pub line_frequency: f64,
    pub nrates: usize,
    pub sample_rates: Vec<SampleRate>,
    pub start: Option<NaiveDateTime>,
    pub trigger: Option<NaiveDateTime>,
    pub format: DataFormat,
    pub time_multiplier: f64,
}

impl RecordConfig {
    pub fn parse(text: &str) -> Result<Self, ComtradeError> {
        let mut lines = CfgLines::new(text);

        let (_, station) = lines.next_line("station line")?;
        let station = split_fields(station);
        let station_name = station.first().copied().unwrap_or_default().to_string();
        let device_id = station.get(1).copied().unwrap_or_default().to_string();
        let revision = station
            .get(2)
            .and_then(|r| r.parse::<u16>().ok())
            .unwrap_or(1991);

        let (line, counts) = lines.next_line("channel counts")?;
        let counts = split_fields(counts);
        if counts.len() < 3 {
            return Err(ComtradeError::syntax(line, "expected `TT,##A,##D`"));
        }
        let total = parse_count(counts[0], None, line)?;
        let analog_count = parse_count(counts[1], Some('A'), line)?;
        let digital_count = parse_count(counts[2], Some('D'), line)?;
        if analog_count + digital_count != total {
            return Err(ComtradeError::ChannelCount {
                total,
                analog: analog_count,
                digital: digital_count,
            });
        }

        let mut analog = Vec::with_capacity(analog_count);
        for _ in 0..analog_count {
            let (line, text) = lines.next_line("analog channel")?;
            analog.push(parse_analog(line, &split_fields(text))?);
        }
        let mut digital = Vec::with_capacity(digital_count);
        for _ in 0..digital_count {
            let (line, text) = lines.next_line("digital channel")?;
            digital.push(parse_digital(line, &split_fields(text))?);
        }

        let (line, text) = lines.next_line("line frequency")?;
        let line_frequency = parse_number(text, line, "line frequency")?;

        let (line, text) = lines.next_line("sample rate count")?;
        let nrates = parse_count(text, None, line)?;
        let mut sample_rates: Vec<SampleRate> = Vec::with_capacity(nrates.max(1));
        for segment in 0..nrates.max(1) {
            let (line, text) = lines.next_line("sample rate")?;
            let fields = split_fields(text);
            if fields.len() < 2 {
                return Err(ComtradeError::syntax(line, "expected `samp,endsamp`"));
            }
            let rate = SampleRate {
                rate_hz: parse_number(fields[0], line, "sample rate")?,
                end_sample: parse_number(fields[1], line, "end sample")? as u64,
            };
            // a zero first rate selects timestamps; later segments must be timed
            let timed = sample_rates.first().map(|r| r.rate_hz > 0.0).unwrap_or(false);
            if nrates > 0 && timed && !(rate.rate_hz.is_finite() && rate.rate_hz > 0.0) {
                return Err(ComtradeError::NonPositiveRate {
                    line,
                    segment: segment + 1,
                    rate_hz: rate.rate_hz,
                });
            }
            sample_rates.push(rate);
        }

        let (line, text) = lines.next_line("start timestamp")?;
        let start = parse_timestamp(&split_fields(text), revision);
        if start.is_none() {
            warn!("line {line}: cannot parse start timestamp `{text}`");
        }
        let (line, text) = lines.next_line("trigger timestamp")?;
        let trigger = parse_timestamp(&split_fields(text), revision);
        if trigger.is_none() {
            warn!("line {line}: cannot parse trigger timestamp `{text}`");
        }

        let (_, text) = lines.next_line("data file type")?;
        let format = text.parse::<DataFormat>()?;

        // 1999 and later carry a time multiplier; older files end here.
        let time_multiplier = lines
            .next_optional()
            .and_then(|(_, text)| split_fields(text).first()?.parse::<f64>().ok())
            .filter(|m| *m > 0.0)
            .unwrap_or(1.0);

        Ok(Self {
            station_name,
            device_id,
            revision,
            analog,
            digital,
            line_frequency,
            nrates,
            sample_rates,
            start,
            trigger,
            format,
            time_multiplier,
        })
    }

    /// Sample count promised by the last rate segment.
    pub fn expected_samples(&self) -> u64 {
        self.sample_rates.last().map(|r| r.end_sample).unwrap_or(0)
    }

    /// Whether time is derived from sample numbers rather than timestamps.
    pub fn uses_sample_rates(&self) -> bool {
        self.nrates > 0
            && self
                .sample_rates
                .first()
                .map(|r| r.rate_hz > 0.0)
                .unwrap_or(false)
    }

    /// Seconds since the first sample for 1-based sample number `n`.
    pub fn time_of_sample(&self, n: u64) -> Option<f64> {
        if !self.uses_sample_rates() {
            return None;
        }
        let last = self.sample_rates.len() - 1;
        let mut segment_start = 0.0;
        let mut segment_first = 1u64;
        for (idx, rate) in self.sample_rates.iter().enumerate() {
            if rate.rate_hz <= 0.0 {
                return None;
            }
            if n <= rate.end_sample || idx == last {
                return Some(segment_start + n.saturating_sub(segment_first) as f64 / rate.rate_hz);
            }
            let count = (rate.end_sample + 1).saturating_sub(segment_first);
            segment_start += count as f64 / rate.rate_hz;
            segment_first = rate.end_sample + 1;
        }
        None
    }

    /// Size in bytes of one binary data record.
    pub fn binary_record_len(&self) -> usize {
        8 + self.analog.len() * self.format.analog_width() + self.digital.len().div_ceil(16) * 2
    }
}

struct CfgLines<'a> {
    lines: std::iter::Enumerate<std::str::Lines<'a>>,
}

impl<'a> CfgLines<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().enumerate(),
        }
    }

    fn next_line(&mut self, what: &'static str) -> Result<(usize, &'a str), ComtradeError> {
        self.next_optional()
            .ok_or(ComtradeError::UnexpectedEof(what))
    }

    fn next_optional(&mut self) -> Option<(usize, &'a str)> {
        self.lines
            .by_ref()
            .map(|(idx, line)| (idx + 1, line.trim()))
            .find(|(_, line)| !line.is_empty())
    }
}

fn split_fields(line: &str) -> Vec<&str> {
    line.split(',').map(str::trim).collect()
}

fn parse_count(field: &str, suffix: Option<char>, line: usize) -> Result<usize, ComtradeError> {
    let digits = match suffix {
        Some(s) => field
            .strip_suffix(s)
            .or_else(|| field.strip_suffix(s.to_ascii_lowercase()))
            .unwrap_or(field),
        None => field,
    };
    digits
        .trim()
        .parse::<usize>()
        .map_err(|_| ComtradeError::syntax(line, format!("bad channel count `{field}`")))
}

fn parse_number(field: &str, line: usize, what: &str) -> Result<f64, ComtradeError> {
    field
        .trim()
        .parse::<f64>()
        .map_err(|_| ComtradeError::syntax(line, format!("bad {what} `{field}`")))
}

fn number_or(fields: &[&str], idx: usize, default: f64) -> f64 {
    fields
        .get(idx)
        .and_then(|f| f.parse::<f64>().ok())
        .unwrap_or(default)
}

fn text_at(fields: &[&str], idx: usize) -> String {
    fields.get(idx).copied().unwrap_or_default().to_string()
}

fn parse_analog(line: usize, fields: &[&str]) -> Result<AnalogChannel, ComtradeError> {
    if fields.len() < 7 {
        return Err(ComtradeError::syntax(
            line,
            format!("analog channel needs at least 7 fields, got {}", fields.len()),
        ));
    }
    let index = parse_count(fields[0], None, line)?;
    Ok(AnalogChannel {
        index,
        id: fields[1].to_string(),
        phase: text_at(fields, 2),
        circuit: text_at(fields, 3),
        unit: text_at(fields, 4),
        multiplier: parse_number(fields[5], line, "multiplier")?,
        offset: parse_number(fields[6], line, "offset")?,
        skew: number_or(fields, 7, 0.0),
        min: number_or(fields, 8, 0.0),
        max: number_or(fields, 9, 0.0),
        primary: number_or(fields, 10, 1.0),
        secondary: number_or(fields, 11, 1.0),
        side: fields
            .get(12)
            .map(|f| MeterSide::parse(f))
            .unwrap_or(MeterSide::Primary),
    })
}

fn parse_digital(line: usize, fields: &[&str]) -> Result<DigitalChannel, ComtradeError> {
    if fields.len() < 2 {
        return Err(ComtradeError::syntax(line, "digital channel needs `Dn,ch_id`"));
    }
    Ok(DigitalChannel {
        index: parse_count(fields[0], None, line)?,
        id: fields[1].to_string(),
        phase: text_at(fields, 2),
        circuit: text_at(fields, 3),
        normal_state: fields.get(4).and_then(|f| f.parse().ok()).unwrap_or(0),
    })
}

fn parse_timestamp(fields: &[&str], revision: u16) -> Option<NaiveDateTime> {
    let date = fields.first()?;
    let time = fields.get(1)?;
    let formats = if revision == 1991 {
        ["%m/%d/%y", "%d/%m/%Y"]
    } else {
        ["%d/%m/%Y", "%m/%d/%y"]
    };
    let date = formats
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(date, f).ok())?;
    let time = NaiveTime::parse_from_str(time, "%H:%M:%S%.f").ok()?;
    Some(date.and_time(time))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comtrade::fixtures::PSCAD_CFG;
    use chrono::Timelike;

    #[test]
    fn parses_header_channels_and_rates() {
        let cfg = RecordConfig::parse(PSCAD_CFG).unwrap();
        assert_eq!(cfg.station_name, "IBR");
        assert_eq!(cfg.device_id, "PSCAD");
        assert_eq!(cfg.revision, 1999);
        assert_eq!(cfg.analog.len(), 3);
        assert_eq!(cfg.digital.len(), 1);
        assert_eq!(cfg.analog[0].id, "VA:Solar2");
        assert_eq!(cfg.analog[0].unit, "kV");
        assert_eq!(cfg.analog[0].multiplier, 0.01);
        assert_eq!(cfg.analog[1].primary, 10.0);
        assert_eq!(cfg.analog[1].side, MeterSide::Secondary);
        // 1991-style line without ratio fields
        assert_eq!(cfg.analog[2].primary, 1.0);
        assert_eq!(cfg.analog[2].side, MeterSide::Primary);
        assert_eq!(cfg.digital[0].id, "BRK");
        assert_eq!(cfg.line_frequency, 60.0);
        assert_eq!(cfg.sample_rates, vec![SampleRate { rate_hz: 1000.0, end_sample: 5 }]);
        assert_eq!(cfg.format, DataFormat::Ascii);
        assert_eq!(cfg.time_multiplier, 1.0);
    }

    #[test]
    fn parses_day_first_timestamps() {
        let cfg = RecordConfig::parse(PSCAD_CFG).unwrap();
        let start = cfg.start.unwrap();
        assert_eq!(start.date(), NaiveDate::from_ymd_opt(2023, 7, 1).unwrap());
        let trigger = cfg.trigger.unwrap();
        assert_eq!(trigger.nanosecond(), 250_000_000);
    }

    #[test]
    fn revision_less_file_reads_month_first_dates() {
        let text = PSCAD_CFG
            .replace("IBR,PSCAD,1999", "IBR,PSCAD")
            .replace("01/07/2023,10:15:30.000000", "07/01/23,10:15:30.000000");
        let cfg = RecordConfig::parse(&text).unwrap();
        assert_eq!(cfg.revision, 1991);
        let july_first = NaiveDate::from_ymd_opt(2023, 7, 1).unwrap();
        assert_eq!(cfg.start.unwrap().date(), july_first);
        assert_eq!(cfg.start.unwrap().second(), 30);
        // four-digit years still fall back to day-first
        assert_eq!(cfg.trigger.unwrap().date(), july_first);
    }

    #[test]
    fn later_rate_segment_must_be_positive() {
        let text = PSCAD_CFG.replace("\n1\n1000,5\n", "\n2\n1000,3\n0,5\n");
        assert!(matches!(
            RecordConfig::parse(&text),
            Err(ComtradeError::NonPositiveRate { segment: 2, rate_hz, .. }) if rate_hz == 0.0
        ));
    }

    #[test]
    fn rejects_inconsistent_channel_counts() {
        let text = PSCAD_CFG.replace("4,3A,1D", "5,3A,1D");
        assert!(matches!(
            RecordConfig::parse(&text),
            Err(ComtradeError::ChannelCount { total: 5, .. })
        ));
    }

    #[test]
    fn rejects_truncated_file() {
        let truncated: String = PSCAD_CFG.lines().take(6).collect::<Vec<_>>().join("\n");
        assert!(matches!(
            RecordConfig::parse(&truncated),
            Err(ComtradeError::UnexpectedEof(_))
        ));
    }

    #[test]
    fn rejects_unknown_data_type() {
        let text = PSCAD_CFG.replace("ASCII", "XML");
        assert!(matches!(
            RecordConfig::parse(&text),
            Err(ComtradeError::UnsupportedFormat(f)) if f == "XML"
        ));
    }

    #[test]
    fn bad_timestamp_is_not_fatal() {
        let text = PSCAD_CFG.replace("01/07/2023,10:15:30.000000", "garbage");
        let cfg = RecordConfig::parse(&text).unwrap();
        assert!(cfg.start.is_none());
        assert!(cfg.trigger.is_some());
    }

    #[test]
    fn time_follows_rate_segments() {
        let mut cfg = RecordConfig::parse(PSCAD_CFG).unwrap();
        assert_eq!(cfg.time_of_sample(1), Some(0.0));
        assert!((cfg.time_of_sample(5).unwrap() - 0.004).abs() < 1e-12);

        cfg.nrates = 2;
        cfg.sample_rates = vec![
            SampleRate { rate_hz: 1000.0, end_sample: 100 },
            SampleRate { rate_hz: 100.0, end_sample: 110 },
        ];
        assert!((cfg.time_of_sample(100).unwrap() - 0.099).abs() < 1e-12);
        assert!((cfg.time_of_sample(101).unwrap() - 0.100).abs() < 1e-12);
        assert!((cfg.time_of_sample(102).unwrap() - 0.110).abs() < 1e-12);
    }

    #[test]
    fn zero_rate_falls_back_to_timestamps() {
        let text = PSCAD_CFG.replace("\n1\n1000,5\n", "\n0\n0,5\n");
        let cfg = RecordConfig::parse(&text).unwrap();
        assert!(!cfg.uses_sample_rates());
        assert_eq!(cfg.time_of_sample(3), None);
    }

    #[test]
    fn binary_record_length_counts_digital_words() {
        let text = PSCAD_CFG.replace("ASCII", "BINARY");
        let cfg = RecordConfig::parse(&text).unwrap();
        assert_eq!(cfg.binary_record_len(), 8 + 3 * 2 + 2);
        let text = PSCAD_CFG.replace("ASCII", "float32");
        let cfg = RecordConfig::parse(&text).unwrap();
        assert_eq!(cfg.binary_record_len(), 8 + 3 * 4 + 2);
    }
}
