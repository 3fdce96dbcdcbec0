use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ComtradeError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no COMTRADE file found at {0}")]
    NotFound(PathBuf),
    #[error("configuration ended early, expected {0}")]
    UnexpectedEof(&'static str),
    #[error("configuration line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("channel count mismatch: header total {total}, but {analog}A + {digital}D")]
    ChannelCount {
        total: usize,
        analog: usize,
        digital: usize,
    },
    #[error("unsupported data file type `{0}`")]
    UnsupportedFormat(String),
    #[error("data row {row}: expected {expected} fields, got {actual}")]
    ShortRow {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("data row {row}, field {field}: cannot parse `{value}`")]
    BadValue {
        row: usize,
        field: usize,
        value: String,
    },
    #[error("binary data of {len} bytes is not a whole number of {record}-byte records")]
    TruncatedBinary { len: usize, record: usize },
    #[error("configuration line {line}: rate segment {segment} has rate {rate_hz} Hz")]
    NonPositiveRate {
        line: usize,
        segment: usize,
        rate_hz: f64,
    },
}

impl ComtradeError {
    pub(crate) fn syntax(line: usize, message: impl Into<String>) -> Self {
        ComtradeError::Syntax {
            line,
            message: message.into(),
        }
    }
}
