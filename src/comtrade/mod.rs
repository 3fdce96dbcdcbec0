// src/comtrade/mod.rs
//! IEEE C37.111 (COMTRADE) reader for EMT simulation output.
pub mod config;
pub mod data;
pub mod error;
pub mod record;
pub mod source;

#[cfg(test)]
pub(crate) mod fixtures;

pub use config::{AnalogChannel, DataFormat, DigitalChannel, MeterSide, RecordConfig, SampleRate};
pub use data::RawSamples;
pub use error::ComtradeError;
pub use record::Record;
pub use source::{ComtradeFiles, ManualSource, RecordSource};
