use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::comtrade::{ComtradeError, Record};

/// Something that can hand over a decoded record.
pub trait RecordSource {
    /// Short name used in log lines and figure titles.
    fn describe(&self) -> String;
    fn load_record(&mut self) -> Result<Record, ComtradeError>;
}

/// A `.cfg`/`.dat` pair on disk, addressed by the shared path stem.
#[derive(Clone, Debug)]
pub struct ComtradeFiles {
    stem: PathBuf,
}

impl ComtradeFiles {
    pub fn new(stem: impl Into<PathBuf>) -> Self {
        Self { stem: stem.into() }
    }

    pub fn stem(&self) -> &Path {
        &self.stem
    }

    pub fn cfg_path(&self) -> PathBuf {
        self.with_suffix("cfg")
    }

    pub fn dat_path(&self) -> PathBuf {
        self.with_suffix("dat")
    }

    // Appends rather than replaces: PSCAD run folders contain dots.
    fn with_suffix(&self, ext: &str) -> PathBuf {
        let candidate = |ext: &str| {
            let mut name = OsString::from(self.stem.as_os_str());
            name.push(".");
            name.push(ext);
            PathBuf::from(name)
        };
        let lower = candidate(ext);
        if lower.exists() {
            return lower;
        }
        let upper = candidate(&ext.to_ascii_uppercase());
        if upper.exists() {
            upper
        } else {
            lower
        }
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, ComtradeError> {
    if !path.exists() {
        return Err(ComtradeError::NotFound(path.to_path_buf()));
    }
    fs::read(path).map_err(|source| ComtradeError::Io {
        path: path.to_path_buf(),
        source,
    })
}

impl RecordSource for ComtradeFiles {
    fn describe(&self) -> String {
        self.stem.display().to_string()
    }

    fn load_record(&mut self) -> Result<Record, ComtradeError> {
        let cfg_path = self.cfg_path();
        let dat_path = self.dat_path();
        debug!("reading {} and {}", cfg_path.display(), dat_path.display());
        let cfg = read_file(&cfg_path)?;
        let dat = read_file(&dat_path)?;
        Record::parse(&String::from_utf8_lossy(&cfg), &dat)
    }
}

/// In-memory source useful for tests and synthetic records.
pub struct ManualSource {
    name: String,
    record: Record,
}

impl ManualSource {
    pub fn new(name: impl Into<String>, record: Record) -> Self {
        Self {
            name: name.into(),
            record,
        }
    }
}

impl RecordSource for ManualSource {
    fn describe(&self) -> String {
        self.name.clone()
    }

    fn load_record(&mut self) -> Result<Record, ComtradeError> {
        Ok(self.record.clone())
    }
}
