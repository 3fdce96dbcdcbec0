// src/types.rs
use serde::{Deserialize, Serialize};
use std::fmt;

/// EMT tool that produced a record.
///
/// The tools disagree on how RMS voltage is written out: PSCAD meters it in
/// per-unit already, EMTP writes kilovolts line-to-neutral.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Simulator {
    Pscad,
    Emtp,
}

impl Simulator {
    /// Case tag used in figure titles and PNG names.
    pub fn case_tag(self) -> &'static str {
        match self {
            Simulator::Pscad => "Solar",
            Simulator::Emtp => "Wind",
        }
    }

    /// Length of the ramping SCR scenario in seconds.
    pub fn ramp_duration(self) -> f64 {
        match self {
            Simulator::Pscad => 40.0,
            Simulator::Emtp => 45.0,
        }
    }
}

impl fmt::Display for Simulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Simulator::Pscad => write!(f, "PSCAD"),
            Simulator::Emtp => write!(f, "EMTP"),
        }
    }
}

/// Where a series legend sits inside a panel.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegendPosition {
    #[default]
    UpperRight,
    LowerRight,
}
