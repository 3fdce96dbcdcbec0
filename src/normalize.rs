//! Per-unit scaling of EMT channels.
//!
//! Channels are classified by substring of their label, first match wins:
//! `P`, `Q`, `I`, `Vrms`, `V`, then identity. `Vrms` has to be tested before
//! the bare `V` or RMS channels would be treated as instantaneous voltages.
use std::f64::consts::SQRT_2;

use serde::{Deserialize, Serialize};

use crate::types::Simulator;

/// Nominal line-to-line voltage of the test systems (kV).
pub const DEFAULT_KV_LL: f64 = 230.0;
/// System power base (MVA).
pub const DEFAULT_MVA: f64 = 100.0;

/// System base quantities used to convert engineering units to per-unit.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "LineToLineBase", into = "LineToLineBase")]
pub struct BaseQuantities {
    kv_ln: f64,
    mva: f64,
}

impl BaseQuantities {
    pub fn from_line_to_line(kv_ll: f64, mva: f64) -> Self {
        Self {
            kv_ln: kv_ll / 3.0_f64.sqrt(),
            mva,
        }
    }

    /// Line-to-neutral voltage base (kV).
    pub fn kv_ln(&self) -> f64 {
        self.kv_ln
    }

    pub fn mva(&self) -> f64 {
        self.mva
    }

    /// Per-phase current base (kA), derived from the power and voltage bases.
    pub fn ka(&self) -> f64 {
        self.mva / self.kv_ln / 3.0
    }
}

impl Default for BaseQuantities {
    fn default() -> Self {
        Self::from_line_to_line(DEFAULT_KV_LL, DEFAULT_MVA)
    }
}

/// Serialized form: configs state the line-to-line voltage.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
struct LineToLineBase {
    #[serde(default = "default_kv_ll")]
    kv_ll: f64,
    #[serde(default = "default_mva")]
    mva: f64,
}

fn default_kv_ll() -> f64 {
    DEFAULT_KV_LL
}

fn default_mva() -> f64 {
    DEFAULT_MVA
}

impl From<LineToLineBase> for BaseQuantities {
    fn from(value: LineToLineBase) -> Self {
        BaseQuantities::from_line_to_line(value.kv_ll, value.mva)
    }
}

impl From<BaseQuantities> for LineToLineBase {
    fn from(value: BaseQuantities) -> Self {
        LineToLineBase {
            kv_ll: value.kv_ln * 3.0_f64.sqrt(),
            mva: value.mva,
        }
    }
}

/// Scale factor that ignores which tool wrote the record. `Vrms` is assumed
/// to be metered in per-unit already.
pub fn scale_factor(label: &str, base: &BaseQuantities) -> f64 {
    classify(label, base, None)
}

/// Scale factor that accounts for the tool's RMS voltage convention.
pub fn scale_factor_for(label: &str, base: &BaseQuantities, simulator: Simulator) -> f64 {
    classify(label, base, Some(simulator))
}

fn classify(label: &str, base: &BaseQuantities, context: Option<Simulator>) -> f64 {
    if label.contains('P') || label.contains('Q') {
        1.0 / base.mva
    } else if label.contains('I') {
        1.0 / base.ka() / SQRT_2
    } else if label.contains("Vrms") {
        match context {
            Some(Simulator::Emtp) => 1.0 / base.kv_ln,
            Some(Simulator::Pscad) | None => 1.0,
        }
    } else if label.contains('V') {
        1.0 / base.kv_ln / SQRT_2
    } else {
        1.0
    }
}

/// Bases plus an optional simulator context, handed to figure builders.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Normalizer {
    pub base: BaseQuantities,
    pub context: Option<Simulator>,
}

impl Normalizer {
    pub fn new(base: BaseQuantities) -> Self {
        Self {
            base,
            context: None,
        }
    }

    pub fn for_simulator(base: BaseQuantities, simulator: Simulator) -> Self {
        Self {
            base,
            context: Some(simulator),
        }
    }

    pub fn scale_factor(&self, label: &str) -> f64 {
        classify(label, &self.base, self.context)
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(BaseQuantities::default())
    }
}
