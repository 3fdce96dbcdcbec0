//! Backend-independent figure model and the standard EMT figure layouts.
use serde::{Deserialize, Serialize};

use crate::channels::{ChannelError, ChannelSet};
use crate::normalize::Normalizer;
use crate::types::LegendPosition;

/// How the shared time axis is bounded.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XAxis {
    /// Span of the plotted data.
    #[default]
    Auto,
    Window { start: f64, end: f64 },
    /// Explicit ticks; limits are the first and last tick.
    Ticks(Vec<f64>),
}

impl XAxis {
    /// `count` evenly spaced ticks from `start` to `end` inclusive.
    pub fn linspace(start: f64, end: f64, count: usize) -> Self {
        let ticks = match count {
            0 => Vec::new(),
            1 => vec![start],
            _ => {
                let step = (end - start) / (count - 1) as f64;
                let mut ticks: Vec<f64> = (0..count).map(|i| start + step * i as f64).collect();
                ticks[count - 1] = end;
                ticks
            }
        };
        XAxis::Ticks(ticks)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Series {
    pub label: String,
    pub time: Vec<f64>,
    pub values: Vec<f64>,
}

impl Series {
    /// Finite `(t, y)` pairs.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.time
            .iter()
            .copied()
            .zip(self.values.iter().copied())
            .filter(|(x, y)| x.is_finite() && y.is_finite())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Panel {
    pub y_label: String,
    pub series: Vec<Series>,
}

impl Panel {
    /// Y bounds of the samples inside `x_range`, padded by 5%.
    pub fn y_range(&self, x_range: (f64, f64)) -> (f64, f64) {
        let (lo, hi) = self
            .series
            .iter()
            .flat_map(|s| s.points())
            .filter(|(x, _)| *x >= x_range.0 && *x <= x_range.1)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (_, y)| {
                (lo.min(y), hi.max(y))
            });
        if !lo.is_finite() || !hi.is_finite() {
            return (-1.0, 1.0);
        }
        let span = hi - lo;
        if span.abs() < f64::EPSILON * hi.abs().max(1.0) {
            (lo - 1.0, hi + 1.0)
        } else {
            (lo - 0.05 * span, hi + 0.05 * span)
        }
    }
}

/// Stacked panels sharing one time axis.
#[derive(Clone, Debug, PartialEq)]
pub struct Figure {
    pub title: String,
    pub x_label: String,
    pub x_axis: XAxis,
    pub legend: LegendPosition,
    pub panels: Vec<Panel>,
}

impl Figure {
    pub fn with_legend(mut self, legend: LegendPosition) -> Self {
        self.legend = legend;
        self
    }

    fn data_extent(&self) -> Option<(f64, f64)> {
        let (lo, hi) = self
            .panels
            .iter()
            .flat_map(|p| &p.series)
            .flat_map(|s| s.points())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (x, _)| {
                (lo.min(x), hi.max(x))
            });
        (lo.is_finite() && hi > lo).then_some((lo, hi))
    }

    /// Resolved x limits. Degenerate requests fall back to the data span.
    pub fn x_range(&self) -> (f64, f64) {
        let requested = match &self.x_axis {
            XAxis::Auto => None,
            XAxis::Window { start, end } => Some((*start, *end)),
            XAxis::Ticks(ticks) => ticks.first().copied().zip(ticks.last().copied()),
        };
        match requested {
            Some((lo, hi)) if hi > lo => (lo, hi),
            _ => self.data_extent().unwrap_or((0.0, 1.0)),
        }
    }

    /// Tick positions on the time axis: the requested ticks inside the
    /// limits, otherwise round 1-2-5 steps.
    pub fn x_ticks(&self) -> Vec<f64> {
        let (lo, hi) = self.x_range();
        if let XAxis::Ticks(ticks) = &self.x_axis {
            let inside: Vec<f64> = ticks.iter().copied().filter(|t| *t >= lo && *t <= hi).collect();
            if !inside.is_empty() {
                return inside;
            }
        }
        round_ticks(lo, hi, 10)
    }
}

fn round_ticks(lo: f64, hi: f64, target: usize) -> Vec<f64> {
    let raw = (hi - lo) / target.max(1) as f64;
    if !(raw.is_finite() && raw > 0.0) {
        return vec![lo];
    }
    let magnitude = 10f64.powf(raw.log10().floor());
    let step = [1.0, 2.0, 5.0, 10.0]
        .iter()
        .map(|m| m * magnitude)
        .find(|s| *s >= raw)
        .unwrap_or(10.0 * magnitude);
    let first = (lo / step).ceil() as i64;
    let last = (hi / step + 1e-9).floor() as i64;
    (first..=last).map(|k| k as f64 * step).collect()
}

/// Tick text with at most three decimals and no trailing zeros.
pub fn format_tick(value: f64) -> String {
    let text = format!("{value:.3}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".into()
    } else {
        text.to_string()
    }
}

/// Channel groups of the five-panel case figure.
const CASE_PANELS: [(&[&str], &str); 5] = [
    (&["VA", "VB", "VC"], "V(t) [pu]"),
    (&["IA", "IB", "IC"], "I(t) [pu]"),
    (&["Vrms"], "V [pu]"),
    (&["P", "Q"], "P, Q [pu]"),
    (&["F"], "F [Hz]"),
];

/// Panels of the two-source comparison figure.
const COMPARISON_PANELS: [(&str, &str); 4] = [
    ("Vrms", "Vrms [pu]"),
    ("P", "P [pu]"),
    ("Q", "Q [pu]"),
    ("F", "F [Hz]"),
];

pub const COMPARISON_TITLE: &str = "Comparing IBR and Machine Behaviors";

pub fn comparison_ticks() -> XAxis {
    XAxis::Ticks(vec![0.75, 1.00, 1.25, 1.50, 1.75])
}

fn scaled_series(
    channels: &ChannelSet,
    label: &str,
    series_label: &str,
    normalizer: &Normalizer,
) -> Result<Series, ChannelError> {
    Ok(Series {
        label: series_label.to_string(),
        time: channels.time().to_vec(),
        values: channels.scaled(label, normalizer)?.to_vec(),
    })
}

/// Three-phase voltages and currents, RMS voltage, P/Q and frequency.
pub fn case_figure(
    channels: &ChannelSet,
    normalizer: &Normalizer,
    title: impl Into<String>,
    x_axis: XAxis,
) -> Result<Figure, ChannelError> {
    let panels = CASE_PANELS
        .iter()
        .map(|(labels, y_label)| {
            let series = labels
                .iter()
                .map(|label| scaled_series(channels, label, label, normalizer))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Panel {
                y_label: y_label.to_string(),
                series,
            })
        })
        .collect::<Result<Vec<_>, ChannelError>>()?;
    Ok(Figure {
        title: title.into(),
        x_label: "seconds".into(),
        x_axis,
        legend: LegendPosition::default(),
        panels,
    })
}

/// Overlays an inverter-based plant and a synchronous machine.
pub fn comparison_figure(
    ibr: &ChannelSet,
    machine: &ChannelSet,
    normalizer: &Normalizer,
    x_axis: XAxis,
) -> Result<Figure, ChannelError> {
    let panels = COMPARISON_PANELS
        .iter()
        .map(|(label, y_label)| {
            Ok(Panel {
                y_label: y_label.to_string(),
                series: vec![
                    scaled_series(ibr, label, "IBR", normalizer)?,
                    scaled_series(machine, label, "Machine", normalizer)?,
                ],
            })
        })
        .collect::<Result<Vec<_>, ChannelError>>()?;
    Ok(Figure {
        title: COMPARISON_TITLE.into(),
        x_label: "Time [s]".into(),
        x_axis,
        legend: LegendPosition::default(),
        panels,
    })
}

/// Every channel in its own panel, unscaled, labelled with its unit.
pub fn survey_figure(channels: &ChannelSet, title: impl Into<String>) -> Figure {
    let time = channels.time();
    let x_axis = if time.is_empty() {
        XAxis::Auto
    } else {
        XAxis::Window {
            start: time[0],
            end: (time[time.len() - 1] + 0.5).trunc(),
        }
    };
    let panels = channels
        .channels()
        .iter()
        .map(|channel| Panel {
            y_label: channel.unit.clone(),
            series: vec![Series {
                label: channel.label.clone(),
                time: time.to_vec(),
                values: channel.samples.to_vec(),
            }],
        })
        .collect();
    Figure {
        title: title.into(),
        x_label: "Time [s]".into(),
        x_axis,
        legend: LegendPosition::default(),
        panels,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::BaseQuantities;
    use ndarray::Array1;

    fn full_case(scale: f64) -> ChannelSet {
        let time = Array1::linspace(0.0, 2.0, 201);
        let mut set = ChannelSet::new("case", time.clone());
        for (label, unit) in [
            ("VA", "kV"),
            ("VB", "kV"),
            ("VC", "kV"),
            ("IA", "kA"),
            ("IB", "kA"),
            ("IC", "kA"),
            ("Vrms", "pu"),
            ("P", "MW"),
            ("Q", "MVAR"),
            ("F", "Hz"),
        ] {
            set.insert(label, unit, time.mapv(|t| scale * (t + 1.0))).unwrap();
        }
        set
    }

    #[test]
    fn linspace_matches_ten_ticks_to_tmax() {
        let XAxis::Ticks(ticks) = XAxis::linspace(0.0, 45.0, 10) else {
            panic!("expected ticks");
        };
        assert_eq!(ticks.len(), 10);
        assert_eq!(ticks[0], 0.0);
        assert!((ticks[9] - 45.0).abs() < 1e-12);
        assert!((ticks[1] - 5.0).abs() < 1e-12);
    }

    #[test]
    fn case_figure_groups_channels_by_quantity() {
        let set = full_case(1.0);
        let norm = Normalizer::new(BaseQuantities::default());
        let figure = case_figure(&set, &norm, "Case: PSCAD Solar2", XAxis::Auto).unwrap();
        let layout: Vec<(String, Vec<String>)> = figure
            .panels
            .iter()
            .map(|p| {
                (
                    p.y_label.clone(),
                    p.series.iter().map(|s| s.label.clone()).collect(),
                )
            })
            .collect();
        assert_eq!(layout[0], ("V(t) [pu]".into(), vec!["VA".into(), "VB".into(), "VC".into()]));
        assert_eq!(layout[2], ("V [pu]".into(), vec!["Vrms".into()]));
        assert_eq!(layout[3], ("P, Q [pu]".into(), vec!["P".into(), "Q".into()]));
        assert_eq!(layout[4], ("F [Hz]".into(), vec!["F".into()]));
        assert_eq!(figure.x_label, "seconds");
        let p = &figure.panels[3].series[0];
        assert!((p.values[0] - 0.01).abs() < 1e-12);
    }

    #[test]
    fn case_figure_needs_every_channel() {
        let mut set = ChannelSet::new("short", Array1::from(vec![0.0, 1.0]));
        set.insert("VA", "kV", Array1::from(vec![1.0, 2.0])).unwrap();
        let err = case_figure(&set, &Normalizer::default(), "x", XAxis::Auto).unwrap_err();
        assert!(matches!(err, ChannelError::Missing(l) if l == "VB"));
    }

    #[test]
    fn comparison_overlays_both_sources() {
        let ibr = full_case(1.0);
        let machine = full_case(2.0);
        let figure =
            comparison_figure(&ibr, &machine, &Normalizer::default(), comparison_ticks()).unwrap();
        assert_eq!(figure.title, COMPARISON_TITLE);
        assert_eq!(figure.panels.len(), 4);
        for panel in &figure.panels {
            let names: Vec<_> = panel.series.iter().map(|s| s.label.as_str()).collect();
            assert_eq!(names, vec!["IBR", "Machine"]);
        }
        assert_eq!(figure.x_range(), (0.75, 1.75));
        assert_eq!(figure.x_ticks().len(), 5);
    }

    #[test]
    fn survey_uses_units_and_rounded_end() {
        let time = Array1::linspace(0.0, 2.6, 27);
        let mut set = ChannelSet::new("raw", time);
        set.insert("VA", "kV", Array1::zeros(27)).unwrap();
        set.insert("F", "Hz", Array1::from_elem(27, 60.0)).unwrap();
        let figure = survey_figure(&set, "Case: raw");
        assert_eq!(figure.panels.len(), 2);
        assert_eq!(figure.panels[0].y_label, "kV");
        assert_eq!(figure.panels[1].series[0].label, "F");
        assert_eq!(figure.x_range(), (0.0, 3.0));
    }

    #[test]
    fn requested_ticks_are_kept_exactly() {
        let figure = comparison_figure(
            &full_case(1.0),
            &full_case(2.0),
            &Normalizer::default(),
            comparison_ticks(),
        )
        .unwrap();
        assert_eq!(figure.x_ticks(), vec![0.75, 1.00, 1.25, 1.50, 1.75]);
        let labels: Vec<String> = figure.x_ticks().into_iter().map(format_tick).collect();
        assert_eq!(labels, vec!["0.75", "1", "1.25", "1.5", "1.75"]);

        let ramp = case_figure(
            &full_case(1.0),
            &Normalizer::default(),
            "ramp",
            XAxis::linspace(0.0, 45.0, 10),
        )
        .unwrap();
        let ticks = ramp.x_ticks();
        assert_eq!(ticks.len(), 10);
        assert_eq!((ticks[0], ticks[9]), (0.0, 45.0));
    }

    #[test]
    fn automatic_ticks_use_round_steps() {
        let time = Array1::linspace(0.0, 2.6, 27);
        let mut set = ChannelSet::new("raw", time);
        set.insert("F", "Hz", Array1::from_elem(27, 60.0)).unwrap();
        let figure = survey_figure(&set, "raw");
        let ticks = figure.x_ticks();
        assert_eq!(ticks.len(), 7);
        for (idx, tick) in ticks.iter().enumerate() {
            assert!((tick - 0.5 * idx as f64).abs() < 1e-12);
        }
        assert_eq!(format_tick(-0.0001), "0");
        assert_eq!(format_tick(4.444_444), "4.444");
    }

    #[test]
    fn degenerate_window_falls_back_to_data() {
        let time = Array1::from(vec![0.0, 0.001, 0.002]);
        let mut set = ChannelSet::new("tiny", time);
        set.insert("F", "Hz", Array1::from(vec![60.0, 60.0, 60.0])).unwrap();
        let figure = survey_figure(&set, "tiny");
        assert_eq!(figure.x_range(), (0.0, 0.002));
    }

    #[test]
    fn y_range_pads_and_handles_flat_and_missing() {
        let panel = Panel {
            y_label: "F [Hz]".into(),
            series: vec![Series {
                label: "F".into(),
                time: vec![0.0, 1.0, 2.0, 3.0],
                values: vec![59.0, f64::NAN, 61.0, 100.0],
            }],
        };
        let (lo, hi) = panel.y_range((0.0, 2.0));
        assert!((lo - 58.9).abs() < 1e-9 && (hi - 61.1).abs() < 1e-9);

        let flat = Panel {
            y_label: String::new(),
            series: vec![Series {
                label: "F".into(),
                time: vec![0.0, 1.0],
                values: vec![60.0, 60.0],
            }],
        };
        assert_eq!(flat.y_range((0.0, 1.0)), (59.0, 61.0));
        assert_eq!(flat.y_range((5.0, 6.0)), (-1.0, 1.0));
    }
}
