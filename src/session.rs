// src/session.rs
//! Plot jobs and the JSON session file that lists them.
use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::channels::{ChannelError, ChannelSet};
use crate::comtrade::ComtradeFiles;
use crate::normalize::{BaseQuantities, Normalizer};
use crate::render::{
    case_figure, comparison_figure, comparison_ticks, save_png, show_figures, survey_figure,
    Figure, PlotStyle, RenderError, XAxis,
};
use crate::types::{LegendPosition, Simulator};

/// Record stem inside a session folder for the ramping SCR test.
pub const RAMP_SCR_RECORD: &str = "rampscr";
/// Frequency meters start at zero in PSCAD; the first sample is set to nominal.
const NOMINAL_FREQUENCY: f64 = 60.0;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid session file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Channels(#[from] ChannelError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    pub width: u32,
    pub height: u32,
    pub font_size: u32,
    pub line_width: u32,
}

impl Default for StyleConfig {
    fn default() -> Self {
        let style = PlotStyle::default();
        Self {
            width: style.width,
            height: style.height,
            font_size: style.font_size,
            line_width: style.line_width,
        }
    }
}

impl From<&StyleConfig> for PlotStyle {
    fn from(value: &StyleConfig) -> Self {
        PlotStyle {
            width: value.width,
            height: value.height,
            font_size: value.font_size,
            line_width: value.line_width,
            ..PlotStyle::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Job {
    /// Five-panel per-unit view of one record.
    Case {
        record: PathBuf,
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        simulator: Option<Simulator>,
        #[serde(default)]
        x_axis: XAxis,
    },
    /// IBR against machine on RMS voltage, P, Q and frequency.
    Compare {
        ibr: PathBuf,
        machine: PathBuf,
        #[serde(default)]
        simulator: Option<Simulator>,
        #[serde(default = "comparison_ticks")]
        x_axis: XAxis,
    },
    /// Raw channels with their file units.
    Survey { record: PathBuf },
    /// Ramping short-circuit-ratio scenario of one session folder.
    RampScr {
        session_dir: PathBuf,
        simulator: Simulator,
    },
}

impl Job {
    pub fn describe(&self) -> String {
        match self {
            Job::Case { record, .. } => format!("case plot of {}", record.display()),
            Job::Compare { ibr, machine, .. } => {
                format!("comparison of {} and {}", ibr.display(), machine.display())
            }
            Job::Survey { record } => format!("channel survey of {}", record.display()),
            Job::RampScr {
                session_dir,
                simulator,
            } => format!("{simulator} ramping SCR test in {}", session_dir.display()),
        }
    }

    /// Makes relative paths relative to `dir`.
    pub fn resolve_paths(&mut self, dir: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = dir.join(&*path);
            }
        };
        match self {
            Job::Case { record, .. } | Job::Survey { record } => resolve(record),
            Job::Compare { ibr, machine, .. } => {
                resolve(ibr);
                resolve(machine);
            }
            Job::RampScr { session_dir, .. } => resolve(session_dir),
        }
    }

    pub fn build(&self, base: &BaseQuantities) -> Result<NamedFigure, SessionError> {
        let normalizer = |simulator: &Option<Simulator>| match simulator {
            Some(sim) => Normalizer::for_simulator(*base, *sim),
            None => Normalizer::new(*base),
        };
        let figure = match self {
            Job::Case {
                record,
                title,
                simulator,
                x_axis,
            } => {
                let channels = load(record)?;
                let title = title
                    .clone()
                    .unwrap_or_else(|| format!("Case: {}", stem_name(record)));
                case_figure(&channels, &normalizer(simulator), title, x_axis.clone())?
            }
            Job::Compare {
                ibr,
                machine,
                simulator,
                x_axis,
            } => {
                let ibr = load(ibr)?;
                let machine = load(machine)?;
                comparison_figure(&ibr, &machine, &normalizer(simulator), x_axis.clone())?
            }
            Job::Survey { record } => {
                let channels = load(record)?;
                survey_figure(&channels, format!("Case: {}", stem_name(record)))
            }
            Job::RampScr {
                session_dir,
                simulator,
            } => {
                let mut channels = load(&session_dir.join(RAMP_SCR_RECORD))?;
                if *simulator == Simulator::Pscad {
                    channels.set_sample("F", 0, NOMINAL_FREQUENCY)?;
                }
                let tag = simulator.case_tag();
                let figure = case_figure(
                    &channels,
                    &Normalizer::for_simulator(*base, *simulator),
                    format!("Ramping SCR test: {tag}"),
                    XAxis::linspace(0.0, simulator.ramp_duration(), 10),
                )?
                .with_legend(LegendPosition::LowerRight);
                return Ok(NamedFigure {
                    name: format!("{tag}_{RAMP_SCR_RECORD}"),
                    figure,
                });
            }
        };
        Ok(NamedFigure {
            name: file_slug(&figure.title),
            figure,
        })
    }
}

fn stem_name(stem: &Path) -> String {
    stem.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| stem.display().to_string())
}

fn load(stem: &Path) -> Result<ChannelSet, ChannelError> {
    ChannelSet::load(&mut ComtradeFiles::new(stem))
}

/// A figure and the file stem it is saved under.
#[derive(Clone, Debug, PartialEq)]
pub struct NamedFigure {
    pub name: String,
    pub figure: Figure,
}

/// Lower-case ASCII stem with runs of other characters folded to `_`.
pub fn file_slug(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.ends_with('_') && !slug.is_empty() {
            slug.push('_');
        }
    }
    let slug = slug.trim_end_matches('_').to_string();
    if slug.is_empty() {
        "figure".into()
    } else {
        slug
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub base: BaseQuantities,
    pub style: StyleConfig,
    pub png_dir: Option<PathBuf>,
    pub show: bool,
    pub jobs: Vec<Job>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base: BaseQuantities::default(),
            style: StyleConfig::default(),
            png_dir: None,
            show: true,
            jobs: Vec::new(),
        }
    }
}

impl SessionConfig {
    /// Reads a session file; relative paths are taken from its folder.
    pub fn load(path: &Path) -> Result<Self, SessionError> {
        let text = fs::read_to_string(path).map_err(|source| SessionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: SessionConfig =
            serde_json::from_str(&text).map_err(|source| SessionError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        let dir = path.parent().unwrap_or_else(|| Path::new(""));
        for job in &mut config.jobs {
            job.resolve_paths(dir);
        }
        if let Some(png_dir) = &mut config.png_dir {
            if png_dir.is_relative() {
                *png_dir = dir.join(&*png_dir);
            }
        }
        Ok(config)
    }

    pub fn build_figures(&self) -> Result<Vec<NamedFigure>, SessionError> {
        self.jobs
            .iter()
            .map(|job| {
                info!("building {}", job.describe());
                job.build(&self.base)
            })
            .collect()
    }
}

/// Builds every figure, writes PNGs if asked, then opens the viewer.
pub fn run_jobs(config: &SessionConfig) -> Result<Vec<NamedFigure>, SessionError> {
    let figures = config.build_figures()?;
    if let Some(dir) = &config.png_dir {
        fs::create_dir_all(dir).map_err(|source| SessionError::Io {
            path: dir.clone(),
            source,
        })?;
        let style = PlotStyle::from(&config.style);
        for named in &figures {
            let path = dir.join(format!("{}.png", named.name));
            save_png(&named.figure, &style, &path)?;
            info!("saved {}", path.display());
        }
    }
    if config.show {
        show_figures(figures.iter().map(|f| f.figure.clone()).collect())?;
    }
    Ok(figures)
}
