// src/cli.rs
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueHint};

use crate::normalize::BaseQuantities;
use crate::render::{comparison_ticks, XAxis};
use crate::session::{Job, SessionConfig, SessionError};
use crate::types::Simulator;

#[derive(Parser, Debug)]
#[command(name = "emtplot", version, about = "Per-unit plots of EMT COMTRADE records", long_about = None)]
pub struct Cli {
    /// Line-to-line base voltage in kV
    #[arg(long, global = true)]
    pub kv_ll: Option<f64>,

    /// Base power in MVA
    #[arg(long, global = true)]
    pub mva: Option<f64>,

    /// Do not open the plot window
    #[arg(long, global = true)]
    pub no_show: bool,

    /// Write one PNG per figure into this directory
    #[arg(long, global = true, value_hint = ValueHint::DirPath)]
    pub png_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Five-panel per-unit plot of one record
    Case {
        /// Record path without the .cfg/.dat extension
        #[arg(value_hint = ValueHint::FilePath)]
        stem: PathBuf,
        #[arg(long)]
        title: Option<String>,
        /// Simulator that wrote the record; selects the RMS voltage convention
        #[arg(long, value_enum)]
        simulator: Option<Simulator>,
        /// Time window to show
        #[arg(long, num_args = 2, value_names = ["START", "END"])]
        xlim: Option<Vec<f64>>,
    },
    /// Overlay an IBR record and a machine record
    Compare {
        #[arg(value_hint = ValueHint::FilePath)]
        ibr: PathBuf,
        #[arg(value_hint = ValueHint::FilePath)]
        machine: PathBuf,
        #[arg(long, value_enum)]
        simulator: Option<Simulator>,
    },
    /// Plot every channel of a record in its file units
    Survey {
        #[arg(value_hint = ValueHint::FilePath)]
        stem: PathBuf,
    },
    /// Ramping SCR test of a session folder
    RampScr {
        #[arg(value_hint = ValueHint::DirPath)]
        session_dir: PathBuf,
        #[arg(long, value_enum, default_value = "pscad")]
        simulator: Simulator,
        /// Save the figure, into --png-dir or the current directory
        #[arg(long)]
        save_png: bool,
    },
    /// Run the jobs of a JSON session file
    Run {
        #[arg(value_hint = ValueHint::FilePath)]
        config: PathBuf,
    },
}

impl Cli {
    /// Session described by the command line. Flags override the session file.
    pub fn into_session(self) -> Result<SessionConfig, SessionError> {
        let mut png_dir = self.png_dir;
        let single = |job: Job| SessionConfig {
            jobs: vec![job],
            ..SessionConfig::default()
        };
        let mut config = match self.command {
            Command::Run { config } => SessionConfig::load(&config)?,
            Command::Case {
                stem,
                title,
                simulator,
                xlim,
            } => single(Job::Case {
                record: stem,
                title,
                simulator,
                x_axis: match xlim.as_deref() {
                    Some([start, end]) => XAxis::Window {
                        start: *start,
                        end: *end,
                    },
                    _ => XAxis::Auto,
                },
            }),
            Command::Compare {
                ibr,
                machine,
                simulator,
            } => single(Job::Compare {
                ibr,
                machine,
                simulator,
                x_axis: comparison_ticks(),
            }),
            Command::Survey { stem } => single(Job::Survey { record: stem }),
            Command::RampScr {
                session_dir,
                simulator,
                save_png,
            } => {
                if save_png && png_dir.is_none() {
                    png_dir = Some(PathBuf::from("."));
                }
                single(Job::RampScr {
                    session_dir,
                    simulator,
                })
            }
        };
        if self.kv_ll.is_some() || self.mva.is_some() {
            let kv_ll = self.kv_ll.unwrap_or(config.base.kv_ln() * 3f64.sqrt());
            let mva = self.mva.unwrap_or(config.base.mva());
            config.base = BaseQuantities::from_line_to_line(kv_ll, mva);
        }
        if png_dir.is_some() {
            config.png_dir = png_dir;
        }
        if self.no_show {
            config.show = false;
        }
        Ok(config)
    }
}
