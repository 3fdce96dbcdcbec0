// src/render/mod.rs
pub mod error;
pub mod figure;
pub mod png;
pub mod viewer;

pub use error::RenderError;
pub use figure::{
    case_figure, comparison_figure, comparison_ticks, format_tick, survey_figure, Figure, Panel, Series,
    XAxis,
};
pub use png::{render_figure_png, save_png, PlotStyle};
pub use viewer::{show_figures, FigureViewer};
