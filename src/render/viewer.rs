// src/render/viewer.rs
use eframe::egui;
use egui_plot::{Corner, Legend, Line, Plot, PlotPoints};

use crate::render::error::RenderError;
use crate::render::figure::Figure;
use crate::types::LegendPosition;

/// One window, one tab per figure, panels stacked with a shared time axis.
pub struct FigureViewer {
    figures: Vec<Figure>,
    selected: usize,
}

impl FigureViewer {
    pub fn new(figures: Vec<Figure>) -> Self {
        Self {
            figures,
            selected: 0,
        }
    }
}

impl eframe::App for FigureViewer {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::top("figure_tabs").show(ctx, |ui| {
            ui.horizontal_wrapped(|ui| {
                for (idx, figure) in self.figures.iter().enumerate() {
                    ui.selectable_value(&mut self.selected, idx, figure.title.as_str());
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let Some(figure) = self.figures.get(self.selected) else {
                ui.label("No figures to show.");
                return;
            };
            ui.heading(figure.title.as_str());
            let (x_min, x_max) = figure.x_range();
            let rows = figure.panels.len().max(1) as f32;
            let height = ((ui.available_height() - 40.0) / rows - 22.0).max(80.0);
            let corner = match figure.legend {
                LegendPosition::UpperRight => Corner::RightTop,
                LegendPosition::LowerRight => Corner::RightBottom,
            };
            let link_group = egui::Id::new(("figure", self.selected));
            for (idx, panel) in figure.panels.iter().enumerate() {
                ui.label(panel.y_label.as_str());
                let (y_min, y_max) = panel.y_range((x_min, x_max));
                Plot::new(("panel", self.selected, idx))
                    .height(height)
                    .link_axis(link_group, true, false)
                    .include_x(x_min)
                    .include_x(x_max)
                    .include_y(y_min)
                    .include_y(y_max)
                    .legend(Legend::default().position(corner))
                    .show(ui, |plot_ui| {
                        for series in &panel.series {
                            let points: Vec<[f64; 2]> =
                                series.points().map(|(x, y)| [x, y]).collect();
                            plot_ui.line(Line::new(PlotPoints::new(points)).name(&series.label));
                        }
                    });
            }
            ui.label(figure.x_label.as_str());
        });
    }
}

/// Blocks until the window is closed.
pub fn show_figures(figures: Vec<Figure>) -> Result<(), RenderError> {
    if figures.is_empty() {
        return Ok(());
    }
    let viewport = egui::ViewportBuilder::default()
        .with_inner_size([1500.0, 1000.0])
        .with_min_inner_size([800.0, 600.0])
        .with_title("emtplot");
    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };
    eframe::run_native(
        "emtplot",
        options,
        Box::new(move |_cc| Box::new(FigureViewer::new(figures))),
    )
    .map_err(|e| RenderError::Viewer(e.to_string()))
}
