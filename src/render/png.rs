use std::fs;
use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use plotters::coord::ranged1d::ValueFormatter;
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;

use crate::render::error::RenderError;
use crate::render::figure::{format_tick, Figure};
use crate::types::LegendPosition;

#[derive(Clone, Debug)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    pub background: RGBColor,
    pub foreground: RGBColor,
    pub palette: Vec<RGBColor>,
    pub line_width: u32,
    pub font_size: u32,
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            // matplotlib figsize=(15, 10) at 100 dpi
            width: 1500,
            height: 1000,
            background: WHITE,
            foreground: BLACK,
            palette: vec![
                RGBColor(31, 119, 180),
                RGBColor(255, 127, 14),
                RGBColor(44, 160, 44),
                RGBColor(214, 39, 40),
                RGBColor(148, 103, 189),
                RGBColor(140, 86, 75),
            ],
            line_width: 1,
            font_size: 14,
        }
    }
}

/// Largest bitmap accepted, in pixels.
pub const MAX_PIXELS: usize = 10_000 * 10_000;

/// Byte length of an RGB buffer for the given size.
fn rgb_buffer_len(width: u32, height: u32) -> Result<usize, RenderError> {
    let pixels = (width as usize)
        .checked_mul(height as usize)
        .filter(|p| *p > 0 && *p <= MAX_PIXELS)
        .ok_or(RenderError::BadSize { width, height })?;
    Ok(pixels * 3)
}

/// Delegating wrapper: plotters provides no `ValueFormatter` for
/// `WithKeyPoints<RangedCoordf64>`, which `configure_mesh` requires.
struct KeyPointAxis(plotters::coord::combinators::WithKeyPoints<RangedCoordf64>);

impl Ranged for KeyPointAxis {
    type FormatOption = plotters::coord::ranged1d::NoDefaultFormatting;
    type ValueType = f64;

    fn map(&self, value: &f64, limit: (i32, i32)) -> i32 {
        self.0.map(value, limit)
    }

    fn key_points<Hint: plotters::coord::ranged1d::KeyPointHint>(&self, hint: Hint) -> Vec<f64> {
        self.0.key_points(hint)
    }

    fn range(&self) -> std::ops::Range<f64> {
        self.0.range()
    }

    fn axis_pixel_range(&self, limit: (i32, i32)) -> std::ops::Range<i32> {
        self.0.axis_pixel_range(limit)
    }
}

impl ValueFormatter<f64> for KeyPointAxis {
    fn format(value: &f64) -> String {
        RangedCoordf64::format(value)
    }
}

pub fn render_figure_png(figure: &Figure, style: &PlotStyle) -> Result<Vec<u8>, RenderError> {
    if figure.panels.is_empty() {
        return Err(RenderError::EmptyFigure(figure.title.clone()));
    }
    let mut buffer = vec![0u8; rgb_buffer_len(style.width, style.height)?];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;
        let body = root.titled(
            &figure.title,
            ("sans-serif", style.font_size + 6)
                .into_font()
                .color(&style.foreground),
        )?;
        let (x_min, x_max) = figure.x_range();
        let x_ticks = figure.x_ticks();
        let tick_label = |x: &f64| format_tick(*x);
        let rows = body.split_evenly((figure.panels.len(), 1));
        let last = rows.len() - 1;
        for (idx, (area, panel)) in rows.iter().zip(&figure.panels).enumerate() {
            let (y_min, y_max) = panel.y_range((x_min, x_max));
            let mut chart = ChartBuilder::on(area)
                .margin(8)
                .set_label_area_size(LabelAreaPosition::Left, 70)
                .set_label_area_size(LabelAreaPosition::Bottom, if idx == last { 45 } else { 25 })
                .build_cartesian_2d(
                    KeyPointAxis((x_min..x_max).with_key_points(x_ticks.clone())),
                    y_min..y_max,
                )?;
            let mut mesh = chart.configure_mesh();
            mesh.x_labels(x_ticks.len())
                .x_label_formatter(&tick_label)
                .y_desc(panel.y_label.as_str())
                .light_line_style(&style.foreground.mix(0.08))
                .bold_line_style(&style.foreground.mix(0.2))
                .label_style(
                    ("sans-serif", style.font_size)
                        .into_font()
                        .color(&style.foreground),
                );
            if idx == last {
                mesh.x_desc(figure.x_label.as_str());
            }
            mesh.draw()?;
            for (series_idx, series) in panel.series.iter().enumerate() {
                let color = style.palette[series_idx % style.palette.len()];
                let points = series
                    .points()
                    .filter(|(x, _)| *x >= x_min && *x <= x_max);
                chart
                    .draw_series(LineSeries::new(
                        points,
                        color.stroke_width(style.line_width),
                    ))?
                    .label(series.label.as_str())
                    .legend(move |(x, y)| {
                        PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
                    });
            }
            chart
                .configure_series_labels()
                .position(match figure.legend {
                    LegendPosition::UpperRight => SeriesLabelPosition::UpperRight,
                    LegendPosition::LowerRight => SeriesLabelPosition::LowerRight,
                })
                .border_style(&style.foreground.mix(0.3))
                .background_style(&style.background.mix(0.8))
                .label_font(
                    ("sans-serif", style.font_size)
                        .into_font()
                        .color(&style.foreground),
                )
                .draw()?;
        }
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}

pub fn save_png(figure: &Figure, style: &PlotStyle, path: &Path) -> Result<(), RenderError> {
    let bytes = render_figure_png(figure, style)?;
    fs::write(path, bytes).map_err(|source| RenderError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>, RenderError> {
    let image = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, buffer.to_vec())
        .ok_or_else(|| RenderError::Plot("failed to allocate image buffer".into()))?;
    let mut output = Vec::new();
    let dynamic = DynamicImage::ImageRgb8(image);
    dynamic.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::figure::XAxis;

    #[test]
    fn encodes_rgb_buffer_as_png() {
        let png = encode_png(&vec![255u8; 4 * 3 * 3], 4, 3).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn undersized_buffer_is_rejected() {
        assert!(matches!(
            encode_png(&[0u8; 5], 4, 3),
            Err(RenderError::Plot(_))
        ));
    }

    #[test]
    fn bitmap_size_is_bounded() {
        assert_eq!(rgb_buffer_len(1500, 1000).unwrap(), 4_500_000);
        assert!(matches!(
            rgb_buffer_len(0, 1000),
            Err(RenderError::BadSize { width: 0, height: 1000 })
        ));
        assert!(matches!(
            rgb_buffer_len(u32::MAX, u32::MAX),
            Err(RenderError::BadSize { .. })
        ));
        assert!(rgb_buffer_len(70_000, 70_000).is_err());
    }

    #[test]
    fn oversized_style_is_rejected_before_drawing() {
        let figure = Figure {
            title: "big".into(),
            x_label: "seconds".into(),
            x_axis: XAxis::Auto,
            legend: LegendPosition::default(),
            panels: vec![crate::render::Panel {
                y_label: "F [Hz]".into(),
                series: Vec::new(),
            }],
        };
        let style = PlotStyle {
            width: 100_000,
            height: 100_000,
            ..PlotStyle::default()
        };
        assert!(matches!(
            render_figure_png(&figure, &style),
            Err(RenderError::BadSize { .. })
        ));
    }

    #[test]
    fn empty_figure_is_rejected() {
        let figure = Figure {
            title: "nothing".into(),
            x_label: "seconds".into(),
            x_axis: XAxis::Auto,
            legend: LegendPosition::default(),
            panels: Vec::new(),
        };
        assert!(matches!(
            render_figure_png(&figure, &PlotStyle::default()),
            Err(RenderError::EmptyFigure(t)) if t == "nothing"
        ));
    }
}
