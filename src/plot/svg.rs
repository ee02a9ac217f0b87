//! SVG chart files via Plotters.

use std::path::Path;

use plotters::prelude::*;

use crate::error::AppError;
use crate::plot::{Chart, SeriesKind};

pub const SVG_WIDTH: u32 = 1000;
pub const SVG_HEIGHT: u32 = 600;

/// Palette cycled over series.
const PALETTE: [RGBColor; 7] = [
    RGBColor(214, 39, 40),
    RGBColor(31, 119, 180),
    RGBColor(44, 160, 44),
    RGBColor(255, 127, 14),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(23, 190, 207),
];

/// Write `chart` as an SVG file.
pub fn render_svg(chart: &Chart, path: &Path, width: u32, height: u32) -> Result<(), AppError> {
    draw(chart, path, width, height)
        .map_err(|e| AppError::runtime(format!("Failed to render {}: {e}", path.display())))
}

fn draw(chart: &Chart, path: &Path, width: u32, height: u32) -> Result<(), Box<dyn std::error::Error>> {
    let (x0, x1, y0, y1) = chart.bounds().ok_or("chart has no finite points")?;
    let y_pad = (y1 - y0) * 0.05;

    let root = SVGBackend::new(path, (width, height)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut ctx = ChartBuilder::on(&root)
        .caption(&chart.title, ("sans-serif", 22))
        .margin(12)
        .x_label_area_size(48)
        .y_label_area_size(70)
        .build_cartesian_2d(x0..x1, (y0 - y_pad)..(y1 + y_pad))?;

    let fmt_x = |v: &f64| chart.format_x(*v);
    let fmt_y = |v: &f64| chart.format_y(*v);
    ctx.configure_mesh()
        .x_desc(chart.x_label.as_str())
        .y_desc(chart.y_label.as_str())
        .x_labels(8)
        .y_labels(8)
        .x_label_formatter(&fmt_x)
        .y_label_formatter(&fmt_y)
        .draw()?;

    for (i, series) in chart.projected_series().into_iter().enumerate() {
        let color = PALETTE[i % PALETTE.len()];
        match series.kind {
            SeriesKind::Line => {
                ctx.draw_series(LineSeries::new(series.points, color.stroke_width(2)))?
                    .label(series.label)
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
            }
            SeriesKind::Points => {
                ctx.draw_series(series.points.into_iter().map(|p| Circle::new(p, 4, color.filled())))?
                    .label(series.label)
                    .legend(move |(x, y)| Circle::new((x + 10, y), 4, color.filled()));
            }
        }
    }

    for a in &chart.annotations {
        if let Some(p) = chart.project((a.x, a.y)) {
            ctx.draw_series(std::iter::once(Text::new(a.text.clone(), p, ("sans-serif", 14))))?;
        }
    }

    ctx.configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plot::{Series, XAxis};

    #[test]
    fn writes_an_svg_file() {
        let dir = std::env::temp_dir().join(format!("epi-curves-svg-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("chart.svg");

        let chart = Chart::new("test chart", XAxis::Days)
            .labels("days", "value")
            .with_series(Series::line("a", [(0.0, 1.0), (1.0, 3.0), (2.0, 2.0)]))
            .with_series(Series::points("b", [(0.5, 2.0)]));
        render_svg(&chart, &path, 400, 300).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("<svg"));
        assert!(text.contains("test chart"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn empty_chart_is_an_error() {
        let chart = Chart::new("empty", XAxis::Days);
        let path = std::env::temp_dir().join("epi-curves-never-written.svg");
        assert!(render_svg(&chart, &path, 100, 100).is_err());
    }
}
