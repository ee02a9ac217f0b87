//! ASCII plotting for terminal output.
//!
//! Fixed-size character grid, deterministic output:
//! - line series: `-`, `*`, `+`, `#`, ... (one mark per series)
//! - point series: `o`, `x`, `@`
//! - annotations are written to the right of their point when there is room
//!
//! Lines are drawn first so points overlay them.

use crate::plot::{Chart, SeriesKind};

const LINE_MARKS: [char; 6] = ['-', '*', '+', '#', '=', '~'];
const POINT_MARKS: [char; 3] = ['o', 'x', '@'];

/// Render `chart` into a `width` x `height` grid with a header and legend.
pub fn render_ascii(chart: &Chart, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let mut out = String::new();
    out.push_str(&format!("Plot: {}\n", chart.title));

    let Some((x_min, x_max, y_min, y_max)) = chart.bounds() else {
        out.push_str("(no finite data)\n");
        return out;
    };
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    out.push_str(&format!(
        "x=[{}, {}] | y=[{}, {}]\n",
        chart.format_x(x_min),
        chart.format_x(x_max),
        chart.format_y(y_min),
        chart.format_y(y_max)
    ));

    let mut grid = vec![vec![' '; width]; height];
    let series = chart.projected_series();
    let marks = assign_marks(&series.iter().map(|s| s.kind).collect::<Vec<_>>());

    for (s, &mark) in series.iter().zip(marks.iter()) {
        if s.kind != SeriesKind::Line {
            continue;
        }
        let mut prev = None;
        for &(x, y) in &s.points {
            let cell = (map_x(x, x_min, x_max, width), map_y(y, y_min, y_max, height));
            match prev {
                Some((x0, y0)) => draw_line(&mut grid, x0, y0, cell.0, cell.1, mark),
                None => {
                    if grid[cell.1][cell.0] == ' ' {
                        grid[cell.1][cell.0] = mark;
                    }
                }
            }
            prev = Some(cell);
        }
    }

    for (s, &mark) in series.iter().zip(marks.iter()) {
        if s.kind != SeriesKind::Points {
            continue;
        }
        for &(x, y) in &s.points {
            grid[map_y(y, y_min, y_max, height)][map_x(x, x_min, x_max, width)] = mark;
        }
    }

    for a in &chart.annotations {
        let Some((x, y)) = chart.project((a.x, a.y)) else {
            continue;
        };
        let row = map_y(y, y_min, y_max, height);
        let col = map_x(x, x_min, x_max, width) + 1;
        for (i, ch) in a.text.chars().enumerate() {
            match grid[row].get_mut(col + i) {
                Some(cell) if *cell == ' ' => *cell = ch,
                _ => break,
            }
        }
    }

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    for (s, mark) in series.iter().zip(marks) {
        out.push_str(&format!("{mark} {}\n", s.label));
    }

    out
}

fn assign_marks(kinds: &[SeriesKind]) -> Vec<char> {
    let mut lines = 0;
    let mut points = 0;
    kinds
        .iter()
        .map(|kind| match kind {
            SeriesKind::Line => {
                lines += 1;
                LINE_MARKS[(lines - 1) % LINE_MARKS.len()]
            }
            SeriesKind::Points => {
                points += 1;
                POINT_MARKS[(points - 1) % POINT_MARKS.len()]
            }
        })
        .collect()
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // Row 0 is the top.
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Integer line drawing (Bresenham). Only blank cells are written.
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plot::{Annotation, Series, XAxis};

    #[test]
    fn plot_golden_snapshot_small() {
        let chart = Chart::new("test", XAxis::Days)
            .with_series(Series::points("obs", [(0.0, 100.0), (9.0, 120.0)]))
            .with_series(Series::line("fit", [(0.0, 100.0), (9.0, 100.0)]));

        let txt = render_ascii(&chart, 10, 5);
        let expected = concat!(
            "Plot: test\n",
            "x=[0, 9] | y=[99, 121]\n",
            "         o\n",
            "          \n",
            "          \n",
            "          \n",
            "o---------\n",
            "o obs\n",
            "- fit\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn empty_chart_says_so() {
        let chart = Chart::new("nothing", XAxis::Days).with_series(Series::line("a", [(0.0, f64::NAN)]));
        assert_eq!(render_ascii(&chart, 20, 5), "Plot: nothing\n(no finite data)\n");
    }

    #[test]
    fn annotations_are_written_beside_points() {
        let mut chart = Chart::new("w", XAxis::Linear).with_series(Series::points("p", [(0.0, 0.0), (10.0, 10.0)]));
        chart.annotations.push(Annotation {
            x: 0.0,
            y: 0.0,
            text: "AB".to_string(),
        });
        let txt = render_ascii(&chart, 12, 5);
        let bottom = txt.lines().nth(6).unwrap();
        assert!(bottom.starts_with("oAB"), "{bottom:?}");
    }

    #[test]
    fn each_line_series_gets_its_own_mark() {
        let marks = assign_marks(&[SeriesKind::Line, SeriesKind::Points, SeriesKind::Line]);
        assert_eq!(marks, vec!['-', 'o', '*']);
    }
}
