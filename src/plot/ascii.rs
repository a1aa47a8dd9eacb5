//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - observed cumulative defects: `o`
//! - fitted curve: `-` line
//! - bootstrap band edges, when available: `.` lines

use crate::domain::{BootstrapBand, FittingResult, TimeSeriesData};
use crate::models::evaluate;

/// Render observed data, the fitted curve and an optional band over the
/// observed days.
pub fn render_fit_plot(
    data: &TimeSeriesData,
    fit: &FittingResult,
    band: Option<&BootstrapBand>,
    width: usize,
    height: usize,
) -> String {
    let days = data.days();
    let points: Vec<(f64, f64)> = days.iter().copied().zip(data.cumulative_found()).collect();
    let (t_min, t_max) = day_range(&days).unwrap_or((1.0, 2.0));
    let curve = sample_curve(fit, t_min, t_max, width.max(2));

    let edges: Vec<Vec<(f64, f64)>> = band
        .filter(|b| b.model == fit.model && b.lower.len() == days.len())
        .map(|b| {
            vec![
                days.iter().copied().zip(b.lower.iter().copied()).collect(),
                days.iter().copied().zip(b.upper.iter().copied()).collect(),
            ]
        })
        .unwrap_or_default();

    let mut out = format!("{} | {}\n", data.project_name, fit.display_name);
    out.push_str(&render_plot(&points, &curve, &edges, t_min, t_max, width, height));
    out
}

fn render_plot(
    points: &[(f64, f64)],
    curve: &[(f64, f64)],
    edges: &[Vec<(f64, f64)>],
    t_min: f64,
    t_max: f64,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let all = points
        .iter()
        .chain(curve)
        .chain(edges.iter().flatten())
        .map(|&(_, y)| y);
    let (y_min, y_max) = y_range(all).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Curve first, then band edges into the gaps, then points on top.
    draw_polyline(&mut grid, curve, '-', t_min, t_max, y_min, y_max);
    for edge in edges {
        draw_polyline(&mut grid, edge, '.', t_min, t_max, y_min, y_max);
    }
    for &(t, y) in points {
        if !y.is_finite() {
            continue;
        }
        let x = map_x(t, t_min, t_max, width);
        let row = map_y(y, y_min, y_max, height);
        grid[row][x] = 'o';
    }

    let mut out = format!(
        "Plot: day=[{t_min:.0}, {t_max:.0}] | defects=[{y_min:.2}, {y_max:.2}]\n"
    );
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out
}

fn day_range(days: &[f64]) -> Option<(f64, f64)> {
    let (first, last) = (*days.first()?, *days.last()?);
    (last > first).then_some((first, last))
}

fn sample_curve(fit: &FittingResult, t_min: f64, t_max: f64, n: usize) -> Vec<(f64, f64)> {
    if !fit.success {
        return Vec::new();
    }
    let n = n.max(2);
    (0..n)
        .map(|i| {
            let u = i as f64 / (n as f64 - 1.0);
            let t = t_min + u * (t_max - t_min);
            (t, evaluate(fit.model, t, &fit.params))
        })
        .filter(|(_, y)| y.is_finite())
        .collect()
}

fn y_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for y in values.filter(|y| y.is_finite()) {
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }
    (min_y.is_finite() && max_y > min_y).then_some((min_y, max_y))
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let pad = ((max - min).abs() * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_polyline(
    grid: &mut [Vec<char>],
    line: &[(f64, f64)],
    ch: char,
    t_min: f64,
    t_max: f64,
    y_min: f64,
    y_max: f64,
) {
    let height = grid.len();
    let width = grid[0].len();
    let mut prev = None;
    for &(t, y) in line {
        let x = map_x(t, t_min, t_max, width);
        let row = map_y(y, y_min, y_max, height);
        match prev {
            Some((x0, y0)) => draw_line(grid, x0, y0, x, row, ch),
            None if grid[row][x] == ' ' => grid[row][x] = ch,
            None => {}
        }
        prev = Some((x, row));
    }
}

/// Integer line drawing (Bresenham); only fills blank cells.
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let (mut x0, mut y0) = (x0 as isize, y0 as isize);
    let (x1, y1) = (x1 as isize, y1 as isize);

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        let cell = grid
            .get_mut(y0 as usize)
            .and_then(|row| row.get_mut(x0 as usize));
        if let Some(c) = cell {
            if *c == ' ' {
                *c = ch;
            }
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
    use crate::domain::{EngineConfig, ModelKind, OptimizerKind};
    use crate::fit::fit;

    #[test]
    fn plot_golden_snapshot_small() {
        let points = [(1.0, 1.0), (2.0, 9.0)];
        let curve = [(1.0, 5.0), (2.0, 5.0)];
        let txt = render_plot(&points, &curve, &[], 1.0, 2.0, 10, 5);
        let expected = concat!(
            "Plot: day=[1, 2] | defects=[0.60, 9.40]\n",
            "         o\n",
            "          \n",
            "----------\n",
            "          \n",
            "o         \n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn band_edges_fill_blanks_only() {
        let curve = [(1.0, 5.0), (2.0, 5.0)];
        let edges = vec![vec![(1.0, 1.0), (2.0, 1.0)], vec![(1.0, 9.0), (2.0, 9.0)]];
        let txt = render_plot(&[(1.0, 5.0)], &curve, &edges, 1.0, 2.0, 10, 5);
        let rows: Vec<&str> = txt.lines().skip(1).collect();
        assert_eq!(rows[0], "..........");
        assert_eq!(rows[2], "o---------");
        assert_eq!(rows[4], "..........");
    }

    #[test]
    fn fitted_plot_has_requested_shape() {
        let data = TimeSeriesData::from_cumulative("demo", &[5.0, 12.0, 20.0, 26.0, 30.0, 32.0]).unwrap();
        let result = fit(&data, ModelKind::Exponential, OptimizerKind::NelderMead, &EngineConfig::default(), None);
        let txt = render_fit_plot(&data, &result, None, 40, 12);
        let lines: Vec<&str> = txt.lines().collect();
        assert_eq!(lines.len(), 2 + 12);
        assert!(lines[0].starts_with("demo | Exponential"));
        assert!(lines[2..].iter().all(|l| l.chars().count() == 40));
        let plotted: usize = lines[2..].iter().map(|l| l.matches('o').count()).sum();
        assert_eq!(plotted, data.len());
    }
}
