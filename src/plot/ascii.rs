//! ASCII plotting of the forecast timeline for terminal output.
//!
//! Fixed-size grid with deterministic output (helpful for golden tests).
//!
//! Plot elements:
//! - observed prices: `#`
//! - SARIMA column: `s`
//! - XGBoost column: `x`
//! - last observed week: `|`
//!
//! Earlier series win where lines overlap.

use crate::domain::TimelineRecord;

/// Render the timeline with week index on the x axis and price on the y axis.
pub fn render_timeline_plot(rows: &[TimelineRecord], width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (y_min, y_max) = y_range(rows).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);
    let x_max = (rows.len().saturating_sub(1)).max(1) as f64;

    let mut grid = vec![vec![' '; width]; height];
    let frame = Frame {
        x_max,
        y_min,
        y_max,
    };

    draw_series(&mut grid, rows, |r| r.actual, &frame, '#');
    draw_series(&mut grid, rows, |r| r.timeseries, &frame, 's');
    draw_series(&mut grid, rows, |r| r.regression, &frame, 'x');

    // Divider at the last observed week, when a forecast follows it.
    if let Some(k) = rows.iter().position(|r| r.actual.is_none()).filter(|k| *k > 0) {
        let x = map_x((k - 1) as f64, x_max, width);
        for row in grid.iter_mut() {
            if row[x] == ' ' {
                row[x] = '|';
            }
        }
    }

    let first = rows.first().map(|r| r.date.as_str()).unwrap_or("-");
    let last = rows.last().map(|r| r.date.as_str()).unwrap_or("-");
    let mut out = String::new();
    out.push_str(&format!(
        "Plot: weeks=[{first}, {last}] | price=[{y_min:.2}, {y_max:.2}] | # actual, s sarima, x xgboost\n"
    ));

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    out
}

struct Frame {
    x_max: f64,
    y_min: f64,
    y_max: f64,
}

fn draw_series(
    grid: &mut [Vec<char>],
    rows: &[TimelineRecord],
    pick: impl Fn(&TimelineRecord) -> Option<f64>,
    frame: &Frame,
    ch: char,
) {
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for (i, r) in rows.iter().enumerate() {
        let Some(y) = pick(r).filter(|v| v.is_finite()) else {
            continue;
        };
        let x = map_x(i as f64, frame.x_max, width);
        let yy = map_y(y, frame.y_min, frame.y_max, height);
        match prev {
            Some((x0, y0)) => draw_line(grid, x0, y0, x, yy, ch),
            None if grid[yy][x] == ' ' => grid[yy][x] = ch,
            None => {}
        }
        prev = Some((x, yy));
    }
}

fn y_range(rows: &[TimelineRecord]) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    for y in rows
        .iter()
        .flat_map(|r| [r.actual, r.timeseries, r.regression])
        .flatten()
        .filter(|v| v.is_finite())
    {
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }

    if min_y.is_finite() && max_y.is_finite() && max_y > min_y {
        Some((min_y, max_y))
    } else if min_y.is_finite() {
        Some((min_y - 0.5, min_y + 0.5))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(i: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = (i / x_max).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Integer line drawing (Bresenham-ish); only fills blank cells.
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
