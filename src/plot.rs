use std::path::Path;

use image::{ImageBuffer, Rgb, RgbImage};

use crate::color::{MARKER_RGB, generate_palette};
use crate::data::model::Table;
use crate::error::Result;
use crate::signal::{Direction, Filtered};

// ---------------------------------------------------------------------------
// Peak annotations
// ---------------------------------------------------------------------------

/// Everything needed to draw one detected peak on top of its series.
#[derive(Debug, Clone, PartialEq)]
pub struct PeakMarker {
    /// Value column the peak belongs to.
    pub column: usize,
    pub x: f64,
    pub y: f64,
    /// Far end of the prominence line: `y - sign * prominence`.
    pub base: f64,
    pub prominence: f64,
    /// Prominence formatted for display, e.g. `2.50e-08`.
    pub label: String,
}

/// Markers for the surviving peaks of value column `column`.
pub fn annotate(
    series: &Table,
    column: usize,
    filtered: &Filtered,
    direction: Direction,
) -> Vec<PeakMarker> {
    let values = series.column(column);
    filtered
        .peaks
        .iter()
        .zip(&filtered.prominences)
        .map(|(&row, &prominence)| PeakMarker {
            column,
            x: series.index[row],
            y: values[row],
            base: values[row] - direction.sign() * prominence,
            prominence,
            label: sci_label(prominence),
        })
        .collect()
}

/// Two-decimal scientific notation with a signed, two-digit exponent:
/// `7.00e+00`, `2.50e-08`.
pub fn sci_label(value: f64) -> String {
    let raw = format!("{value:.2e}");
    match raw.split_once('e') {
        Some((mantissa, exp)) => match exp.parse::<i32>() {
            Ok(exp) => format!("{mantissa}e{exp:+03}"),
            Err(_) => raw,
        },
        None => raw,
    }
}

/// `column_<tag>_<stem>_<timestamp>.png`
pub fn figure_name(column_tag: &str, stem: &str, timestamp: &str) -> String {
    format!("column_{column_tag}_{stem}_{timestamp}.png")
}

// ---------------------------------------------------------------------------
// PNG rendering
// ---------------------------------------------------------------------------

const WIDTH: u32 = 960;
const HEIGHT: u32 = 640;
const MARGIN: u32 = 48;
const FRAME_RGB: [u8; 3] = [160, 160, 160];

/// Maps data coordinates onto the plotting area of the image.
struct Viewport {
    x_range: (f64, f64),
    y_range: (f64, f64),
}

impl Viewport {
    fn fit(xs: impl Iterator<Item = f64>, ys: impl Iterator<Item = f64>) -> Self {
        Viewport {
            x_range: finite_range(xs),
            y_range: finite_range(ys),
        }
    }

    fn to_pixel(&self, x: f64, y: f64) -> Option<(i64, i64)> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        let w = (WIDTH - 2 * MARGIN) as f64;
        let h = (HEIGHT - 2 * MARGIN) as f64;
        let fx = (x - self.x_range.0) / (self.x_range.1 - self.x_range.0);
        let fy = (y - self.y_range.0) / (self.y_range.1 - self.y_range.0);
        Some((
            MARGIN as i64 + (fx * w).round() as i64,
            (HEIGHT - MARGIN) as i64 - (fy * h).round() as i64,
        ))
    }
}

/// Min/max of the finite values, widened so the span is never zero.
fn finite_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !lo.is_finite() {
        return (0.0, 1.0);
    }
    if hi - lo <= f64::EPSILON * lo.abs().max(1.0) {
        let pad = lo.abs().max(1.0) * 0.5;
        return (lo - pad, hi + pad);
    }
    let pad = (hi - lo) * 0.05;
    (lo - pad, hi + pad)
}

fn put(img: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
        img.put_pixel(x as u32, y as u32, color);
    }
}

/// Bresenham line between two pixels.
fn draw_line(img: &mut RgbImage, (x0, y0): (i64, i64), (x1, y1): (i64, i64), color: Rgb<u8>) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let (mut x, mut y, mut err) = (x0, y0, dx + dy);
    loop {
        put(img, x, y, color);
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

fn draw_cross(img: &mut RgbImage, (x, y): (i64, i64), color: Rgb<u8>) {
    draw_line(img, (x - 5, y - 5), (x + 5, y + 5), color);
    draw_line(img, (x - 5, y + 5), (x + 5, y - 5), color);
}

/// Draw every value column of `series` plus the peak markers.
pub fn render(series: &Table, markers: &[PeakMarker]) -> RgbImage {
    let mut img: RgbImage = ImageBuffer::from_pixel(WIDTH, HEIGHT, Rgb([255, 255, 255]));

    let view = Viewport::fit(
        series.index.iter().copied(),
        series
            .values
            .iter()
            .flatten()
            .copied()
            .chain(markers.iter().map(|m| m.base)),
    );

    // Frame
    let (l, r) = (MARGIN as i64, (WIDTH - MARGIN) as i64);
    let (t, b) = (MARGIN as i64, (HEIGHT - MARGIN) as i64);
    let frame = Rgb(FRAME_RGB);
    draw_line(&mut img, (l, t), (r, t), frame);
    draw_line(&mut img, (r, t), (r, b), frame);
    draw_line(&mut img, (r, b), (l, b), frame);
    draw_line(&mut img, (l, b), (l, t), frame);

    // Series lines; NaN samples break the line.
    let palette = generate_palette(series.columns.len());
    for (col, color) in series.values.iter().zip(palette) {
        let mut prev = None;
        for (&x, &y) in series.index.iter().zip(col) {
            let here = view.to_pixel(x, y);
            if let (Some(a), Some(b)) = (prev, here) {
                draw_line(&mut img, a, b, Rgb(color));
            }
            prev = here;
        }
    }

    // Prominence lines and markers
    let marker = Rgb(MARKER_RGB);
    for m in markers {
        if let (Some(top), Some(base)) = (view.to_pixel(m.x, m.y), view.to_pixel(m.x, m.base)) {
            draw_line(&mut img, top, base, marker);
            draw_cross(&mut img, top, marker);
        }
    }

    img
}

/// Render and save as PNG.
pub fn render_png(series: &Table, markers: &[PeakMarker], path: &Path) -> Result<()> {
    render(series, markers).save(path)?;
    log::info!("saved figure {}", path.display());
    Ok(())
}
