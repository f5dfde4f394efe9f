//! Raster chart drawing.
//!
//! Report pages embed pie and bar charts as raster images drawn with the
//! [`image`] crate.  Charts are rasterized at a multiple of their display
//! density so the captured pages hold up in print.  Colors come from a fixed
//! palette assigned by category position, which keeps legends consistent
//! across members and periods.

use std::io::Cursor;

use image::{DynamicImage, ImageBuffer, ImageOutputFormat, Rgb};

use crate::error::ReportError;
use crate::taxonomy::CategoryWeight;

/// Fixed chart palette.  Categories pick colors by index so the same slot is
/// always drawn in the same color.
pub const PALETTE: [[u8; 3]; 10] = [
    [47, 110, 94],
    [214, 143, 60],
    [108, 117, 125],
    [64, 124, 172],
    [170, 84, 84],
    [124, 150, 77],
    [96, 88, 141],
    [188, 166, 98],
    [80, 140, 140],
    [140, 104, 80],
];

const BACKGROUND: [u8; 3] = [255, 255, 255];
const AXIS: [u8; 3] = [120, 120, 120];
const EMPTY_RING: [u8; 3] = [225, 225, 225];

/// Returns the palette color for a category position.
pub fn color_for(index: usize) -> [u8; 3] {
    PALETTE[index % PALETTE.len()]
}

/// Description of a pie-style breakdown chart.
#[derive(Clone, Debug, PartialEq)]
pub struct PieChartSpec {
    slices: Vec<(String, f64)>,
    diameter_px: u32,
}

impl PieChartSpec {
    /// Builds a pie spec from normalized breakdown rows.
    ///
    /// Zero-weight rows keep their palette slot (so legend colors stay
    /// stable) but occupy no arc.
    pub fn from_breakdown(rows: &[CategoryWeight], diameter_px: u32) -> Self {
        Self {
            slices: rows
                .iter()
                .map(|row| (row.category.clone(), row.weight.max(0.0)))
                .collect(),
            diameter_px: diameter_px.max(32),
        }
    }

    /// The labeled slices in palette order.
    pub fn slices(&self) -> &[(String, f64)] {
        &self.slices
    }

    /// Diameter of the rendered chart in display pixels.
    pub fn diameter_px(&self) -> u32 {
        self.diameter_px
    }
}

/// Description of a vertical bar chart over a period series.
#[derive(Clone, Debug, PartialEq)]
pub struct BarChartSpec {
    bars: Vec<(String, f64)>,
    width_px: u32,
    height_px: u32,
}

impl BarChartSpec {
    /// Builds a bar spec from `(label, value)` pairs.
    pub fn from_series(bars: Vec<(String, f64)>, width_px: u32, height_px: u32) -> Self {
        Self {
            bars,
            width_px: width_px.max(32),
            height_px: height_px.max(32),
        }
    }

    /// The labeled bars in series order.
    pub fn bars(&self) -> &[(String, f64)] {
        &self.bars
    }

    /// Display size of the rendered chart in pixels.
    pub fn size_px(&self) -> (u32, u32) {
        (self.width_px, self.height_px)
    }
}

fn encode_png(buffer: ImageBuffer<Rgb<u8>, Vec<u8>>, page: usize) -> Result<Vec<u8>, ReportError> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(buffer)
        .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
        .map_err(|err| ReportError::RenderFault {
            page,
            reason: format!("PNG encoding failed: {}", err),
        })?;
    Ok(bytes)
}

fn scaled(dimension: u32, scale: f64) -> u32 {
    ((dimension as f64) * scale.max(1.0)).round() as u32
}

/// Rasterizes a pie chart to PNG bytes at `scale ×` its display density.
///
/// A zero-total breakdown draws a neutral ring instead of failing, so empty
/// periods still render a legend-consistent chart.
pub fn rasterize_pie(
    spec: &PieChartSpec,
    scale: f64,
    page: usize,
) -> Result<Vec<u8>, ReportError> {
    let side = scaled(spec.diameter_px, scale);
    let total: f64 = spec.slices.iter().map(|(_, weight)| weight).sum();

    // Cumulative fraction bounds per slice, paired with its palette color.
    let mut bounds = Vec::with_capacity(spec.slices.len());
    let mut acc = 0.0;
    for (index, (_, weight)) in spec.slices.iter().enumerate() {
        let fraction = if total > 0.0 { weight / total } else { 0.0 };
        bounds.push((acc, acc + fraction, color_for(index)));
        acc += fraction;
    }

    let center = (side as f64 - 1.0) / 2.0;
    let radius = side as f64 / 2.0 - 1.0;
    let inner_ring = radius * 0.82;

    let buffer = ImageBuffer::from_fn(side, side, |x, y| {
        let dx = x as f64 - center;
        let dy = y as f64 - center;
        let distance = (dx * dx + dy * dy).sqrt();
        if distance > radius {
            return Rgb(BACKGROUND);
        }

        if total <= 0.0 {
            return if distance >= inner_ring {
                Rgb(EMPTY_RING)
            } else {
                Rgb(BACKGROUND)
            };
        }

        // Angle measured clockwise from twelve o'clock, as charting
        // libraries conventionally draw entry order.
        let angle = dx.atan2(-dy);
        let turn = (angle / std::f64::consts::TAU).rem_euclid(1.0);
        let color = bounds
            .iter()
            .find(|(from, to, _)| turn >= *from && turn < *to)
            .map(|(_, _, color)| *color)
            .unwrap_or_else(|| {
                bounds
                    .last()
                    .map(|(_, _, color)| *color)
                    .unwrap_or(EMPTY_RING)
            });
        Rgb(color)
    });

    encode_png(buffer, page)
}

/// Rasterizes a bar chart to PNG bytes at `scale ×` its display density.
pub fn rasterize_bars(
    spec: &BarChartSpec,
    scale: f64,
    page: usize,
) -> Result<Vec<u8>, ReportError> {
    let width = scaled(spec.width_px, scale);
    let height = scaled(spec.height_px, scale);
    let baseline = height.saturating_sub(scaled(2, scale).max(2));
    let max_value = spec
        .bars
        .iter()
        .map(|(_, value)| value.max(0.0))
        .fold(0.0_f64, f64::max);

    let count = spec.bars.len().max(1) as u32;
    let slot = width / count;
    let gap = (slot / 5).max(1);

    let mut heights = Vec::with_capacity(spec.bars.len());
    for (index, (_, value)) in spec.bars.iter().enumerate() {
        let fraction = if max_value > 0.0 {
            value.max(0.0) / max_value
        } else {
            0.0
        };
        let bar_height = ((baseline as f64 - 1.0) * fraction).round() as u32;
        heights.push((index as u32, bar_height, color_for(index)));
    }

    let buffer = ImageBuffer::from_fn(width, height, |x, y| {
        if y >= baseline {
            return Rgb(AXIS);
        }
        let slot_index = (x / slot.max(1)).min(count - 1);
        let within = x - slot_index * slot;
        if within < gap / 2 || within >= slot - gap / 2 {
            return Rgb(BACKGROUND);
        }
        match heights.get(slot_index as usize) {
            Some((_, bar_height, color)) if baseline - y <= *bar_height => Rgb(*color),
            _ => Rgb(BACKGROUND),
        }
    });

    encode_png(buffer, page)
}
