use image::{Rgba, RgbaImage};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::stroke::{StrokeBuffer, StrokePoint};

pub const BLACK: [u8; 3] = [0, 0, 0];
pub const WHITE: [u8; 3] = [255, 255, 255];

pub(crate) fn opaque([r, g, b]: [u8; 3]) -> Rgba<u8> {
    Rgba([r, g, b, 255])
}

/// A fixed-size grid of RGBA samples, origin at the top-left.
///
/// Created once per guess and never mutated afterwards; the only way to get
/// a different image is to build a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    pixels: RgbaImage,
}

impl RasterImage {
    /// Creates a fully opaque image of a single color
    pub fn filled(width: u32, height: u32, color: [u8; 3]) -> Self {
        Self {
            pixels: RgbaImage::from_pixel(width, height, opaque(color)),
        }
    }

    pub fn from_rgba(pixels: RgbaImage) -> Self {
        Self { pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// Returns the `[r, g, b, a]` sample at `(x, y)`, or `None` when out of bounds
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.pixels.get_pixel_checked(x, y).map(|p| p.0)
    }

    pub fn as_rgba(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn into_rgba(self) -> RgbaImage {
        self.pixels
    }
}

/// Pen and paper settings for rendering strokes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterConfig {
    /// Line width in pixels of the target raster
    pub stroke_width: f32,
    pub stroke_color: [u8; 3],
    pub background: [u8; 3],
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            stroke_width: 5.0,
            stroke_color: BLACK,
            background: WHITE,
        }
    }
}

/// Renders a [`StrokeBuffer`] as a polyline onto a background-filled canvas.
#[derive(Debug, Clone, Default)]
pub struct Rasterizer {
    config: RasterConfig,
}

impl Rasterizer {
    pub fn new(config: RasterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RasterConfig {
        &self.config
    }

    /// Draws every segment between consecutive points into a `width` x `height`
    /// raster. Normalized coordinates are scaled per axis, so a non-square
    /// canvas stretches the drawing instead of clipping it.
    ///
    /// Fewer than two points yields a blank canvas. Segments with a non-finite
    /// endpoint are skipped; anything off-canvas is clipped by the pixel loop.
    pub fn rasterize(&self, strokes: &StrokeBuffer, width: u32, height: u32) -> RasterImage {
        let mut canvas = RgbaImage::from_pixel(width, height, opaque(self.config.background));

        if strokes.len() < 2 {
            debug!("Rasterizing {} point(s): blank canvas", strokes.len());
            return RasterImage::from_rgba(canvas);
        }

        let to_canvas = |p: StrokePoint| (p.x as f64 * width as f64, p.y as f64 * height as f64);
        let mut drawn = 0usize;
        for (start, end) in strokes.segments() {
            if !start.is_finite() || !end.is_finite() {
                continue;
            }
            let (start, end) = (to_canvas(start), to_canvas(end));
            if ![start.0, start.1, end.0, end.1].iter().all(|v| v.is_finite()) {
                continue;
            }
            self.draw_segment(&mut canvas, start, end);
            drawn += 1;
        }
        debug!("Rasterized {} segment(s) into {}x{}", drawn, width, height);

        RasterImage::from_rgba(canvas)
    }

    /// Stamps a round-capped thick line, with one pixel of edge coverage
    /// blending toward the stroke color. Geometry is in `f64` so far
    /// off-canvas endpoints cannot overflow the distance math.
    fn draw_segment(&self, canvas: &mut RgbaImage, (x0, y0): (f64, f64), (x1, y1): (f64, f64)) {
        let half = self.config.stroke_width.max(0.0) as f64 / 2.0;
        let reach = half + 1.0;

        let min_x = (x0.min(x1) - reach).floor().max(0.0);
        let min_y = (y0.min(y1) - reach).floor().max(0.0);
        let max_x = (x0.max(x1) + reach).ceil().min(canvas.width() as f64);
        let max_y = (y0.max(y1) + reach).ceil().min(canvas.height() as f64);
        if min_x >= max_x || min_y >= max_y {
            return;
        }

        let ink = self.config.stroke_color;
        for py in min_y as u32..max_y as u32 {
            for px in min_x as u32..max_x as u32 {
                let distance = distance_to_segment(
                    (px as f64 + 0.5, py as f64 + 0.5),
                    (x0, y0),
                    (x1, y1),
                );
                let coverage = (half + 0.5 - distance).clamp(0.0, 1.0);
                if coverage.is_nan() || coverage <= 0.0 {
                    continue;
                }
                let pixel = canvas.get_pixel_mut(px, py);
                for (channel, target) in pixel.0.iter_mut().take(3).zip(ink) {
                    let current = *channel as f64;
                    *channel = (current + (target as f64 - current) * coverage).round() as u8;
                }
            }
        }
    }
}

fn distance_to_segment((px, py): (f64, f64), (ax, ay): (f64, f64), (bx, by): (f64, f64)) -> f64 {
    let (dx, dy) = (bx - ax, by - ay);
    let length_sq = dx * dx + dy * dy;
    let t = if length_sq > f64::EPSILON {
        (((px - ax) * dx + (py - ay) * dy) / length_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let (cx, cy) = (ax + t * dx, ay + t * dy);
    ((px - cx).powi(2) + (py - cy).powi(2)).sqrt()
}
