use image::imageops::{self, FilterType};
use image::RgbaImage;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::raster::{opaque, RasterImage, WHITE};

/// Resize filter selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResizeQuality {
    /// Catmull-Rom bicubic
    #[default]
    High,
    /// Bilinear
    Fast,
}

impl ResizeQuality {
    fn filter(self) -> FilterType {
        match self {
            ResizeQuality::High => FilterType::CatmullRom,
            ResizeQuality::Fast => FilterType::Triangle,
        }
    }
}

/// Scales a raster to the classifier's input size with aspect-fill.
///
/// The source is scaled uniformly by `max(tw / sw, th / sh)` so it covers the
/// whole target, then composited at the top-left of a background-filled
/// target canvas. The result is always exactly `target_width` x `target_height`
/// and fully opaque.
#[derive(Debug, Clone)]
pub struct ImageNormalizer {
    target_width: u32,
    target_height: u32,
    quality: ResizeQuality,
    background: [u8; 3],
}

impl ImageNormalizer {
    pub fn new(target_width: u32, target_height: u32) -> Self {
        Self {
            target_width,
            target_height,
            quality: ResizeQuality::default(),
            background: WHITE,
        }
    }

    /// Square target, the common case for image classifiers
    pub fn square(size: u32) -> Self {
        Self::new(size, size)
    }

    pub fn with_quality(mut self, quality: ResizeQuality) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_background(mut self, background: [u8; 3]) -> Self {
        self.background = background;
        self
    }

    pub fn target_dimensions(&self) -> (u32, u32) {
        (self.target_width, self.target_height)
    }

    /// Computes the uniformly scaled size that covers the target.
    ///
    /// Returns `None` for an empty source or target.
    pub fn fill_dimensions(&self, source_width: u32, source_height: u32) -> Option<(u32, u32)> {
        if source_width == 0 || source_height == 0 || self.target_width == 0 || self.target_height == 0 {
            return None;
        }
        let horizontal = self.target_width as f64 / source_width as f64;
        let vertical = self.target_height as f64 / source_height as f64;
        let scale = horizontal.max(vertical);

        // Rounding can land one pixel short of the target; never undershoot
        let width = ((source_width as f64 * scale).round() as u32).max(self.target_width);
        let height = ((source_height as f64 * scale).round() as u32).max(self.target_height);
        Some((width, height))
    }

    /// Returns the top-left source region that stays visible after scaling,
    /// with the size it scales to, as `(crop_width, crop_height, scaled_width, scaled_height)`.
    ///
    /// One extra source pixel is kept on the clipped sides so the filter sees
    /// real neighbors at the target edge. Returns `None` for an empty source or target.
    pub fn covering_crop(&self, source_width: u32, source_height: u32) -> Option<(u32, u32, u32, u32)> {
        let (fill_width, fill_height) = self.fill_dimensions(source_width, source_height)?;
        let scale_x = fill_width as f64 / source_width as f64;
        let scale_y = fill_height as f64 / source_height as f64;

        let visible = |target: u32, scale: f64, source: u32| -> u32 {
            let needed = (target as f64 / scale - 1e-9).ceil().max(1.0) as u32;
            needed.saturating_add(1).min(source)
        };
        let crop_width = visible(self.target_width, scale_x, source_width);
        let crop_height = visible(self.target_height, scale_y, source_height);

        let scaled_width = ((crop_width as f64 * scale_x).round() as u32).max(self.target_width);
        let scaled_height = ((crop_height as f64 * scale_y).round() as u32).max(self.target_height);
        Some((crop_width, crop_height, scaled_width, scaled_height))
    }

    pub fn normalize(&self, source: &RasterImage) -> RasterImage {
        let (source_width, source_height) = source.dimensions();
        if (source_width, source_height) == self.target_dimensions() {
            return force_opaque(source.as_rgba().clone());
        }

        let mut canvas = RgbaImage::from_pixel(self.target_width, self.target_height, opaque(self.background));
        let Some((crop_width, crop_height, scaled_width, scaled_height)) =
            self.covering_crop(source_width, source_height)
        else {
            debug!(
                "Normalizing empty raster {}x{} to {}x{}: background only",
                source_width, source_height, self.target_width, self.target_height
            );
            return RasterImage::from_rgba(canvas);
        };

        debug!(
            "Normalizing {}x{} -> {}x{} (visible {}x{} scaled to {}x{}, {:?})",
            source_width, source_height, self.target_width, self.target_height,
            crop_width, crop_height, scaled_width, scaled_height, self.quality
        );
        let visible = imageops::crop_imm(source.as_rgba(), 0, 0, crop_width, crop_height).to_image();
        let scaled = imageops::resize(&visible, scaled_width, scaled_height, self.quality.filter());
        // Overshoot past the target edge is clipped by the canvas
        imageops::overlay(&mut canvas, &scaled, 0, 0);

        force_opaque(canvas)
    }
}

fn force_opaque(mut pixels: RgbaImage) -> RasterImage {
    for pixel in pixels.pixels_mut() {
        pixel.0[3] = 255;
    }
    RasterImage::from_rgba(pixels)
}
