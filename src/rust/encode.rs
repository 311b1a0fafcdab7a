use log::{debug, error};
use serde::{Deserialize, Serialize};

use crate::classifier::ClassifierError;
use crate::raster::RasterImage;

/// Memory layout of one pixel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 8 bits per channel, alpha first: `[a, r, g, b]`
    #[default]
    Argb32,
}

impl PixelFormat {
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Argb32 => 4,
        }
    }
}

/// Vertical order of rows in the encoded buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowOrder {
    /// First row in memory is the bottom of the drawing. The raster is
    /// top-left origin, so encoding flips it vertically.
    #[default]
    BottomUp,
    /// First row in memory is the top of the drawing
    TopDown,
}

/// A raster encoded in the exact layout the classifier consumes.
///
/// Rows are tightly packed (`bytes_per_row == width * 4`). A buffer is built
/// fresh for every inference call and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    bytes_per_row: usize,
    format: PixelFormat,
    row_order: RowOrder,
    data: Vec<u8>,
}

impl PixelBuffer {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bytes_per_row(&self) -> usize {
        self.bytes_per_row
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn row_order(&self) -> RowOrder {
        self.row_order
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Byte offset of the row that shows line `y` of the drawing, counted from the top
    pub fn row_offset(&self, y: u32) -> Option<usize> {
        if y >= self.height {
            return None;
        }
        let memory_row = match self.row_order {
            RowOrder::BottomUp => self.height - 1 - y,
            RowOrder::TopDown => y,
        };
        Some(memory_row as usize * self.bytes_per_row)
    }

    /// Returns the `[a, r, g, b]` bytes for drawing coordinate `(x, y)`,
    /// origin top-left, whatever the row order in memory.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width {
            return None;
        }
        let start = self.row_offset(y)? + x as usize * self.format.bytes_per_pixel();
        let bytes = self.data.get(start..start + 4)?;
        Some([bytes[0], bytes[1], bytes[2], bytes[3]])
    }
}

/// Copies a [`RasterImage`] into a [`PixelBuffer`].
#[derive(Debug, Clone, Default)]
pub struct PixelEncoder {
    row_order: RowOrder,
}

impl PixelEncoder {
    pub fn new(row_order: RowOrder) -> Self {
        Self { row_order }
    }

    pub fn row_order(&self) -> RowOrder {
        self.row_order
    }

    /// Encodes the raster as ARGB32. The vertical flip for
    /// [`RowOrder::BottomUp`] happens during the copy itself.
    ///
    /// # Errors
    /// `AllocationFailed` when the dimensions are empty, overflow, or the
    /// buffer cannot be reserved.
    pub fn encode(&self, raster: &RasterImage) -> Result<PixelBuffer, ClassifierError> {
        let (width, height) = raster.dimensions();
        let format = PixelFormat::Argb32;
        let allocation_failed = || ClassifierError::AllocationFailed { width, height };

        let bytes_per_row = (width as usize)
            .checked_mul(format.bytes_per_pixel())
            .ok_or_else(allocation_failed)?;
        let len = bytes_per_row
            .checked_mul(height as usize)
            .filter(|&len| len > 0)
            .ok_or_else(allocation_failed)?;

        let mut data = Vec::new();
        data.try_reserve_exact(len).map_err(|e| {
            error!("Failed to allocate {} byte pixel buffer: {}", len, e);
            allocation_failed()
        })?;

        let pixels = raster.as_rgba();
        for memory_row in 0..height {
            let source_row = match self.row_order {
                RowOrder::BottomUp => height - 1 - memory_row,
                RowOrder::TopDown => memory_row,
            };
            for x in 0..width {
                let [r, g, b, a] = pixels.get_pixel(x, source_row).0;
                data.extend_from_slice(&[a, r, g, b]);
            }
        }
        debug!("Encoded {}x{} raster as {:?} ({:?}, {} bytes)", width, height, format, self.row_order, len);

        Ok(PixelBuffer {
            width,
            height,
            bytes_per_row,
            format,
            row_order: self.row_order,
            data,
        })
    }
}
