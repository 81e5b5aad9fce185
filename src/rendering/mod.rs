//! Pixel storage, damage tracking and frame snapshots for off-screen delivery

pub mod damage;
pub mod encode;
pub mod geometry;
pub mod paint;
pub mod raster;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use damage::DamageRegion;
pub use geometry::{Rect, Size};
pub use raster::FrameBuffer;

/// Byte order of a 32-bit pixel in the backing store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    #[default]
    Bgra8,
    Rgba8,
}

impl PixelFormat {
    pub const BYTES_PER_PIXEL: usize = 4;

    /// Convert an RGBA colour into this format's byte order.
    pub fn pack_rgba(&self, rgba: [u8; 4]) -> [u8; 4] {
        match self {
            PixelFormat::Bgra8 => [rgba[2], rgba[1], rgba[0], rgba[3]],
            PixelFormat::Rgba8 => rgba,
        }
    }

    /// Convert a pixel stored in this format back into RGBA order.
    pub fn unpack_rgba(&self, px: [u8; 4]) -> [u8; 4] {
        // the swizzle is its own inverse
        self.pack_rgba(px)
    }
}

/// A delivered frame: an immutable copy of the composited buffer plus the
/// rects that changed since the previous delivery.
///
/// Snapshots share their pixel bytes, so cloning is cheap and a snapshot
/// stays valid after the surface that produced it is destroyed.
#[derive(Debug, Clone)]
pub struct FrameSnapshot {
    /// Monotonic delivery counter, starting at 1
    pub sequence: u64,
    pub width: u32,
    pub height: u32,
    /// Bytes per row
    pub stride: usize,
    pub format: PixelFormat,
    /// Device scale factor the frame was rendered at
    pub scale_factor: f32,
    pub pixels: Arc<[u8]>,
    /// Damaged rects in device pixels, clipped to the frame
    pub damage: Vec<Rect>,
}

impl FrameSnapshot {
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Raw pixel at `(x, y)` in the snapshot's own format.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let off = y as usize * self.stride + x as usize * PixelFormat::BYTES_PER_PIXEL;
        let px = self.pixels.get(off..off + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Pixel at `(x, y)` converted to RGBA.
    pub fn rgba_at(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.pixel(x, y).map(|px| self.format.unpack_rgba(px))
    }

    /// Bounding box of this delivery's damage.
    pub fn damage_bounds(&self) -> Option<Rect> {
        self.damage.iter().copied().reduce(|a, b| a.union(&b))
    }
}
