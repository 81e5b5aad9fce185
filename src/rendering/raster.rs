//! Backing store the engine paints into.

use super::geometry::{Rect, Size};
use super::PixelFormat;
use crate::{Error, Result};

/// A 32-bit pixel buffer owned by a surface.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    stride: usize,
    format: PixelFormat,
    data: Vec<u8>,
}

impl FrameBuffer {
    /// Allocate a buffer of `size` device pixels filled with `fill` (RGBA).
    pub fn new(size: Size, format: PixelFormat, fill: [u8; 4]) -> Self {
        let stride = size.width as usize * PixelFormat::BYTES_PER_PIXEL;
        let px = format.pack_rgba(fill);
        let mut data = Vec::with_capacity(stride * size.height as usize);
        for _ in 0..(size.width as usize * size.height as usize) {
            data.extend_from_slice(&px);
        }
        Self {
            width: size.width,
            height: size.height,
            stride,
            format,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_size(self.size())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let off = y as usize * self.stride + x as usize * PixelFormat::BYTES_PER_PIXEL;
        let px = &self.data[off..off + 4];
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Copy a tightly packed block covering `region` into the buffer.
    ///
    /// Only the part of `region` inside the buffer is written; the returned
    /// rect is that clipped part, or `None` when nothing was visible.
    pub fn write_region(&mut self, region: Rect, src: &[u8]) -> Result<Option<Rect>> {
        let src_stride = region.width as usize * PixelFormat::BYTES_PER_PIXEL;
        let needed = src_stride * region.height as usize;
        if src.len() < needed {
            return Err(Error::InvalidPaint(format!(
                "{} bytes supplied for a {}x{} region ({} needed)",
                src.len(),
                region.width,
                region.height,
                needed
            )));
        }

        let Some(clip) = region.intersect(&self.bounds()) else {
            return Ok(None);
        };

        let row_bytes = clip.width as usize * PixelFormat::BYTES_PER_PIXEL;
        let src_x = (clip.x - region.x) as usize * PixelFormat::BYTES_PER_PIXEL;
        for row in 0..clip.height as usize {
            let src_y = (clip.y - region.y) as usize + row;
            let s = src_y * src_stride + src_x;
            let d = (clip.y as usize + row) * self.stride
                + clip.x as usize * PixelFormat::BYTES_PER_PIXEL;
            self.data[d..d + row_bytes].copy_from_slice(&src[s..s + row_bytes]);
        }
        Ok(Some(clip))
    }

    /// Move the pixel bytes out, leaving an empty 0x0 buffer behind.
    pub fn release(&mut self) -> Vec<u8> {
        self.width = 0;
        self.height = 0;
        self.stride = 0;
        std::mem::take(&mut self.data)
    }
}
