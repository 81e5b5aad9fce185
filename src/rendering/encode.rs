//! Encoding helpers for delivered frames: PNG bytes, data URLs and stable
//! content digests for golden tests.

use super::{FrameSnapshot, PixelFormat};
use crate::{Error, Result};
use base64::Engine as _;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use sha2::{Digest, Sha256};

impl FrameSnapshot {
    /// Tightly packed RGBA copy of the frame.
    pub fn to_rgba(&self) -> Vec<u8> {
        let row_bytes = self.width as usize * PixelFormat::BYTES_PER_PIXEL;
        let mut out = Vec::with_capacity(row_bytes * self.height as usize);
        for y in 0..self.height as usize {
            let row = &self.pixels[y * self.stride..y * self.stride + row_bytes];
            for px in row.chunks_exact(4) {
                out.extend_from_slice(&self.format.unpack_rgba([px[0], px[1], px[2], px[3]]));
            }
        }
        out
    }

    pub fn encode_png(&self) -> Result<Vec<u8>> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::Encode("cannot encode an empty frame".into()));
        }
        let rgba = self.to_rgba();
        let mut out = Vec::new();
        PngEncoder::new(&mut out).write_image(
            &rgba,
            self.width,
            self.height,
            ExtendedColorType::Rgba8,
        )?;
        Ok(out)
    }

    /// `data:image/png;base64,...` form of the frame.
    pub fn to_data_url(&self) -> Result<String> {
        let png = self.encode_png()?;
        Ok(format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(png)
        ))
    }

    /// Hex SHA-256 over the frame dimensions and its RGBA pixels. Independent
    /// of the backing pixel format and of the damage list.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.width.to_le_bytes());
        hasher.update(self.height.to_le_bytes());
        hasher.update(self.to_rgba());
        hex::encode(hasher.finalize())
    }
}
