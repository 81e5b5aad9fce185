/// Small paint command set used to synthesise engine output.
///
/// A command rasterises into a tightly packed pixel block covering exactly
/// its own region, which is the shape `OffscreenRenderSurface::on_paint`
/// expects from a rendering engine.

use super::geometry::Rect;
use super::PixelFormat;

#[derive(Debug, Clone, PartialEq)]
pub enum PaintCommand {
    SolidRect {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        rgba: (u8, u8, u8, u8),
    },
    Checker {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        cell: u32,
        even: (u8, u8, u8, u8),
        odd: (u8, u8, u8, u8),
    },
}

impl PaintCommand {
    pub fn region(&self) -> Rect {
        match *self {
            PaintCommand::SolidRect { x, y, width, height, .. }
            | PaintCommand::Checker { x, y, width, height, .. } => Rect::new(x, y, width, height),
        }
    }

    /// Rasterise into a block of `region().width * region().height` pixels.
    pub fn rasterize(&self, format: PixelFormat) -> Vec<u8> {
        let region = self.region();
        let mut out = Vec::with_capacity(region.area() as usize * PixelFormat::BYTES_PER_PIXEL);
        match *self {
            PaintCommand::SolidRect { rgba, .. } => {
                let px = format.pack_rgba(rgba.into());
                for _ in 0..region.area() {
                    out.extend_from_slice(&px);
                }
            }
            PaintCommand::Checker { cell, even, odd, .. } => {
                let cell = cell.max(1);
                let even = format.pack_rgba(even.into());
                let odd = format.pack_rgba(odd.into());
                for row in 0..region.height {
                    for col in 0..region.width {
                        let px = if (row / cell + col / cell) % 2 == 0 { even } else { odd };
                        out.extend_from_slice(&px);
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solid_rect_rasterizes_to_region_size() {
        let cmd = PaintCommand::SolidRect {
            x: 5,
            y: 5,
            width: 10,
            height: 10,
            rgba: (255, 0, 0, 255),
        };
        let px = cmd.rasterize(PixelFormat::Bgra8);
        assert_eq!(px.len(), 400);
        assert_eq!(&px[0..4], &[0, 0, 255, 255]);
        assert_eq!(cmd.region(), Rect::new(5, 5, 10, 10));
    }

    #[test]
    fn checker_alternates_cells() {
        let cmd = PaintCommand::Checker {
            x: 0,
            y: 0,
            width: 4,
            height: 1,
            cell: 2,
            even: (1, 1, 1, 1),
            odd: (2, 2, 2, 2),
        };
        let px = cmd.rasterize(PixelFormat::Rgba8);
        let firsts: Vec<u8> = px.chunks(4).map(|c| c[0]).collect();
        assert_eq!(firsts, vec![1, 1, 2, 2]);
    }
}
