/// Integer geometry shared by the frame buffer, damage tracking and overlays.
///
/// Rects are half-open: a rect covers `x..x + width` and `y..y + height`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Convert a DIP size to device pixels, rounding up so the backing store
    /// always covers the whole view.
    pub fn to_pixels(&self, scale_factor: f32) -> Size {
        Size {
            width: (self.width as f64 * scale_factor as f64).ceil() as u32,
            height: (self.height as f64 * scale_factor as f64).ceil() as u32,
        }
    }

    /// Like `to_pixels`, but `None` when either side would exceed `max`.
    pub fn to_pixels_within(&self, scale_factor: f32, max: u32) -> Option<Size> {
        let w = (self.width as f64 * scale_factor as f64).ceil();
        let h = (self.height as f64 * scale_factor as f64).ceil();
        if !(w.is_finite() && h.is_finite()) || w > max as f64 || h > max as f64 {
            return None;
        }
        Some(Size { width: w as u32, height: h as u32 })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub const fn from_size(size: Size) -> Self {
        Self::new(0, 0, size.width, size.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn right(&self) -> i64 {
        self.x as i64 + self.width as i64
    }

    pub fn bottom(&self) -> i64 {
        self.y as i64 + self.height as i64
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        let (x, y) = (x as i64, y as i64);
        x >= self.x as i64 && x < self.right() && y >= self.y as i64 && y < self.bottom()
    }

    /// True when `other` lies completely inside `self`.
    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Overlapping area of two rects, `None` when they do not overlap.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let x0 = (self.x as i64).max(other.x as i64);
        let y0 = (self.y as i64).max(other.y as i64);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        Some(Rect::new(x0 as i32, y0 as i32, (x1 - x0) as u32, (y1 - y0) as u32))
    }

    /// Overlap or shared edge. Used to decide whether two damage rects merge.
    pub fn touches(&self, other: &Rect) -> bool {
        (self.x as i64) <= other.right()
            && (other.x as i64) <= self.right()
            && (self.y as i64) <= other.bottom()
            && (other.y as i64) <= self.bottom()
    }

    /// Bounding box of both rects. Empty rects are ignored.
    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x0 = (self.x as i64).min(other.x as i64);
        let y0 = (self.y as i64).min(other.y as i64);
        let x1 = self.right().max(other.right());
        let y1 = self.bottom().max(other.bottom());
        Rect::new(x0 as i32, y0 as i32, (x1 - x0) as u32, (y1 - y0) as u32)
    }

    /// Scale a DIP rect to device pixels, returning the smallest integer rect
    /// enclosing the scaled area.
    pub fn to_enclosing_pixels(&self, scale_factor: f32) -> Rect {
        let s = scale_factor as f64;
        let x0 = (self.x as f64 * s).floor();
        let y0 = (self.y as f64 * s).floor();
        let x1 = (self.right() as f64 * s).ceil();
        let y1 = (self.bottom() as f64 * s).ceil();
        Rect::new(x0 as i32, y0 as i32, (x1 - x0) as u32, (y1 - y0) as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersect_and_union() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, 5, 10, 10);
        assert_eq!(a.intersect(&b), Some(Rect::new(5, 5, 5, 5)));
        assert_eq!(a.union(&b), Rect::new(0, 0, 15, 15));
        assert_eq!(a.intersect(&Rect::new(10, 0, 5, 5)), None);
    }

    #[test]
    fn touching_edges_count_as_touching() {
        let a = Rect::new(0, 0, 10, 10);
        assert!(a.touches(&Rect::new(10, 0, 4, 4)));
        assert!(!a.touches(&Rect::new(11, 0, 4, 4)));
    }

    #[test]
    fn scale_rounds_outwards() {
        let r = Rect::new(1, 1, 3, 3);
        assert_eq!(r.to_enclosing_pixels(1.5), Rect::new(1, 1, 5, 5));
        assert_eq!(Size::new(801, 601).to_pixels(1.25), Size::new(1002, 752));
    }

    #[test]
    fn bounded_pixel_conversion_rejects_oversized_results() {
        let s = Size::new(800, 600);
        assert_eq!(s.to_pixels_within(2.0, 1600), Some(Size::new(1600, 1200)));
        assert_eq!(s.to_pixels_within(2.5, 1600), None);
        assert_eq!(s.to_pixels_within(1.0e30, 16384), None);
        assert_eq!(s.to_pixels_within(f32::INFINITY, 16384), None);
    }

    #[test]
    fn negative_origin_is_clipped_by_intersect() {
        let bounds = Rect::new(0, 0, 100, 100);
        let r = Rect::new(-20, 90, 40, 40);
        assert_eq!(r.intersect(&bounds), Some(Rect::new(0, 90, 20, 10)));
    }
}
