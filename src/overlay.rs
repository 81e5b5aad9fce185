//! Overlay layers (popups, proxied child views) composited over the page.
//!
//! Overlay bounds are kept in DIPs and converted with the surface's current
//! scale factor. Each overlay holds its own pixel block, which must match its
//! device-pixel size exactly. At delivery time overlays are copied over the
//! base frame in insertion order and their rects join the delivered damage.

use crate::input::InputEvent;
use crate::rendering::{FrameBuffer, PixelFormat, Rect};
use crate::{Error, Result};
use std::sync::Arc;

/// Receives pointer events that land on an overlay, in overlay-local
/// device pixels.
pub type OverlayInputHandler = Arc<dyn Fn(&InputEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OverlayId(u64);

struct Overlay {
    id: OverlayId,
    bounds: Rect,
    pixels: Option<Vec<u8>>,
    on_input: Option<OverlayInputHandler>,
}

#[derive(Default)]
pub struct OverlaySet {
    next_id: u64,
    layers: Vec<Overlay>,
}

impl OverlaySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn add(&mut self, bounds: Rect, on_input: Option<OverlayInputHandler>) -> OverlayId {
        self.next_id += 1;
        let id = OverlayId(self.next_id);
        self.layers.push(Overlay { id, bounds, pixels: None, on_input });
        id
    }

    /// Remove an overlay, returning the DIP bounds it covered.
    pub fn remove(&mut self, id: OverlayId) -> Option<Rect> {
        let idx = self.layers.iter().position(|o| o.id == id)?;
        Some(self.layers.remove(idx).bounds)
    }

    pub fn bounds(&self, id: OverlayId) -> Option<Rect> {
        self.layers.iter().find(|o| o.id == id).map(|o| o.bounds)
    }

    /// Move or resize an overlay. Its pixels are dropped when the size
    /// changes. Returns the previous bounds.
    pub fn set_bounds(&mut self, id: OverlayId, bounds: Rect) -> Result<Rect> {
        let o = self.find_mut(id)?;
        let old = o.bounds;
        if old.size() != bounds.size() {
            o.pixels = None;
        }
        o.bounds = bounds;
        Ok(old)
    }

    /// Replace an overlay's pixels. Returns the device-pixel rect it covers.
    pub fn set_pixels(&mut self, id: OverlayId, pixels: Vec<u8>, scale_factor: f32) -> Result<Rect> {
        let o = self.find_mut(id)?;
        let px_rect = o.bounds.to_enclosing_pixels(scale_factor);
        let expected = px_rect.area() as usize * PixelFormat::BYTES_PER_PIXEL;
        if pixels.len() != expected {
            return Err(Error::Overlay(format!(
                "overlay {:?} expects {} bytes for {}x{}, got {}",
                id,
                expected,
                px_rect.width,
                px_rect.height,
                pixels.len()
            )));
        }
        o.pixels = Some(pixels);
        Ok(px_rect)
    }

    /// Copy overlay pixels over `frame`. Blocks whose size no longer matches
    /// the overlay (scale changed since they were set) are skipped.
    pub fn composite_onto(&self, frame: &mut FrameBuffer, scale_factor: f32) -> Vec<Rect> {
        let mut drawn = Vec::new();
        for o in &self.layers {
            let Some(pixels) = &o.pixels else { continue };
            let rect = o.bounds.to_enclosing_pixels(scale_factor);
            if pixels.len() != rect.area() as usize * PixelFormat::BYTES_PER_PIXEL {
                continue;
            }
            if let Ok(Some(clip)) = frame.write_region(rect, pixels) {
                drawn.push(clip);
            }
        }
        drawn
    }

    /// Find the topmost overlay with an input handler under a pointer event
    /// and return the handler with the event in overlay-local coordinates.
    pub fn route(&self, event: &InputEvent, scale_factor: f32) -> Option<(OverlayInputHandler, InputEvent)> {
        let (x, y) = event.position()?;
        self.layers.iter().rev().find_map(|o| {
            let handler = o.on_input.as_ref()?;
            let rect = o.bounds.to_enclosing_pixels(scale_factor);
            if rect.contains_point(x.floor() as i32, y.floor() as i32) {
                Some((handler.clone(), event.relative_to(rect.x as f32, rect.y as f32)))
            } else {
                None
            }
        })
    }

    pub fn clear(&mut self) {
        self.layers.clear();
    }

    fn find_mut(&mut self, id: OverlayId) -> Result<&mut Overlay> {
        self.layers
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| Error::Overlay(format!("unknown overlay {:?}", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Modifiers;
    use crate::rendering::Size;
    use std::sync::Mutex;

    #[test]
    fn pixels_must_match_device_size() {
        let mut set = OverlaySet::new();
        let id = set.add(Rect::new(2, 2, 4, 4), None);
        assert!(set.set_pixels(id, vec![0; 16 * 4], 2.0).is_err());
        let rect = set.set_pixels(id, vec![0; 64 * 4], 2.0).unwrap();
        assert_eq!(rect, Rect::new(4, 4, 8, 8));
    }

    #[test]
    fn composite_copies_in_order() {
        let mut fb = FrameBuffer::new(Size::new(8, 8), PixelFormat::Rgba8, [0, 0, 0, 255]);
        let mut set = OverlaySet::new();
        let a = set.add(Rect::new(0, 0, 4, 4), None);
        let b = set.add(Rect::new(2, 2, 4, 4), None);
        set.set_pixels(a, vec![1; 64], 1.0).unwrap();
        set.set_pixels(b, vec![2; 64], 1.0).unwrap();
        let drawn = set.composite_onto(&mut fb, 1.0);
        assert_eq!(drawn.len(), 2);
        assert_eq!(fb.pixel(0, 0), Some([1, 1, 1, 1]));
        assert_eq!(fb.pixel(3, 3), Some([2, 2, 2, 2]));
        assert_eq!(fb.pixel(7, 7), Some([0, 0, 0, 255]));
    }

    #[test]
    fn route_picks_topmost_with_local_coordinates() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        let handler: OverlayInputHandler = Arc::new(move |ev: &InputEvent| {
            s.lock().unwrap().push(ev.position());
        });
        let mut set = OverlaySet::new();
        set.add(Rect::new(0, 0, 100, 100), None);
        set.add(Rect::new(10, 20, 30, 30), Some(handler));

        let ev = InputEvent::MouseMove { x: 15.0, y: 25.0, modifiers: Modifiers::default() };
        let (h, local) = set.route(&ev, 1.0).expect("routed");
        h(&local);
        assert_eq!(seen.lock().unwrap().as_slice(), &[Some((5.0, 5.0))]);

        let miss = InputEvent::MouseMove { x: 60.0, y: 60.0, modifiers: Modifiers::default() };
        assert!(set.route(&miss, 1.0).is_none());
    }

    #[test]
    fn resizing_drops_pixels() {
        let mut set = OverlaySet::new();
        let id = set.add(Rect::new(0, 0, 2, 2), None);
        set.set_pixels(id, vec![0; 16], 1.0).unwrap();
        set.set_bounds(id, Rect::new(1, 1, 2, 2)).unwrap();
        let mut fb = FrameBuffer::new(Size::new(8, 8), PixelFormat::Rgba8, [0; 4]);
        assert_eq!(set.composite_onto(&mut fb, 1.0), vec![Rect::new(1, 1, 2, 2)]);
        set.set_bounds(id, Rect::new(1, 1, 3, 3)).unwrap();
        assert!(set.composite_onto(&mut fb, 1.0).is_empty());
    }
}
