//! Damage tracking between frame deliveries.
//!
//! Rects are kept exact while they are disjoint. A rect that overlaps or
//! touches an existing one is merged into their bounding box, and once more
//! than [`MAX_DAMAGE_RECTS`] disjoint rects accumulate the whole region
//! collapses to a single bounding box.

use super::geometry::{Rect, Size};

/// Upper bound on the number of disjoint rects carried per delivery
pub const MAX_DAMAGE_RECTS: usize = 8;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DamageRegion {
    rects: Vec<Rect>,
}

impl DamageRegion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    /// Bounding box of every damaged rect, `None` when nothing is damaged.
    pub fn bounds(&self) -> Option<Rect> {
        self.rects.iter().copied().reduce(|acc, r| acc.union(&r))
    }

    /// Add `rect` clipped to `buffer`. Rects falling entirely outside the
    /// buffer are ignored.
    pub fn add(&mut self, rect: Rect, buffer: Size) {
        let Some(mut pending) = rect.intersect(&Rect::from_size(buffer)) else {
            return;
        };

        // Absorb every rect the pending one touches, restarting whenever the
        // grown box may reach rects that were previously disjoint.
        loop {
            let before = self.rects.len();
            self.rects.retain(|r| {
                if r.touches(&pending) {
                    pending = pending.union(r);
                    false
                } else {
                    true
                }
            });
            if self.rects.len() == before {
                break;
            }
        }
        self.rects.push(pending);

        if self.rects.len() > MAX_DAMAGE_RECTS {
            if let Some(b) = self.bounds() {
                self.rects.clear();
                self.rects.push(b);
            }
        }
    }

    pub fn clear(&mut self) {
        self.rects.clear();
    }

    /// Move the accumulated rects out, leaving the region empty.
    pub fn take(&mut self) -> Vec<Rect> {
        std::mem::take(&mut self.rects)
    }
}
