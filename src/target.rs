//! The engine side of an off-screen surface.
//!
//! A `RenderTarget` is the typed boundary to whatever produces pixels (a
//! browser renderer, a test double, the CLI's synthetic scene). The surface
//! owns its target: on teardown it first stops deliveries, then calls
//! `detach`, then drops the target.
//!
//! Target methods run while the surface holds its lock, so a target must
//! never call back into the surface from inside them. Paints are expected to
//! arrive later, from the engine's own thread.

use crate::input::InputEvent;
use crate::rendering::{Rect, Size};
use crate::Result;
use std::sync::{Arc, Mutex};

pub trait RenderTarget: Send {
    /// Feed an input event into the engine's input pipeline.
    fn dispatch_input(&mut self, event: &InputEvent) -> Result<()>;

    /// Ask the engine to repaint `rect` (device pixels). The repaint arrives
    /// later through `OffscreenRenderSurface::on_paint`.
    fn request_repaint(&mut self, rect: Rect);

    /// The backing store changed to `size` device pixels.
    fn was_resized(&mut self, size: Size);

    /// The delivery rate changed; engines may throttle their own begin-frame
    /// source accordingly.
    fn set_frame_rate(&mut self, _fps: u32) {}

    /// Last call the target receives before it is dropped.
    fn detach(&mut self);
}

/// Target that accepts everything and does nothing.
#[derive(Debug, Default)]
pub struct NoopRenderTarget;

impl NoopRenderTarget {
    pub fn new() -> Self {
        NoopRenderTarget
    }
}

impl RenderTarget for NoopRenderTarget {
    fn dispatch_input(&mut self, _event: &InputEvent) -> Result<()> {
        Ok(())
    }

    fn request_repaint(&mut self, _rect: Rect) {}

    fn was_resized(&mut self, _size: Size) {}

    fn detach(&mut self) {}
}

/// Everything a `RecordingTarget` has been asked to do.
#[derive(Debug, Default, Clone)]
pub struct TargetLog {
    pub inputs: Vec<InputEvent>,
    pub repaints: Vec<Rect>,
    pub resizes: Vec<Size>,
    pub frame_rates: Vec<u32>,
    pub detached: bool,
}

/// Target that records every call into a shared `TargetLog`, optionally
/// refusing input. The log handle stays readable after the surface drops
/// the target.
#[derive(Debug, Clone, Default)]
pub struct RecordingTarget {
    log: Arc<Mutex<TargetLog>>,
    reject_input: bool,
}

impl RecordingTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// A target whose `dispatch_input` always fails.
    pub fn rejecting_input() -> Self {
        RecordingTarget { reject_input: true, ..Self::default() }
    }

    pub fn log(&self) -> TargetLog {
        self.log.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn with_log(&self, f: impl FnOnce(&mut TargetLog)) {
        let mut g = self.log.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut *g);
    }
}

impl RenderTarget for RecordingTarget {
    fn dispatch_input(&mut self, event: &InputEvent) -> Result<()> {
        if self.reject_input {
            return Err(crate::Error::Input("target refused input".into()));
        }
        self.with_log(|l| l.inputs.push(event.clone()));
        Ok(())
    }

    fn request_repaint(&mut self, rect: Rect) {
        self.with_log(|l| l.repaints.push(rect));
    }

    fn was_resized(&mut self, size: Size) {
        self.with_log(|l| l.resizes.push(size));
    }

    fn set_frame_rate(&mut self, fps: u32) {
        self.with_log(|l| l.frame_rates.push(fps));
    }

    fn detach(&mut self) {
        self.with_log(|l| l.detached = true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Modifiers;

    #[test]
    fn recording_target_shares_log_between_clones() {
        let t = RecordingTarget::new();
        let mut boxed: Box<dyn RenderTarget> = Box::new(t.clone());
        boxed.request_repaint(Rect::new(0, 0, 4, 4));
        boxed.detach();
        drop(boxed);
        let log = t.log();
        assert_eq!(log.repaints, vec![Rect::new(0, 0, 4, 4)]);
        assert!(log.detached);
    }

    #[test]
    fn rejecting_target_errors_on_input() {
        let mut t = RecordingTarget::rejecting_input();
        let ev = InputEvent::KeyDown { key_code: 13, modifiers: Modifiers::default() };
        assert!(t.dispatch_input(&ev).is_err());
        assert!(t.log().inputs.is_empty());
    }
}
