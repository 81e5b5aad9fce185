//! The off-screen render surface.
//!
//! Bridges engine paint notifications to a caller-visible frame handler and
//! relays caller input into the engine. All buffer and damage mutation goes
//! through one mutex; frame handlers run outside it so they may call back
//! into the surface.

use crate::input::InputEvent;
use crate::overlay::{OverlayId, OverlayInputHandler, OverlaySet};
use crate::pacing::{Clock, FramePacer, FrameRate, SystemClock};
use crate::rendering::{DamageRegion, FrameBuffer, FrameSnapshot, Rect, Size};
use crate::target::RenderTarget;
use crate::{Error, Result, SurfaceConfig, ViewSize, MAX_SURFACE_DIMENSION};
use log::{debug, info, warn};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

type FrameHandler = Arc<dyn Fn(&FrameSnapshot) + Send + Sync>;
type LostHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// Lifecycle of a surface.
///
/// `Uninitialized → Active ⇄ Paused → Destroyed`. Paused surfaces keep
/// accumulating damage but deliver nothing. `Destroyed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceState {
    Uninitialized,
    Active,
    Paused,
    Destroyed,
}

/// Outcome of one `deliver_frame` attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// A frame went out with this sequence number
    Delivered(u64),
    /// Nothing changed since the last delivery
    NoDamage,
    /// Damage is pending but the frame interval has not elapsed
    Throttled,
    /// Not attached, paused, or another delivery is still running
    Suppressed,
    Destroyed,
}

struct Inner {
    state: SurfaceState,
    config: SurfaceConfig,
    view: ViewSize,
    manual_scale: Option<f32>,
    buffer: FrameBuffer,
    damage: DamageRegion,
    pacer: FramePacer,
    overlays: OverlaySet,
    target: Option<Box<dyn RenderTarget>>,
    visible: bool,
    painting: bool,
    delivering: bool,
    sequence: u64,
    on_frame: Option<FrameHandler>,
    on_lost: Option<LostHandler>,
}

impl Inner {
    fn scale_factor(&self) -> f32 {
        self.manual_scale.unwrap_or(self.view.scale_factor)
    }

    fn pixel_size(&self) -> Size {
        self.view.dip_size().to_pixels(self.scale_factor())
    }

    fn full_rect(&self) -> Rect {
        Rect::from_size(self.buffer.size())
    }

    /// Active when attached, visible and painting; Paused otherwise.
    fn settle_state(&mut self) {
        if matches!(self.state, SurfaceState::Destroyed | SurfaceState::Uninitialized) {
            return;
        }
        self.state = if self.visible && self.painting {
            SurfaceState::Active
        } else {
            SurfaceState::Paused
        };
    }

    /// Reallocate the backing store at the current pixel size and ask the
    /// engine for a full repaint.
    fn reallocate(&mut self) {
        let size = self.pixel_size();
        self.buffer = FrameBuffer::new(size, self.config.pixel_format, self.config.fill_color());
        self.damage.clear();
        let full = self.full_rect();
        if let Some(t) = self.target.as_mut() {
            t.was_resized(size);
            t.request_repaint(full);
        }
        debug!(
            "Surface resized to {}x{} DIP @ {} ({}x{} px)",
            self.view.width,
            self.view.height,
            self.scale_factor(),
            size.width,
            size.height
        );
    }

    fn add_damage(&mut self, rect: Rect) {
        let size = self.buffer.size();
        self.damage.add(rect, size);
    }

    /// Composite overlays, take the pending damage and package a snapshot.
    fn snapshot(&mut self) -> FrameSnapshot {
        let scale = self.scale_factor();
        let size = self.buffer.size();
        let mut damage = std::mem::take(&mut self.damage);
        let pixels: Arc<[u8]> = if self.overlays.is_empty() {
            Arc::from(self.buffer.as_bytes())
        } else {
            let mut frame = self.buffer.clone();
            for r in self.overlays.composite_onto(&mut frame, scale) {
                damage.add(r, size);
            }
            Arc::from(frame.as_bytes())
        };
        FrameSnapshot {
            sequence: self.sequence,
            width: size.width,
            height: size.height,
            stride: self.buffer.stride(),
            format: self.buffer.format(),
            scale_factor: scale,
            pixels,
            damage: damage.take(),
        }
    }
}

/// An off-screen rendering surface bound to one render target.
///
/// Shared as `Arc<OffscreenRenderSurface>`: paints typically arrive from the
/// engine's thread while deliveries and input run on the embedder's loop.
pub struct OffscreenRenderSurface {
    inner: Mutex<Inner>,
    clock: Arc<dyn Clock>,
}

/// Clears the `delivering` flag even if a frame handler panics.
struct DeliveryGuard<'a>(&'a OffscreenRenderSurface);

impl Drop for DeliveryGuard<'_> {
    fn drop(&mut self) {
        self.0.lock().delivering = false;
    }
}

impl OffscreenRenderSurface {
    pub fn new(config: SurfaceConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a surface whose pacing decisions use `clock`.
    pub fn with_clock(config: SurfaceConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        let view = ViewSize::new(config.width, config.height, 1.0);
        let manual_scale = config.scale_factor;
        let pixel_size = view.dip_size().to_pixels(manual_scale.unwrap_or(1.0));
        let buffer = FrameBuffer::new(pixel_size, config.pixel_format, config.fill_color());
        let inner = Inner {
            state: SurfaceState::Uninitialized,
            view,
            manual_scale,
            buffer,
            damage: DamageRegion::new(),
            pacer: FramePacer::new(FrameRate::new(config.frame_rate)),
            overlays: OverlaySet::new(),
            target: None,
            visible: true,
            painting: config.painting,
            delivering: false,
            sequence: 0,
            on_frame: None,
            on_lost: None,
            config,
        };
        Ok(Self { inner: Mutex::new(inner), clock })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    // --- lifecycle ---

    /// Bind the surface to its render target. Replaces (and detaches) any
    /// previous target. Ignored once destroyed.
    pub fn attach(&self, mut target: Box<dyn RenderTarget>) {
        let previous = {
            let mut g = self.lock();
            if g.state == SurfaceState::Destroyed {
                debug!("attach after destroy ignored");
                return;
            }
            let size = g.buffer.size();
            let full = g.full_rect();
            target.was_resized(size);
            target.set_frame_rate(g.pacer.rate().fps());
            target.request_repaint(full);
            let previous = g.target.replace(target);
            if g.state == SurfaceState::Uninitialized {
                g.state = SurfaceState::Active;
            }
            g.settle_state();
            info!("Surface attached ({}x{} px, {:?})", size.width, size.height, g.state);
            previous
        };
        if let Some(mut old) = previous {
            old.detach();
        }
    }

    /// Tear the surface down. Idempotent: releases the buffer, forgets
    /// pending damage and overlays, then detaches the target. Snapshots
    /// already delivered stay valid.
    pub fn destroy(&self) {
        let target = {
            let mut g = self.lock();
            if g.state == SurfaceState::Destroyed {
                return;
            }
            g.state = SurfaceState::Destroyed;
            g.buffer.release();
            g.damage.clear();
            g.overlays.clear();
            g.on_frame = None;
            g.on_lost = None;
            g.target.take()
        };
        if let Some(mut t) = target {
            t.detach();
        }
        info!("Surface destroyed");
    }

    /// Engine-side failure (lost context, crashed renderer). Notifies the
    /// `on_lost` handler once and destroys the surface; recreating it is up
    /// to the caller.
    pub fn on_context_lost(&self, reason: &str) {
        let handler = {
            let mut g = self.lock();
            if g.state == SurfaceState::Destroyed {
                return;
            }
            g.on_lost.take()
        };
        warn!("Surface lost: {}", reason);
        self.destroy();
        if let Some(h) = handler {
            h(reason);
        }
    }

    // --- handlers ---

    /// Register the frame-ready handler. It runs on whichever thread triggers
    /// the delivery and must not block.
    pub fn on_frame<F>(&self, cb: F)
    where
        F: Fn(&FrameSnapshot) + Send + Sync + 'static,
    {
        let mut g = self.lock();
        if g.state != SurfaceState::Destroyed {
            g.on_frame = Some(Arc::new(cb));
        }
    }

    pub fn clear_on_frame(&self) {
        self.lock().on_frame = None;
    }

    /// Register the one-shot surface-lost handler.
    pub fn on_lost<F>(&self, cb: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let mut g = self.lock();
        if g.state != SurfaceState::Destroyed {
            g.on_lost = Some(Arc::new(cb));
        }
    }

    // --- sizing ---

    /// Resize the view (DIPs) and report the host's scale factor.
    ///
    /// Zero dimensions, a non-positive scale, or a backing store larger than
    /// `MAX_SURFACE_DIMENSION` on either side are rejected and the previous
    /// size is kept. Repeating the current size is a no-op.
    pub fn resize(&self, width: u32, height: u32, scale_factor: f32) -> Result<()> {
        let mut g = self.lock();
        if g.state == SurfaceState::Destroyed {
            return Ok(());
        }
        let next = ViewSize::new(width, height, scale_factor);
        let effective = g.manual_scale.unwrap_or(scale_factor);
        let fits = |scale: f32| {
            next.dip_size().to_pixels_within(scale, MAX_SURFACE_DIMENSION).is_some()
        };
        if width == 0
            || height == 0
            || !(scale_factor.is_finite() && scale_factor > 0.0)
            || !fits(scale_factor)
            || !fits(effective)
        {
            warn!("Rejected resize to {}x{} @ {}", width, height, scale_factor);
            return Err(Error::InvalidSize { width, height, scale_factor });
        }
        if next == g.view {
            return Ok(());
        }
        let before = (g.pixel_size(), g.scale_factor(), g.view.dip_size());
        g.view = next;
        if before == (g.pixel_size(), g.scale_factor(), g.view.dip_size()) {
            // only the host scale moved, and a manual scale hides it
            return Ok(());
        }
        g.reallocate();
        Ok(())
    }

    /// Pin the scale factor (`Some`) or follow the host again (`None`).
    pub fn set_manual_scale_factor(&self, scale_factor: Option<f32>) -> Result<()> {
        let mut g = self.lock();
        if g.state == SurfaceState::Destroyed {
            return Ok(());
        }
        let target = scale_factor.unwrap_or(g.view.scale_factor);
        if !(target.is_finite() && target > 0.0)
            || g.view.dip_size().to_pixels_within(target, MAX_SURFACE_DIMENSION).is_none()
        {
            warn!("Rejected manual scale factor {}", target);
            return Err(Error::InvalidSize {
                width: g.view.width,
                height: g.view.height,
                scale_factor: target,
            });
        }
        let before = g.scale_factor();
        g.manual_scale = scale_factor;
        if g.scale_factor() != before {
            g.reallocate();
        }
        Ok(())
    }

    /// Ask the engine to repaint the whole surface.
    pub fn invalidate(&self) {
        let mut g = self.lock();
        let full = g.full_rect();
        if let Some(t) = g.target.as_mut() {
            t.request_repaint(full);
        }
    }

    // --- pacing ---

    /// Set the delivery rate (clamped to 1..=240). Applies from the next
    /// delivery on.
    pub fn set_frame_rate(&self, fps: u32) {
        let mut g = self.lock();
        if g.state == SurfaceState::Destroyed {
            return;
        }
        let rate = FrameRate::new(fps);
        g.pacer.set_rate(rate);
        if let Some(t) = g.target.as_mut() {
            t.set_frame_rate(rate.fps());
        }
        debug!("Frame rate set to {} (requested {})", rate.fps(), fps);
    }

    /// Pause or resume deliveries. Resuming requests a full repaint and
    /// delivers the coalesced result.
    pub fn set_painting(&self, painting: bool) {
        self.update_activity(|g| g.painting = painting);
    }

    /// Visibility as seen by the host; hidden surfaces are paused.
    pub fn set_visible(&self, visible: bool) {
        self.update_activity(|g| g.visible = visible);
    }

    fn update_activity(&self, f: impl FnOnce(&mut Inner)) {
        let resumed = {
            let mut g = self.lock();
            if g.state == SurfaceState::Destroyed {
                return;
            }
            let before = g.state;
            f(&mut *g);
            g.settle_state();
            let resumed = before == SurfaceState::Paused && g.state == SurfaceState::Active;
            if resumed {
                let full = g.full_rect();
                g.add_damage(full);
                if let Some(t) = g.target.as_mut() {
                    t.request_repaint(full);
                }
            }
            if before != g.state {
                info!("Surface {:?} -> {:?}", before, g.state);
            }
            resumed
        };
        if resumed {
            self.deliver_frame();
        }
    }

    // --- paint & delivery ---

    /// Engine paint notification: `pixels` is a tightly packed block covering
    /// `region` (device pixels). The visible part is copied into the buffer
    /// and merged into the pending damage. Delivers right away when the
    /// frame interval allows, otherwise the damage waits for the next tick.
    pub fn on_paint(&self, region: Rect, pixels: &[u8]) -> Result<()> {
        let deliver_now = {
            let mut g = self.lock();
            match g.state {
                SurfaceState::Destroyed | SurfaceState::Uninitialized => return Ok(()),
                SurfaceState::Active | SurfaceState::Paused => {}
            }
            let written = g.buffer.write_region(region, pixels).map_err(|e| {
                warn!("Dropped paint of {:?}: {}", region, e);
                e
            })?;
            if let Some(clip) = written {
                g.add_damage(clip);
            }
            g.state == SurfaceState::Active && !g.delivering && g.pacer.ready(self.clock.now())
        };
        if deliver_now {
            self.deliver_frame();
        }
        Ok(())
    }

    /// Deliver the pending damage if the surface is active and one frame
    /// interval has passed since the previous delivery. The frame handler is
    /// called exactly once per `Delivered` outcome.
    pub fn deliver_frame(&self) -> Delivery {
        let now = self.clock.now();
        let (handler, snapshot) = {
            let mut g = self.lock();
            match g.state {
                SurfaceState::Destroyed => return Delivery::Destroyed,
                SurfaceState::Uninitialized | SurfaceState::Paused => return Delivery::Suppressed,
                SurfaceState::Active => {}
            }
            if g.delivering {
                return Delivery::Suppressed;
            }
            if g.damage.is_empty() {
                return Delivery::NoDamage;
            }
            if !g.pacer.ready(now) {
                return Delivery::Throttled;
            }
            g.sequence += 1;
            g.pacer.mark_delivered(now);
            g.delivering = true;
            (g.on_frame.clone(), g.snapshot())
        };

        let _guard = DeliveryGuard(self);
        debug!("Delivering frame #{} damage {:?}", snapshot.sequence, snapshot.damage);
        if let Some(h) = handler {
            h(&snapshot);
        }
        Delivery::Delivered(snapshot.sequence)
    }

    /// Composited copy of the current buffer, without touching damage or
    /// pacing. `None` before attach and after destroy.
    pub fn capture(&self) -> Option<FrameSnapshot> {
        let g = self.lock();
        if matches!(g.state, SurfaceState::Destroyed | SurfaceState::Uninitialized) {
            return None;
        }
        let scale = g.scale_factor();
        let mut frame = g.buffer.clone();
        g.overlays.composite_onto(&mut frame, scale);
        Some(FrameSnapshot {
            sequence: g.sequence,
            width: frame.width(),
            height: frame.height(),
            stride: frame.stride(),
            format: frame.format(),
            scale_factor: scale,
            pixels: Arc::from(frame.as_bytes()),
            damage: Vec::new(),
        })
    }

    // --- input ---

    /// Forward an input event into the page. Pointer events over an overlay
    /// with an input handler go to that overlay instead. Failures are
    /// logged, never returned.
    pub fn inject_input(&self, event: InputEvent) {
        let routed = {
            let mut g = self.lock();
            if g.state == SurfaceState::Destroyed {
                debug!("Input after destroy dropped: {:?}", event);
                return;
            }
            let scale = g.scale_factor();
            match g.overlays.route(&event, scale) {
                Some(routed) => Some(routed),
                None => {
                    match g.target.as_mut() {
                        Some(t) => {
                            if let Err(e) = t.dispatch_input(&event) {
                                warn!("Input dispatch failed: {}", e);
                            }
                        }
                        None => warn!("{}; input dropped", Error::NotAttached),
                    }
                    None
                }
            }
        };
        if let Some((handler, local)) = routed {
            handler(&local);
        }
    }

    // --- overlays ---

    /// Add an overlay layer with DIP `bounds`. Returns `None` once destroyed.
    pub fn add_overlay(&self, bounds: Rect, on_input: Option<OverlayInputHandler>) -> Option<OverlayId> {
        let mut g = self.lock();
        if g.state == SurfaceState::Destroyed {
            return None;
        }
        Some(g.overlays.add(bounds, on_input))
    }

    /// Replace an overlay's pixels; the block must match its device size.
    pub fn set_overlay_pixels(&self, id: OverlayId, pixels: Vec<u8>) -> Result<()> {
        let deliver_now = {
            let mut g = self.lock();
            if g.state == SurfaceState::Destroyed {
                return Ok(());
            }
            let scale = g.scale_factor();
            let rect = g.overlays.set_pixels(id, pixels, scale)?;
            g.add_damage(rect);
            g.state == SurfaceState::Active && !g.delivering && g.pacer.ready(self.clock.now())
        };
        if deliver_now {
            self.deliver_frame();
        }
        Ok(())
    }

    pub fn set_overlay_bounds(&self, id: OverlayId, bounds: Rect) -> Result<()> {
        let mut g = self.lock();
        if g.state == SurfaceState::Destroyed {
            return Ok(());
        }
        let scale = g.scale_factor();
        let old = g.overlays.set_bounds(id, bounds)?;
        g.add_damage(old.to_enclosing_pixels(scale));
        g.add_damage(bounds.to_enclosing_pixels(scale));
        Ok(())
    }

    pub fn remove_overlay(&self, id: OverlayId) {
        let mut g = self.lock();
        let scale = g.scale_factor();
        if let Some(old) = g.overlays.remove(id) {
            g.add_damage(old.to_enclosing_pixels(scale));
        }
    }

    // --- accessors ---

    pub fn state(&self) -> SurfaceState {
        self.lock().state
    }

    pub fn view_size(&self) -> ViewSize {
        self.lock().view
    }

    /// Backing buffer size in device pixels (0x0 once destroyed).
    pub fn pixel_size(&self) -> Size {
        self.lock().buffer.size()
    }

    pub fn scale_factor(&self) -> f32 {
        self.lock().scale_factor()
    }

    pub fn frame_rate(&self) -> u32 {
        self.lock().pacer.rate().fps()
    }

    pub fn frame_interval(&self) -> Duration {
        self.lock().pacer.interval()
    }

    /// Time until the pacer would allow the next delivery.
    pub fn time_until_next_frame(&self) -> Duration {
        let now = self.clock.now();
        self.lock().pacer.time_until_ready(now)
    }

    pub fn has_pending_damage(&self) -> bool {
        !self.lock().damage.is_empty()
    }

    /// Sequence number of the most recent delivery (0 before the first).
    pub fn last_sequence(&self) -> u64 {
        self.lock().sequence
    }
}
