//! Off-screen host view
//!
//! Renders a browser surface into a caller-owned pixel buffer instead of an
//! on-screen window, and relays synthetic input back into the page.
//!
//! # Features
//!
//! - **Damage tracking**: paints between deliveries are coalesced into one
//!   damage region, never dropped
//! - **Frame pacing**: at most one delivery per `1/fps`, fps clamped to 1..=240
//! - **View tree integration**: `OffscreenHostView` implements the same `View`
//!   trait as every other view kind
//!
//! # Example
//!
//! ```
//! use osr_host_view::{OffscreenRenderSurface, SurfaceConfig};
//! use osr_host_view::rendering::Rect;
//! use osr_host_view::target::NoopRenderTarget;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SurfaceConfig { width: 64, height: 32, frame_rate: 30, ..Default::default() };
//! let surface = OffscreenRenderSurface::new(config)?;
//! surface.on_frame(|frame| println!("frame #{} damage {:?}", frame.sequence, frame.damage));
//! surface.attach(Box::new(NoopRenderTarget::new()));
//!
//! // what an engine would hand over for a 4x4 repaint
//! surface.on_paint(Rect::new(0, 0, 4, 4), &[255u8; 4 * 4 * 4])?;
//! surface.destroy();
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod error;
pub use error::{Error, Result};

pub mod input;
pub mod overlay;
pub mod pacing;
pub mod rendering;
pub mod surface;
pub mod target;
pub mod view;

// Worker-thread pacing driver with an async facade
pub mod async_api;

pub use async_api::PacedSurface;
pub use input::InputEvent;
pub use rendering::{FrameSnapshot, PixelFormat};
pub use surface::{Delivery, OffscreenRenderSurface, SurfaceState};
pub use view::{ContainerView, OffscreenHostView, View, ViewId};

/// Largest backing-store side, in device pixels
pub const MAX_SURFACE_DIMENSION: u32 = 16384;

/// Configuration for an off-screen surface
///
/// Sizes are in device-independent pixels (DIPs); the backing buffer is
/// `ceil(size * scale_factor)` device pixels. The defaults give an opaque
/// white 1280x720 surface at 60 fps that follows the host's scale factor.
///
/// # Examples
///
/// ```
/// let cfg: osr_host_view::SurfaceConfig =
///     serde_json::from_str(r#"{"width": 800, "height": 600, "frame_rate": 30}"#).unwrap();
/// assert_eq!(cfg.frame_rate, 30);
/// assert!(cfg.scale_factor.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    /// View width in DIPs
    pub width: u32,
    /// View height in DIPs
    pub height: u32,
    /// Fixed scale factor; `None` follows the scale passed to `resize`
    pub scale_factor: Option<f32>,
    /// Target deliveries per second (clamped to 1..=240)
    pub frame_rate: u32,
    /// Byte order of the backing buffer
    pub pixel_format: PixelFormat,
    /// Start from fully transparent pixels instead of `background`
    pub transparent: bool,
    /// Initial fill colour (RGBA); alpha is forced opaque unless `transparent`
    pub background: [u8; 4],
    /// Whether deliveries start enabled
    pub painting: bool,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            scale_factor: None,
            frame_rate: pacing::DEFAULT_FRAME_RATE,
            pixel_format: PixelFormat::Bgra8,
            transparent: false,
            background: [255, 255, 255, 255],
            painting: true,
        }
    }
}

impl SurfaceConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        let cfg: SurfaceConfig = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::Config(format!(
                "surface size must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if let Some(s) = self.scale_factor {
            if !(s.is_finite() && s > 0.0) {
                return Err(Error::Config(format!("scale factor must be positive, got {}", s)));
            }
        }
        let scale = self.scale_factor.unwrap_or(1.0);
        let dips = rendering::Size::new(self.width, self.height);
        if dips.to_pixels_within(scale, MAX_SURFACE_DIMENSION).is_none() {
            return Err(Error::Config(format!(
                "{}x{} @ {} exceeds the {} px surface limit",
                self.width, self.height, scale, MAX_SURFACE_DIMENSION
            )));
        }
        Ok(())
    }

    /// Colour a freshly allocated buffer is filled with.
    pub fn fill_color(&self) -> [u8; 4] {
        if self.transparent {
            [0, 0, 0, 0]
        } else {
            let [r, g, b, _] = self.background;
            [r, g, b, 255]
        }
    }
}

/// View size in DIPs plus the host's device scale factor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewSize {
    pub width: u32,
    pub height: u32,
    pub scale_factor: f32,
}

impl ViewSize {
    pub fn new(width: u32, height: u32, scale_factor: f32) -> Self {
        Self { width, height, scale_factor }
    }

    pub fn dip_size(&self) -> rendering::Size {
        rendering::Size::new(self.width, self.height)
    }
}
