use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use log::{debug, info, warn};
use osr_host_view::input::{InputEvent, Modifiers};
use osr_host_view::rendering::paint::PaintCommand;
use osr_host_view::rendering::{Rect, Size};
use osr_host_view::target::RenderTarget;
use osr_host_view::{OffscreenRenderSurface, PacedSurface, SurfaceConfig, SurfaceState};

/// Render a synthetic moving-box scene off-screen and report delivered frames
#[derive(Parser, Debug)]
#[command(name = "osr-host-view", version)]
struct Args {
    /// JSON surface configuration; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    width: Option<u32>,
    #[arg(long)]
    height: Option<u32>,
    /// Fixed device scale factor
    #[arg(long)]
    scale: Option<f32>,
    #[arg(long)]
    fps: Option<u32>,
    /// Number of frames to collect before exiting
    #[arg(long, default_value_t = 10)]
    frames: u32,
    /// Write the last frame as PNG
    #[arg(long)]
    out: Option<PathBuf>,
    /// Print the last frame as a data URL
    #[arg(long)]
    data_url: bool,
}

/// Render target for the synthetic scene: logs what the surface asks of it.
struct LoggingTarget;

impl RenderTarget for LoggingTarget {
    fn dispatch_input(&mut self, event: &InputEvent) -> osr_host_view::Result<()> {
        debug!("input {:?}", event);
        Ok(())
    }

    fn request_repaint(&mut self, rect: Rect) {
        debug!("repaint requested for {:?}", rect);
    }

    fn was_resized(&mut self, size: Size) {
        info!("backing store is {}x{} px", size.width, size.height);
    }

    fn set_frame_rate(&mut self, fps: u32) {
        info!("frame rate {} fps", fps);
    }

    fn detach(&mut self) {
        info!("render target detached");
    }
}

const BACKGROUND: (u8, u8, u8, u8) = (32, 32, 48, 255);
const BOX: (u8, u8, u8, u8) = (240, 160, 32, 255);
const BOX_SIZE: u32 = 32;

/// Hand one paint to the surface. Rejected paints are logged and reported
/// as `false`.
fn paint(surface: &OffscreenRenderSurface, region: Rect, pixels: &[u8]) -> bool {
    match surface.on_paint(region, pixels) {
        Ok(()) => true,
        Err(e) => {
            warn!("scene paint of {:?} rejected: {}", region, e);
            false
        }
    }
}

/// Engine stand-in: paints a background once, then moves a box across it
/// until the surface is destroyed.
fn run_scene(surface: Arc<OffscreenRenderSurface>) {
    let format = surface.capture().map(|f| f.format).unwrap_or_default();
    let size = surface.pixel_size();
    let background = PaintCommand::SolidRect {
        x: 0,
        y: 0,
        width: size.width,
        height: size.height,
        rgba: BACKGROUND,
    };
    if !paint(&surface, background.region(), &background.rasterize(format)) {
        return;
    }

    let step_delay = surface.frame_interval() / 2;
    let span = size.width.saturating_sub(BOX_SIZE).max(1) as i32;
    let mut prev: Option<Rect> = None;
    let mut step: i32 = 0;
    while surface.state() != SurfaceState::Destroyed {
        if let Some(old) = prev {
            let erase = PaintCommand::SolidRect {
                x: old.x,
                y: old.y,
                width: old.width,
                height: old.height,
                rgba: BACKGROUND,
            };
            paint(&surface, erase.region(), &erase.rasterize(format));
        }
        let boxed = PaintCommand::SolidRect {
            x: (step * 8) % span,
            y: (size.height / 2) as i32 - (BOX_SIZE / 2) as i32,
            width: BOX_SIZE,
            height: BOX_SIZE,
            rgba: BOX,
        };
        paint(&surface, boxed.region(), &boxed.rasterize(format));
        prev = Some(boxed.region());
        step += 1;
        std::thread::sleep(step_delay.max(Duration::from_millis(1)));
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SurfaceConfig::from_path(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => SurfaceConfig { width: 320, height: 180, ..Default::default() },
    };
    if let Some(w) = args.width {
        config.width = w;
    }
    if let Some(h) = args.height {
        config.height = h;
    }
    if let Some(s) = args.scale {
        config.scale_factor = Some(s);
    }
    if let Some(fps) = args.fps {
        config.frame_rate = fps;
    }
    config.validate()?;

    let surface = Arc::new(OffscreenRenderSurface::new(config)?);
    surface.on_lost(|reason| eprintln!("surface lost: {}", reason));
    surface.attach(Box::new(LoggingTarget));

    let (paced, mut frames) = PacedSurface::spawn(surface.clone());
    let scene = {
        let surface = surface.clone();
        std::thread::spawn(move || run_scene(surface))
    };

    let mut last = None;
    for _ in 0..args.frames {
        let Some(frame) = frames.next_frame().await else { break };
        println!("frame #{:<4} {}x{} damage {:?}", frame.sequence, frame.width, frame.height, frame.damage);
        if let Some(b) = frame.damage_bounds() {
            paced.inject_input(InputEvent::MouseMove {
                x: b.x as f32,
                y: b.y as f32,
                modifiers: Modifiers::default(),
            });
        }
        last = Some(frame);
    }

    paced.close().await;
    let _ = scene.join();

    let frame = last.context("no frame was delivered")?;
    println!("digest {}", frame.digest());
    if let Some(path) = &args.out {
        std::fs::write(path, frame.encode_png()?)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("wrote {}", path.display());
    }
    if args.data_url {
        println!("{}", frame.to_data_url()?);
    }
    Ok(())
}
