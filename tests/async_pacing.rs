use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use osr_host_view::input::{InputEvent, Modifiers};
use osr_host_view::pacing::{Clock, SystemClock};
use osr_host_view::rendering::{Rect, Size};
use osr_host_view::target::RecordingTarget;
use osr_host_view::{OffscreenRenderSurface, PacedSurface, SurfaceConfig, SurfaceState};
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

fn spawn(fps: u32) -> (PacedSurface, osr_host_view::async_api::FrameStream, RecordingTarget) {
    let cfg = SurfaceConfig { width: 32, height: 16, frame_rate: fps, ..Default::default() };
    let surface = Arc::new(OffscreenRenderSurface::new(cfg).expect("surface"));
    let target = RecordingTarget::new();
    surface.attach(Box::new(target.clone()));
    let (paced, frames) = PacedSurface::spawn(surface);
    (paced, frames, target)
}

#[tokio::test]
async fn worker_flushes_throttled_damage() {
    let (paced, mut frames, _target) = spawn(20);
    let surface = paced.surface().clone();

    surface.on_paint(Rect::new(0, 0, 2, 2), &[1; 16]).unwrap();
    surface.on_paint(Rect::new(8, 8, 2, 2), &[2; 16]).unwrap();

    let first = timeout(WAIT, frames.next_frame()).await.unwrap().unwrap();
    assert_eq!(first.damage, vec![Rect::new(0, 0, 2, 2)]);
    // the second paint arrived inside the interval; the worker delivers it on its tick
    let second = timeout(WAIT, frames.next_frame()).await.unwrap().unwrap();
    assert_eq!(second.damage, vec![Rect::new(8, 8, 2, 2)]);
    assert!(second.sequence > first.sequence);

    paced.close().await;
}

#[tokio::test]
async fn sustained_paints_are_paced() {
    let (paced, frames, _target) = spawn(25);
    let surface = paced.surface().clone();
    let painter = std::thread::spawn(move || {
        let start = Instant::now();
        while start.elapsed() < Duration::from_millis(400) {
            if surface.on_paint(Rect::new(0, 0, 1, 1), &[0; 4]).is_err() {
                break;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
    });

    let stamps: Vec<Instant> = timeout(WAIT, frames.into_stream().take(5).map(|_| Instant::now()).collect())
        .await
        .unwrap();
    painter.join().unwrap();
    paced.close().await;

    assert_eq!(stamps.len(), 5);
    // receipt jitter aside, deliveries cannot outrun the 40ms interval
    let elapsed = *stamps.last().unwrap() - stamps[0];
    assert!(elapsed >= Duration::from_millis(4 * 40 - 20), "5 frames in {:?}", elapsed);
}

#[tokio::test]
async fn commands_apply_on_worker() {
    let (paced, mut frames, target) = spawn(60);
    paced.resize(64, 32, 2.0).await.unwrap();
    assert!(paced.resize(0, 32, 1.0).await.is_err());
    paced.set_frame_rate(500).await;
    paced.inject_input(InputEvent::MouseMove { x: 3.0, y: 4.0, modifiers: Modifiers::default() });

    let surface = paced.surface().clone();
    assert_eq!(surface.pixel_size(), Size::new(128, 64));
    assert_eq!(surface.frame_rate(), 240);

    paced.set_painting(false).await;
    assert_eq!(surface.state(), SurfaceState::Paused);
    surface.on_paint(Rect::new(0, 0, 1, 1), &[0; 4]).unwrap();
    paced.set_painting(true).await;
    let frame = timeout(WAIT, frames.next_frame()).await.unwrap().unwrap();
    assert_eq!(frame.damage, vec![Rect::new(0, 0, 128, 64)]);

    paced.close().await;
    let log = target.log();
    assert_eq!(log.inputs.len(), 1);
    assert_eq!(log.frame_rates.last(), Some(&240));
    assert!(log.detached);
}

#[tokio::test]
async fn close_ends_stream_and_later_calls_are_noops() {
    let (paced, mut frames, _target) = spawn(60);
    let handle = paced.clone();
    paced.close().await;

    assert_eq!(handle.surface().state(), SurfaceState::Destroyed);
    assert!(timeout(WAIT, frames.next_frame()).await.unwrap().is_none());
    assert!(handle.resize(10, 10, 1.0).await.is_ok());
    handle.set_frame_rate(30).await;
    handle.inject_input(InputEvent::Char { ch: 'q', modifiers: Modifiers::default() });
    handle.close().await;
}

/// Wall clock that counts how often the pacing code reads it.
#[derive(Default)]
struct CountingClock {
    reads: AtomicUsize,
}

impl Clock for CountingClock {
    fn now(&self) -> Instant {
        self.reads.fetch_add(1, Ordering::Relaxed);
        SystemClock.now()
    }
}

#[tokio::test]
async fn paused_worker_ticks_at_frame_interval() {
    let clock = Arc::new(CountingClock::default());
    let cfg = SurfaceConfig { width: 16, height: 16, frame_rate: 10, ..Default::default() };
    let surface = Arc::new(OffscreenRenderSurface::with_clock(cfg, clock.clone()).expect("surface"));
    surface.attach(Box::new(RecordingTarget::new()));
    let (paced, _frames) = PacedSurface::spawn(surface.clone());

    paced.set_painting(false).await;
    surface.on_paint(Rect::new(0, 0, 1, 1), &[0; 4]).unwrap();
    assert!(surface.has_pending_damage());

    let before = clock.reads.load(Ordering::Relaxed);
    tokio::time::sleep(Duration::from_millis(500)).await;
    let reads = clock.reads.load(Ordering::Relaxed) - before;
    // roughly one tick per 100ms interval
    assert!(reads < 50, "{} clock reads in 500ms while paused", reads);
    assert!(surface.has_pending_damage());

    paced.close().await;
}
