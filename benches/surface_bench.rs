use criterion::{black_box, criterion_group, criterion_main, Criterion};
use osr_host_view::pacing::ManualClock;
use osr_host_view::rendering::paint::PaintCommand;
use osr_host_view::rendering::{DamageRegion, Rect, Size};
use osr_host_view::target::NoopRenderTarget;
use osr_host_view::{OffscreenRenderSurface, PixelFormat, SurfaceConfig};
use std::sync::Arc;
use std::time::Duration;

fn surface(width: u32, height: u32) -> (OffscreenRenderSurface, ManualClock) {
    let clock = ManualClock::new();
    let cfg = SurfaceConfig { width, height, frame_rate: 60, ..Default::default() };
    let s = OffscreenRenderSurface::with_clock(cfg, Arc::new(clock.clone())).expect("surface");
    s.on_frame(|f| {
        black_box(f.damage.len());
    });
    s.attach(Box::new(NoopRenderTarget::new()));
    (s, clock)
}

fn bench_paint_and_deliver(c: &mut Criterion) {
    let (s, clock) = surface(1280, 720);
    let small = PaintCommand::SolidRect { x: 100, y: 100, width: 64, height: 64, rgba: (10, 20, 30, 255) };
    let small_px = small.rasterize(PixelFormat::Bgra8);
    c.bench_function("paint_64x64_and_deliver_720p", |b| {
        b.iter(|| {
            s.on_paint(small.region(), &small_px).expect("paint");
            clock.advance(Duration::from_millis(17));
            black_box(s.deliver_frame());
        })
    });

    let full = PaintCommand::SolidRect { x: 0, y: 0, width: 1280, height: 720, rgba: (1, 2, 3, 255) };
    let full_px = full.rasterize(PixelFormat::Bgra8);
    c.bench_function("paint_full_and_deliver_720p", |b| {
        b.iter(|| {
            s.on_paint(full.region(), &full_px).expect("paint");
            clock.advance(Duration::from_millis(17));
            black_box(s.deliver_frame());
        })
    });
}

fn bench_damage_merge(c: &mut Criterion) {
    let bounds = Size::new(1920, 1080);
    c.bench_function("damage_add_64_scattered", |b| {
        b.iter(|| {
            let mut region = DamageRegion::new();
            for i in 0..64i32 {
                region.add(Rect::new((i * 37) % 1900, (i * 53) % 1060, 16, 16), bounds);
            }
            black_box(region.take())
        })
    });
}

fn bench_digest(c: &mut Criterion) {
    let (s, _clock) = surface(640, 480);
    let frame = s.capture().expect("capture");
    c.bench_function("digest_640x480", |b| b.iter(|| black_box(frame.digest())));
}

criterion_group!(benches, bench_paint_and_deliver, bench_damage_merge, bench_digest);
criterion_main!(benches);
