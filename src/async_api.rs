use crate::input::InputEvent;
use crate::surface::{Delivery, OffscreenRenderSurface};
use crate::{FrameSnapshot, Result};
use futures::Stream;
use log::debug;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use tokio::sync::{mpsc as async_mpsc, oneshot};

enum Command {
    Resize(u32, u32, f32, oneshot::Sender<Result<()>>),
    SetFrameRate(u32, oneshot::Sender<()>),
    SetPainting(bool, oneshot::Sender<()>),
    Inject(InputEvent),
    Close(oneshot::Sender<()>),
}

/// A surface driven by a dedicated pacing thread.
///
/// The worker thread is the "main loop" of the surface: it ticks
/// `deliver_frame` once per frame interval and applies resize, frame-rate and
/// input commands sent from async tasks. Delivered frames are forwarded to
/// the paired [`FrameStream`].
#[derive(Clone)]
pub struct PacedSurface {
    surface: Arc<OffscreenRenderSurface>,
    cmd_tx: Sender<Command>,
}

/// Receiving end for frames delivered by a [`PacedSurface`]. Ends once the
/// surface is destroyed and every buffered frame has been read.
pub struct FrameStream {
    rx: async_mpsc::UnboundedReceiver<FrameSnapshot>,
}

impl PacedSurface {
    /// Start pacing `surface`. Replaces any frame handler already registered.
    pub fn spawn(surface: Arc<OffscreenRenderSurface>) -> (Self, FrameStream) {
        let (frame_tx, frame_rx) = async_mpsc::unbounded_channel();
        surface.on_frame(move |frame| {
            // receiver gone means nobody is listening; the frame is simply not forwarded
            let _ = frame_tx.send(frame.clone());
        });

        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
        let worker_surface = surface.clone();

        thread::spawn(move || {
            let surface = worker_surface;
            let mut wait = surface.frame_interval();
            loop {
                match cmd_rx.recv_timeout(wait) {
                    Ok(Command::Resize(w, h, scale, resp)) => {
                        let _ = resp.send(surface.resize(w, h, scale));
                    }
                    Ok(Command::SetFrameRate(fps, resp)) => {
                        surface.set_frame_rate(fps);
                        let _ = resp.send(());
                    }
                    Ok(Command::SetPainting(painting, resp)) => {
                        surface.set_painting(painting);
                        let _ = resp.send(());
                    }
                    Ok(Command::Inject(event)) => surface.inject_input(event),
                    Ok(Command::Close(resp)) => {
                        surface.destroy();
                        let _ = resp.send(());
                        break;
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }

                // Only a throttled frame is worth waking early for. Paused or
                // idle surfaces tick at the frame interval; resuming delivers
                // on its own.
                wait = match surface.deliver_frame() {
                    Delivery::Destroyed => break,
                    Delivery::Throttled => surface.time_until_next_frame(),
                    Delivery::Delivered(_) | Delivery::NoDamage | Delivery::Suppressed => {
                        surface.frame_interval()
                    }
                };
            }
            debug!("Pacing worker stopped");
        });

        (Self { surface, cmd_tx }, FrameStream { rx: frame_rx })
    }

    /// The shared surface, for engine-side calls such as `on_paint`.
    pub fn surface(&self) -> &Arc<OffscreenRenderSurface> {
        &self.surface
    }

    /// Resize on the pacing thread. Once the surface is gone this resolves
    /// to `Ok(())` without doing anything.
    pub async fn resize(&self, width: u32, height: u32, scale_factor: f32) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        if self.cmd_tx.send(Command::Resize(width, height, scale_factor, tx)).is_err() {
            return Ok(());
        }
        rx.await.unwrap_or(Ok(()))
    }

    pub async fn set_frame_rate(&self, fps: u32) {
        let (tx, rx) = oneshot::channel();
        if self.cmd_tx.send(Command::SetFrameRate(fps, tx)).is_ok() {
            let _ = rx.await;
        }
    }

    pub async fn set_painting(&self, painting: bool) {
        let (tx, rx) = oneshot::channel();
        if self.cmd_tx.send(Command::SetPainting(painting, tx)).is_ok() {
            let _ = rx.await;
        }
    }

    /// Queue an input event; it is dispatched on the pacing thread.
    pub fn inject_input(&self, event: InputEvent) {
        if self.cmd_tx.send(Command::Inject(event)).is_err() {
            debug!("Pacing worker gone; input dropped");
        }
    }

    /// Destroy the surface and stop the pacing thread.
    pub async fn close(self) {
        let (tx, rx) = oneshot::channel();
        if self.cmd_tx.send(Command::Close(tx)).is_ok() {
            let _ = rx.await;
        } else {
            self.surface.destroy();
        }
    }
}

impl FrameStream {
    /// Wait for the next delivered frame.
    pub async fn next_frame(&mut self) -> Option<FrameSnapshot> {
        self.rx.recv().await
    }

    /// A frame that is already buffered, without waiting.
    pub fn try_next_frame(&mut self) -> Option<FrameSnapshot> {
        self.rx.try_recv().ok()
    }

    pub fn into_stream(self) -> impl Stream<Item = FrameSnapshot> {
        futures::stream::unfold(self.rx, |mut rx| async move { rx.recv().await.map(|f| (f, rx)) })
    }
}
