use std::sync::{Arc, mpsc};
use std::thread::JoinHandle;

use anyhow::{Context, anyhow};
use serde_json::Value;

use crate::foundation::core::{Bitmap, CanvasSize};
use crate::foundation::error::{BridgeError, BridgeResult};
use crate::protocol::decode::{BatchReport, Decoder};
use crate::render::exec::{CommandExecutor, NoResources};
use crate::render::primitives::RendererKind;
use crate::render::raster::RasterSurface;
use crate::render::surface::DrawingSurface;

enum WorkerMsg {
    Run {
        message: Value,
        buffers: Vec<Arc<[u8]>>,
        reply: mpsc::Sender<BatchReport>,
    },
    Present(Arc<Bitmap>),
    Resize(CanvasSize),
    Read(mpsc::Sender<Bitmap>),
}

struct Worker {
    tx: mpsc::Sender<WorkerMsg>,
    handle: Option<JoinHandle<()>>,
}

/// Where the element's pixels are drawn.
enum Control {
    Local(RasterSurface),
    Offscreen(Worker),
}

/// An interactive drawing element whose surface can be handed to a
/// background thread exactly once.
///
/// Before the transfer every call works on the local surface. After it the
/// surface lives on the worker thread and every call, resizes included, is
/// forwarded there; the element never touches the pixels again.
pub struct CanvasElement {
    size: CanvasSize,
    renderer: RendererKind,
    control: Control,
}

impl std::fmt::Debug for CanvasElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanvasElement")
            .field("size", &self.size)
            .field("transferred", &self.is_transferred())
            .finish_non_exhaustive()
    }
}

impl CanvasElement {
    /// Transparent element drawing primitives with `renderer`.
    pub fn new(size: CanvasSize, renderer: RendererKind) -> Self {
        Self {
            size,
            renderer,
            control: Control::Local(RasterSurface::new(size)),
        }
    }

    /// Current backing-store size.
    pub fn size(&self) -> CanvasSize {
        self.size
    }

    /// `true` once control moved to the worker thread.
    pub fn is_transferred(&self) -> bool {
        matches!(self.control, Control::Offscreen(_))
    }

    /// Move the surface to a background thread, keeping its pixels.
    ///
    /// Fails if control was already transferred.
    pub fn transfer_control_to_offscreen(&mut self) -> BridgeResult<()> {
        let Control::Local(surface) = &mut self.control else {
            return Err(BridgeError::validation(
                "surface control was already transferred",
            ));
        };
        let pixels = surface.read_pixels();
        let (size, renderer) = (self.size, self.renderer);
        let (tx, rx) = mpsc::channel();
        let handle = std::thread::Builder::new()
            .name("canvas-offscreen".to_owned())
            .spawn(move || worker_loop(size, renderer, &pixels, rx))
            .context("spawn offscreen worker")?;
        tracing::debug!(width = size.width, height = size.height, "transferred surface control");
        self.control = Control::Offscreen(Worker {
            tx,
            handle: Some(handle),
        });
        Ok(())
    }

    /// Apply new width/height; clears the pixels.
    pub fn resize(&mut self, width: u32, height: u32) -> BridgeResult<()> {
        let size = CanvasSize::new(width, height)?;
        match &mut self.control {
            Control::Local(surface) => surface.resize(size),
            Control::Offscreen(worker) => worker.send(WorkerMsg::Resize(size))?,
        }
        self.size = size;
        Ok(())
    }

    /// Replace the displayed pixels with a model's frame.
    pub fn present(&mut self, frame: Arc<Bitmap>) -> BridgeResult<()> {
        match &mut self.control {
            Control::Local(surface) => {
                blit(surface, &frame);
                Ok(())
            }
            Control::Offscreen(worker) => worker.send(WorkerMsg::Present(frame)),
        }
    }

    /// Run one command message on whichever thread owns the surface.
    pub fn run(&mut self, message: Value, buffers: Vec<Arc<[u8]>>) -> BridgeResult<BatchReport> {
        match &mut self.control {
            Control::Local(surface) => {
                let exec = CommandExecutor::new(self.renderer);
                Ok(run_on(surface, &exec, &message, &buffers))
            }
            Control::Offscreen(worker) => {
                let (reply, rx) = mpsc::channel();
                worker.send(WorkerMsg::Run {
                    message,
                    buffers,
                    reply,
                })?;
                rx.recv()
                    .map_err(|_| BridgeError::Other(anyhow!("offscreen worker dropped the batch")))
            }
        }
    }

    /// Read back the current pixels.
    pub fn read_pixels(&mut self) -> BridgeResult<Bitmap> {
        match &mut self.control {
            Control::Local(surface) => Ok(surface.read_pixels()),
            Control::Offscreen(worker) => {
                let (reply, rx) = mpsc::channel();
                worker.send(WorkerMsg::Read(reply))?;
                rx.recv()
                    .map_err(|_| BridgeError::Other(anyhow!("offscreen worker did not answer")))
            }
        }
    }
}

impl Worker {
    fn send(&self, msg: WorkerMsg) -> BridgeResult<()> {
        self.tx
            .send(msg)
            .map_err(|_| BridgeError::Other(anyhow!("offscreen worker is not accepting messages")))
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        let (tx, _) = mpsc::channel();
        drop(std::mem::replace(&mut self.tx, tx));
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            tracing::error!("offscreen worker panicked");
        }
    }
}

fn worker_loop(size: CanvasSize, renderer: RendererKind, pixels: &Bitmap, rx: mpsc::Receiver<WorkerMsg>) {
    let mut surface = RasterSurface::new(size);
    surface.put_image_data(pixels, 0, 0);
    let exec = CommandExecutor::new(renderer);
    for msg in rx {
        match msg {
            WorkerMsg::Run {
                message,
                buffers,
                reply,
            } => {
                let report = run_on(&mut surface, &exec, &message, &buffers);
                if reply.send(report).is_err() {
                    tracing::debug!("batch caller went away");
                }
            }
            WorkerMsg::Present(frame) => blit(&mut surface, &frame),
            WorkerMsg::Resize(size) => surface.resize(size),
            WorkerMsg::Read(reply) => {
                if reply.send(surface.read_pixels()).is_err() {
                    tracing::debug!("read-back caller went away");
                }
            }
        }
    }
    tracing::debug!("offscreen worker stopped");
}

fn run_on(
    surface: &mut RasterSurface,
    exec: &CommandExecutor,
    message: &Value,
    buffers: &[Arc<[u8]>],
) -> BatchReport {
    Decoder::default().run_message(message, buffers, |cmd| {
        exec.execute(surface, cmd, &NoResources).map(|_| ())
    })
}

fn blit(surface: &mut RasterSurface, frame: &Bitmap) {
    surface.clear();
    surface.put_image_data(frame, 0, 0);
}

#[cfg(test)]
#[path = "../../tests/unit/bridge/offscreen.rs"]
mod tests;
