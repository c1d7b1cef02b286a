use std::sync::Arc;

use crate::canvas::snapshot::{Snapshot, decode_image, encode_png};
use crate::foundation::core::{Bitmap, CanvasId, CanvasSize};
use crate::foundation::error::BridgeResult;
use crate::protocol::decode::Command;
use crate::render::exec::{CommandExecutor, Flow, ResourceResolver};
use crate::render::primitives::RendererKind;
use crate::render::raster::RasterSurface;
use crate::render::surface::DrawingSurface;

/// Options for one canvas model.
#[derive(Clone, Debug)]
pub struct CanvasOpts {
    /// Backing-store width in pixels.
    pub width: u32,
    /// Backing-store height in pixels.
    pub height: u32,
    /// Re-encode and publish a snapshot after every mutating batch.
    pub sync_image_data: bool,
    /// Primitive drawing strategy.
    pub renderer: RendererKind,
    /// Block on `sleep` commands instead of skipping them.
    pub honor_sleep: bool,
}

impl Default for CanvasOpts {
    fn default() -> Self {
        let size = CanvasSize::default();
        Self {
            width: size.width,
            height: size.height,
            sync_image_data: false,
            renderer: RendererKind::Standard,
            honor_sleep: false,
        }
    }
}

impl CanvasOpts {
    /// Set the backing-store size.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Enable or disable snapshot publication.
    pub fn with_sync_image_data(mut self, sync_image_data: bool) -> Self {
        self.sync_image_data = sync_image_data;
        self
    }

    /// Choose the primitive drawing strategy.
    pub fn with_renderer(mut self, renderer: RendererKind) -> Self {
        self.renderer = renderer;
        self
    }

    /// Block on `sleep` commands.
    pub fn with_honor_sleep(mut self, honor_sleep: bool) -> Self {
        self.honor_sleep = honor_sleep;
        self
    }
}

/// Payload of a new-frame notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameEvent {
    /// Canvas whose pixels changed.
    pub canvas: CanvasId,
    /// Monotonic frame counter of that canvas.
    pub generation: u64,
    /// Current backing-store size.
    pub size: CanvasSize,
}

/// Callback run on every new-frame notification.
pub type FrameListener = Box<dyn FnMut(&FrameEvent) + Send>;

/// One remotely driven canvas: a raster surface plus its frame bookkeeping.
pub struct CanvasModel {
    id: CanvasId,
    surface: RasterSurface,
    executor: CommandExecutor,
    sync_image_data: bool,
    generation: u64,
    listeners: Vec<FrameListener>,
    image_data: Option<Snapshot>,
}

impl std::fmt::Debug for CanvasModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanvasModel")
            .field("id", &self.id)
            .field("size", &self.surface.size())
            .field("generation", &self.generation)
            .field("sync_image_data", &self.sync_image_data)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl CanvasModel {
    /// Create a transparent canvas.
    pub fn new(id: CanvasId, opts: CanvasOpts) -> BridgeResult<Self> {
        let size = CanvasSize::new(opts.width, opts.height)?;
        Ok(Self {
            id,
            surface: RasterSurface::new(size),
            executor: CommandExecutor::new(opts.renderer).with_honor_sleep(opts.honor_sleep),
            sync_image_data: opts.sync_image_data,
            generation: 0,
            listeners: Vec::new(),
            image_data: None,
        })
    }

    /// Create a canvas that starts from a previously published snapshot.
    ///
    /// The snapshot is drawn at the origin before any command runs; a
    /// snapshot larger than the canvas is cropped.
    pub fn with_image_data(id: CanvasId, opts: CanvasOpts, png: &[u8]) -> BridgeResult<Self> {
        let mut model = Self::new(id, opts)?;
        model.restore_from_bytes(png)?;
        Ok(model)
    }

    /// Canvas identity.
    pub fn id(&self) -> &CanvasId {
        &self.id
    }

    /// Current backing-store size.
    pub fn size(&self) -> CanvasSize {
        self.surface.size()
    }

    /// Frames emitted so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Last published snapshot (sync mode only).
    pub fn image_data(&self) -> Option<&Snapshot> {
        self.image_data.as_ref()
    }

    /// Subscribe to new-frame notifications.
    pub fn on_new_frame(&mut self, listener: impl FnMut(&FrameEvent) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Make a font available for text commands; returns its family name.
    pub fn register_font(&mut self, bytes: &[u8]) -> BridgeResult<String> {
        self.surface.register_font(bytes)
    }

    /// Run one decoded command against this canvas.
    pub fn execute(&mut self, cmd: &Command, res: &dyn ResourceResolver) -> BridgeResult<Flow> {
        self.executor.execute(&mut self.surface, cmd, res)
    }

    /// Apply new width/height attributes.
    ///
    /// Resizing discards all pixels and drawing state; nothing is repainted.
    pub fn resize(&mut self, width: u32, height: u32) -> BridgeResult<()> {
        let size = CanvasSize::new(width, height)?;
        if size == self.surface.size() {
            return Ok(());
        }
        tracing::debug!(canvas = %self.id, width, height, "resizing canvas");
        self.surface.resize(size);
        self.new_frame()
    }

    /// Wipe to transparent and notify.
    pub fn clear(&mut self) -> BridgeResult<()> {
        self.surface.clear();
        self.new_frame()
    }

    /// Straight RGBA8 copy of the current pixels.
    pub fn pixels(&mut self) -> Bitmap {
        self.surface.read_pixels()
    }

    /// Premultiplied RGBA8 view of the current pixels.
    pub fn premultiplied(&mut self) -> &[u8] {
        self.surface.premultiplied()
    }

    /// Encode the current pixels as PNG.
    pub fn snapshot_bytes(&mut self) -> BridgeResult<Vec<u8>> {
        encode_png(&self.surface.read_pixels())
    }

    /// Decode a snapshot and write it at the origin.
    ///
    /// The write is exact: it ignores transform, alpha, clip and composite
    /// state, so restoring onto a cleared canvas reproduces the encoded pixels.
    pub fn restore_from_bytes(&mut self, bytes: &[u8]) -> BridgeResult<()> {
        let bitmap = decode_image(bytes)?;
        self.surface.put_image_data(&bitmap, 0, 0);
        Ok(())
    }

    /// Emit a new-frame notification after a mutating batch.
    ///
    /// In sync mode the snapshot is re-encoded first; an unchanged frame
    /// keeps the previous encoding.
    pub fn new_frame(&mut self) -> BridgeResult<()> {
        self.generation += 1;
        if self.sync_image_data {
            self.publish_image_data()?;
        }
        let event = FrameEvent {
            canvas: self.id.clone(),
            generation: self.generation,
            size: self.surface.size(),
        };
        for listener in &mut self.listeners {
            listener(&event);
        }
        Ok(())
    }

    fn publish_image_data(&mut self) -> BridgeResult<()> {
        let pixels = self.surface.read_pixels();
        let fp = crate::canvas::snapshot::fingerprint(&pixels);
        if self.image_data.as_ref().is_some_and(|s| s.fingerprint == fp) {
            tracing::trace!(canvas = %self.id, "snapshot unchanged");
            return Ok(());
        }
        let snap = Snapshot::encode(&pixels)?;
        tracing::debug!(canvas = %self.id, bytes = snap.png.len(), "published snapshot");
        self.image_data = Some(snap);
        Ok(())
    }

    /// Shared copy of the current pixels, for use as an image source.
    pub(crate) fn image_source(&mut self) -> Arc<Bitmap> {
        Arc::new(self.surface.read_pixels())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/canvas/model.rs"]
mod tests;
