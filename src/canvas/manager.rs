use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use serde_json::Value;

use crate::canvas::composite::MultiCanvas;
use crate::canvas::model::{CanvasModel, CanvasOpts, FrameEvent, FrameListener};
use crate::canvas::snapshot::decode_image;
use crate::foundation::core::{Bitmap, CanvasId, CanvasSize};
use crate::foundation::error::{BridgeError, BridgeResult};
use crate::protocol::decode::{BatchReport, DecodeOpts, Decoder, ErrorPolicy};
use crate::render::exec::{Flow, MODEL_REF_PREFIX, ResourceResolver};
use crate::render::surface::{Gradient, Paint, Pattern, Repetition};

/// Options for a [`CanvasManager`].
#[derive(Clone, Copy, Debug, Default)]
pub struct ManagerOpts {
    /// What a failing command does to the rest of its batch.
    pub error_policy: ErrorPolicy,
    /// Block on `sleep` commands on every canvas the manager creates.
    pub honor_sleep: bool,
}

impl ManagerOpts {
    /// Set the batch error policy.
    pub fn with_error_policy(mut self, error_policy: ErrorPolicy) -> Self {
        self.error_policy = error_policy;
        self
    }

    /// Block on `sleep` commands.
    pub fn with_honor_sleep(mut self, honor_sleep: bool) -> Self {
        self.honor_sleep = honor_sleep;
        self
    }
}

/// Receives every command message and routes it to the canvases it owns.
///
/// Commands run against the current target canvas; `switchCanvas` retargets
/// the rest of the batch and every later batch. After each message, every
/// canvas a mutating command touched emits one new-frame notification and
/// every composite containing it is recomposed.
pub struct CanvasManager {
    opts: ManagerOpts,
    decoder: Decoder,
    canvases: BTreeMap<CanvasId, CanvasModel>,
    composites: BTreeMap<CanvasId, MultiCanvas>,
    composite_listeners: Vec<FrameListener>,
    images: HashMap<String, Arc<Bitmap>>,
    paints: HashMap<String, Paint>,
    fonts: Vec<Arc<[u8]>>,
    current: Option<CanvasId>,
}

impl std::fmt::Debug for CanvasManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanvasManager")
            .field("opts", &self.opts)
            .field("canvases", &self.canvases.keys().collect::<Vec<_>>())
            .field("composites", &self.composites.keys().collect::<Vec<_>>())
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

impl Default for CanvasManager {
    fn default() -> Self {
        Self::new(ManagerOpts::default())
    }
}

impl CanvasManager {
    /// Empty manager.
    pub fn new(opts: ManagerOpts) -> Self {
        Self {
            opts,
            decoder: Decoder::new(DecodeOpts::default().with_error_policy(opts.error_policy)),
            canvases: BTreeMap::new(),
            composites: BTreeMap::new(),
            composite_listeners: Vec::new(),
            images: HashMap::new(),
            paints: HashMap::new(),
            fonts: Vec::new(),
            current: None,
        }
    }

    /// Active options.
    pub fn opts(&self) -> &ManagerOpts {
        &self.opts
    }

    /// Create a canvas. The first canvas becomes the command target.
    pub fn create_canvas(&mut self, id: CanvasId, opts: CanvasOpts) -> BridgeResult<()> {
        self.insert_canvas(id, opts, None)
    }

    /// Create a canvas restored from a published snapshot (late join).
    pub fn create_canvas_with_image_data(
        &mut self,
        id: CanvasId,
        opts: CanvasOpts,
        png: &[u8],
    ) -> BridgeResult<()> {
        self.insert_canvas(id, opts, Some(png))
    }

    fn insert_canvas(
        &mut self,
        id: CanvasId,
        mut opts: CanvasOpts,
        png: Option<&[u8]>,
    ) -> BridgeResult<()> {
        if self.canvases.contains_key(&id) || self.composites.contains_key(&id) {
            return Err(BridgeError::validation(format!("canvas '{id}' already exists")));
        }
        opts.honor_sleep |= self.opts.honor_sleep;
        let mut model = match png {
            Some(bytes) => CanvasModel::with_image_data(id.clone(), opts, bytes)?,
            None => CanvasModel::new(id.clone(), opts)?,
        };
        for font in &self.fonts {
            model.register_font(font)?;
        }
        tracing::debug!(canvas = %id, size = ?model.size(), "created canvas");
        self.canvases.insert(id.clone(), model);
        if self.current.is_none() {
            self.current = Some(id);
        }
        Ok(())
    }

    /// Drop a canvas. Composites keep the id and skip it until it returns.
    pub fn remove_canvas(&mut self, id: &CanvasId) -> Option<CanvasModel> {
        if self.current.as_ref() == Some(id) {
            self.current = None;
        }
        self.canvases.remove(id)
    }

    /// Stack existing canvases into one view, bottom layer first.
    pub fn create_multi_canvas(&mut self, id: CanvasId, layers: Vec<CanvasId>) -> BridgeResult<()> {
        if self.canvases.contains_key(&id) || self.composites.contains_key(&id) {
            return Err(BridgeError::validation(format!("canvas '{id}' already exists")));
        }
        let first = layers
            .first()
            .ok_or_else(|| BridgeError::validation("a multi-canvas needs at least one layer"))?;
        let size = self
            .canvases
            .get(first)
            .map(CanvasModel::size)
            .ok_or_else(|| BridgeError::validation(format!("unknown layer '{first}'")))?;
        if let Some(missing) = layers.iter().find(|l| !self.canvases.contains_key(*l)) {
            return Err(BridgeError::validation(format!("unknown layer '{missing}'")));
        }
        let mut multi = MultiCanvas::new(id.clone(), size, layers);
        multi.recompose(&mut self.canvases)?;
        self.composites.insert(id, multi);
        Ok(())
    }

    /// Route subsequent commands to `id`.
    pub fn select(&mut self, id: &CanvasId) -> BridgeResult<()> {
        if !self.canvases.contains_key(id) {
            return Err(BridgeError::validation(format!("unknown canvas '{id}'")));
        }
        self.current = Some(id.clone());
        Ok(())
    }

    /// Current command target.
    pub fn current(&self) -> Option<&CanvasId> {
        self.current.as_ref()
    }

    /// Borrow a canvas.
    pub fn canvas(&self, id: &CanvasId) -> Option<&CanvasModel> {
        self.canvases.get(id)
    }

    /// Mutably borrow a canvas.
    pub fn canvas_mut(&mut self, id: &CanvasId) -> Option<&mut CanvasModel> {
        self.canvases.get_mut(id)
    }

    /// Borrow a composite.
    pub fn multi_canvas(&self, id: &CanvasId) -> Option<&MultiCanvas> {
        self.composites.get(id)
    }

    /// Subscribe to new-frame notifications of one canvas.
    pub fn on_new_frame(
        &mut self,
        id: &CanvasId,
        listener: impl FnMut(&FrameEvent) + Send + 'static,
    ) -> BridgeResult<()> {
        let model = self
            .canvases
            .get_mut(id)
            .ok_or_else(|| BridgeError::validation(format!("unknown canvas '{id}'")))?;
        model.on_new_frame(listener);
        Ok(())
    }

    /// Subscribe to recompositions of any multi-canvas.
    pub fn on_composite_frame(&mut self, listener: impl FnMut(&FrameEvent) + Send + 'static) {
        self.composite_listeners.push(Box::new(listener));
    }

    /// Resize a canvas, or every layer of a multi-canvas.
    pub fn resize(&mut self, id: &CanvasId, width: u32, height: u32) -> BridgeResult<()> {
        let targets = match self.composites.get_mut(id) {
            Some(multi) => {
                multi.set_size(CanvasSize::new(width, height)?);
                multi.layers().to_vec()
            }
            None => vec![id.clone()],
        };
        for target in &targets {
            let model = self
                .canvases
                .get_mut(target)
                .ok_or_else(|| BridgeError::validation(format!("unknown canvas '{target}'")))?;
            model.resize(width, height)?;
        }
        self.recompose_containing(&targets.into_iter().collect());
        Ok(())
    }

    /// Register a gradient under a model id, for `set fillStyle "IPY_MODEL_<id>"`.
    pub fn register_gradient(&mut self, id: impl Into<String>, gradient: Gradient) {
        self.paints
            .insert(id.into(), Paint::Gradient(Arc::new(gradient)));
    }

    /// Register a pattern whose source is a canvas, multi-canvas or image model.
    ///
    /// Fails with [`BridgeError::UnsupportedPatternSource`] when `source`
    /// names none of them.
    pub fn register_pattern(
        &mut self,
        id: impl Into<String>,
        source: &str,
        repetition: &str,
    ) -> BridgeResult<()> {
        let repetition = Repetition::parse(repetition)?;
        let key = source.strip_prefix(MODEL_REF_PREFIX).unwrap_or(source);
        let canvas_id = CanvasId::new(key);
        let image = if let Some(model) = self.canvases.get_mut(&canvas_id) {
            model.image_source()
        } else if let Some(multi) = self.composites.get(&canvas_id) {
            Arc::new(multi.pixels())
        } else if let Some(image) = self.images.get(key) {
            Arc::clone(image)
        } else {
            return Err(BridgeError::unsupported_pattern_source(format!(
                "'{source}' is not a canvas or image model"
            )));
        };
        self.paints.insert(
            id.into(),
            Paint::Pattern(Arc::new(Pattern { image, repetition })),
        );
        Ok(())
    }

    /// Register an image model from encoded bytes.
    pub fn register_image(&mut self, id: impl Into<String>, bytes: &[u8]) -> BridgeResult<()> {
        let bitmap = decode_image(bytes)?;
        self.images.insert(id.into(), Arc::new(bitmap));
        Ok(())
    }

    /// Register an image model from pixels.
    pub fn register_bitmap(&mut self, id: impl Into<String>, bitmap: Bitmap) {
        self.images.insert(id.into(), Arc::new(bitmap));
    }

    /// Make a font available on every current and future canvas.
    pub fn register_font(&mut self, bytes: &[u8]) -> BridgeResult<()> {
        for model in self.canvases.values_mut() {
            model.register_font(bytes)?;
        }
        self.fonts.push(Arc::from(bytes));
        Ok(())
    }

    /// Decode and run one widget message.
    #[tracing::instrument(skip_all, fields(buffers = buffers.len()))]
    pub fn handle_message(&mut self, message: &Value, buffers: &[Arc<[u8]>]) -> BatchReport {
        let Self {
            decoder,
            canvases,
            images,
            paints,
            current,
            ..
        } = self;
        let mut touched = BTreeSet::new();

        let report = decoder.run_message(message, buffers, |cmd| {
            let target = current
                .clone()
                .ok_or_else(|| BridgeError::protocol("no canvas selected"))?;
            let mut model = canvases
                .remove(&target)
                .ok_or_else(|| BridgeError::protocol(format!("unknown canvas '{target}'")))?;
            let out = {
                let res = Resources {
                    canvases: RefCell::new(&mut *canvases),
                    images: &*images,
                    paints: &*paints,
                };
                model.execute(cmd, &res)
            };
            canvases.insert(target.clone(), model);
            match out? {
                Flow::Continue => {
                    if cmd.opcode.is_mutating() {
                        touched.insert(target);
                    }
                }
                Flow::SwitchCanvas(next) => {
                    if !canvases.contains_key(&next) {
                        return Err(BridgeError::protocol(format!(
                            "switchCanvas to unknown canvas '{next}'"
                        )));
                    }
                    tracing::trace!(from = %target, to = %next, "switching canvas");
                    *current = Some(next);
                }
            }
            Ok(())
        });

        for id in &touched {
            if let Some(model) = self.canvases.get_mut(id)
                && let Err(error) = model.new_frame()
            {
                tracing::warn!(canvas = %id, %error, "new-frame notification failed");
            }
        }
        self.recompose_containing(&touched);
        report
    }

    fn recompose_containing(&mut self, touched: &BTreeSet<CanvasId>) {
        for multi in self.composites.values_mut() {
            if !touched.iter().any(|id| multi.contains(id)) {
                continue;
            }
            if let Err(error) = multi.recompose(&mut self.canvases) {
                tracing::warn!(composite = %multi.id(), %error, "recompose failed");
                continue;
            }
            let event = FrameEvent {
                canvas: multi.id().clone(),
                generation: multi.generation(),
                size: multi.size(),
            };
            for listener in &mut self.composite_listeners {
                listener(&event);
            }
        }
    }
}

/// Resolver over the manager's registries, with the executing canvas taken out.
struct Resources<'a> {
    canvases: RefCell<&'a mut BTreeMap<CanvasId, CanvasModel>>,
    images: &'a HashMap<String, Arc<Bitmap>>,
    paints: &'a HashMap<String, Paint>,
}

impl ResourceResolver for Resources<'_> {
    fn paint(&self, id: &str) -> BridgeResult<Paint> {
        self.paints
            .get(id)
            .cloned()
            .ok_or_else(|| BridgeError::resource(format!("no gradient or pattern '{id}'")))
    }

    fn image(&self, id: &str) -> BridgeResult<Arc<Bitmap>> {
        if let Some(image) = self.images.get(id) {
            return Ok(Arc::clone(image));
        }
        self.canvases
            .borrow_mut()
            .get_mut(&CanvasId::new(id))
            .map(CanvasModel::image_source)
            .ok_or_else(|| BridgeError::resource(format!("no canvas or image model '{id}'")))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/canvas/manager.rs"]
mod tests;
