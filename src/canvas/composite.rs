use std::collections::BTreeMap;

use crate::canvas::model::CanvasModel;
use crate::foundation::core::{Bitmap, CanvasId, CanvasSize, unpremultiply_rgba8_in_place};
use crate::foundation::error::BridgeResult;
use crate::render::composite::{over, over_in_place};

/// Ordered stack of canvases shown as one view.
///
/// Layer 0 is at the bottom. The stack owns only its derived buffer; layers
/// are read, never written, while recomposing.
#[derive(Clone, Debug)]
pub struct MultiCanvas {
    id: CanvasId,
    size: CanvasSize,
    layers: Vec<CanvasId>,
    composed: Vec<u8>,
    generation: u64,
}

impl MultiCanvas {
    /// Empty composite of the given size.
    pub fn new(id: CanvasId, size: CanvasSize, layers: Vec<CanvasId>) -> Self {
        Self {
            id,
            size,
            layers,
            composed: vec![0; size.pixel_count() * 4],
            generation: 0,
        }
    }

    /// Composite identity.
    pub fn id(&self) -> &CanvasId {
        &self.id
    }

    /// Layer ids, bottom first.
    pub fn layers(&self) -> &[CanvasId] {
        &self.layers
    }

    /// Output size.
    pub fn size(&self) -> CanvasSize {
        self.size
    }

    /// Times the composite was rebuilt.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// `true` when `canvas` is one of the layers.
    pub fn contains(&self, canvas: &CanvasId) -> bool {
        self.layers.contains(canvas)
    }

    pub(crate) fn set_size(&mut self, size: CanvasSize) {
        self.size = size;
        self.composed = vec![0; size.pixel_count() * 4];
    }

    /// Rebuild the composite from the current layer pixels.
    ///
    /// Missing layers are skipped. A layer whose size differs from the stack
    /// contributes only its overlap with the top-left corner.
    pub fn recompose(&mut self, canvases: &mut BTreeMap<CanvasId, CanvasModel>) -> BridgeResult<()> {
        self.composed.fill(0);
        for id in &self.layers {
            let Some(layer) = canvases.get_mut(id) else {
                tracing::debug!(layer = %id, composite = %self.id, "skipping missing layer");
                continue;
            };
            let layer_size = layer.size();
            let src = layer.premultiplied();
            if layer_size == self.size {
                over_in_place(&mut self.composed, src, 1.0)?;
            } else {
                over_overlap(&mut self.composed, self.size, src, layer_size);
            }
        }
        self.generation += 1;
        Ok(())
    }

    /// Straight RGBA8 copy of the composite.
    pub fn pixels(&self) -> Bitmap {
        let mut data = self.composed.clone();
        unpremultiply_rgba8_in_place(&mut data);
        Bitmap {
            width: self.size.width,
            height: self.size.height,
            data,
        }
    }
}

fn over_overlap(dst: &mut [u8], dst_size: CanvasSize, src: &[u8], src_size: CanvasSize) {
    let w = dst_size.width.min(src_size.width) as usize;
    let h = dst_size.height.min(src_size.height) as usize;
    let (dw, sw) = (dst_size.width as usize, src_size.width as usize);
    for y in 0..h {
        let d_row = &mut dst[y * dw * 4..(y * dw + w) * 4];
        let s_row = &src[y * sw * 4..(y * sw + w) * 4];
        for (d, s) in d_row.chunks_exact_mut(4).zip(s_row.chunks_exact(4)) {
            let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]], 1.0);
            d.copy_from_slice(&out);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/canvas/composite.rs"]
mod tests;
