use crate::foundation::error::{BridgeError, BridgeResult};

pub use kurbo::{Affine, BezPath, Point, Rect, Vec2};

/// Identity of a canvas model inside a [`crate::CanvasManager`].
#[derive(
    Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct CanvasId(pub String);

impl CanvasId {
    /// Create an id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CanvasId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Backing-store dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CanvasSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl CanvasSize {
    /// Create a validated size. Both dimensions must be in `1..=u16::MAX`.
    pub fn new(width: u32, height: u32) -> BridgeResult<Self> {
        if width == 0 || height == 0 {
            return Err(BridgeError::validation("canvas size must be non-zero"));
        }
        if width > u32::from(u16::MAX) || height > u32::from(u16::MAX) {
            return Err(BridgeError::validation(format!(
                "canvas size {width}x{height} exceeds {}",
                u16::MAX
            )));
        }
        Ok(Self { width, height })
    }

    /// Number of pixels covered by this size.
    pub fn pixel_count(self) -> usize {
        (self.width as usize).saturating_mul(self.height as usize)
    }
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self {
            width: 700,
            height: 500,
        }
    }
}

/// Straight-alpha RGBA8 pixel block, row-major, tightly packed.
///
/// This is the image-data exchange format: `putImageData` inputs, `drawImage`
/// sources, surface read-back and decoded snapshots all use it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bitmap {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Straight (non-premultiplied) RGBA8 bytes.
    pub data: Vec<u8>,
}

impl Bitmap {
    /// Fully transparent bitmap of the given size.
    pub fn transparent(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; (width as usize) * (height as usize) * 4],
        }
    }

    /// Wrap RGBA8 bytes, checking the length against the dimensions.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> BridgeResult<Self> {
        let expected = (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4);
        if data.len() != expected {
            return Err(BridgeError::validation(format!(
                "rgba byte len {} does not match {width}x{height}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Expand 1 (gray), 3 (rgb) or 4 (rgba) channel pixels into RGBA8.
    pub fn from_channels(width: u32, height: u32, channels: u32, src: &[u8]) -> BridgeResult<Self> {
        let px = (width as usize).saturating_mul(height as usize);
        if src.len() != px.saturating_mul(channels as usize) {
            return Err(BridgeError::validation(format!(
                "pixel buffer of {} bytes does not match {width}x{height}x{channels}",
                src.len()
            )));
        }
        let data = match channels {
            4 => src.to_vec(),
            3 => src
                .chunks_exact(3)
                .flat_map(|p| [p[0], p[1], p[2], 255])
                .collect(),
            1 => src.iter().flat_map(|&v| [v, v, v, 255]).collect(),
            other => {
                return Err(BridgeError::validation(format!(
                    "unsupported channel count {other}"
                )));
            }
        };
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// RGBA8 value at `(x, y)`, or `None` when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }
}

/// Convert straight RGBA8 bytes into premultiplied RGBA8 in place.
pub(crate) fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

/// Convert premultiplied RGBA8 bytes back to straight RGBA8 in place.
pub(crate) fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 || a == 255 {
            continue;
        }
        let un = |c: u8| -> u8 { ((c as u16 * 255 + a / 2) / a).min(255) as u8 };
        px[0] = un(px[0]);
        px[1] = un(px[1]);
        px[2] = un(px[2]);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
