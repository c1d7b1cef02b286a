use std::io::Cursor;
use std::sync::Arc;

use anyhow::Context;
use xxhash_rust::xxh3::Xxh3;

use crate::foundation::core::Bitmap;
use crate::foundation::error::{BridgeError, BridgeResult};

const XXH3_SEED: u64 = 0x5c1a_9d3e_0b47_f261;

/// Portable encoded raster state of one canvas.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    /// Width of the encoded image.
    pub width: u32,
    /// Height of the encoded image.
    pub height: u32,
    /// PNG bytes.
    pub png: Arc<[u8]>,
    /// Hash of the raw pixels the PNG was made from.
    pub fingerprint: u64,
}

impl Snapshot {
    /// Encode a bitmap.
    pub fn encode(bitmap: &Bitmap) -> BridgeResult<Self> {
        Ok(Self {
            width: bitmap.width,
            height: bitmap.height,
            png: encode_png(bitmap)?.into(),
            fingerprint: fingerprint(bitmap),
        })
    }

    /// Decode back into straight RGBA8.
    pub fn decode(&self) -> BridgeResult<Bitmap> {
        decode_image(&self.png)
    }
}

/// Encode straight RGBA8 pixels as PNG.
pub fn encode_png(bitmap: &Bitmap) -> BridgeResult<Vec<u8>> {
    let img = image::RgbaImage::from_raw(bitmap.width, bitmap.height, bitmap.data.clone())
        .ok_or_else(|| BridgeError::validation("bitmap byte len does not match its size"))?;
    let mut out = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
        .context("encode png snapshot")?;
    Ok(out)
}

/// Decode any image format `image` understands into straight RGBA8.
///
/// Decode failures are resource errors: the source could not be resolved
/// into pixels.
pub fn decode_image(bytes: &[u8]) -> BridgeResult<Bitmap> {
    let decoded = image::load_from_memory(bytes)
        .context("decode image from memory")
        .map_err(|e| BridgeError::resource(format!("{e:#}")))?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    Bitmap::from_rgba(width, height, rgba.into_raw())
}

/// Stable hash of a bitmap's size and pixels.
pub fn fingerprint(bitmap: &Bitmap) -> u64 {
    let mut h = Xxh3::with_seed(XXH3_SEED);
    h.update(&bitmap.width.to_le_bytes());
    h.update(&bitmap.height.to_le_bytes());
    h.update(&bitmap.data);
    h.digest()
}

#[cfg(test)]
#[path = "../../tests/unit/canvas/snapshot.rs"]
mod tests;
