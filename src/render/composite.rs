use crate::foundation::error::{BridgeError, BridgeResult};
use crate::foundation::math::mul_div255_u8;
use crate::render::surface::CompositeOp;

/// Premultiplied RGBA8 pixel.
pub(crate) type PremulRgba8 = [u8; 4];

/// Source-over with an extra opacity factor applied to `src`.
pub(crate) fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }
    let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255_u8(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }
    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = sa.saturating_add(mul_div255_u8(u16::from(dst[3]), inv));
    for i in 0..3 {
        let sc = mul_div255_u8(u16::from(src[i]), op);
        let dc = mul_div255_u8(u16::from(dst[i]), inv);
        out[i] = sc.saturating_add(dc);
    }
    out
}

/// Source-over of a whole premultiplied buffer onto another of the same size.
pub(crate) fn over_in_place(dst: &mut [u8], src: &[u8], opacity: f32) -> BridgeResult<()> {
    check_lengths(dst, src)?;
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]], opacity);
        d.copy_from_slice(&out);
    }
    Ok(())
}

/// Composite `src` onto `dst` with a Canvas2D composite operation.
///
/// The operation is applied to every pixel, including those `src` leaves
/// transparent, so `copy` and the `*-in` family erase outside the source.
/// `mask` (one coverage byte per pixel) limits the effect to a clip region.
pub(crate) fn composite_in_place(
    op: CompositeOp,
    dst: &mut [u8],
    src: &[u8],
    mask: Option<&[u8]>,
) -> BridgeResult<()> {
    check_lengths(dst, src)?;
    if let Some(m) = mask
        && m.len() * 4 != dst.len()
    {
        return Err(BridgeError::validation(
            "composite mask does not match the pixel buffer",
        ));
    }
    for (i, (d, s)) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)).enumerate() {
        let coverage = mask.map_or(255, |m| m[i]);
        if coverage == 0 {
            continue;
        }
        let before = [d[0], d[1], d[2], d[3]];
        let after = composite_px(op, before, [s[0], s[1], s[2], s[3]]);
        let out = if coverage == 255 {
            after
        } else {
            lerp_px(before, after, coverage)
        };
        d.copy_from_slice(&out);
    }
    Ok(())
}

/// Scale destination pixels by the inverse of a coverage mask.
pub(crate) fn erase_in_place(dst: &mut [u8], mask: &[u8]) -> BridgeResult<()> {
    if mask.len() * 4 != dst.len() {
        return Err(BridgeError::validation(
            "erase mask does not match the pixel buffer",
        ));
    }
    for (d, &m) in dst.chunks_exact_mut(4).zip(mask) {
        let keep = 255 - u16::from(m);
        for c in d.iter_mut() {
            *c = mul_div255_u8(u16::from(*c), keep);
        }
    }
    Ok(())
}

fn check_lengths(dst: &[u8], src: &[u8]) -> BridgeResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(BridgeError::validation(
            "compositing expects equal-length rgba8 buffers",
        ));
    }
    Ok(())
}

fn lerp_px(a: PremulRgba8, b: PremulRgba8, t: u8) -> PremulRgba8 {
    let t = u16::from(t);
    let inv = 255 - t;
    let mut out = [0u8; 4];
    for i in 0..4 {
        out[i] = mul_div255_u8(u16::from(a[i]), inv).saturating_add(mul_div255_u8(u16::from(b[i]), t));
    }
    out
}

fn composite_px(op: CompositeOp, dst: PremulRgba8, src: PremulRgba8) -> PremulRgba8 {
    if op == CompositeOp::SourceOver {
        return over(dst, src, 1.0);
    }
    let s = to_unit(src);
    let d = to_unit(dst);
    let (sa, da) = (s[3], d[3]);

    let porter_duff = |fa: f64, fb: f64| -> [f64; 4] {
        [
            s[0] * fa + d[0] * fb,
            s[1] * fa + d[1] * fb,
            s[2] * fa + d[2] * fb,
            sa * fa + da * fb,
        ]
    };

    let out = match op {
        CompositeOp::SourceOver => porter_duff(1.0, 1.0 - sa),
        CompositeOp::SourceIn => porter_duff(da, 0.0),
        CompositeOp::SourceOut => porter_duff(1.0 - da, 0.0),
        CompositeOp::SourceAtop => porter_duff(da, 1.0 - sa),
        CompositeOp::DestinationOver => porter_duff(1.0 - da, 1.0),
        CompositeOp::DestinationIn => porter_duff(0.0, sa),
        CompositeOp::DestinationOut => porter_duff(0.0, 1.0 - sa),
        CompositeOp::DestinationAtop => porter_duff(1.0 - da, sa),
        CompositeOp::Lighter => porter_duff(1.0, 1.0),
        CompositeOp::Copy => porter_duff(1.0, 0.0),
        CompositeOp::Xor => porter_duff(1.0 - da, 1.0 - sa),
        blend => blend_px(blend, s, d),
    };
    from_unit(out)
}

/// W3C compositing: separable and non-separable blend modes followed by source-over.
fn blend_px(op: CompositeOp, s: [f64; 4], d: [f64; 4]) -> [f64; 4] {
    let (sa, da) = (s[3], d[3]);
    let cs = unpremul(s);
    let cb = unpremul(d);

    let mixed: [f64; 3] = match op {
        CompositeOp::Hue => set_lum(set_sat(cs, sat(cb)), lum(cb)),
        CompositeOp::Saturation => set_lum(set_sat(cb, sat(cs)), lum(cb)),
        CompositeOp::Color => set_lum(cs, lum(cb)),
        CompositeOp::Luminosity => set_lum(cb, lum(cs)),
        _ => [0, 1, 2].map(|i| separable(op, cb[i], cs[i])),
    };

    let mut out = [0.0; 4];
    for i in 0..3 {
        out[i] = (1.0 - da) * s[i] + (1.0 - sa) * d[i] + sa * da * mixed[i];
    }
    out[3] = sa + da - sa * da;
    out
}

fn separable(op: CompositeOp, cb: f64, cs: f64) -> f64 {
    match op {
        CompositeOp::Multiply => cb * cs,
        CompositeOp::Screen => cb + cs - cb * cs,
        CompositeOp::Overlay => hard_light(cs, cb),
        CompositeOp::Darken => cb.min(cs),
        CompositeOp::Lighten => cb.max(cs),
        CompositeOp::ColorDodge => {
            if cb == 0.0 {
                0.0
            } else if cs >= 1.0 {
                1.0
            } else {
                (cb / (1.0 - cs)).min(1.0)
            }
        }
        CompositeOp::ColorBurn => {
            if cb >= 1.0 {
                1.0
            } else if cs <= 0.0 {
                0.0
            } else {
                1.0 - ((1.0 - cb) / cs).min(1.0)
            }
        }
        CompositeOp::HardLight => hard_light(cb, cs),
        CompositeOp::SoftLight => {
            if cs <= 0.5 {
                cb - (1.0 - 2.0 * cs) * cb * (1.0 - cb)
            } else {
                let dd = if cb <= 0.25 {
                    ((16.0 * cb - 12.0) * cb + 4.0) * cb
                } else {
                    cb.sqrt()
                };
                cb + (2.0 * cs - 1.0) * (dd - cb)
            }
        }
        CompositeOp::Difference => (cb - cs).abs(),
        CompositeOp::Exclusion => cb + cs - 2.0 * cb * cs,
        _ => cs,
    }
}

fn hard_light(cb: f64, cs: f64) -> f64 {
    if cs <= 0.5 {
        cb * 2.0 * cs
    } else {
        let s2 = 2.0 * cs - 1.0;
        cb + s2 - cb * s2
    }
}

fn lum(c: [f64; 3]) -> f64 {
    0.3 * c[0] + 0.59 * c[1] + 0.11 * c[2]
}

fn clip_color(c: [f64; 3]) -> [f64; 3] {
    let l = lum(c);
    let n = c[0].min(c[1]).min(c[2]);
    let x = c[0].max(c[1]).max(c[2]);
    c.map(|v| {
        let mut v = v;
        if n < 0.0 && l - n > f64::EPSILON {
            v = l + (v - l) * l / (l - n);
        }
        if x > 1.0 && x - l > f64::EPSILON {
            v = l + (v - l) * (1.0 - l) / (x - l);
        }
        v
    })
}

fn set_lum(c: [f64; 3], l: f64) -> [f64; 3] {
    let d = l - lum(c);
    clip_color(c.map(|v| v + d))
}

fn sat(c: [f64; 3]) -> f64 {
    c[0].max(c[1]).max(c[2]) - c[0].min(c[1]).min(c[2])
}

fn set_sat(c: [f64; 3], s: f64) -> [f64; 3] {
    let mut idx = [0usize, 1, 2];
    idx.sort_by(|&a, &b| c[a].total_cmp(&c[b]));
    let [lo, mid, hi] = idx;
    let mut out = [0.0; 3];
    if c[hi] > c[lo] {
        out[mid] = (c[mid] - c[lo]) * s / (c[hi] - c[lo]);
        out[hi] = s;
    }
    out
}

fn to_unit(px: PremulRgba8) -> [f64; 4] {
    px.map(|v| f64::from(v) / 255.0)
}

fn from_unit(px: [f64; 4]) -> PremulRgba8 {
    let a = px[3].clamp(0.0, 1.0);
    let mut out = [0u8; 4];
    for i in 0..3 {
        out[i] = (px[i].clamp(0.0, a) * 255.0).round() as u8;
    }
    out[3] = (a * 255.0).round() as u8;
    out
}

fn unpremul(px: [f64; 4]) -> [f64; 3] {
    if px[3] <= 0.0 {
        return [0.0; 3];
    }
    [px[0] / px[3], px[1] / px[3], px[2] / px[3]].map(|v| v.clamp(0.0, 1.0))
}

#[cfg(test)]
#[path = "../../tests/unit/render/composite.rs"]
mod tests;
