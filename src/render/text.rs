use std::borrow::Cow;

use crate::foundation::error::{BridgeError, BridgeResult};

const DEFAULT_SIZE_PX: f32 = 10.0;

/// Parsed subset of a CSS `font` shorthand: size and family list.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct FontSpec {
    pub(crate) size_px: f32,
    pub(crate) families: Vec<String>,
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            size_px: DEFAULT_SIZE_PX,
            families: vec!["sans-serif".to_owned()],
        }
    }
}

impl FontSpec {
    /// Parse `"[style] [weight] <size>[/<line-height>] <family>[, <family>]*"`.
    ///
    /// Style and weight keywords are accepted and ignored. Unparsable input
    /// yields `None`, which callers treat as "keep the previous font".
    pub(crate) fn parse(css: &str) -> Option<Self> {
        let mut tokens = css.split_whitespace();
        let mut size_px = None;
        for tok in tokens.by_ref() {
            let size = tok.split('/').next().unwrap_or(tok);
            if let Some(px) = parse_length(size) {
                size_px = Some(px);
                break;
            }
        }
        let size_px = size_px?;
        let rest = tokens.collect::<Vec<_>>().join(" ");
        let families: Vec<String> = rest
            .split(',')
            .map(|f| f.trim().trim_matches(|c| c == '"' || c == '\'').to_owned())
            .filter(|f| !f.is_empty())
            .collect();
        if families.is_empty() {
            return None;
        }
        Some(Self { size_px, families })
    }
}

fn parse_length(tok: &str) -> Option<f32> {
    let (num, scale) = if let Some(v) = tok.strip_suffix("px") {
        (v, 1.0)
    } else if let Some(v) = tok.strip_suffix("pt") {
        (v, 4.0 / 3.0)
    } else if let Some(v) = tok.strip_suffix("em") {
        (v, DEFAULT_SIZE_PX)
    } else {
        return None;
    };
    let v: f32 = num.parse().ok()?;
    (v.is_finite() && v > 0.0).then_some(v * scale)
}

#[derive(Clone)]
struct FontFace {
    family: String,
    data: vello_cpu::peniko::FontData,
}

/// Laid-out single line of text plus the font its glyphs index into.
pub(crate) struct ShapedText {
    pub(crate) layout: parley::Layout<()>,
    pub(crate) font: vello_cpu::peniko::FontData,
    pub(crate) width: f32,
    pub(crate) baseline: f32,
    pub(crate) ascent: f32,
    pub(crate) descent: f32,
}

/// Shapes canvas text with parley against explicitly registered fonts.
///
/// No system fonts are consulted: a surface without registered fonts cannot
/// draw text.
pub(crate) struct TextEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<()>,
    faces: Vec<FontFace>,
}

impl Default for TextEngine {
    fn default() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
            faces: Vec::new(),
        }
    }
}

impl TextEngine {
    /// Register font bytes and return the family name they provide.
    pub(crate) fn register_font(&mut self, bytes: &[u8]) -> BridgeResult<String> {
        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(bytes.to_vec()), None);
        let family_id = families
            .first()
            .map(|(id, _)| *id)
            .ok_or_else(|| BridgeError::resource("no font families in font bytes"))?;
        let family = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| BridgeError::resource("registered font family has no name"))?
            .to_string();
        let data =
            vello_cpu::peniko::FontData::new(vello_cpu::peniko::Blob::from(bytes.to_vec()), 0);
        tracing::debug!(family = %family, "registered font");
        self.faces.push(FontFace {
            family: family.clone(),
            data,
        });
        Ok(family)
    }

    pub(crate) fn has_fonts(&self) -> bool {
        !self.faces.is_empty()
    }

    /// First registered face matching the requested families, falling back
    /// to the first registered face for generic or unknown families.
    fn pick(&self, spec: &FontSpec) -> Option<&FontFace> {
        spec.families
            .iter()
            .find_map(|want| {
                self.faces
                    .iter()
                    .find(|f| f.family.eq_ignore_ascii_case(want))
            })
            .or_else(|| self.faces.first())
    }

    /// Shape `text` on a single line. `Ok(None)` when no font is registered.
    pub(crate) fn shape(&mut self, text: &str, spec: &FontSpec) -> BridgeResult<Option<ShapedText>> {
        if !spec.size_px.is_finite() || spec.size_px <= 0.0 {
            return Err(BridgeError::validation("font size must be finite and > 0"));
        }
        let Some(face) = self.pick(spec).cloned() else {
            return Ok(None);
        };

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(Cow::Owned(face.family.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(spec.size_px));
        let mut layout: parley::Layout<()> = builder.build(text);
        layout.break_all_lines(None);

        let (baseline, ascent, descent) = layout
            .lines()
            .next()
            .map(|l| {
                let m = l.metrics();
                (m.baseline, m.ascent, m.descent)
            })
            .unwrap_or((spec.size_px, spec.size_px * 0.8, spec.size_px * 0.2));
        let width = layout.width();
        Ok(Some(ShapedText {
            layout,
            font: face.data,
            width,
            baseline,
            ascent,
            descent,
        }))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/text.rs"]
mod tests;
