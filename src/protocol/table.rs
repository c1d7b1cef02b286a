use crate::foundation::error::{BridgeError, BridgeResult};

/// Wire vocabulary. The discriminant of each variant IS its opcode.
///
/// The table is append-only: new operations go at the end, and existing
/// entries are never reordered or removed, otherwise every serialized command
/// stream with a higher opcode changes meaning.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Opcode {
    FillRect = 0,
    StrokeRect,
    FillRects,
    StrokeRects,
    ClearRect,
    FillArc,
    FillCircle,
    StrokeArc,
    StrokeCircle,
    FillArcs,
    StrokeArcs,
    FillCircles,
    StrokeCircles,
    StrokeLine,
    BeginPath,
    ClosePath,
    Stroke,
    Fill,
    MoveTo,
    LineTo,
    Rect,
    Arc,
    Ellipse,
    ArcTo,
    QuadraticCurveTo,
    BezierCurveTo,
    FillText,
    StrokeText,
    SetLineDash,
    DrawImage,
    PutImageData,
    Clip,
    Save,
    Restore,
    Translate,
    Rotate,
    Scale,
    Transform,
    SetTransform,
    ResetTransform,
    Set,
    Clear,
    Sleep,
    FillPolygon,
    StrokePolygon,
    StrokeLines,
    FillPolygons,
    StrokePolygons,
    StrokeLineSegments,
    FillStyledRects,
    StrokeStyledRects,
    FillStyledCircles,
    StrokeStyledCircles,
    FillStyledArcs,
    StrokeStyledArcs,
    FillStyledPolygons,
    StrokeStyledPolygons,
    StrokeStyledLineSegments,
    SwitchCanvas,
}

/// Opcode-indexed command table; `COMMAND_TABLE[op as usize] == op`.
pub const COMMAND_TABLE: [(Opcode, &str); 59] = [
    (Opcode::FillRect, "fillRect"),
    (Opcode::StrokeRect, "strokeRect"),
    (Opcode::FillRects, "fillRects"),
    (Opcode::StrokeRects, "strokeRects"),
    (Opcode::ClearRect, "clearRect"),
    (Opcode::FillArc, "fillArc"),
    (Opcode::FillCircle, "fillCircle"),
    (Opcode::StrokeArc, "strokeArc"),
    (Opcode::StrokeCircle, "strokeCircle"),
    (Opcode::FillArcs, "fillArcs"),
    (Opcode::StrokeArcs, "strokeArcs"),
    (Opcode::FillCircles, "fillCircles"),
    (Opcode::StrokeCircles, "strokeCircles"),
    (Opcode::StrokeLine, "strokeLine"),
    (Opcode::BeginPath, "beginPath"),
    (Opcode::ClosePath, "closePath"),
    (Opcode::Stroke, "stroke"),
    (Opcode::Fill, "fill"),
    (Opcode::MoveTo, "moveTo"),
    (Opcode::LineTo, "lineTo"),
    (Opcode::Rect, "rect"),
    (Opcode::Arc, "arc"),
    (Opcode::Ellipse, "ellipse"),
    (Opcode::ArcTo, "arcTo"),
    (Opcode::QuadraticCurveTo, "quadraticCurveTo"),
    (Opcode::BezierCurveTo, "bezierCurveTo"),
    (Opcode::FillText, "fillText"),
    (Opcode::StrokeText, "strokeText"),
    (Opcode::SetLineDash, "setLineDash"),
    (Opcode::DrawImage, "drawImage"),
    (Opcode::PutImageData, "putImageData"),
    (Opcode::Clip, "clip"),
    (Opcode::Save, "save"),
    (Opcode::Restore, "restore"),
    (Opcode::Translate, "translate"),
    (Opcode::Rotate, "rotate"),
    (Opcode::Scale, "scale"),
    (Opcode::Transform, "transform"),
    (Opcode::SetTransform, "setTransform"),
    (Opcode::ResetTransform, "resetTransform"),
    (Opcode::Set, "set"),
    (Opcode::Clear, "clear"),
    (Opcode::Sleep, "sleep"),
    (Opcode::FillPolygon, "fillPolygon"),
    (Opcode::StrokePolygon, "strokePolygon"),
    (Opcode::StrokeLines, "strokeLines"),
    (Opcode::FillPolygons, "fillPolygons"),
    (Opcode::StrokePolygons, "strokePolygons"),
    (Opcode::StrokeLineSegments, "strokeLineSegments"),
    (Opcode::FillStyledRects, "fillStyledRects"),
    (Opcode::StrokeStyledRects, "strokeStyledRects"),
    (Opcode::FillStyledCircles, "fillStyledCircles"),
    (Opcode::StrokeStyledCircles, "strokeStyledCircles"),
    (Opcode::FillStyledArcs, "fillStyledArcs"),
    (Opcode::StrokeStyledArcs, "strokeStyledArcs"),
    (Opcode::FillStyledPolygons, "fillStyledPolygons"),
    (Opcode::StrokeStyledPolygons, "strokeStyledPolygons"),
    (Opcode::StrokeStyledLineSegments, "strokeStyledLineSegments"),
    (Opcode::SwitchCanvas, "switchCanvas"),
];

impl Opcode {
    /// Resolve a wire opcode by direct indexing.
    pub fn from_index(index: u64) -> BridgeResult<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| COMMAND_TABLE.get(i))
            .map(|(op, _)| *op)
            .ok_or_else(|| BridgeError::protocol(format!("unknown opcode {index}")))
    }

    /// Resolve a command given by name (`"fillRects"`).
    pub fn from_name(name: &str) -> BridgeResult<Self> {
        COMMAND_TABLE
            .iter()
            .find(|(_, n)| *n == name)
            .map(|(op, _)| *op)
            .ok_or_else(|| BridgeError::protocol(format!("unknown command '{name}'")))
    }

    /// Wire opcode.
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Canonical command name.
    pub fn name(self) -> &'static str {
        COMMAND_TABLE[self as usize].1
    }

    /// Commands that draw or otherwise change pixels or drawing state.
    ///
    /// `sleep` and `switchCanvas` are control-only and do not count towards
    /// the new-frame notification of a batch.
    pub fn is_mutating(self) -> bool {
        !matches!(self, Self::Sleep | Self::SwitchCanvas)
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Drawing-state attribute addressed by the `set` command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum StyleAttribute {
    FillStyle = 0,
    StrokeStyle,
    GlobalAlpha,
    Font,
    TextAlign,
    TextBaseline,
    Direction,
    GlobalCompositeOperation,
    LineWidth,
    LineCap,
    LineJoin,
    MiterLimit,
    LineDashOffset,
    ShadowOffsetX,
    ShadowOffsetY,
    ShadowBlur,
    ShadowColor,
    Filter,
    ImageSmoothingEnabled,
}

const ATTRIBUTE_TABLE: [(StyleAttribute, &str); 19] = [
    (StyleAttribute::FillStyle, "fillStyle"),
    (StyleAttribute::StrokeStyle, "strokeStyle"),
    (StyleAttribute::GlobalAlpha, "globalAlpha"),
    (StyleAttribute::Font, "font"),
    (StyleAttribute::TextAlign, "textAlign"),
    (StyleAttribute::TextBaseline, "textBaseline"),
    (StyleAttribute::Direction, "direction"),
    (
        StyleAttribute::GlobalCompositeOperation,
        "globalCompositeOperation",
    ),
    (StyleAttribute::LineWidth, "lineWidth"),
    (StyleAttribute::LineCap, "lineCap"),
    (StyleAttribute::LineJoin, "lineJoin"),
    (StyleAttribute::MiterLimit, "miterLimit"),
    (StyleAttribute::LineDashOffset, "lineDashOffset"),
    (StyleAttribute::ShadowOffsetX, "shadowOffsetX"),
    (StyleAttribute::ShadowOffsetY, "shadowOffsetY"),
    (StyleAttribute::ShadowBlur, "shadowBlur"),
    (StyleAttribute::ShadowColor, "shadowColor"),
    (StyleAttribute::Filter, "filter"),
    (StyleAttribute::ImageSmoothingEnabled, "imageSmoothingEnabled"),
];

impl StyleAttribute {
    /// Resolve an attribute by wire index.
    pub fn from_index(index: u64) -> BridgeResult<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| ATTRIBUTE_TABLE.get(i))
            .map(|(a, _)| *a)
            .ok_or_else(|| BridgeError::protocol(format!("unknown style attribute {index}")))
    }

    /// Resolve an attribute by its camelCase name.
    pub fn from_name(name: &str) -> BridgeResult<Self> {
        ATTRIBUTE_TABLE
            .iter()
            .find(|(_, n)| *n == name)
            .map(|(a, _)| *a)
            .ok_or_else(|| BridgeError::protocol(format!("unknown style attribute '{name}'")))
    }

    /// Canonical camelCase name.
    pub fn name(self) -> &'static str {
        ATTRIBUTE_TABLE[self as usize].1
    }
}

#[cfg(test)]
#[path = "../../tests/unit/protocol/table.rs"]
mod tests;
