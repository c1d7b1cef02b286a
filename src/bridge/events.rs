use serde::Serialize;

use crate::foundation::core::CanvasSize;
use crate::foundation::error::{BridgeError, BridgeResult};

/// Pointer event kinds, serialized with their DOM names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, serde::Deserialize)]
#[allow(missing_docs)]
pub enum PointerKind {
    #[serde(rename = "mouseenter")]
    Enter,
    #[serde(rename = "mouseleave")]
    Leave,
    #[serde(rename = "mousedown")]
    Down,
    #[serde(rename = "mouseup")]
    Up,
    #[serde(rename = "mousemove")]
    Move,
}

/// Touch event kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, serde::Deserialize)]
#[allow(missing_docs)]
pub enum TouchKind {
    #[serde(rename = "touchstart")]
    Start,
    #[serde(rename = "touchend")]
    End,
    #[serde(rename = "touchmove")]
    Move,
    #[serde(rename = "touchcancel")]
    Cancel,
}

/// Keyboard event kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, serde::Deserialize)]
#[allow(missing_docs)]
pub enum KeyKind {
    #[serde(rename = "keydown")]
    Down,
    #[serde(rename = "keyup")]
    Up,
    #[serde(rename = "keypress")]
    Press,
}

/// `{type, x, y}` in backing-store pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PointerEvent {
    /// Event kind.
    #[serde(rename = "type")]
    pub kind: PointerKind,
    /// Backing-store x.
    pub x: f64,
    /// Backing-store y.
    pub y: f64,
}

/// `{type, x, y, touchId}` for one changed touch.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TouchEvent {
    /// Event kind.
    #[serde(rename = "type")]
    pub kind: TouchKind,
    /// Backing-store x.
    pub x: f64,
    /// Backing-store y.
    pub y: f64,
    /// Identifier of the touch point.
    pub touch_id: i64,
}

/// `{deltaY}`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WheelEvent {
    /// Vertical scroll amount.
    pub delta_y: f64,
}

/// `{type, key, ctrlKey, shiftKey, metaKey}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyboardEvent {
    /// Event kind.
    #[serde(rename = "type")]
    pub kind: KeyKind,
    /// Key value (`"a"`, `"Enter"`, ...).
    pub key: String,
    /// Control held.
    pub ctrl_key: bool,
    /// Shift held.
    pub shift_key: bool,
    /// Meta held.
    pub meta_key: bool,
}

/// A raw touch point in client (CSS) coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClientTouch {
    /// Client x.
    pub client_x: f64,
    /// Client y.
    pub client_y: f64,
    /// Identifier of the touch point.
    pub id: i64,
}

/// Where the element sits on the page, in CSS pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ElementRect {
    /// Left edge.
    pub left: f64,
    /// Top edge.
    pub top: f64,
    /// Displayed width.
    pub width: f64,
    /// Displayed height.
    pub height: f64,
}

impl ElementRect {
    /// Rect displaying `size` at 1:1 at the page origin.
    pub fn unscaled(size: CanvasSize) -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            width: f64::from(size.width),
            height: f64::from(size.height),
        }
    }
}

/// Maps client coordinates into backing-store pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoordinateMapper {
    rect: ElementRect,
    scale_x: f64,
    scale_y: f64,
}

impl CoordinateMapper {
    /// Mapper for a backing store of `size` displayed in `rect`.
    pub fn new(size: CanvasSize, rect: ElementRect) -> BridgeResult<Self> {
        if !(rect.width > 0.0 && rect.height > 0.0) {
            return Err(BridgeError::validation(format!(
                "element rect {}x{} is not displayable",
                rect.width, rect.height
            )));
        }
        Ok(Self {
            rect,
            scale_x: f64::from(size.width) / rect.width,
            scale_y: f64::from(size.height) / rect.height,
        })
    }

    /// Backing-store coordinates of a client point.
    pub fn map(&self, client_x: f64, client_y: f64) -> (f64, f64) {
        (
            (client_x - self.rect.left) * self.scale_x,
            (client_y - self.rect.top) * self.scale_y,
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/bridge/events.rs"]
mod tests;
