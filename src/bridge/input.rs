use std::sync::Arc;

use crate::bridge::events::{
    ClientTouch, CoordinateMapper, ElementRect, KeyKind, KeyboardEvent, PointerEvent, PointerKind,
    TouchEvent, TouchKind, WheelEvent,
};
use crate::bridge::receiver::{Receiver, ReceiverRegistry};
use crate::foundation::core::{CanvasId, CanvasSize};
use crate::foundation::error::BridgeResult;

/// Forwards input on one surface to the receiver registered for it.
///
/// Coordinates are mapped from client space into backing-store pixels
/// before forwarding. The first delivery failure removes every listener of
/// this bridge: the failure is logged, never returned, and nothing is
/// forwarded afterwards.
#[derive(Debug)]
pub struct EventBridge {
    surface: CanvasId,
    registry: Arc<ReceiverRegistry>,
    mapper: CoordinateMapper,
    subscribed: bool,
    forwarded: u64,
}

impl EventBridge {
    /// Bridge for a surface displayed unscaled at the page origin.
    pub fn new(surface: CanvasId, registry: Arc<ReceiverRegistry>, size: CanvasSize) -> BridgeResult<Self> {
        Ok(Self {
            surface,
            registry,
            mapper: CoordinateMapper::new(size, ElementRect::unscaled(size))?,
            subscribed: true,
            forwarded: 0,
        })
    }

    /// Update the backing-store size and on-page rect.
    pub fn set_layout(&mut self, size: CanvasSize, rect: ElementRect) -> BridgeResult<()> {
        self.mapper = CoordinateMapper::new(size, rect)?;
        Ok(())
    }

    /// `false` once a delivery failure removed the listeners.
    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    /// Calls forwarded successfully so far.
    pub fn forwarded(&self) -> u64 {
        self.forwarded
    }

    /// Forward a pointer event given in client coordinates.
    pub fn pointer(&mut self, kind: PointerKind, client_x: f64, client_y: f64) {
        let (x, y) = self.mapper.map(client_x, client_y);
        let event = PointerEvent { kind, x, y };
        self.deliver(|r| r.on_pointer(&event));
    }

    /// Forward one call per changed touch, stopping at the first failure.
    pub fn touch(&mut self, kind: TouchKind, changed: &[ClientTouch]) {
        for t in changed {
            let (x, y) = self.mapper.map(t.client_x, t.client_y);
            let event = TouchEvent {
                kind,
                x,
                y,
                touch_id: t.id,
            };
            if !self.deliver(|r| r.on_touch(&event)) {
                break;
            }
        }
    }

    /// Forward a wheel scroll.
    pub fn wheel(&mut self, delta_y: f64) {
        let event = WheelEvent { delta_y };
        self.deliver(|r| r.on_wheel(&event));
    }

    /// Forward a keyboard event.
    pub fn key(&mut self, kind: KeyKind, key: &str, ctrl: bool, shift: bool, meta: bool) {
        let event = KeyboardEvent {
            kind,
            key: key.to_owned(),
            ctrl_key: ctrl,
            shift_key: shift,
            meta_key: meta,
        };
        self.deliver(|r| r.on_keyboard(&event));
    }

    fn deliver(&mut self, call: impl FnOnce(&dyn Receiver) -> BridgeResult<()>) -> bool {
        if !self.subscribed {
            return false;
        }
        let result = self
            .registry
            .get(&self.surface)
            .and_then(|r| call(r.as_ref()));
        match result {
            Ok(()) => {
                self.forwarded += 1;
                true
            }
            Err(error) => {
                tracing::error!(surface = %self.surface, %error, "event delivery failed, removing input listeners");
                self.subscribed = false;
                false
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/bridge/input.rs"]
mod tests;
