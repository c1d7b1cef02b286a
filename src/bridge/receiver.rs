use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock, mpsc};

use serde::Serialize;

use crate::bridge::events::{KeyboardEvent, PointerEvent, PointerKind, TouchEvent, WheelEvent};
use crate::foundation::core::CanvasId;
use crate::foundation::error::{BridgeError, BridgeResult};

/// Remote end of an event bridge.
///
/// Every method may fail with [`BridgeError::Delivery`] once the remote side
/// is gone.
pub trait Receiver: Send + Sync {
    /// Pointer enter/leave/down/up/move.
    fn on_pointer(&self, event: &PointerEvent) -> BridgeResult<()>;

    /// One changed touch.
    fn on_touch(&self, _event: &TouchEvent) -> BridgeResult<()> {
        Ok(())
    }

    /// Wheel scroll.
    fn on_wheel(&self, _event: &WheelEvent) -> BridgeResult<()> {
        Ok(())
    }

    /// Key down/up/press.
    fn on_keyboard(&self, _event: &KeyboardEvent) -> BridgeResult<()> {
        Ok(())
    }
}

/// Explicit surface-id to receiver mapping, shared by bridges.
#[derive(Default)]
pub struct ReceiverRegistry {
    receivers: RwLock<HashMap<CanvasId, Arc<dyn Receiver>>>,
}

impl std::fmt::Debug for ReceiverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let receivers = self.receivers.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("ReceiverRegistry")
            .field("surfaces", &receivers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ReceiverRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a receiver, replacing any previous one for `surface`.
    pub fn register(&self, surface: CanvasId, receiver: Arc<dyn Receiver>) -> Option<Arc<dyn Receiver>> {
        self.receivers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(surface, receiver)
    }

    /// Tear down the receiver for `surface`.
    pub fn unregister(&self, surface: &CanvasId) -> Option<Arc<dyn Receiver>> {
        self.receivers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(surface)
    }

    /// Look up the receiver for `surface`.
    pub fn get(&self, surface: &CanvasId) -> BridgeResult<Arc<dyn Receiver>> {
        self.receivers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(surface)
            .cloned()
            .ok_or_else(|| BridgeError::delivery(format!("no receiver registered for '{surface}'")))
    }

    /// Number of registered receivers.
    pub fn len(&self) -> usize {
        self.receivers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// `true` when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One forwarded call: the receiver method name and its JSON payload.
#[derive(Clone, Debug, PartialEq)]
pub struct RemoteCall {
    /// `on_mouse_events`, `on_touch_events`, `on_wheel_event` or `on_keyboard_events`.
    pub method: &'static str,
    /// Serialized event record.
    pub payload: serde_json::Value,
}

/// Receiver that serializes events onto a channel for a remote consumer.
#[derive(Debug)]
pub struct ChannelReceiver {
    tx: mpsc::Sender<RemoteCall>,
}

impl ChannelReceiver {
    /// Receiver and the consuming end of its channel.
    pub fn new() -> (Self, mpsc::Receiver<RemoteCall>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, rx)
    }

    fn send(&self, method: &'static str, event: &impl Serialize) -> BridgeResult<()> {
        let payload = serde_json::to_value(event)?;
        self.tx
            .send(RemoteCall { method, payload })
            .map_err(|_| BridgeError::delivery(format!("{method}: remote receiver hung up")))
    }
}

impl Receiver for ChannelReceiver {
    fn on_pointer(&self, event: &PointerEvent) -> BridgeResult<()> {
        self.send("on_mouse_events", event)
    }

    fn on_touch(&self, event: &TouchEvent) -> BridgeResult<()> {
        self.send("on_touch_events", event)
    }

    fn on_wheel(&self, event: &WheelEvent) -> BridgeResult<()> {
        self.send("on_wheel_event", event)
    }

    fn on_keyboard(&self, event: &KeyboardEvent) -> BridgeResult<()> {
        self.send("on_keyboard_events", event)
    }
}

/// Last known pointer state of a surface.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PointerState {
    /// Pointer is over the surface.
    pub inside: bool,
    /// A button is held.
    pub down: bool,
    /// Last x in backing-store pixels.
    pub x: f64,
    /// Last y in backing-store pixels.
    pub y: f64,
}

type PointerCallback = Box<dyn Fn(f64, f64) + Send + Sync>;

#[derive(Default)]
struct PointerCallbacks {
    enter: Option<PointerCallback>,
    leave: Option<PointerCallback>,
    down: Option<PointerCallback>,
    up: Option<PointerCallback>,
    moved: Option<PointerCallback>,
}

/// Receiver tracking `[inside, down, x, y]` with optional per-kind callbacks.
///
/// State is updated before the callback for the event runs, so callbacks
/// observe the post-event state. Enter and leave both release the button.
#[derive(Default)]
pub struct PointerStateReceiver {
    state: Mutex<PointerState>,
    callbacks: RwLock<PointerCallbacks>,
}

impl std::fmt::Debug for PointerStateReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PointerStateReceiver")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl PointerStateReceiver {
    /// Receiver with the pointer outside and released.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> PointerState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Pointer is over the surface.
    pub fn mouse_is_inside(&self) -> bool {
        self.state().inside
    }

    /// A button is held.
    pub fn mouse_is_down(&self) -> bool {
        self.state().down
    }

    /// Last pointer position.
    pub fn mouse_position(&self) -> (f64, f64) {
        let s = self.state();
        (s.x, s.y)
    }

    /// Run `f(x, y)` on enter.
    pub fn on_mouse_enter(&self, f: impl Fn(f64, f64) + Send + Sync + 'static) {
        self.callbacks_mut().enter = Some(Box::new(f));
    }

    /// Run `f(x, y)` on leave.
    pub fn on_mouse_leave(&self, f: impl Fn(f64, f64) + Send + Sync + 'static) {
        self.callbacks_mut().leave = Some(Box::new(f));
    }

    /// Run `f(x, y)` on button down.
    pub fn on_mouse_down(&self, f: impl Fn(f64, f64) + Send + Sync + 'static) {
        self.callbacks_mut().down = Some(Box::new(f));
    }

    /// Run `f(x, y)` on button up.
    pub fn on_mouse_up(&self, f: impl Fn(f64, f64) + Send + Sync + 'static) {
        self.callbacks_mut().up = Some(Box::new(f));
    }

    /// Run `f(x, y)` on move.
    pub fn on_mouse_move(&self, f: impl Fn(f64, f64) + Send + Sync + 'static) {
        self.callbacks_mut().moved = Some(Box::new(f));
    }

    fn callbacks_mut(&self) -> std::sync::RwLockWriteGuard<'_, PointerCallbacks> {
        self.callbacks.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Receiver for PointerStateReceiver {
    fn on_pointer(&self, event: &PointerEvent) -> BridgeResult<()> {
        {
            let mut s = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            match event.kind {
                PointerKind::Enter => {
                    s.inside = true;
                    s.down = false;
                }
                PointerKind::Leave => {
                    s.inside = false;
                    s.down = false;
                }
                PointerKind::Down => s.down = true,
                PointerKind::Up => s.down = false,
                PointerKind::Move => {}
            }
            s.x = event.x;
            s.y = event.y;
        }
        let callbacks = self.callbacks.read().unwrap_or_else(PoisonError::into_inner);
        let cb = match event.kind {
            PointerKind::Enter => &callbacks.enter,
            PointerKind::Leave => &callbacks.leave,
            PointerKind::Down => &callbacks.down,
            PointerKind::Up => &callbacks.up,
            PointerKind::Move => &callbacks.moved,
        };
        if let Some(cb) = cb {
            cb(event.x, event.y);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/bridge/receiver.rs"]
mod tests;
