//! Remote Canvas2D command bridge.
//!
//! A remote producer sends compact command messages (opcodes, literal
//! arguments and binary buffers); this crate decodes them without per-item
//! allocation and replays them onto CPU raster canvases:
//!
//! - Encode with a [`CommandBuilder`] or receive wire messages as JSON plus buffers
//! - Route them through a [`CanvasManager`] (or a [`Decoder`] and [`CommandExecutor`])
//! - Read back pixels, publish PNG [`Snapshot`]s, stack layers in a [`MultiCanvas`]
//! - Forward pointer, touch, wheel and keyboard input through an [`EventBridge`]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod bridge;
mod canvas;
mod foundation;
mod protocol;
mod render;

pub use crate::foundation::color::Rgba;
pub use crate::foundation::core::{Affine, BezPath, Bitmap, CanvasId, CanvasSize, Point, Rect};
pub use crate::foundation::error::{BridgeError, BridgeResult};

pub use crate::bridge::events::{
    ClientTouch, CoordinateMapper, ElementRect, KeyKind, KeyboardEvent, PointerEvent, PointerKind,
    TouchEvent, TouchKind, WheelEvent,
};
pub use crate::bridge::input::EventBridge;
pub use crate::bridge::offscreen::CanvasElement;
pub use crate::bridge::receiver::{
    ChannelReceiver, PointerState, PointerStateReceiver, Receiver, ReceiverRegistry, RemoteCall,
};
pub use crate::canvas::composite::MultiCanvas;
pub use crate::canvas::manager::{CanvasManager, ManagerOpts};
pub use crate::canvas::model::{CanvasModel, CanvasOpts, FrameEvent, FrameListener};
pub use crate::canvas::snapshot::{Snapshot, decode_image, encode_png, fingerprint};
pub use crate::protocol::args::{Argument, DType, NumberAccessor, Shape, TypedBuffer};
pub use crate::protocol::decode::{
    Args, BatchReport, Command, CommandFailure, DecodeOpts, Decoder, ErrorPolicy,
};
pub use crate::protocol::encode::{Arg, CommandBuilder};
pub use crate::protocol::style::ColorAccessor;
pub use crate::protocol::table::{COMMAND_TABLE, Opcode, StyleAttribute};
pub use crate::render::batch::{BatchExecutor, BatchFrame, Mode, PolygonScan};
pub use crate::render::exec::{
    CommandExecutor, Flow, MODEL_REF_PREFIX, NoResources, ResourceResolver, resolve_image,
    style_setting,
};
pub use crate::render::primitives::{
    PrimitiveRenderer, RendererKind, SketchyRenderer, StandardRenderer,
};
pub use crate::render::raster::RasterSurface;
pub use crate::render::recording::{RecordingSurface, SurfaceCall};
pub use crate::render::surface::{
    CompositeOp, DrawingSurface, FillRule, Gradient, GradientKind, GradientStop, LineCap,
    LineJoin, Paint, Pattern, Repetition, StyleSetting, TextAlign, TextBaseline,
};
