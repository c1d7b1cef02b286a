use std::sync::Mutex;

use serde_json::json;

use super::*;
use crate::protocol::encode::{Arg, CommandBuilder};
use crate::protocol::table::{Opcode, StyleAttribute};
use crate::render::surface::{GradientKind, GradientStop};
use crate::foundation::color::Rgba;

fn opts(w: u32, h: u32) -> CanvasOpts {
    CanvasOpts::default().with_size(w, h)
}

fn manager_with(ids: &[&str], w: u32, h: u32) -> CanvasManager {
    let mut m = CanvasManager::default();
    for id in ids {
        m.create_canvas(CanvasId::new(*id), opts(w, h)).unwrap();
    }
    m
}

fn px(m: &mut CanvasManager, id: &str, x: u32, y: u32) -> [u8; 4] {
    m.canvas_mut(&CanvasId::new(id))
        .unwrap()
        .pixels()
        .pixel(x, y)
        .unwrap()
}

#[test]
fn first_canvas_is_the_default_target() {
    let mut m = manager_with(&["a", "b"], 4, 4);
    assert_eq!(m.current(), Some(&CanvasId::new("a")));
    let report = m.handle_message(&json!([Opcode::FillRect.index(), [0, 0, 4, 4]]), &[]);
    assert!(report.is_clean());
    assert_eq!(px(&mut m, "a", 1, 1)[3], 255);
    assert_eq!(px(&mut m, "b", 1, 1)[3], 0);
}

#[test]
fn switch_canvas_retargets_the_rest_of_the_batch() {
    let mut m = manager_with(&["a", "b"], 4, 4);
    let frames = Arc::new(Mutex::new(Vec::new()));
    for id in ["a", "b"] {
        let sink = Arc::clone(&frames);
        m.on_new_frame(&CanvasId::new(id), move |e| {
            sink.lock().unwrap().push(e.canvas.clone())
        })
        .unwrap();
    }

    let report = m.handle_message(
        &json!([
            ["fillRect", [0, 0, 1, 1]],
            ["switchCanvas", ["IPY_MODEL_b"]],
            ["fillRect", [2, 2, 1, 1]],
            ["fillRect", [3, 3, 1, 1]]
        ]),
        &[],
    );
    assert!(report.is_clean());
    assert_eq!(px(&mut m, "a", 0, 0)[3], 255);
    assert_eq!(px(&mut m, "a", 2, 2)[3], 0);
    assert_eq!(px(&mut m, "b", 2, 2)[3], 255);
    assert_eq!(m.current(), Some(&CanvasId::new("b")));

    // One notification per touched canvas, not per command.
    let mut seen = frames.lock().unwrap().clone();
    seen.sort();
    assert_eq!(seen, vec![CanvasId::new("a"), CanvasId::new("b")]);
}

#[test]
fn switch_to_an_unknown_canvas_fails_that_command_only() {
    let mut m = manager_with(&["a"], 2, 2);
    let report = m.handle_message(
        &json!([["switchCanvas", ["IPY_MODEL_nope"]], ["fillRect", [0, 0, 2, 2]]]),
        &[],
    );
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].error.is_protocol());
    assert_eq!(px(&mut m, "a", 0, 0)[3], 255);
}

#[test]
fn abort_policy_stops_at_the_first_failure() {
    let mut m = CanvasManager::new(ManagerOpts::default().with_error_policy(ErrorPolicy::Abort));
    m.create_canvas(CanvasId::new("a"), opts(2, 2)).unwrap();
    let report = m.handle_message(
        &json!([["nosuchcommand", []], ["fillRect", [0, 0, 2, 2]]]),
        &[],
    );
    assert!(report.aborted);
    assert_eq!(report.executed, 0);
    assert_eq!(px(&mut m, "a", 0, 0)[3], 0);
}

#[test]
fn commands_without_a_target_fail() {
    let mut m = CanvasManager::default();
    let report = m.handle_message(&json!([["fillRect", [0, 0, 1, 1]]]), &[]);
    assert_eq!(report.failures.len(), 1);
}

#[test]
fn registered_gradients_resolve_by_model_reference() {
    let mut m = manager_with(&["a"], 10, 1);
    m.register_gradient(
        "grad",
        Gradient::new(
            GradientKind::Linear {
                x0: 0.0,
                y0: 0.0,
                x1: 10.0,
                y1: 0.0,
            },
            vec![
                GradientStop {
                    offset: 0.0,
                    color: Rgba::new(0.0, 255.0, 0.0, 1.0),
                },
                GradientStop {
                    offset: 1.0,
                    color: Rgba::new(0.0, 255.0, 0.0, 1.0),
                },
            ],
        ),
    );
    let report = m.handle_message(
        &json!([
            ["set", ["fillStyle", "IPY_MODEL_grad"]],
            ["fillRect", [0, 0, 10, 1]],
            ["set", ["strokeStyle", "IPY_MODEL_missing"]]
        ]),
        &[],
    );
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(report.failures[0].error, BridgeError::Resource(_)));
    assert_eq!(px(&mut m, "a", 5, 0), [0, 255, 0, 255]);
}

#[test]
fn patterns_need_a_canvas_or_image_source() {
    let mut m = manager_with(&["a", "tile"], 4, 4);
    m.register_bitmap("img", Bitmap::transparent(1, 1));
    m.register_pattern("p1", "IPY_MODEL_tile", "repeat").unwrap();
    m.register_pattern("p2", "IPY_MODEL_img", "no-repeat").unwrap();
    let err = m
        .register_pattern("p3", "IPY_MODEL_widget", "repeat")
        .unwrap_err();
    assert!(matches!(err, BridgeError::UnsupportedPatternSource(_)));
    assert!(m.register_pattern("p4", "IPY_MODEL_tile", "sideways").is_err());
}

#[test]
fn draw_image_reads_other_canvases_and_images() {
    let mut m = manager_with(&["src", "dst"], 4, 4);
    m.handle_message(
        &json!([["set", ["fillStyle", "#0000ff"]], ["fillRect", [0, 0, 4, 4]]]),
        &[],
    );
    m.register_bitmap(
        "green",
        Bitmap::from_rgba(1, 1, vec![0, 255, 0, 255]).unwrap(),
    );
    let report = m.handle_message(
        &json!([
            ["switchCanvas", ["IPY_MODEL_dst"]],
            ["drawImage", ["IPY_MODEL_src", 0, 0]],
            ["drawImage", ["IPY_MODEL_green", 3, 3]],
            ["drawImage", ["IPY_MODEL_dst", 0, 0]]
        ]),
        &[],
    );
    assert_eq!(report.failures.len(), 1, "self-draw is unresolvable");
    assert_eq!(px(&mut m, "dst", 1, 1), [0, 0, 255, 255]);
    assert_eq!(px(&mut m, "dst", 3, 3), [0, 255, 0, 255]);
}

#[test]
fn multi_canvas_recomposes_when_a_layer_changes() {
    let mut m = manager_with(&["bottom", "top"], 2, 1);
    m.create_multi_canvas(
        CanvasId::new("stack"),
        vec![CanvasId::new("bottom"), CanvasId::new("top")],
    )
    .unwrap();
    let composed = Arc::new(Mutex::new(0usize));
    let counter = Arc::clone(&composed);
    m.on_composite_frame(move |_| *counter.lock().unwrap() += 1);

    let mut b = CommandBuilder::new();
    b.set(StyleAttribute::FillStyle, "#ff0000");
    b.push(Opcode::FillRect, [0.0, 0.0, 2.0, 1.0].map(Arg::from));
    let (msg, buffers) = b.finish();
    m.handle_message(&msg, &buffers);

    let stack = m.multi_canvas(&CanvasId::new("stack")).unwrap();
    assert_eq!(stack.pixels().pixel(1, 0), Some([255, 0, 0, 255]));
    assert_eq!(*composed.lock().unwrap(), 1);

    // Commands that only touch state do not recompose.
    m.handle_message(&json!([["sleep", [0]]]), &[]);
    assert_eq!(*composed.lock().unwrap(), 1);

    m.resize(&CanvasId::new("stack"), 3, 2).unwrap();
    let stack = m.multi_canvas(&CanvasId::new("stack")).unwrap();
    assert_eq!(stack.size(), CanvasSize::new(3, 2).unwrap());
    assert_eq!(
        m.canvas(&CanvasId::new("top")).unwrap().size(),
        CanvasSize::new(3, 2).unwrap()
    );
}

#[test]
fn duplicate_and_unknown_ids_are_rejected() {
    let mut m = manager_with(&["a"], 2, 2);
    assert!(m.create_canvas(CanvasId::new("a"), opts(2, 2)).is_err());
    assert!(
        m.create_multi_canvas(CanvasId::new("m"), vec![CanvasId::new("x")])
            .is_err()
    );
    assert!(m.create_multi_canvas(CanvasId::new("m"), Vec::new()).is_err());
    assert!(m.select(&CanvasId::new("x")).is_err());
    assert!(m.remove_canvas(&CanvasId::new("a")).is_some());
    assert!(m.current().is_none());
}

#[test]
fn late_join_canvas_starts_from_the_snapshot() {
    let mut m = manager_with(&["a"], 3, 3);
    m.handle_message(&json!([["fillRect", [0, 0, 1, 1]]]), &[]);
    let png = m
        .canvas_mut(&CanvasId::new("a"))
        .unwrap()
        .snapshot_bytes()
        .unwrap();
    m.create_canvas_with_image_data(CanvasId::new("b"), opts(3, 3), &png)
        .unwrap();
    assert_eq!(px(&mut m, "b", 0, 0), [0, 0, 0, 255]);
    assert_eq!(px(&mut m, "b", 2, 2), [0, 0, 0, 0]);
}
