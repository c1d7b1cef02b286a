use super::*;
use crate::protocol::encode::{Arg, CommandBuilder};
use serde_json::json;

fn f32_bytes(values: &[f32]) -> Arc<[u8]> {
    values
        .iter()
        .flat_map(|v| v.to_le_bytes())
        .collect::<Vec<u8>>()
        .into()
}

fn collect(decoder: &Decoder, msg: &Value, buffers: &[Arc<[u8]>]) -> (Vec<Command>, BatchReport) {
    let mut seen = Vec::new();
    let report = decoder.run_message(msg, buffers, |c| {
        seen.push(c.clone());
        Ok(())
    });
    (seen, report)
}

#[test]
fn nested_batch_slices_buffers_per_command() {
    let msg = json!([
        [0, [{"idx": 0, "dtype": "float32"}, {"idx": 1, "dtype": "float32"}, 1, 1], 2],
        [14, [], 0],
        [18, [{"idx": 0, "dtype": "float32"}, 0], 1]
    ]);
    let pool = vec![f32_bytes(&[1.0]), f32_bytes(&[2.0]), f32_bytes(&[3.0])];
    let (cmds, report) = collect(&Decoder::default(), &msg, &pool);

    assert!(report.is_clean());
    assert_eq!(cmds.len(), 3);
    assert_eq!(cmds[0].buffers, 0..2);
    assert_eq!(cmds[1].buffers, 2..2);
    assert_eq!(cmds[2].buffers, 2..3);
    // Local index 0 of the third command is pool buffer 2.
    assert_eq!(cmds[2].f64_arg(0).unwrap(), 3.0);
    assert_eq!(cmds[0].f64_arg(1).unwrap(), 2.0);
}

#[test]
fn batch_of_batches_shares_one_cursor() {
    let msg = json!([
        [[0, [{"idx": 0, "dtype": "float32"}, 0, 1, 1], 1], [14, [], 0]],
        [[0, [{"idx": 0, "dtype": "float32"}, 0, 1, 1], 1]]
    ]);
    let pool = vec![f32_bytes(&[5.0]), f32_bytes(&[6.0])];
    let (cmds, report) = collect(&Decoder::default(), &msg, &pool);
    assert!(report.is_clean());
    assert_eq!(cmds.len(), 3);
    assert_eq!(cmds[2].buffers, 1..2);
    assert_eq!(cmds[2].f64_arg(0).unwrap(), 6.0);
    assert_eq!(
        cmds.iter().map(|c| c.position).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
}

#[test]
fn single_command_sees_whole_pool() {
    let msg = json!([2, [{"idx": 0, "dtype": "float32"}, {"idx": 1, "dtype": "float32"}, 10, 10]]);
    let pool = vec![f32_bytes(&[0.0, 50.0]), f32_bytes(&[0.0, 50.0])];
    let (cmds, report) = collect(&Decoder::default(), &msg, &pool);
    assert!(report.is_clean());
    assert_eq!(cmds[0].opcode, Opcode::FillRects);
    assert_eq!(cmds[0].arg(0).unwrap().declared_len(), Some(2));
}

#[test]
fn commands_resolve_by_name_and_object_form() {
    let msg = json!([
        ["fillRect", [0, 0, 5, 5], 0],
        {"name": "set", "attr": 0, "value": "red"}
    ]);
    let (cmds, report) = collect(&Decoder::default(), &msg, &[]);
    assert!(report.is_clean());
    assert_eq!(cmds[0].opcode, Opcode::FillRect);
    assert_eq!(cmds[1].opcode, Opcode::Set);
    assert_eq!(cmds[1].arg(1).unwrap().as_str().unwrap(), "red");
}

#[test]
fn batch_may_start_with_an_object_form_command() {
    let msg = json!([
        {"name": "fillRect", "args": [0, 0, 5, 5]},
        ["strokeRect", [1, 1, 2, 2]]
    ]);
    let (cmds, report) = collect(&Decoder::default(), &msg, &[]);
    assert!(report.is_clean(), "{:?}", report.failures);
    assert_eq!(cmds.len(), 2);
    assert_eq!(cmds[0].opcode, Opcode::FillRect);
    assert_eq!(cmds[1].opcode, Opcode::StrokeRect);
}

#[test]
fn unknown_opcode_skips_and_continues_by_default() {
    let msg = json!([[0, [0, 0, 1, 1], 0], [200, [], 0], [14, [], 0]]);
    let (cmds, report) = collect(&Decoder::default(), &msg, &[]);
    assert_eq!(cmds.len(), 2);
    assert_eq!(report.executed, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].position, 1);
    assert!(report.failures[0].error.is_protocol());
    assert!(!report.aborted);
}

#[test]
fn abort_policy_stops_at_first_failure() {
    let msg = json!([[0, [0, 0, 1, 1], 0], [200, [], 0], [14, [], 0]]);
    let decoder = Decoder::new(DecodeOpts::default().with_error_policy(ErrorPolicy::Abort));
    let (cmds, report) = collect(&decoder, &msg, &[]);
    assert_eq!(cmds.len(), 1);
    assert!(report.aborted);
    assert_eq!(report.failures.len(), 1);
}

#[test]
fn failing_command_still_consumes_its_buffers() {
    let msg = json!([
        [200, [{"idx": 0, "dtype": "float32"}], 1],
        [18, [{"idx": 0, "dtype": "float32"}, 0], 1]
    ]);
    let pool = vec![f32_bytes(&[1.0]), f32_bytes(&[9.0])];
    let (cmds, report) = collect(&Decoder::default(), &msg, &pool);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(cmds[0].buffers, 1..2);
    assert_eq!(cmds[0].f64_arg(0).unwrap(), 9.0);
}

#[test]
fn executor_errors_follow_the_same_policy() {
    let msg = json!([[14, [], 0], [15, [], 0], [16, [], 0]]);
    let mut ran = Vec::new();
    let report = Decoder::default().run(&msg, &[], |c| {
        ran.push(c.opcode);
        if c.opcode == Opcode::ClosePath {
            return Err(BridgeError::protocol("boom"));
        }
        Ok(())
    });
    assert_eq!(ran.len(), 3);
    assert_eq!(report.executed, 2);
    assert_eq!(report.failures[0].opcode, Some(Opcode::ClosePath));
}

#[test]
fn buffer_count_overflow_and_bad_index_are_protocol_errors() {
    let msg = json!([[0, [0, 0, 1, 1], 3], [18, [{"idx": 4, "dtype": "float32"}, 0], 0]]);
    let (cmds, report) = collect(&Decoder::default(), &msg, &[f32_bytes(&[1.0])]);
    assert!(cmds.is_empty());
    assert_eq!(report.failures.len(), 2);
    assert!(report.failures.iter().all(|f| f.error.is_protocol()));
}

#[test]
fn inline_arrays_and_shapes_resolve() {
    let msg = json!([[28, [[4, 2]], 0], [30, [{"idx": 0, "dtype": "uint8", "shape": [1, 1, 4]}, 0, 0], 1]]);
    let pool: Vec<Arc<[u8]>> = vec![vec![1u8, 2, 3, 4].into()];
    let (cmds, report) = collect(&Decoder::default(), &msg, &pool);
    assert!(report.is_clean());
    assert_eq!(cmds[0].arg(0).unwrap().as_buffer().unwrap().to_vec(), vec![4.0, 2.0]);
    match cmds[1].arg(0).unwrap() {
        Argument::Buffer { shape, .. } => {
            assert_eq!(shape.as_deref(), Some(&[1usize, 1, 4][..]));
        }
        other => panic!("expected buffer, got {other:?}"),
    }
}

#[test]
fn meta_encoded_message_reads_commands_from_first_buffer() {
    let mut b = CommandBuilder::new();
    b.push(
        Opcode::FillRects,
        [Arg::F32(vec![0.0, 50.0]), Arg::F32(vec![0.0, 50.0]), 10.0.into(), 10.0.into()],
    );
    b.push(Opcode::BeginPath, []);
    let (msg, buffers) = b.finish_meta();
    assert_eq!(buffers.len(), 3);

    let (cmds, report) = collect(&Decoder::default(), &msg, &buffers);
    assert!(report.is_clean());
    assert_eq!(cmds.len(), 2);
    assert_eq!(cmds[0].buffers, 0..2);
    assert_eq!(report.mutating, 2);
}

#[test]
fn broken_meta_payload_fails_the_message() {
    let msg = json!({"dtype": "uint8", "shape": [3]});
    let pool: Vec<Arc<[u8]>> = vec![b"[[0".to_vec().into()];
    let (cmds, report) = collect(&Decoder::default(), &msg, &pool);
    assert!(cmds.is_empty());
    assert!(report.aborted);
    assert!(matches!(report.failures[0].error, BridgeError::Serde(_)));
}
