use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "canvas-bridge", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a recorded command message onto a fresh canvas and write a PNG.
    Render(RenderArgs),
    /// Print the opcode table (index and wire name).
    Opcodes,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input replay JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Use the hand-drawn primitive renderer.
    #[arg(long)]
    sketchy: bool,

    /// Stop at the first failing command instead of skipping it.
    #[arg(long)]
    abort_on_error: bool,

    /// Honor `sleep` commands instead of ignoring them.
    #[arg(long)]
    honor_sleep: bool,
}

/// Recorded message: one command list plus the buffers it references.
#[derive(serde::Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct Replay {
    #[serde(default = "default_width")]
    width: u32,
    #[serde(default = "default_height")]
    height: u32,
    commands: serde_json::Value,
    #[serde(default)]
    buffers: Vec<ReplayBuffer>,
}

#[derive(serde::Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct ReplayBuffer {
    dtype: canvas_bridge::DType,
    values: Vec<f64>,
}

fn default_width() -> u32 {
    canvas_bridge::CanvasSize::default().width
}

fn default_height() -> u32 {
    canvas_bridge::CanvasSize::default().height
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Opcodes => {
            for (op, name) in canvas_bridge::COMMAND_TABLE {
                println!("{:>3}  {name}", op.index());
            }
            Ok(())
        }
    }
}

fn read_replay(path: &Path) -> anyhow::Result<Replay> {
    let f = File::open(path).with_context(|| format!("open replay '{}'", path.display()))?;
    let replay: Replay =
        serde_json::from_reader(BufReader::new(f)).with_context(|| "parse replay JSON")?;
    Ok(replay)
}

fn encode_values(dtype: canvas_bridge::DType, values: &[f64]) -> Arc<[u8]> {
    use canvas_bridge::DType as D;
    let mut out = Vec::with_capacity(values.len() * dtype.width());
    for &v in values {
        match dtype {
            D::Int8 => out.extend((v as i8).to_le_bytes()),
            D::Uint8 => out.push(v as u8),
            D::Int16 => out.extend((v as i16).to_le_bytes()),
            D::Uint16 => out.extend((v as u16).to_le_bytes()),
            D::Int32 => out.extend((v as i32).to_le_bytes()),
            D::Uint32 => out.extend((v as u32).to_le_bytes()),
            D::Float32 => out.extend((v as f32).to_le_bytes()),
            D::Float64 => out.extend(v.to_le_bytes()),
        }
    }
    out.into()
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let replay = read_replay(&args.in_path)?;

    let policy = if args.abort_on_error {
        canvas_bridge::ErrorPolicy::Abort
    } else {
        canvas_bridge::ErrorPolicy::SkipAndContinue
    };
    let renderer = if args.sketchy {
        canvas_bridge::RendererKind::Sketchy
    } else {
        canvas_bridge::RendererKind::Standard
    };

    let mut manager = canvas_bridge::CanvasManager::new(
        canvas_bridge::ManagerOpts::default()
            .with_error_policy(policy)
            .with_honor_sleep(args.honor_sleep),
    );
    let id = canvas_bridge::CanvasId::new("replay");
    manager.create_canvas(
        id.clone(),
        canvas_bridge::CanvasOpts::default()
            .with_size(replay.width, replay.height)
            .with_renderer(renderer),
    )?;

    let buffers: Vec<Arc<[u8]>> = replay
        .buffers
        .iter()
        .map(|b| encode_values(b.dtype, &b.values))
        .collect();
    let report = manager.handle_message(&replay.commands, &buffers);

    for failure in &report.failures {
        let op = failure
            .opcode
            .map_or_else(|| "?".to_owned(), |op| op.name().to_owned());
        eprintln!(
            "command {} ({op}) failed: {}",
            failure.position, failure.error
        );
    }
    eprintln!(
        "executed {} commands ({} mutating, {} failed{})",
        report.executed,
        report.mutating,
        report.failures.len(),
        if report.aborted { ", aborted" } else { "" }
    );

    let canvas = manager
        .canvas_mut(&id)
        .context("replay canvas disappeared")?;
    let png = canvas.snapshot_bytes()?;

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&args.out, png).with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    if report.aborted {
        anyhow::bail!("replay aborted at the first failing command");
    }
    Ok(())
}
