use std::{path::PathBuf, time::Duration};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use quadreveal::{
    CaptureDevice, CaptureSession, Clock as _, ManualClock, Pipeline, PipelineConfig, Player,
    Quadrant, Scheduler, Sequencer, SequencerParams, SystemClock, TestPatternDevice,
    extract_sub_block, load_raw,
};

#[derive(Parser, Debug)]
#[command(name = "quadreveal", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full pipeline on a quadrant and play the reveal animation.
    Process(ProcessArgs),
    /// Extract one quadrant of a raw buffer and write it as a PNG.
    Preview(PreviewArgs),
    /// Capture one snapshot from the (synthetic) live device into a raw file.
    Snapshot(SnapshotArgs),
}

#[derive(Parser, Debug)]
struct ProcessArgs {
    /// Source image to convert into the raw input buffer. When omitted, the
    /// existing raw input (e.g. a committed snapshot) is used as-is.
    #[arg(long = "in")]
    in_path: Option<PathBuf>,

    /// Quadrant to process (1..=16, row-major).
    #[arg(long)]
    quadrant: u8,

    /// Pipeline config JSON; defaults match the standard deployment.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Play the reveal on a virtual clock (no real delays).
    #[arg(long)]
    no_delay: bool,
}

#[derive(Parser, Debug)]
struct PreviewArgs {
    /// Input raw buffer (400x400 grayscale).
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Quadrant to extract (1..=16, row-major).
    #[arg(long)]
    quadrant: u8,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct SnapshotArgs {
    /// Output raw buffer path.
    #[arg(long)]
    out: PathBuf,

    #[arg(long, default_value_t = 400)]
    width: u32,

    #[arg(long, default_value_t = 400)]
    height: u32,

    /// Poll ticks to run before committing the snapshot.
    #[arg(long, default_value_t = 5)]
    polls: u32,

    /// Poll interval in milliseconds.
    #[arg(long, default_value_t = 33)]
    interval_ms: u64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Process(args) => cmd_process(args),
        Command::Preview(args) => cmd_preview(args),
        Command::Snapshot(args) => cmd_snapshot(args),
    }
}

fn cmd_process(args: ProcessArgs) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };

    let mut pipeline = Pipeline::new(config)?;
    let outcome = pipeline.begin_run(args.in_path.as_deref(), args.quadrant)?;

    let mut sequencer = Sequencer::new(SequencerParams::default(), outcome.quadrant)?;
    let mut sink = quadreveal::LoggingSink;
    let frames = if args.no_delay {
        Player::new(ManualClock::new()).play(&mut sequencer, &mut sink)?
    } else {
        Player::new(SystemClock).play(&mut sequencer, &mut sink)?
    };
    pipeline.complete_run();

    eprintln!(
        "processed quadrant {} ({} source bytes, {} result bytes, {frames} frames)",
        outcome.quadrant.id,
        outcome.source.len(),
        outcome.result.len(),
    );
    Ok(())
}

fn cmd_preview(args: PreviewArgs) -> anyhow::Result<()> {
    let quadrant = Quadrant::from_id(args.quadrant)?;
    // Oversized files are truncated with a warning; short files abort here.
    let buffer = load_raw(&args.in_path, 400, 400)?;
    let sub = extract_sub_block(&buffer, quadrant, 100)?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    image::save_buffer_with_format(
        &args.out,
        &sub.pixels,
        sub.width,
        sub.height,
        image::ColorType::L8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_snapshot(args: SnapshotArgs) -> anyhow::Result<()> {
    let clock = SystemClock;
    let interval = Duration::from_millis(args.interval_ms);
    let mut scheduler: Scheduler<()> = Scheduler::new();

    let mut session = CaptureSession::open(|| {
        Ok(Box::new(TestPatternDevice::new(args.width, args.height)) as Box<dyn CaptureDevice>)
    })?;

    session.schedule_poll(&mut scheduler, clock.now(), interval, ());
    let mut polled = 0u32;
    while polled < args.polls {
        let Some(due) = scheduler.next_due() else { break };
        let now = clock.now();
        if due > now {
            clock.sleep(due - now);
        }
        if scheduler.pop_due(clock.now()).is_some() {
            session.poll()?;
            polled += 1;
            if polled < args.polls {
                session.schedule_poll(&mut scheduler, clock.now(), interval, ());
            }
        }
    }

    let frame = session.commit_snapshot(&mut scheduler, &args.out)?;
    eprintln!("wrote {} ({} bytes)", args.out.display(), frame.len());
    Ok(())
}
