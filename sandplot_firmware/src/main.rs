//! # Sandplot Firmware Simulator
//!
//! Runs the plotter control core against simulated hardware: a byte script
//! (a canned demo, or a raw protocol capture from `--script`) is fed
//! gradually into the loopback transport while the cooperative loop ticks
//! at the configured interval. Response frames and final axis positions are
//! logged, which makes this binary double as a smoke test for the whole
//! parser → queue → motion pipeline.

use clap::Parser;
use sandplot_common::config::{FirmwareConfig, load_config};
use sandplot_common::hal::Axis;
use sandplot_common::wire::{HEADER, Opcode};
use sandplot_firmware::firmware::Firmware;
use sandplot_firmware::sim::{LoopbackTransport, sim_rig};
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tracing::{Level, debug, error, info};
use tracing_subscriber::EnvFilter;

/// Sandplot firmware simulator — two-axis plotter control core
#[derive(Parser, Debug)]
#[command(name = "sandplot_firmware")]
#[command(version)]
#[command(about = "Byte-protocol parser + motion controller simulator")]
struct Args {
    /// Path to the firmware configuration TOML.
    #[arg(long, default_value = "config/firmware.toml")]
    config: PathBuf,

    /// Raw protocol byte script to play; a built-in demo runs otherwise.
    #[arg(long)]
    script: Option<PathBuf>,

    /// Simulated carriage start distance from the endstop [steps].
    #[arg(long, default_value_t = 120)]
    start_r: i32,

    /// Abort after this many ticks even if motion has not settled.
    #[arg(long, default_value_t = 200_000)]
    max_ticks: u64,

    /// Host→firmware bytes delivered per tick (exercises partial frames).
    #[arg(long, default_value_t = 16)]
    bytes_per_tick: usize,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    setup_tracing(&args);

    info!("sandplot firmware v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&args) {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("sandplot firmware shutdown complete");
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&args.config)?;
    info!(
        "Config OK: r=[{}, {}] steps, home offset {}, tick={}µs",
        config.r_min_steps, config.r_max_steps, config.r_home_offset_steps, config.tick_interval_us,
    );

    let script = match &args.script {
        Some(path) => std::fs::read(path)?,
        None => build_demo_script(&config),
    };
    info!("Playing {} script bytes", script.len());

    let (steppers, endstop) = sim_rig(args.start_r);
    let mut fw = Firmware::new(&config, LoopbackTransport::new(), steppers, endstop);

    let tick_interval = Duration::from_micros(config.tick_interval_us);
    let mut cursor = 0usize;

    loop {
        // Stream only once boot homing has established the origin, the way
        // a real host waits for the machine before sending a pattern.
        if cursor < script.len() && fw.motion().is_homed() {
            let end = (cursor + args.bytes_per_tick).min(script.len());
            cursor += fw.transport_mut().push_bytes(&script[cursor..end]);
        }

        fw.tick();

        let responses = fw.transport_mut().take_tx();
        if !responses.is_empty() {
            log_responses(&responses);
        }

        if cursor >= script.len() && fw.is_settled() {
            break;
        }
        if fw.stats().ticks >= args.max_ticks {
            error!("tick budget exhausted before motion settled");
            break;
        }

        std::thread::sleep(tick_interval);
    }

    let stats = fw.stats();
    info!(
        "Done: {} ticks, {} commands, {} targets, final r={} phi={}",
        stats.ticks,
        fw.parser().commands_completed(),
        stats.targets_drained,
        fw.motion().steppers().position(Axis::R),
        fw.motion().steppers().position(Axis::Phi),
    );

    Ok(())
}

/// A short host session: home, set a working speed, queue a spiral-ish set
/// of targets (including one beyond the radial limit to show clamping),
/// query the queue depth, then start.
fn build_demo_script(config: &FirmwareConfig) -> Vec<u8> {
    let mut script = Vec::new();
    let mut frame = |opcode: Opcode, payload: &[u8]| {
        script.extend_from_slice(&HEADER);
        script.push(opcode.wire());
        script.extend_from_slice(payload);
    };

    frame(Opcode::Home, &[]);
    frame(Opcode::Speed, &500u16.to_be_bytes());

    let quarter_turn: i32 = 400;
    let targets = [
        (config.r_max_steps / 4, quarter_turn),
        (config.r_max_steps / 2, quarter_turn),
        (config.r_max_steps + 500, quarter_turn), // clamps to r_max
        (config.r_min_steps, -quarter_turn),
    ];
    for (r, phi) in targets {
        let mut payload = [0u8; 8];
        payload[..4].copy_from_slice(&r.to_be_bytes());
        payload[4..].copy_from_slice(&phi.to_be_bytes());
        frame(Opcode::Position, &payload);
    }

    frame(Opcode::QueryQueueDepth, &[]);
    frame(Opcode::Start, &[]);
    script
}

/// Decode and log the response frames drained from the transport.
fn log_responses(bytes: &[u8]) {
    let mut i = 0;
    while i + 2 < bytes.len() {
        if bytes[i] != HEADER[0] || bytes[i + 1] != HEADER[1] {
            i += 1;
            continue;
        }
        let opcode = Opcode::from_wire(bytes[i + 2]);
        match opcode {
            Some(Opcode::QueueDepthReply) if i + 3 < bytes.len() => {
                info!(depth = bytes[i + 3], "response: queue depth");
                i += 4;
            }
            Some(op) => {
                debug!(?op, "response");
                i += 3;
            }
            None => {
                i += 3;
            }
        }
    }
}

/// Setup tracing subscriber based on CLI arguments.
fn setup_tracing(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
