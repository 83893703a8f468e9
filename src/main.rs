//! thermalctl: simulation entry point.
//!
//! Runs the control core against a simulated FPGA and an in-process
//! command channel.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │  LoopbackChannel ──▶ subscriber ──┐                       │
//! │                                   ▼                       │
//! │  PeriodicTicker ──▶ outer-loop ──▶ CommandQueue           │
//! │                                   │                       │
//! │                                   ▼                       │
//! │                    controller (NodeService) ──▶ SimulatedFpga
//! │                                   │                       │
//! │                                   └──▶ LogEventSink        │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! Further requests are read from stdin, one JSON object per line.
//!
//! ```bash
//! thermalctl --run-secs 5 -v
//! thermalctl --config node.json --no-auto-enable
//! echo '{"name": "exitControl"}' | thermalctl --run-secs 0 --no-auto-enable
//! ```

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{LevelFilter, info, warn};
use serde_json::json;

use thermalctl::Node;
use thermalctl::adapters::log_sink::LogEventSink;
use thermalctl::adapters::loopback::LoopbackChannel;
use thermalctl::adapters::sim_fpga::SimulatedFpga;
use thermalctl::app::ack::Ack;
use thermalctl::app::commands::CommandName;
use thermalctl::config::NodeConfig;
use thermalctl::threads::{StopToken, spawn_named};

const ACK_WAIT: Duration = Duration::from_secs(2);
const EXIT_POLL: Duration = Duration::from_millis(100);

/// Thermal controller node (simulated hardware)
#[derive(Parser, Debug)]
#[command(name = "thermalctl", version, about, long_about = None)]
struct Args {
    /// JSON configuration file; defaults are used when omitted
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Seconds to run before shutting down; 0 runs until exitControl
    /// arrives on stdin or stdin closes
    #[arg(long, default_value_t = 5)]
    run_secs: u64,

    /// Settings name passed to `start`
    #[arg(long, default_value = "Default")]
    settings: String,

    /// Do not send start/enable at boot
    #[arg(long)]
    no_auto_enable: bool,

    /// Increase verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    // Let everything through env_logger; `setLogLevel` adjusts the global max.
    env_logger::Builder::from_default_env()
        .filter_level(LevelFilter::Trace)
        .format_timestamp_millis()
        .init();
    log::set_max_level(level);
}

fn send(channel: &LoopbackChannel, name: CommandName, params: serde_json::Value) -> Result<()> {
    let id = channel.submit(name, params);
    match channel.wait_terminal(id, ACK_WAIT) {
        Some(Ack::Complete) => {
            info!("{} #{} complete", name, id);
            Ok(())
        }
        Some(Ack::Failed { code, message }) => bail!("{name} #{id} failed ({code}): {message}"),
        Some(Ack::InProgress) | None => bail!("{name} #{id}: no terminal ack within {ACK_WAIT:?}"),
    }
}

/// Submit each stdin line as a request.  Raises `closed` at end of input.
fn read_requests(channel: &LoopbackChannel, closed: &StopToken) {
    for line in std::io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("stdin: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match channel.submit_line(&line) {
            Ok((id, name)) => match channel.wait_terminal(id, ACK_WAIT) {
                Some(ack) => info!("{} #{}: {:?}", name, id, ack),
                None => warn!("{} #{}: no terminal ack within {:?}", name, id, ACK_WAIT),
            },
            Err(e) => warn!("stdin: rejected request: {}", e),
        }
    }
    info!("stdin closed");
    closed.cancel();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    info!("thermalctl v{}", env!("CARGO_PKG_VERSION"));

    let config = match &args.config {
        Some(path) => NodeConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => NodeConfig::default(),
    };

    let channel = Arc::new(LoopbackChannel::new());
    let node = Node::start(
        &config,
        SimulatedFpga::new(),
        Arc::clone(&channel),
        LogEventSink::new(),
    )
    .context("starting node")?;

    if !args.no_auto_enable {
        send(
            &channel,
            CommandName::Start,
            json!({ "settingsToApply": args.settings }),
        )?;
        send(&channel, CommandName::Enable, serde_json::Value::Null)?;
    }

    let input_closed = StopToken::new();
    {
        let channel = Arc::clone(&channel);
        let closed = input_closed.clone();
        // Never joined; the read blocks until input arrives.
        spawn_named("stdin", move || read_requests(&channel, &closed))
            .context("spawning stdin reader")?;
    }

    if args.run_secs == 0 {
        info!("Waiting for exitControl or end of input");
        while !node.wait_for_exit_timeout(EXIT_POLL) {
            if input_closed.is_cancelled() {
                break;
            }
        }
    } else if node.wait_for_exit_timeout(Duration::from_secs(args.run_secs)) {
        info!("exitControl received");
    } else {
        info!("Run time elapsed");
    }

    let metrics = node.metrics();
    match serde_json::to_string(&metrics) {
        Ok(json) => info!("Metrics: {}", json),
        Err(e) => warn!("Metrics: encode failed: {}", e),
    }

    let service = node.shutdown().context("shutting down")?;
    info!(
        "Stopped in {} after {} update cycles",
        service.state(),
        service.update_count()
    );
    Ok(())
}
