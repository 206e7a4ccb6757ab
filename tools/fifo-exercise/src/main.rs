// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: fifo-exercise CLI (device node, fifod socket or in-process fifod)

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use fifo_exercise::{DeviceFile, Endpoint, Exerciser, ServiceEndpoint};
use fifod::{FifoConfig, FifoService, UnixClient};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Parser, Debug)]
#[command(name = "fifo-exercise", about = "Exercise a FIFO character device")]
struct Cli {
    #[command(flatten)]
    target: Target,

    /// Device capacity the model assumes (and the in-process device is created with).
    #[arg(long, default_value_t = char_fifo::DEFAULT_CAPACITY)]
    capacity: usize,

    /// Node path opened through fifod.
    #[arg(long, default_value = "/dev/fifo")]
    node: String,

    #[command(subcommand)]
    scenario: Scenario,
}

#[derive(Args, Debug)]
#[group(multiple = false)]
struct Target {
    /// Device node opened directly through the filesystem.
    #[arg(long)]
    device: Option<PathBuf>,

    /// fifod Unix socket.
    #[arg(long)]
    socket: Option<PathBuf>,

    /// In-process fifod (default).
    #[arg(long)]
    loopback: bool,
}

#[derive(Subcommand, Debug)]
enum Scenario {
    /// Send a line from stdin and read it back.
    Interactive,
    /// Writes and reads larger than the capacity.
    BruteForce,
    /// Random reads and writes.
    Random {
        #[arg(long, default_value_t = 20)]
        ops: usize,
        #[arg(long, default_value_t = 1100)]
        max_size: usize,
        /// Seed for a reproducible run.
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Zero-length and single-byte requests.
    Empty,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    // Keeps the in-process device alive for the whole run.
    let mut service = None;
    let endpoint: Box<dyn Endpoint> = if let Some(path) = &cli.target.device {
        Box::new(DeviceFile::open(path)?)
    } else if let Some(socket) = &cli.target.socket {
        let transport = UnixClient::connect(socket)
            .with_context(|| format!("failed to connect to {}", socket.display()))?;
        Box::new(ServiceEndpoint::open(transport, &cli.node)?)
    } else {
        if !cli.target.loopback {
            log::debug!("fifo-exercise: no target given, using in-process fifod");
        }
        let mut config = FifoConfig::default();
        config.queue.capacity = cli.capacity;
        config.limits.max_request_len = config.limits.max_request_len.max(cli.capacity);
        let started = FifoService::start(&config)?;
        let (transport, _server) = started.spawn_loopback();
        let node = started.node_path().to_string();
        service = Some(started);
        Box::new(ServiceEndpoint::open(transport, &node)?)
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut ex = Exerciser::new(endpoint, cli.capacity, &mut out);
    match cli.scenario {
        Scenario::Interactive => fifo_exercise::interactive(&mut ex, &mut io::stdin().lock())?,
        Scenario::BruteForce => fifo_exercise::brute_force(&mut ex)?,
        Scenario::Random { ops, max_size, seed } => {
            let seed = seed.unwrap_or_else(rand::random);
            writeln!(ex.out(), "Seed: {seed}")?;
            let mut rng = StdRng::seed_from_u64(seed);
            fifo_exercise::random(&mut ex, ops, max_size, &mut rng)?;
        }
        Scenario::Empty => fifo_exercise::empty(&mut ex)?,
    }
    let report = ex.finish();
    writeln!(out, "End of the program")?;
    drop(out);
    if let Some(service) = service {
        service.shutdown();
    }

    let mismatches = report.mismatches().count();
    if mismatches > 0 {
        eprintln!(
            "fifo-exercise: {mismatches} of {} requests did not match the model",
            report.steps.len()
        );
        std::process::exit(1);
    }
    Ok(())
}
