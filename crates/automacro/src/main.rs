//! Binary entrypoint for automacro.
use std::{
    io,
    path::{Path, PathBuf},
    process,
    sync::Arc,
    time::Duration,
};

use clap::{Parser, Subcommand};
use config::{load_from_path, resolve_config_path};
use logging::LogArgs;
use macro_engine::{EdgeRouter, Engine, TracingInjector};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    runtime::{Builder, Handle},
    signal,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, prelude::*};

/// Stdin line protocol.
mod events;

use crate::events::{Command as Line, parse_line};

#[derive(Parser, Debug)]
#[command(
    name = "automacro",
    about = "Replay keyboard and mouse macros bound to physical input",
    version,
    after_help = "Hotkeys:\n  Ctrl+Shift+X  pause/resume event handling and running loops"
)]
/// Command-line interface for the `automacro` binary.
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Logging controls
    #[command(flatten)]
    log: LogArgs,
}

#[derive(Subcommand, Debug)]
/// Top-level CLI subcommands.
enum Command {
    /// Load a binding table and feed it input events read from stdin.
    Run {
        /// Path to the JSON binding table
        config: PathBuf,
    },
    /// Load and validate the configuration then exit.
    Check {
        /// Path to configuration file to check (defaults to ~/.automacro/config.json)
        path: Option<PathBuf>,

        /// Dump the parsed configuration as JSON to stdout
        #[arg(long)]
        dump: bool,
    },
}

/// Grace period for runtime teardown once the engine has shut down.
/// Covers the blocking stdin reader, which cannot be interrupted.
const RUNTIME_TEARDOWN: Duration = Duration::from_millis(200);

fn main() {
    let cli = Cli::parse();

    let env_filter = logging::env_filter_from_spec(&cli.log.spec());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().without_time().with_writer(io::stderr))
        .try_init()
        .ok();

    match cli.command {
        Command::Check { path, dump } => check(path.as_deref(), dump),
        Command::Run { config } => run(&config),
    }
}

fn check(path: Option<&Path>, dump: bool) {
    let resolved = match resolve_config_path(path) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{}", e.pretty());
            process::exit(1);
        }
    };
    let table = match load_from_path(&resolved) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("{}", e.pretty());
            process::exit(1);
        }
    };
    if dump {
        match table.to_json_pretty() {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("{}", e.pretty());
                process::exit(1);
            }
        }
    } else {
        println!("OK ({} triggers)", table.len());
    }
}

fn run(path: &Path) {
    let table = match load_from_path(path) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("{}", e.pretty());
            process::exit(1);
        }
    };

    let rt = match Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            error!("failed to start runtime: {}", e);
            process::exit(1);
        }
    };

    rt.block_on(async move {
        let engine = Engine::new(table, Arc::new(TracingInjector), Handle::current());
        info!("Ctrl+Shift+X pauses/resumes event handling");

        let input_done = CancellationToken::new();
        let listener = tokio::spawn(listen(engine.clone(), input_done.clone()));
        if let Err(e) = engine.register_listener(listener) {
            error!("{}", e);
        }

        tokio::select! {
            res = signal::ctrl_c() => {
                if let Err(e) = res {
                    warn!("failed to wait for Ctrl-C: {}", e);
                }
                info!("interrupted");
            }
            _ = input_done.cancelled() => debug!("input_closed"),
        }
        engine.shutdown().await;
    });
    rt.shutdown_timeout(RUNTIME_TEARDOWN);
}

/// Read stdin lines and route them into `engine` until EOF, `quit`, or shutdown.
async fn listen(engine: Engine, done: CancellationToken) {
    let stop = engine.shutdown_token();
    let mut router = EdgeRouter::new(engine);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = stop.cancelled() => break,
            line = lines.next_line() => line,
        };
        match line {
            Ok(Some(line)) => match parse_line(&line) {
                Ok(Some(Line::Input(ev))) => {
                    router.handle(&ev);
                }
                Ok(Some(Line::Pause)) => router.engine().on_pause_chord(),
                Ok(Some(Line::Quit)) => break,
                Ok(None) => {}
                Err(msg) => warn!("{}", msg),
            },
            Ok(None) => break,
            Err(e) => {
                warn!("stdin read failed: {}", e);
                break;
            }
        }
    }
    done.cancel();
}
