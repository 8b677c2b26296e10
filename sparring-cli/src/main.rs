//! Sparring CLI — a line-driven practice session against a UCI engine.
//!
//! Reads moves in coordinate notation from stdin, one per line, and prints
//! the engine's replies. The session core does the protocol work; this
//! binary is just the wiring: engine discovery, logging bootstrap, and a
//! stdin loop.

use std::path::{Path, PathBuf};

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::{wrappers::BroadcastStream, StreamExt};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sparring_engine::{EngineSpec, PositionBase, Score};
use sparring_session::{
    SessionConfig, SessionError, SessionEvent, SessionManager, SessionPhase,
};

/// Practice against a UCI engine, one move per line.
#[derive(Parser)]
#[command(name = "sparring", about = "Practice against a UCI engine, one move per line")]
struct Cli {
    /// Path to the engine binary. When omitted, $SPARRING_ENGINE and common
    /// stockfish install locations are checked.
    #[arg(long)]
    engine: Option<PathBuf>,

    /// FEN to start from instead of the standard starting position.
    #[arg(long)]
    fen: Option<String>,

    /// Engine move-time budget in milliseconds.
    #[arg(long, default_value_t = 1000)]
    movetime: u64,

    /// Emit session events as JSON lines instead of human-readable output.
    #[arg(long)]
    json: bool,

    /// Directory for debug logs.
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing(&cli.log_dir);

    tracing::info!("Sparring CLI starting up");

    let config = SessionConfig {
        engine: cli
            .engine
            .clone()
            .map(EngineSpec::Binary)
            .unwrap_or(EngineSpec::Discover),
        base: cli
            .fen
            .clone()
            .map(PositionBase::Fen)
            .unwrap_or(PositionBase::Startpos),
        move_time_ms: cli.movetime,
        ..SessionConfig::default()
    };

    let manager = SessionManager::new();
    let handle = manager.create_session(config).await?;
    let (snapshot, mut events) = handle.subscribe().await?;

    // Wait out the handshake before accepting input
    if snapshot.phase != SessionPhase::Ready {
        loop {
            match events.recv().await {
                Ok(SessionEvent::StateChanged(snap)) => match snap.phase {
                    SessionPhase::Ready => break,
                    SessionPhase::Ended(reason) => {
                        anyhow::bail!("engine never became ready: {:?}", reason)
                    }
                    _ => {}
                },
                Ok(_) => {}
                Err(_) => anyhow::bail!("session closed during startup"),
            }
        }
    }

    let printer = tokio::spawn(print_events(events, cli.json));

    if !cli.json {
        println!("Engine ready. Enter moves like e2e4; 'quit' ends the session.");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == "quit" {
            break;
        }

        match handle.submit_move(input).await {
            Ok(reply) => {
                if !cli.json {
                    println!("engine plays {}", reply.mv);
                }
            }
            Err(e @ (SessionError::InvalidMove(_) | SessionError::SessionBusy)) => {
                eprintln!("{}", e);
            }
            Err(e) => {
                eprintln!("session error: {}", e);
                break;
            }
        }
    }

    manager.end_session(handle.id()).await.ok();
    printer.abort();

    tracing::info!("Sparring CLI shutting down");
    Ok(())
}

/// Forward session broadcasts to the terminal.
async fn print_events(
    events: tokio::sync::broadcast::Receiver<SessionEvent>,
    json: bool,
) {
    let mut stream = BroadcastStream::new(events);
    while let Some(item) = stream.next().await {
        let event = match item {
            Ok(event) => event,
            // Lagging just drops old events; keep going
            Err(_) => continue,
        };

        if json {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{}", line),
                Err(e) => tracing::error!("Failed to serialize event: {}", e),
            }
            continue;
        }

        match event {
            SessionEvent::Thinking(info) => {
                let score = match info.score {
                    Some(Score::Centipawns(cp)) => format!("{:+.2}", f64::from(cp) / 100.0),
                    Some(Score::Mate(m)) => format!("mate {}", m),
                    None => "?".to_string(),
                };
                tracing::debug!(
                    depth = ?info.depth,
                    %score,
                    nodes = ?info.nodes,
                    "Engine thinking"
                );
            }
            SessionEvent::Protocol { raw_line, reason } => {
                eprintln!("engine protocol noise ({}): {}", reason, raw_line);
            }
            SessionEvent::Error(message) => {
                eprintln!("engine error: {}", message);
            }
            SessionEvent::StateChanged(_) => {}
        }
    }
}

/// Set up tracing with file output in the logs directory.
fn init_tracing(log_dir: &Path) -> tracing_appender::non_blocking::WorkerGuard {
    std::fs::create_dir_all(log_dir).ok();
    let file_appender = tracing_appender::rolling::daily(log_dir, "sparring");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    guard
}
