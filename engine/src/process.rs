use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Child;
use tokio::sync::mpsc;

use crate::uci::{decode_line, encode_command};
use crate::{EngineCommand, EngineEvent};

/// Environment variable naming the engine binary, checked before the
/// well-known install locations.
pub const ENGINE_PATH_ENV: &str = "SPARRING_ENGINE";

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no engine binary found (set SPARRING_ENGINE or install stockfish)")]
    NotFound,
    #[error("failed to spawn engine process: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("engine has no stdin")]
    NoStdin,
    #[error("engine has no stdout")]
    NoStdout,
    #[error("engine process disconnected")]
    Disconnected,
}

/// How to obtain the underlying engine process.
#[derive(Debug, Clone)]
pub enum EngineSpec {
    /// A specific engine binary.
    Binary(PathBuf),
    /// Check `SPARRING_ENGINE`, then common install locations.
    Discover,
}

/// Line-channel pair connecting a handle to an engine execution unit.
///
/// The native backend wires these to the child's stdio; a simulated engine
/// holds the far ends directly.
pub struct EngineTransport {
    /// Lines the handle writes to the engine.
    pub input: mpsc::Sender<String>,
    /// Lines the engine emits.
    pub output: mpsc::Receiver<String>,
}

impl EngineTransport {
    /// Build an in-process transport. Returns the handle-side transport plus
    /// the engine-side endpoints: the receiver sees every line the handle
    /// writes, the sender feeds lines back to the handle.
    pub fn pair(capacity: usize) -> (Self, mpsc::Receiver<String>, mpsc::Sender<String>) {
        let (input_tx, input_rx) = mpsc::channel(capacity);
        let (output_tx, output_rx) = mpsc::channel(capacity);
        (
            Self {
                input: input_tx,
                output: output_rx,
            },
            input_rx,
            output_tx,
        )
    }
}

/// Handle owning exactly one engine execution unit.
///
/// The handle speaks [`EngineCommand`]s and [`EngineEvent`]s; the wire
/// protocol stays inside. On creation it sends the `uci`/`isready` prologue
/// itself and buffers caller commands until the engine has identified
/// itself, so the engine always observes the handshake before any
/// `position`/`go`.
pub struct EngineProcess {
    child: Option<Child>,
    cmd_tx: Option<mpsc::Sender<EngineCommand>>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineProcess {
    /// Spawn a native engine binary with piped stdio.
    #[tracing::instrument(level = "info")]
    pub async fn spawn(spec: &EngineSpec) -> Result<Self, EngineError> {
        let path = match spec {
            EngineSpec::Binary(path) => path.clone(),
            EngineSpec::Discover => discover_engine_path().ok_or(EngineError::NotFound)?,
        };
        tracing::info!("Spawning engine: {}", path.display());

        let mut child = tokio::process::Command::new(&path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(EngineError::Spawn)?;

        let mut stdin = child.stdin.take().ok_or(EngineError::NoStdin)?;
        let stdout = child.stdout.take().ok_or(EngineError::NoStdout)?;

        let (input_tx, mut input_rx) = mpsc::channel::<String>(32);
        let (output_tx, output_rx) = mpsc::channel::<String>(32);

        // Stdin writer task
        tokio::spawn(async move {
            while let Some(line) = input_rx.recv().await {
                if let Err(e) = stdin.write_all(line.as_bytes()).await {
                    tracing::error!("Failed to write to engine stdin: {}", e);
                    break;
                }
                if let Err(e) = stdin.write_all(b"\n").await {
                    tracing::error!("Failed to write to engine stdin: {}", e);
                    break;
                }
                if let Err(e) = stdin.flush().await {
                    tracing::error!("Failed to flush engine stdin: {}", e);
                    break;
                }
            }
            tracing::debug!("Stdin writer task exiting");
        });

        // Stdout reader task
        tokio::spawn(async move {
            let mut reader = BufReader::new(stdout);
            let mut line = String::new();
            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => {
                        tracing::warn!("Engine stdout EOF - engine closed");
                        break;
                    }
                    Ok(_) => {
                        if output_tx.send(line.trim().to_string()).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!("Error reading from engine stdout: {}", e);
                        break;
                    }
                }
            }
            tracing::debug!("Stdout reader task exiting");
        });

        Ok(Self::attach(
            EngineTransport {
                input: input_tx,
                output: output_rx,
            },
            Some(child),
        ))
    }

    /// Wrap a pre-wired transport (simulated or in-process engines).
    pub fn from_transport(transport: EngineTransport) -> Self {
        Self::attach(transport, None)
    }

    fn attach(transport: EngineTransport, child: Option<Child>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel::<EngineCommand>(32);
        let (event_tx, event_rx) = mpsc::channel::<EngineEvent>(32);

        tokio::spawn(run_pump(transport, cmd_rx, event_tx));

        Self {
            child,
            cmd_tx: Some(cmd_tx),
            event_rx,
        }
    }

    /// Queue a command for the engine.
    ///
    /// Commands queued before the handshake completes are flushed in FIFO
    /// order once the engine identifies itself.
    pub async fn send(&self, cmd: EngineCommand) -> Result<(), EngineError> {
        let cmd_tx = self.cmd_tx.as_ref().ok_or(EngineError::Disconnected)?;
        cmd_tx.send(cmd).await.map_err(|_| EngineError::Disconnected)
    }

    /// Receive the next engine event. Returns `None` once the engine has
    /// exited or the handle was terminated. Events arrive in the order the
    /// engine emitted them.
    pub async fn recv_event(&mut self) -> Option<EngineEvent> {
        self.event_rx.recv().await
    }

    /// Release the engine unconditionally. Idempotent; safe to call before
    /// the engine ever became ready. A `quit` is offered best-effort but
    /// nothing waits for the engine to acknowledge it.
    pub fn terminate(&mut self) {
        if let Some(cmd_tx) = self.cmd_tx.take() {
            let _ = cmd_tx.try_send(EngineCommand::Quit);
        }
        if let Some(mut child) = self.child.take() {
            tracing::debug!("Killing engine process");
            let _ = child.start_kill();
        }
    }
}

/// The message pump: encodes outgoing commands, decodes incoming lines, and
/// holds back caller commands until the engine has spoken.
async fn run_pump(
    transport: EngineTransport,
    mut cmd_rx: mpsc::Receiver<EngineCommand>,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    let EngineTransport {
        input: line_tx,
        output: mut line_rx,
    } = transport;

    // Handshake prologue, ahead of anything the caller queues.
    for cmd in [EngineCommand::Uci, EngineCommand::IsReady] {
        let line = encode_command(&cmd);
        tracing::trace!("UCI >> {}", line);
        if line_tx.send(line).await.is_err() {
            tracing::warn!("Engine closed before handshake prologue");
            return;
        }
    }

    let mut ready = false;
    let mut held: VecDeque<EngineCommand> = VecDeque::new();

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    None => break,
                    Some(EngineCommand::Quit) => {
                        tracing::trace!("UCI >> quit");
                        let _ = line_tx.send(encode_command(&EngineCommand::Quit)).await;
                        break;
                    }
                    Some(cmd) if !ready => {
                        tracing::debug!("Holding command until engine is ready: {:?}", cmd);
                        held.push_back(cmd);
                    }
                    Some(cmd) => {
                        if send_line(&line_tx, &cmd).await.is_err() {
                            break;
                        }
                    }
                }
            }

            line = line_rx.recv() => {
                match line {
                    None => {
                        tracing::warn!("Engine output channel closed");
                        break;
                    }
                    Some(line) => {
                        tracing::trace!("UCI << {}", line);
                        let event = decode_line(&line);
                        if !ready
                            && matches!(
                                event,
                                EngineEvent::Id { .. } | EngineEvent::UciOk | EngineEvent::ReadyOk
                            )
                        {
                            ready = true;
                            while let Some(cmd) = held.pop_front() {
                                if send_line(&line_tx, &cmd).await.is_err() {
                                    return;
                                }
                            }
                        }
                        if event_tx.send(event).await.is_err() {
                            break;
                        }
                    }
                }
            }
        }
    }
    tracing::debug!("Engine pump exiting");
}

async fn send_line(
    line_tx: &mpsc::Sender<String>,
    cmd: &EngineCommand,
) -> Result<(), mpsc::error::SendError<String>> {
    let line = encode_command(cmd);
    tracing::trace!("UCI >> {}", line);
    line_tx.send(line).await
}

/// Find an engine executable in common locations.
fn discover_engine_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(ENGINE_PATH_ENV) {
        return Some(PathBuf::from(path));
    }

    let candidates = [
        "/usr/local/bin/stockfish",
        "/usr/bin/stockfish",
        "/opt/homebrew/bin/stockfish",
        "/usr/games/stockfish",
        "stockfish", // In PATH
    ];

    for path_str in candidates {
        if Path::new(path_str).exists() || path_str == "stockfish" {
            return Some(PathBuf::from(path_str));
        }
    }

    None
}
