use tokio::sync::{broadcast, oneshot};

use sparring_engine::UciMove;

use super::events::SessionEvent;
use super::snapshot::SessionSnapshot;

#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    #[error("Engine unavailable: {0}")]
    EngineUnavailable(String),
    #[error("Engine handshake timed out")]
    HandshakeTimeout,
    #[error("A move is already being calculated")]
    SessionBusy,
    #[error("Session is still initializing")]
    NotReady,
    #[error("Engine exceeded its move time")]
    EngineTimeout,
    #[error("Session has ended")]
    SessionEnded,
    #[error("Invalid move: {0}")]
    InvalidMove(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

/// The engine's reply to a submitted move.
#[derive(Debug, Clone)]
pub struct EngineMove {
    pub mv: UciMove,
    pub ponder: Option<UciMove>,
}

/// Commands sent to the session actor. Each embeds a oneshot for the reply.
///
/// `SubmitMove` replies only once the engine answers (or the session gives
/// up on it) — the sender parks until then.
pub enum SessionCommand {
    SubmitMove {
        mv: UciMove,
        reply: oneshot::Sender<Result<EngineMove, SessionError>>,
    },
    GetSnapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    Subscribe {
        reply: oneshot::Sender<(SessionSnapshot, broadcast::Receiver<SessionEvent>)>,
    },
    Shutdown,
}
