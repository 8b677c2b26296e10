use serde::Serialize;

use sparring_engine::{PlayerSide, PositionBase, SearchInfo, UciMove};

/// Complete, immutable snapshot of session state.
/// Sent to subscribers on every state change and on subscribe.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub phase: SessionPhase,
    pub base: PositionBase,
    pub moves: Vec<UciMove>,
    pub side_to_move: PlayerSide,
    pub last_best_move: Option<UciMove>,
    pub thinking: bool,
    pub analysis: Option<SearchInfo>,
}

/// Session lifecycle. `Ended` is terminal; only snapshot reads survive it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// No engine attached yet.
    Idle,
    /// Engine launched, handshake outstanding.
    Initializing,
    /// Handshake complete, no search running.
    Ready,
    /// A `go` is outstanding.
    Thinking,
    Ended(EndReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    HandshakeTimeout,
    EngineTimeout,
    EngineExited,
    Terminated,
}
