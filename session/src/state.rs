use tokio::sync::oneshot;
use tokio::time::Instant;

use sparring_engine::{
    EngineCommand, EngineProcess, GoLimits, PlayerSide, PositionBase, SearchInfo, UciMove,
};

use super::commands::{EngineMove, SessionError};
use super::config::SessionConfig;
use super::snapshot::{EndReason, SessionPhase, SessionSnapshot};
use super::timer::MoveTimer;

/// The position under discussion: a base plus the moves played since.
///
/// The side to move is derived, never stored — it follows from the base
/// side and the parity of the move count.
#[derive(Debug, Clone)]
pub(crate) struct Position {
    base: PositionBase,
    moves: Vec<UciMove>,
}

impl Position {
    pub fn new(base: PositionBase) -> Self {
        Self {
            base,
            moves: Vec::new(),
        }
    }

    pub fn push(&mut self, mv: UciMove) {
        self.moves.push(mv);
    }

    pub fn moves(&self) -> &[UciMove] {
        &self.moves
    }

    pub fn side_to_move(&self) -> PlayerSide {
        let side = self.base.side_to_move();
        if self.moves.len() % 2 == 1 {
            side.flip()
        } else {
            side
        }
    }

    /// The `position` command describing this position, with `extra`
    /// appended to the move list.
    pub fn to_command_with(&self, extra: &UciMove) -> EngineCommand {
        let mut moves = self.moves.clone();
        moves.push(extra.clone());
        EngineCommand::Position {
            base: self.base.clone(),
            moves,
        }
    }
}

/// Internal mutable state, owned entirely by the session actor. No locks.
pub(crate) struct SessionState {
    pub session_id: String,
    pub phase: SessionPhase,
    pub position: Position,
    pub engine: Option<EngineProcess>,
    pub last_best_move: Option<UciMove>,
    pub analysis: Option<SearchInfo>,
    pub timer: MoveTimer,
    move_time_ms: u64,
    handshake_timeout_ms: u64,
    options: Vec<super::config::EngineOption>,
    saw_identification: bool,
    saw_ready_ok: bool,
    pending_reply: Option<oneshot::Sender<Result<EngineMove, SessionError>>>,
}

impl SessionState {
    pub fn new(session_id: String, config: &SessionConfig) -> Self {
        Self {
            session_id,
            phase: SessionPhase::Idle,
            position: Position::new(config.base.clone()),
            engine: None,
            last_best_move: None,
            analysis: None,
            timer: MoveTimer::new(config.move_time_ms, config.grace_ms),
            move_time_ms: config.move_time_ms,
            handshake_timeout_ms: config.handshake_timeout_ms,
            options: config.options.clone(),
            saw_identification: false,
            saw_ready_ok: false,
            pending_reply: None,
        }
    }

    /// Attach a launched engine process; the handshake wait starts here.
    pub fn attach_engine(&mut self, engine: EngineProcess) {
        self.engine = Some(engine);
        self.phase = SessionPhase::Initializing;
    }

    pub fn handshake_timeout_ms(&self) -> u64 {
        self.handshake_timeout_ms
    }

    /// Build a full snapshot of the current state.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id.clone(),
            phase: self.phase,
            base: self.position.base.clone(),
            moves: self.position.moves().to_vec(),
            side_to_move: self.position.side_to_move(),
            last_best_move: self.last_best_move.clone(),
            thinking: self.phase == SessionPhase::Thinking,
            analysis: self.analysis.clone(),
        }
    }

    /// Try to receive the next engine event.
    pub async fn next_engine_event(&mut self) -> Option<sparring_engine::EngineEvent> {
        match self.engine.as_mut() {
            Some(engine) => engine.recv_event().await,
            None => std::future::pending().await,
        }
    }

    /// Forward configured options to the engine. The process handle holds
    /// them back until the handshake completes, so ordering is preserved.
    pub async fn send_configured_options(&mut self) {
        let Some(engine) = self.engine.as_ref() else {
            return;
        };
        for opt in &self.options {
            let result = engine
                .send(EngineCommand::SetOption {
                    name: opt.name.clone(),
                    value: opt.value.clone(),
                })
                .await;
            if result.is_err() {
                tracing::warn!("Engine closed while forwarding options");
                break;
            }
        }
    }

    /// Record one half of the handshake. Returns true if the session just
    /// became `Ready`.
    pub fn on_identification(&mut self) -> bool {
        self.saw_identification = true;
        self.try_complete_handshake()
    }

    /// Record `readyok`. Returns true if the session just became `Ready`.
    pub fn on_ready_ok(&mut self) -> bool {
        self.saw_ready_ok = true;
        self.try_complete_handshake()
    }

    fn try_complete_handshake(&mut self) -> bool {
        if self.phase == SessionPhase::Initializing && self.saw_identification && self.saw_ready_ok
        {
            tracing::info!("Engine handshake complete");
            self.phase = SessionPhase::Ready;
            true
        } else {
            false
        }
    }

    /// Submit the caller's move and start the engine searching for a reply.
    ///
    /// On any error the position is left untouched.
    pub async fn submit_move(&mut self, mv: UciMove) -> Result<(), SessionError> {
        match self.phase {
            SessionPhase::Ready => {}
            SessionPhase::Thinking => return Err(SessionError::SessionBusy),
            SessionPhase::Idle | SessionPhase::Initializing => {
                return Err(SessionError::NotReady)
            }
            SessionPhase::Ended(_) => return Err(SessionError::SessionEnded),
        }

        let engine = self
            .engine
            .as_ref()
            .ok_or_else(|| SessionError::Internal("no engine attached".to_string()))?;

        engine
            .send(self.position.to_command_with(&mv))
            .await
            .map_err(|e| SessionError::Internal(e.to_string()))?;
        engine
            .send(EngineCommand::Go(GoLimits {
                movetime: Some(self.move_time_ms),
                ..Default::default()
            }))
            .await
            .map_err(|e| SessionError::Internal(e.to_string()))?;

        self.position.push(mv);
        self.analysis = None;
        self.phase = SessionPhase::Thinking;
        self.timer.arm(Instant::now());
        Ok(())
    }

    /// Park the caller until the engine answers the outstanding search.
    pub fn park_reply(&mut self, reply: oneshot::Sender<Result<EngineMove, SessionError>>) {
        self.pending_reply = Some(reply);
    }

    /// Apply the engine's reply. Returns false if no search was outstanding
    /// (a stray `bestmove`, e.g. after a late `stop`).
    pub fn apply_best_move(&mut self, mv: UciMove, ponder: Option<UciMove>) -> bool {
        if self.phase != SessionPhase::Thinking {
            return false;
        }

        self.timer.disarm();
        self.position.push(mv.clone());
        self.last_best_move = Some(mv.clone());
        self.phase = SessionPhase::Ready;
        if let Some(reply) = self.pending_reply.take() {
            let _ = reply.send(Ok(EngineMove { mv, ponder }));
        }
        true
    }

    /// Move to the terminal phase, settling any parked caller.
    pub fn end(&mut self, reason: EndReason) {
        if matches!(self.phase, SessionPhase::Ended(_)) {
            return;
        }
        tracing::info!(?reason, "Session ended");
        self.phase = SessionPhase::Ended(reason);
        self.timer.disarm();
        if let Some(reply) = self.pending_reply.take() {
            let _ = reply.send(Err(match reason {
                EndReason::HandshakeTimeout => SessionError::HandshakeTimeout,
                EndReason::EngineTimeout => SessionError::EngineTimeout,
                EndReason::EngineExited => {
                    SessionError::Internal("engine process exited".to_string())
                }
                EndReason::Terminated => SessionError::SessionEnded,
            }));
        }
    }

    /// Release the engine once the session is over. Idempotent.
    pub fn shutdown_engine_if_ended(&mut self) {
        if matches!(self.phase, SessionPhase::Ended(_)) {
            if let Some(mut engine) = self.engine.take() {
                engine.terminate();
            }
        }
    }

    /// Whether the actor's tick loop has anything to watch.
    pub fn needs_clock(&self) -> bool {
        self.phase == SessionPhase::Initializing || self.timer.is_running()
    }
}
