pub mod process;
pub mod uci;

pub use process::{EngineError, EngineProcess, EngineSpec, EngineTransport};
pub use uci::{decode_line, encode_command, UciError, UciMove};

use serde::Serialize;

/// Commands sent to the engine
#[derive(Debug, Clone)]
pub enum EngineCommand {
    Uci,
    IsReady,
    SetOption {
        name: String,
        value: Option<String>,
    },
    Position {
        base: PositionBase,
        moves: Vec<UciMove>,
    },
    Go(GoLimits),
    Stop,
    Quit,
}

/// Base position a move sequence is applied to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PositionBase {
    Startpos,
    Fen(String),
}

impl PositionBase {
    /// Side to move at the base position, before any moves are applied.
    ///
    /// For FEN this reads the second field; a truncated FEN falls back to
    /// white, matching the engine's own lenient handling.
    pub fn side_to_move(&self) -> PlayerSide {
        match self {
            PositionBase::Startpos => PlayerSide::White,
            PositionBase::Fen(fen) => match fen.split_whitespace().nth(1) {
                Some("b") => PlayerSide::Black,
                _ => PlayerSide::White,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerSide {
    White,
    Black,
}

impl PlayerSide {
    pub fn flip(self) -> Self {
        match self {
            PlayerSide::White => PlayerSide::Black,
            PlayerSide::Black => PlayerSide::White,
        }
    }
}

/// Limits for the "go" command
#[derive(Debug, Clone, Default)]
pub struct GoLimits {
    pub movetime: Option<u64>, // Move time in milliseconds
    pub depth: Option<u8>,     // Search depth
    pub infinite: bool,        // Search until "stop"
}

/// Events received from the engine
#[derive(Debug, Clone, Serialize)]
pub enum EngineEvent {
    /// `id name …` / `id author …` identification line.
    Id {
        name: Option<String>,
        author: Option<String>,
    },
    UciOk,
    ReadyOk,
    /// `option name <n> type <t> …` declaration; `spec` keeps the raw
    /// remainder of the line from `type` onwards.
    OptionDeclared { name: String, spec: String },
    Info(SearchInfo),
    BestMove {
        mv: UciMove,
        ponder: Option<UciMove>,
    },
    /// A line the codec could not make sense of. Reported, never thrown.
    ProtocolError { raw_line: String, reason: String },
}

/// Engine search information from an `info` line
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchInfo {
    pub depth: Option<u32>,
    pub score: Option<Score>,
    pub nodes: Option<u64>,
    pub time_ms: Option<u64>,
    pub nps: Option<u64>,
    pub pv: Vec<UciMove>, // Principal variation
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Score {
    Centipawns(i32),
    Mate(i32), // Negative for being mated
}
