use sparring_engine::{EngineSpec, PositionBase};

/// Per-session configuration. One config, one engine, one conversation.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How to obtain the engine process.
    pub engine: EngineSpec,
    /// Position the session starts from.
    pub base: PositionBase,
    /// Engine move-time budget in milliseconds.
    pub move_time_ms: u64,
    /// How long to wait for the engine handshake before giving up.
    pub handshake_timeout_ms: u64,
    /// Grace window after `stop` before the engine is declared unresponsive.
    pub grace_ms: u64,
    /// Options forwarded to the engine right after launch.
    pub options: Vec<EngineOption>,
}

#[derive(Debug, Clone)]
pub struct EngineOption {
    pub name: String,
    pub value: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            engine: EngineSpec::Discover,
            base: PositionBase::Startpos,
            move_time_ms: 1000,
            handshake_timeout_ms: 5000,
            grace_ms: 500,
            options: Vec::new(),
        }
    }
}
