use serde::Serialize;

use sparring_engine::SearchInfo;

use super::snapshot::SessionSnapshot;

/// Events broadcast from the session actor to all subscribers.
#[derive(Debug, Clone, Serialize)]
#[allow(clippy::large_enum_variant)]
pub enum SessionEvent {
    /// Full state snapshot after any mutation.
    StateChanged(SessionSnapshot),
    /// Transient engine analysis (frequent, lightweight).
    Thinking(SearchInfo),
    /// A line from the engine the codec could not decode. The session
    /// carries on; subscribers may want to surface it.
    Protocol { raw_line: String, reason: String },
    /// Non-fatal fault notification.
    Error(String),
}
