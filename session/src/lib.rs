pub mod actor;
pub mod commands;
pub mod config;
pub mod events;
pub mod handle;
pub mod snapshot;
pub mod state;
pub mod timer;

use std::collections::HashMap;

use tokio::sync::{broadcast, mpsc, RwLock};
use uuid::Uuid;

use sparring_engine::EngineProcess;

use actor::run_session_actor;
pub use commands::{EngineMove, SessionError};
pub use config::{EngineOption, SessionConfig};
pub use events::SessionEvent;
pub use handle::SessionHandle;
pub use snapshot::{EndReason, SessionPhase, SessionSnapshot};
use state::SessionState;

/// Manages all active sessions. Spawns an actor task per session.
///
/// Every session is an independent actor plus its own engine process;
/// concurrent sessions never share state.
pub struct SessionManager {
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Launch an engine per the config and start a session around it.
    ///
    /// If the engine cannot be launched the error surfaces here and no
    /// session is registered.
    pub async fn create_session(
        &self,
        config: SessionConfig,
    ) -> Result<SessionHandle, SessionError> {
        let engine = EngineProcess::spawn(&config.engine)
            .await
            .map_err(|e| SessionError::EngineUnavailable(e.to_string()))?;
        Ok(self.attach_session(config, engine).await)
    }

    /// Start a session around an already-built engine process (simulated or
    /// pre-spawned engines).
    pub async fn attach_session(
        &self,
        config: SessionConfig,
        engine: EngineProcess,
    ) -> SessionHandle {
        let session_id = Uuid::new_v4().to_string();

        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (event_tx, _) = broadcast::channel(100);

        let mut state = SessionState::new(session_id.clone(), &config);
        state.attach_engine(engine);

        tokio::spawn(run_session_actor(state, cmd_rx, event_tx));

        let handle = SessionHandle::new(session_id.clone(), cmd_tx);
        self.sessions
            .write()
            .await
            .insert(session_id, handle.clone());
        tracing::info!(id = %handle.id(), "Session created");
        handle
    }

    pub async fn get_handle(&self, session_id: &str) -> Result<SessionHandle, SessionError> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or(SessionError::SessionEnded)
    }

    /// Close a session: the actor terminates its engine and every in-flight
    /// call is rejected.
    pub async fn end_session(&self, session_id: &str) -> Result<(), SessionError> {
        let handle = self
            .sessions
            .write()
            .await
            .remove(session_id)
            .ok_or(SessionError::SessionEnded)?;
        handle.shutdown().await;
        Ok(())
    }

    /// Close every active session.
    pub async fn shutdown_all(&self) {
        let handles: Vec<SessionHandle> = self.sessions.write().await.drain().map(|(_, h)| h).collect();
        for handle in handles {
            handle.shutdown().await;
        }
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}
