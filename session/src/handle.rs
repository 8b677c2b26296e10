use tokio::sync::{broadcast, mpsc, oneshot};

use sparring_engine::UciMove;

use super::commands::{EngineMove, SessionCommand, SessionError};
use super::events::SessionEvent;
use super::snapshot::SessionSnapshot;

/// Cheap, cloneable handle to a session actor.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    id: String,
    cmd_tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    pub(crate) fn new(id: String, cmd_tx: mpsc::Sender<SessionCommand>) -> Self {
        Self { id, cmd_tx }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Play a move and wait for the engine's reply.
    ///
    /// Resolves with the engine's answering move, or rejects with a typed
    /// error. The move is validated for format here, before it reaches the
    /// actor; legality is the engine's concern.
    pub async fn submit_move(&self, mv: &str) -> Result<EngineMove, SessionError> {
        let mv = UciMove::parse(mv).map_err(|e| SessionError::InvalidMove(e.to_string()))?;
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::SubmitMove { mv, reply: tx })
            .await?;
        rx.await.map_err(|_| SessionError::SessionEnded)?
    }

    pub async fn get_snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::GetSnapshot { reply: tx }).await?;
        rx.await
            .map_err(|_| SessionError::Internal("Reply dropped".to_string()))
    }

    pub async fn subscribe(
        &self,
    ) -> Result<(SessionSnapshot, broadcast::Receiver<SessionEvent>), SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::Subscribe { reply: tx }).await?;
        rx.await
            .map_err(|_| SessionError::Internal("Reply dropped".to_string()))
    }

    pub async fn shutdown(&self) {
        let _ = self.cmd_tx.send(SessionCommand::Shutdown).await;
    }

    async fn send(&self, cmd: SessionCommand) -> Result<(), SessionError> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| SessionError::SessionEnded)
    }
}
