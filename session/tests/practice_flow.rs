//! End-to-end flows through the `SessionManager` façade, driven by scripted
//! engines over in-process transports.

use std::path::PathBuf;

use tokio::sync::broadcast;
use tokio::time::{timeout, Duration};

use sparring_engine::{EngineProcess, EngineSpec, EngineTransport};
use sparring_session::{
    EndReason, SessionConfig, SessionError, SessionEvent, SessionHandle, SessionManager,
    SessionPhase,
};

/// A minimal engine: answers the handshake and plays canned replies to
/// every `go`.
fn scripted_engine(replies: &[&str]) -> EngineProcess {
    let replies: Vec<String> = replies.iter().map(|s| s.to_string()).collect();
    let (transport, mut wire_rx, wire_tx) = EngineTransport::pair(32);

    tokio::spawn(async move {
        let mut replies = replies.into_iter();
        while let Some(line) = wire_rx.recv().await {
            let responses: Vec<String> = if line == "uci" {
                vec![
                    "id name Scripted".to_string(),
                    "id author tests".to_string(),
                    "uciok".to_string(),
                ]
            } else if line == "isready" {
                vec!["readyok".to_string()]
            } else if line.starts_with("go") {
                match replies.next() {
                    Some(mv) => vec![
                        "info depth 1 score cp 0".to_string(),
                        format!("bestmove {}", mv),
                    ],
                    None => vec![],
                }
            } else {
                vec![]
            };
            for response in responses {
                if wire_tx.send(response).await.is_err() {
                    return;
                }
            }
        }
    });

    EngineProcess::from_transport(transport)
}

async fn wait_for_ready(handle: &SessionHandle) -> broadcast::Receiver<SessionEvent> {
    let (snapshot, mut events) = handle.subscribe().await.unwrap();
    if snapshot.phase == SessionPhase::Ready {
        return events;
    }
    timeout(Duration::from_secs(5), async {
        loop {
            if let SessionEvent::StateChanged(snap) = events.recv().await.unwrap() {
                match snap.phase {
                    SessionPhase::Ready => break,
                    SessionPhase::Ended(reason) => panic!("session ended early: {:?}", reason),
                    _ => {}
                }
            }
        }
    })
    .await
    .expect("session never became ready");
    events
}

#[tokio::test]
async fn test_full_practice_exchange() {
    let manager = SessionManager::new();
    let handle = manager
        .attach_session(SessionConfig::default(), scripted_engine(&["e7e5", "b8c6"]))
        .await;
    let _events = wait_for_ready(&handle).await;

    let reply = handle.submit_move("e2e4").await.unwrap();
    assert_eq!(reply.mv.as_str(), "e7e5");

    let reply = handle.submit_move("g1f3").await.unwrap();
    assert_eq!(reply.mv.as_str(), "b8c6");

    let snap = handle.get_snapshot().await.unwrap();
    assert_eq!(snap.moves.len(), 4);
    assert_eq!(snap.last_best_move.unwrap().as_str(), "b8c6");
}

#[tokio::test]
async fn test_create_session_surfaces_launch_failure() {
    let manager = SessionManager::new();
    let config = SessionConfig {
        engine: EngineSpec::Binary(PathBuf::from("/nonexistent/engine/binary")),
        ..SessionConfig::default()
    };

    let err = manager.create_session(config).await.unwrap_err();
    assert!(matches!(err, SessionError::EngineUnavailable(_)));
}

#[tokio::test]
async fn test_sessions_are_independent() {
    let manager = SessionManager::new();
    let first = manager
        .attach_session(SessionConfig::default(), scripted_engine(&["e7e5"]))
        .await;
    let second = manager
        .attach_session(SessionConfig::default(), scripted_engine(&["d7d5"]))
        .await;
    assert_ne!(first.id(), second.id());

    let _e1 = wait_for_ready(&first).await;
    let _e2 = wait_for_ready(&second).await;

    first.submit_move("e2e4").await.unwrap();

    // The second session saw none of it
    let snap = second.get_snapshot().await.unwrap();
    assert!(snap.moves.is_empty());

    let reply = second.submit_move("d2d4").await.unwrap();
    assert_eq!(reply.mv.as_str(), "d7d5");
}

#[tokio::test]
async fn test_end_session_is_terminal() {
    let manager = SessionManager::new();
    let handle = manager
        .attach_session(SessionConfig::default(), scripted_engine(&["e7e5"]))
        .await;
    let _events = wait_for_ready(&handle).await;

    manager.end_session(handle.id()).await.unwrap();

    let err = handle.submit_move("e2e4").await.unwrap_err();
    assert!(matches!(err, SessionError::SessionEnded));
    assert!(manager.get_handle(handle.id()).await.is_err());
    assert!(manager.end_session(handle.id()).await.is_err());
}

#[tokio::test]
async fn test_invalid_move_rejected_locally() {
    let manager = SessionManager::new();
    let handle = manager
        .attach_session(SessionConfig::default(), scripted_engine(&[]))
        .await;
    let _events = wait_for_ready(&handle).await;

    let err = handle.submit_move("castles!").await.unwrap_err();
    assert!(matches!(err, SessionError::InvalidMove(_)));

    let snap = handle.get_snapshot().await.unwrap();
    assert!(snap.moves.is_empty());
    assert_eq!(snap.phase, SessionPhase::Ready);
}

#[tokio::test]
async fn test_unresponsive_engine_reported_as_timeout() {
    // Handshakes, then goes silent on every `go`
    let manager = SessionManager::new();
    let config = SessionConfig {
        move_time_ms: 80,
        grace_ms: 60,
        ..SessionConfig::default()
    };
    let handle = manager.attach_session(config, scripted_engine(&[])).await;
    let mut events = wait_for_ready(&handle).await;

    let err = handle.submit_move("e2e4").await.unwrap_err();
    assert!(matches!(err, SessionError::EngineTimeout));

    let ended = timeout(Duration::from_secs(5), async {
        loop {
            if let SessionEvent::StateChanged(snap) = events.recv().await.unwrap() {
                if let SessionPhase::Ended(reason) = snap.phase {
                    return reason;
                }
            }
        }
    })
    .await
    .expect("session never ended");
    assert_eq!(ended, EndReason::EngineTimeout);
}
