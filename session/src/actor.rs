use tokio::sync::{broadcast, mpsc};
use tokio::time::{self, Duration, Instant};
use tracing::Instrument;

use sparring_engine::{EngineCommand, EngineEvent};

use super::commands::SessionCommand;
use super::events::SessionEvent;
use super::snapshot::{EndReason, SessionPhase};
use super::state::SessionState;
use super::timer::TimerFired;

/// How often the actor checks its deadlines while one is outstanding.
const CLOCK_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// The main session actor loop.
/// Owns all mutable state. Processes commands, engine events, and timer
/// ticks strictly sequentially — a transition can never be re-entered while
/// another is in progress.
pub(crate) async fn run_session_actor(
    state: SessionState,
    cmd_rx: mpsc::Receiver<SessionCommand>,
    event_tx: broadcast::Sender<SessionEvent>,
) {
    let session_id = state.session_id.clone();
    run_session_actor_inner(state, cmd_rx, event_tx)
        .instrument(tracing::info_span!("session", id = %session_id))
        .await;
}

async fn run_session_actor_inner(
    mut state: SessionState,
    mut cmd_rx: mpsc::Receiver<SessionCommand>,
    event_tx: broadcast::Sender<SessionEvent>,
) {
    tracing::info!("Session actor started");

    let mut clock = time::interval(CLOCK_POLL_INTERVAL);
    clock.set_missed_tick_behavior(time::MissedTickBehavior::Skip);

    let handshake_deadline =
        Instant::now() + Duration::from_millis(state.handshake_timeout_ms());

    // Configured options go out first; the process handle holds them until
    // the engine has completed its handshake.
    state.send_configured_options().await;

    loop {
        tokio::select! {
            biased;

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(SessionCommand::Shutdown) | None => {
                        tracing::info!("Session actor shutting down");
                        state.end(EndReason::Terminated);
                        state.shutdown_engine_if_ended();
                        break;
                    }
                    Some(cmd) => {
                        handle_command(&mut state, cmd, &event_tx).await;
                        state.shutdown_engine_if_ended();
                    }
                }
            }

            engine_event = state.next_engine_event() => {
                match engine_event {
                    Some(event) => handle_engine_event(&mut state, event, &event_tx).await,
                    None => {
                        // The engine hung up on a live session
                        tracing::warn!("Engine event stream closed");
                        state.end(EndReason::EngineExited);
                        let _ = event_tx.send(SessionEvent::StateChanged(state.snapshot()));
                    }
                }
                state.shutdown_engine_if_ended();
            }

            _ = clock.tick(), if state.needs_clock() => {
                handle_clock_tick(&mut state, handshake_deadline, &event_tx).await;
                state.shutdown_engine_if_ended();
            }
        }
    }

    tracing::info!("Session actor exited");
}

async fn handle_command(
    state: &mut SessionState,
    cmd: SessionCommand,
    event_tx: &broadcast::Sender<SessionEvent>,
) {
    match cmd {
        SessionCommand::SubmitMove { mv, reply } => {
            tracing::debug!(%mv, "Move submitted");
            match state.submit_move(mv).await {
                Ok(()) => {
                    // The caller parks until the engine answers
                    state.park_reply(reply);
                    let _ = event_tx.send(SessionEvent::StateChanged(state.snapshot()));
                }
                Err(e) => {
                    let _ = reply.send(Err(e));
                }
            }
        }
        SessionCommand::GetSnapshot { reply } => {
            let _ = reply.send(state.snapshot());
        }
        SessionCommand::Subscribe { reply } => {
            let snapshot = state.snapshot();
            let rx = event_tx.subscribe();
            let _ = reply.send((snapshot, rx));
        }
        SessionCommand::Shutdown => unreachable!(),
    }
}

async fn handle_engine_event(
    state: &mut SessionState,
    event: EngineEvent,
    event_tx: &broadcast::Sender<SessionEvent>,
) {
    match event {
        EngineEvent::Id { ref name, ref author } => {
            tracing::debug!(?name, ?author, "Engine identified itself");
            if state.on_identification() {
                let _ = event_tx.send(SessionEvent::StateChanged(state.snapshot()));
            }
        }
        EngineEvent::UciOk => {
            if state.on_identification() {
                let _ = event_tx.send(SessionEvent::StateChanged(state.snapshot()));
            }
        }
        EngineEvent::ReadyOk => {
            if state.on_ready_ok() {
                let _ = event_tx.send(SessionEvent::StateChanged(state.snapshot()));
            }
        }
        EngineEvent::OptionDeclared { name, spec } => {
            tracing::debug!(%name, %spec, "Engine declared option");
        }
        EngineEvent::Info(info) => {
            state.analysis = Some(info.clone());
            let _ = event_tx.send(SessionEvent::Thinking(info));
        }
        EngineEvent::BestMove { mv, ponder } => {
            if state.apply_best_move(mv.clone(), ponder) {
                tracing::info!(%mv, "Engine replied");
                let _ = event_tx.send(SessionEvent::StateChanged(state.snapshot()));
            } else {
                tracing::debug!(%mv, "Discarding stray bestmove");
            }
        }
        EngineEvent::ProtocolError { raw_line, reason } => {
            tracing::warn!(%raw_line, %reason, "Unparseable engine output");
            let _ = event_tx.send(SessionEvent::Protocol { raw_line, reason });
        }
    }
}

async fn handle_clock_tick(
    state: &mut SessionState,
    handshake_deadline: Instant,
    event_tx: &broadcast::Sender<SessionEvent>,
) {
    let now = Instant::now();

    if state.phase == SessionPhase::Initializing && now >= handshake_deadline {
        tracing::warn!("Engine never completed its handshake");
        state.end(EndReason::HandshakeTimeout);
        let _ = event_tx.send(SessionEvent::StateChanged(state.snapshot()));
        return;
    }

    match state.timer.poll(now) {
        Some(TimerFired::BudgetExpired) => {
            tracing::warn!("Move time exceeded, stopping search");
            if let Some(engine) = state.engine.as_ref() {
                if engine.send(EngineCommand::Stop).await.is_err() {
                    tracing::warn!("Engine closed while sending stop");
                    let _ = event_tx.send(SessionEvent::Error(
                        "engine closed while sending stop".to_string(),
                    ));
                }
            }
        }
        Some(TimerFired::GraceExpired) => {
            tracing::error!("Engine unresponsive after stop");
            state.end(EndReason::EngineTimeout);
            let _ = event_tx.send(SessionEvent::StateChanged(state.snapshot()));
        }
        None => {}
    }
}
