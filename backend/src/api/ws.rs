// WebSocket handler: one game session per connection.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::engine::session::{spawn_session, SessionCommand, SessionEvent};
use crate::metrics;

use super::AppState;

/// WebSocket upgrade handler for a new game session.
pub async fn ws_game(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

async fn handle_ws(mut socket: WebSocket, state: AppState) {
    metrics::CONNECTED_WEBSOCKETS.inc();

    let mut session = spawn_session(state.settings.as_ref().clone(), state.leaderboard.clone());

    // Forward session events to the client and client intents to the session.
    // Either side closing ends the connection.
    loop {
        tokio::select! {
            event = session.events.recv() => {
                let Some(event) = event else {
                    break;
                };
                if !send_event(&mut socket, &event).await {
                    break;
                }
            }
            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Text(text))) => {
                        let reply = match serde_json::from_str::<SessionCommand>(text.as_str()) {
                            Ok(command) => match queue_command(&session.commands, command) {
                                Queued::Accepted | Queued::Dropped => None,
                                Queued::Rejected(event) => Some(event),
                                Queued::Closed => break,
                            },
                            Err(e) => Some(SessionEvent::Error {
                                message: format!("unrecognized message: {e}"),
                            }),
                        };
                        if let Some(event) = reply {
                            if !send_event(&mut socket, &event).await {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                        break;
                    }
                    _ => {
                        // Pings and binary frames carry no intents
                    }
                }
            }
        }
    }

    tracing::debug!(session = %session.id, "WebSocket closed");
    session.close().await;
    metrics::CONNECTED_WEBSOCKETS.dec();
}

/// What happened to a command handed to the session.
#[derive(Debug, PartialEq)]
enum Queued {
    Accepted,
    /// A turn lost to a full queue; the next one supersedes it anyway.
    Dropped,
    /// Start or submit lost to a full queue; the client has to retry.
    Rejected(SessionEvent),
    Closed,
}

/// Hand a command to the session without waiting. The session may itself be
/// blocked on us draining its events, so this never awaits.
fn queue_command(commands: &mpsc::Sender<SessionCommand>, command: SessionCommand) -> Queued {
    match commands.try_send(command) {
        Ok(()) => Queued::Accepted,
        Err(TrySendError::Full(SessionCommand::Turn { direction })) => {
            tracing::debug!(?direction, "Command queue full, dropping turn");
            Queued::Dropped
        }
        Err(TrySendError::Full(dropped)) => {
            tracing::warn!(?dropped, "Command queue full, rejecting input");
            Queued::Rejected(SessionEvent::Error {
                message: "server busy, command dropped; please retry".into(),
            })
        }
        Err(TrySendError::Closed(_)) => Queued::Closed,
    }
}

/// Serialize and send one event. Returns false once the client is gone.
async fn send_event(socket: &mut WebSocket, event: &SessionEvent) -> bool {
    let json = match serde_json::to_string(event) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!("Failed to serialize session event: {e}");
            return true;
        }
    };
    if socket.send(Message::Text(json.into())).await.is_err() {
        return false;
    }
    metrics::WEBSOCKET_MESSAGES_SENT_TOTAL.inc();
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Direction;

    #[test]
    fn test_queue_command_accepts_until_full() {
        let (tx, mut rx) = mpsc::channel(1);
        assert_eq!(queue_command(&tx, SessionCommand::Start), Queued::Accepted);
        assert_eq!(rx.try_recv().unwrap(), SessionCommand::Start);
    }

    #[test]
    fn test_full_queue_drops_turns_quietly() {
        let (tx, _rx) = mpsc::channel(1);
        queue_command(&tx, SessionCommand::Start);
        let turn = SessionCommand::Turn {
            direction: Direction::Up,
        };
        assert_eq!(queue_command(&tx, turn), Queued::Dropped);
    }

    #[test]
    fn test_full_queue_reports_lost_start_and_submit() {
        let (tx, _rx) = mpsc::channel(1);
        queue_command(&tx, SessionCommand::Start);
        for command in [
            SessionCommand::Start,
            SessionCommand::Submit { name: "Ana".into() },
        ] {
            match queue_command(&tx, command) {
                Queued::Rejected(SessionEvent::Error { message }) => {
                    assert!(message.contains("retry"));
                }
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn test_closed_session_ends_forwarding() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        assert_eq!(queue_command(&tx, SessionCommand::Start), Queued::Closed);
    }
}
