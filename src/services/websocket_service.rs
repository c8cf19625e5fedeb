use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::{sync::broadcast::error::RecvError, sync::mpsc, task::JoinHandle};
use tracing::{info, warn};

use crate::{
    dto::{
        events::{ConnectedPayload, ErrorPayload},
        ws::ClientAction,
    },
    error::GameError,
    services::{
        game_service,
        room_events::{EVENT_CONNECTED, EVENT_ERROR, EVENT_STATE_UPDATED},
    },
    state::SharedState,
};

#[derive(Serialize)]
struct Envelope<'a> {
    event: &'a str,
    payload: serde_json::Value,
}

/// Handle the full lifecycle of a room WebSocket connection.
///
/// The socket receives every broadcast of its room hub, plus a greeting and
/// an initial snapshot on connect. Game-rule errors raised by this socket's
/// own actions go only to this socket, never to the room.
pub async fn handle_socket(state: SharedState, socket: WebSocket, room_code: String) {
    let code = room_code.trim().to_uppercase();
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let slot = match state.slot(&code) {
        Ok(slot) => slot,
        Err(err) => {
            send_event(&outbound_tx, EVENT_ERROR, &ErrorPayload {
                message: err.to_string(),
            });
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    info!(room_code = %code, "room socket connected");
    send_event(&outbound_tx, EVENT_CONNECTED, &ConnectedPayload {
        room_code: code.clone(),
    });
    if let Ok(snapshot) = game_service::room_snapshot(&state, &code).await {
        send_event(&outbound_tx, EVENT_STATE_UPDATED, &snapshot);
    }

    // Forwarder task: room hub broadcasts flow onto this socket's writer.
    let mut hub_rx = slot.hub().subscribe();
    let forward_tx = outbound_tx.clone();
    let forwarder_task = tokio::spawn(async move {
        loop {
            match hub_rx.recv().await {
                Ok(event) => {
                    let envelope = Envelope {
                        event: &event.event,
                        payload: event.payload,
                    };
                    let Ok(text) = serde_json::to_string(&envelope) else {
                        continue;
                    };
                    if forward_tx.send(Message::Text(text.into())).is_err() {
                        break;
                    }
                }
                Err(RecvError::Closed) => break,
                // Skip lagged broadcasts; the next snapshot supersedes them.
                Err(RecvError::Lagged(_)) => continue,
            }
        }
    });

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                handle_action(&state, &code, &text, &outbound_tx).await;
            }
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                info!(room_code = %code, "room socket closed");
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) => {}
            Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(room_code = %code, error = %err, "websocket error");
                break;
            }
        }
    }

    forwarder_task.abort();
    info!(room_code = %code, "room socket disconnected");
    finalize(writer_task, outbound_tx).await;
}

/// Decode one inbound frame and run the matching engine action.
async fn handle_action(
    state: &SharedState,
    code: &str,
    text: &str,
    outbound_tx: &mpsc::UnboundedSender<Message>,
) {
    let action = match ClientAction::from_json_str(text) {
        Ok(action) => action,
        Err(err) => {
            warn!(room_code = %code, error = %err, "failed to parse room socket action");
            send_event(outbound_tx, EVENT_ERROR, &ErrorPayload {
                message: err.to_string(),
            });
            return;
        }
    };

    let result: Result<(), GameError> = match action {
        ClientAction::SyncState => {
            // Read-only: the snapshot goes to this socket only.
            match game_service::room_snapshot(state, code).await {
                Ok(snapshot) => {
                    send_event(outbound_tx, EVENT_STATE_UPDATED, &snapshot);
                    Ok(())
                }
                Err(err) => Err(err),
            }
        }
        ClientAction::StartRound(data) => game_service::start_round(state, code, data.question_id)
            .await
            .map(drop),
        ClientAction::SubmitAnswer(data) => {
            game_service::submit_answer(state, code, data.player_id, &data.text)
                .await
                .map(drop)
        }
        ClientAction::RevealAnswer => game_service::reveal_answer(state, code).await.map(drop),
        ClientAction::SubmitGuess(data) => game_service::submit_guess(
            state,
            code,
            data.player_id,
            data.answer_id,
            data.guessed_player_id,
        )
        .await
        .map(drop),
        ClientAction::FinishRoom => game_service::finish_room(state, code).await.map(drop),
    };

    // Results of successful actions reach this socket through the room hub;
    // only failures are reported back directly.
    if let Err(err) = result {
        send_event(outbound_tx, EVENT_ERROR, &ErrorPayload {
            message: err.to_string(),
        });
    }
}

/// Serialize a payload into the `{event, payload}` envelope and queue it on
/// the socket writer. Serialization failure is a bug, not a transport issue:
/// it is logged and the frame dropped.
fn send_event<T>(tx: &mpsc::UnboundedSender<Message>, event: &str, payload: &T)
where
    T: ?Sized + Serialize,
{
    let payload = match serde_json::to_value(payload) {
        Ok(value) => value,
        Err(err) => {
            warn!(event, error = %err, "failed to serialize outbound event payload");
            return;
        }
    };
    let envelope = Envelope { event, payload };
    match serde_json::to_string(&envelope) {
        Ok(text) => {
            let _ = tx.send(Message::Text(text.into()));
        }
        Err(err) => warn!(event, error = %err, "failed to serialize outbound envelope"),
    }
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
