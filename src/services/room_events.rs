use serde::Serialize;
use tracing::warn;

use crate::{
    dto::{
        events::ServerEvent,
        game::{FinalResults, RoomSnapshot},
    },
    state::SharedState,
};

/// Event carrying a fresh room snapshot after a successful mutating action.
pub const EVENT_STATE_UPDATED: &str = "state_updated";
/// Event carrying the snapshot plus ordered pairwise results at game finish.
pub const EVENT_FINAL_RESULTS: &str = "final_results";
/// Event greeting a WebSocket client right after it connects.
pub const EVENT_CONNECTED: &str = "connected";
/// Event reporting a game-rule error to the single caller that caused it.
pub const EVENT_ERROR: &str = "error";

/// Broadcast an updated snapshot to every subscriber of the room.
pub fn broadcast_state_updated(state: &SharedState, code: &str, snapshot: &RoomSnapshot) {
    send_room_event(state, code, EVENT_STATE_UPDATED, snapshot);
}

/// Broadcast the final pairwise results to every subscriber of the room.
pub fn broadcast_final_results(state: &SharedState, code: &str, results: &FinalResults) {
    send_room_event(state, code, EVENT_FINAL_RESULTS, results);
}

fn send_room_event(state: &SharedState, code: &str, event: &str, payload: &impl Serialize) {
    let Ok(slot) = state.slot(code) else {
        warn!(code, event, "cannot broadcast: room is gone");
        return;
    };
    match ServerEvent::json(event, payload) {
        Ok(event) => slot.hub().broadcast(event),
        Err(err) => warn!(code, event, error = %err, "failed to serialize room event payload"),
    }
}
