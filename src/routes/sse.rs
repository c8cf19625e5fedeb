use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, State},
    response::sse::Sse,
    routing::get,
};
use futures::Stream;
use tracing::info;

use crate::{error::AppError, services::sse_service, state::SharedState};

#[utoipa::path(
    get,
    path = "/rooms/{room_code}/events",
    tag = "events",
    params(("room_code" = String, Path, description = "Code of the room")),
    responses((status = 200, description = "Room event stream", content_type = "text/event-stream", body = String))
)]
/// Stream a room's realtime events to a connected client.
pub async fn room_stream(
    State(state): State<SharedState>,
    Path(room_code): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>>, AppError> {
    let receiver = sse_service::subscribe(&state, &room_code)?;
    info!(room_code, "new room SSE connection");
    Ok(sse_service::to_sse_stream(receiver, room_code))
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/rooms/{room_code}/events", get(room_stream))
}
