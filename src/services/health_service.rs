use crate::{dto::health::HealthResponse, state::SharedState};

/// Report liveness plus the number of registered rooms.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    HealthResponse::ok(state.room_count())
}
