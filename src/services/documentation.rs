use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Vibe Sync Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::game::create_room,
        crate::routes::game::join_room,
        crate::routes::game::room_state,
        crate::routes::game::start_round,
        crate::routes::game::submit_answer,
        crate::routes::game::reveal_answer,
        crate::routes::game::submit_guess,
        crate::routes::game::finish_room,
        crate::routes::sse::room_stream,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::game::CreateRoomRequest,
            crate::dto::game::JoinRoomRequest,
            crate::dto::game::StartRoundRequest,
            crate::dto::game::SubmitAnswerRequest,
            crate::dto::game::SubmitGuessRequest,
            crate::dto::game::RoomSnapshot,
            crate::dto::game::RoomWelcome,
            crate::dto::game::AnswerAccepted,
            crate::dto::game::GuessAccepted,
            crate::dto::game::FinalResults,
            crate::dto::events::ConnectedPayload,
            crate::dto::events::ErrorPayload,
            crate::state::state_machine::RoomStatus,
            crate::config::QuestionCategory,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "game", description = "Room lifecycle and gameplay actions"),
        (name = "events", description = "Realtime room event streams"),
    )
)]
pub struct ApiDoc;
