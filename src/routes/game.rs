use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use validator::Validate;

use crate::{
    dto::game::{
        AnswerAccepted, CreateRoomRequest, FinalResults, GuessAccepted, JoinRoomRequest,
        RoomSnapshot, RoomWelcome, StartRoundRequest, SubmitAnswerRequest, SubmitGuessRequest,
    },
    error::AppError,
    services::game_service,
    state::SharedState,
};

/// Routes handling room lifecycle and gameplay actions.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/rooms", post(create_room))
        .route("/rooms/join", post(join_room))
        .route("/rooms/{room_code}/state", get(room_state))
        .route("/rooms/start-round", post(start_round))
        .route("/rooms/submit-answer", post(submit_answer))
        .route("/rooms/{room_code}/reveal", post(reveal_answer))
        .route("/rooms/submit-guess", post(submit_guess))
        .route("/rooms/{room_code}/finish", post(finish_room))
}

/// Create a fresh room and register the caller as its host.
#[utoipa::path(
    post,
    path = "/rooms",
    tag = "game",
    request_body = CreateRoomRequest,
    responses(
        (status = 200, description = "Room created", body = RoomWelcome)
    )
)]
pub async fn create_room(
    State(state): State<SharedState>,
    Json(payload): Json<CreateRoomRequest>,
) -> Result<Json<RoomWelcome>, AppError> {
    payload.validate()?;
    let welcome = game_service::create_room(&state, &payload.name).await?;
    Ok(Json(welcome))
}

/// Join an existing room, claiming a display name.
#[utoipa::path(
    post,
    path = "/rooms/join",
    tag = "game",
    request_body = JoinRoomRequest,
    responses(
        (status = 200, description = "Joined the room", body = RoomWelcome)
    )
)]
pub async fn join_room(
    State(state): State<SharedState>,
    Json(payload): Json<JoinRoomRequest>,
) -> Result<Json<RoomWelcome>, AppError> {
    payload.validate()?;
    let welcome = game_service::join_room(&state, &payload.room_code, &payload.name).await?;
    Ok(Json(welcome))
}

/// Read the current room snapshot without mutating anything.
#[utoipa::path(
    get,
    path = "/rooms/{room_code}/state",
    tag = "game",
    params(("room_code" = String, Path, description = "Code of the room")),
    responses(
        (status = 200, description = "Current room snapshot", body = RoomSnapshot)
    )
)]
pub async fn room_state(
    State(state): State<SharedState>,
    Path(room_code): Path<String>,
) -> Result<Json<RoomSnapshot>, AppError> {
    let snapshot = game_service::room_snapshot(&state, &room_code).await?;
    Ok(Json(snapshot))
}

/// Open the next round, with an optional specific question.
#[utoipa::path(
    post,
    path = "/rooms/start-round",
    tag = "game",
    request_body = StartRoundRequest,
    responses(
        (status = 200, description = "Round started", body = RoomSnapshot)
    )
)]
pub async fn start_round(
    State(state): State<SharedState>,
    Json(payload): Json<StartRoundRequest>,
) -> Result<Json<RoomSnapshot>, AppError> {
    payload.validate()?;
    let snapshot =
        game_service::start_round(&state, &payload.room_code, payload.question_id).await?;
    Ok(Json(snapshot))
}

/// Submit (or replace) the caller's answer to the current question.
#[utoipa::path(
    post,
    path = "/rooms/submit-answer",
    tag = "game",
    request_body = SubmitAnswerRequest,
    responses(
        (status = 200, description = "Answer recorded", body = AnswerAccepted)
    )
)]
pub async fn submit_answer(
    State(state): State<SharedState>,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<Json<AnswerAccepted>, AppError> {
    payload.validate()?;
    let accepted = game_service::submit_answer(
        &state,
        &payload.room_code,
        payload.player_id,
        &payload.text,
    )
    .await?;
    Ok(Json(accepted))
}

/// Reveal a random answer of the current round for guessing.
#[utoipa::path(
    post,
    path = "/rooms/{room_code}/reveal",
    tag = "game",
    params(("room_code" = String, Path, description = "Code of the room")),
    responses(
        (status = 200, description = "Answer revealed", body = RoomSnapshot)
    )
)]
pub async fn reveal_answer(
    State(state): State<SharedState>,
    Path(room_code): Path<String>,
) -> Result<Json<RoomSnapshot>, AppError> {
    let snapshot = game_service::reveal_answer(&state, &room_code).await?;
    Ok(Json(snapshot))
}

/// Submit (or replace) an author guess on the revealed answer.
#[utoipa::path(
    post,
    path = "/rooms/submit-guess",
    tag = "game",
    request_body = SubmitGuessRequest,
    responses(
        (status = 200, description = "Guess recorded", body = GuessAccepted)
    )
)]
pub async fn submit_guess(
    State(state): State<SharedState>,
    Json(payload): Json<SubmitGuessRequest>,
) -> Result<Json<GuessAccepted>, AppError> {
    payload.validate()?;
    let accepted = game_service::submit_guess(
        &state,
        &payload.room_code,
        payload.player_id,
        payload.answer_id,
        payload.guessed_player_id,
    )
    .await?;
    Ok(Json(accepted))
}

/// Finish the game and compute pairwise sync results.
#[utoipa::path(
    post,
    path = "/rooms/{room_code}/finish",
    tag = "game",
    params(("room_code" = String, Path, description = "Code of the room")),
    responses(
        (status = 200, description = "Final results computed", body = FinalResults)
    )
)]
pub async fn finish_room(
    State(state): State<SharedState>,
    Path(room_code): Path<String>,
) -> Result<Json<FinalResults>, AppError> {
    let results = game_service::finish_room(&state, &room_code).await?;
    Ok(Json(results))
}
