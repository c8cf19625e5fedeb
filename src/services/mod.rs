/// OpenAPI documentation generation.
pub mod documentation;
/// Similarity provider boundary and the deterministic fallback embedder.
pub mod embedding;
/// Core room engine: lifecycle actions and their guards.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Broadcast helpers for room events.
pub mod room_events;
/// Pure scoring primitives.
pub mod scoring;
/// Server-Sent Events streaming of room events.
pub mod sse_service;
/// End-of-game pairwise sync aggregation.
pub mod sync_service;
/// Answer text normalization.
pub mod text;
/// WebSocket connection and action handling.
pub mod websocket_service;
