pub mod hub;
pub mod room;
pub mod state_machine;

use std::{sync::Arc, time::Duration};

use dashmap::DashMap;
use tokio::{sync::Mutex, time::timeout};

use crate::{
    config::AppConfig,
    error::GameError,
    services::embedding::SimilarityProvider,
    state::{hub::RoomHub, room::Room},
};

/// Shared handle to the application state.
pub type SharedState = Arc<AppState>;

/// Upper bound on holding a room's exclusive section for one action.
pub const DEFAULT_ACTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Broadcast channel capacity per room hub.
const HUB_CAPACITY: usize = 16;

/// One registered room: its state behind the per-room exclusive lock, plus
/// the broadcast hub its subscribers listen on.
pub struct RoomSlot {
    room: Mutex<Room>,
    hub: RoomHub,
}

impl RoomSlot {
    fn new(room: Room) -> Self {
        Self {
            room: Mutex::new(room),
            hub: RoomHub::new(HUB_CAPACITY),
        }
    }

    /// Hub fanning this room's events out to subscribers.
    pub fn hub(&self) -> &RoomHub {
        &self.hub
    }
}

/// Central application state: the room registry plus shared collaborators.
///
/// Rooms are independent lock domains: the registry itself is a sharded
/// concurrent map, and each room carries its own mutex, so actions on
/// different rooms never contend.
pub struct AppState {
    config: AppConfig,
    provider: Arc<dyn SimilarityProvider>,
    rooms: DashMap<String, Arc<RoomSlot>>,
    action_timeout: Option<Duration>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(config: AppConfig, provider: Arc<dyn SimilarityProvider>) -> SharedState {
        Arc::new(Self {
            config,
            provider,
            rooms: DashMap::new(),
            action_timeout: Some(DEFAULT_ACTION_TIMEOUT),
        })
    }

    /// Runtime configuration (question pool and room limits).
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Similarity provider used for answer embeddings.
    pub fn provider(&self) -> Arc<dyn SimilarityProvider> {
        self.provider.clone()
    }

    /// Number of rooms currently registered.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Whether a room with this code exists.
    pub fn contains_room(&self, code: &str) -> bool {
        self.rooms.contains_key(code)
    }

    /// Register a new room under its code. Returns `None` when the code is
    /// already taken (callers retry with a fresh code).
    pub fn try_insert_room(&self, room: Room) -> Option<Arc<RoomSlot>> {
        use dashmap::mapref::entry::Entry;

        match self.rooms.entry(room.code.clone()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(entry) => {
                let slot = Arc::new(RoomSlot::new(room));
                entry.insert(slot.clone());
                Some(slot)
            }
        }
    }

    /// Resolve the slot for `code`.
    pub fn slot(&self, code: &str) -> Result<Arc<RoomSlot>, GameError> {
        self.rooms
            .get(code)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| GameError::NotFound(format!("room `{code}` not found")))
    }

    /// Run `work` inside the room's exclusive section.
    ///
    /// Acquisition is bounded by [`DEFAULT_ACTION_TIMEOUT`]; exceeding it
    /// surfaces as [`GameError::Timeout`] instead of hanging the caller. All
    /// guard reads and the resulting mutation happen under the lock, so no
    /// stale-read race between concurrent actions on the same room is
    /// possible; actions on other rooms proceed in parallel.
    pub async fn with_room<F, T>(&self, code: &str, work: F) -> Result<T, GameError>
    where
        F: FnOnce(&mut Room) -> Result<T, GameError>,
    {
        let slot = self.slot(code)?;
        let mut guard = match self.action_timeout {
            Some(limit) => timeout(limit, slot.room.lock())
                .await
                .map_err(|_| GameError::Timeout)?,
            None => slot.room.lock().await,
        };
        work(&mut guard)
    }
}
