//! Room manager: creates, hydrates, and routes to room actors.
//!
//! The manager owns one [`RoomHandle`] per live room. A room whose actor
//! is not running but whose document survives in the store (a process
//! restart) is hydrated back into an actor on first touch.

use std::collections::HashMap;

use serde_json::to_value;
use tracing::info;

use nocturne_protocol::{GameError, PlayerId, RoomId};
use nocturne_store::Store;

use crate::actor::{spawn_room, RoomHandle, RoomInfo};
use crate::state::{paths, RoomRecord, RoomSettings};
use crate::timer::Clock;

/// Manages all active rooms. This is the entry point for room operations
/// from the service layer.
pub struct RoomManager<S, C> {
    rooms: HashMap<RoomId, RoomHandle>,
    store: S,
    clock: C,
}

impl<S, C> RoomManager<S, C>
where
    S: Store + Clone,
    C: Clock + Clone,
{
    pub fn new(store: S, clock: C) -> Self {
        Self {
            rooms: HashMap::new(),
            store,
            clock,
        }
    }

    /// Creates a room with `creator` as its host, persists the initial
    /// document, and spawns the actor. Fails if the id is taken, whether
    /// by a live actor or by a surviving store document.
    pub async fn create_room(
        &mut self,
        room_id: RoomId,
        creator: PlayerId,
        display_name: String,
        settings: RoomSettings,
    ) -> Result<RoomHandle, GameError> {
        if self.live_handle(&room_id).is_some() {
            return Err(GameError::StateConflict("room_exists".into()));
        }
        if self
            .store
            .exists(&paths::room(&room_id))
            .await
            .map_err(|e| GameError::Io(e.to_string()))?
        {
            return Err(GameError::StateConflict("room_exists".into()));
        }

        let room = RoomRecord::create(
            room_id.clone(),
            creator,
            display_name,
            settings,
            self.clock.now_ms(),
        );
        let doc = to_value(&room).map_err(|e| GameError::Io(e.to_string()))?;
        self.store
            .write(&paths::room(&room_id), doc)
            .await
            .map_err(|e| GameError::Io(e.to_string()))?;

        let handle = spawn_room(room, self.store.clone(), self.clock.clone());
        self.rooms.insert(room_id, handle.clone());
        Ok(handle)
    }

    /// The handle for a room, reviving it from the store if its actor is
    /// not running. `room_not_found` if neither exists.
    pub async fn handle(&mut self, room_id: &RoomId) -> Result<RoomHandle, GameError> {
        if let Some(handle) = self.live_handle(room_id) {
            return Ok(handle);
        }

        let doc = self
            .store
            .read(&paths::room(room_id))
            .await
            .map_err(|e| GameError::Io(e.to_string()))?
            .ok_or_else(GameError::room_not_found)?;
        let mut room: RoomRecord =
            serde_json::from_value(doc).map_err(|e| GameError::Io(e.to_string()))?;
        room.id = room_id.clone();

        info!(%room_id, "room hydrated from store");
        let handle = spawn_room(room, self.store.clone(), self.clock.clone());
        self.rooms.insert(room_id.clone(), handle.clone());
        Ok(handle)
    }

    /// A live handle, pruning the entry if the actor has stopped (room
    /// deleted when its last player left).
    fn live_handle(&mut self, room_id: &RoomId) -> Option<RoomHandle> {
        match self.rooms.get(room_id) {
            Some(handle) if !handle.is_closed() => Some(handle.clone()),
            Some(_) => {
                self.rooms.remove(room_id);
                None
            }
            None => None,
        }
    }

    /// Shuts down a room actor without touching the store document.
    pub async fn suspend_room(&mut self, room_id: &RoomId) -> Result<(), GameError> {
        let handle = self
            .rooms
            .remove(room_id)
            .ok_or_else(GameError::room_not_found)?;
        handle.shutdown().await
    }

    pub async fn room_info(&mut self, room_id: &RoomId) -> Result<RoomInfo, GameError> {
        self.handle(room_id).await?.get_info().await
    }

    /// The number of rooms with a running actor.
    pub fn live_room_count(&self) -> usize {
        self.rooms.values().filter(|h| !h.is_closed()).count()
    }
}
