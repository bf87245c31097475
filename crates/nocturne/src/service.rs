//! `GameService`: the operation surface exposed to the UI/API layer.
//!
//! Thin async facade over the engine's [`RoomManager`]. Every operation
//! resolves the room's actor handle, forwards the command, and folds the
//! outcome into the uniform [`ActionReply`] shape. Room state itself is
//! read through the store's subscribable paths, not through this surface.

use serde_json::json;
use tokio::sync::Mutex;
use tracing::debug;

use nocturne_engine::{
    Clock, NightAction, RoomInfo, RoomManager, RoomSettings, SystemClock,
};
use nocturne_protocol::{ActionReply, GameError, PlayerId, RoomId};
use nocturne_roles::RoleId;
use nocturne_store::{MemoryStore, Store};

/// The game service. Cheap handle resolution happens under the lock;
/// the per-room work runs in that room's actor, so rooms never block
/// one another.
pub struct GameService<S, C> {
    rooms: Mutex<RoomManager<S, C>>,
}

impl GameService<MemoryStore, SystemClock> {
    /// A service over the in-memory store and the real clock; what local
    /// play and the test suite use.
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new(), SystemClock)
    }
}

impl<S, C> GameService<S, C>
where
    S: Store + Clone,
    C: Clock + Clone,
{
    pub fn new(store: S, clock: C) -> Self {
        Self {
            rooms: Mutex::new(RoomManager::new(store, clock)),
        }
    }

    pub async fn create_room(
        &self,
        room_id: RoomId,
        creator: PlayerId,
        display_name: String,
    ) -> ActionReply {
        self.create_room_with(room_id, creator, display_name, RoomSettings::default())
            .await
    }

    pub async fn create_room_with(
        &self,
        room_id: RoomId,
        creator: PlayerId,
        display_name: String,
        settings: RoomSettings,
    ) -> ActionReply {
        let result = self
            .rooms
            .lock()
            .await
            .create_room(room_id.clone(), creator, display_name, settings)
            .await;
        match result {
            Ok(_) => ActionReply::with_data(json!({ "roomId": room_id })),
            Err(e) => ActionReply::err(&e),
        }
    }

    pub async fn join_room(
        &self,
        room_id: &RoomId,
        player_id: PlayerId,
        display_name: String,
    ) -> ActionReply {
        match self.handle(room_id).await {
            Ok(h) => h.join(player_id, display_name).await.into(),
            Err(e) => ActionReply::err(&e),
        }
    }

    pub async fn leave_room(&self, room_id: &RoomId, player_id: PlayerId) -> ActionReply {
        match self.handle(room_id).await {
            Ok(h) => h.leave(player_id).await.into(),
            Err(e) => ActionReply::err(&e),
        }
    }

    pub async fn set_ready(
        &self,
        room_id: &RoomId,
        player_id: PlayerId,
        ready: bool,
    ) -> ActionReply {
        match self.handle(room_id).await {
            Ok(h) => h.set_ready(player_id, ready).await.into(),
            Err(e) => ActionReply::err(&e),
        }
    }

    pub async fn update_display_name(
        &self,
        room_id: &RoomId,
        player_id: PlayerId,
        display_name: String,
    ) -> ActionReply {
        match self.handle(room_id).await {
            Ok(h) => h.update_display_name(player_id, display_name).await.into(),
            Err(e) => ActionReply::err(&e),
        }
    }

    pub async fn select_roles(
        &self,
        room_id: &RoomId,
        player_id: PlayerId,
        roles: Vec<RoleId>,
    ) -> ActionReply {
        match self.handle(room_id).await {
            Ok(h) => h.select_roles(player_id, roles).await.into(),
            Err(e) => ActionReply::err(&e),
        }
    }

    pub async fn start_game(&self, room_id: &RoomId, player_id: PlayerId) -> ActionReply {
        match self.handle(room_id).await {
            Ok(h) => h.start_game(player_id).await.into(),
            Err(e) => ActionReply::err(&e),
        }
    }

    pub async fn perform_night_action(
        &self,
        room_id: &RoomId,
        player_id: PlayerId,
        action: NightAction,
    ) -> ActionReply {
        match self.handle(room_id).await {
            Ok(h) => h.night_action(player_id, action).await.into(),
            Err(e) => ActionReply::err(&e),
        }
    }

    pub async fn skip_night_action(&self, room_id: &RoomId, player_id: PlayerId) -> ActionReply {
        match self.handle(room_id).await {
            Ok(h) => h.skip_night_action(player_id).await.into(),
            Err(e) => ActionReply::err(&e),
        }
    }

    pub async fn force_advance_to_day(
        &self,
        room_id: &RoomId,
        player_id: PlayerId,
    ) -> ActionReply {
        match self.handle(room_id).await {
            Ok(h) => h.force_advance_to_day(player_id).await.into(),
            Err(e) => ActionReply::err(&e),
        }
    }

    pub async fn advance_to_voting(&self, room_id: &RoomId, player_id: PlayerId) -> ActionReply {
        match self.handle(room_id).await {
            Ok(h) => h.advance_to_voting(player_id).await.into(),
            Err(e) => ActionReply::err(&e),
        }
    }

    pub async fn cast_vote(
        &self,
        room_id: &RoomId,
        player_id: PlayerId,
        target: PlayerId,
    ) -> ActionReply {
        match self.handle(room_id).await {
            Ok(h) => h.cast_vote(player_id, target).await.into(),
            Err(e) => ActionReply::err(&e),
        }
    }

    pub async fn resolve_votes(&self, room_id: &RoomId, player_id: PlayerId) -> ActionReply {
        match self.handle(room_id).await {
            Ok(h) => h.resolve_votes(player_id).await.into(),
            Err(e) => ActionReply::err(&e),
        }
    }

    pub async fn reset_game(&self, room_id: &RoomId, player_id: PlayerId) -> ActionReply {
        match self.handle(room_id).await {
            Ok(h) => h.reset_game(player_id).await.into(),
            Err(e) => ActionReply::err(&e),
        }
    }

    /// Entry point for the payment webhook: records an unlocked premium
    /// role (or category) key on the room.
    pub async fn grant_unlock(&self, room_id: &RoomId, key: String) -> ActionReply {
        match self.handle(room_id).await {
            Ok(h) => h.grant_unlock(key).await.into(),
            Err(e) => ActionReply::err(&e),
        }
    }

    pub async fn room_info(&self, room_id: &RoomId) -> Result<RoomInfo, GameError> {
        self.rooms.lock().await.room_info(room_id).await
    }

    async fn handle(
        &self,
        room_id: &RoomId,
    ) -> Result<nocturne_engine::RoomHandle, GameError> {
        let result = self.rooms.lock().await.handle(room_id).await;
        if let Err(err) = &result {
            debug!(%room_id, %err, "room handle resolution failed");
        }
        result
    }
}
