//! Room lifecycle: create, join (new vs. reconnect), leave with host
//! re-election, role selection, game start (the deal), and reset.
//!
//! Everything here is a pure mutation of [`RoomRecord`] returning the list
//! of dirtied store paths; the actor performs the actual persistence.

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use serde_json::json;
use tracing::info;

use nocturne_protocol::{GameError, PlayerId, RoomId};
use nocturne_roles::{default_role_set, night_order, RoleId, CENTER_SIZE};

use crate::state::{
    Dirty, NightRecord, PhaseDeadlines, Player, RoleState, RoomMeta, RoomRecord, RoomSettings,
    RoomStatus,
};
use crate::timer::deadline_after;

impl RoomRecord {
    /// A fresh room with the creator as sole host. The caller (manager)
    /// has already established that no room with this id exists.
    pub fn create(
        id: RoomId,
        creator: PlayerId,
        display_name: String,
        settings: RoomSettings,
        now_ms: u64,
    ) -> Self {
        let mut players = BTreeMap::new();
        players.insert(
            creator.clone(),
            Player {
                id: creator.clone(),
                display_name,
                is_host: true,
                joined_at: now_ms,
                is_ready: false,
                has_acted: false,
                pending_action: None,
                vote: None,
            },
        );
        info!(room_id = %id, player_id = %creator, "room created");
        Self {
            id,
            meta: RoomMeta {
                status: RoomStatus::Waiting,
                created_at: now_ms,
                created_by: creator,
                selected_roles: Vec::new(),
                active_night_role: None,
            },
            settings,
            players,
            roles: RoleState::default(),
            center_pool: Vec::new(),
            night_actions: BTreeMap::new(),
            state: PhaseDeadlines::default(),
            result: None,
            unlocks: Default::default(),
        }
    }

    /// Join, with the deliberate reconnect asymmetry: an id that already
    /// has a seat may always rejoin (only the display name is refreshed —
    /// never host flag, vote, `has_acted`, or `joined_at`), while a new id
    /// is admitted only while the room is open to newcomers.
    pub fn join(
        &mut self,
        player_id: PlayerId,
        display_name: String,
        now_ms: u64,
    ) -> Result<Vec<Dirty>, GameError> {
        if let Some(existing) = self.players.get_mut(&player_id) {
            existing.display_name = display_name;
            info!(room_id = %self.id, %player_id, "player reconnected");
            return Ok(vec![Dirty::Player(player_id)]);
        }

        if !self.status().open_to_new_players() {
            return Err(GameError::in_progress());
        }
        if self.player_count() >= self.settings.max_players {
            return Err(GameError::Validation("room_full".into()));
        }

        self.players.insert(
            player_id.clone(),
            Player {
                id: player_id.clone(),
                display_name,
                is_host: self.players.is_empty(),
                joined_at: now_ms,
                is_ready: false,
                has_acted: false,
                pending_action: None,
                vote: None,
            },
        );
        info!(
            room_id = %self.id,
            %player_id,
            players = self.player_count(),
            "player joined"
        );
        Ok(vec![Dirty::Player(player_id)])
    }

    /// Leave. If the departing player hosts a non-empty remainder, the
    /// longest-seated remaining player (smallest `joined_at`, player id as
    /// the deterministic tie-break) is promoted first. Returns the dirty
    /// paths and whether the room is now empty (caller deletes it).
    pub fn leave(&mut self, player_id: &PlayerId) -> Result<(Vec<Dirty>, bool), GameError> {
        let departing = self
            .players
            .get(player_id)
            .ok_or_else(|| GameError::NotFound("player_not_in_room".into()))?;
        let was_host = departing.is_host;

        let mut dirty = Vec::new();
        if was_host {
            let successor = self
                .players
                .values()
                .filter(|p| p.id != *player_id)
                .min_by_key(|p| (p.joined_at, p.id.clone()))
                .map(|p| p.id.clone());
            if let Some(next_host) = successor {
                // Promotion and removal are separate writes; see DESIGN.md
                // for the accepted concurrent-leave window.
                if let Some(p) = self.players.get_mut(&next_host) {
                    p.is_host = true;
                }
                info!(room_id = %self.id, player_id = %next_host, "host promoted");
                dirty.push(Dirty::Player(next_host));
            }
        }

        self.players.remove(player_id);
        dirty.push(Dirty::RemovePlayer(player_id.clone()));
        info!(
            room_id = %self.id,
            %player_id,
            players = self.player_count(),
            "player left"
        );
        Ok((dirty, self.players.is_empty()))
    }

    /// Refreshes a player's display name only.
    pub fn update_display_name(
        &mut self,
        player_id: &PlayerId,
        display_name: String,
    ) -> Result<Vec<Dirty>, GameError> {
        let player = self
            .players
            .get_mut(player_id)
            .ok_or_else(|| GameError::NotFound("player_not_in_room".into()))?;
        player.display_name = display_name;
        Ok(vec![Dirty::Player(player_id.clone())])
    }

    pub fn set_ready(
        &mut self,
        player_id: &PlayerId,
        ready: bool,
    ) -> Result<Vec<Dirty>, GameError> {
        let player = self
            .players
            .get_mut(player_id)
            .ok_or_else(|| GameError::NotFound("player_not_in_room".into()))?;
        player.is_ready = ready;
        Ok(vec![Dirty::Player(player_id.clone())])
    }

    /// Host picks the role multiset for the next game. Counts and the
    /// werewolf requirement are validated at start time (the player count
    /// may still change while waiting); unlock facts are checked here so
    /// the refusal is immediate.
    pub fn select_roles(
        &mut self,
        requester: &PlayerId,
        roles: Vec<RoleId>,
    ) -> Result<Vec<Dirty>, GameError> {
        if !self.is_host(requester) {
            return Err(GameError::Authorization("host_only".into()));
        }
        if self.status().in_game() {
            return Err(GameError::StateConflict("in_progress".into()));
        }
        for role in &roles {
            if !self.role_permitted(*role) {
                return Err(GameError::Validation(format!("role_locked: {role}")));
            }
        }
        self.meta.selected_roles = roles;
        Ok(vec![Dirty::Meta])
    }

    /// Records an unlock fact from the payment collaborator. The key is a
    /// role name or a category name; idempotent.
    pub fn grant_unlock(&mut self, key: String) -> Vec<Dirty> {
        if self.unlocks.insert(key) {
            vec![Dirty::Unlocks]
        } else {
            Vec::new()
        }
    }

    /// Starts a game: validates, shuffles, deals, and enters the night
    /// phase at the first wake-enabled role somebody actually holds (or
    /// skips straight to day when nobody wakes).
    pub fn start_game(&mut self, requester: &PlayerId, now_ms: u64) -> Result<Vec<Dirty>, GameError> {
        if !self.is_host(requester) {
            return Err(GameError::Authorization("host_only".into()));
        }
        if self.status().in_game() {
            return Err(GameError::StateConflict("in_progress".into()));
        }
        let count = self.player_count();
        if count < self.settings.min_players || count > self.settings.max_players {
            return Err(GameError::Validation(format!(
                "player_count_out_of_range: {count}"
            )));
        }

        let selected = if self.meta.selected_roles.is_empty() {
            default_role_set(count)
        } else {
            self.meta.selected_roles.clone()
        };
        if selected.len() != count + CENTER_SIZE {
            return Err(GameError::Validation(format!(
                "role_count_mismatch: {} roles for {} players",
                selected.len(),
                count
            )));
        }
        if !selected.iter().any(|r| r.is_werewolf_team()) {
            return Err(GameError::Validation("werewolf_required".into()));
        }
        for role in &selected {
            if !self.role_permitted(*role) {
                return Err(GameError::Validation(format!("role_locked: {role}")));
            }
        }

        let mut deck = selected.clone();
        deck.shuffle(&mut rand::rng());

        self.roles = RoleState::default();
        self.night_actions.clear();
        let mut dirty = vec![Dirty::ClearNightActions];
        for (i, player_id) in self.players.keys().cloned().collect::<Vec<_>>().iter().enumerate() {
            let role = deck[i];
            self.roles.original.insert(player_id.clone(), role);
            self.roles.current.insert(player_id.clone(), role);
            self.night_actions
                .insert(player_id.clone(), NightRecord::default());
            dirty.push(Dirty::NightAction(player_id.clone()));
        }
        self.center_pool = deck[count..].to_vec();

        for player in self.players.values_mut() {
            player.has_acted = false;
            player.pending_action = None;
            player.vote = None;
            player.is_ready = false;
        }
        dirty.extend(self.players.keys().cloned().map(Dirty::Player));

        self.meta.selected_roles = selected;
        self.result = None;
        self.state = PhaseDeadlines::default();

        self.meta.active_night_role = self.first_waking_role();
        if self.meta.active_night_role.is_some() {
            self.meta.status = RoomStatus::Night;
        } else {
            // Nobody holds a wake-enabled role: skip the night entirely.
            self.meta.status = RoomStatus::Day;
            self.state.day_ends_at = Some(deadline_after(now_ms, self.settings.discussion_secs));
        }

        info!(
            room_id = %self.id,
            players = count,
            active = ?self.meta.active_night_role,
            "game started"
        );
        dirty.extend([
            Dirty::Meta,
            Dirty::Roles,
            Dirty::Center,
            Dirty::State,
            Dirty::Result,
        ]);
        Ok(dirty)
    }

    /// Clears all per-game entities and returns the room to `waiting`.
    /// Players, settings, unlocks, and the locked role selection persist
    /// across games.
    pub fn reset_game(&mut self, requester: &PlayerId) -> Result<Vec<Dirty>, GameError> {
        if !self.is_host(requester) {
            return Err(GameError::Authorization("host_only".into()));
        }

        self.meta.status = RoomStatus::Waiting;
        self.meta.active_night_role = None;
        self.roles = RoleState::default();
        self.center_pool.clear();
        self.night_actions.clear();
        self.state = PhaseDeadlines::default();
        self.result = None;
        for player in self.players.values_mut() {
            player.has_acted = false;
            player.pending_action = None;
            player.vote = None;
            player.is_ready = false;
        }

        info!(room_id = %self.id, "room reset to waiting");
        let mut dirty = vec![
            Dirty::Meta,
            Dirty::Roles,
            Dirty::Center,
            Dirty::ClearNightActions,
            Dirty::State,
            Dirty::Result,
        ];
        dirty.extend(self.players.keys().cloned().map(Dirty::Player));
        Ok(dirty)
    }

    /// The first role in night order that at least one seated player was
    /// dealt, skipping absent roles.
    pub(crate) fn first_waking_role(&self) -> Option<RoleId> {
        night_order()
            .into_iter()
            .find(|role| !self.original_holders(*role).is_empty())
    }

    /// The player's own private deal, as returned from `start_game` data
    /// queries: original role only — later swaps stay secret until dawn.
    pub fn dealt_role(&self, player_id: &PlayerId) -> Option<serde_json::Value> {
        self.roles
            .original
            .get(player_id)
            .map(|role| json!({ "role": role }))
    }
}
