//! Room state model and store layout.
//!
//! Everything here is store-resident: the structs serialize (camelCase)
//! into the JSON subtree under `rooms/{room_id}`, one struct per
//! subscribable path:
//!
//! ```text
//! rooms/{id}/meta          RoomMeta
//! rooms/{id}/settings      RoomSettings
//! rooms/{id}/players/{pid} Player
//! rooms/{id}/roles         RoleState
//! rooms/{id}/centerPool    [RoleId; 3]
//! rooms/{id}/nightActions/{pid}  NightRecord   (private to pid)
//! rooms/{id}/state         PhaseDeadlines
//! rooms/{id}/result        Outcome
//! rooms/{id}/unlocks       ["witch", ...]
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use nocturne_protocol::{PlayerId, RoomId};
use nocturne_roles::{RoleCategory, RoleId};

/// The coarse phase graph: `waiting → night → day → voting → ended → waiting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Waiting,
    Night,
    Day,
    Voting,
    Ended,
}

impl RoomStatus {
    /// Whether a game is currently running (per-game state is live).
    pub fn in_game(&self) -> bool {
        matches!(self, Self::Night | Self::Day | Self::Voting)
    }

    /// Whether a *new* player may join. Established players may always
    /// rejoin regardless of status — that check lives in the lifecycle
    /// manager, not here.
    pub fn open_to_new_players(&self) -> bool {
        matches!(self, Self::Waiting | Self::Ended)
    }
}

impl std::fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Waiting => "waiting",
            Self::Night => "night",
            Self::Day => "day",
            Self::Voting => "voting",
            Self::Ended => "ended",
        };
        f.write_str(s)
    }
}

/// Room-level configuration, set at creation and adjustable while waiting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSettings {
    pub min_players: usize,
    pub max_players: usize,
    /// Day discussion length, seconds.
    pub discussion_secs: u64,
    /// Voting window length, seconds.
    pub voting_secs: u64,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            min_players: 3,
            max_players: 10,
            discussion_secs: 300,
            voting_secs: 60,
        }
    }
}

/// Room metadata: the phase machine's coarse state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomMeta {
    pub status: RoomStatus,
    pub created_at: u64,
    pub created_by: PlayerId,
    /// Locked role multiset once the game starts. Invariant while a game
    /// is running: `len == player_count + CENTER_SIZE` and ≥ 1
    /// werewolf-team role.
    #[serde(default)]
    pub selected_roles: Vec<RoleId>,
    /// The role currently permitted to act, or `None` outside the night
    /// phase / once night resolution is complete.
    #[serde(default)]
    pub active_night_role: Option<RoleId>,
}

/// The witch's explicit sub-state: a peek that has not been committed by
/// a swap or a skip yet. Distinct from `has_acted` by design.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum PendingAction {
    WitchPeek { center_index: usize },
}

/// One seat at the table. Persists across games within the same room.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub display_name: String,
    pub is_host: bool,
    /// Unix ms. Host re-election promotes the smallest value.
    pub joined_at: u64,
    #[serde(default)]
    pub is_ready: bool,
    /// Reset each night; meaningful only during the night phase.
    #[serde(default)]
    pub has_acted: bool,
    #[serde(default)]
    pub pending_action: Option<PendingAction>,
    /// Meaningful only during the voting phase.
    #[serde(default)]
    pub vote: Option<PlayerId>,
}

/// The two role maps: `original` is immutable once dealt, `current` is
/// mutated by swap-class actions. All mutations are rank-preserving
/// swaps — roles are never created or destroyed after the deal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleState {
    #[serde(default)]
    pub original: BTreeMap<PlayerId, RoleId>,
    #[serde(default)]
    pub current: BTreeMap<PlayerId, RoleId>,
}

/// Per-player record of the night action taken. Created empty on dealing,
/// populated as the player acts, cleared on room reset. Lives on the
/// player's private store path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NightRecord {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub targets: Vec<String>,
    /// The private result payload returned to the acting player only.
    #[serde(default)]
    pub result: Option<Value>,
}

/// Absolute phase deadlines (unix ms). Derived at transition time; nothing
/// in the core advances phases on its own — expiry is enforced when a
/// participant invokes the corresponding advance operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseDeadlines {
    #[serde(default)]
    pub day_ends_at: Option<u64>,
    #[serde(default)]
    pub voting_ends_at: Option<u64>,
}

/// Which side won. The single source of truth for the outcome enum —
/// there is deliberately no third-faction value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinningSide {
    Village,
    Werewolf,
    Nobody,
}

/// The computed result of a completed voting phase. Immutable until reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    pub votes: BTreeMap<PlayerId, PlayerId>,
    pub eliminated: Option<PlayerId>,
    pub winning_side: WinningSide,
    pub final_roles: BTreeMap<PlayerId, RoleId>,
    pub center_pool: Vec<RoleId>,
}

/// A store path that a mutation dirtied. The actor persists exactly these
/// after a successful operation — never the whole room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dirty {
    Meta,
    Settings,
    Player(PlayerId),
    RemovePlayer(PlayerId),
    Roles,
    Center,
    NightAction(PlayerId),
    /// Drop the whole `nightActions` subtree (game reset / fresh deal).
    ClearNightActions,
    State,
    Result,
    Unlocks,
}

/// The authoritative in-memory state of one room, owned by its actor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRecord {
    #[serde(skip)]
    pub id: RoomId,
    pub meta: RoomMeta,
    pub settings: RoomSettings,
    #[serde(default)]
    pub players: BTreeMap<PlayerId, Player>,
    #[serde(default)]
    pub roles: RoleState,
    #[serde(default)]
    pub center_pool: Vec<RoleId>,
    #[serde(default)]
    pub night_actions: BTreeMap<PlayerId, NightRecord>,
    #[serde(default)]
    pub state: PhaseDeadlines,
    #[serde(default)]
    pub result: Option<Outcome>,
    /// Unlocked premium role/category keys, flipped by the payment
    /// collaborator. We only ever read the boolean fact.
    #[serde(default)]
    pub unlocks: BTreeSet<String>,
}

impl RoomRecord {
    pub fn status(&self) -> RoomStatus {
        self.meta.status
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// The current host, if the room is non-empty. Exactly one player has
    /// the host flag at any time the room is non-empty.
    pub fn host(&self) -> Option<&Player> {
        self.players.values().find(|p| p.is_host)
    }

    pub fn is_host(&self, player_id: &PlayerId) -> bool {
        self.players
            .get(player_id)
            .map(|p| p.is_host)
            .unwrap_or(false)
    }

    /// Whether a premium role may be selected in this room: core roles
    /// always, Midnight roles only when the role or its category has been
    /// unlocked.
    pub fn role_permitted(&self, role: RoleId) -> bool {
        match role.def().category {
            RoleCategory::Core => true,
            RoleCategory::Midnight => {
                self.unlocks.contains(role.as_str()) || self.unlocks.contains("midnight")
            }
        }
    }

    /// Players still seated whose *original* role is `role`, in
    /// deterministic order. A player who left mid-game no longer counts
    /// toward turn advancement.
    pub fn original_holders(&self, role: RoleId) -> Vec<&PlayerId> {
        self.roles
            .original
            .iter()
            .filter(|(id, r)| **r == role && self.players.contains_key(*id))
            .map(|(id, _)| id)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Store paths
// ---------------------------------------------------------------------------

/// Path helpers for the room's store subtree.
pub(crate) mod paths {
    use nocturne_protocol::{PlayerId, RoomId};

    pub fn room(id: &RoomId) -> String {
        format!("rooms/{}", id.as_str())
    }

    pub fn meta(id: &RoomId) -> String {
        format!("rooms/{}/meta", id.as_str())
    }

    pub fn settings(id: &RoomId) -> String {
        format!("rooms/{}/settings", id.as_str())
    }

    pub fn player(id: &RoomId, pid: &PlayerId) -> String {
        format!("rooms/{}/players/{}", id.as_str(), pid.as_str())
    }

    pub fn roles(id: &RoomId) -> String {
        format!("rooms/{}/roles", id.as_str())
    }

    pub fn center_pool(id: &RoomId) -> String {
        format!("rooms/{}/centerPool", id.as_str())
    }

    pub fn night_action(id: &RoomId, pid: &PlayerId) -> String {
        format!("rooms/{}/nightActions/{}", id.as_str(), pid.as_str())
    }

    pub fn state(id: &RoomId) -> String {
        format!("rooms/{}/state", id.as_str())
    }

    pub fn result(id: &RoomId) -> String {
        format!("rooms/{}/result", id.as_str())
    }

    pub fn unlocks(id: &RoomId) -> String {
        format!("rooms/{}/unlocks", id.as_str())
    }
}
