//! Role definitions and derived orderings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of role cards dealt to the center pool, never to a player.
pub const CENTER_SIZE: usize = 3;

/// Which side a role scores with at the end of the game.
///
/// `Neutral` is reserved in the schema for third-faction roles; no shipped
/// role uses it, and the outcome computation only knows Village and
/// Werewolf (see the engine's vote module).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    Village,
    Werewolf,
    Neutral,
}

/// Purchase category a role belongs to. `Core` roles are always available;
/// `Midnight` roles must be unlocked for the room before they can be
/// selected (the payment collaborator flips that fact, we only read it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleCategory {
    Core,
    Midnight,
}

/// Every role the engine knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleId {
    Villager,
    Werewolf,
    Minion,
    Mason,
    Seer,
    Robber,
    Witch,
    Troublemaker,
    Drunk,
    Insomniac,
}

impl RoleId {
    /// All roles, in declaration order. Useful for catalog-wide checks.
    pub const ALL: [RoleId; 10] = [
        RoleId::Villager,
        RoleId::Werewolf,
        RoleId::Minion,
        RoleId::Mason,
        RoleId::Seer,
        RoleId::Robber,
        RoleId::Witch,
        RoleId::Troublemaker,
        RoleId::Drunk,
        RoleId::Insomniac,
    ];

    /// The snake_case name used in store paths and client payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleId::Villager => "villager",
            RoleId::Werewolf => "werewolf",
            RoleId::Minion => "minion",
            RoleId::Mason => "mason",
            RoleId::Seer => "seer",
            RoleId::Robber => "robber",
            RoleId::Witch => "witch",
            RoleId::Troublemaker => "troublemaker",
            RoleId::Drunk => "drunk",
            RoleId::Insomniac => "insomniac",
        }
    }

    /// Shorthand for this role's static definition.
    pub fn def(&self) -> &'static RoleDefinition {
        RoleDefinition::of(*self)
    }

    /// Whether this role scores with the werewolf side.
    pub fn is_werewolf_team(&self) -> bool {
        self.def().team == Team::Werewolf
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The static description of a role: who it scores with, whether and when
/// it wakes, and what its night action is allowed to touch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDefinition {
    pub id: RoleId,
    pub team: Team,
    pub has_night_action: bool,
    /// Position in the night order. Only meaningful when
    /// `has_night_action` is true; unique among wake-enabled roles
    /// by construction (pinned by a test).
    pub night_order_index: u16,
    /// The action reveals information but never mutates role assignments.
    pub discovery_only: bool,
    /// The action can change which role a player (or center slot) holds.
    pub affects_final_roles: bool,
    pub can_target_self: bool,
    pub can_target_center: bool,
    pub category: RoleCategory,
}

impl RoleDefinition {
    /// Looks up the static definition for a role.
    pub fn of(id: RoleId) -> &'static RoleDefinition {
        match id {
            RoleId::Villager => &VILLAGER,
            RoleId::Werewolf => &WEREWOLF,
            RoleId::Minion => &MINION,
            RoleId::Mason => &MASON,
            RoleId::Seer => &SEER,
            RoleId::Robber => &ROBBER,
            RoleId::Witch => &WITCH,
            RoleId::Troublemaker => &TROUBLEMAKER,
            RoleId::Drunk => &DRUNK,
            RoleId::Insomniac => &INSOMNIAC,
        }
    }
}

const VILLAGER: RoleDefinition = RoleDefinition {
    id: RoleId::Villager,
    team: Team::Village,
    has_night_action: false,
    night_order_index: 0,
    discovery_only: false,
    affects_final_roles: false,
    can_target_self: false,
    can_target_center: false,
    category: RoleCategory::Core,
};

const WEREWOLF: RoleDefinition = RoleDefinition {
    id: RoleId::Werewolf,
    team: Team::Werewolf,
    has_night_action: true,
    night_order_index: 20,
    discovery_only: true,
    affects_final_roles: false,
    can_target_self: false,
    // Lone-wolf center peek: reads (never writes) one center slot.
    can_target_center: true,
    category: RoleCategory::Core,
};

const MINION: RoleDefinition = RoleDefinition {
    id: RoleId::Minion,
    team: Team::Werewolf,
    has_night_action: true,
    night_order_index: 30,
    discovery_only: true,
    affects_final_roles: false,
    can_target_self: false,
    can_target_center: false,
    category: RoleCategory::Core,
};

const MASON: RoleDefinition = RoleDefinition {
    id: RoleId::Mason,
    team: Team::Village,
    has_night_action: true,
    night_order_index: 40,
    discovery_only: true,
    affects_final_roles: false,
    can_target_self: false,
    can_target_center: false,
    category: RoleCategory::Core,
};

const SEER: RoleDefinition = RoleDefinition {
    id: RoleId::Seer,
    team: Team::Village,
    has_night_action: true,
    night_order_index: 50,
    discovery_only: true,
    affects_final_roles: false,
    can_target_self: false,
    can_target_center: true,
    category: RoleCategory::Core,
};

const ROBBER: RoleDefinition = RoleDefinition {
    id: RoleId::Robber,
    team: Team::Village,
    has_night_action: true,
    night_order_index: 60,
    discovery_only: false,
    affects_final_roles: true,
    can_target_self: false,
    can_target_center: false,
    category: RoleCategory::Core,
};

const WITCH: RoleDefinition = RoleDefinition {
    id: RoleId::Witch,
    team: Team::Village,
    has_night_action: true,
    night_order_index: 65,
    discovery_only: false,
    affects_final_roles: true,
    can_target_self: true,
    can_target_center: true,
    category: RoleCategory::Midnight,
};

const TROUBLEMAKER: RoleDefinition = RoleDefinition {
    id: RoleId::Troublemaker,
    team: Team::Village,
    has_night_action: true,
    night_order_index: 70,
    discovery_only: false,
    affects_final_roles: true,
    can_target_self: false,
    can_target_center: false,
    category: RoleCategory::Core,
};

const DRUNK: RoleDefinition = RoleDefinition {
    id: RoleId::Drunk,
    team: Team::Village,
    has_night_action: true,
    night_order_index: 80,
    discovery_only: false,
    affects_final_roles: true,
    can_target_self: false,
    can_target_center: true,
    category: RoleCategory::Midnight,
};

const INSOMNIAC: RoleDefinition = RoleDefinition {
    id: RoleId::Insomniac,
    team: Team::Village,
    has_night_action: true,
    night_order_index: 90,
    discovery_only: true,
    affects_final_roles: false,
    can_target_self: true,
    can_target_center: false,
    category: RoleCategory::Core,
};

/// The wake sequence: wake-enabled roles sorted by their order index.
pub fn night_order() -> Vec<RoleId> {
    let mut wakers: Vec<RoleId> = RoleId::ALL
        .into_iter()
        .filter(|r| r.def().has_night_action)
        .collect();
    wakers.sort_by_key(|r| r.def().night_order_index);
    wakers
}

/// The stock role multiset for `player_count` players: always two
/// werewolves plus the classic information/swap roles, padded with
/// villagers up to `player_count + CENTER_SIZE` cards.
///
/// Callers validate the player count range; this function only answers
/// "what would the default deal be".
pub fn default_role_set(player_count: usize) -> Vec<RoleId> {
    let mut set = vec![
        RoleId::Werewolf,
        RoleId::Werewolf,
        RoleId::Seer,
        RoleId::Robber,
        RoleId::Troublemaker,
        RoleId::Insomniac,
    ];
    let total = player_count + CENTER_SIZE;
    while set.len() < total {
        set.push(RoleId::Villager);
    }
    set.truncate(total);
    set
}
