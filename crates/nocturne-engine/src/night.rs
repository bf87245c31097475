//! Night-action resolution.
//!
//! A state machine over `activeNightRole`. Every request passes the turn
//! guard (night phase, requester's original role is the active one, not
//! acted yet) and is then dispatched on the action tag. Discovery actions
//! read the current assignment and return a private payload; swap actions
//! exchange `currentRole` entries (rank-preserving, roles are never created
//! or destroyed after the deal). The witch is the one two-step role: a peek
//! parks a pending sub-state and only the follow-up swap or skip commits
//! the turn.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use nocturne_protocol::{GameError, PlayerId};
use nocturne_roles::{night_order, RoleId, CENTER_SIZE};

use crate::state::{Dirty, PendingAction, RoomRecord, RoomStatus};
use crate::timer::deadline_after;

/// The tagged night-action vocabulary. The tag doubles as the wire name
/// and the stored `NightRecord.action` value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum NightAction {
    /// Werewolves learn their packmates; a lone werewolf may additionally
    /// peek one center slot.
    WerewolfPeek { center_index: Option<usize> },
    MinionInspect,
    MasonInspect,
    /// Exactly one of `target` (a player's current role) or
    /// `center_indices` (up to two center slots).
    SeerPeek {
        target: Option<PlayerId>,
        center_indices: Option<Vec<usize>>,
    },
    RobberSwap { target: PlayerId },
    TroublemakerSwap { first: PlayerId, second: PlayerId },
    DrunkSwap { center_index: usize },
    InsomniacCheck,
    WitchPeek { center_index: usize },
    WitchSwap { target: PlayerId },
    WitchSkip,
}

impl NightAction {
    /// The role each action variant belongs to; the dispatch key.
    pub fn role(&self) -> RoleId {
        match self {
            Self::WerewolfPeek { .. } => RoleId::Werewolf,
            Self::MinionInspect => RoleId::Minion,
            Self::MasonInspect => RoleId::Mason,
            Self::SeerPeek { .. } => RoleId::Seer,
            Self::RobberSwap { .. } => RoleId::Robber,
            Self::TroublemakerSwap { .. } => RoleId::Troublemaker,
            Self::DrunkSwap { .. } => RoleId::Drunk,
            Self::InsomniacCheck => RoleId::Insomniac,
            Self::WitchPeek { .. } | Self::WitchSwap { .. } | Self::WitchSkip => RoleId::Witch,
        }
    }

    /// The stored action name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::WerewolfPeek { .. } => "werewolf_peek",
            Self::MinionInspect => "minion_inspect",
            Self::MasonInspect => "mason_inspect",
            Self::SeerPeek { .. } => "seer_peek",
            Self::RobberSwap { .. } => "robber_swap",
            Self::TroublemakerSwap { .. } => "troublemaker_swap",
            Self::DrunkSwap { .. } => "drunk_swap",
            Self::InsomniacCheck => "insomniac_check",
            Self::WitchPeek { .. } => "witch_peek",
            Self::WitchSwap { .. } => "witch_swap",
            Self::WitchSkip => "witch_skip",
        }
    }

    fn targets(&self) -> Vec<String> {
        match self {
            Self::WerewolfPeek {
                center_index: Some(i),
            } => vec![format!("center:{i}")],
            Self::SeerPeek {
                target: Some(t), ..
            } => vec![t.to_string()],
            Self::SeerPeek {
                center_indices: Some(idx),
                ..
            } => idx.iter().map(|i| format!("center:{i}")).collect(),
            Self::RobberSwap { target } | Self::WitchSwap { target } => vec![target.to_string()],
            Self::TroublemakerSwap { first, second } => {
                vec![first.to_string(), second.to_string()]
            }
            Self::DrunkSwap { center_index } | Self::WitchPeek { center_index } => {
                vec![format!("center:{center_index}")]
            }
            _ => Vec::new(),
        }
    }
}

fn turn_order(msg: &str) -> GameError {
    GameError::TurnOrder(msg.to_string())
}

fn validation(msg: &str) -> GameError {
    GameError::Validation(msg.to_string())
}

impl RoomRecord {
    /// Validates and executes one night action for `actor`, advancing the
    /// turn when it commits. Returns the dirtied paths and the private
    /// result payload (for the acting player only).
    pub fn perform_night_action(
        &mut self,
        actor: &PlayerId,
        action: NightAction,
        now_ms: u64,
    ) -> Result<(Vec<Dirty>, Option<Value>), GameError> {
        let active = self.guard_turn(actor)?;
        if action.role() != active {
            return Err(turn_order("wrong_action_for_active_role"));
        }

        debug!(room_id = %self.id, %actor, action = action.name(), "night action");
        let (result, mut dirty, commits) = self.dispatch(actor, &action)?;

        self.record_action(actor, action.name(), action.targets(), result.clone());
        dirty.push(Dirty::NightAction(actor.clone()));

        if commits {
            let player = self.players.get_mut(actor).ok_or_else(|| {
                GameError::NotFound("player_not_in_room".into())
            })?;
            player.has_acted = true;
            player.pending_action = None;
            dirty.push(Dirty::Player(actor.clone()));
            dirty.extend(self.advance_turn(now_ms));
        } else {
            // Witch peek: pending sub-state only, the turn stays open.
            dirty.push(Dirty::Player(actor.clone()));
        }

        Ok((dirty, result))
    }

    /// Skips the actor's turn without any effect on role state. Subject to
    /// the same turn guard as a real action; a witch's uncommitted peek is
    /// discarded.
    pub fn skip_night_action(
        &mut self,
        actor: &PlayerId,
        now_ms: u64,
    ) -> Result<Vec<Dirty>, GameError> {
        self.guard_turn(actor)?;

        self.record_action(actor, "skip", Vec::new(), None);
        let player = self
            .players
            .get_mut(actor)
            .ok_or_else(|| GameError::NotFound("player_not_in_room".into()))?;
        player.has_acted = true;
        player.pending_action = None;

        let mut dirty = vec![Dirty::NightAction(actor.clone()), Dirty::Player(actor.clone())];
        dirty.extend(self.advance_turn(now_ms));
        Ok(dirty)
    }

    /// Host escape hatch: ends the night immediately, abandoning any
    /// unfinished turns (including an uncommitted witch peek).
    pub fn force_advance_to_day(
        &mut self,
        requester: &PlayerId,
        now_ms: u64,
    ) -> Result<Vec<Dirty>, GameError> {
        if !self.is_host(requester) {
            return Err(GameError::Authorization("host_only".into()));
        }
        if self.status() != RoomStatus::Night {
            return Err(GameError::StateConflict("not_night".into()));
        }

        let mut dirty = Vec::new();
        for player in self.players.values_mut() {
            if player.pending_action.take().is_some() {
                dirty.push(Dirty::Player(player.id.clone()));
            }
        }
        dirty.extend(self.enter_day(now_ms));
        info!(room_id = %self.id, "night force-advanced to day");
        Ok(dirty)
    }

    /// The `(status, activeNightRole, hasActed)` turn guard. Returns the
    /// active role on success; violations have no side effect.
    fn guard_turn(&self, actor: &PlayerId) -> Result<RoleId, GameError> {
        if self.status() != RoomStatus::Night {
            return Err(GameError::StateConflict("not_night".into()));
        }
        let player = self
            .players
            .get(actor)
            .ok_or_else(|| GameError::NotFound("player_not_in_room".into()))?;
        let active = self
            .meta
            .active_night_role
            .ok_or_else(|| turn_order("night_resolution_complete"))?;
        let original = self
            .roles
            .original
            .get(actor)
            .ok_or_else(|| turn_order("no_role_dealt"))?;
        if *original != active {
            return Err(turn_order("not_your_turn"));
        }
        if player.has_acted {
            return Err(turn_order("already_acted"));
        }
        Ok(active)
    }

    /// Role dispatch. Returns `(private_result, dirty, commits)`; `commits`
    /// is false only for the witch peek, which leaves the turn open.
    fn dispatch(
        &mut self,
        actor: &PlayerId,
        action: &NightAction,
    ) -> Result<(Option<Value>, Vec<Dirty>, bool), GameError> {
        match action {
            NightAction::WerewolfPeek { center_index } => self.werewolf_peek(actor, *center_index),
            NightAction::MinionInspect => Ok((
                Some(json!({ "werewolves": self.holders_of(RoleId::Werewolf, None) })),
                Vec::new(),
                true,
            )),
            NightAction::MasonInspect => Ok((
                Some(json!({ "masons": self.holders_of(RoleId::Mason, Some(actor)) })),
                Vec::new(),
                true,
            )),
            NightAction::SeerPeek {
                target,
                center_indices,
            } => self.seer_peek(actor, target.as_ref(), center_indices.as_deref()),
            NightAction::RobberSwap { target } => self.robber_swap(actor, target),
            NightAction::TroublemakerSwap { first, second } => {
                self.troublemaker_swap(actor, first, second)
            }
            NightAction::InsomniacCheck => {
                let role = self.current_role(actor)?;
                Ok((Some(json!({ "role": role })), Vec::new(), true))
            }
            NightAction::DrunkSwap { center_index } => self.drunk_swap(actor, *center_index),
            NightAction::WitchPeek { center_index } => self.witch_peek(actor, *center_index),
            NightAction::WitchSwap { target } => self.witch_swap(actor, target),
            NightAction::WitchSkip => {
                self.pending_peek(actor)?;
                Ok((None, Vec::new(), true))
            }
        }
    }

    fn werewolf_peek(
        &mut self,
        actor: &PlayerId,
        center_index: Option<usize>,
    ) -> Result<(Option<Value>, Vec<Dirty>, bool), GameError> {
        let packmates = self.holders_of(RoleId::Werewolf, Some(actor));
        let lone = packmates.is_empty();
        match center_index {
            None => Ok((
                Some(json!({ "werewolves": packmates, "isLoneWolf": lone })),
                Vec::new(),
                true,
            )),
            Some(i) => {
                // The center peek is reserved for a lone wolf.
                if !lone {
                    return Err(validation("center_peek_requires_lone_werewolf"));
                }
                let role = self.center_role(i)?;
                Ok((
                    Some(json!({
                        "werewolves": [],
                        "isLoneWolf": true,
                        "centerRole": role,
                    })),
                    Vec::new(),
                    true,
                ))
            }
        }
    }

    fn seer_peek(
        &mut self,
        actor: &PlayerId,
        target: Option<&PlayerId>,
        center_indices: Option<&[usize]>,
    ) -> Result<(Option<Value>, Vec<Dirty>, bool), GameError> {
        match (target, center_indices) {
            (Some(target), None) => {
                if target == actor {
                    return Err(validation("cannot_target_self"));
                }
                let role = self.current_role(target)?;
                Ok((
                    Some(json!({ "target": target, "role": role })),
                    Vec::new(),
                    true,
                ))
            }
            (None, Some(indices)) => {
                if indices.is_empty() || indices.len() > 2 {
                    return Err(validation("center_peek_takes_one_or_two_slots"));
                }
                if indices.len() == 2 && indices[0] == indices[1] {
                    return Err(validation("center_slots_must_differ"));
                }
                let mut peeked = Vec::with_capacity(indices.len());
                for &i in indices {
                    let role = self.center_role(i)?;
                    peeked.push(json!({ "index": i, "role": role }));
                }
                Ok((Some(json!({ "centerRoles": peeked })), Vec::new(), true))
            }
            _ => Err(validation("seer_takes_a_player_or_center_slots")),
        }
    }

    fn robber_swap(
        &mut self,
        actor: &PlayerId,
        target: &PlayerId,
    ) -> Result<(Option<Value>, Vec<Dirty>, bool), GameError> {
        if target == actor {
            return Err(validation("cannot_target_self"));
        }
        self.swap_players(actor, target)?;
        let stolen = self.current_role(actor)?;
        Ok((
            Some(json!({ "newRole": stolen })),
            vec![Dirty::Roles],
            true,
        ))
    }

    fn troublemaker_swap(
        &mut self,
        actor: &PlayerId,
        first: &PlayerId,
        second: &PlayerId,
    ) -> Result<(Option<Value>, Vec<Dirty>, bool), GameError> {
        if first == second {
            return Err(validation("targets_must_differ"));
        }
        if first == actor || second == actor {
            return Err(validation("cannot_target_self"));
        }
        self.swap_players(first, second)?;
        // The troublemaker learns nothing about the swapped roles.
        Ok((None, vec![Dirty::Roles], true))
    }

    fn drunk_swap(
        &mut self,
        actor: &PlayerId,
        center_index: usize,
    ) -> Result<(Option<Value>, Vec<Dirty>, bool), GameError> {
        self.swap_with_center(actor, center_index)?;
        // Blind swap: the drunk never sees the role it drew.
        Ok((None, vec![Dirty::Roles, Dirty::Center], true))
    }

    fn witch_peek(
        &mut self,
        actor: &PlayerId,
        center_index: usize,
    ) -> Result<(Option<Value>, Vec<Dirty>, bool), GameError> {
        let player = self
            .players
            .get(actor)
            .ok_or_else(|| GameError::NotFound("player_not_in_room".into()))?;
        if player.pending_action.is_some() {
            return Err(GameError::StateConflict("peek_already_pending".into()));
        }
        let role = self.center_role(center_index)?;
        if let Some(p) = self.players.get_mut(actor) {
            p.pending_action = Some(PendingAction::WitchPeek { center_index });
        }
        Ok((
            Some(json!({ "centerIndex": center_index, "centerRole": role })),
            Vec::new(),
            false,
        ))
    }

    fn witch_swap(
        &mut self,
        actor: &PlayerId,
        target: &PlayerId,
    ) -> Result<(Option<Value>, Vec<Dirty>, bool), GameError> {
        // Unlike the other swaps the witch may target herself.
        let center_index = self.pending_peek(actor)?;
        self.swap_with_center(target, center_index)?;
        Ok((None, vec![Dirty::Roles, Dirty::Center], true))
    }

    /// The committed peek a witch follow-up requires.
    fn pending_peek(&self, actor: &PlayerId) -> Result<usize, GameError> {
        match self
            .players
            .get(actor)
            .and_then(|p| p.pending_action.as_ref())
        {
            Some(PendingAction::WitchPeek { center_index }) => Ok(*center_index),
            None => Err(GameError::StateConflict("no_pending_peek".into())),
        }
    }

    /// Players whose *current* role is `role`, excluding `except`.
    fn holders_of(&self, role: RoleId, except: Option<&PlayerId>) -> Vec<PlayerId> {
        self.roles
            .current
            .iter()
            .filter(|(id, r)| {
                **r == role && except != Some(*id) && self.players.contains_key(*id)
            })
            .map(|(id, _)| id.clone())
            .collect()
    }

    fn current_role(&self, player: &PlayerId) -> Result<RoleId, GameError> {
        self.roles
            .current
            .get(player)
            .copied()
            .ok_or_else(|| GameError::NotFound("player_has_no_role".into()))
    }

    fn center_role(&self, index: usize) -> Result<RoleId, GameError> {
        if index >= CENTER_SIZE {
            return Err(validation("center_index_out_of_range"));
        }
        self.center_pool
            .get(index)
            .copied()
            .ok_or_else(|| validation("center_index_out_of_range"))
    }

    fn swap_players(&mut self, a: &PlayerId, b: &PlayerId) -> Result<(), GameError> {
        let role_a = self.current_role(a)?;
        let role_b = self.current_role(b)?;
        self.roles.current.insert(a.clone(), role_b);
        self.roles.current.insert(b.clone(), role_a);
        Ok(())
    }

    fn swap_with_center(&mut self, player: &PlayerId, index: usize) -> Result<(), GameError> {
        let center = self.center_role(index)?;
        let held = self.current_role(player)?;
        self.roles.current.insert(player.clone(), center);
        self.center_pool[index] = held;
        Ok(())
    }

    fn record_action(
        &mut self,
        actor: &PlayerId,
        name: &str,
        targets: Vec<String>,
        result: Option<Value>,
    ) {
        let record = self.night_actions.entry(actor.clone()).or_default();
        record.action = Some(name.to_string());
        record.targets = targets;
        record.result = result;
    }

    /// Once every seated holder of the active role has acted, moves the
    /// active role forward in night order (skipping roles nobody holds),
    /// or ends the night when the order is exhausted.
    fn advance_turn(&mut self, now_ms: u64) -> Vec<Dirty> {
        let Some(active) = self.meta.active_night_role else {
            return Vec::new();
        };
        let all_acted = self
            .original_holders(active)
            .iter()
            .all(|id| self.players.get(id).is_some_and(|p| p.has_acted));
        if !all_acted {
            return Vec::new();
        }

        let next = night_order()
            .into_iter()
            .skip_while(|r| *r != active)
            .skip(1)
            .find(|r| !self.original_holders(*r).is_empty());

        match next {
            Some(role) => {
                debug!(room_id = %self.id, next = %role, "night turn advanced");
                self.meta.active_night_role = Some(role);
                vec![Dirty::Meta]
            }
            None => self.enter_day(now_ms),
        }
    }

    fn enter_day(&mut self, now_ms: u64) -> Vec<Dirty> {
        self.meta.active_night_role = None;
        self.meta.status = RoomStatus::Day;
        self.state.day_ends_at = Some(deadline_after(now_ms, self.settings.discussion_secs));
        info!(room_id = %self.id, "night resolved, day begins");
        vec![Dirty::Meta, Dirty::State]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{NightRecord, RoomSettings};
    use nocturne_protocol::RoomId;

    /// A night-phase room with a stacked (non-random) deal.
    fn stacked_room(deal: &[(&str, RoleId)], center: [RoleId; 3]) -> RoomRecord {
        let mut room = RoomRecord::create(
            RoomId::from("r1"),
            PlayerId::from(deal[0].0),
            deal[0].0.to_string(),
            RoomSettings::default(),
            1_000,
        );
        for (i, (pid, _)) in deal.iter().enumerate().skip(1) {
            room.join(PlayerId::from(*pid), pid.to_string(), 1_000 + i as u64)
                .unwrap();
        }
        for (pid, role) in deal {
            let pid = PlayerId::from(*pid);
            room.roles.original.insert(pid.clone(), *role);
            room.roles.current.insert(pid.clone(), *role);
            room.night_actions.insert(pid, NightRecord::default());
        }
        room.center_pool = center.to_vec();
        room.meta.selected_roles = deal.iter().map(|(_, r)| *r).collect();
        room.meta.selected_roles.extend(center);
        room.meta.status = RoomStatus::Night;
        room.meta.active_night_role = room.first_waking_role();
        room
    }

    fn pid(s: &str) -> PlayerId {
        PlayerId::from(s)
    }

    #[test]
    fn test_turn_guard_rejects_out_of_turn_and_repeat() {
        let mut room = stacked_room(
            &[
                ("a", RoleId::Werewolf),
                ("b", RoleId::Werewolf),
                ("c", RoleId::Seer),
            ],
            [RoleId::Villager, RoleId::Villager, RoleId::Robber],
        );
        assert_eq!(room.meta.active_night_role, Some(RoleId::Werewolf));

        // Seer cannot act during the werewolf turn.
        let err = room
            .perform_night_action(
                &pid("c"),
                NightAction::SeerPeek {
                    target: Some(pid("a")),
                    center_indices: None,
                },
                2_000,
            )
            .unwrap_err();
        assert!(matches!(err, GameError::TurnOrder(_)));

        // First werewolf acts, then retries: harmless rejection.
        room.perform_night_action(&pid("a"), NightAction::WerewolfPeek { center_index: None }, 2_000)
            .unwrap();
        let err = room
            .perform_night_action(
                &pid("a"),
                NightAction::WerewolfPeek { center_index: None },
                2_001,
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "already_acted");
    }

    #[test]
    fn test_action_tag_must_match_active_role() {
        let mut room = stacked_room(
            &[("a", RoleId::Werewolf), ("b", RoleId::Seer), ("c", RoleId::Villager)],
            [RoleId::Villager, RoleId::Robber, RoleId::Mason],
        );
        // The werewolf cannot submit a seer action on its own turn.
        let err = room
            .perform_night_action(
                &pid("a"),
                NightAction::SeerPeek {
                    target: Some(pid("b")),
                    center_indices: None,
                },
                2_000,
            )
            .unwrap_err();
        assert!(matches!(err, GameError::TurnOrder(_)));
    }

    #[test]
    fn test_pack_werewolves_see_each_other() {
        let mut room = stacked_room(
            &[
                ("a", RoleId::Werewolf),
                ("b", RoleId::Werewolf),
                ("c", RoleId::Villager),
            ],
            [RoleId::Seer, RoleId::Robber, RoleId::Mason],
        );
        let (_, result) = room
            .perform_night_action(&pid("a"), NightAction::WerewolfPeek { center_index: None }, 2_000)
            .unwrap();
        let result = result.unwrap();
        assert_eq!(result["werewolves"], json!(["b"]));
        assert_eq!(result["isLoneWolf"], json!(false));

        // Two holders share the slot: the turn does not advance until both act.
        assert_eq!(room.meta.active_night_role, Some(RoleId::Werewolf));
        room.perform_night_action(&pid("b"), NightAction::WerewolfPeek { center_index: None }, 2_001)
            .unwrap();
        assert_ne!(room.meta.active_night_role, Some(RoleId::Werewolf));
    }

    #[test]
    fn test_lone_werewolf_center_peek() {
        let mut room = stacked_room(
            &[
                ("a", RoleId::Werewolf),
                ("b", RoleId::Villager),
                ("c", RoleId::Villager),
            ],
            [RoleId::Seer, RoleId::Robber, RoleId::Mason],
        );
        let before = room.center_pool.clone();
        let (_, result) = room
            .perform_night_action(
                &pid("a"),
                NightAction::WerewolfPeek {
                    center_index: Some(1),
                },
                2_000,
            )
            .unwrap();
        let result = result.unwrap();
        assert_eq!(result["isLoneWolf"], json!(true));
        assert_eq!(result["centerRole"], json!("robber"));
        // Reads, never writes.
        assert_eq!(room.center_pool, before);
    }

    #[test]
    fn test_center_peek_denied_to_pack_werewolf() {
        let mut room = stacked_room(
            &[
                ("a", RoleId::Werewolf),
                ("b", RoleId::Werewolf),
                ("c", RoleId::Villager),
            ],
            [RoleId::Seer, RoleId::Robber, RoleId::Mason],
        );
        let err = room
            .perform_night_action(
                &pid("a"),
                NightAction::WerewolfPeek {
                    center_index: Some(0),
                },
                2_000,
            )
            .unwrap_err();
        assert!(matches!(err, GameError::Validation(_)));
        // No side effect: the turn is still open.
        assert!(!room.players[&pid("a")].has_acted);
    }

    #[test]
    fn test_seer_peeks_player_or_two_center_slots() {
        let mut room = stacked_room(
            &[
                ("a", RoleId::Seer),
                ("b", RoleId::Werewolf),
                ("c", RoleId::Villager),
            ],
            [RoleId::Robber, RoleId::Mason, RoleId::Villager],
        );
        // Werewolf acts first.
        room.perform_night_action(&pid("b"), NightAction::WerewolfPeek { center_index: Some(2) }, 2_000)
            .unwrap();
        assert_eq!(room.meta.active_night_role, Some(RoleId::Seer));

        let err = room
            .perform_night_action(
                &pid("a"),
                NightAction::SeerPeek {
                    target: Some(pid("b")),
                    center_indices: Some(vec![0]),
                },
                2_001,
            )
            .unwrap_err();
        assert!(matches!(err, GameError::Validation(_)));

        let (_, result) = room
            .perform_night_action(
                &pid("a"),
                NightAction::SeerPeek {
                    target: None,
                    center_indices: Some(vec![0, 1]),
                },
                2_002,
            )
            .unwrap();
        let peeked = result.unwrap();
        assert_eq!(peeked["centerRoles"][0]["role"], json!("robber"));
        assert_eq!(peeked["centerRoles"][1]["role"], json!("mason"));
    }

    #[test]
    fn test_robber_steals_and_sees_new_role() {
        let mut room = stacked_room(
            &[
                ("a", RoleId::Robber),
                ("b", RoleId::Werewolf),
                ("c", RoleId::Villager),
            ],
            [RoleId::Seer, RoleId::Mason, RoleId::Villager],
        );
        room.perform_night_action(&pid("b"), NightAction::WerewolfPeek { center_index: Some(0) }, 2_000)
            .unwrap();

        let (_, result) = room
            .perform_night_action(
                &pid("a"),
                NightAction::RobberSwap { target: pid("b") },
                2_001,
            )
            .unwrap();
        assert_eq!(result.unwrap()["newRole"], json!("werewolf"));
        assert_eq!(room.roles.current[&pid("a")], RoleId::Werewolf);
        assert_eq!(room.roles.current[&pid("b")], RoleId::Robber);
        // Original assignment is immutable.
        assert_eq!(room.roles.original[&pid("a")], RoleId::Robber);
    }

    #[test]
    fn test_troublemaker_swaps_blind() {
        let mut room = stacked_room(
            &[
                ("a", RoleId::Troublemaker),
                ("b", RoleId::Werewolf),
                ("c", RoleId::Villager),
            ],
            [RoleId::Seer, RoleId::Mason, RoleId::Villager],
        );
        room.perform_night_action(&pid("b"), NightAction::WerewolfPeek { center_index: Some(0) }, 2_000)
            .unwrap();

        let (_, result) = room
            .perform_night_action(
                &pid("a"),
                NightAction::TroublemakerSwap {
                    first: pid("b"),
                    second: pid("c"),
                },
                2_001,
            )
            .unwrap();
        assert!(result.is_none());
        assert_eq!(room.roles.current[&pid("b")], RoleId::Villager);
        assert_eq!(room.roles.current[&pid("c")], RoleId::Werewolf);

        // Self-targeting is rejected.
        let mut other = stacked_room(
            &[
                ("a", RoleId::Troublemaker),
                ("b", RoleId::Werewolf),
                ("c", RoleId::Villager),
            ],
            [RoleId::Seer, RoleId::Mason, RoleId::Villager],
        );
        other
            .perform_night_action(&pid("b"), NightAction::WerewolfPeek { center_index: Some(0) }, 2_000)
            .unwrap();
        let err = other
            .perform_night_action(
                &pid("a"),
                NightAction::TroublemakerSwap {
                    first: pid("a"),
                    second: pid("b"),
                },
                2_001,
            )
            .unwrap_err();
        assert!(matches!(err, GameError::Validation(_)));
    }

    #[test]
    fn test_drunk_swaps_with_center_blind() {
        let mut room = stacked_room(
            &[
                ("a", RoleId::Drunk),
                ("b", RoleId::Werewolf),
                ("c", RoleId::Villager),
            ],
            [RoleId::Seer, RoleId::Mason, RoleId::Villager],
        );
        room.unlocks.insert("midnight".into());
        room.perform_night_action(&pid("b"), NightAction::WerewolfPeek { center_index: Some(0) }, 2_000)
            .unwrap();

        let (_, result) = room
            .perform_night_action(&pid("a"), NightAction::DrunkSwap { center_index: 1 }, 2_001)
            .unwrap();
        assert!(result.is_none());
        assert_eq!(room.roles.current[&pid("a")], RoleId::Mason);
        assert_eq!(room.center_pool[1], RoleId::Drunk);
    }

    #[test]
    fn test_insomniac_sees_post_swap_role() {
        let mut room = stacked_room(
            &[
                ("a", RoleId::Insomniac),
                ("b", RoleId::Robber),
                ("c", RoleId::Werewolf),
            ],
            [RoleId::Seer, RoleId::Mason, RoleId::Villager],
        );
        room.perform_night_action(&pid("c"), NightAction::WerewolfPeek { center_index: Some(0) }, 2_000)
            .unwrap();
        room.perform_night_action(&pid("b"), NightAction::RobberSwap { target: pid("a") }, 2_001)
            .unwrap();

        let (_, result) = room
            .perform_night_action(&pid("a"), NightAction::InsomniacCheck, 2_002)
            .unwrap();
        assert_eq!(result.unwrap()["role"], json!("robber"));
    }

    #[test]
    fn test_witch_peek_leaves_turn_open_until_commit() {
        let mut room = stacked_room(
            &[
                ("a", RoleId::Witch),
                ("b", RoleId::Werewolf),
                ("c", RoleId::Villager),
            ],
            [RoleId::Seer, RoleId::Mason, RoleId::Villager],
        );
        room.perform_night_action(&pid("b"), NightAction::WerewolfPeek { center_index: Some(0) }, 2_000)
            .unwrap();

        // A swap without a peek is refused.
        let err = room
            .perform_night_action(&pid("a"), NightAction::WitchSwap { target: pid("c") }, 2_001)
            .unwrap_err();
        assert!(matches!(err, GameError::StateConflict(_)));

        let (_, result) = room
            .perform_night_action(&pid("a"), NightAction::WitchPeek { center_index: 1 }, 2_002)
            .unwrap();
        assert_eq!(result.unwrap()["centerRole"], json!("mason"));
        assert!(!room.players[&pid("a")].has_acted);
        assert_eq!(room.meta.active_night_role, Some(RoleId::Witch));

        // Swap commits the turn and mutates both sides of the exchange.
        room.perform_night_action(&pid("a"), NightAction::WitchSwap { target: pid("c") }, 2_003)
            .unwrap();
        assert!(room.players[&pid("a")].has_acted);
        assert!(room.players[&pid("a")].pending_action.is_none());
        assert_eq!(room.roles.current[&pid("c")], RoleId::Mason);
        assert_eq!(room.center_pool[1], RoleId::Villager);
    }

    #[test]
    fn test_witch_may_target_herself_and_may_skip() {
        let mut room = stacked_room(
            &[
                ("a", RoleId::Witch),
                ("b", RoleId::Werewolf),
                ("c", RoleId::Villager),
            ],
            [RoleId::Seer, RoleId::Mason, RoleId::Villager],
        );
        room.perform_night_action(&pid("b"), NightAction::WerewolfPeek { center_index: Some(0) }, 2_000)
            .unwrap();
        room.perform_night_action(&pid("a"), NightAction::WitchPeek { center_index: 0 }, 2_001)
            .unwrap();
        room.perform_night_action(&pid("a"), NightAction::WitchSwap { target: pid("a") }, 2_002)
            .unwrap();
        assert_eq!(room.roles.current[&pid("a")], RoleId::Seer);
        assert_eq!(room.center_pool[0], RoleId::Witch);

        // Skip path on a fresh room.
        let mut other = stacked_room(
            &[
                ("a", RoleId::Witch),
                ("b", RoleId::Werewolf),
                ("c", RoleId::Villager),
            ],
            [RoleId::Seer, RoleId::Mason, RoleId::Villager],
        );
        other
            .perform_night_action(&pid("b"), NightAction::WerewolfPeek { center_index: Some(0) }, 2_000)
            .unwrap();
        other
            .perform_night_action(&pid("a"), NightAction::WitchPeek { center_index: 2 }, 2_001)
            .unwrap();
        let before = other.roles.current.clone();
        other
            .perform_night_action(&pid("a"), NightAction::WitchSkip, 2_002)
            .unwrap();
        assert!(other.players[&pid("a")].has_acted);
        assert_eq!(other.roles.current, before);
    }

    #[test]
    fn test_night_ends_after_last_waking_role() {
        let mut room = stacked_room(
            &[
                ("a", RoleId::Werewolf),
                ("b", RoleId::Seer),
                ("c", RoleId::Villager),
            ],
            [RoleId::Robber, RoleId::Mason, RoleId::Villager],
        );
        room.perform_night_action(&pid("a"), NightAction::WerewolfPeek { center_index: Some(0) }, 2_000)
            .unwrap();
        // The robber is in the center, so the seer is the last waker.
        room.perform_night_action(
            &pid("b"),
            NightAction::SeerPeek {
                target: Some(pid("a")),
                center_indices: None,
            },
            10_000,
        )
        .unwrap();

        assert_eq!(room.status(), RoomStatus::Day);
        assert_eq!(room.meta.active_night_role, None);
        assert_eq!(
            room.state.day_ends_at,
            Some(10_000 + RoomSettings::default().discussion_secs * 1000)
        );
    }

    #[test]
    fn test_skip_counts_as_acting() {
        let mut room = stacked_room(
            &[
                ("a", RoleId::Werewolf),
                ("b", RoleId::Seer),
                ("c", RoleId::Villager),
            ],
            [RoleId::Robber, RoleId::Mason, RoleId::Villager],
        );
        room.skip_night_action(&pid("a"), 2_000).unwrap();
        assert_eq!(room.meta.active_night_role, Some(RoleId::Seer));
        assert_eq!(
            room.night_actions[&pid("a")].action.as_deref(),
            Some("skip")
        );
        room.skip_night_action(&pid("b"), 2_001).unwrap();
        assert_eq!(room.status(), RoomStatus::Day);
    }

    #[test]
    fn test_force_advance_is_host_only_and_clears_pending() {
        let mut room = stacked_room(
            &[
                ("a", RoleId::Witch),
                ("b", RoleId::Werewolf),
                ("c", RoleId::Villager),
            ],
            [RoleId::Seer, RoleId::Mason, RoleId::Villager],
        );
        room.perform_night_action(&pid("b"), NightAction::WerewolfPeek { center_index: Some(0) }, 2_000)
            .unwrap();
        room.perform_night_action(&pid("a"), NightAction::WitchPeek { center_index: 0 }, 2_001)
            .unwrap();

        let err = room.force_advance_to_day(&pid("b"), 3_000).unwrap_err();
        assert!(matches!(err, GameError::Authorization(_)));

        room.force_advance_to_day(&pid("a"), 3_000).unwrap();
        assert_eq!(room.status(), RoomStatus::Day);
        assert!(room.players[&pid("a")].pending_action.is_none());
    }

    #[test]
    fn test_night_record_written_per_action() {
        let mut room = stacked_room(
            &[
                ("a", RoleId::Werewolf),
                ("b", RoleId::Seer),
                ("c", RoleId::Villager),
            ],
            [RoleId::Robber, RoleId::Mason, RoleId::Villager],
        );
        room.perform_night_action(
            &pid("a"),
            NightAction::WerewolfPeek {
                center_index: Some(2),
            },
            2_000,
        )
        .unwrap();
        let record = &room.night_actions[&pid("a")];
        assert_eq!(record.action.as_deref(), Some("werewolf_peek"));
        assert_eq!(record.targets, vec!["center:2"]);
        assert!(record.result.is_some());
    }

    #[test]
    fn test_action_json_shape() {
        let action = NightAction::SeerPeek {
            target: None,
            center_indices: Some(vec![0, 2]),
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["action"], "seer_peek");
        assert_eq!(json["centerIndices"], json!([0, 2]));

        let parsed: NightAction =
            serde_json::from_value(json!({ "action": "robber_swap", "target": "p2" })).unwrap();
        assert_eq!(parsed, NightAction::RobberSwap { target: pid("p2") });
    }
}
