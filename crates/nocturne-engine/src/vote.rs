//! Voting and outcome computation.
//!
//! Votes are overwritable until the window closes. Resolution runs when
//! every seated player has voted, or when the host forces it, or when any
//! participant requests it after the deadline. The elimination target is
//! the plurality winner; a tie (or no votes at all) eliminates nobody.

use std::collections::BTreeMap;

use tracing::info;

use nocturne_protocol::{GameError, PlayerId};

use crate::state::{Dirty, Outcome, RoomRecord, RoomStatus, WinningSide};
use crate::timer::{deadline_after, expired};

impl RoomRecord {
    /// Opens the voting window. The host may advance at any point during
    /// the day, or force it straight out of an unfinished night; anyone
    /// else only from the day and once the discussion deadline has passed.
    pub fn advance_to_voting(
        &mut self,
        requester: &PlayerId,
        now_ms: u64,
    ) -> Result<Vec<Dirty>, GameError> {
        if !self.players.contains_key(requester) {
            return Err(GameError::NotFound("player_not_in_room".into()));
        }
        match self.status() {
            RoomStatus::Day => {
                if !self.is_host(requester) && !expired(self.state.day_ends_at, now_ms) {
                    return Err(GameError::Authorization("discussion_still_open".into()));
                }
            }
            RoomStatus::Night if self.is_host(requester) => {
                // Host force: abandon the unfinished night outright.
                self.meta.active_night_role = None;
                for player in self.players.values_mut() {
                    player.pending_action = None;
                }
            }
            _ => return Err(GameError::StateConflict("not_day".into())),
        }

        self.meta.status = RoomStatus::Voting;
        self.state.voting_ends_at = Some(deadline_after(now_ms, self.settings.voting_secs));
        for player in self.players.values_mut() {
            player.vote = None;
        }
        info!(room_id = %self.id, "voting opened");
        let mut dirty = vec![Dirty::Meta, Dirty::State];
        dirty.extend(self.players.keys().cloned().map(Dirty::Player));
        Ok(dirty)
    }

    /// Records (or changes) a vote. When the last seated player votes, the
    /// outcome resolves immediately.
    pub fn cast_vote(
        &mut self,
        voter: &PlayerId,
        target: PlayerId,
    ) -> Result<Vec<Dirty>, GameError> {
        if self.status() != RoomStatus::Voting {
            return Err(GameError::StateConflict("not_voting".into()));
        }
        if !self.players.contains_key(&target) {
            return Err(GameError::Validation("target_not_in_room".into()));
        }
        let player = self
            .players
            .get_mut(voter)
            .ok_or_else(|| GameError::NotFound("player_not_in_room".into()))?;
        player.vote = Some(target);

        let mut dirty = vec![Dirty::Player(voter.clone())];
        if self.players.values().all(|p| p.vote.is_some()) {
            dirty.extend(self.finish_voting());
        }
        Ok(dirty)
    }

    /// Explicit resolution request: the host may close the vote early;
    /// anyone else only after the deadline.
    pub fn resolve_votes(
        &mut self,
        requester: &PlayerId,
        now_ms: u64,
    ) -> Result<Vec<Dirty>, GameError> {
        if !self.players.contains_key(requester) {
            return Err(GameError::NotFound("player_not_in_room".into()));
        }
        if self.status() != RoomStatus::Voting {
            return Err(GameError::StateConflict("not_voting".into()));
        }
        if !self.is_host(requester) && !expired(self.state.voting_ends_at, now_ms) {
            return Err(GameError::Authorization("voting_still_open".into()));
        }
        Ok(self.finish_voting())
    }

    fn finish_voting(&mut self) -> Vec<Dirty> {
        let votes: BTreeMap<PlayerId, PlayerId> = self
            .players
            .values()
            .filter_map(|p| p.vote.clone().map(|t| (p.id.clone(), t)))
            .collect();
        let eliminated = plurality(&votes);
        let winning_side = winning_side(
            eliminated.as_ref(),
            self.roles.current.iter().filter_map(|(id, role)| {
                self.players.contains_key(id).then_some((id, *role))
            }),
        );

        let outcome = Outcome {
            votes,
            eliminated: eliminated.clone(),
            winning_side,
            final_roles: self.roles.current.clone(),
            center_pool: self.center_pool.clone(),
        };
        info!(
            room_id = %self.id,
            eliminated = ?eliminated,
            side = ?winning_side,
            "game resolved"
        );
        self.result = Some(outcome);
        self.meta.status = RoomStatus::Ended;
        self.state.voting_ends_at = None;
        vec![Dirty::Result, Dirty::Meta, Dirty::State]
    }
}

/// The plurality winner, or `None` on a tie or an empty tally.
fn plurality(votes: &BTreeMap<PlayerId, PlayerId>) -> Option<PlayerId> {
    let mut counts: BTreeMap<&PlayerId, usize> = BTreeMap::new();
    for target in votes.values() {
        *counts.entry(target).or_default() += 1;
    }
    let best = counts.values().copied().max()?;
    let mut leaders = counts.iter().filter(|(_, n)| **n == best);
    let leader = leaders.next()?.0;
    if leaders.next().is_some() {
        return None;
    }
    Some((*leader).clone())
}

/// Applies the side rules to the final role assignment of seated players.
fn winning_side<'a, I>(eliminated: Option<&PlayerId>, final_roles: I) -> WinningSide
where
    I: Iterator<Item = (&'a PlayerId, nocturne_roles::RoleId)>,
{
    let mut any_werewolf = false;
    let mut eliminated_is_werewolf = false;
    for (id, role) in final_roles {
        if role.is_werewolf_team() {
            any_werewolf = true;
            if eliminated == Some(id) {
                eliminated_is_werewolf = true;
            }
        }
    }

    match (eliminated, any_werewolf) {
        (Some(_), _) if eliminated_is_werewolf => WinningSide::Village,
        (Some(_), true) => WinningSide::Werewolf,
        (Some(_), false) => WinningSide::Nobody,
        (None, true) => WinningSide::Werewolf,
        (None, false) => WinningSide::Village,
    }
}
