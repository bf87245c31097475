//! Room actor: an isolated Tokio task that owns one room's state.
//!
//! Each room runs in its own task, communicating with the outside world
//! through an mpsc channel. This is the "actor model" — all mutations are
//! serialized through the single owner, so the turn guard and role
//! bookkeeping never race. After each successful operation the actor
//! persists exactly the dirtied store paths.

use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use nocturne_protocol::{GameError, PlayerId, RoomId};
use nocturne_roles::RoleId;
use nocturne_store::Store;

use crate::night::NightAction;
use crate::state::{paths, Dirty, RoomRecord, RoomStatus};
use crate::timer::Clock;

/// Command channel size for room actors.
pub(crate) const CHANNEL_SIZE: usize = 64;

type Reply = oneshot::Sender<Result<Option<Value>, GameError>>;

/// Commands sent to a room actor through its channel.
///
/// Each variant carries a `oneshot::Sender` reply channel; the caller
/// sends a command and waits for the response on that channel.
pub(crate) enum RoomCommand {
    Join {
        player_id: PlayerId,
        display_name: String,
        reply: Reply,
    },
    Leave {
        player_id: PlayerId,
        reply: Reply,
    },
    SetReady {
        player_id: PlayerId,
        ready: bool,
        reply: Reply,
    },
    UpdateDisplayName {
        player_id: PlayerId,
        display_name: String,
        reply: Reply,
    },
    SelectRoles {
        player_id: PlayerId,
        roles: Vec<RoleId>,
        reply: Reply,
    },
    StartGame {
        player_id: PlayerId,
        reply: Reply,
    },
    NightAction {
        player_id: PlayerId,
        action: NightAction,
        reply: Reply,
    },
    SkipNightAction {
        player_id: PlayerId,
        reply: Reply,
    },
    ForceAdvanceToDay {
        player_id: PlayerId,
        reply: Reply,
    },
    AdvanceToVoting {
        player_id: PlayerId,
        reply: Reply,
    },
    CastVote {
        player_id: PlayerId,
        target: PlayerId,
        reply: Reply,
    },
    ResolveVotes {
        player_id: PlayerId,
        reply: Reply,
    },
    GrantUnlock {
        key: String,
        reply: Reply,
    },
    ResetGame {
        player_id: PlayerId,
        reply: Reply,
    },
    GetInfo {
        reply: oneshot::Sender<RoomInfo>,
    },
    Shutdown,
}

/// A snapshot of room metadata (not the full room state).
#[derive(Debug, Clone)]
pub struct RoomInfo {
    pub room_id: RoomId,
    pub status: RoomStatus,
    pub player_count: usize,
    pub active_night_role: Option<RoleId>,
}

/// Handle to a running room actor. Cheap to clone — just an
/// `mpsc::Sender` wrapper. The `RoomManager` holds one per room.
#[derive(Clone, Debug)]
pub struct RoomHandle {
    room_id: RoomId,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Whether the actor has stopped (room deleted or shut down).
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    async fn request(
        &self,
        make: impl FnOnce(Reply) -> RoomCommand,
    ) -> Result<Option<Value>, GameError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(make(reply_tx))
            .await
            .map_err(|_| GameError::room_not_found())?;
        reply_rx.await.map_err(|_| GameError::room_not_found())?
    }

    pub async fn join(
        &self,
        player_id: PlayerId,
        display_name: String,
    ) -> Result<Option<Value>, GameError> {
        self.request(|reply| RoomCommand::Join {
            player_id,
            display_name,
            reply,
        })
        .await
    }

    pub async fn leave(&self, player_id: PlayerId) -> Result<Option<Value>, GameError> {
        self.request(|reply| RoomCommand::Leave { player_id, reply })
            .await
    }

    pub async fn set_ready(
        &self,
        player_id: PlayerId,
        ready: bool,
    ) -> Result<Option<Value>, GameError> {
        self.request(|reply| RoomCommand::SetReady {
            player_id,
            ready,
            reply,
        })
        .await
    }

    pub async fn update_display_name(
        &self,
        player_id: PlayerId,
        display_name: String,
    ) -> Result<Option<Value>, GameError> {
        self.request(|reply| RoomCommand::UpdateDisplayName {
            player_id,
            display_name,
            reply,
        })
        .await
    }

    pub async fn select_roles(
        &self,
        player_id: PlayerId,
        roles: Vec<RoleId>,
    ) -> Result<Option<Value>, GameError> {
        self.request(|reply| RoomCommand::SelectRoles {
            player_id,
            roles,
            reply,
        })
        .await
    }

    pub async fn start_game(&self, player_id: PlayerId) -> Result<Option<Value>, GameError> {
        self.request(|reply| RoomCommand::StartGame { player_id, reply })
            .await
    }

    pub async fn night_action(
        &self,
        player_id: PlayerId,
        action: NightAction,
    ) -> Result<Option<Value>, GameError> {
        self.request(|reply| RoomCommand::NightAction {
            player_id,
            action,
            reply,
        })
        .await
    }

    pub async fn skip_night_action(
        &self,
        player_id: PlayerId,
    ) -> Result<Option<Value>, GameError> {
        self.request(|reply| RoomCommand::SkipNightAction { player_id, reply })
            .await
    }

    pub async fn force_advance_to_day(
        &self,
        player_id: PlayerId,
    ) -> Result<Option<Value>, GameError> {
        self.request(|reply| RoomCommand::ForceAdvanceToDay { player_id, reply })
            .await
    }

    pub async fn advance_to_voting(
        &self,
        player_id: PlayerId,
    ) -> Result<Option<Value>, GameError> {
        self.request(|reply| RoomCommand::AdvanceToVoting { player_id, reply })
            .await
    }

    pub async fn cast_vote(
        &self,
        player_id: PlayerId,
        target: PlayerId,
    ) -> Result<Option<Value>, GameError> {
        self.request(|reply| RoomCommand::CastVote {
            player_id,
            target,
            reply,
        })
        .await
    }

    pub async fn resolve_votes(&self, player_id: PlayerId) -> Result<Option<Value>, GameError> {
        self.request(|reply| RoomCommand::ResolveVotes { player_id, reply })
            .await
    }

    pub async fn grant_unlock(&self, key: String) -> Result<Option<Value>, GameError> {
        self.request(|reply| RoomCommand::GrantUnlock { key, reply })
            .await
    }

    pub async fn reset_game(&self, player_id: PlayerId) -> Result<Option<Value>, GameError> {
        self.request(|reply| RoomCommand::ResetGame { player_id, reply })
            .await
    }

    pub async fn get_info(&self) -> Result<RoomInfo, GameError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::GetInfo { reply: reply_tx })
            .await
            .map_err(|_| GameError::room_not_found())?;
        reply_rx.await.map_err(|_| GameError::room_not_found())
    }

    pub async fn shutdown(&self) -> Result<(), GameError> {
        self.sender
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| GameError::room_not_found())
    }
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor<S: Store, C: Clock> {
    room: RoomRecord,
    store: S,
    clock: C,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl<S: Store, C: Clock> RoomActor<S, C> {
    /// Runs the actor loop, processing commands until the room empties
    /// or is shut down.
    async fn run(mut self) {
        info!(room_id = %self.room.id, "room actor started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                RoomCommand::Join {
                    player_id,
                    display_name,
                    reply,
                } => {
                    let now = self.clock.now_ms();
                    let result = self.room.join(player_id, display_name, now);
                    self.finish(result.map(|d| (d, None)), reply).await;
                }
                RoomCommand::Leave { player_id, reply } => {
                    match self.room.leave(&player_id) {
                        Ok((dirty, empty)) => {
                            if empty {
                                // Last player out deletes the room. Close
                                // the channel first so handles observe the
                                // shutdown as soon as the reply arrives.
                                self.receiver.close();
                                self.remove_room().await;
                                let _ = reply.send(Ok(None));
                                break;
                            }
                            self.persist(&dirty).await;
                            let _ = reply.send(Ok(None));
                        }
                        Err(err) => {
                            let _ = reply.send(Err(err));
                        }
                    }
                }
                RoomCommand::SetReady {
                    player_id,
                    ready,
                    reply,
                } => {
                    let result = self.room.set_ready(&player_id, ready);
                    self.finish(result.map(|d| (d, None)), reply).await;
                }
                RoomCommand::UpdateDisplayName {
                    player_id,
                    display_name,
                    reply,
                } => {
                    let result = self.room.update_display_name(&player_id, display_name);
                    self.finish(result.map(|d| (d, None)), reply).await;
                }
                RoomCommand::SelectRoles {
                    player_id,
                    roles,
                    reply,
                } => {
                    let result = self.room.select_roles(&player_id, roles);
                    self.finish(result.map(|d| (d, None)), reply).await;
                }
                RoomCommand::StartGame { player_id, reply } => {
                    let now = self.clock.now_ms();
                    let result = match self.room.start_game(&player_id, now) {
                        Ok(dirty) => Ok((dirty, self.room.dealt_role(&player_id))),
                        Err(err) => Err(err),
                    };
                    self.finish(result, reply).await;
                }
                RoomCommand::NightAction {
                    player_id,
                    action,
                    reply,
                } => {
                    let now = self.clock.now_ms();
                    let result = self.room.perform_night_action(&player_id, action, now);
                    self.finish(result, reply).await;
                }
                RoomCommand::SkipNightAction { player_id, reply } => {
                    let now = self.clock.now_ms();
                    let result = self.room.skip_night_action(&player_id, now);
                    self.finish(result.map(|d| (d, None)), reply).await;
                }
                RoomCommand::ForceAdvanceToDay { player_id, reply } => {
                    let now = self.clock.now_ms();
                    let result = self.room.force_advance_to_day(&player_id, now);
                    self.finish(result.map(|d| (d, None)), reply).await;
                }
                RoomCommand::AdvanceToVoting { player_id, reply } => {
                    let now = self.clock.now_ms();
                    let result = self.room.advance_to_voting(&player_id, now);
                    self.finish(result.map(|d| (d, None)), reply).await;
                }
                RoomCommand::CastVote {
                    player_id,
                    target,
                    reply,
                } => {
                    let result = self.room.cast_vote(&player_id, target);
                    self.finish(result.map(|d| (d, None)), reply).await;
                }
                RoomCommand::ResolveVotes { player_id, reply } => {
                    let now = self.clock.now_ms();
                    let result = self.room.resolve_votes(&player_id, now);
                    self.finish(result.map(|d| (d, None)), reply).await;
                }
                RoomCommand::GrantUnlock { key, reply } => {
                    let dirty = self.room.grant_unlock(key);
                    self.persist(&dirty).await;
                    let _ = reply.send(Ok(None));
                }
                RoomCommand::ResetGame { player_id, reply } => {
                    let result = self.room.reset_game(&player_id);
                    self.finish(result.map(|d| (d, None)), reply).await;
                }
                RoomCommand::GetInfo { reply } => {
                    let _ = reply.send(self.info());
                }
                RoomCommand::Shutdown => {
                    info!(room_id = %self.room.id, "room shutting down");
                    break;
                }
            }
        }

        info!(room_id = %self.room.id, "room actor stopped");
    }

    /// Persists a successful mutation's dirty paths and sends the reply.
    async fn finish(
        &mut self,
        result: Result<(Vec<Dirty>, Option<Value>), GameError>,
        reply: Reply,
    ) {
        match result {
            Ok((dirty, data)) => {
                self.persist(&dirty).await;
                let _ = reply.send(Ok(data));
            }
            Err(err) => {
                let _ = reply.send(Err(err));
            }
        }
    }

    /// Writes exactly the dirtied paths, never the whole room. The actor's
    /// in-memory state is authoritative; a store failure here is logged
    /// and the operation still succeeds.
    async fn persist(&self, dirty: &[Dirty]) {
        let id = &self.room.id;
        for entry in dirty {
            let outcome = match entry {
                Dirty::Meta => {
                    self.write(paths::meta(id), json!(&self.room.meta)).await
                }
                Dirty::Settings => {
                    self.write(paths::settings(id), json!(&self.room.settings))
                        .await
                }
                Dirty::Player(pid) => match self.room.players.get(pid) {
                    Some(player) => self.write(paths::player(id, pid), json!(player)).await,
                    None => Ok(()),
                },
                Dirty::RemovePlayer(pid) => {
                    self.store.remove(&paths::player(id, pid)).await
                }
                Dirty::Roles => {
                    self.write(paths::roles(id), json!(&self.room.roles)).await
                }
                Dirty::Center => {
                    self.write(paths::center_pool(id), json!(&self.room.center_pool))
                        .await
                }
                Dirty::NightAction(pid) => match self.room.night_actions.get(pid) {
                    Some(record) => {
                        self.write(paths::night_action(id, pid), json!(record)).await
                    }
                    None => Ok(()),
                },
                Dirty::ClearNightActions => {
                    self.store
                        .remove(&format!("{}/nightActions", paths::room(id)))
                        .await
                }
                Dirty::State => {
                    self.write(paths::state(id), json!(&self.room.state)).await
                }
                Dirty::Result => match &self.room.result {
                    Some(outcome) => self.write(paths::result(id), json!(outcome)).await,
                    None => self.store.remove(&paths::result(id)).await,
                },
                Dirty::Unlocks => {
                    self.write(paths::unlocks(id), json!(&self.room.unlocks))
                        .await
                }
            };
            if let Err(err) = outcome {
                warn!(room_id = %id, %err, ?entry, "store write failed");
            }
        }
    }

    async fn write(
        &self,
        path: String,
        value: Value,
    ) -> Result<(), nocturne_store::StoreError> {
        self.store.write(&path, value).await
    }

    async fn remove_room(&self) {
        if let Err(err) = self.store.remove(&paths::room(&self.room.id)).await {
            warn!(room_id = %self.room.id, %err, "room removal write failed");
        }
        info!(room_id = %self.room.id, "room deleted (last player left)");
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            room_id: self.room.id.clone(),
            status: self.room.status(),
            player_count: self.room.player_count(),
            active_night_role: self.room.meta.active_night_role,
        }
    }
}

/// Spawns a room actor task for an already-constructed room record and
/// returns a handle to communicate with it.
pub fn spawn_room<S: Store, C: Clock>(room: RoomRecord, store: S, clock: C) -> RoomHandle {
    let room_id = room.id.clone();
    let (tx, rx) = mpsc::channel(CHANNEL_SIZE);

    let actor = RoomActor {
        room,
        store,
        clock,
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHandle {
        room_id,
        sender: tx,
    }
}
