//! End-to-end flows through the public service surface, with the room
//! state observed the way real clients observe it: through the store.

use serde_json::Value;

use nocturne::prelude::*;
use nocturne_engine::{Clock, ManualClock};

fn pid(s: &str) -> PlayerId {
    PlayerId::from(s)
}

fn rid() -> RoomId {
    RoomId::from("moon-7")
}

struct Fixture {
    service: GameService<MemoryStore, ManualClock>,
    store: MemoryStore,
    clock: ManualClock,
}

/// A waiting room with `count` players, p0 hosting.
async fn room_with_players(count: usize) -> Fixture {
    let store = MemoryStore::new();
    let clock = ManualClock::at(1_000_000);
    let service = GameService::new(store.clone(), clock.clone());

    let reply = service
        .create_room(rid(), pid("p0"), "Player 0".into())
        .await;
    assert!(reply.success);
    for i in 1..count {
        clock.advance_secs(1);
        let reply = service
            .join_room(&rid(), pid(&format!("p{i}")), format!("Player {i}"))
            .await;
        assert!(reply.success, "join p{i} failed: {:?}", reply.error);
    }
    Fixture {
        service,
        store,
        clock,
    }
}

/// The original-role map as clients see it on the store.
async fn original_roles(store: &MemoryStore) -> Vec<(String, String)> {
    let roles = store
        .read("rooms/moon-7/roles")
        .await
        .unwrap()
        .expect("roles dealt");
    roles["original"]
        .as_object()
        .unwrap()
        .iter()
        .map(|(k, v)| (k.clone(), v.as_str().unwrap().to_string()))
        .collect()
}

/// Drives the whole night by having each waking player skip its turn.
async fn skip_through_night(fx: &Fixture) {
    let originals = original_roles(&fx.store).await;
    for _ in 0..20 {
        let info = fx.service.room_info(&rid()).await.unwrap();
        if info.status != RoomStatus::Night {
            return;
        }
        let active = info.active_night_role.expect("night has an active role");
        for (player, role) in &originals {
            if role.as_str() == active.as_str() {
                let reply = fx
                    .service
                    .skip_night_action(&rid(), pid(player))
                    .await;
                assert!(reply.success, "skip for {player} failed: {:?}", reply.error);
            }
        }
    }
    panic!("night did not resolve");
}

#[tokio::test]
async fn test_created_room_is_visible_on_the_store() {
    let fx = room_with_players(3).await;
    let meta = fx
        .store
        .read("rooms/moon-7/meta")
        .await
        .unwrap()
        .expect("meta written");
    assert_eq!(meta["status"], "waiting");
    assert_eq!(meta["createdBy"], "p0");

    let host = fx
        .store
        .read("rooms/moon-7/players/p0")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(host["isHost"], true);
}

#[tokio::test]
async fn test_start_deals_roles_and_night_resolves_to_day() {
    let fx = room_with_players(5).await;
    let reply = fx.service.start_game(&rid(), pid("p0")).await;
    assert!(reply.success);
    // The starter's private deal comes back in the reply payload.
    let dealt = reply.data.unwrap();
    assert!(dealt["role"].is_string());

    // 5 players + 3 center slots.
    let originals = original_roles(&fx.store).await;
    assert_eq!(originals.len(), 5);
    let center = fx
        .store
        .read("rooms/moon-7/centerPool")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(center.as_array().unwrap().len(), 3);

    skip_through_night(&fx).await;

    let meta = fx.store.read("rooms/moon-7/meta").await.unwrap().unwrap();
    assert_eq!(meta["status"], "day");
    assert_eq!(meta["activeNightRole"], Value::Null);
    let state = fx.store.read("rooms/moon-7/state").await.unwrap().unwrap();
    assert!(state["dayEndsAt"].as_u64().unwrap() > fx.clock.now_ms());
}

#[tokio::test]
async fn test_full_game_outcome_matches_final_roles() {
    let fx = room_with_players(5).await;
    fx.service.start_game(&rid(), pid("p0")).await;
    skip_through_night(&fx).await;

    // Host closes discussion; everyone votes for p1.
    assert!(fx.service.advance_to_voting(&rid(), pid("p0")).await.success);
    for i in 0..5 {
        let reply = fx
            .service
            .cast_vote(&rid(), pid(&format!("p{i}")), pid("p1"))
            .await;
        assert!(reply.success);
    }

    // All votes in: the game resolved without any explicit resolve call.
    let meta = fx.store.read("rooms/moon-7/meta").await.unwrap().unwrap();
    assert_eq!(meta["status"], "ended");

    let result = fx
        .store
        .read("rooms/moon-7/result")
        .await
        .unwrap()
        .expect("outcome written");
    assert_eq!(result["eliminated"], "p1");
    assert_eq!(result["votes"].as_object().unwrap().len(), 5);

    // The side rule applied to the final assignment as published.
    let finals = result["finalRoles"].as_object().unwrap();
    let is_wolf = |v: &Value| matches!(v.as_str().unwrap(), "werewolf" | "minion");
    let expected = if is_wolf(&finals["p1"]) {
        "village"
    } else if finals.values().any(is_wolf) {
        "werewolf"
    } else {
        "nobody"
    };
    assert_eq!(result["winningSide"], expected);
}

#[tokio::test]
async fn test_tie_vote_eliminates_nobody() {
    let fx = room_with_players(4).await;
    fx.service.start_game(&rid(), pid("p0")).await;
    skip_through_night(&fx).await;
    fx.service.advance_to_voting(&rid(), pid("p0")).await;

    fx.service.cast_vote(&rid(), pid("p0"), pid("p1")).await;
    fx.service.cast_vote(&rid(), pid("p1"), pid("p0")).await;
    fx.service.cast_vote(&rid(), pid("p2"), pid("p1")).await;
    fx.service.cast_vote(&rid(), pid("p3"), pid("p0")).await;

    let result = fx.store.read("rooms/moon-7/result").await.unwrap().unwrap();
    assert_eq!(result["eliminated"], Value::Null);
}

#[tokio::test]
async fn test_deadline_expiry_lets_anyone_advance() {
    let fx = room_with_players(4).await;
    fx.service.start_game(&rid(), pid("p0")).await;
    skip_through_night(&fx).await;

    // A non-host may not cut the discussion short...
    let early = fx.service.advance_to_voting(&rid(), pid("p2")).await;
    assert!(!early.success);

    // ...but may advance once the stored deadline passes.
    fx.clock.advance_secs(301);
    assert!(fx.service.advance_to_voting(&rid(), pid("p2")).await.success);

    // Same shape for vote resolution: one vote, then the window expires.
    fx.service.cast_vote(&rid(), pid("p1"), pid("p3")).await;
    let early = fx.service.resolve_votes(&rid(), pid("p2")).await;
    assert!(!early.success);
    fx.clock.advance_secs(61);
    assert!(fx.service.resolve_votes(&rid(), pid("p2")).await.success);

    let result = fx.store.read("rooms/moon-7/result").await.unwrap().unwrap();
    assert_eq!(result["eliminated"], "p3");
}

#[tokio::test]
async fn test_join_refusals_and_reconnect_asymmetry() {
    let fx = room_with_players(4).await;

    let reply = fx
        .service
        .join_room(&RoomId::from("nope"), pid("x"), "X".into())
        .await;
    assert_eq!(reply.error.as_deref(), Some("room_not_found"));

    fx.service.start_game(&rid(), pid("p0")).await;

    // New player bounced mid-game with the stable refusal code.
    let reply = fx.service.join_room(&rid(), pid("late"), "Late".into()).await;
    assert_eq!(reply.error.as_deref(), Some("in_progress"));

    // An established player rejoins at any phase; only the name changes.
    let reply = fx
        .service
        .join_room(&rid(), pid("p2"), "Back Again".into())
        .await;
    assert!(reply.success);
    let player = fx
        .store
        .read("rooms/moon-7/players/p2")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(player["displayName"], "Back Again");
    assert_eq!(player["isHost"], false);
}

#[tokio::test]
async fn test_host_leaving_promotes_next_senior_player() {
    let fx = room_with_players(4).await;
    assert!(fx.service.leave_room(&rid(), pid("p0")).await.success);

    let successor = fx
        .store
        .read("rooms/moon-7/players/p1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(successor["isHost"], true);
    assert!(fx
        .store
        .read("rooms/moon-7/players/p0")
        .await
        .unwrap()
        .is_none());

    // Promoted host can run the room.
    assert!(fx.service.start_game(&rid(), pid("p1")).await.success);
}

#[tokio::test]
async fn test_last_player_leaving_deletes_the_room() {
    let fx = room_with_players(1).await;
    assert!(fx.service.leave_room(&rid(), pid("p0")).await.success);

    assert!(!fx.store.exists("rooms/moon-7").await.unwrap());
    let reply = fx.service.start_game(&rid(), pid("p0")).await;
    assert_eq!(reply.error.as_deref(), Some("room_not_found"));
}

#[tokio::test]
async fn test_unlock_gates_premium_roles() {
    let fx = room_with_players(3).await;
    let witch_set = vec![
        RoleId::Werewolf,
        RoleId::Witch,
        RoleId::Villager,
        RoleId::Villager,
        RoleId::Villager,
        RoleId::Seer,
    ];

    let reply = fx
        .service
        .select_roles(&rid(), pid("p0"), witch_set.clone())
        .await;
    assert!(!reply.success);
    assert!(reply.error.unwrap().contains("role_locked"));

    // The payment webhook flips the unlock; selection now goes through.
    assert!(fx.service.grant_unlock(&rid(), "witch".into()).await.success);
    assert!(fx
        .service
        .select_roles(&rid(), pid("p0"), witch_set)
        .await
        .success);

    let unlocks = fx.store.read("rooms/moon-7/unlocks").await.unwrap().unwrap();
    assert_eq!(unlocks, serde_json::json!(["witch"]));
}

#[tokio::test]
async fn test_reset_returns_ended_room_to_waiting() {
    let fx = room_with_players(4).await;
    fx.service.start_game(&rid(), pid("p0")).await;
    skip_through_night(&fx).await;
    fx.service.advance_to_voting(&rid(), pid("p0")).await;
    for i in 0..4 {
        fx.service
            .cast_vote(&rid(), pid(&format!("p{i}")), pid("p1"))
            .await;
    }
    assert!(fx.service.reset_game(&rid(), pid("p0")).await.success);

    let meta = fx.store.read("rooms/moon-7/meta").await.unwrap().unwrap();
    assert_eq!(meta["status"], "waiting");
    assert!(fx.store.read("rooms/moon-7/result").await.unwrap().is_none());
    assert!(fx
        .store
        .read("rooms/moon-7/nightActions")
        .await
        .unwrap()
        .is_none());

    // A new player may now join; with the table size changed the host
    // clears the selection so defaults apply to the new count.
    assert!(fx.service.join_room(&rid(), pid("p9"), "Nine".into()).await.success);
    assert!(fx.service.select_roles(&rid(), pid("p0"), vec![]).await.success);
    assert!(fx.service.start_game(&rid(), pid("p0")).await.success);
}

#[tokio::test]
async fn test_store_subscribers_observe_phase_changes() {
    let fx = room_with_players(3).await;
    let mut events = fx.store.subscribe("rooms/moon-7/meta");

    fx.service.start_game(&rid(), pid("p0")).await;

    // The meta write lands as a broadcast event for subscribed clients.
    let mut saw_meta = false;
    while let Ok(event) = events.try_recv() {
        if event.path == "rooms/moon-7/meta" {
            saw_meta = true;
            let value = event.value.unwrap();
            assert!(value["status"] == "night" || value["status"] == "day");
        }
    }
    assert!(saw_meta);
}

#[tokio::test]
async fn test_turn_guard_over_the_service_surface() {
    let fx = room_with_players(4).await;
    fx.service.start_game(&rid(), pid("p0")).await;

    let info = fx.service.room_info(&rid()).await.unwrap();
    let active = info.active_night_role.unwrap();
    let originals = original_roles(&fx.store).await;
    let (sleeper, _) = originals
        .iter()
        .find(|(_, role)| role.as_str() != active.as_str())
        .expect("someone is not in the active slot");

    let reply = fx.service.skip_night_action(&rid(), pid(sleeper)).await;
    assert!(!reply.success);

    // The failed request left no trace on the store.
    let record = fx
        .store
        .read(&format!("rooms/moon-7/nightActions/{sleeper}"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record["action"], Value::Null);
}
