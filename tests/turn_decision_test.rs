// Integration tests for whole-turn decisions
//
// Snapshots are decoded from the token protocol or JSON and decided both
// through the synchronous entry point used by the CLI tools and through the
// async bot used by the HTTP server.

use arena_snake::bot::Bot;
use arena_snake::config::Config;
use arena_snake::search::Deadline;
use arena_snake::types::{Coord, Move, Snapshot};
use std::time::{Duration, Instant};

/// Our head is at (0, 1) facing left; stepping left walks into a dead-end
/// corner sealed by a wall at (1, 0), so the only sane move is down.
fn dead_end_tokens(self_id: i64) -> String {
    format!(
        "150\n\
         1\n\
         1 0 -4\n\
         2\n\
         {} 2 0 0 0 0\n\
         0 1\n\
         0 2\n\
         7 3 10 2 0 0\n\
         20 30\n\
         20 29\n\
         20 28\n",
        self_id
    )
}

/// Four agents packed around the centre so every rival contests every move
fn crowded_snapshot(self_id: i64) -> Snapshot {
    let json = format!(
        r#"{{
            "ticks_remaining": 200,
            "you": {},
            "objects": [
                {{"row": 14, "col": 20, "kind": 5}},
                {{"row": 16, "col": 21, "kind": -1}},
                {{"row": 13, "col": 18, "kind": -2}}
            ],
            "agents": [
                {{"id": {}, "score": 45, "last_move": 2, "shield_cooldown": 0, "shield_remaining": 0,
                  "body": [{{"row": 15, "col": 18}}, {{"row": 15, "col": 17}}, {{"row": 15, "col": 16}}]}},
                {{"id": 2, "score": 30, "last_move": 0, "shield_cooldown": 0, "shield_remaining": 0,
                  "body": [{{"row": 15, "col": 22}}, {{"row": 15, "col": 23}}, {{"row": 15, "col": 24}}]}},
                {{"id": 3, "score": 30, "last_move": 3, "shield_cooldown": 0, "shield_remaining": 0,
                  "body": [{{"row": 12, "col": 20}}, {{"row": 11, "col": 20}}, {{"row": 10, "col": 20}}]}},
                {{"id": 4, "score": 30, "last_move": 1, "shield_cooldown": 0, "shield_remaining": 0,
                  "body": [{{"row": 18, "col": 20}}, {{"row": 19, "col": 20}}, {{"row": 20, "col": 20}}]}}
            ]
        }}"#,
        self_id, self_id
    );
    serde_json::from_str(&json).expect("crowded snapshot should decode")
}

#[test]
fn test_token_snapshot_avoids_dead_end() {
    let config = Config::default_hardcoded();
    let snapshot = Snapshot::from_tokens(&dead_end_tokens(config.identity.self_id), config.identity.self_id).unwrap();

    let outcome = Bot::decide(&snapshot, &config, Deadline::after(Duration::from_millis(500))).unwrap();
    assert_eq!(outcome.chosen, Move::Down);
    assert!(outcome.depth_reached.is_some());
}

#[test]
fn test_json_and_tokens_decode_alike() {
    let config = Config::default_hardcoded();
    let from_tokens = Snapshot::from_tokens(&dead_end_tokens(42), 42).unwrap();

    let json = r#"{
        "ticks_remaining": 150,
        "you": 42,
        "objects": [{"row": 1, "col": 0, "kind": -4}],
        "agents": [
            {"id": 42, "score": 0, "last_move": 0, "shield_cooldown": 0, "shield_remaining": 0,
             "body": [{"row": 0, "col": 1}, {"row": 0, "col": 2}]},
            {"id": 7, "score": 10, "last_move": 2, "shield_cooldown": 0, "shield_remaining": 0,
             "body": [{"row": 20, "col": 30}, {"row": 20, "col": 29}, {"row": 20, "col": 28}]}
        ]
    }"#;
    let from_json: Snapshot = serde_json::from_str(json).unwrap();

    assert_eq!(from_tokens, from_json);
    assert_eq!(from_json.agents[1].body[2], Coord::new(20, 28));
    assert!(Bot::decide(&from_json, &config, Deadline::after(Duration::from_millis(200))).is_ok());
}

#[test]
fn test_decision_respects_deadline() {
    let config = Config::default_hardcoded();
    let snapshot = crowded_snapshot(config.identity.self_id);

    let budget = Duration::from_millis(40);
    let start = Instant::now();
    let outcome = Bot::decide(&snapshot, &config, Deadline::after(budget)).unwrap();
    let elapsed = start.elapsed();

    assert!(
        elapsed < budget + Duration::from_millis(300),
        "search overran its deadline: {:?}",
        elapsed
    );
    assert!(outcome.depth_reached.map_or(true, |d| d <= config.timing.max_search_depth));
}

#[test]
fn test_missing_controlled_agent_is_error() {
    let config = Config::default_hardcoded();
    let snapshot = Snapshot::from_tokens(&dead_end_tokens(5), 6).unwrap();
    assert!(Bot::decide(&snapshot, &config, Deadline::after(Duration::from_millis(50))).is_err());
}

#[tokio::test]
async fn test_bot_answers_with_move_code_and_name() {
    let config = Config::default_hardcoded();
    let snapshot = Snapshot::from_tokens(&dead_end_tokens(config.identity.self_id), config.identity.self_id).unwrap();
    let bot = Bot::new(config);

    let response = bot.get_move(&snapshot).await;
    assert_eq!(response["move"].as_i64(), Some(Move::Down.code() as i64));
    assert_eq!(response["action"].as_str(), Some("down"));

    let report = bot.last_turn().expect("turn should be recorded");
    assert_eq!(report.chosen_move, Move::Down.code());
    assert_eq!(report.ticks_remaining, 150);
    assert!(report.depth_reached.is_some());
}

#[tokio::test]
async fn test_bot_answers_shield_for_unknown_agent() {
    let config = Config::default_hardcoded();
    let snapshot = Snapshot::from_tokens(&dead_end_tokens(5), 6).unwrap();
    let bot = Bot::new(config);

    let response = bot.get_move(&snapshot).await;
    assert_eq!(response["move"].as_i64(), Some(Move::Shield.code() as i64));
    assert_eq!(bot.last_turn().map(|r| r.depth_reached), Some(None));
}
