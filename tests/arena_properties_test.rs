// Randomized property tests for the reversible arena simulation
//
// Random games are played forward with arbitrary (often illegal) joint moves
// and then rolled back tick by tick, checking that every intermediate state is
// restored exactly. Along the way the legality and growth rules are checked.

use arena_snake::arena::{Arena, Object};
use arena_snake::config::Config;
use arena_snake::types::{AgentSnapshot, Coord, Move, ObjectPlacement, Snapshot, KIND_LENGTH_BONUS, KIND_TRAP, KIND_WALL};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Straight horizontal body of `length` cells with the head at `head`, facing right
fn body(head: (i32, i32), length: i32) -> Vec<Coord> {
    (0..length).map(|i| Coord::new(head.0, head.1 - i)).collect()
}

fn random_objects(rng: &mut StdRng, count: usize) -> Vec<ObjectPlacement> {
    (0..count)
        .map(|_| {
            let kind = match rng.random_range(0..10) {
                0 => KIND_WALL,
                1 => KIND_TRAP,
                2 => KIND_LENGTH_BONUS,
                _ => rng.random_range(1..=20),
            };
            ObjectPlacement {
                row: rng.random_range(0..30),
                col: rng.random_range(0..40),
                kind,
            }
        })
        .collect()
}

fn random_arena(rng: &mut StdRng, config: &Config) -> Arena {
    let agents = (0..4)
        .map(|i| AgentSnapshot {
            id: 100 + i as i64,
            score: rng.random_range(0..60),
            last_move: Move::Right.code(),
            shield_cooldown: rng.random_range(0..3),
            shield_remaining: rng.random_range(0..2),
            body: body((3 + 7 * i, 10 + 5 * i), 3 + i),
        })
        .collect();
    let snapshot = Snapshot {
        ticks_remaining: 200,
        you: 100,
        objects: random_objects(rng, 80),
        agents,
    };
    Arena::from_snapshot(&snapshot, config).unwrap()
}

fn random_moves(rng: &mut StdRng, arena: &Arena) -> Vec<Move> {
    arena
        .agents()
        .iter()
        .map(|_| Move::ALL[rng.random_range(0..Move::ALL.len())])
        .collect()
}

/// Every living body cell is held by a living agent whose body covers it (an
/// invulnerable agent can share cells), and dead agents hold nothing
fn assert_occupancy_consistent(arena: &Arena) {
    for agent in arena.agents() {
        if agent.alive {
            for at in &agent.body {
                let holder = arena
                    .cell(*at)
                    .unwrap()
                    .occupant
                    .map(|i| arena.agent(i))
                    .expect("living body cell without occupant");
                assert!(holder.alive && holder.body.contains(at));
            }
        } else {
            assert!(agent.body.is_empty());
            assert!(arena.cells().iter().all(|(_, cell)| cell.occupant != Some(agent.index)));
        }
    }
}

#[test]
fn test_random_games_undo_exactly() {
    let config = Config::default_hardcoded();

    for seed in 0..25 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut arena = random_arena(&mut rng, &config);

        let mut history = Vec::new();
        for _ in 0..40 {
            history.push(arena.clone());
            let moves = random_moves(&mut rng, &arena);
            arena.apply_tick(&moves);
            assert_occupancy_consistent(&arena);
        }

        while let Some(expected) = history.pop() {
            arena.undo_tick();
            assert_eq!(arena, expected, "seed {} diverged after undo", seed);
        }
        assert_eq!(arena.pending_ticks(), 0);
    }
}

#[test]
fn test_reverse_of_last_move_is_never_legal() {
    let config = Config::default_hardcoded();

    for seed in 100..120 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut arena = random_arena(&mut rng, &config);

        for _ in 0..30 {
            let moves = random_moves(&mut rng, &arena);
            arena.apply_tick(&moves);

            for agent in arena.agents().iter().filter(|a| a.alive) {
                if let Some(last) = agent.last_move.filter(|m| m.is_direction()) {
                    assert!(
                        !arena.can_move(agent.index, last.reverse()),
                        "seed {}: agent {} may reverse {:?}",
                        seed,
                        agent.index,
                        last
                    );
                }
            }
        }
    }
}

#[test]
fn test_growth_matches_score_buckets_and_bonuses() {
    let config = Config::default_hardcoded();
    let per_length = config.rules.score_per_length;

    for seed in 200..220 {
        let mut rng = StdRng::seed_from_u64(seed);
        let snapshot = Snapshot {
            ticks_remaining: 200,
            you: 1,
            objects: random_objects(&mut rng, 150)
                .into_iter()
                .filter(|o| o.kind != KIND_WALL)
                .collect(),
            agents: vec![AgentSnapshot {
                id: 1,
                score: rng.random_range(0..40),
                last_move: Move::Right.code(),
                shield_cooldown: 0,
                shield_remaining: 0,
                body: body((15, 20), 3),
            }],
        };
        let mut arena = Arena::from_snapshot(&snapshot, &config).unwrap();

        for _ in 0..80 {
            let legal: Vec<Move> = arena
                .legal_moves(0)
                .into_iter()
                .filter(|m| m.is_direction())
                .collect();
            if legal.is_empty() {
                break;
            }
            let mv = legal[rng.random_range(0..legal.len())];

            let me = arena.me();
            let (length_before, score_before) = (me.body.len() as i32, me.score);
            let target = me.body[0].step(mv);
            let bonus = if arena.cell(target).unwrap().object == Object::LengthBonus {
                config.rules.length_bonus_growth
            } else {
                0
            };

            arena.apply_tick(&[mv]);
            let me = arena.me();
            assert!(me.alive);

            let crossings = me.score.div_euclid(per_length) - score_before.div_euclid(per_length);
            let expected = (crossings + bonus).max(0);
            assert_eq!(
                me.body.len() as i32 - length_before,
                expected,
                "seed {}: score {} -> {}",
                seed,
                score_before,
                me.score
            );
        }
    }
}
