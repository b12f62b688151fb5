// Iterative-deepening adversarial search
//
// Every candidate move is scored against all joint replies of the rivals close
// enough to matter (worst case), while the rest of the field keeps doing what
// it did last tick. Depths are searched 0, 1, 2, ... until the deadline, and
// the deepest fully completed depth decides the move.

use std::time::{Duration, Instant};

use log::debug;

use crate::arena::{AgentIndex, Arena};
use crate::config::Config;
use crate::fields::{danger_field, ValueFields};
use crate::grid::Grid;
use crate::simple_profiler::ProfileGuard;
use crate::types::{Coord, Move};

/// Wall-clock instant after which no new search node is started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    pub fn at(at: Instant) -> Self {
        Deadline { at }
    }

    pub fn after(budget: Duration) -> Self {
        Deadline {
            at: Instant::now() + budget,
        }
    }

    pub fn expired(&self) -> bool {
        Instant::now() >= self.at
    }
}

/// Returned through the recursion once the deadline has passed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

/// Result of one fully searched depth
#[derive(Debug, Clone, PartialEq)]
pub struct DepthResult {
    pub depth: u32,
    /// Legal first moves sharing the best utility, in protocol order
    pub best_moves: Vec<Move>,
    pub utility: f64,
    /// `best_moves` narrowed to one by [`break_tie`]
    pub chosen: Move,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub chosen: Move,
    /// Deepest completed depth, `None` when not even depth 0 finished
    pub depth_reached: Option<u32>,
    pub best_moves: Vec<Move>,
    pub utility: Option<f64>,
    pub nodes: u64,
}

/// Search context for one turn. Owns the only mutable handle to the arena
/// while it runs; every simulated tick is undone before control returns.
pub struct Search<'a> {
    arena: &'a mut Arena,
    config: &'a Config,
    deadline: Deadline,
    nodes: u64,
}

impl<'a> Search<'a> {
    pub fn new(arena: &'a mut Arena, config: &'a Config, deadline: Deadline) -> Self {
        Search {
            arena,
            config,
            deadline,
            nodes: 0,
        }
    }

    pub fn nodes(&self) -> u64 {
        self.nodes
    }

    /// Scores every legal first move at `depth`; `field` is the turn's
    /// combined field, also used to break ties
    pub fn search_depth(&mut self, field: &Grid<f64>, depth: u32) -> Result<DepthResult, Cancelled> {
        let mut best_utility = self.config.search.no_move_utility;
        let mut best_moves = Vec::new();

        for mv in self.arena.legal_moves(self.arena.self_index()) {
            let utility = self.utility_of_move(mv, field, depth)?;
            if utility > best_utility {
                best_utility = utility;
                best_moves.clear();
                best_moves.push(mv);
            } else if utility == best_utility {
                best_moves.push(mv);
            }
        }

        Ok(DepthResult {
            depth,
            chosen: break_tie(self.arena.me().head(), field, &best_moves),
            best_moves,
            utility: best_utility,
        })
    }

    /// Worst-case utility of the controlled agent playing `mv`, looking
    /// `depth` further ticks ahead.
    ///
    /// # Arguments
    /// * `mv` - Move of the controlled agent this tick
    /// * `field` - Value field valid before this tick
    /// * `depth` - Remaining plies after this one
    pub fn utility_of_move(&mut self, mv: Move, field: &Grid<f64>, depth: u32) -> Result<f64, Cancelled> {
        if self.deadline.expired() {
            return Err(Cancelled);
        }
        let _guard = ProfileGuard::new("search_node");
        self.nodes += 1;

        let contesting = self.contesting_rivals(depth);
        let assignments = self.joint_moves(mv, &contesting);

        let mut worst = f64::INFINITY;
        for moves in &assignments {
            let score_before = self.arena.me().score;
            let shielded_before = self.count_invulnerable(&contesting);

            self.arena.apply_tick(moves);
            let result = self.evaluate_tick(mv, field, depth, &contesting, score_before, shielded_before);
            self.arena.undo_tick();

            worst = worst.min(result?);
        }
        Ok(worst)
    }

    /// Utility of the tick just applied, recursing when depth remains
    fn evaluate_tick(
        &mut self,
        mv: Move,
        field: &Grid<f64>,
        depth: u32,
        contesting: &[AgentIndex],
        score_before: i32,
        shielded_before: usize,
    ) -> Result<f64, Cancelled> {
        let config = self.config;
        let weights = &config.search;
        let me = self.arena.me();

        let mut utility = weights.utility_per_score * (me.score - score_before) as f64;
        if mv == Move::Shield {
            utility += weights.shield_penalty;
        }

        let head = match me.head() {
            Some(head) if me.alive => head,
            _ => {
                let death = config.danger.death(self.arena.ticks_remaining());
                return Ok(utility + weights.utility_per_value * death);
            }
        };

        let updated = field.min_with(&danger_field(self.arena, &config.danger));
        utility += weights.utility_per_value * updated[head];

        let shielded_after = self.count_invulnerable(contesting);
        utility -= weights.rival_shield_penalty * (shielded_after as f64 - shielded_before as f64);

        let killed = contesting.iter().filter(|&&i| !self.arena.agent(i).alive).count();
        utility += weights.rival_death_bonus * killed as f64;

        if depth > 0 {
            let mut best = weights.no_move_utility;
            for next in self.arena.legal_moves(self.arena.self_index()) {
                best = best.max(self.utility_of_move(next, &updated, depth - 1)?);
            }
            utility += weights.depth_decay * best;
        }

        Ok(utility)
    }

    /// Living rivals whose head is within the contest radius of ours
    fn contesting_rivals(&self, depth: u32) -> Vec<AgentIndex> {
        let head = match self.arena.me().head() {
            Some(head) => head,
            None => return Vec::new(),
        };
        let radius = self.config.search.contest_radius_per_depth * depth as i32;
        self.arena
            .rivals()
            .filter(|rival| rival.head().map_or(false, |h| h.manhattan(&head) <= radius))
            .map(|rival| rival.index)
            .collect()
    }

    fn count_invulnerable(&self, agents: &[AgentIndex]) -> usize {
        agents
            .iter()
            .filter(|&&i| self.arena.agent(i).alive && self.arena.agent(i).is_invulnerable())
            .count()
    }

    /// Every joint move to simulate: the controlled agent plays `mv`,
    /// contesting rivals range over their legal moves, everyone else plays
    /// their predicted move.
    fn joint_moves(&self, mv: Move, contesting: &[AgentIndex]) -> Vec<Vec<Move>> {
        let base: Vec<Move> = (0..self.arena.agents().len())
            .map(|i| {
                if i == self.arena.self_index() {
                    mv
                } else {
                    self.predicted_move(i)
                }
            })
            .collect();

        let mut assignments = vec![base];
        for &rival in contesting {
            let options = self.arena.legal_moves(rival);
            if options.is_empty() {
                continue;
            }
            assignments = assignments
                .iter()
                .flat_map(|partial| {
                    options.iter().map(move |option| {
                        let mut joint = partial.clone();
                        joint[rival] = *option;
                        joint
                    })
                })
                .collect();
        }
        assignments
    }

    /// A rival repeats its last step; after a shield or with no history it
    /// takes its first legal direction
    fn predicted_move(&self, index: AgentIndex) -> Move {
        match self.arena.agent(index).last_move {
            Some(last) if last.is_direction() => last,
            last => Move::DIRECTIONS
                .iter()
                .copied()
                .find(|mv| self.arena.can_move(index, *mv))
                .or(last)
                .unwrap_or(Move::Up),
        }
    }
}

/// Runs iterative deepening until every depth is searched or the deadline
/// passes. `on_depth` sees each completed depth as soon as it is known.
pub fn run<F>(
    arena: &mut Arena,
    fields: &ValueFields,
    config: &Config,
    deadline: Deadline,
    mut on_depth: F,
) -> SearchOutcome
where
    F: FnMut(&DepthResult),
{
    let ticks_remaining = arena.ticks_remaining().max(0) as u32;
    let mut search = Search::new(arena, config, deadline);
    let mut deepest: Option<DepthResult> = None;

    let mut depth = 0;
    while depth < ticks_remaining && depth <= config.timing.max_search_depth {
        match search.search_depth(&fields.combined, depth) {
            Ok(result) => {
                debug!(
                    "Depth {} complete: {:?} (utility {:.1}, nodes {})",
                    depth,
                    result.best_moves,
                    result.utility,
                    search.nodes()
                );
                on_depth(&result);
                let exhausted = result.best_moves.is_empty();
                deepest = Some(result);
                if exhausted {
                    break;
                }
            }
            Err(Cancelled) => {
                debug!("Depth {} cancelled at deadline", depth);
                break;
            }
        }
        depth += 1;
    }

    let nodes = search.nodes();
    match deepest {
        Some(result) => SearchOutcome {
            chosen: result.chosen,
            depth_reached: Some(result.depth),
            best_moves: result.best_moves,
            utility: Some(result.utility),
            nodes,
        },
        None => SearchOutcome {
            chosen: Move::Shield,
            depth_reached: None,
            best_moves: Vec::new(),
            utility: None,
            nodes,
        },
    }
}

/// Picks among equally good moves by the static value at the resulting head.
/// Later moves win exact ties; no candidates means Shield.
pub fn break_tie(head: Option<Coord>, combined: &Grid<f64>, candidates: &[Move]) -> Move {
    match candidates {
        [] => Move::Shield,
        [only] => *only,
        _ => {
            let head = match head {
                Some(head) => head,
                None => return candidates[0],
            };
            let mut chosen = candidates[0];
            let mut best_value = f64::NEG_INFINITY;
            for mv in candidates {
                let value = combined.get(head.step(*mv)).copied().unwrap_or(f64::NEG_INFINITY);
                if value >= best_value {
                    best_value = value;
                    chosen = *mv;
                }
            }
            chosen
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AgentSnapshot, ObjectPlacement, Snapshot, KIND_WALL};

    fn agent(id: i64, score: i32, last_move: Move, body: &[(i32, i32)]) -> AgentSnapshot {
        AgentSnapshot {
            id,
            score,
            last_move: last_move.code(),
            shield_cooldown: 0,
            shield_remaining: 0,
            body: body.iter().map(|&(r, c)| Coord::new(r, c)).collect(),
        }
    }

    fn arena(config: &Config, ticks: i32, objects: &[(i32, i32, i32)], agents: Vec<AgentSnapshot>) -> Arena {
        let snapshot = Snapshot {
            ticks_remaining: ticks,
            you: agents[0].id,
            objects: objects
                .iter()
                .map(|&(row, col, kind)| ObjectPlacement { row, col, kind })
                .collect(),
            agents,
        };
        Arena::from_snapshot(&snapshot, config).unwrap()
    }

    fn shallow_config(max_depth: u32) -> Config {
        let mut config = Config::default_hardcoded();
        config.timing.max_search_depth = max_depth;
        config
    }

    fn pocket_arena(config: &Config) -> Arena {
        // Left leads into a dead end at (0, 4)
        arena(
            config,
            100,
            &[(0, 3, KIND_WALL), (1, 4, KIND_WALL)],
            vec![agent(1, 0, Move::Left, &[(0, 5), (0, 6)])],
        )
    }

    #[test]
    fn test_avoids_dead_end() {
        let config = shallow_config(3);
        let mut a = pocket_arena(&config);
        let fields = ValueFields::build(&mut a, &config);

        let outcome = run(&mut a, &fields, &config, Deadline::after(Duration::from_secs(10)), |_| {});
        assert_eq!(outcome.chosen, Move::Down);
        assert_eq!(outcome.depth_reached, Some(3));
        assert_eq!(outcome.best_moves, vec![Move::Down]);
    }

    #[test]
    fn test_search_leaves_arena_untouched() {
        let config = shallow_config(2);
        let mut a = arena(
            &config,
            100,
            &[(6, 6, 5)],
            vec![
                agent(1, 30, Move::Right, &[(5, 5), (5, 4)]),
                agent(2, 10, Move::Left, &[(5, 8), (5, 9)]),
            ],
        );
        let before = a.clone();
        let fields = ValueFields::build(&mut a, &config);
        run(&mut a, &fields, &config, Deadline::after(Duration::from_secs(10)), |_| {});
        assert_eq!(a, before);
        assert_eq!(a.pending_ticks(), 0);
    }

    #[test]
    fn test_progress_reported_per_depth() {
        let config = shallow_config(3);
        let mut a = pocket_arena(&config);
        let fields = ValueFields::build(&mut a, &config);

        let mut depths = Vec::new();
        run(&mut a, &fields, &config, Deadline::after(Duration::from_secs(10)), |result| {
            depths.push(result.depth)
        });
        assert_eq!(depths, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_depth_bounded_by_remaining_ticks() {
        let config = shallow_config(10);
        let mut a = arena(&config, 2, &[], vec![agent(1, 0, Move::Right, &[(5, 5)])]);
        let fields = ValueFields::build(&mut a, &config);
        let outcome = run(&mut a, &fields, &config, Deadline::after(Duration::from_secs(10)), |_| {});
        assert_eq!(outcome.depth_reached, Some(1));
    }

    #[test]
    fn test_expired_deadline_falls_back_to_shield() {
        let config = Config::default_hardcoded();
        let mut a = pocket_arena(&config);
        let fields = ValueFields::build(&mut a, &config);

        let outcome = run(&mut a, &fields, &config, Deadline::at(Instant::now()), |_| {});
        assert_eq!(outcome.chosen, Move::Shield);
        assert_eq!(outcome.depth_reached, None);
        assert_eq!(a.pending_ticks(), 0);
    }

    #[test]
    fn test_no_legal_move_is_shield() {
        let config = Config::default_hardcoded();
        let mut a = arena(
            &config,
            100,
            &[(0, 1, KIND_WALL), (1, 0, KIND_WALL)],
            vec![agent(1, 0, Move::Right, &[(0, 0)])],
        );
        let fields = ValueFields::build(&mut a, &config);
        let outcome = run(&mut a, &fields, &config, Deadline::after(Duration::from_secs(10)), |_| {});
        assert_eq!(outcome.chosen, Move::Shield);
        assert!(outcome.best_moves.is_empty());
    }

    #[test]
    fn test_shield_is_expensive() {
        let config = Config::default_hardcoded();
        let mut a = arena(&config, 100, &[], vec![agent(1, 50, Move::Right, &[(5, 5), (5, 4)])]);
        let fields = ValueFields::build(&mut a, &config);
        let mut search = Search::new(&mut a, &config, Deadline::after(Duration::from_secs(10)));

        let shield = search.utility_of_move(Move::Shield, &fields.combined, 0).unwrap();
        let right = search.utility_of_move(Move::Right, &fields.combined, 0).unwrap();
        assert!(shield < right);
        assert!(shield <= config.search.shield_penalty);
    }

    #[test]
    fn test_contesting_rival_replies_are_worst_case() {
        let config = Config::default_hardcoded();
        // the rival can step into (5, 6) with us
        let mut a = arena(
            &config,
            100,
            &[],
            vec![
                agent(1, 0, Move::Right, &[(5, 5), (5, 4)]),
                agent(2, 0, Move::Up, &[(6, 6), (7, 6)]),
            ],
        );
        let fields = ValueFields::build(&mut a, &config);
        let mut search = Search::new(&mut a, &config, Deadline::after(Duration::from_secs(10)));

        let into_contest = search.utility_of_move(Move::Right, &fields.combined, 1).unwrap();
        let away = search.utility_of_move(Move::Up, &fields.combined, 1).unwrap();
        assert!(into_contest < away);
        assert!(into_contest <= config.danger.death(99) + config.search.rival_death_bonus);
    }

    #[test]
    fn test_distant_rivals_repeat_last_step_or_take_first_legal_direction() {
        let config = Config::default_hardcoded();
        let mut a = arena(
            &config,
            100,
            &[(20, 29, KIND_WALL)],
            vec![
                agent(1, 0, Move::Right, &[(5, 5), (5, 4)]),
                agent(2, 0, Move::Down, &[(10, 10), (9, 10)]),
                agent(3, 0, Move::Shield, &[(20, 30), (20, 31)]),
            ],
        );
        let search = Search::new(&mut a, &config, Deadline::after(Duration::from_secs(10)));

        assert_eq!(search.predicted_move(1), Move::Down);
        // after a shield: left is walled off, so up is the first legal direction
        assert_eq!(search.predicted_move(2), Move::Up);

        let joint = search.joint_moves(Move::Up, &[]);
        assert_eq!(joint, vec![vec![Move::Up, Move::Down, Move::Up]]);
    }

    #[test]
    fn test_break_tie_prefers_value_then_later_move() {
        let config = Config::default_hardcoded();
        let head = Some(Coord::new(5, 5));
        let mut combined = Grid::filled(config.board.height, config.board.width, 0.0);

        assert_eq!(break_tie(head, &combined, &[Move::Up, Move::Down]), Move::Down);
        combined[Coord::new(4, 5)] = 10.0;
        assert_eq!(break_tie(head, &combined, &[Move::Up, Move::Down]), Move::Up);
        assert_eq!(break_tie(head, &combined, &[]), Move::Shield);
        assert_eq!(break_tie(head, &combined, &[Move::Left]), Move::Left);
    }
}
