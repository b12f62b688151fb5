// Arena state and reversible tick simulation
//
// The arena is built once per turn from the snapshot and is then only mutated
// through apply_tick/undo_tick. Every mutation a tick performs is written to
// an append-only undo log first, so a tick can be rolled back exactly no matter
// how many deaths it chained together.

use std::collections::VecDeque;

use crate::config::{Config, RulesConfig};
use crate::grid::Grid;
use crate::simple_profiler::ProfileGuard;
use crate::types::{Coord, Move, Snapshot, KIND_LENGTH_BONUS, KIND_TRAP, KIND_WALL};

/// Position of an agent in the arena's agent list (also its processing order)
pub type AgentIndex = usize;

/// What lies on a cell besides an agent's body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Object {
    Empty,
    Score(i32),
    LengthBonus,
    Trap,
    Wall,
}

impl Default for Object {
    fn default() -> Self {
        Object::Empty
    }
}

impl Object {
    /// Decodes a protocol object code; unknown codes are empty
    pub fn from_kind(kind: i32, max_pickup_value: i32) -> Object {
        match kind {
            KIND_WALL => Object::Wall,
            KIND_TRAP => Object::Trap,
            KIND_LENGTH_BONUS => Object::LengthBonus,
            n if n >= 1 && n <= max_pickup_value => Object::Score(n),
            _ => Object::Empty,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cell {
    pub occupant: Option<AgentIndex>,
    pub object: Object,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Agent {
    pub index: AgentIndex,
    /// Identity reported by the snapshot
    pub id: i64,
    pub alive: bool,
    pub score: i32,
    pub last_move: Option<Move>,
    pub shield_cooldown: i32,
    pub shield_remaining: i32,
    /// Head first, tail last
    pub body: VecDeque<Coord>,
}

impl Agent {
    pub fn head(&self) -> Option<Coord> {
        self.body.front().copied()
    }

    pub fn is_invulnerable(&self) -> bool {
        self.shield_remaining > 0
    }
}

#[derive(Debug, Clone, PartialEq)]
enum UndoEntry {
    Agent(Agent),
    Cell { at: Coord, previous: Cell },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Arena {
    ticks_remaining: i32,
    self_index: AgentIndex,
    agents: Vec<Agent>,
    cells: Grid<Cell>,
    rules: RulesConfig,
    undo_log: Vec<UndoEntry>,
    tick_marks: Vec<usize>,
}

impl Arena {
    /// Builds the arena for one turn.
    ///
    /// Objects outside the board are ignored and never replace a wall. Body
    /// coordinates outside the board are clamped onto it. Fails when the
    /// controlled agent is missing or has no body.
    pub fn from_snapshot(snapshot: &Snapshot, config: &Config) -> Result<Self, String> {
        let height = config.board.height;
        let width = config.board.width;
        let mut cells: Grid<Cell> = Grid::new(height, width);

        for placement in &snapshot.objects {
            let at = Coord::new(placement.row, placement.col);
            if !cells.contains(at) || cells[at].object == Object::Wall {
                continue;
            }
            cells[at].object = Object::from_kind(placement.kind, config.rules.max_pickup_value);
        }

        let mut agents = Vec::with_capacity(snapshot.agents.len());
        for (index, reported) in snapshot.agents.iter().enumerate() {
            let body: VecDeque<Coord> = reported
                .body
                .iter()
                .map(|c| {
                    Coord::new(
                        c.row.max(0).min(height as i32 - 1),
                        c.col.max(0).min(width as i32 - 1),
                    )
                })
                .collect();
            for at in &body {
                cells[*at].occupant = Some(index);
            }
            agents.push(Agent {
                index,
                id: reported.id,
                alive: !body.is_empty(),
                score: reported.score,
                last_move: Move::from_code(reported.last_move),
                shield_cooldown: reported.shield_cooldown,
                shield_remaining: reported.shield_remaining,
                body,
            });
        }

        let self_index = agents
            .iter()
            .position(|a| a.id == snapshot.you)
            .ok_or_else(|| format!("Controlled agent {} not found in snapshot", snapshot.you))?;
        if !agents[self_index].alive {
            return Err(format!("Controlled agent {} has no body", snapshot.you));
        }

        Ok(Arena {
            ticks_remaining: snapshot.ticks_remaining,
            self_index,
            agents,
            cells,
            rules: config.rules.clone(),
            undo_log: Vec::new(),
            tick_marks: Vec::new(),
        })
    }

    pub fn ticks_remaining(&self) -> i32 {
        self.ticks_remaining
    }

    pub fn self_index(&self) -> AgentIndex {
        self.self_index
    }

    /// The controlled agent
    pub fn me(&self) -> &Agent {
        &self.agents[self.self_index]
    }

    pub fn agent(&self, index: AgentIndex) -> &Agent {
        &self.agents[index]
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// Living agents other than the controlled one
    pub fn rivals(&self) -> impl Iterator<Item = &Agent> {
        let me = self.self_index;
        self.agents.iter().filter(move |a| a.alive && a.index != me)
    }

    pub fn cells(&self) -> &Grid<Cell> {
        &self.cells
    }

    pub fn cell(&self, at: Coord) -> Option<&Cell> {
        self.cells.get(at)
    }

    pub fn height(&self) -> usize {
        self.cells.height()
    }

    pub fn width(&self) -> usize {
        self.cells.width()
    }

    pub fn rules(&self) -> &RulesConfig {
        &self.rules
    }

    /// Number of applied ticks not yet undone
    pub fn pending_ticks(&self) -> usize {
        self.tick_marks.len()
    }

    /// Legality of `mv` for the agent at `index`
    pub fn can_move(&self, index: AgentIndex, mv: Move) -> bool {
        let agent = &self.agents[index];
        if !agent.alive || self.ticks_remaining <= 0 {
            return false;
        }
        if mv == Move::Shield {
            return agent.shield_cooldown <= 0 && agent.score > self.rules.shield_cost;
        }
        if agent.last_move == Some(mv.reverse()) {
            return false;
        }

        let head = match agent.head() {
            Some(head) => head,
            None => return false,
        };
        match self.cells.get(head.step(mv)) {
            None => false,
            Some(cell) if cell.object == Object::Wall => false,
            Some(cell) => match cell.occupant {
                Some(other) if other != index => !self.agents[other].alive,
                _ => true,
            },
        }
    }

    /// Every legal action for the agent, in protocol code order
    pub fn legal_moves(&self, index: AgentIndex) -> Vec<Move> {
        Move::ALL
            .iter()
            .copied()
            .filter(|mv| self.can_move(index, *mv))
            .collect()
    }

    /// Advances the arena by one synchronized tick.
    ///
    /// `moves[i]` is the action of agent `i`; actions of dead agents are
    /// ignored. Moves are not required to be legal: an illegal move is
    /// resolved by the rules (off-board and wall moves kill, a shield during
    /// cooldown kills).
    pub fn apply_tick(&mut self, moves: &[Move]) {
        let _guard = ProfileGuard::new("apply_tick");
        assert_eq!(moves.len(), self.agents.len(), "one move per agent");

        self.tick_marks.push(self.undo_log.len());
        self.ticks_remaining -= 1;
        for agent in self.agents.iter().filter(|a| a.alive) {
            self.undo_log.push(UndoEntry::Agent(agent.clone()));
        }

        self.resolve_shields(moves);
        self.resolve_movement(moves);
        self.resolve_consumption();
        self.resolve_collisions();
        self.reconcile_occupancy();
    }

    /// Rolls back the most recent `apply_tick`.
    ///
    /// # Panics
    /// Panics if there is no applied tick left to undo.
    pub fn undo_tick(&mut self) {
        let mark = self
            .tick_marks
            .pop()
            .expect("undo_tick called without a matching apply_tick");
        self.rollback_to(mark);
        self.ticks_remaining += 1;
    }

    /// Runs `f` with walls temporarily placed on `at`, then restores the cells
    pub fn with_temporary_walls<R, F>(&mut self, at: &[Coord], f: F) -> R
    where
        F: FnOnce(&mut Arena) -> R,
    {
        let mark = self.undo_log.len();
        for c in at {
            if let Some(cell) = self.cells.get(*c).copied() {
                self.set_cell(
                    *c,
                    Cell {
                        object: Object::Wall,
                        ..cell
                    },
                );
            }
        }
        let result = f(self);
        self.rollback_to(mark);
        result
    }

    fn rollback_to(&mut self, mark: usize) {
        while self.undo_log.len() > mark {
            match self.undo_log.pop() {
                Some(UndoEntry::Agent(agent)) => {
                    let index = agent.index;
                    self.agents[index] = agent;
                }
                Some(UndoEntry::Cell { at, previous }) => self.cells[at] = previous,
                None => break,
            }
        }
    }

    fn set_cell(&mut self, at: Coord, cell: Cell) {
        self.undo_log.push(UndoEntry::Cell {
            at,
            previous: self.cells[at],
        });
        self.cells[at] = cell;
    }

    fn resolve_shields(&mut self, moves: &[Move]) {
        for index in 0..self.agents.len() {
            if !self.agents[index].alive || moves[index] != Move::Shield {
                continue;
            }
            if self.agents[index].shield_cooldown > 0 {
                self.kill(index);
                continue;
            }
            let rules = &self.rules;
            let agent = &mut self.agents[index];
            agent.shield_cooldown = rules.shield_cooldown;
            agent.shield_remaining = rules.shield_duration;
            agent.score -= rules.shield_cost;
            agent.last_move = Some(Move::Shield);
        }
    }

    fn resolve_movement(&mut self, moves: &[Move]) {
        for index in 0..self.agents.len() {
            let mv = moves[index];
            if !self.agents[index].alive || mv == Move::Shield {
                continue;
            }

            let agent = &mut self.agents[index];
            if agent.shield_remaining > 0 {
                agent.shield_remaining -= 1;
            }
            if agent.shield_cooldown > 0 {
                agent.shield_cooldown -= 1;
            }
            agent.last_move = Some(mv);

            let head = match agent.head() {
                Some(head) => head,
                None => continue,
            };
            let next = head.step(mv);
            if !self.cells.contains(next) {
                self.kill(index);
                continue;
            }

            let agent = &mut self.agents[index];
            agent.body.push_front(next);
            let tail = agent.body.pop_back();

            if let Some(tail) = tail {
                let vacated = self.cells[tail];
                if vacated.occupant == Some(index) {
                    self.set_cell(
                        tail,
                        Cell {
                            occupant: None,
                            ..vacated
                        },
                    );
                }
            }
            let claimed = self.cells[next];
            self.set_cell(
                next,
                Cell {
                    occupant: Some(index),
                    ..claimed
                },
            );
        }
    }

    fn resolve_consumption(&mut self) {
        let per_length = self.rules.score_per_length.max(1);
        for index in 0..self.agents.len() {
            let head = match self.agents[index].head() {
                Some(head) if self.agents[index].alive => head,
                _ => continue,
            };

            let cell = self.cells[head];
            let old_score = self.agents[index].score;
            let mut growth = 0;
            match cell.object {
                Object::Wall => {
                    self.kill(index);
                    continue;
                }
                Object::Trap => self.agents[index].score -= self.rules.trap_penalty,
                Object::LengthBonus => growth += self.rules.length_bonus_growth,
                Object::Score(n) => self.agents[index].score += n,
                Object::Empty => {}
            }
            if cell.object != Object::Empty {
                self.set_cell(
                    head,
                    Cell {
                        object: Object::Empty,
                        ..cell
                    },
                );
            }

            let new_score = self.agents[index].score;
            growth += new_score.div_euclid(per_length) - old_score.div_euclid(per_length);
            for _ in 0..growth {
                self.extend_tail(index);
            }
        }
    }

    fn resolve_collisions(&mut self) {
        for index in 0..self.agents.len() {
            let agent = &self.agents[index];
            if !agent.alive || agent.is_invulnerable() {
                continue;
            }
            let head = match agent.head() {
                Some(head) => head,
                None => continue,
            };

            for other in 0..self.agents.len() {
                if other == index || !self.agents[other].alive {
                    continue;
                }
                if self.agents[other].body.contains(&head) {
                    if self.agents[other].head() == Some(head) {
                        self.kill(other);
                    }
                    self.kill(index);
                    break;
                }
            }
        }
    }

    /// Re-stamps surviving bodies so a death on a shared cell never leaves a
    /// living agent's cell looking empty
    fn reconcile_occupancy(&mut self) {
        for index in 0..self.agents.len() {
            if !self.agents[index].alive {
                continue;
            }
            for i in 0..self.agents[index].body.len() {
                let at = self.agents[index].body[i];
                let cell = self.cells[at];
                if cell.occupant != Some(index) {
                    self.set_cell(
                        at,
                        Cell {
                            occupant: Some(index),
                            ..cell
                        },
                    );
                }
            }
        }
    }

    /// Grows the agent by one cell behind its tail
    fn extend_tail(&mut self, index: AgentIndex) {
        let agent = &self.agents[index];
        let tail = match agent.body.back() {
            Some(tail) => *tail,
            None => return,
        };
        let facing = if agent.body.len() >= 2 {
            let before_tail = agent.body[agent.body.len() - 2];
            Move::DIRECTIONS
                .iter()
                .copied()
                .find(|mv| before_tail.step(*mv) == tail)
        } else {
            agent.last_move.filter(|mv| mv.is_direction()).map(|mv| mv.reverse())
        };

        let last_row = self.height() as i32 - 1;
        let last_col = self.width() as i32 - 1;
        let next = tail.step(extension_direction(facing, tail, last_row, last_col));
        if !self.cells.contains(next) {
            return;
        }

        let cell = self.cells[next];
        self.set_cell(
            next,
            Cell {
                occupant: Some(index),
                ..cell
            },
        );
        self.agents[index].body.push_back(next);
    }

    /// Kills an agent, leaving its score behind as pickups along its body
    fn kill(&mut self, index: AgentIndex) {
        let body = std::mem::take(&mut self.agents[index].body);
        self.agents[index].alive = false;

        let max_pickup = self.rules.max_pickup_value.max(1);
        let mut remaining = self.agents[index].score;
        for at in body {
            let before = self.cells[at];
            let mut cell = before;
            if cell.occupant == Some(index) {
                cell.occupant = None;
            }
            if remaining > 0 && cell.object == Object::Empty {
                let value = remaining.min(max_pickup);
                cell.object = Object::Score(value);
                remaining -= value;
            }
            if cell != before {
                self.set_cell(at, cell);
            }
        }
    }
}

/// Direction in which a growing tail extends.
///
/// The tail keeps its facing unless that would leave the board, in which case
/// it turns along the edge towards the interior.
pub fn extension_direction(facing: Option<Move>, tail: Coord, last_row: i32, last_col: i32) -> Move {
    match facing {
        Some(Move::Right) => {
            if tail.col == last_col {
                if tail.row == last_row {
                    Move::Up
                } else {
                    Move::Down
                }
            } else {
                Move::Right
            }
        }
        Some(Move::Down) => {
            if tail.row == last_row {
                if tail.col == last_col {
                    Move::Left
                } else {
                    Move::Right
                }
            } else {
                Move::Down
            }
        }
        Some(Move::Left) => {
            if tail.col == 0 {
                if tail.row == last_row {
                    Move::Up
                } else {
                    Move::Down
                }
            } else {
                Move::Left
            }
        }
        _ => {
            if tail.row == 0 {
                if tail.col == last_col {
                    Move::Left
                } else {
                    Move::Right
                }
            } else {
                Move::Up
            }
        }
    }
}
