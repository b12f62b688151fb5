// Arena snapshot types
// A snapshot is everything the engine receives at the start of a turn.

use serde::{Deserialize, Serialize};

/// 2D coordinate on the board (row grows downwards, col grows rightwards)
#[derive(Deserialize, Serialize, Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct Coord {
    pub row: i32,
    pub col: i32,
}

impl Coord {
    pub fn new(row: i32, col: i32) -> Self {
        Coord { row, col }
    }

    /// Coordinate one step away in the given direction; a shield stays in place
    pub fn step(&self, mv: Move) -> Coord {
        let (dr, dc) = mv.delta();
        Coord {
            row: self.row + dr,
            col: self.col + dc,
        }
    }

    /// Orthogonal neighbours in Left, Up, Right, Down order
    pub fn neighbours(&self) -> [Coord; 4] {
        Move::DIRECTIONS.map(|mv| self.step(mv))
    }

    pub fn manhattan(&self, other: &Coord) -> i32 {
        (self.row - other.row).abs() + (self.col - other.col).abs()
    }
}

/// One action per tick: four directions or the shield
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Move {
    Left,
    Up,
    Right,
    Down,
    Shield,
}

impl Move {
    /// All actions in protocol code order
    pub const ALL: [Move; 5] = [Move::Left, Move::Up, Move::Right, Move::Down, Move::Shield];

    /// Directional actions in protocol code order
    pub const DIRECTIONS: [Move; 4] = [Move::Left, Move::Up, Move::Right, Move::Down];

    /// Protocol code: 0 left, 1 up, 2 right, 3 down, 4 shield
    pub fn code(&self) -> i32 {
        match self {
            Move::Left => 0,
            Move::Up => 1,
            Move::Right => 2,
            Move::Down => 3,
            Move::Shield => 4,
        }
    }

    pub fn from_code(code: i32) -> Option<Move> {
        match code {
            0 => Some(Move::Left),
            1 => Some(Move::Up),
            2 => Some(Move::Right),
            3 => Some(Move::Down),
            4 => Some(Move::Shield),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Move::Left => "left",
            Move::Up => "up",
            Move::Right => "right",
            Move::Down => "down",
            Move::Shield => "shield",
        }
    }

    /// The move that undoes this one; a shield has no reverse
    pub fn reverse(&self) -> Move {
        match self {
            Move::Left => Move::Right,
            Move::Right => Move::Left,
            Move::Up => Move::Down,
            Move::Down => Move::Up,
            Move::Shield => Move::Shield,
        }
    }

    pub fn is_direction(&self) -> bool {
        *self != Move::Shield
    }

    /// (row delta, col delta)
    pub fn delta(&self) -> (i32, i32) {
        match self {
            Move::Left => (0, -1),
            Move::Up => (-1, 0),
            Move::Right => (0, 1),
            Move::Down => (1, 0),
            Move::Shield => (0, 0),
        }
    }
}

/// Object code for a wall in the token protocol
pub const KIND_WALL: i32 = -4;
/// Object code for a trap
pub const KIND_TRAP: i32 = -2;
/// Object code for a length bonus
pub const KIND_LENGTH_BONUS: i32 = -1;

/// A pickup or hazard at a board position
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ObjectPlacement {
    pub row: i32,
    pub col: i32,
    pub kind: i32,
}

/// One agent as reported by the turn snapshot
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct AgentSnapshot {
    pub id: i64,
    pub score: i32,
    pub last_move: i32,
    pub shield_cooldown: i32,
    pub shield_remaining: i32,
    /// Head first, tail last
    pub body: Vec<Coord>,
}

/// Complete turn snapshot
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub ticks_remaining: i32,
    /// Identity of the controlled agent
    pub you: i64,
    pub objects: Vec<ObjectPlacement>,
    pub agents: Vec<AgentSnapshot>,
}

impl Snapshot {
    /// Parses the whitespace token protocol:
    /// ticks, object count, `row col kind` triples, agent count, then per agent
    /// `id length score last_move shield_cooldown shield_remaining` followed by
    /// `length` pairs of `row col`, head first.
    ///
    /// The token stream carries no identity for the controlled agent, so the
    /// caller supplies it.
    pub fn from_tokens(input: &str, you: i64) -> Result<Self, String> {
        let mut tokens = Tokens::new(input);

        let ticks_remaining = tokens.next_i32("ticks remaining")?;

        let object_count = tokens.next_count("object count")?;
        let mut objects = Vec::new();
        for _ in 0..object_count {
            let row = tokens.next_i32("object row")?;
            let col = tokens.next_i32("object col")?;
            let kind = tokens.next_i32("object kind")?;
            objects.push(ObjectPlacement { row, col, kind });
        }

        let agent_count = tokens.next_count("agent count")?;
        let mut agents = Vec::new();
        for _ in 0..agent_count {
            let id = tokens.next_i64("agent id")?;
            let length = tokens.next_count("agent length")?;
            let score = tokens.next_i32("agent score")?;
            let last_move = tokens.next_i32("agent last move")?;
            let shield_cooldown = tokens.next_i32("agent shield cooldown")?;
            let shield_remaining = tokens.next_i32("agent shield remaining")?;
            let mut body = Vec::new();
            for _ in 0..length {
                let row = tokens.next_i32("body row")?;
                let col = tokens.next_i32("body col")?;
                body.push(Coord { row, col });
            }
            agents.push(AgentSnapshot {
                id,
                score,
                last_move,
                shield_cooldown,
                shield_remaining,
                body,
            });
        }

        Ok(Snapshot {
            ticks_remaining,
            you,
            objects,
            agents,
        })
    }
}

struct Tokens<'a> {
    inner: std::str::SplitWhitespace<'a>,
    consumed: usize,
}

impl<'a> Tokens<'a> {
    fn new(input: &'a str) -> Self {
        Tokens {
            inner: input.split_whitespace(),
            consumed: 0,
        }
    }

    fn next_raw(&mut self, what: &str) -> Result<&'a str, String> {
        self.consumed += 1;
        self.inner
            .next()
            .ok_or_else(|| format!("Unexpected end of input reading {} (token {})", what, self.consumed))
    }

    fn next_i64(&mut self, what: &str) -> Result<i64, String> {
        let raw = self.next_raw(what)?;
        raw.parse::<i64>()
            .map_err(|e| format!("Invalid {} '{}' at token {}: {}", what, raw, self.consumed, e))
    }

    fn next_i32(&mut self, what: &str) -> Result<i32, String> {
        let raw = self.next_raw(what)?;
        raw.parse::<i32>()
            .map_err(|e| format!("Invalid {} '{}' at token {}: {}", what, raw, self.consumed, e))
    }

    fn next_count(&mut self, what: &str) -> Result<usize, String> {
        let raw = self.next_raw(what)?;
        raw.parse::<usize>()
            .map_err(|e| format!("Invalid {} '{}' at token {}: {}", what, raw, self.consumed, e))
    }
}
