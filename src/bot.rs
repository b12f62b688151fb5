// Turn decision service behind the HTTP endpoints
//
// The bot owns the static configuration. Each /move request runs the engine on
// a tokio blocking thread while the async side polls a lock-free shared state,
// answering with the best completed depth as soon as the search finishes or
// the response budget runs out.

use log::{info, warn};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::arena::Arena;
use crate::config::Config;
use crate::debug_logger::DebugLogger;
use crate::fields::ValueFields;
use crate::search::{self, Deadline, DepthResult, SearchOutcome};
use crate::simple_profiler;
use crate::types::{Move, Snapshot};

/// Lock-free shared state for communication between async poller and computation engine
#[derive(Debug)]
pub struct SharedSearchState {
    /// Chosen move of the deepest completed depth (protocol code)
    best_move: AtomicU8,
    /// Utility of that depth, stored as f64 bits
    best_utility: AtomicU64,
    /// Deepest completed depth, -1 until depth 0 completes
    depth_reached: AtomicI64,
    /// Flag indicating search completion
    search_complete: AtomicBool,
}

impl SharedSearchState {
    /// Creates a new shared state answering Shield until a depth completes
    pub fn new() -> Self {
        SharedSearchState {
            best_move: AtomicU8::new(Move::Shield.code() as u8),
            best_utility: AtomicU64::new(f64::NEG_INFINITY.to_bits()),
            depth_reached: AtomicI64::new(-1),
            search_complete: AtomicBool::new(false),
        }
    }

    /// Records a completed depth as the current anytime answer
    pub fn publish(&self, result: &DepthResult) {
        self.best_move.store(result.chosen.code() as u8, Ordering::Release);
        self.best_utility.store(result.utility.to_bits(), Ordering::Release);
        self.depth_reached.store(result.depth as i64, Ordering::Release);
    }

    pub fn best_move(&self) -> Move {
        Move::from_code(self.best_move.load(Ordering::Acquire) as i32).unwrap_or(Move::Shield)
    }

    pub fn best_utility(&self) -> f64 {
        f64::from_bits(self.best_utility.load(Ordering::Acquire))
    }

    pub fn depth_reached(&self) -> Option<u32> {
        let depth = self.depth_reached.load(Ordering::Acquire);
        if depth < 0 {
            None
        } else {
            Some(depth as u32)
        }
    }

    pub fn mark_complete(&self) {
        self.search_complete.store(true, Ordering::Release);
    }

    pub fn is_complete(&self) -> bool {
        self.search_complete.load(Ordering::Acquire)
    }
}

impl Default for SharedSearchState {
    fn default() -> Self {
        Self::new()
    }
}

/// Summary of the most recent /move answer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnReport {
    pub ticks_remaining: i32,
    pub chosen_move: i32,
    pub depth_reached: Option<u32>,
    pub elapsed_ms: u64,
    /// The poller answered before the search finished
    pub timed_out: bool,
}

/// Arena snake bot with an API mirroring the HTTP endpoints
pub struct Bot {
    config: Config,
    debug_logger: DebugLogger,
    last_turn: Mutex<Option<TurnReport>>,
}

impl Bot {
    /// Creates a new Bot instance with the given configuration
    ///
    /// # Arguments
    /// * `config` - Static configuration that does not change during the bot's lifetime
    pub fn new(config: Config) -> Self {
        Self::with_debug_logger(config, DebugLogger::disabled())
    }

    pub fn with_debug_logger(config: Config, debug_logger: DebugLogger) -> Self {
        Bot {
            config,
            debug_logger,
            last_turn: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns bot metadata
    /// Corresponds to GET / endpoint
    pub fn info(&self) -> Value {
        info!("INFO");

        json!({
            "apiversion": "1",
            "author": "arena-snake",
            "board": [self.config.board.height, self.config.board.width],
            "ticks": self.config.board.total_ticks,
        })
    }

    /// Called when a game starts
    /// Corresponds to POST /start endpoint
    pub fn start(&self, snapshot: &Snapshot) {
        info!("GAME START ({} agents, {} ticks)", snapshot.agents.len(), snapshot.ticks_remaining);
    }

    /// Called when a game ends
    /// Corresponds to POST /end endpoint
    pub fn end(&self, snapshot: &Snapshot) {
        info!("GAME OVER ({} ticks remaining)", snapshot.ticks_remaining);
    }

    /// Report of the last answered turn, if any
    pub fn last_turn(&self) -> Option<TurnReport> {
        self.last_turn.lock().clone()
    }

    /// Computes and returns the next move
    /// Corresponds to POST /move endpoint
    ///
    /// 1. Spawns the search on a blocking thread
    /// 2. Polls for completion until the response budget elapses
    /// 3. Answers with the deepest completed depth (Shield if none)
    ///
    /// # Returns
    /// * `Value` - JSON response with the move code and its name
    pub async fn get_move(&self, snapshot: &Snapshot) -> Value {
        let start_time = Instant::now();

        info!("Tick {}: Computing move", snapshot.ticks_remaining);

        let shared = Arc::new(SharedSearchState::new());
        let shared_clone = shared.clone();

        let snapshot_clone = snapshot.clone();
        let config = self.config.clone();

        let effective_budget = self.config.timing.effective_budget_ms();
        let deadline = Deadline::at(start_time + Duration::from_millis(effective_budget));

        tokio::task::spawn_blocking(move || {
            if let Err(e) = Bot::compute_best_move_internal(&snapshot_clone, &shared_clone, deadline, &config) {
                warn!("Search failed, answering shield: {}", e);
            }
            shared_clone.mark_complete();
        });

        let polling_interval = Duration::from_millis(self.config.timing.polling_interval_ms.max(1));
        loop {
            tokio::time::sleep(polling_interval).await;

            let elapsed = start_time.elapsed().as_millis() as u64;
            if elapsed >= effective_budget || shared.is_complete() {
                break;
            }
        }

        let chosen = shared.best_move();
        let depth_reached = shared.depth_reached();
        let elapsed_ms = start_time.elapsed().as_millis() as u64;
        let timed_out = !shared.is_complete();

        info!(
            "Tick {}: Chose {} (utility: {:.1}, depth: {:?}, time: {}ms{})",
            snapshot.ticks_remaining,
            chosen.as_str(),
            shared.best_utility(),
            depth_reached,
            elapsed_ms,
            if timed_out { ", timed out" } else { "" }
        );

        *self.last_turn.lock() = Some(TurnReport {
            ticks_remaining: snapshot.ticks_remaining,
            chosen_move: chosen.code(),
            depth_reached,
            elapsed_ms,
            timed_out,
        });
        self.debug_logger.log_move(snapshot.clone(), chosen, depth_reached);

        json!({ "move": chosen.code(), "action": chosen.as_str() })
    }

    /// Synchronous decision for one snapshot, used by the CLI tools
    pub fn decide(snapshot: &Snapshot, config: &Config, deadline: Deadline) -> Result<SearchOutcome, String> {
        Self::compute_best_move_internal(snapshot, &SharedSearchState::new(), deadline, config)
    }

    /// Internal computation engine: builds the arena and fields, then runs
    /// iterative deepening, publishing every completed depth to `shared`
    pub fn compute_best_move_internal(
        snapshot: &Snapshot,
        shared: &SharedSearchState,
        deadline: Deadline,
        config: &Config,
    ) -> Result<SearchOutcome, String> {
        let mut arena = Arena::from_snapshot(snapshot, config)?;
        let fields = ValueFields::build(&mut arena, config);

        let outcome = search::run(&mut arena, &fields, config, deadline, |result| shared.publish(result));
        simple_profiler::merge_thread_local();

        info!(
            "Search complete. Best move: {} (depth: {:?}, nodes: {})",
            outcome.chosen.as_str(),
            outcome.depth_reached,
            outcome.nodes
        );
        Ok(outcome)
    }
}
