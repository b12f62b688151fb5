// Replay module for re-running logged turns
//
// This module provides functionality to:
// 1. Parse JSONL debug logs
// 2. Re-run the engine on every logged snapshot to its logged depth
//    (in parallel with rayon)
// 3. Compare logged vs replayed moves
// 4. Report depth and timing statistics

use log::{info, warn};
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::{Duration, Instant};

use crate::bot::Bot;
use crate::config::Config;
use crate::debug_logger::DebugLogEntry;
use crate::search::Deadline;
use crate::types::Move;

/// Wall-clock cap for a replay searching to a fixed logged depth
const DEPTH_BOUNDED_TIMEOUT_SECS: u64 = 60;

/// Result of replaying a single turn
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayResult {
    pub ticks_remaining: i32,
    pub original_move: Move,
    pub replayed_move: Move,
    pub matches: bool,
    pub depth_reached: Option<u32>,
    pub computation_time_ms: u128,
}

/// Statistics for a complete replay session
#[derive(Debug, Default, PartialEq)]
pub struct ReplayStats {
    pub total_turns: usize,
    pub matches: usize,
    pub mismatches: usize,
    pub match_rate: f64,
}

/// Replay engine for analyzing debug logs
pub struct ReplayEngine {
    config: Config,
    verbose: bool,
}

impl ReplayEngine {
    pub fn new(config: Config, verbose: bool) -> Self {
        ReplayEngine { config, verbose }
    }

    /// Loads all log entries from a JSONL file
    pub fn load_log_file<P: AsRef<Path>>(&self, log_path: P) -> Result<Vec<DebugLogEntry>, String> {
        let file = File::open(log_path.as_ref()).map_err(|e| format!("Failed to open log file: {}", e))?;

        let reader = BufReader::new(file);
        let mut entries = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| format!("Failed to read line {}: {}", line_num + 1, e))?;

            if line.trim().is_empty() {
                continue;
            }

            let entry: DebugLogEntry = serde_json::from_str(&line)
                .map_err(|e| format!("Failed to parse JSON on line {}: {}", line_num + 1, e))?;

            entries.push(entry);
        }

        info!("Loaded {} log entries", entries.len());
        Ok(entries)
    }

    /// Replays a single log entry.
    ///
    /// A turn that logged a completed depth is searched to exactly that depth
    /// with a generous deadline, so the result does not depend on machine
    /// load. A turn that completed no depth is replayed under the configured
    /// response budget.
    pub fn replay_entry(&self, entry: &DebugLogEntry) -> Result<ReplayResult, String> {
        let original_move = Move::from_code(entry.chosen_move)
            .ok_or_else(|| format!("Invalid move code in log: {}", entry.chosen_move))?;

        let mut config = self.config.clone();
        let deadline = match entry.depth_reached {
            Some(depth) => {
                config.timing.max_search_depth = depth;
                Deadline::after(Duration::from_secs(DEPTH_BOUNDED_TIMEOUT_SECS))
            }
            None => Deadline::after(Duration::from_millis(config.timing.effective_budget_ms())),
        };

        let start_time = Instant::now();
        let outcome = Bot::decide(&entry.snapshot, &config, deadline)?;
        let computation_time_ms = start_time.elapsed().as_millis();

        let matches = original_move == outcome.chosen;
        if self.verbose {
            if matches {
                info!(
                    "Tick {}: MATCH - {} (depth: {:?}, time: {}ms)",
                    entry.snapshot.ticks_remaining,
                    outcome.chosen.as_str(),
                    outcome.depth_reached,
                    computation_time_ms
                );
            } else {
                warn!(
                    "Tick {}: MISMATCH - Original: {}, Replayed: {} (depth: {:?}, time: {}ms)",
                    entry.snapshot.ticks_remaining,
                    original_move.as_str(),
                    outcome.chosen.as_str(),
                    outcome.depth_reached,
                    computation_time_ms
                );
            }
        }

        Ok(ReplayResult {
            ticks_remaining: entry.snapshot.ticks_remaining,
            original_move,
            replayed_move: outcome.chosen,
            matches,
            depth_reached: outcome.depth_reached,
            computation_time_ms,
        })
    }

    /// Replays all entries; turns are independent and depth-bounded, so they
    /// run in parallel.
    /// Entries that fail to replay are logged and skipped.
    pub fn replay_all(&self, entries: &[DebugLogEntry]) -> Vec<ReplayResult> {
        entries
            .par_iter()
            .filter_map(|entry| match self.replay_entry(entry) {
                Ok(result) => Some(result),
                Err(e) => {
                    warn!("Failed to replay tick {}: {}", entry.snapshot.ticks_remaining, e);
                    None
                }
            })
            .collect()
    }

    /// Replays the entries logged at the given remaining-tick counts
    pub fn replay_ticks(&self, entries: &[DebugLogEntry], ticks: &[i32]) -> Result<Vec<ReplayResult>, String> {
        let selected = ticks
            .iter()
            .map(|tick| {
                entries
                    .iter()
                    .find(|e| e.snapshot.ticks_remaining == *tick)
                    .cloned()
                    .ok_or_else(|| format!("Tick {} not found in log file", tick))
            })
            .collect::<Result<Vec<_>, String>>()?;

        Ok(self.replay_all(&selected))
    }

    /// Generates statistics from replay results
    pub fn generate_stats(&self, results: &[ReplayResult]) -> ReplayStats {
        let total_turns = results.len();
        let matches = results.iter().filter(|r| r.matches).count();
        let mismatches = total_turns - matches;
        let match_rate = if total_turns > 0 {
            (matches as f64 / total_turns as f64) * 100.0
        } else {
            0.0
        };

        ReplayStats {
            total_turns,
            matches,
            mismatches,
            match_rate,
        }
    }

    /// Prints a detailed report of replay results
    pub fn print_report(&self, results: &[ReplayResult]) {
        let stats = self.generate_stats(results);

        println!("\n═══════════════════════════════════════════════════════════");
        println!("                    REPLAY REPORT");
        println!("═══════════════════════════════════════════════════════════");
        println!("Total Turns:    {}", stats.total_turns);
        println!("Matches:        {} ({:.1}%)", stats.matches, stats.match_rate);
        println!("Mismatches:     {}", stats.mismatches);
        println!("═══════════════════════════════════════════════════════════\n");

        if !results.is_empty() {
            let avg_time: f64 =
                results.iter().map(|r| r.computation_time_ms as f64).sum::<f64>() / results.len() as f64;
            let completed: Vec<u32> = results.iter().filter_map(|r| r.depth_reached).collect();
            let avg_depth = if completed.is_empty() {
                0.0
            } else {
                completed.iter().map(|d| *d as f64).sum::<f64>() / completed.len() as f64
            };

            println!("Average Search Depth:       {:.1}", avg_depth);
            println!("Turns Without Any Depth:    {}", results.len() - completed.len());
            println!("Average Computation Time:   {:.1}ms\n", avg_time);
        }

        let mismatches: Vec<_> = results.iter().filter(|r| !r.matches).collect();
        if !mismatches.is_empty() {
            println!("═══════════════════════════════════════════════════════════");
            println!("                  DETAILED MISMATCHES");
            println!("═══════════════════════════════════════════════════════════");

            for result in mismatches {
                println!(
                    "Tick {}: {} → {} (depth: {:?}, time: {}ms)",
                    result.ticks_remaining,
                    result.original_move.as_str(),
                    result.replayed_move.as_str(),
                    result.depth_reached,
                    result.computation_time_ms
                );
            }
            println!();
        }
    }

    /// Checks that the logged moves at the given ticks are among the acceptable ones
    pub fn validate_expected_moves(
        &self,
        entries: &[DebugLogEntry],
        expected_moves: &[(i32, Vec<Move>)],
    ) -> Result<(), String> {
        for (tick, acceptable) in expected_moves {
            let entry = entries
                .iter()
                .find(|e| e.snapshot.ticks_remaining == *tick)
                .ok_or_else(|| format!("Tick {} not found in log", tick))?;

            let actual_move = Move::from_code(entry.chosen_move)
                .ok_or_else(|| format!("Invalid move code in log: {}", entry.chosen_move))?;

            if !acceptable.contains(&actual_move) {
                return Err(format!(
                    "Tick {}: Expected one of {:?}, but got {}",
                    tick,
                    acceptable.iter().map(|m| m.as_str()).collect::<Vec<_>>(),
                    actual_move.as_str()
                ));
            }
        }

        Ok(())
    }

    /// Parses a move given by name or protocol code
    pub fn parse_move(s: &str) -> Result<Move, String> {
        let trimmed = s.trim();
        if let Ok(code) = trimmed.parse::<i32>() {
            return Move::from_code(code).ok_or_else(|| format!("Invalid move code: {}", code));
        }
        Move::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == trimmed.to_lowercase())
            .ok_or_else(|| format!("Invalid move: {}", s))
    }
}
