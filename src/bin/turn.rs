// Single-turn decision over stdin
//
// Usage:
//   turn [--config <path>] < snapshot.txt
//
// Reads one token-protocol snapshot from stdin and prints
// `<move code> <elapsed>ms, <depths> depth` on stdout.

use std::env;
use std::io::{self, Read};
use std::process;
use std::time::{Duration, Instant};

use arena_snake::bot::Bot;
use arena_snake::config::Config;
use arena_snake::search::Deadline;
use arena_snake::simple_profiler;
use arena_snake::types::Snapshot;

fn main() {
    let start_time = Instant::now();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = env::args().collect();
    let config = match args.iter().position(|a| a == "--config") {
        Some(i) => match args.get(i + 1) {
            Some(path) => Config::from_file(path).unwrap_or_else(|e| {
                eprintln!("Warning: Could not load config from '{}': {}", path, e);
                Config::default_hardcoded()
            }),
            None => {
                eprintln!("Error: --config requires an argument");
                process::exit(1);
            }
        },
        None => Config::load_or_default(),
    };

    let deadline = Deadline::at(start_time + Duration::from_millis(config.timing.effective_budget_ms()));

    let mut input = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut input) {
        eprintln!("Error reading stdin: {}", e);
        process::exit(1);
    }

    let snapshot = match Snapshot::from_tokens(&input, config.identity.self_id) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            eprintln!("Error decoding snapshot: {}", e);
            process::exit(1);
        }
    };

    let outcome = match Bot::decide(&snapshot, &config, deadline) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let elapsed_ms = start_time.elapsed().as_millis() as u64;
    println!(
        "{} {}ms, {} depth",
        outcome.chosen.code(),
        elapsed_ms,
        outcome.depth_reached.map_or(0, |d| d + 1)
    );

    simple_profiler::print_report(elapsed_ms);
}
