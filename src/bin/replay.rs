// Standalone replay tool for arena debug logs
//
// Usage:
//   cargo run --bin replay -- <log_file> [options]
//
// Options:
//   --all                  Replay all turns
//   --ticks <t1,t2>        Replay turns by remaining ticks (comma-separated)
//   --validate             Check logged moves against expectations
//   --verbose              Show detailed output for each turn
//   --config <path>        Path to Arena.toml (default: Arena.toml)

use std::env;
use std::process;

use arena_snake::config::Config;
use arena_snake::replay::ReplayEngine;
use arena_snake::types::Move;

fn print_usage() {
    eprintln!("Arena Replay Tool");
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("  replay <log_file> [OPTIONS]");
    eprintln!();
    eprintln!("OPTIONS:");
    eprintln!("  --all                   Replay all turns in the log");
    eprintln!("  --ticks <T1,T2,...>     Replay turns by remaining ticks (comma-separated)");
    eprintln!("  --validate <T:M,...>    Validate logged moves (format: ticks:move,...)");
    eprintln!("  --verbose               Show detailed output for each turn");
    eprintln!("  --config <path>         Path to Arena.toml (default: Arena.toml)");
    eprintln!("  --help                  Show this help message");
    eprintln!();
    eprintln!("EXAMPLES:");
    eprintln!("  replay arena_debug.jsonl --all");
    eprintln!("  replay arena_debug.jsonl --ticks 200,150");
    eprintln!("  replay arena_debug.jsonl --validate 200:up,150:left|down");
}

fn parse_ticks(s: &str) -> Result<Vec<i32>, String> {
    s.split(',')
        .map(|t| {
            t.trim()
                .parse::<i32>()
                .map_err(|e| format!("Invalid tick number '{}': {}", t, e))
        })
        .collect()
}

fn parse_expected_moves(s: &str) -> Result<Vec<(i32, Vec<Move>)>, String> {
    s.split(',')
        .map(|pair| {
            let parts: Vec<&str> = pair.trim().split(':').collect();
            if parts.len() != 2 {
                return Err(format!("Invalid format '{}'. Expected 'ticks:move'", pair));
            }

            let tick = parts[0]
                .parse::<i32>()
                .map_err(|e| format!("Invalid tick number '{}': {}", parts[0], e))?;

            // Several acceptable moves are separated by '|'
            let moves = parts[1]
                .split('|')
                .map(ReplayEngine::parse_move)
                .collect::<Result<Vec<Move>, String>>()?;

            Ok((tick, moves))
        })
        .collect()
}

fn option_value<'a>(args: &'a [String], i: usize, name: &str) -> &'a str {
    match args.get(i + 1) {
        Some(value) => value.as_str(),
        None => {
            eprintln!("Error: {} requires an argument", name);
            process::exit(1);
        }
    }
}

enum Mode {
    All,
    Ticks(String),
    Validate(String),
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    let wants_help = args.iter().any(|a| a == "--help");
    if args.len() < 2 || wants_help {
        print_usage();
        process::exit(if wants_help { 0 } else { 1 });
    }

    let log_file = &args[1];
    let mut config_path = "Arena.toml".to_string();
    let mut verbose = false;
    let mut mode = None;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--all" => mode = Some(Mode::All),
            "--ticks" => {
                mode = Some(Mode::Ticks(option_value(&args, i, "--ticks").to_string()));
                i += 1;
            }
            "--validate" => {
                mode = Some(Mode::Validate(option_value(&args, i, "--validate").to_string()));
                i += 1;
            }
            "--config" => {
                config_path = option_value(&args, i, "--config").to_string();
                i += 1;
            }
            "--verbose" => verbose = true,
            _ => {
                eprintln!("Error: Unknown option '{}'", args[i]);
                print_usage();
                process::exit(1);
            }
        }
        i += 1;
    }

    let mode = match mode {
        Some(mode) => mode,
        None => {
            eprintln!("Error: Must specify --all, --ticks, or --validate");
            print_usage();
            process::exit(1);
        }
    };

    let config = Config::from_file(&config_path).unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config from '{}': {}", config_path, e);
        eprintln!("Using default configuration");
        Config::default_hardcoded()
    });

    println!("Loaded configuration from: {}", config_path);
    println!("Replay log file: {}", log_file);
    println!();

    let engine = ReplayEngine::new(config, verbose);

    let entries = match engine.load_log_file(log_file) {
        Ok(entries) => entries,
        Err(e) => {
            eprintln!("Error loading log file: {}", e);
            process::exit(1);
        }
    };

    if entries.is_empty() {
        eprintln!("Error: Log file is empty");
        process::exit(1);
    }

    println!("Loaded {} log entries\n", entries.len());

    match mode {
        Mode::All => {
            println!("Replaying all {} turns...\n", entries.len());
            let results = engine.replay_all(&entries);
            engine.print_report(&results);
        }
        Mode::Ticks(arg) => {
            let ticks = parse_ticks(&arg).unwrap_or_else(|e| {
                eprintln!("Error parsing ticks: {}", e);
                process::exit(1);
            });

            println!("Replaying {} specific turn(s)...\n", ticks.len());
            match engine.replay_ticks(&entries, &ticks) {
                Ok(results) => engine.print_report(&results),
                Err(e) => {
                    eprintln!("Error during replay: {}", e);
                    process::exit(1);
                }
            }
        }
        Mode::Validate(arg) => {
            let expected_moves = parse_expected_moves(&arg).unwrap_or_else(|e| {
                eprintln!("Error parsing expected moves: {}", e);
                process::exit(1);
            });

            println!("Validating {} expected move(s)...\n", expected_moves.len());
            match engine.validate_expected_moves(&entries, &expected_moves) {
                Ok(()) => println!("✓ All expected moves validated successfully!"),
                Err(e) => {
                    eprintln!("✗ Validation failed: {}", e);
                    process::exit(1);
                }
            }
        }
    }
}
