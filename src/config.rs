// Configuration module for reading Arena.toml
// All game rules and engine tuning constants live here

use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Main configuration structure containing all tunable parameters
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Config {
    pub board: BoardConfig,
    pub identity: IdentityConfig,
    pub timing: TimingConfig,
    pub rules: RulesConfig,
    pub danger: DangerConfig,
    pub objects: ObjectsConfig,
    pub center: CenterConfig,
    pub search: SearchConfig,
    pub debug: DebugConfig,
}

/// Board geometry and game length
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct BoardConfig {
    pub height: usize,
    pub width: usize,
    pub total_ticks: i32,
}

impl BoardConfig {
    /// Half height plus half width, the largest centre distance worth valuing
    pub fn radius(&self) -> i32 {
        (self.height / 2 + self.width / 2) as i32
    }
}

/// Identity of the controlled agent in token-protocol snapshots
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct IdentityConfig {
    pub self_id: i64,
}

/// Timing and performance constants
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TimingConfig {
    pub response_time_budget_ms: u64,
    pub network_overhead_ms: u64,
    pub polling_interval_ms: u64,
    pub max_search_depth: u32,
}

impl TimingConfig {
    /// Computes the effective computation budget
    pub fn effective_budget_ms(&self) -> u64 {
        self.response_time_budget_ms.saturating_sub(self.network_overhead_ms)
    }
}

/// Simulation rules
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RulesConfig {
    pub shield_cost: i32,
    pub shield_cooldown: i32,
    pub shield_duration: i32,
    pub score_per_length: i32,
    pub length_bonus_growth: i32,
    pub trap_penalty: i32,
    pub max_pickup_value: i32,
}

/// Danger field seeds
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DangerConfig {
    pub trap: f64,
    pub death_per_remaining_tick: f64,
    pub rival_when_shielded: f64,
    pub unset: f64,
}

impl DangerConfig {
    /// Value of dying with `ticks_remaining` ticks left
    pub fn death(&self, ticks_remaining: i32) -> f64 {
        self.death_per_remaining_tick * ticks_remaining as f64
    }
}

/// Reward field constants
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ObjectsConfig {
    pub spread_decline: f64,
    pub base_value_of_score: f64,
    pub value_per_score: f64,
    pub length_value_at_begin: f64,
    pub length_value_at_end: f64,
    pub competitive_discount: f64,
    pub correction: f64,
    pub trap_value: f64,
}

/// Centre pressure constants
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CenterConfig {
    pub value: f64,
    pub inner_bonus: f64,
    pub inner_radius: i32,
    pub value_begin_tick: i32,
    pub lock_begin_tick: i32,
    pub lock_offset: i32,
    pub safe_long_axis: i32,
    pub safe_short_axis: i32,
    pub safe_square: i32,
}

/// Search utility weights
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SearchConfig {
    pub utility_per_score: f64,
    pub utility_per_value: f64,
    pub shield_penalty: f64,
    pub rival_shield_penalty: f64,
    pub rival_death_bonus: f64,
    pub depth_decay: f64,
    pub contest_radius_per_depth: i32,
    pub no_move_utility: f64,
}

/// Debug configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DebugConfig {
    pub enabled: bool,
    pub log_file_path: String,
}

impl Config {
    /// Loads configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the Arena.toml configuration file
    ///
    /// # Returns
    /// * `Result<Config, String>` - Parsed configuration or error message
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let contents = fs::read_to_string(path.as_ref())
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        toml::from_str(&contents).map_err(|e| format!("Failed to parse config file: {}", e))
    }

    /// Loads default configuration from Arena.toml in the project root
    pub fn load_default() -> Result<Self, String> {
        Self::from_file("Arena.toml")
    }

    /// Creates a configuration with hardcoded default values as fallback
    /// This should match the constants defined in Arena.toml
    pub fn default_hardcoded() -> Self {
        Config {
            board: BoardConfig {
                height: 30,
                width: 40,
                total_ticks: 256,
            },
            identity: IdentityConfig {
                self_id: 2023202296,
            },
            timing: TimingConfig {
                response_time_budget_ms: 180,
                network_overhead_ms: 0,
                polling_interval_ms: 5,
                max_search_depth: 64,
            },
            rules: RulesConfig {
                shield_cost: 20,
                shield_cooldown: 30,
                shield_duration: 5,
                score_per_length: 20,
                length_bonus_growth: 2,
                trap_penalty: 10,
                max_pickup_value: 20,
            },
            danger: DangerConfig {
                trap: -1000.0,
                death_per_remaining_tick: -300.0,
                rival_when_shielded: -2000.0,
                unset: 1e20,
            },
            objects: ObjectsConfig {
                spread_decline: 0.75,
                base_value_of_score: 0.0,
                value_per_score: 100.0,
                length_value_at_begin: 0.0,
                length_value_at_end: 0.0,
                competitive_discount: 0.0,
                correction: 0.15,
                trap_value: -1000.0,
            },
            center: CenterConfig {
                value: 3000.0,
                inner_bonus: 0.0,
                inner_radius: 5,
                value_begin_tick: 100,
                lock_begin_tick: 256,
                lock_offset: 5,
                safe_long_axis: 5,
                safe_short_axis: 2,
                safe_square: 4,
            },
            search: SearchConfig {
                utility_per_score: 200.0,
                utility_per_value: 1.0,
                shield_penalty: -4000.0,
                rival_shield_penalty: 2000.0,
                rival_death_bonus: 4000.0,
                depth_decay: 0.8,
                contest_radius_per_depth: 2,
                no_move_utility: -1e20,
            },
            debug: DebugConfig {
                enabled: false,
                log_file_path: "arena_debug.jsonl".to_string(),
            },
        }
    }

    /// Attempts to load from file, falls back to hardcoded defaults on error
    pub fn load_or_default() -> Self {
        Self::load_default().unwrap_or_else(|e| {
            log::warn!("Could not load Arena.toml ({}), using hardcoded defaults", e);
            Self::default_hardcoded()
        })
    }
}
