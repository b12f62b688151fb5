// Library exports for the arena snake engine
// The server, the stdin turn binary and the replay tool all share this core.

pub mod arena;
pub mod bot;
pub mod config;
pub mod debug_logger;
pub mod fields;
pub mod grid;
pub mod replay;
pub mod search;
pub mod simple_profiler;
pub mod types;
