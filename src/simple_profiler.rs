//! Simple profiling guards using thread-local storage
//!
//! Lightweight profiling without changing function signatures.
//! Enable with environment variable: ARENA_PROFILE=1

use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::OnceLock;
use std::time::Instant;

/// Profiled categories, in report order
pub const CATEGORIES: [&str; 4] = ["apply_tick", "danger_field", "value_fields", "search_node"];

thread_local! {
    static LOCAL_TIME: RefCell<[u64; 4]> = RefCell::new([0; 4]);
    static LOCAL_COUNT: RefCell<[usize; 4]> = RefCell::new([0; 4]);
}

// Global aggregators
static GLOBAL_TIME: [AtomicU64; 4] = [
    AtomicU64::new(0),
    AtomicU64::new(0),
    AtomicU64::new(0),
    AtomicU64::new(0),
];
static GLOBAL_COUNT: [AtomicUsize; 4] = [
    AtomicUsize::new(0),
    AtomicUsize::new(0),
    AtomicUsize::new(0),
    AtomicUsize::new(0),
];

static ENABLED: OnceLock<bool> = OnceLock::new();

#[inline]
pub fn is_profiling_enabled() -> bool {
    *ENABLED.get_or_init(|| std::env::var("ARENA_PROFILE").is_ok())
}

fn slot(category: &str) -> Option<usize> {
    CATEGORIES.iter().position(|c| *c == category)
}

pub struct ProfileGuard {
    start: Instant,
    slot: usize,
}

impl ProfileGuard {
    pub fn new(category: &'static str) -> Option<Self> {
        if !is_profiling_enabled() {
            return None;
        }
        slot(category).map(|slot| ProfileGuard {
            start: Instant::now(),
            slot,
        })
    }
}

impl Drop for ProfileGuard {
    fn drop(&mut self) {
        let elapsed_ns = self.start.elapsed().as_nanos() as u64;
        LOCAL_TIME.with(|t| t.borrow_mut()[self.slot] += elapsed_ns);
        LOCAL_COUNT.with(|c| c.borrow_mut()[self.slot] += 1);
    }
}

/// Folds this thread's counters into the global totals
pub fn merge_thread_local() {
    if !is_profiling_enabled() {
        return;
    }

    LOCAL_TIME.with(|t| {
        for (i, value) in t.borrow_mut().iter_mut().enumerate() {
            GLOBAL_TIME[i].fetch_add(*value, Ordering::Relaxed);
            *value = 0;
        }
    });
    LOCAL_COUNT.with(|c| {
        for (i, value) in c.borrow_mut().iter_mut().enumerate() {
            GLOBAL_COUNT[i].fetch_add(*value, Ordering::Relaxed);
            *value = 0;
        }
    });
}

pub fn print_report(total_time_ms: u64) {
    if !is_profiling_enabled() {
        return;
    }

    let total_ns = total_time_ms * 1_000_000;

    eprintln!("\n═══════════════════════════════════════════════════════════");
    eprintln!("                 PERFORMANCE PROFILE");
    eprintln!("═══════════════════════════════════════════════════════════");
    eprintln!("Total Time: {}ms\n", total_time_ms);

    for (i, category) in CATEGORIES.iter().enumerate() {
        let time = GLOBAL_TIME[i].load(Ordering::Relaxed);
        let count = GLOBAL_COUNT[i].load(Ordering::Relaxed);
        let ms = time as f64 / 1_000_000.0;
        let pct = if total_ns > 0 { 100.0 * time as f64 / total_ns as f64 } else { 0.0 };
        let avg_us = if count > 0 { time as f64 / (count * 1000) as f64 } else { 0.0 };

        eprintln!("{}:", category);
        eprintln!("  Time:     {:.2}ms ({:.1}%)", ms, pct);
        eprintln!("  Calls:    {}", count);
        eprintln!("  Avg:      {:.2}µs/call\n", avg_us);
    }

    eprintln!("═══════════════════════════════════════════════════════════\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_category_has_a_slot() {
        for category in CATEGORIES.iter() {
            assert!(slot(category).is_some());
        }
        assert_eq!(slot("unknown"), None);
    }
}
