// Debug logging module for asynchronous turn logging
//
// This module provides fire-and-forget async logging to avoid blocking
// the main request/response cycle. Each decided turn is written as one JSONL
// line that the replay tool can read back.

use log::error;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::types::{Move, Snapshot};

/// Represents a single debug log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugLogEntry {
    pub snapshot: Snapshot,
    /// Protocol code of the answered move
    pub chosen_move: i32,
    pub action: String,
    pub depth_reached: Option<u32>,
    pub timestamp: String,
}

impl DebugLogEntry {
    pub fn new(snapshot: Snapshot, chosen: Move, depth_reached: Option<u32>) -> Self {
        DebugLogEntry {
            snapshot,
            chosen_move: chosen.code(),
            action: chosen.as_str().to_string(),
            depth_reached,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn to_line(&self) -> Result<String, String> {
        serde_json::to_string(self)
            .map(|json| format!("{}\n", json))
            .map_err(|e| format!("Failed to serialize debug log entry: {}", e))
    }
}

/// Shared debug logger state
/// Uses Arc<Mutex<File>> to allow concurrent async writes from multiple tasks
#[derive(Clone)]
pub struct DebugLogger {
    file: Arc<Mutex<Option<File>>>,
    enabled: bool,
}

impl DebugLogger {
    /// Creates a new debug logger
    /// If enabled is true, initializes the log file (truncating if it exists)
    pub async fn new(enabled: bool, log_file_path: &str) -> Self {
        if !enabled {
            return Self::disabled();
        }

        match OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(log_file_path)
            .await
        {
            Ok(file) => {
                log::info!("Debug logging enabled: {}", log_file_path);
                DebugLogger {
                    file: Arc::new(Mutex::new(Some(file))),
                    enabled: true,
                }
            }
            Err(e) => {
                error!("Failed to create debug log file '{}': {}", log_file_path, e);
                Self::disabled()
            }
        }
    }

    /// Creates a disabled debug logger (no-op)
    pub fn disabled() -> Self {
        DebugLogger {
            file: Arc::new(Mutex::new(None)),
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Logs a move decision asynchronously (fire-and-forget)
    /// This spawns a tokio task that writes to the file without blocking
    pub fn log_move(&self, snapshot: Snapshot, chosen: Move, depth_reached: Option<u32>) {
        if !self.enabled {
            return;
        }

        let file_handle = self.file.clone();
        let entry = DebugLogEntry::new(snapshot, chosen, depth_reached);

        tokio::spawn(async move {
            Self::write_entry(file_handle, entry).await;
        });
    }

    /// Performs the actual file write
    async fn write_entry(file_handle: Arc<Mutex<Option<File>>>, entry: DebugLogEntry) {
        let mut file_guard = file_handle.lock().await;

        if let Some(file) = file_guard.as_mut() {
            match entry.to_line() {
                Ok(line) => {
                    if let Err(e) = file.write_all(line.as_bytes()).await {
                        error!("Failed to write debug log entry: {}", e);
                    } else if let Err(e) = file.flush().await {
                        error!("Failed to flush debug log: {}", e);
                    }
                }
                Err(e) => error!("{}", e),
            }
        }
    }
}
