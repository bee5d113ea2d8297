use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one drain pass over the queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncReport {
    pub attempted: u32,
    pub synced: u32,
    pub failed: u32,
    /// Actions left in the queue when the pass ended.
    pub remaining: u32,
    /// True when connectivity dropped mid-pass and the rest was left untouched.
    pub aborted_offline: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SyncReport {
    pub fn empty(at: DateTime<Utc>) -> Self {
        Self {
            attempted: 0,
            synced: 0,
            failed: 0,
            remaining: 0,
            aborted_offline: false,
            started_at: at,
            finished_at: at,
        }
    }
}
