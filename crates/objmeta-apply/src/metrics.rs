//! Key operation counters
//!
//! Counters are kept locally (for stats and tests) and mirrored to the
//! `metrics` facade, which is a no-op until a recorder is installed.

use std::sync::atomic::{AtomicU64, Ordering};

const KEY_COMMITS: &str = "objmeta_key_commits_total";
const KEY_COMMIT_FAILS: &str = "objmeta_key_commit_fails_total";

#[derive(Debug, Default)]
pub struct KeyMetrics {
    num_key_commits: AtomicU64,
    num_key_commit_fails: AtomicU64,
}

impl KeyMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register descriptions with the installed recorder
    pub fn describe() {
        ::metrics::describe_counter!(KEY_COMMITS, "Key commit requests applied");
        ::metrics::describe_counter!(KEY_COMMIT_FAILS, "Key commit requests that failed");
    }

    pub fn inc_num_key_commits(&self) {
        self.num_key_commits.fetch_add(1, Ordering::Relaxed);
        ::metrics::counter!(KEY_COMMITS).increment(1);
    }

    pub fn inc_num_key_commit_fails(&self) {
        self.num_key_commit_fails.fetch_add(1, Ordering::Relaxed);
        ::metrics::counter!(KEY_COMMIT_FAILS).increment(1);
    }

    pub fn num_key_commits(&self) -> u64 {
        self.num_key_commits.load(Ordering::Relaxed)
    }

    pub fn num_key_commit_fails(&self) -> u64 {
        self.num_key_commit_fails.load(Ordering::Relaxed)
    }
}
