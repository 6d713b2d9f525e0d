use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{RateLimitStore, StoreError};

/// In-process counters, one `(window_start, count)` pair per key.
///
/// A key only ever holds its latest window. Keys whose window has ended
/// stay until [`RateLimitStore::purge_before`] removes them, so the
/// retention task must run alongside this store.
#[derive(Default)]
pub struct MemoryStore {
    windows: Mutex<HashMap<String, (i64, u64)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateLimitStore for MemoryStore {
    async fn increment(&self, key: &str, window_start: i64) -> Result<u64, StoreError> {
        let mut windows = self.windows.lock().await;
        let entry = windows.entry(key.to_string()).or_insert((window_start, 0));
        if entry.0 != window_start {
            *entry = (window_start, 0);
        }
        entry.1 += 1;
        Ok(entry.1)
    }

    async fn purge_before(&self, window_start: i64) -> Result<u64, StoreError> {
        let mut windows = self.windows.lock().await;
        let before = windows.len();
        windows.retain(|_, (start, _)| *start >= window_start);
        Ok((before - windows.len()) as u64)
    }
}
