//! In-flight image requests keyed by (prompt, consistency mode).
//!
//! Results are applied by key, never by arrival order: a response whose
//! entry was superseded is reported as stale and dropped.

use std::collections::HashMap;

/// De-duplication key for image requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    pub prompt: String,
    pub consistency_mode: bool,
}

impl RequestKey {
    pub fn new(prompt: impl Into<String>, consistency_mode: bool) -> Self {
        Self {
            prompt: prompt.into(),
            consistency_mode,
        }
    }
}

/// Identifies one network call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    InFlight,
    Completed,
    Failed,
    /// A newer key took over while this one was running.
    Superseded,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    id: RequestId,
    status: RequestStatus,
}

#[derive(Debug, Default)]
pub struct InFlightRequests {
    entries: HashMap<RequestKey, Entry>,
    next_id: u64,
}

impl InFlightRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fetch for `key`. Returns `None` when the key is already
    /// running or has already produced a result (or an error).
    pub fn begin(&mut self, key: &RequestKey) -> Option<RequestId> {
        if let Some(entry) = self.entries.get(key) {
            if entry.status != RequestStatus::Superseded {
                return None;
            }
        }
        let id = RequestId(self.next_id);
        self.next_id += 1;
        self.entries.insert(
            key.clone(),
            Entry {
                id,
                status: RequestStatus::InFlight,
            },
        );
        Some(id)
    }

    /// Mark every running request except `keep` as superseded. Returns the
    /// ids whose transports should be cancelled.
    pub fn supersede_except(&mut self, keep: Option<&RequestKey>) -> Vec<RequestId> {
        let mut ids = Vec::new();
        for (key, entry) in self.entries.iter_mut() {
            if entry.status == RequestStatus::InFlight && Some(key) != keep {
                entry.status = RequestStatus::Superseded;
                ids.push(entry.id);
            }
        }
        ids
    }

    /// Record success. `false` means the result is stale and must be
    /// discarded.
    pub fn complete(&mut self, id: RequestId, key: &RequestKey) -> bool {
        self.finish(id, key, RequestStatus::Completed)
    }

    /// Record failure. `false` means the error is stale.
    pub fn fail(&mut self, id: RequestId, key: &RequestKey) -> bool {
        self.finish(id, key, RequestStatus::Failed)
    }

    /// Allow failed keys to be retried. Called when the user settles on a
    /// prompt again.
    pub fn forget_failed(&mut self) {
        self.entries
            .retain(|_, entry| entry.status != RequestStatus::Failed);
    }

    pub fn status(&self, key: &RequestKey) -> Option<RequestStatus> {
        self.entries.get(key).map(|e| e.status)
    }

    fn finish(&mut self, id: RequestId, key: &RequestKey, status: RequestStatus) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) if entry.id == id && entry.status == RequestStatus::InFlight => {
                entry.status = status;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_key_is_not_fetched_twice() {
        let mut reqs = InFlightRequests::new();
        let key = RequestKey::new("a cat", false);
        let id = reqs.begin(&key).unwrap();
        assert_eq!(reqs.begin(&key), None);

        assert!(reqs.complete(id, &key));
        assert_eq!(reqs.begin(&key), None);
        assert_eq!(reqs.status(&key), Some(RequestStatus::Completed));
    }

    #[test]
    fn mode_is_part_of_the_key() {
        let mut reqs = InFlightRequests::new();
        assert!(reqs.begin(&RequestKey::new("a cat", false)).is_some());
        assert!(reqs.begin(&RequestKey::new("a cat", true)).is_some());
    }

    #[test]
    fn superseded_result_is_stale() {
        let mut reqs = InFlightRequests::new();
        let old = RequestKey::new("a ca", false);
        let new = RequestKey::new("a cat", false);
        let old_id = reqs.begin(&old).unwrap();
        let new_id = reqs.begin(&new).unwrap();

        assert_eq!(reqs.supersede_except(Some(&new)), vec![old_id]);
        assert!(!reqs.complete(old_id, &old));
        assert!(reqs.complete(new_id, &new));
        assert_eq!(reqs.status(&old), Some(RequestStatus::Superseded));
    }

    #[test]
    fn superseded_key_can_be_fetched_again() {
        let mut reqs = InFlightRequests::new();
        let key = RequestKey::new("a cat", false);
        let first = reqs.begin(&key).unwrap();
        reqs.supersede_except(None);

        let second = reqs.begin(&key).unwrap();
        assert_ne!(first, second);
        assert!(!reqs.complete(first, &key));
        assert!(reqs.complete(second, &key));
    }

    #[test]
    fn failed_key_is_retried_only_after_forget() {
        let mut reqs = InFlightRequests::new();
        let key = RequestKey::new("a cat", false);
        let id = reqs.begin(&key).unwrap();
        assert!(reqs.fail(id, &key));
        assert_eq!(reqs.begin(&key), None);

        reqs.forget_failed();
        assert!(reqs.begin(&key).is_some());
    }
}
