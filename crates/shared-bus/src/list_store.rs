//! # Durable List Store
//!
//! The port through which the forwarder, the list publisher and the pulling
//! subscriber reach a durable list store (Redis in production).
//!
//! ## Atomicity
//!
//! Every method is a single store-level atomic operation. In particular
//! `move_one` removes one occurrence from a list and prepends it to another
//! in one step, and only prepends if the removal happened. That keeps a
//! message in exactly one list even when two workers race on it.
//!
//! ## List Orientation
//!
//! Index 0 is the head (left). Producers push onto the head, consumers pop
//! from the tail, so a list drains oldest-first.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;
use tokio::time::Instant;

/// Errors from the durable list store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("Store connection failed: {0}")]
    Connection(String),

    /// The store rejected or failed a command.
    #[error("Store command failed: {0}")]
    Command(String),
}

/// Atomic list and key primitives of a durable store.
#[async_trait]
pub trait ListStore: Send + Sync {
    /// Prepend `value` to `key`. Returns the new length.
    async fn lpush(&self, key: &str, value: &[u8]) -> Result<usize, StoreError>;

    /// Append `value` to `key`. Returns the new length.
    async fn rpush(&self, key: &str, value: &[u8]) -> Result<usize, StoreError>;

    /// Length of the list at `key` (0 if absent).
    async fn llen(&self, key: &str) -> Result<usize, StoreError>;

    /// Elements between `start` and `stop` inclusive; negative indices count
    /// from the tail.
    async fn lrange(&self, key: &str, start: isize, stop: isize)
        -> Result<Vec<Vec<u8>>, StoreError>;

    /// Remove up to `count` occurrences of `value` (from the head if
    /// positive, from the tail if negative, all if zero). Returns the number
    /// removed.
    async fn lrem(&self, key: &str, count: isize, value: &[u8]) -> Result<usize, StoreError>;

    /// Pop the tail of `source` and prepend it to `destination`.
    async fn rpoplpush(&self, source: &str, destination: &str)
        -> Result<Option<Vec<u8>>, StoreError>;

    /// Like `rpoplpush`, waiting up to `timeout` for `source` to be non-empty.
    ///
    /// Returns `Ok(None)` on timeout.
    async fn brpoplpush(
        &self,
        source: &str,
        destination: &str,
        timeout: Duration,
    ) -> Result<Option<Vec<u8>>, StoreError>;

    /// Remove one occurrence of `value` from `from` and, only if one was
    /// removed, prepend it to `to`. Returns true if the message moved.
    async fn move_one(&self, from: &str, to: &str, value: &[u8]) -> Result<bool, StoreError>;

    /// Set `key` to `value` with a TTL unless it already exists.
    ///
    /// Returns true if the key was set.
    async fn set_nx_ex(&self, key: &str, value: &[u8], ttl: Duration) -> Result<bool, StoreError>;

    /// Set `key` to `value` with a TTL, overwriting any previous value.
    async fn set_ex(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), StoreError>;

    /// Value of `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Delete `key` (a list or a plain key). Returns true if it existed.
    async fn del(&self, key: &str) -> Result<bool, StoreError>;
}

#[derive(Default)]
struct StoreState {
    lists: HashMap<String, VecDeque<Vec<u8>>>,
    keys: HashMap<String, (Vec<u8>, Instant)>,
}

impl StoreState {
    fn list_mut(&mut self, key: &str) -> &mut VecDeque<Vec<u8>> {
        self.lists.entry(key.to_string()).or_default()
    }

    fn live_key(&mut self, key: &str) -> Option<&Vec<u8>> {
        let expired = self
            .keys
            .get(key)
            .is_some_and(|(_, expires_at)| *expires_at <= Instant::now());
        if expired {
            self.keys.remove(key);
        }
        self.keys.get(key).map(|(value, _)| value)
    }

    fn remove_occurrences(&mut self, key: &str, count: isize, value: &[u8]) -> usize {
        let Some(list) = self.lists.get_mut(key) else {
            return 0;
        };
        let limit = if count == 0 {
            usize::MAX
        } else {
            count.unsigned_abs()
        };

        let mut removed = 0;
        if count >= 0 {
            let mut i = 0;
            while i < list.len() && removed < limit {
                if list[i] == value {
                    list.remove(i);
                    removed += 1;
                } else {
                    i += 1;
                }
            }
        } else {
            let mut i = list.len();
            while i > 0 && removed < limit {
                i -= 1;
                if list[i] == value {
                    list.remove(i);
                    removed += 1;
                }
            }
        }

        if list.is_empty() {
            self.lists.remove(key);
        }
        removed
    }

    fn pop_push(&mut self, source: &str, destination: &str) -> Option<Vec<u8>> {
        let list = self.lists.get_mut(source)?;
        let value = list.pop_back()?;
        if list.is_empty() {
            self.lists.remove(source);
        }
        self.list_mut(destination).push_front(value.clone());
        Some(value)
    }
}

/// Resolve an inclusive `[start, stop]` range with negative indices.
fn resolve_range(len: usize, start: isize, stop: isize) -> Option<(usize, usize)> {
    let len = len as isize;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if len == 0 || start > stop || start >= len {
        return None;
    }
    Some((start as usize, stop as usize))
}

/// In-process `ListStore`.
///
/// Suitable for tests and single-process runs; cross-process deployments
/// use a networked store (e.g. `RedisListStore`).
#[derive(Default)]
pub struct InMemoryListStore {
    state: Mutex<StoreState>,
    pushed: Notify,
}

impl InMemoryListStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ListStore for InMemoryListStore {
    async fn lpush(&self, key: &str, value: &[u8]) -> Result<usize, StoreError> {
        let len = {
            let mut state = self.state.lock();
            let list = state.list_mut(key);
            list.push_front(value.to_vec());
            list.len()
        };
        self.pushed.notify_waiters();
        Ok(len)
    }

    async fn rpush(&self, key: &str, value: &[u8]) -> Result<usize, StoreError> {
        let len = {
            let mut state = self.state.lock();
            let list = state.list_mut(key);
            list.push_back(value.to_vec());
            list.len()
        };
        self.pushed.notify_waiters();
        Ok(len)
    }

    async fn llen(&self, key: &str) -> Result<usize, StoreError> {
        Ok(self.state.lock().lists.get(key).map_or(0, VecDeque::len))
    }

    async fn lrange(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<Vec<u8>>, StoreError> {
        let state = self.state.lock();
        let Some(list) = state.lists.get(key) else {
            return Ok(Vec::new());
        };
        let Some((start, stop)) = resolve_range(list.len(), start, stop) else {
            return Ok(Vec::new());
        };
        Ok(list.range(start..=stop).cloned().collect())
    }

    async fn lrem(&self, key: &str, count: isize, value: &[u8]) -> Result<usize, StoreError> {
        Ok(self.state.lock().remove_occurrences(key, count, value))
    }

    async fn rpoplpush(
        &self,
        source: &str,
        destination: &str,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        let moved = self.state.lock().pop_push(source, destination);
        if moved.is_some() {
            self.pushed.notify_waiters();
        }
        Ok(moved)
    }

    async fn brpoplpush(
        &self,
        source: &str,
        destination: &str,
        timeout: Duration,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        let deadline = Instant::now() + timeout;
        loop {
            // Register interest before checking so a push in between is not missed.
            let notified = self.pushed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(value) = self.state.lock().pop_push(source, destination) {
                self.pushed.notify_waiters();
                return Ok(Some(value));
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn move_one(&self, from: &str, to: &str, value: &[u8]) -> Result<bool, StoreError> {
        let moved = {
            let mut state = self.state.lock();
            let removed = state.remove_occurrences(from, 1, value);
            if removed == 1 {
                state.list_mut(to).push_front(value.to_vec());
            }
            removed == 1
        };
        if moved {
            self.pushed.notify_waiters();
        }
        Ok(moved)
    }

    async fn set_nx_ex(&self, key: &str, value: &[u8], ttl: Duration) -> Result<bool, StoreError> {
        let mut state = self.state.lock();
        if state.live_key(key).is_some() {
            return Ok(false);
        }
        state
            .keys
            .insert(key.to_string(), (value.to_vec(), Instant::now() + ttl));
        Ok(true)
    }

    async fn set_ex(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), StoreError> {
        self.state
            .lock()
            .keys
            .insert(key.to_string(), (value.to_vec(), Instant::now() + ttl));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.state.lock().live_key(key).cloned())
    }

    async fn del(&self, key: &str) -> Result<bool, StoreError> {
        let mut state = self.state.lock();
        let list = state.lists.remove(key).is_some();
        let plain = state.keys.remove(key).is_some();
        Ok(list || plain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_push_and_range() {
        let store = InMemoryListStore::new();
        store.lpush("q", b"b").await.unwrap();
        store.lpush("q", b"a").await.unwrap();
        store.rpush("q", b"c").await.unwrap();

        assert_eq!(store.llen("q").await.unwrap(), 3);
        assert_eq!(
            store.lrange("q", 0, -1).await.unwrap(),
            vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]
        );
        assert_eq!(store.lrange("q", 0, 0).await.unwrap(), vec![b"a".to_vec()]);
        assert_eq!(store.lrange("q", -1, -1).await.unwrap(), vec![b"c".to_vec()]);
        assert_eq!(store.lrange("q", 0, 100).await.unwrap().len(), 3);
        assert!(store.lrange("q", 5, 10).await.unwrap().is_empty());
        assert!(store.lrange("missing", 0, -1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rpoplpush_moves_tail_to_head() {
        let store = InMemoryListStore::new();
        store.lpush("main", b"old").await.unwrap();
        store.lpush("main", b"new").await.unwrap();
        store.lpush("progress", b"other").await.unwrap();

        let moved = store.rpoplpush("main", "progress").await.unwrap();
        assert_eq!(moved, Some(b"old".to_vec()));
        assert_eq!(
            store.lrange("progress", 0, -1).await.unwrap(),
            vec![b"old".to_vec(), b"other".to_vec()]
        );
        assert_eq!(store.llen("main").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_lrem_counts() {
        let store = InMemoryListStore::new();
        for v in [b"x", b"y", b"x", b"x"] {
            store.rpush("q", v).await.unwrap();
        }

        assert_eq!(store.lrem("q", 1, b"x").await.unwrap(), 1);
        assert_eq!(
            store.lrange("q", 0, -1).await.unwrap(),
            vec![b"y".to_vec(), b"x".to_vec(), b"x".to_vec()]
        );
        assert_eq!(store.lrem("q", -1, b"x").await.unwrap(), 1);
        assert_eq!(store.lrem("q", 0, b"x").await.unwrap(), 1);
        assert_eq!(store.lrem("q", 0, b"x").await.unwrap(), 0);
        assert_eq!(store.llen("q").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_move_one_is_conditional() {
        let store = InMemoryListStore::new();
        store.lpush("progress", b"msg").await.unwrap();

        assert!(store.move_one("progress", "main", b"msg").await.unwrap());
        assert_eq!(store.llen("progress").await.unwrap(), 0);
        assert_eq!(store.llen("main").await.unwrap(), 1);

        // Second move finds nothing to remove and must not duplicate.
        assert!(!store.move_one("progress", "main", b"msg").await.unwrap());
        assert_eq!(store.llen("main").await.unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_brpoplpush_times_out() {
        let store = InMemoryListStore::new();
        let result = store
            .brpoplpush("main", "progress", Duration::from_secs(1))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_brpoplpush_wakes_on_push() {
        let store = Arc::new(InMemoryListStore::new());
        let waiter = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store
                    .brpoplpush("main", "progress", Duration::from_secs(5))
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        store.lpush("main", b"late").await.unwrap();

        let moved = waiter.await.unwrap().unwrap();
        assert_eq!(moved, Some(b"late".to_vec()));
        assert_eq!(store.llen("progress").await.unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_expire() {
        let store = InMemoryListStore::new();
        assert!(store
            .set_nx_ex("lock", b"me", Duration::from_secs(2))
            .await
            .unwrap());
        assert!(!store
            .set_nx_ex("lock", b"you", Duration::from_secs(2))
            .await
            .unwrap());
        assert_eq!(store.get("lock").await.unwrap(), Some(b"me".to_vec()));

        tokio::time::advance(Duration::from_secs(3)).await;

        assert_eq!(store.get("lock").await.unwrap(), None);
        assert!(store
            .set_nx_ex("lock", b"you", Duration::from_secs(2))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_del() {
        let store = InMemoryListStore::new();
        store.lpush("q", b"a").await.unwrap();
        store
            .set_ex("k", b"v", Duration::from_secs(60))
            .await
            .unwrap();

        assert!(store.del("q").await.unwrap());
        assert!(store.del("k").await.unwrap());
        assert!(!store.del("q").await.unwrap());
    }
}
