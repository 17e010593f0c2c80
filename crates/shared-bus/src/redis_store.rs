//! Redis adapter for the durable list store.
//!
//! Connection URLs may be full `redis://` URLs or bare `host:port` pairs.

use crate::list_store::{ListStore, StoreError};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{RedisError, Script};
use std::time::Duration;
use tracing::info;

/// Removes one occurrence from KEYS[1] and prepends it to KEYS[2] only if
/// something was removed.
const MOVE_ONE_SCRIPT: &str = r"
local removed = redis.call('LREM', KEYS[1], 1, ARGV[1])
if removed == 1 then
  redis.call('LPUSH', KEYS[2], ARGV[1])
end
return removed
";

fn command_error(e: RedisError) -> StoreError {
    StoreError::Command(e.to_string())
}

/// Whole seconds for a Redis TTL; Redis rejects a zero expiry.
fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

/// `ListStore` backed by a Redis server.
#[derive(Clone)]
pub struct RedisListStore {
    conn: MultiplexedConnection,
}

impl RedisListStore {
    /// Connect to `url` (`redis://host:port/db` or `host:port`).
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let url = if url.starts_with("redis://") || url.starts_with("rediss://") {
            url.to_string()
        } else {
            format!("redis://{url}")
        };
        let client =
            redis::Client::open(url.as_str()).map_err(|e| StoreError::Connection(e.to_string()))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        info!(url = %url, "Connected to Redis list store");
        Ok(Self { conn })
    }
}

#[async_trait]
impl ListStore for RedisListStore {
    async fn lpush(&self, key: &str, value: &[u8]) -> Result<usize, StoreError> {
        let mut conn = self.conn.clone();
        redis::cmd("LPUSH")
            .arg(key)
            .arg(value)
            .query_async(&mut conn)
            .await
            .map_err(command_error)
    }

    async fn rpush(&self, key: &str, value: &[u8]) -> Result<usize, StoreError> {
        let mut conn = self.conn.clone();
        redis::cmd("RPUSH")
            .arg(key)
            .arg(value)
            .query_async(&mut conn)
            .await
            .map_err(command_error)
    }

    async fn llen(&self, key: &str) -> Result<usize, StoreError> {
        let mut conn = self.conn.clone();
        redis::cmd("LLEN")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(command_error)
    }

    async fn lrange(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<Vec<u8>>, StoreError> {
        let mut conn = self.conn.clone();
        redis::cmd("LRANGE")
            .arg(key)
            .arg(start)
            .arg(stop)
            .query_async(&mut conn)
            .await
            .map_err(command_error)
    }

    async fn lrem(&self, key: &str, count: isize, value: &[u8]) -> Result<usize, StoreError> {
        let mut conn = self.conn.clone();
        redis::cmd("LREM")
            .arg(key)
            .arg(count)
            .arg(value)
            .query_async(&mut conn)
            .await
            .map_err(command_error)
    }

    async fn rpoplpush(
        &self,
        source: &str,
        destination: &str,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        let mut conn = self.conn.clone();
        redis::cmd("RPOPLPUSH")
            .arg(source)
            .arg(destination)
            .query_async(&mut conn)
            .await
            .map_err(command_error)
    }

    async fn brpoplpush(
        &self,
        source: &str,
        destination: &str,
        timeout: Duration,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        let mut conn = self.conn.clone();
        redis::cmd("BRPOPLPUSH")
            .arg(source)
            .arg(destination)
            .arg(ttl_secs(timeout))
            .query_async(&mut conn)
            .await
            .map_err(command_error)
    }

    async fn move_one(&self, from: &str, to: &str, value: &[u8]) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let removed: i64 = Script::new(MOVE_ONE_SCRIPT)
            .key(from)
            .key(to)
            .arg(value)
            .invoke_async(&mut conn)
            .await
            .map_err(command_error)?;
        Ok(removed == 1)
    }

    async fn set_nx_ex(&self, key: &str, value: &[u8], ttl: Duration) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl_secs(ttl))
            .query_async(&mut conn)
            .await
            .map_err(command_error)?;
        Ok(reply.is_some())
    }

    async fn set_ex(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl_secs(ttl))
            .query_async(&mut conn)
            .await
            .map_err(command_error)
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let mut conn = self.conn.clone();
        redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(command_error)
    }

    async fn del(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let removed: i64 = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(command_error)?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_never_zero() {
        assert_eq!(ttl_secs(Duration::ZERO), 1);
        assert_eq!(ttl_secs(Duration::from_millis(1500)), 1);
        assert_eq!(ttl_secs(Duration::from_secs(10)), 10);
    }
}
