//! Redis list operations backing the buffer.
//!
//! The two multi-key operations run as Lua scripts so Redis executes each one
//! without interleaving other commands:
//!
//! - `MOVE_TO_INFLIGHT` pops up to `count` items off the inbox head in
//!   chunks and appends them to the inflight list.
//! - `REQUEUE_IF_IDLE` checks one inflight list's idle time and, if it is
//!   stale, appends its items back to the inbox and deletes it.
//!
//! Expiry scans with `SCAN MATCH` from the client and runs `REQUEUE_IF_IDLE`
//! per candidate, so a sweep never blocks Redis for longer than one list.
//! Both scripts touch several keys and therefore need all buffer keys on one
//! node; Redis Cluster is not supported.

use std::time::Duration;

use bb8_redis::bb8::PooledConnection;
use bb8_redis::RedisConnectionManager;
use redis::AsyncCommands;
use tracing::debug;

use super::RedisStore;
use crate::storage::error::StorageError;
use crate::storage::traits::{is_inflight_of, MOVE_CHUNK_SIZE};

const SCAN_COUNT: usize = 200;

const MOVE_TO_INFLIGHT: &str = r#"
local count = tonumber(ARGV[1])
local chunk = tonumber(ARGV[2])
local moved = {}
local total = 0
while total < count do
    local take = math.min(chunk, count - total)
    local items = redis.call('LRANGE', KEYS[1], 0, take - 1)
    if #items == 0 then break end
    redis.call('LTRIM', KEYS[1], #items, -1)
    redis.call('RPUSH', KEYS[2], unpack(items))
    for _, item in ipairs(items) do
        total = total + 1
        moved[total] = item
    end
    if #items < take then break end
end
return moved
"#;

const REQUEUE_IF_IDLE: &str = r#"
local idle = redis.call('OBJECT', 'IDLETIME', KEYS[1])
if not idle or idle <= tonumber(ARGV[1]) then return 0 end
local chunk = tonumber(ARGV[2])
local total = 0
while true do
    local items = redis.call('LRANGE', KEYS[1], 0, chunk - 1)
    if #items == 0 then break end
    redis.call('RPUSH', KEYS[2], unpack(items))
    redis.call('LTRIM', KEYS[1], #items, -1)
    total = total + #items
end
redis.call('DEL', KEYS[1])
return total
"#;

async fn get_conn(
    store: &RedisStore,
) -> Result<PooledConnection<'_, RedisConnectionManager>, StorageError> {
    store
        .pool()
        .get()
        .await
        .map_err(|e| StorageError::Unavailable(format!("Failed to get Redis connection: {}", e)))
}

pub async fn push(store: &RedisStore, list: &str, payload: &str) -> Result<(), StorageError> {
    let mut conn = get_conn(store).await?;
    let _: i64 = conn.rpush(list, payload).await?;
    Ok(())
}

pub async fn move_to_inflight(
    store: &RedisStore,
    inbox: &str,
    inflight: &str,
    count: usize,
) -> Result<Vec<String>, StorageError> {
    if count == 0 {
        return Ok(Vec::new());
    }

    let mut conn = get_conn(store).await?;
    let moved: Vec<String> = redis::cmd("EVAL")
        .arg(MOVE_TO_INFLIGHT)
        .arg(2)
        .arg(inbox)
        .arg(inflight)
        .arg(count)
        .arg(MOVE_CHUNK_SIZE)
        .query_async(&mut *conn)
        .await?;

    Ok(moved)
}

pub async fn delete(store: &RedisStore, key: &str) -> Result<bool, StorageError> {
    let mut conn = get_conn(store).await?;
    let removed: i64 = conn.del(key).await?;
    Ok(removed > 0)
}

pub async fn requeue_idle_inflights(
    store: &RedisStore,
    inflight_prefix: &str,
    inbox: &str,
    idle_after: Duration,
) -> Result<u64, StorageError> {
    let mut conn = get_conn(store).await?;
    let pattern = format!("{}:*", inflight_prefix);

    let mut candidates: Vec<String> = Vec::new();
    let mut cursor: u64 = 0;
    loop {
        let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(&pattern)
            .arg("COUNT")
            .arg(SCAN_COUNT)
            .query_async(&mut *conn)
            .await?;
        candidates.extend(keys.into_iter().filter(|k| is_inflight_of(k, inflight_prefix)));
        cursor = next;
        if cursor == 0 {
            break;
        }
    }

    // SCAN may return a key more than once across iterations.
    candidates.sort();
    candidates.dedup();

    let mut reclaimed = 0u64;
    for key in &candidates {
        let moved: i64 = redis::cmd("EVAL")
            .arg(REQUEUE_IF_IDLE)
            .arg(2)
            .arg(key)
            .arg(inbox)
            .arg(idle_after.as_secs())
            .arg(MOVE_CHUNK_SIZE)
            .query_async(&mut *conn)
            .await?;
        if moved > 0 {
            debug!(inflight = %key, inbox = %inbox, items = moved, "Inflight list requeued");
            reclaimed += 1;
        }
    }

    if candidates.len() as u64 > reclaimed {
        debug!(
            prefix = %inflight_prefix,
            outstanding = candidates.len() as u64 - reclaimed,
            "Inflight lists still within their expiry window"
        );
    }

    Ok(reclaimed)
}

pub async fn len(store: &RedisStore, list: &str) -> Result<u64, StorageError> {
    let mut conn = get_conn(store).await?;
    let len: u64 = conn.llen(list).await?;
    Ok(len)
}
