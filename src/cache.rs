// src/cache.rs
//! Time-bounded caching layer sitting in front of the metric sources.
//!
//! Callers must treat cache absence identically to a cold cache: every
//! operation degrades to a miss/no-op when the layer is disabled or the
//! backing store is unreachable. Backend failures are logged, never
//! surfaced.

use crate::config::Config;
use dashmap::DashMap;
use log::{debug, info, warn};
use redis::{aio::ConnectionManager, AsyncCommands};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

#[derive(Clone)]
enum Backend {
    Redis(ConnectionManager),
    Memory(std::sync::Arc<DashMap<String, MemoryEntry>>),
    Disabled,
}

#[derive(Clone)]
struct MemoryEntry {
    payload: String,
    expires_at: Instant,
}

/// Shared cache client. Safe for concurrent use across requests: every
/// operation is an independent single-key read or full overwrite.
#[derive(Clone)]
pub struct Cache {
    backend: Backend,
    namespace: String,
    default_ttl: Duration,
}

impl fmt::Debug for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let backend = match &self.backend {
            Backend::Redis(_) => "redis",
            Backend::Memory(_) => "memory",
            Backend::Disabled => "disabled",
        };
        f.debug_struct("Cache")
            .field("backend", &backend)
            .field("namespace", &self.namespace)
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}

impl Cache {
    /// Connects the configured backing store. Never fails: an unreachable
    /// store leaves the layer disabled, and callers observe a permanently
    /// cold cache.
    pub async fn connect(config: &Config) -> Self {
        let default_ttl = Duration::from_secs(config.cache_default_ttl_secs);
        let backend = if !config.cache_enabled {
            info!("Cache disabled by configuration");
            Backend::Disabled
        } else if config.redis_url.starts_with("memory://") {
            info!("Cache using in-process memory backend");
            Backend::Memory(std::sync::Arc::new(DashMap::new()))
        } else {
            match redis::Client::open(config.redis_url.as_str()) {
                Ok(client) => match ConnectionManager::new(client).await {
                    Ok(conn) => {
                        info!(
                            "Redis ConnectionManager initialized. Default TTL: {}s",
                            config.cache_default_ttl_secs
                        );
                        Backend::Redis(conn)
                    }
                    Err(e) => {
                        warn!(
                            "Redis unavailable at {}: {}. Continuing without cache.",
                            config.redis_url, e
                        );
                        Backend::Disabled
                    }
                },
                Err(e) => {
                    warn!("Invalid Redis URL {}: {}. Continuing without cache.", config.redis_url, e);
                    Backend::Disabled
                }
            }
        };

        Self {
            backend,
            namespace: config.cache_namespace.clone(),
            default_ttl,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self.backend, Backend::Disabled)
    }

    /// Key format: `{namespace}:{protocol}:{metric}`.
    fn generate_key(&self, protocol: &str, metric: &str) -> String {
        format!("{}:{}:{}", self.namespace, protocol, metric)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, protocol: &str, metric: &str) -> Option<T> {
        let key = self.generate_key(protocol, metric);
        let payload = match &self.backend {
            Backend::Disabled => return None,
            Backend::Memory(map) => {
                let entry = map.get(&key)?;
                if entry.expires_at <= Instant::now() {
                    drop(entry);
                    map.remove(&key);
                    debug!("Cache EXPIRED for key: {}", key);
                    return None;
                }
                entry.payload.clone()
            }
            Backend::Redis(conn) => {
                let mut conn = conn.clone();
                match conn.get::<_, Option<String>>(&key).await {
                    Ok(Some(payload)) => payload,
                    Ok(None) => {
                        debug!("Cache MISS for key: {}", key);
                        return None;
                    }
                    Err(e) => {
                        warn!("Redis GET error for key {}: {}. Treating as miss.", key, e);
                        return None;
                    }
                }
            }
        };

        match serde_json::from_str::<T>(&payload) {
            Ok(value) => {
                debug!("Cache HIT for key: {}", key);
                Some(value)
            }
            Err(e) => {
                warn!(
                    "Failed to deserialize cached JSON for key {}: {}. Treating as miss.",
                    key, e
                );
                None
            }
        }
    }

    /// Unconditional overwrite with a fresh TTL. Returns whether the write
    /// landed; a failed write is a diagnostic, not an error.
    pub async fn set_ex<T: Serialize>(
        &self,
        protocol: &str,
        metric: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> bool {
        let key = self.generate_key(protocol, metric);
        let ttl = ttl.unwrap_or(self.default_ttl);
        let payload = match serde_json::to_string(value) {
            Ok(p) => p,
            Err(e) => {
                warn!("Failed to serialize value for key {}: {}", key, e);
                return false;
            }
        };

        match &self.backend {
            Backend::Disabled => false,
            Backend::Memory(map) => {
                map.insert(
                    key.clone(),
                    MemoryEntry {
                        payload,
                        expires_at: Instant::now() + ttl,
                    },
                );
                debug!("Cache SET for key: {} with TTL: {:?}", key, ttl);
                true
            }
            Backend::Redis(conn) => {
                let mut conn = conn.clone();
                // Redis rejects a zero expiry; sub-second TTLs round up.
                match conn
                    .set_ex::<_, _, ()>(&key, payload, ttl.as_secs().max(1))
                    .await
                {
                    Ok(_) => {
                        debug!("Cache SETEX success for key: {} with TTL: {:?}", key, ttl);
                        true
                    }
                    Err(e) => {
                        warn!("Failed to SETEX key '{}': {}", key, e);
                        false
                    }
                }
            }
        }
    }

    pub async fn delete(&self, protocol: &str, metric: &str) -> bool {
        let key = self.generate_key(protocol, metric);
        match &self.backend {
            Backend::Disabled => false,
            Backend::Memory(map) => map.remove(&key).is_some(),
            Backend::Redis(conn) => {
                let mut conn = conn.clone();
                match conn.del::<_, i32>(&key).await {
                    Ok(count) => count > 0,
                    Err(e) => {
                        warn!("Redis DEL error for key {}: {}", key, e);
                        false
                    }
                }
            }
        }
    }

    /// Deletes every key under `{namespace}:{prefix}`. Returns how many
    /// entries were removed.
    pub async fn clear_by_prefix(&self, prefix: &str) -> usize {
        let pattern = format!("{}:{}", self.namespace, prefix);
        match &self.backend {
            Backend::Disabled => 0,
            Backend::Memory(map) => {
                let keys: Vec<String> = map
                    .iter()
                    .filter(|e| e.key().starts_with(&pattern))
                    .map(|e| e.key().clone())
                    .collect();
                let count = keys.len();
                for key in keys {
                    map.remove(&key);
                }
                count
            }
            Backend::Redis(conn) => {
                let mut conn = conn.clone();
                let mut cursor: u64 = 0;
                let mut removed = 0usize;
                loop {
                    let scan: Result<(u64, Vec<String>), _> = redis::cmd("SCAN")
                        .arg(cursor)
                        .arg("MATCH")
                        .arg(format!("{}*", pattern))
                        .arg("COUNT")
                        .arg(100)
                        .query_async(&mut conn)
                        .await;
                    let (next, keys) = match scan {
                        Ok(v) => v,
                        Err(e) => {
                            warn!("Redis SCAN error for prefix {}: {}", pattern, e);
                            return removed;
                        }
                    };
                    if !keys.is_empty() {
                        match conn.del::<_, usize>(keys).await {
                            Ok(n) => removed += n,
                            Err(e) => warn!("Redis DEL error for prefix {}: {}", pattern, e),
                        }
                    }
                    if next == 0 {
                        break;
                    }
                    cursor = next;
                }
                removed
            }
        }
    }
}
