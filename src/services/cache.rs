use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Redis key holding the generation shared by every instance
const GENERATION_KEY: &str = "ranker:cache_generation";

/// Errors that can occur with cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Cache miss: {0}")]
    CacheMiss(String),
}

/// Multi-tier cache manager for ranked responses
///
/// L1 is an in-process `moka` cache; L2 is Redis, shared across instances,
/// and optional. Keys carry a generation number. Invalidation bumps the
/// generation (in Redis when present, so peers observe it on their next
/// lookup), which orphans every entry written under an older one, including
/// writes from requests that were already in flight.
pub struct CacheManager {
    redis: Option<Arc<tokio::sync::Mutex<ConnectionManager>>>,
    l1_cache: moka::future::Cache<String, Vec<u8>>,
    generation: AtomicU64,
    ttl_secs: u64,
}

impl CacheManager {
    /// Create an L1-only cache
    pub fn in_memory(l1_size: u64, ttl_secs: u64) -> Self {
        Self {
            redis: None,
            l1_cache: Self::build_l1(l1_size, ttl_secs),
            generation: AtomicU64::new(0),
            ttl_secs,
        }
    }

    /// Create a cache backed by Redis as the second tier
    pub async fn with_redis(redis_url: &str, l1_size: u64, ttl_secs: u64) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        let redis = ConnectionManager::new(client).await?;

        Ok(Self {
            redis: Some(Arc::new(tokio::sync::Mutex::new(redis))),
            l1_cache: Self::build_l1(l1_size, ttl_secs),
            generation: AtomicU64::new(0),
            ttl_secs,
        })
    }

    fn build_l1(l1_size: u64, ttl_secs: u64) -> moka::future::Cache<String, Vec<u8>> {
        moka::future::CacheBuilder::new(l1_size)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build()
    }

    pub fn has_redis(&self) -> bool {
        self.redis.is_some()
    }

    /// Current cache generation; read it before touching the listing store
    pub async fn generation(&self) -> Result<u64, CacheError> {
        let Some(redis) = &self.redis else {
            return Ok(self.generation.load(Ordering::SeqCst));
        };

        let mut conn = redis.lock().await;
        let shared: Option<u64> = redis::cmd("GET")
            .arg(GENERATION_KEY)
            .query_async(&mut *conn)
            .await?;

        let shared = shared.unwrap_or(0);
        self.generation.store(shared, Ordering::SeqCst);
        Ok(shared)
    }

    /// Get a value from cache (L1 first, then L2)
    pub async fn get<T>(&self, key: &str) -> Result<T, CacheError>
    where
        T: for<'de> Deserialize<'de>,
    {
        // Try L1 cache first
        if let Some(bytes) = self.l1_cache.get(key).await {
            tracing::trace!("L1 cache hit: {}", key);
            return Ok(serde_json::from_slice(&bytes)?);
        }

        let Some(redis) = &self.redis else {
            tracing::trace!("Cache miss: {}", key);
            return Err(CacheError::CacheMiss(key.to_string()));
        };

        // Try L2 cache (Redis)
        let mut conn = redis.lock().await;
        let value: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut *conn)
            .await?;
        drop(conn);

        if let Some(json) = value {
            tracing::trace!("L2 cache hit: {}", key);

            // Populate L1 cache
            let bytes = json.as_bytes().to_vec();
            self.l1_cache.insert(key.to_string(), bytes).await;

            return Ok(serde_json::from_str(&json)?);
        }

        tracing::trace!("Cache miss: {}", key);
        Err(CacheError::CacheMiss(key.to_string()))
    }

    /// Set a value in cache (both tiers)
    pub async fn set<T>(&self, key: &str, value: &T) -> Result<(), CacheError>
    where
        T: Serialize,
    {
        let json = serde_json::to_string(value)?;

        // Set in L1 cache (uses configured TTL)
        let bytes = json.as_bytes().to_vec();
        self.l1_cache.insert(key.to_string(), bytes).await;

        if let Some(redis) = &self.redis {
            let mut conn = redis.lock().await;
            let _: () = redis::cmd("SETEX")
                .arg(key)
                .arg(self.ttl_secs)
                .arg(json)
                .query_async(&mut *conn)
                .await?;
        }

        tracing::trace!("Cache set: {}", key);
        Ok(())
    }

    /// Start a new generation and drop the entries of older ones
    ///
    /// Returns the new generation.
    pub async fn invalidate_all(&self) -> Result<u64, CacheError> {
        let next = match &self.redis {
            Some(redis) => {
                let mut conn = redis.lock().await;
                let next: u64 = redis::cmd("INCR")
                    .arg(GENERATION_KEY)
                    .query_async(&mut *conn)
                    .await?;

                // Old generations are unreachable already; this only frees memory
                let keys: Vec<String> = redis::cmd("KEYS")
                    .arg(CacheKey::RECOMMENDATIONS_PATTERN)
                    .query_async(&mut *conn)
                    .await?;

                if !keys.is_empty() {
                    let _: () = redis::cmd("DEL")
                        .arg(keys)
                        .query_async(&mut *conn)
                        .await?;
                }

                self.generation.store(next, Ordering::SeqCst);
                next
            }
            None => self.generation.fetch_add(1, Ordering::SeqCst) + 1,
        };

        self.l1_cache.invalidate_all();

        tracing::debug!("Cache generation advanced to {}", next);
        Ok(next)
    }

    /// Get cache statistics
    pub async fn stats(&self) -> CacheStats {
        self.l1_cache.run_pending_tasks().await;
        CacheStats {
            l1_size: self.l1_cache.entry_count(),
            redis_enabled: self.has_redis(),
            ttl_secs: self.ttl_secs,
            generation: self.generation.load(Ordering::SeqCst),
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub l1_size: u64,
    pub redis_enabled: bool,
    pub ttl_secs: u64,
    /// Last generation this instance observed
    pub generation: u64,
}

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    /// Pattern covering every ranked response
    pub const RECOMMENDATIONS_PATTERN: &'static str = "recs:*";

    /// Build a cache key for a ranked response
    pub fn recommendations(generation: u64, signature: &str) -> String {
        format!("recs:{}:{}", generation, signature)
    }

    /// Build a cache key for the trending list
    pub fn trending(generation: u64, limit: usize) -> String {
        format!("recs:{}:trending:{}", generation, limit)
    }
}
