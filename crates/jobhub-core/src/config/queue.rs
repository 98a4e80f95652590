//! Dispatch queue configuration.

use serde::{Deserialize, Serialize};

/// Top-level queue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Queue provider: `"redis"` or `"memory"`.
    ///
    /// The in-memory provider only dispatches within a single process and is
    /// intended for development and tests.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Redis-specific queue configuration.
    #[serde(default)]
    pub redis: RedisQueueConfig,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            redis: RedisQueueConfig::default(),
        }
    }
}

/// Redis queue backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisQueueConfig {
    /// Redis connection URL.
    #[serde(default = "default_redis_url")]
    pub url: String,
    /// Key prefix for all JobHub queue keys.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl Default for RedisQueueConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            key_prefix: default_key_prefix(),
        }
    }
}

fn default_provider() -> String {
    "redis".to_string()
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_key_prefix() -> String {
    "jobhub:".to_string()
}
