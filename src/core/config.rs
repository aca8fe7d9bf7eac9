//! Configuration management for the Redis delivery sink
//!
//! This module handles loading configuration from environment variables.
//! It provides a centralized way to manage all sink settings
//! with proper validation and default values.

use super::record::OutputConfig;
use super::{SinkError, SinkResult};
use crate::transport::RedisTransportConfig;
use std::env;
use std::fmt;
use tracing::{info, warn};

/// Where delivered payloads go
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeliveryTarget {
    /// LPUSH onto a list
    List { key: String },
    /// PUBLISH on a channel
    Channel { channel: String },
}

impl DeliveryTarget {
    /// Resolves a mode string into a target.
    ///
    /// `lpush` and `list` select the list; `pubsub` and every unrecognized
    /// value select the channel.
    pub fn from_mode(mode: &str, list_key: String, channel: String) -> Self {
        match mode.trim().to_lowercase().as_str() {
            "lpush" | "list" => DeliveryTarget::List { key: list_key },
            "pubsub" => DeliveryTarget::Channel { channel },
            other => {
                warn!("Unknown REDIS_TYPE '{}', falling back to pubsub", other);
                DeliveryTarget::Channel { channel }
            }
        }
    }

    /// List key or channel name
    pub fn identifier(&self) -> &str {
        match self {
            DeliveryTarget::List { key } => key,
            DeliveryTarget::Channel { channel } => channel,
        }
    }
}

impl fmt::Display for DeliveryTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryTarget::List { key } => write!(f, "queue:{}", key),
            DeliveryTarget::Channel { channel } => write!(f, "channel:{}", channel),
        }
    }
}

/// Configuration for the sink with validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkConfig {
    pub redis: RedisTransportConfig,
    pub target: DeliveryTarget,
    pub ignore_producer_error: bool,
    pub output: OutputConfig,
}

impl SinkConfig {
    /// Load configuration from environment variables
    ///
    /// # Environment Variables
    ///
    /// Connection (with defaults):
    /// - `REDIS_HOST`: server host (default: "localhost")
    /// - `REDIS_PORT`: server port (default: 6379)
    /// - `REDIS_AUTH`: AUTH secret (optional)
    /// - `REDIS_DATABASE`: database index, selected only when > 0 (default: 0)
    ///
    /// Delivery:
    /// - `REDIS_TYPE`: "pubsub", "lpush" or "list" (default: "pubsub")
    /// - `REDIS_PUB_CHANNEL`: channel for pubsub mode (default: "maxwell")
    /// - `REDIS_LIST_KEY`: list key for list mode (default: "maxwell")
    /// - `IGNORE_PRODUCER_ERROR`: keep going after failed deliveries (default: false)
    ///
    /// Output:
    /// - `OUTPUT_DDL` (default: false)
    /// - `OUTPUT_COMMIT_INFO` (default: true)
    /// - `OUTPUT_BINLOG_POSITION` (default: false)
    /// - `OUTPUT_NULLS` (default: true)
    pub fn from_env() -> SinkResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> SinkResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("REDIS_HOST").unwrap_or_else(|| "localhost".to_string());

        let port = match lookup("REDIS_PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| {
                SinkError::config(format!("REDIS_PORT must be a port number, got '{}'", raw))
            })?,
            None => 6379,
        };

        // An empty secret is the same as no secret
        let auth = lookup("REDIS_AUTH").filter(|secret| !secret.is_empty());

        let database = match lookup("REDIS_DATABASE") {
            Some(raw) => raw.trim().parse::<i64>().map_err(|_| {
                SinkError::config(format!("REDIS_DATABASE must be an integer, got '{}'", raw))
            })?,
            None => 0,
        };

        let mode = lookup("REDIS_TYPE").unwrap_or_else(|| "pubsub".to_string());
        let channel = lookup("REDIS_PUB_CHANNEL").unwrap_or_else(|| "maxwell".to_string());
        let list_key = lookup("REDIS_LIST_KEY").unwrap_or_else(|| "maxwell".to_string());

        let output = OutputConfig {
            output_ddl: parse_flag(&lookup, "OUTPUT_DDL", false)?,
            include_commit_info: parse_flag(&lookup, "OUTPUT_COMMIT_INFO", true)?,
            include_binlog_position: parse_flag(&lookup, "OUTPUT_BINLOG_POSITION", false)?,
            include_nulls: parse_flag(&lookup, "OUTPUT_NULLS", true)?,
        };

        Self::validate_and_create(
            RedisTransportConfig {
                host,
                port,
                auth,
                database,
            },
            DeliveryTarget::from_mode(&mode, list_key, channel),
            parse_flag(&lookup, "IGNORE_PRODUCER_ERROR", false)?,
            output,
        )
    }

    /// Validate configuration parameters and create SinkConfig
    pub fn validate_and_create(
        redis: RedisTransportConfig,
        target: DeliveryTarget,
        ignore_producer_error: bool,
        output: OutputConfig,
    ) -> SinkResult<Self> {
        if redis.host.trim().is_empty() {
            return Err(SinkError::config("REDIS_HOST cannot be empty"));
        }

        if redis.port == 0 {
            return Err(SinkError::config("REDIS_PORT cannot be 0"));
        }

        if redis.database < 0 {
            return Err(SinkError::config("REDIS_DATABASE cannot be negative"));
        }

        match &target {
            DeliveryTarget::List { key } if key.trim().is_empty() => {
                return Err(SinkError::config(
                    "REDIS_LIST_KEY cannot be empty when using list delivery",
                ));
            }
            DeliveryTarget::Channel { channel } if channel.trim().is_empty() => {
                return Err(SinkError::config(
                    "REDIS_PUB_CHANNEL cannot be empty when using pubsub delivery",
                ));
            }
            _ => {}
        }

        info!(
            "Sink configured for {}:{} -> {} (ignore producer errors: {})",
            redis.host, redis.port, target, ignore_producer_error
        );

        Ok(Self {
            redis,
            target,
            ignore_producer_error,
            output,
        })
    }
}

fn parse_flag<F>(lookup: &F, name: &str, default: bool) -> SinkResult<bool>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(name) else {
        return Ok(default);
    };

    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(SinkError::config(format!(
            "{} must be true or false, got '{}'",
            name, raw
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> SinkResult<SinkConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SinkConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_config_defaults() {
        let config = load(&[]).unwrap();

        assert_eq!(config.redis, RedisTransportConfig::default());
        assert_eq!(
            config.target,
            DeliveryTarget::Channel {
                channel: "maxwell".to_string()
            }
        );
        assert!(!config.ignore_producer_error);
        assert_eq!(config.output, OutputConfig::default());
    }

    #[test]
    fn test_config_list_mode() {
        for mode in ["lpush", "list", "LIST"] {
            let config = load(&[("REDIS_TYPE", mode), ("REDIS_LIST_KEY", "q1")]).unwrap();
            assert_eq!(
                config.target,
                DeliveryTarget::List {
                    key: "q1".to_string()
                }
            );
        }
    }

    #[test]
    fn test_config_unknown_mode_falls_back_to_pubsub() {
        let config = load(&[("REDIS_TYPE", "xadd"), ("REDIS_PUB_CHANNEL", "c1")]).unwrap();
        assert_eq!(
            config.target,
            DeliveryTarget::Channel {
                channel: "c1".to_string()
            }
        );
    }

    #[test]
    fn test_config_connection_settings() {
        let config = load(&[
            ("REDIS_HOST", "cache.internal"),
            ("REDIS_PORT", "6380"),
            ("REDIS_AUTH", "s3cret"),
            ("REDIS_DATABASE", "2"),
            ("IGNORE_PRODUCER_ERROR", "yes"),
        ])
        .unwrap();

        assert_eq!(config.redis.host, "cache.internal");
        assert_eq!(config.redis.port, 6380);
        assert_eq!(config.redis.auth.as_deref(), Some("s3cret"));
        assert_eq!(config.redis.database, 2);
        assert!(config.ignore_producer_error);
    }

    #[test]
    fn test_config_empty_auth_is_ignored() {
        let config = load(&[("REDIS_AUTH", "")]).unwrap();
        assert_eq!(config.redis.auth, None);
    }

    #[test]
    fn test_config_rejects_bad_values() {
        let err = load(&[("REDIS_PORT", "redis")]).unwrap_err();
        assert!(err.to_string().contains("REDIS_PORT"));

        let err = load(&[("REDIS_PORT", "0")]).unwrap_err();
        assert!(err.to_string().contains("REDIS_PORT"));

        let err = load(&[("REDIS_DATABASE", "-1")]).unwrap_err();
        assert!(err.to_string().contains("REDIS_DATABASE"));

        let err = load(&[("IGNORE_PRODUCER_ERROR", "maybe")]).unwrap_err();
        assert!(err.to_string().contains("IGNORE_PRODUCER_ERROR"));
    }

    #[test]
    fn test_config_requires_identifier_for_active_mode() {
        let err = load(&[("REDIS_TYPE", "lpush"), ("REDIS_LIST_KEY", " ")]).unwrap_err();
        assert!(err.to_string().contains("REDIS_LIST_KEY"));

        // The inactive identifier is not checked
        assert!(load(&[("REDIS_TYPE", "lpush"), ("REDIS_PUB_CHANNEL", "")]).is_ok());
    }

    #[test]
    fn test_config_output_flags() {
        let config = load(&[
            ("OUTPUT_DDL", "true"),
            ("OUTPUT_COMMIT_INFO", "false"),
            ("OUTPUT_BINLOG_POSITION", "1"),
            ("OUTPUT_NULLS", "no"),
        ])
        .unwrap();

        assert!(config.output.output_ddl);
        assert!(!config.output.include_commit_info);
        assert!(config.output.include_binlog_position);
        assert!(!config.output.include_nulls);
    }

    #[test]
    fn test_target_display() {
        let list = DeliveryTarget::List {
            key: "q1".to_string(),
        };
        let channel = DeliveryTarget::Channel {
            channel: "c1".to_string(),
        };
        assert_eq!(list.to_string(), "queue:q1");
        assert_eq!(channel.to_string(), "channel:c1");
        assert_eq!(list.identifier(), "q1");
        assert_eq!(channel.identifier(), "c1");
    }
}
