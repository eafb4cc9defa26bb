//! Process configuration, loaded once at startup from the environment
//! (spec §6 "Configuration inputs").

use crate::error::{CmdbError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// Bolt-style URL for the graph store, e.g. `bolt://localhost:7687`.
    pub graph_uri: String,
    pub graph_user: String,
    pub graph_password: String,

    /// Redis-compatible URL backing the job queue broker.
    pub queue_url: String,

    /// HTTP listen port for the REST + progress-channel surface.
    pub port: u16,

    /// Conditional evaluator wake interval (spec §4.5.2 default 30000).
    pub evaluator_interval_ms: u64,

    /// Rate-limit window, seconds (spec §4.7 default 15 minutes).
    pub rate_limit_window_secs: u64,

    /// Progress record TTL, seconds (spec §3 default 1 hour).
    pub progress_ttl_secs: u64,
}

impl Config {
    /// Load configuration from the environment, falling back to the same
    /// defaults the teacher's `ApiConfig::default()` used for its own
    /// listen settings.
    pub fn from_env() -> Result<Self> {
        let port = env_or("PORT", "8080")
            .parse::<u16>()
            .map_err(|e| CmdbError::ValidationFailure(format!("invalid PORT: {e}")))?;

        let graph_uri = env_or("GRAPH_URI", "bolt://localhost:7687");
        if !graph_uri.starts_with("bolt://") && !graph_uri.starts_with("bolt+s://") {
            return Err(CmdbError::ValidationFailure(format!(
                "GRAPH_URI must be a bolt:// URL, got {graph_uri}"
            )));
        }

        Ok(Self {
            graph_uri,
            graph_user: env_or("GRAPH_USER", "neo4j"),
            graph_password: env_or("GRAPH_PASSWORD", "neo4j"),
            queue_url: env_or("QUEUE_URL", "redis://localhost:6379"),
            port,
            evaluator_interval_ms: env_or("EVALUATOR_INTERVAL_MS", "30000")
                .parse()
                .unwrap_or(30_000),
            rate_limit_window_secs: env_or("RATE_LIMIT_WINDOW_SECS", "900")
                .parse()
                .unwrap_or(900),
            progress_ttl_secs: env_or("PROGRESS_TTL_SECS", "3600")
                .parse()
                .unwrap_or(3600),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_bolt_uri() {
        std::env::set_var("GRAPH_URI", "http://localhost:7474");
        let result = Config::from_env();
        std::env::remove_var("GRAPH_URI");
        assert!(result.is_err());
    }

    #[test]
    fn defaults_apply_when_unset() {
        std::env::remove_var("PORT");
        std::env::remove_var("GRAPH_URI");
        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.graph_uri, "bolt://localhost:7687");
    }
}
