//! Environment-driven node configuration.

use std::time::Duration;

/// Settings for the narrative ranking service.
#[derive(Debug, Clone)]
pub struct RankerConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    /// Bound on the whole ranking exchange; the orchestrator degrades to a
    /// canned analysis when it elapses.
    pub timeout: Duration,
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            api_key: String::new(),
            model: "gemini-2.5-flash".to_string(),
            timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Seed the demo catalog at startup.
    pub seed_demo_data: bool,
    pub ranker: RankerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5000,
            seed_demo_data: true,
            ranker: RankerConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let ranker_defaults = defaults.ranker;
        Self {
            port: env_parse("MARKETPLACE_PORT").unwrap_or(defaults.port),
            seed_demo_data: env_parse("MARKETPLACE_SEED").unwrap_or(defaults.seed_demo_data),
            ranker: RankerConfig {
                base_url: std::env::var("AI_INTEGRATIONS_GEMINI_BASE_URL")
                    .unwrap_or(ranker_defaults.base_url),
                api_key: std::env::var("AI_INTEGRATIONS_GEMINI_API_KEY")
                    .unwrap_or(ranker_defaults.api_key),
                model: std::env::var("GEMINI_MODEL").unwrap_or(ranker_defaults.model),
                timeout: env_parse("RANKER_TIMEOUT_SECS")
                    .map(Duration::from_secs)
                    .unwrap_or(ranker_defaults.timeout),
            },
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
