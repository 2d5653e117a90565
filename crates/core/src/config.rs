use serde::Deserialize;

use crate::error::{ShelfwiseError, ShelfwiseResult};

/// Root application configuration. Loaded from environment variables
/// with the prefix `SHELFWISE__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub recommendations: RecommendationConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// Tunables for the recommendation engine itself.
#[derive(Debug, Clone, Deserialize)]
pub struct RecommendationConfig {
    /// Maximum live recommendations per user.
    #[serde(default = "default_max_live")]
    pub max_live: usize,
    /// Live recommendations expire after this many days.
    #[serde(default = "default_live_ttl_days")]
    pub live_ttl_days: i64,
    /// Rejected recommendations are suppressed for this many weeks.
    #[serde(default = "default_bad_rec_ttl_weeks")]
    pub bad_rec_ttl_weeks: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Interval between full refresh passes, in seconds.
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
}

fn default_max_live() -> usize {
    15
}
fn default_live_ttl_days() -> i64 {
    2
}
fn default_bad_rec_ttl_weeks() -> i64 {
    10
}
fn default_refresh_interval_secs() -> u64 {
    86_400
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            max_live: default_max_live(),
            live_ttl_days: default_live_ttl_days(),
            bad_rec_ttl_weeks: default_bad_rec_ttl_weeks(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval_secs(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            recommendations: RecommendationConfig::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> ShelfwiseResult<Self> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("SHELFWISE")
                .separator("__")
                .try_parsing(true),
        );

        builder
            .build()
            .and_then(|config| config.try_deserialize())
            .map_err(|error| ShelfwiseError::Config(error.to_string()))
    }
}
