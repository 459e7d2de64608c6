use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

use crate::models::{QueryLimits, ScoringWeights, UnratedPolicy};

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub ranking: RankingSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }

/// Which collaborator serves the listing catalog
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Memory,
    Postgres,
    CatalogApi,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreSettings {
    #[serde(default)]
    pub backend: StoreBackend,
    /// JSON catalog for the in-memory backend
    pub seed_path: Option<String>,
    pub database_url: Option<String>,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
    pub catalog_url: Option<String>,
    pub catalog_api_key: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheSettings {
    #[serde(default)]
    pub enabled: bool,
    pub redis_url: Option<String>,
    pub ttl_secs: Option<u64>,
    pub l1_cache_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RankingSettings {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
    #[serde(default)]
    pub unrated_listings: UnratedPolicy,
}

impl Default for RankingSettings {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            unrated_listings: UnratedPolicy::default(),
        }
    }
}

impl RankingSettings {
    pub fn limits(&self) -> QueryLimits {
        QueryLimits {
            default_limit: self.default_limit,
            max_limit: self.max_limit,
        }
    }
}

fn default_limit() -> usize { 10 }
fn default_max_limit() -> usize { 100 }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoringSettings {
    #[serde(default)]
    pub weights: WeightsConfig,
}

/// Maximum points per sub-score
#[derive(Debug, Clone, Deserialize)]
pub struct WeightsConfig {
    #[serde(default = "default_budget_weight")]
    pub budget: f64,
    #[serde(default = "default_rating_weight")]
    pub rating: f64,
    #[serde(default = "default_amenities_weight")]
    pub amenities: f64,
    #[serde(default = "default_availability_weight")]
    pub availability: f64,
    #[serde(default = "default_capacity_weight")]
    pub capacity: f64,
    #[serde(default = "default_unbudgeted_points")]
    pub unbudgeted: f64,
    #[serde(default = "default_per_amenity_points")]
    pub per_amenity: f64,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            budget: default_budget_weight(),
            rating: default_rating_weight(),
            amenities: default_amenities_weight(),
            availability: default_availability_weight(),
            capacity: default_capacity_weight(),
            unbudgeted: default_unbudgeted_points(),
            per_amenity: default_per_amenity_points(),
        }
    }
}

fn default_budget_weight() -> f64 { 25.0 }
fn default_rating_weight() -> f64 { 30.0 }
fn default_amenities_weight() -> f64 { 25.0 }
fn default_availability_weight() -> f64 { 15.0 }
fn default_capacity_weight() -> f64 { 5.0 }
fn default_unbudgeted_points() -> f64 { 20.0 }
fn default_per_amenity_points() -> f64 { 2.0 }

impl WeightsConfig {
    /// The five maxima must be non-negative and add up to 100
    pub fn validate(&self) -> Result<(), ConfigError> {
        let weights = ScoringWeights::from(self);
        let parts = [
            weights.budget,
            weights.rating,
            weights.amenities,
            weights.availability,
            weights.capacity,
            weights.unbudgeted,
            weights.per_amenity,
        ];

        if parts.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ConfigError::Message(
                "scoring weights must be non-negative numbers".to_string(),
            ));
        }

        let total = weights.max_total();
        if (total - 100.0).abs() > 1e-6 {
            return Err(ConfigError::Message(format!(
                "scoring weights must sum to 100, got {}",
                total
            )));
        }

        Ok(())
    }
}

impl From<&WeightsConfig> for ScoringWeights {
    fn from(config: &WeightsConfig) -> Self {
        Self {
            budget: config.budget,
            rating: config.rating,
            amenities: config.amenities,
            availability: config.availability,
            capacity: config.capacity,
            unbudgeted: config.unbudgeted,
            per_amenity: config.per_amenity,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

fn environment() -> Environment {
    // e.g., RANKER__SERVER__PORT -> server.port
    Environment::with_prefix("RANKER")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with RANKER__)
    /// 5. DATABASE_URL, if set
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(environment())
            .build()?;

        let settings = apply_database_url(settings, std::env::var("DATABASE_URL").ok())?;

        Self::finish(settings)
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(environment())
            .build()?;

        Self::finish(settings)
    }

    fn finish(settings: Config) -> Result<Self, ConfigError> {
        let settings: Settings = settings.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scoring.weights.validate()?;

        if self.ranking.default_limit == 0 || self.ranking.max_limit == 0 {
            return Err(ConfigError::Message(
                "ranking limits must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// The conventional DATABASE_URL wins over the layered store URL
fn apply_database_url(settings: Config, database_url: Option<String>) -> Result<Config, ConfigError> {
    match database_url {
        Some(url) => Config::builder()
            .add_source(settings)
            .set_override("store.database_url", url)?
            .build(),
        None => Ok(settings),
    }
}
