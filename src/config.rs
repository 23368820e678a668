use std::env;

#[derive(Debug, Clone)]
pub enum Deployment {
    Local,
    Dev,
    Stage,
    Prod,
}

impl Deployment {
    #[must_use]
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Self::Dev,
            "stage" | "staging" => Self::Stage,
            "prod" | "production" => Self::Prod,
            _ => Self::Local,
        }
    }
}

/// Midpoint/slope pair for one logistic term of the leak score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SigmoidParams {
    pub midpoint: f64,
    pub slope: f64,
}

/// Every threshold the inference engine consults, frozen at construction.
/// Tests override individual fields; the running service builds one from
/// the environment and never mutates it afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Number of recent processed rows averaged by the smoother.
    pub smoothing_window: usize,
    /// Battery percentage below which a sensor raises `low_battery`.
    pub low_battery_threshold: f64,
    /// Flow increase from parent to child treated as an anomaly.
    pub anomaly_flow_drop: f64,
    /// Minimum leak probability that is persisted as an alert.
    pub leak_emission_floor: f64,
    /// Severity bands: [0, medium) -> low, [medium, high) -> medium.
    pub medium_severity_floor: f64,
    pub high_severity_floor: f64,
    /// Logistic terms of the pairwise leak score.
    pub flow_sigmoid: SigmoidParams,
    pub gap_sigmoid: SigmoidParams,
    pub battery_sigmoid: SigmoidParams,
    /// Blend weights; must sum to 1 for the score to stay inside (0, 100).
    pub flow_weight: f64,
    pub gap_weight: f64,
    pub battery_weight: f64,
    /// Fixed probabilities for the rule-based alert types.
    pub anomaly_probability: f64,
    pub low_battery_probability: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            smoothing_window: 5,
            low_battery_threshold: 20.0,
            anomaly_flow_drop: 0.5,
            leak_emission_floor: 50.0,
            medium_severity_floor: 50.0,
            high_severity_floor: 70.0,
            flow_sigmoid: SigmoidParams {
                midpoint: 50.0,
                slope: 0.1,
            },
            gap_sigmoid: SigmoidParams {
                midpoint: 5.0,
                slope: 0.5,
            },
            battery_sigmoid: SigmoidParams {
                midpoint: 30.0,
                slope: 0.2,
            },
            flow_weight: 0.4,
            gap_weight: 0.5,
            battery_weight: 0.1,
            anomaly_probability: 85.0,
            low_battery_probability: 90.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    // Database
    pub database_url: String,

    // API settings
    pub api_host: String,
    pub api_port: u16,

    // Rate limiting
    pub disable_rate_limiting: bool,
    pub rate_limit_metadata_per_second: u64,
    pub rate_limit_metadata_burst: u32,
    pub rate_limit_data_per_second: u64,
    pub rate_limit_data_burst: u32,

    // Topology caching
    pub topology_cache_ttl_seconds: u64,

    // Inference thresholds
    pub engine: EngineConfig,

    // Application metadata
    pub deployment: Deployment,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if required environment variables are not set.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let defaults = EngineConfig::default();

        Ok(Self {
            // Database
            database_url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::Missing("DATABASE_URL"))?,

            // API settings
            api_host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            api_port: env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .unwrap_or(3000),

            // Rate limiting
            disable_rate_limiting: env::var("DISABLE_RATE_LIMITING")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
            rate_limit_metadata_per_second: env::var("RATE_LIMIT_METADATA_PER_SECOND")
                .unwrap_or_else(|_| "1".to_string())
                .parse()
                .unwrap_or(1),
            rate_limit_metadata_burst: env::var("RATE_LIMIT_METADATA_BURST")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .unwrap_or(60),
            rate_limit_data_per_second: env::var("RATE_LIMIT_DATA_PER_SECOND")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
            rate_limit_data_burst: env::var("RATE_LIMIT_DATA_BURST")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .unwrap_or(60),

            // Topology caching
            topology_cache_ttl_seconds: env::var("TOPOLOGY_CACHE_TTL_SECONDS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .unwrap_or(300),

            // Inference thresholds; anything unset falls back to the
            // canonical defaults above
            engine: EngineConfig {
                smoothing_window: env::var("SMOOTHING_WINDOW")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.smoothing_window),
                low_battery_threshold: env::var("LOW_BATTERY_THRESHOLD")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.low_battery_threshold),
                anomaly_flow_drop: env::var("ANOMALY_FLOW_DROP")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.anomaly_flow_drop),
                leak_emission_floor: env::var("LEAK_EMISSION_FLOOR")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.leak_emission_floor),
                ..defaults
            },

            // Application metadata
            deployment: Deployment::from_str(
                &env::var("DEPLOYMENT").unwrap_or_else(|_| "local".to_string()),
            ),
        })
    }

    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
