use chrono::{FixedOffset, Offset, Utc};
use rust_decimal::Decimal;
use std::env;
use std::time::Duration;

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
    pub test_before_acquire: bool,
}

/// Slip verification service settings. Verification is disabled when `url` is unset.
#[derive(Debug, Clone, Default)]
pub struct SlipVerifyConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

/// Blob storage settings for payment slips and refund evidence
#[derive(Debug, Clone, Default)]
pub struct StorageConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
}

/// Monthly settlement settings
#[derive(Debug, Clone)]
pub struct SettlementConfig {
    pub utc_offset_hours: i32,
    pub schedule_enabled: bool,
    pub platform_fee_percent: Decimal,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub slip_verify: SlipVerifyConfig,
    pub storage: StorageConfig,
    pub settlement: SettlementConfig,
    pub log_level: String,
    pub http_port: u16,
    pub environment: String,
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.parse::<T>().ok())
}

impl DatabaseConfig {
    /// Create database config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let url = env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL environment variable is required")?;

        let max_connections = parse_env::<u32>("DATABASE_MAX_CONNECTIONS").unwrap_or(10);
        let acquire_timeout_secs = parse_env::<u64>("DATABASE_ACQUIRE_TIMEOUT_SECS").unwrap_or(30);
        let idle_timeout_secs = parse_env::<u64>("DATABASE_IDLE_TIMEOUT_SECS").unwrap_or(600); // 10 minutes
        let max_lifetime_secs = parse_env::<u64>("DATABASE_MAX_LIFETIME_SECS").unwrap_or(1800); // 30 minutes
        let test_before_acquire = parse_env::<bool>("DATABASE_TEST_BEFORE_ACQUIRE").unwrap_or(true);

        if max_connections == 0 {
            return Err("DATABASE_MAX_CONNECTIONS must be greater than 0".to_string());
        }

        if acquire_timeout_secs == 0 {
            return Err("DATABASE_ACQUIRE_TIMEOUT_SECS must be greater than 0".to_string());
        }

        Ok(Self {
            url,
            max_connections,
            acquire_timeout_secs,
            idle_timeout_secs,
            max_lifetime_secs,
            test_before_acquire,
        })
    }

    /// Get acquire timeout as Duration
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    /// Get idle timeout as Duration
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Get max lifetime as Duration
    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/courtside".to_string(),
            max_connections: 10,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
            test_before_acquire: true,
        }
    }
}

impl SlipVerifyConfig {
    pub fn from_env() -> Self {
        Self {
            url: env::var("SLIP_VERIFY_URL").ok().filter(|s| !s.is_empty()),
            api_key: env::var("SLIP_VERIFY_API_KEY").ok().filter(|s| !s.is_empty()),
            timeout_secs: parse_env::<u64>("SLIP_VERIFY_TIMEOUT_SECS").unwrap_or(10),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl StorageConfig {
    pub fn from_env() -> Self {
        Self {
            url: env::var("STORAGE_URL").ok().filter(|s| !s.is_empty()),
            api_key: env::var("STORAGE_API_KEY").ok().filter(|s| !s.is_empty()),
        }
    }
}

impl SettlementConfig {
    pub fn from_env() -> Result<Self, String> {
        let utc_offset_hours = parse_env::<i32>("SETTLEMENT_UTC_OFFSET_HOURS").unwrap_or(7);
        if !(-12..=14).contains(&utc_offset_hours) {
            return Err(format!(
                "Invalid SETTLEMENT_UTC_OFFSET_HOURS: {}. Must be between -12 and 14",
                utc_offset_hours
            ));
        }

        let schedule_enabled = parse_env::<bool>("SETTLEMENT_SCHEDULE_ENABLED").unwrap_or(true);

        let platform_fee_percent =
            parse_env::<Decimal>("PLATFORM_FEE_PERCENT").unwrap_or(Decimal::new(10, 0));
        if platform_fee_percent < Decimal::ZERO || platform_fee_percent > Decimal::ONE_HUNDRED {
            return Err(format!(
                "Invalid PLATFORM_FEE_PERCENT: {}. Must be between 0 and 100",
                platform_fee_percent
            ));
        }

        Ok(Self {
            utc_offset_hours,
            schedule_enabled,
            platform_fee_percent,
        })
    }

    /// Fixed wall-clock offset the monthly cut-off is computed in
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_hours * 3600)
            .unwrap_or_else(|| Utc.fix())
    }
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: 7,
            schedule_enabled: true,
            platform_fee_percent: Decimal::new(10, 0),
        }
    }
}

impl AppConfig {
    /// Create application config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let database = DatabaseConfig::from_env()?;
        let slip_verify = SlipVerifyConfig::from_env();
        let storage = StorageConfig::from_env();
        let settlement = SettlementConfig::from_env()?;

        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let http_port = parse_env::<u16>("HTTP_PORT").unwrap_or(8080);

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        // Validate log level
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&log_level.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid LOG_LEVEL: {}. Must be one of: {:?}",
                log_level, valid_log_levels
            ));
        }

        // Validate environment
        let valid_environments = ["development", "staging", "production"];
        if !valid_environments.contains(&environment.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid ENVIRONMENT: {}. Must be one of: {:?}",
                environment, valid_environments
            ));
        }

        let config = Self {
            database,
            slip_verify,
            storage,
            settlement,
            log_level: log_level.to_lowercase(),
            http_port,
            environment: environment.to_lowercase(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Cross-field checks that depend on the environment
    pub fn validate(&self) -> Result<(), String> {
        if self.is_production() {
            if self.slip_verify.url.is_none() {
                return Err("SLIP_VERIFY_URL is required in production".to_string());
            }
            if self.storage.url.is_none() {
                return Err("STORAGE_URL is required in production".to_string());
            }
        }
        Ok(())
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            slip_verify: SlipVerifyConfig {
                timeout_secs: 10,
                ..SlipVerifyConfig::default()
            },
            storage: StorageConfig::default(),
            settlement: SettlementConfig::default(),
            log_level: "info".to_string(),
            http_port: 8080,
            environment: "development".to_string(),
        }
    }
}
