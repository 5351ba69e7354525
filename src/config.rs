//! # Configuration Module
//!
//! Environment-driven configuration, loaded once at startup via `.env`
//! (development) or real environment variables (deployment). Each section
//! validates itself and reports misconfiguration as [`AppError::Config`]
//! before any collaborator is constructed.

use std::env;
use std::str::FromStr;

use tracing::warn;

use crate::errors::{AppError, AppResult};

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(key = %key, value = %raw, "Ignoring unparseable environment value");
                default
            }
        },
        Err(_) => default,
    }
}

/// Postgres connection settings
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 5,
            connect_timeout_secs: 10,
        }
    }
}

impl DatabaseConfig {
    pub fn from_env() -> Self {
        Self {
            url: env::var("DATABASE_URL").unwrap_or_default(),
            max_connections: env_or("DATABASE_MAX_CONNECTIONS", 5),
            connect_timeout_secs: env_or("DATABASE_CONNECT_TIMEOUT_SECS", 10),
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.url.is_empty() {
            return Err(AppError::Config("DATABASE_URL is not set".to_string()));
        }
        if self.max_connections == 0 {
            return Err(AppError::Config(
                "DATABASE_MAX_CONNECTIONS must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// OCR collaborator settings
#[derive(Debug, Clone)]
pub struct OcrServiceConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub retry_once: bool,
}

impl Default for OcrServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9800".to_string(),
            timeout_secs: 30,
            retry_once: true,
        }
    }
}

impl OcrServiceConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: env::var("OCR_BASE_URL").unwrap_or(defaults.base_url),
            timeout_secs: env_or("OCR_TIMEOUT_SECS", defaults.timeout_secs),
            retry_once: env_or("OCR_RETRY_ONCE", defaults.retry_once),
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.base_url.is_empty() {
            return Err(AppError::Config("OCR_BASE_URL is not set".to_string()));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(AppError::Config(format!(
                "OCR_BASE_URL must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(AppError::Config(
                "OCR_TIMEOUT_SECS must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Feasibility scorer settings
#[derive(Debug, Clone)]
pub struct ScorerConfig {
    pub endpoint: String,
    pub api_key: String,
    pub timeout_secs: u64,
    pub retry_once: bool,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            timeout_secs: 60,
            retry_once: true,
        }
    }
}

impl ScorerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            endpoint: env::var("SCORER_ENDPOINT").unwrap_or_default(),
            api_key: env::var("SCORER_API_KEY").unwrap_or_default(),
            timeout_secs: env_or("SCORER_TIMEOUT_SECS", defaults.timeout_secs),
            retry_once: env_or("SCORER_RETRY_ONCE", defaults.retry_once),
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.endpoint.is_empty() {
            return Err(AppError::Config("SCORER_ENDPOINT is not set".to_string()));
        }
        if self.api_key.is_empty() {
            return Err(AppError::Config("SCORER_API_KEY is not set".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(AppError::Config(
                "SCORER_TIMEOUT_SECS must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Analysis pipeline settings
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Upper bound on analyses in flight at once
    pub max_concurrent_analyses: usize,
    /// Outer deadline applied to each external call
    pub external_call_timeout_secs: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_concurrent_analyses: 4,
            external_call_timeout_secs: 90,
        }
    }
}

impl AnalysisConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_concurrent_analyses: env_or(
                "ANALYSIS_MAX_CONCURRENT",
                defaults.max_concurrent_analyses,
            ),
            external_call_timeout_secs: env_or(
                "ANALYSIS_EXTERNAL_TIMEOUT_SECS",
                defaults.external_call_timeout_secs,
            ),
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.max_concurrent_analyses == 0 {
            return Err(AppError::Config(
                "ANALYSIS_MAX_CONCURRENT must be at least 1".to_string(),
            ));
        }
        if self.external_call_timeout_secs == 0 {
            return Err(AppError::Config(
                "ANALYSIS_EXTERNAL_TIMEOUT_SECS must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Top-level application configuration
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub ocr: OcrServiceConfig,
    pub scorer: ScorerConfig,
    pub analysis: AnalysisConfig,
}

impl AppConfig {
    /// Load configuration from the environment, reading `.env` first if
    /// present
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();
        let config = Self {
            database: DatabaseConfig::from_env(),
            ocr: OcrServiceConfig::from_env(),
            scorer: ScorerConfig::from_env(),
            analysis: AnalysisConfig::from_env(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        self.database.validate()?;
        self.ocr.validate()?;
        self.scorer.validate()?;
        self.analysis.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_config_requires_url() {
        let config = DatabaseConfig::default();
        assert!(matches!(config.validate(), Err(AppError::Config(_))));

        let config = DatabaseConfig {
            url: "postgres://localhost/pantry".to_string(),
            ..DatabaseConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_ocr_config_rejects_non_http_url() {
        let config = OcrServiceConfig {
            base_url: "ftp://example.com".to_string(),
            ..OcrServiceConfig::default()
        };
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_scorer_config_requires_credentials() {
        let config = ScorerConfig {
            endpoint: "https://scorer.example.com/v1/score".to_string(),
            ..ScorerConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("SCORER_API_KEY"));
    }

    #[test]
    fn test_analysis_config_rejects_zero_concurrency() {
        let config = AnalysisConfig {
            max_concurrent_analyses: 0,
            ..AnalysisConfig::default()
        };
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }
}
