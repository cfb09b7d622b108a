use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

/// Application configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub window: WindowConfig,
    pub anonymization: AnonymizationConfig,
    pub export: ExportConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub bucket_count: usize,
    pub months_before: u32,
    pub months_per_bucket: u32,
    pub past_months_retained: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnonymizationConfig {
    pub token_length: usize,
    pub language: String,
    pub excluded_columns: Vec<String>,
    pub record_id_length: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub output_directory: Option<String>,
    pub preview_rows: usize,
    pub preview_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: Option<String>,
    pub format: String, // "json" or "text"
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            bucket_count: 8,
            months_before: 3,
            months_per_bucket: 1,
            past_months_retained: 1,
        }
    }
}

impl Default for AnonymizationConfig {
    fn default() -> Self {
        Self {
            token_length: 12,
            language: "en".to_string(),
            excluded_columns: vec![
                "MessageType".to_string(),
                "Date".to_string(),
                "Time".to_string(),
                "USC_Date".to_string(),
            ],
            record_id_length: 4,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_directory: None,
            preview_rows: 5,
            preview_chars: 20,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_path: None,
            format: "text".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources with precedence
    pub fn load() -> Result<Self> {
        let config = Config::builder()
            // Config files are optional; defaults cover everything
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(File::with_name("config").required(false))
            // Environment variables override files
            .add_source(Environment::with_prefix("TXT_STUDY").separator("__"))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

        let app_config: AppConfig = config
            .try_deserialize()
            .map_err(|e| anyhow::anyhow!("Failed to deserialize configuration: {}", e))?;

        // Validate configuration
        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        // Validate window config
        if self.window.bucket_count == 0 {
            return Err(anyhow::anyhow!("bucket_count must be greater than 0"));
        }
        if self.window.months_per_bucket == 0 {
            return Err(anyhow::anyhow!("months_per_bucket must be greater than 0"));
        }
        if self.window.bucket_count <= self.window.months_before as usize {
            return Err(anyhow::anyhow!(
                "bucket_count ({}) must exceed months_before ({}) so the reference month gets a bucket",
                self.window.bucket_count,
                self.window.months_before
            ));
        }

        // Validate anonymization config
        if self.anonymization.token_length == 0 || self.anonymization.token_length > 64 {
            return Err(anyhow::anyhow!("token_length must be between 1 and 64"));
        }
        if self.anonymization.language.is_empty() {
            return Err(anyhow::anyhow!("language must not be empty"));
        }
        if self.anonymization.record_id_length == 0 {
            return Err(anyhow::anyhow!("record_id_length must be greater than 0"));
        }

        // Validate export config
        if self.export.preview_rows == 0 {
            return Err(anyhow::anyhow!("preview_rows must be greater than 0"));
        }

        // Validate logging config
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            ));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log format: {}. Must be one of: {:?}",
                self.logging.format,
                valid_formats
            ));
        }

        Ok(())
    }

    /// Get log level from environment or config
    pub fn get_log_level(&self) -> String {
        std::env::var("RUST_LOG").unwrap_or_else(|_| self.logging.level.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.window.bucket_count, 8);
        assert_eq!(config.window.months_before, 3);
        assert_eq!(config.anonymization.token_length, 12);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_config_validation() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_bucket_count() {
        let mut config = AppConfig::default();
        config.window.bucket_count = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bucket_count_must_cover_reference_month() {
        let mut config = AppConfig::default();
        config.window.bucket_count = 3;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_token_length() {
        let mut config = AppConfig::default();
        config.anonymization.token_length = 0;
        assert!(config.validate().is_err());
    }
}
