//! API configuration.

/// Default upload limit: 10 GiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024 * 1024;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Max request body size, uploads included
    pub max_upload_bytes: usize,
    /// Environment (development/production)
    pub environment: String,
    /// Serve `/metrics`
    pub metrics_enabled: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            cors_origins: vec!["*".to_string()],
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            environment: "development".to_string(),
            metrics_enabled: true,
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3000),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(|_| vec!["*".to_string()]),
            max_upload_bytes: std::env::var("MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            metrics_enabled: std::env::var("METRICS_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear() {
        for var in [
            "API_HOST",
            "API_PORT",
            "CORS_ORIGINS",
            "MAX_UPLOAD_BYTES",
            "ENVIRONMENT",
            "METRICS_ENABLED",
        ] {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear();
        let config = ApiConfig::from_env();
        assert_eq!(config.port, 3000);
        assert_eq!(config.cors_origins, vec!["*"]);
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024 * 1024);
        assert!(config.metrics_enabled);
        assert!(!config.is_production());
    }

    #[test]
    #[serial]
    fn test_overrides() {
        clear();
        std::env::set_var("API_PORT", "8080");
        std::env::set_var("CORS_ORIGINS", "http://a.test, http://b.test");
        std::env::set_var("ENVIRONMENT", "Production");
        std::env::set_var("METRICS_ENABLED", "false");

        let config = ApiConfig::from_env();
        assert_eq!(config.port, 8080);
        assert_eq!(config.cors_origins, vec!["http://a.test", "http://b.test"]);
        assert!(config.is_production());
        assert!(!config.metrics_enabled);
        clear();
    }
}
