use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::{ClientError, ClientResult};

/// Static configuration loaded once at startup
#[derive(Debug, Clone, Deserialize)]
pub struct StaticConfig {
    #[serde(default = "default_backend")]
    pub backend: BackendConfig,

    #[serde(default = "default_limits")]
    pub limits: LimitsConfig,
}

/// Backend endpoint configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Upload limits, enforced client-side before anything hits the wire
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size_bytes: u64,
}

impl StaticConfig {
    /// Load from an optional `config.*` file, overridden by `FOLIO`-prefixed
    /// environment variables (`FOLIO__BACKEND__BASE_URL`, ...)
    pub fn load() -> ClientResult<Self> {
        Config::builder()
            .add_source(File::with_name("config").required(false))
            .add_source(
                Environment::with_prefix("FOLIO")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|config| config.try_deserialize())
            .map_err(|e| ClientError::Config {
                message: e.to_string(),
            })
    }
}

fn default_backend() -> BackendConfig {
    BackendConfig {
        base_url: default_base_url(),
        request_timeout_secs: default_request_timeout_secs(),
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_limits() -> LimitsConfig {
    LimitsConfig {
        max_upload_size_bytes: default_max_upload_size(),
    }
}

fn default_max_upload_size() -> u64 {
    10 * 1024 * 1024
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_empty_config() {
        let config: StaticConfig = Config::builder()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.backend.base_url, "http://localhost:8000");
        assert_eq!(config.backend.request_timeout_secs, 60);
        assert_eq!(config.limits.max_upload_size_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn nested_defaults_fill_missing_fields() {
        let config: StaticConfig = Config::builder()
            .set_override("backend.base_url", "http://qa.internal:9000")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.backend.base_url, "http://qa.internal:9000");
        assert_eq!(config.backend.request_timeout_secs, 60);
    }
}
