use crate::domains::attendance::qr::DEFAULT_QR_GENERATOR_URL;
use crate::errors::{ServiceError, ServiceResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CHECKIN_BASE_URL: &str = "http://localhost:3000";

/// Runtime configuration, read from the environment or passed as JSON by the host app
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the program REST API; required unless demo data is enabled
    pub api_base_url: Option<String>,
    pub api_token: Option<String>,
    /// Origin the kiosk check-in page is served from
    pub checkin_base_url: String,
    pub qr_generator_url: String,
    pub request_timeout_secs: u64,
    /// Serve the built-in sample roster instead of calling the API
    pub use_demo_data: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            api_token: None,
            checkin_base_url: DEFAULT_CHECKIN_BASE_URL.to_string(),
            qr_generator_url: DEFAULT_QR_GENERATOR_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            use_demo_data: false,
        }
    }
}

impl AppConfig {
    /// Load from process environment, reading a `.env` file first if present
    pub fn from_env() -> ServiceResult<Self> {
        if let Ok(path) = dotenv::dotenv() {
            log::debug!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> ServiceResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let request_timeout_secs = match get("ROSTER_REQUEST_TIMEOUT_SECS") {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                ServiceError::Configuration(format!("ROSTER_REQUEST_TIMEOUT_SECS must be a whole number, got '{}'", raw))
            })?,
            None => defaults.request_timeout_secs,
        };

        let use_demo_data = match get("ROSTER_USE_DEMO_DATA").map(|v| v.to_ascii_lowercase()) {
            None => false,
            Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => true,
            Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => false,
            Some(v) => {
                return Err(ServiceError::Configuration(format!("ROSTER_USE_DEMO_DATA must be true or false, got '{}'", v)))
            }
        };

        let config = Self {
            api_base_url: get("ROSTER_API_BASE_URL"),
            api_token: get("ROSTER_API_TOKEN"),
            checkin_base_url: get("ROSTER_CHECKIN_BASE_URL").unwrap_or(defaults.checkin_base_url),
            qr_generator_url: get("ROSTER_QR_GENERATOR_URL").unwrap_or(defaults.qr_generator_url),
            request_timeout_secs,
            use_demo_data,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ServiceResult<()> {
        if self.api_base_url.is_none() && !self.use_demo_data {
            return Err(ServiceError::Configuration(
                "ROSTER_API_BASE_URL is not set and demo data is disabled".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ServiceError::Configuration("request timeout must be positive".to_string()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
