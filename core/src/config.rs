//! Connection settings for one BigBlueButton server.

use config::{Config, Environment};
use serde::{Deserialize, Serialize};

use crate::checksum::ChecksumAlgorithm;
use crate::error::{BbbError, BbbResult};

/// Immutable server configuration shared by every call.
///
/// `base_url` is the API root including the trailing `api/` segment, e.g.
/// `https://host/bigbluebutton/api/`. A missing trailing slash is added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BbbConfig {
    pub base_url: String,

    /// Shared secret ("salt"). Only ever used as checksum input.
    #[serde(skip_serializing)]
    pub secret: String,

    #[serde(default)]
    pub checksum_algorithm: ChecksumAlgorithm,

    /// Transport timeout for one round trip.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl BbbConfig {
    pub fn new(base_url: &str, secret: &str) -> Self {
        Self {
            base_url: normalize_base_url(base_url),
            secret: secret.to_string(),
            checksum_algorithm: ChecksumAlgorithm::default(),
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn with_checksum_algorithm(mut self, algorithm: ChecksumAlgorithm) -> Self {
        self.checksum_algorithm = algorithm;
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Load from `BBB_BASE_URL`, `BBB_SECRET`, `BBB_CHECKSUM_ALGORITHM` and
    /// `BBB_TIMEOUT_SECS`.
    pub fn from_env() -> BbbResult<Self> {
        let mut config: BbbConfig = Config::builder()
            .add_source(Environment::with_prefix("BBB"))
            .build()?
            .try_deserialize()?;

        if config.base_url.trim().is_empty() {
            return Err(BbbError::Config("BBB_BASE_URL is empty".to_string()));
        }
        config.base_url = normalize_base_url(&config.base_url);
        Ok(config)
    }
}

fn normalize_base_url(base_url: &str) -> String {
    let trimmed = base_url.trim();
    if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    }
}
