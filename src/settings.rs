use std::time::Duration;

use eyre::{eyre, Result};
use serde::Deserialize;

/// Process-wide settings, read from an optional `dns01-huawei` config file and then the
/// environment.
#[derive(Clone, Debug, Deserialize)]
pub struct Settings {
    /// API group used by the challenge host to route requests to this solver.
    #[serde(default)]
    pub group_name: String,
    /// Overrides `https://dns.{region}.myhuaweicloud.com`.
    #[serde(default)]
    pub api_endpoint: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            group_name: String::new(),
            api_endpoint: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Settings> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("dns01-huawei").required(false))
            .add_source(config::Environment::default())
            .build()?;
        Self::from_config(config)
    }

    pub fn from_config(config: config::Config) -> Result<Settings> {
        let settings: Settings = config.try_deserialize()?;
        if settings.group_name.is_empty() {
            return Err(eyre!("GROUP_NAME must be specified"));
        }
        Ok(settings)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
