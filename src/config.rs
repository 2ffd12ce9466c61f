use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub expand: ExpandConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Root under which top-level collections and association targets are
    /// listed.
    pub inventory_root: String,
    /// JSON inventory fixture; the built-in demo inventory is used when unset.
    pub fixture_path: Option<String>,
    pub log_calls: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpandConfig {
    pub max_levels: u8,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            inventory_root: "/xyz/openbmc_project/inventory".to_string(),
            fixture_path: None,
            log_calls: false,
        }
    }
}

impl Default for ExpandConfig {
    fn default() -> Self {
        Self {
            max_levels: 6,
            request_timeout_secs: 30,
        }
    }
}

impl ExpandConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl AppConfig {
    /// Load configuration from defaults, an optional `config` file, then
    /// `INVGW_`-prefixed environment variables.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = config::Config::builder();

        config = config.add_source(config::Config::try_from(&AppConfig::default())?);

        config = config.add_source(config::File::with_name("config").required(false));

        // e.g. INVGW_SERVER__PORT=8080, INVGW_EXPAND__MAX_LEVELS=3
        config = config.add_source(
            config::Environment::with_prefix("INVGW")
                .prefix_separator("_")
                .separator("__"),
        );

        let config = config.build()?;
        let app_config: AppConfig = config.try_deserialize()?;

        Ok(app_config)
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
