use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

use crate::view::ViewSettings;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub explorer: ExplorerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub enable_cors: bool,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8050,
            request_timeout_secs: 30,
            enable_cors: false,
            max_upload_bytes: 64 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    /// Rows shown by component tables before sampling kicks in.
    pub table_max_rows: usize,
    pub chart_height: u32,
    pub capex_chart_height: u32,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            table_max_rows: 1000,
            chart_height: 500,
            capex_chart_height: 1000,
        }
    }
}

impl ExplorerConfig {
    pub fn view_settings(&self) -> ViewSettings {
        ViewSettings {
            chart_height: self.chart_height,
            cost_chart_height: self.capex_chart_height,
        }
    }
}

impl Config {
    /// Built-in defaults, then `config/default.toml`, then `EXPLORER__*` env vars.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(DEFAULT_CONFIG_PATH))
    }

    /// Same layering with an explicit file. A missing file is not an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("EXPLORER__").split("__"));
        Ok(figment.extract()?)
    }
}
