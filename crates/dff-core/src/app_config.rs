use std::net::SocketAddr;
use std::path::PathBuf;

use crate::price_lists::PriceListTarget;
use crate::pricing::MarkupConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub markups: MarkupConfig,
    pub price_lists: Vec<PriceListTarget>,
    /// LocalLine backoffice API root, e.g. `https://localline.ca/api/backoffice/v2/`.
    pub ll_base_url: String,
    /// Storefront origin sent as `Referer`/`Origin` on price-list patches.
    pub ll_company_base_url: Option<String>,
    pub ll_username: String,
    pub ll_password: String,
    /// Only the API server needs this; the CLI runs without it.
    pub jwt_secret: Option<String>,
    pub allowed_origins: Vec<String>,
    pub missing_links_path: PathBuf,
    pub inventory_log_path: PathBuf,
    pub request_timeout_secs: u64,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub db_keepalive_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("markups", &self.markups)
            .field("price_lists", &self.price_lists)
            .field("ll_base_url", &self.ll_base_url)
            .field("ll_company_base_url", &self.ll_company_base_url)
            .field("ll_username", &self.ll_username)
            .field("ll_password", &"[redacted]")
            .field(
                "jwt_secret",
                &self.jwt_secret.as_ref().map(|_| "[redacted]"),
            )
            .field("allowed_origins", &self.allowed_origins)
            .field("missing_links_path", &self.missing_links_path)
            .field("inventory_log_path", &self.inventory_log_path)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("db_keepalive_secs", &self.db_keepalive_secs)
            .finish()
    }
}
