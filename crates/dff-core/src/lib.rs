pub mod app_config;
pub mod config;
pub mod price_lists;
pub mod pricing;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use price_lists::{parse_price_list_targets, PriceListTarget};
pub use pricing::{
    apply_markup, calculate_prices, round_currency, MarkupConfig, PriceBundle, PriceInputs,
    PricingError, UnitOfMeasure,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
