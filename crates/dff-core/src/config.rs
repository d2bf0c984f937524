use std::net::SocketAddr;
use std::path::PathBuf;

use rust_decimal::Decimal;

use crate::app_config::{AppConfig, Environment};
use crate::price_lists::{parse_price_list_targets, DEFAULT_PRICE_LISTS};
use crate::pricing::MarkupConfig;
use crate::ConfigError;

/// Origins the inventory page has historically been served from.
const DEFAULT_ALLOWED_ORIGINS: &str = "http://127.0.0.1:5500,http://localhost:3000,https://jdeck88.github.io,https://reports.deckfamilyfarm.com";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can drive it with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_rate = |var: &str| -> Result<Decimal, ConfigError> {
        let raw = require(var)?;
        let rate = raw
            .trim()
            .parse::<Decimal>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if rate <= Decimal::ZERO {
            return Err(invalid(var, format!("must be greater than zero, got {rate}")));
        }
        Ok(rate)
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    // Every u64 setting is a duration in seconds; zero would panic tokio
    // intervals or time out every request.
    let parse_secs = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let secs = or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if secs == 0 {
            return Err(invalid(var, "must be at least 1 second".to_string()));
        }
        Ok(secs)
    };

    let database_url = require("DATABASE_URL")?;

    let markups = MarkupConfig {
        member_markup: parse_rate("MEMBER_MARKUP")?,
        guest_markup: parse_rate("GUEST_MARKUP")?,
        discount: parse_rate("DISCOUNT")?,
    };

    let ll_base_url = require("LL_BASEURL")?;
    let ll_username = require("LL_USERNAME")?;
    let ll_password = require("LL_PASSWORD")?;
    let ll_company_base_url = lookup("LL_COMPANY_BASEURL")
        .ok()
        .filter(|v| !v.trim().is_empty());

    let env = parse_environment(&or_default("DFF_ENV", "development"))?;

    let bind_addr = or_default("DFF_BIND_ADDR", "0.0.0.0:3401")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("DFF_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("DFF_LOG_LEVEL", "info");

    let price_lists = parse_price_list_targets(
        &or_default("DFF_PRICE_LISTS", DEFAULT_PRICE_LISTS),
        &markups,
    )
    .map_err(|reason| invalid("DFF_PRICE_LISTS", reason))?;

    let allowed_origins = or_default("DFF_ALLOWED_ORIGINS", DEFAULT_ALLOWED_ORIGINS)
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect();

    let jwt_secret = lookup("JWT_SECRET").ok().filter(|v| !v.is_empty());

    let missing_links_path = PathBuf::from(or_default(
        "DFF_MISSING_LINKS_PATH",
        "data/missing_price_list_links.csv",
    ));
    let inventory_log_path = PathBuf::from(or_default(
        "DFF_INVENTORY_LOG_PATH",
        "data/inventory_updates_log.csv",
    ));

    let request_timeout_secs = parse_secs("DFF_REQUEST_TIMEOUT_SECS", "30")?;
    let db_max_connections = parse_u32("DFF_DB_MAX_CONNECTIONS", "10")?;
    if db_max_connections == 0 {
        return Err(invalid("DFF_DB_MAX_CONNECTIONS", "must be at least 1".to_string()));
    }
    let db_min_connections = parse_u32("DFF_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_secs("DFF_DB_ACQUIRE_TIMEOUT_SECS", "10")?;
    let db_keepalive_secs = parse_secs("DFF_DB_KEEPALIVE_SECS", "30")?;

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        markups,
        price_lists,
        ll_base_url,
        ll_company_base_url,
        ll_username,
        ll_password,
        jwt_secret,
        allowed_origins,
        missing_links_path,
        inventory_log_path,
        request_timeout_secs,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        db_keepalive_secs,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for anything other than
/// `development`, `test`, or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "DFF_ENV".to_string(),
            reason: format!("unknown environment {other:?}"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
