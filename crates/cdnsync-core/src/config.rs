use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

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
    use std::net::IpAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let database_url = require("DATABASE_URL")?;
    let purge_key = require("CDNSYNC_PURGE_KEY")?;
    let purge_secret = require("CDNSYNC_PURGE_SECRET")?;

    let env = parse_environment(&or_default("CDNSYNC_ENV", "development"))?;

    let host: IpAddr = parse_as("CDNSYNC_HOST", &or_default("CDNSYNC_HOST", "0.0.0.0"))?;
    let port: u16 = parse_as("CDNSYNC_PORT", &or_default("CDNSYNC_PORT", "3000"))?;
    let log_level = or_default("CDNSYNC_LOG_LEVEL", "info");
    let config_path = PathBuf::from(or_default(
        "CDNSYNC_CONFIG_PATH",
        "./config/cdnsync.yaml",
    ));

    let db_max_connections = parse_as(
        "CDNSYNC_DB_MAX_CONNECTIONS",
        &or_default("CDNSYNC_DB_MAX_CONNECTIONS", "10"),
    )?;
    let db_min_connections = parse_as(
        "CDNSYNC_DB_MIN_CONNECTIONS",
        &or_default("CDNSYNC_DB_MIN_CONNECTIONS", "1"),
    )?;
    let db_acquire_timeout_secs = parse_as(
        "CDNSYNC_DB_ACQUIRE_TIMEOUT_SECS",
        &or_default("CDNSYNC_DB_ACQUIRE_TIMEOUT_SECS", "10"),
    )?;

    let http_timeout_secs = parse_as(
        "CDNSYNC_HTTP_TIMEOUT_SECS",
        &or_default("CDNSYNC_HTTP_TIMEOUT_SECS", "30"),
    )?;
    let user_agent = or_default("CDNSYNC_USER_AGENT", "cdnsync/0.1 (cdn-sync)");

    Ok(AppConfig {
        database_url,
        env,
        host,
        port,
        log_level,
        config_path,
        purge_key,
        purge_secret,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        http_timeout_secs,
        user_agent,
    })
}

fn parse_as<T>(var: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(|e| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason: e.to_string(),
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unknown values are rejected rather than silently treated as development.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "CDNSYNC_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
