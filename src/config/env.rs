use crate::config::types::Settings;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::time::Duration;

/// Loads settings from the process environment
///
/// Unset variables fall back to their defaults; set-but-malformed variables
/// are a hard error so a typo never silently reverts to a default.
///
/// # Returns
///
/// * `Ok(Settings)` - Successfully loaded and validated settings
/// * `Err(ConfigError)` - A variable failed to parse or validation failed
pub fn load_settings() -> Result<Settings, ConfigError> {
    let defaults = Settings::default();

    let settings = Settings {
        redis_url: optional_var("REDIS_URL"),
        bot_name: optional_var("BOT_NAME").unwrap_or(defaults.bot_name),
        request_timeout: Duration::from_millis(parse_var(
            "REQUEST_TIMEOUT_MS",
            defaults.request_timeout.as_millis() as u64,
        )?),
        max_retries: parse_var("MAX_RETRIES", defaults.max_retries)?,
        between_requests: Duration::from_millis(parse_var(
            "BETWEEN_REQUESTS_MS",
            defaults.between_requests.as_millis() as u64,
        )?),
        global_concurrency: parse_var("GLOBAL_CONCURRENCY", defaults.global_concurrency)?,
        per_host_min_time: Duration::from_millis(parse_var(
            "PER_HOST_MIN_TIME_MS",
            defaults.per_host_min_time.as_millis() as u64,
        )?),
        per_host_max_concurrent: parse_var(
            "PER_HOST_MAX_CONCURRENT",
            defaults.per_host_max_concurrent,
        )?,
        worker_concurrency: parse_var("WORKER_CONCURRENCY", defaults.worker_concurrency)?,
        enable_cache: parse_bool_var("ENABLE_CACHE", defaults.enable_cache)?,
        enable_mx_check: parse_bool_var("ENABLE_MX_CHECK", defaults.enable_mx_check)?,
        log_level: optional_var("LOG_LEVEL").unwrap_or(defaults.log_level),
        audit_log_path: optional_var("AUDIT_LOG_PATH").unwrap_or(defaults.audit_log_path),
    };

    validate(&settings)?;

    Ok(settings)
}

/// Computes a fingerprint of the effective settings
///
/// Logged at startup so the audit trail records which configuration a run
/// used. Only non-secret fields participate; the Redis URL is reduced to
/// present/absent.
pub fn settings_fingerprint(settings: &Settings) -> String {
    let canonical = format!(
        "bot={};timeout={};retries={};between={};global={};host_min={};host_max={};workers={};cache={};mx={}",
        settings.bot_name,
        settings.request_timeout.as_millis(),
        settings.max_retries,
        settings.between_requests.as_millis(),
        settings.global_concurrency,
        settings.per_host_min_time.as_millis(),
        settings.per_host_max_concurrent,
        settings.worker_concurrency,
        settings.enable_cache,
        settings.enable_mx_check,
    );
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match optional_var(name) {
        Some(raw) => raw.trim().parse::<T>().map_err(|e| ConfigError::Parse {
            variable: name.to_string(),
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn parse_bool_var(name: &str, default: bool) -> Result<bool, ConfigError> {
    match optional_var(name) {
        Some(raw) => match raw.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            other => Err(ConfigError::Parse {
                variable: name.to_string(),
                message: format!("expected a boolean, got '{}'", other),
            }),
        },
        None => Ok(default),
    }
}
