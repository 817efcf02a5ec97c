use crate::config::types::Settings;
use crate::ConfigError;

/// Validates the loaded settings
pub fn validate(settings: &Settings) -> Result<(), ConfigError> {
    if settings.bot_name.is_empty() {
        return Err(ConfigError::Validation(
            "BOT_NAME cannot be empty".to_string(),
        ));
    }

    if settings.request_timeout.as_millis() < 1000 {
        return Err(ConfigError::Validation(format!(
            "REQUEST_TIMEOUT_MS must be >= 1000ms, got {}ms",
            settings.request_timeout.as_millis()
        )));
    }

    if settings.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "MAX_RETRIES must be <= 10, got {}",
            settings.max_retries
        )));
    }

    if settings.global_concurrency < 1 || settings.global_concurrency > 64 {
        return Err(ConfigError::Validation(format!(
            "GLOBAL_CONCURRENCY must be between 1 and 64, got {}",
            settings.global_concurrency
        )));
    }

    if settings.per_host_max_concurrent < 1 {
        return Err(ConfigError::Validation(format!(
            "PER_HOST_MAX_CONCURRENT must be >= 1, got {}",
            settings.per_host_max_concurrent
        )));
    }

    if settings.per_host_min_time.as_millis() < 100 {
        return Err(ConfigError::Validation(format!(
            "PER_HOST_MIN_TIME_MS must be >= 100ms, got {}ms",
            settings.per_host_min_time.as_millis()
        )));
    }

    if settings.worker_concurrency < 1 || settings.worker_concurrency > 16 {
        return Err(ConfigError::Validation(format!(
            "WORKER_CONCURRENCY must be between 1 and 16, got {}",
            settings.worker_concurrency
        )));
    }

    Ok(())
}
