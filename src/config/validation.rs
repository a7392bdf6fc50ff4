//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use crate::utils::errors::{PoolMateError, Result};
use super::Settings;

const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_database_config(&settings.database)?;
    validate_zoom_config(&settings.zoom)?;
    validate_whatsapp_config(&settings.whatsapp)?;
    validate_shortener_config(&settings.shortener)?;
    validate_scheduling_config(&settings.scheduling)?;
    validate_logging_config(&settings.logging)?;
    validate_run_budget(settings)?;

    Ok(())
}

/// The per-event timeout must outlast every bounded step of one engine run:
/// meeting creation, the cleanup wait for a late creation, participant
/// registration and the assignment transaction.
fn validate_run_budget(settings: &Settings) -> Result<()> {
    let engine_budget = settings
        .scheduling
        .meeting_timeout_secs
        .saturating_mul(3)
        .saturating_add(settings.database.transaction_timeout_secs);
    if settings.scheduling.per_event_timeout_secs <= engine_budget {
        return Err(PoolMateError::Config(format!(
            "Per-event timeout {}s must exceed {}s (three meeting timeouts plus the transaction timeout)",
            settings.scheduling.per_event_timeout_secs, engine_budget
        )));
    }

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(PoolMateError::Config(
            "Database URL is required".to_string()
        ));
    }

    if config.max_connections == 0 {
        return Err(PoolMateError::Config(
            "Max connections must be greater than 0".to_string()
        ));
    }

    if config.min_connections > config.max_connections {
        return Err(PoolMateError::Config(
            "Min connections cannot be greater than max connections".to_string()
        ));
    }

    if config.transaction_timeout_secs == 0 || config.lock_wait_secs == 0 {
        return Err(PoolMateError::Config(
            "Transaction timeout and lock wait must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate Zoom configuration
fn validate_zoom_config(config: &super::ZoomConfig) -> Result<()> {
    if config.account_id.is_empty() || config.client_id.is_empty() || config.client_secret.is_empty() {
        return Err(PoolMateError::Config(
            "Zoom account_id, client_id and client_secret are required".to_string()
        ));
    }

    if config.timeout_seconds == 0 {
        return Err(PoolMateError::Config(
            "Zoom timeout must be greater than 0".to_string()
        ));
    }

    if config.registration_concurrency == 0 {
        return Err(PoolMateError::Config(
            "Zoom registration concurrency must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate WhatsApp configuration
fn validate_whatsapp_config(config: &super::WhatsAppConfig) -> Result<()> {
    if config.access_token.is_empty() {
        return Err(PoolMateError::Config(
            "WhatsApp access token is required".to_string()
        ));
    }

    if config.phone_number_id.is_empty() {
        return Err(PoolMateError::Config(
            "WhatsApp phone number ID is required".to_string()
        ));
    }

    let templates = &config.templates;
    let names = [
        &templates.meeting_ready_user,
        &templates.meeting_ready_trainer,
        &templates.reminder_user,
        &templates.reminder_trainer,
        &templates.first_touch,
        &templates.error_escalation,
    ];
    if names.iter().any(|name| name.is_empty()) {
        return Err(PoolMateError::Config(
            "Every WhatsApp template name must be set".to_string()
        ));
    }

    if config.timeout_seconds == 0 {
        return Err(PoolMateError::Config(
            "WhatsApp timeout must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate URL shortener configuration
fn validate_shortener_config(config: &super::ShortenerConfig) -> Result<()> {
    if config.enabled && config.api_url.is_empty() {
        return Err(PoolMateError::Config(
            "Shortener API URL is required when the shortener is enabled".to_string()
        ));
    }

    Ok(())
}

/// Validate scheduling configuration
fn validate_scheduling_config(config: &super::SchedulingConfig) -> Result<()> {
    if config.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
        return Err(PoolMateError::Config(
            format!("UTC offset {} minutes is out of range", config.utc_offset_minutes)
        ));
    }

    if config.default_pool_capacity <= 0 {
        return Err(PoolMateError::Config(
            "Default pool capacity must be greater than 0".to_string()
        ));
    }

    if config.pool_name.trim().is_empty() {
        return Err(PoolMateError::Config(
            "Pool name is required".to_string()
        ));
    }

    if config.per_event_timeout_secs == 0 || config.meeting_timeout_secs == 0 {
        return Err(PoolMateError::Config(
            "Scheduling timeouts must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(PoolMateError::Config(
            "Log level is required".to_string()
        ));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(PoolMateError::Config(
            format!("Invalid log level: {}. Valid levels: {:?}", config.level, valid_levels)
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_settings() -> Settings {
        let mut settings = Settings::default();
        settings.zoom.account_id = "acct".to_string();
        settings.zoom.client_id = "client".to_string();
        settings.zoom.client_secret = "secret".to_string();
        settings.whatsapp.access_token = "token".to_string();
        settings.whatsapp.phone_number_id = "12345".to_string();
        settings
    }

    #[test]
    fn test_valid_settings_pass() {
        assert!(validate_settings(&valid_settings()).is_ok());
    }

    #[test]
    fn test_default_settings_need_credentials() {
        assert!(validate_settings(&Settings::default()).is_err());
    }

    #[test]
    fn test_rejects_bad_scheduling_values() {
        let mut settings = valid_settings();
        settings.scheduling.utc_offset_minutes = 15 * 60;
        assert!(validate_settings(&settings).is_err());

        let mut settings = valid_settings();
        settings.scheduling.default_pool_capacity = 0;
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_per_event_timeout_covers_engine_steps() {
        let mut settings = valid_settings();
        settings.scheduling.meeting_timeout_secs = 30;
        settings.database.transaction_timeout_secs = 10;
        settings.scheduling.per_event_timeout_secs = 100;
        assert!(validate_settings(&settings).is_err());

        settings.scheduling.per_event_timeout_secs = 101;
        assert!(validate_settings(&settings).is_ok());
    }

    #[test]
    fn test_rejects_unknown_log_level() {
        let mut settings = valid_settings();
        settings.logging.level = "verbose".to_string();
        assert!(validate_settings(&settings).is_err());
    }
}
