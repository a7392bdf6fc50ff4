//! Logging configuration and setup
//!
//! This module provides logging initialization and structured logging utilities
//! for the PoolMate application.

use tracing::{info, warn, error, debug};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};
use crate::config::LoggingConfig;
use crate::utils::errors::{PoolMateError, Result};

/// Initialize logging based on configuration.
///
/// The returned guard flushes the file writer on drop and must be held
/// until the process exits.
pub fn init_logging(config: &LoggingConfig) -> Result<WorkerGuard> {
    let file_appender = tracing_appender::rolling::daily(&config.file_path, "poolmate.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let stdout_layer = if config.json {
        tracing_subscriber::fmt::layer().json().with_writer(std::io::stdout).boxed()
    } else {
        tracing_subscriber::fmt::layer().with_writer(std::io::stdout).boxed()
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.level))
        .with(stdout_layer)
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(non_blocking))
        .try_init()
        .map_err(|e| PoolMateError::Config(format!("Failed to initialize logging: {}", e)))?;

    info!("Logging initialized with level: {}", config.level);
    Ok(guard)
}

/// Log the result of one assignment run
pub fn log_assignment_outcome(event_id: i64, outcome: &str, reason: Option<&str>) {
    match outcome {
        "success" => info!(event_id = event_id, outcome = outcome, "Pool assignment completed"),
        "skipped" => info!(event_id = event_id, outcome = outcome, reason = reason, "Pool assignment skipped"),
        _ => error!(event_id = event_id, outcome = outcome, reason = reason, "Pool assignment failed"),
    }
}

/// Log a per-recipient notification failure
pub fn log_notification_failure(event_id: i64, template: &str, recipient: &str, error: &str) {
    warn!(
        event_id = event_id,
        template = template,
        recipient = recipient,
        error = error,
        "Notification failed"
    );
}

/// Log API errors with context
pub fn log_api_error(api: &str, error: &str, context: Option<&str>) {
    error!(
        api = api,
        error = error,
        context = context,
        "API error occurred"
    );
}

/// Log database operations
pub fn log_database_operation(operation: &str, table: &str, duration_ms: u64, success: bool) {
    if success {
        debug!(
            operation = operation,
            table = table,
            duration_ms = duration_ms,
            "Database operation completed"
        );
    } else {
        error!(
            operation = operation,
            table = table,
            duration_ms = duration_ms,
            "Database operation failed"
        );
    }
}

/// Log the aggregate result of a trigger run
pub fn log_job_summary(job: &str, total: usize, success: usize, failed: usize, skipped: usize, duration_ms: u64) {
    if failed > 0 {
        warn!(
            job = job,
            total = total,
            success = success,
            failed = failed,
            skipped = skipped,
            duration_ms = duration_ms,
            "Job finished with failures"
        );
    } else {
        info!(
            job = job,
            total = total,
            success = success,
            failed = failed,
            skipped = skipped,
            duration_ms = duration_ms,
            "Job finished"
        );
    }
}
