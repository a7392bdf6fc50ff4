//! Application settings management
//!
//! This module defines the configuration structure and provides methods
//! for loading settings from TOML files and environment variables.

use serde::{Deserialize, Serialize};

/// Main application configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub zoom: ZoomConfig,
    pub whatsapp: WhatsAppConfig,
    #[serde(default)]
    pub shortener: ShortenerConfig,
    #[serde(default)]
    pub scheduling: SchedulingConfig,
    pub logging: LoggingConfig,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// Upper bound for the whole assignment transaction
    #[serde(default = "default_transaction_timeout")]
    pub transaction_timeout_secs: u64,
    /// Upper bound for waiting on a connection or a row lock
    #[serde(default = "default_lock_wait")]
    pub lock_wait_secs: u64,
}

/// Zoom server-to-server OAuth configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ZoomConfig {
    pub account_id: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_zoom_api_url")]
    pub api_base_url: String,
    #[serde(default = "default_zoom_oauth_url")]
    pub oauth_url: String,
    /// Zoom user the meetings are created under
    #[serde(default = "default_zoom_host_user")]
    pub host_user: String,
    #[serde(default = "default_zoom_timeout")]
    pub timeout_seconds: u64,
    /// Parallel registrant requests per meeting
    #[serde(default = "default_registration_concurrency")]
    pub registration_concurrency: usize,
}

/// WhatsApp Business Cloud API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WhatsAppConfig {
    pub access_token: String,
    pub phone_number_id: String,
    #[serde(default = "default_whatsapp_api_url")]
    pub api_base_url: String,
    #[serde(default = "default_language_code")]
    pub language_code: String,
    #[serde(default = "default_country_code")]
    pub default_country_code: String,
    #[serde(default = "default_whatsapp_timeout")]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub templates: TemplateNames,
}

/// Approved WhatsApp template names per message kind
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TemplateNames {
    pub meeting_ready_user: String,
    pub meeting_ready_trainer: String,
    pub reminder_user: String,
    pub reminder_trainer: String,
    pub first_touch: String,
    pub error_escalation: String,
}

/// URL shortener configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShortenerConfig {
    pub enabled: bool,
    pub api_url: String,
    pub timeout_seconds: u64,
}

/// Scheduling behaviour
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SchedulingConfig {
    /// Business time zone as minutes east of UTC
    pub utc_offset_minutes: i32,
    pub default_pool_capacity: i32,
    pub pool_name: String,
    /// Operator contact for escalation messages
    pub operator_phone: Option<String>,
    pub per_event_timeout_secs: u64,
    pub meeting_timeout_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: String,
    #[serde(default)]
    pub json: bool,
}

fn default_transaction_timeout() -> u64 { 10 }
fn default_lock_wait() -> u64 { 5 }
fn default_zoom_api_url() -> String { "https://api.zoom.us/v2".to_string() }
fn default_zoom_oauth_url() -> String { "https://zoom.us/oauth/token".to_string() }
fn default_zoom_host_user() -> String { "me".to_string() }
fn default_zoom_timeout() -> u64 { 30 }
fn default_registration_concurrency() -> usize { 5 }
fn default_whatsapp_api_url() -> String { "https://graph.facebook.com/v21.0".to_string() }
fn default_language_code() -> String { "en".to_string() }
fn default_country_code() -> String { "91".to_string() }
fn default_whatsapp_timeout() -> u64 { 15 }

impl Default for TemplateNames {
    fn default() -> Self {
        Self {
            meeting_ready_user: "meeting_ready_user".to_string(),
            meeting_ready_trainer: "meeting_ready_trainer".to_string(),
            reminder_user: "event_reminder_user".to_string(),
            reminder_trainer: "event_reminder_trainer".to_string(),
            first_touch: "first_touch_reminder".to_string(),
            error_escalation: "pool_assignment_error".to_string(),
        }
    }
}

impl Default for ShortenerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_url: "https://tinyurl.com/api-create.php".to_string(),
            timeout_seconds: 5,
        }
    }
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 330,
            default_pool_capacity: 100,
            pool_name: "Main Pool".to_string(),
            operator_phone: None,
            per_event_timeout_secs: 120,
            meeting_timeout_secs: 30,
        }
    }
}

impl Settings {
    /// Load settings from configuration file and environment variables
    pub fn new() -> Result<Self, config::ConfigError> {
        Self::from_file("config")
    }

    /// Load settings from the given file (extension optional) layered under `POOLMATE__*` variables
    pub fn from_file(path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("POOLMATE").separator("__"))
            .build()?;

        settings.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), crate::utils::errors::PoolMateError> {
        super::validation::validate_settings(self)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "postgresql://localhost/poolmate".to_string(),
                max_connections: 10,
                min_connections: 1,
                transaction_timeout_secs: default_transaction_timeout(),
                lock_wait_secs: default_lock_wait(),
            },
            zoom: ZoomConfig {
                account_id: String::new(),
                client_id: String::new(),
                client_secret: String::new(),
                api_base_url: default_zoom_api_url(),
                oauth_url: default_zoom_oauth_url(),
                host_user: default_zoom_host_user(),
                timeout_seconds: default_zoom_timeout(),
                registration_concurrency: default_registration_concurrency(),
            },
            whatsapp: WhatsAppConfig {
                access_token: String::new(),
                phone_number_id: String::new(),
                api_base_url: default_whatsapp_api_url(),
                language_code: default_language_code(),
                default_country_code: default_country_code(),
                timeout_seconds: default_whatsapp_timeout(),
                templates: TemplateNames::default(),
            },
            shortener: ShortenerConfig::default(),
            scheduling: SchedulingConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: "/var/log/poolmate".to_string(),
                json: false,
            },
        }
    }
}
