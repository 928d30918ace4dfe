use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// Prefix for environment overrides, e.g. `GETAPPT_EXCHANGE__USERS`.
pub const ENV_PREFIX: &str = "GETAPPT";

/// Upper bound for any day offset or window length.
pub const MAX_DAYS: u32 = 3650;

/// Merged free/busy interval range EWS accepts, in minutes.
pub const MERGED_INTERVAL_RANGE: std::ops::RangeInclusive<u32> = 5..=1440;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// All errors joined into one line
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Exchange server and mailbox settings
    pub exchange: ExchangeConfig,

    /// Where the JSON document goes
    pub delivery: DeliveryConfig,

    /// Calendar-view query settings
    pub appointments: AppointmentsConfig,

    /// Free/busy query settings
    pub availability: AvailabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    /// EWS endpoint, usually ending in `/EWS/Exchange.asmx`
    pub server_url: String,

    /// Semicolon-delimited mailbox addresses
    pub users: String,

    /// Value sent as `RequestServerVersion`
    pub version: String,

    /// Basic auth user name
    pub username: Option<String>,

    /// Basic auth password (prefer `GETAPPT_EXCHANGE__PASSWORD`)
    pub password: Option<String>,

    /// Bearer token, used instead of basic auth when set
    pub token: Option<String>,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            server_url: "https://mail.example.com/EWS/Exchange.asmx".to_string(),
            users: String::new(),
            version: "Exchange2016".to_string(),
            username: None,
            password: None,
            token: None,
        }
    }
}

impl ExchangeConfig {
    /// Split the configured user list.
    ///
    /// Entries are trimmed and blanks dropped, so `"a@x;;b@x;"` yields two
    /// users.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyUsers`] when no user remains.
    pub fn user_list(&self) -> Result<Vec<String>, ConfigError> {
        let users: Vec<String> = self
            .users
            .split(';')
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_string)
            .collect();

        if users.is_empty() {
            return Err(ConfigError::EmptyUsers);
        }
        Ok(users)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// HTTP PUT destination; empty means print to stdout
    pub put_uri: String,

    /// Timeout for the PUT call
    pub timeout_secs: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            put_uri: String::new(),
            timeout_secs: 10,
        }
    }
}

impl DeliveryConfig {
    /// The PUT destination, if one is configured.
    pub fn put_uri(&self) -> Option<&str> {
        let uri = self.put_uri.trim();
        (!uri.is_empty()).then_some(uri)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppointmentsConfig {
    /// Length of the calendar view, starting now
    pub days: u32,

    /// Maximum appointments returned per user
    pub max_entries: u32,
}

impl Default for AppointmentsConfig {
    fn default() -> Self {
        Self {
            days: 5,
            max_entries: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AvailabilityConfig {
    /// Window starts at UTC midnight this many days from today
    pub days_ahead: u32,

    /// Window length in whole days
    pub window_days: u32,

    /// EWS `RequestedView`
    pub view: String,

    /// Interval length of the merged free/busy string
    pub merged_interval_minutes: u32,
}

impl Default for AvailabilityConfig {
    fn default() -> Self {
        Self {
            days_ahead: 1,
            window_days: 1,
            view: "FreeBusyMerged".to_string(),
            merged_interval_minutes: 30,
        }
    }
}

impl Config {
    /// Load configuration from `path` (or the default location) layered
    /// under `GETAPPT_*` environment variables.
    ///
    /// An explicit path must exist. The default path is optional so a
    /// purely environment-driven setup works.
    ///
    /// # Errors
    ///
    /// Fails when an explicit file is missing or any source is malformed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (Self::default_path()?, false),
        };

        if required && !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }

        tracing::debug!(path = %path.display(), "Loading configuration");

        let settings = config::Config::builder()
            .add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(required),
            )
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Load configuration and validate it
    ///
    /// Warnings are logged; errors abort.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when validation finds errors.
    pub fn load_validated(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        let validation = config.validate();

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()));
        }

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.exchange.server_url.trim().is_empty() {
            result.add_error("exchange.server_url", "Server URL is required");
        } else {
            validate_url(&self.exchange.server_url, "exchange.server_url", &mut result);
        }

        if self.exchange.version.trim().is_empty() {
            result.add_error("exchange.version", "Exchange version is required");
        }

        let has_username = self.exchange.username.as_deref().is_some_and(|u| !u.is_empty());
        let has_password = self.exchange.password.is_some();
        let has_token = self.exchange.token.as_deref().is_some_and(|t| !t.is_empty());

        if has_password && !has_username {
            result.add_error("exchange.password", "Password is set without a username");
        }
        if has_token && has_username {
            result.add_warning(
                "exchange.token",
                "Both a token and a username are set; the token wins",
            );
        }
        if (has_username || has_token) && self.exchange.server_url.starts_with("http://") {
            result.add_warning(
                "exchange.server_url",
                "Credentials will be sent over plain http",
            );
        }

        if let Some(uri) = self.delivery.put_uri() {
            validate_url(uri, "delivery.put_uri", &mut result);
        }
        if self.delivery.timeout_secs == 0 {
            result.add_error("delivery.timeout_secs", "Timeout must be greater than 0");
        }

        if self.appointments.days == 0 {
            result.add_error("appointments.days", "Window must be at least one day");
        } else if self.appointments.days > MAX_DAYS {
            result.add_error(
                "appointments.days",
                format!("Window cannot exceed {} days", MAX_DAYS),
            );
        }
        if self.appointments.max_entries == 0 {
            result.add_error("appointments.max_entries", "Must request at least one entry");
        } else if self.appointments.max_entries > 1000 {
            result.add_warning(
                "appointments.max_entries",
                "Servers commonly cap calendar views at 1000 items",
            );
        }

        if self.availability.days_ahead > MAX_DAYS {
            result.add_error(
                "availability.days_ahead",
                format!("Window cannot start more than {} days ahead", MAX_DAYS),
            );
        }
        if self.availability.window_days == 0 {
            result.add_error("availability.window_days", "Window must be at least one day");
        } else if self.availability.window_days > 42 {
            result.add_error(
                "availability.window_days",
                "Free/busy windows are limited to 42 days",
            );
        }
        if !MERGED_INTERVAL_RANGE.contains(&self.availability.merged_interval_minutes) {
            result.add_error(
                "availability.merged_interval_minutes",
                format!(
                    "Interval must be between {} and {} minutes",
                    MERGED_INTERVAL_RANGE.start(),
                    MERGED_INTERVAL_RANGE.end()
                ),
            );
        }
        if self.availability.view.trim().is_empty() {
            result.add_error("availability.view", "Requested view is required");
        }

        result
    }

    /// Write this configuration as TOML to `path`, refusing to overwrite.
    ///
    /// # Errors
    ///
    /// Fails when the file exists or cannot be written.
    pub fn save_new(&self, path: &Path) -> Result<(), ConfigError> {
        if path.exists() {
            return Err(ConfigError::AlreadyExists(path.display().to_string()));
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, contents)?;
        tracing::info!(path = %path.display(), "Wrote configuration");
        Ok(())
    }

    /// Path used when `--config` is not given.
    ///
    /// # Errors
    ///
    /// Fails on platforms without a config directory.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ConfigError::NotFound("platform config directory".to_string()))?
            .join("getappt");

        Ok(config_dir.join("config.toml"))
    }
}

fn validate_url(url_str: &str, field_name: &str, result: &mut ValidationResult) {
    match Url::parse(url_str) {
        Ok(url) => {
            if url.scheme() != "http" && url.scheme() != "https" {
                result.add_error(
                    field_name,
                    format!("URL must use http or https scheme, got: {}", url.scheme()),
                );
            }

            if url.host().is_none() {
                result.add_error(field_name, "URL must have a host");
            }

            if url.port() == Some(0) {
                result.add_error(field_name, "Port cannot be 0");
            }
        }
        Err(e) => {
            result.add_error(field_name, format!("Invalid URL: {}", e));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_valid_default_config() {
        let config = Config::default();
        let result = config.validate();
        assert!(result.is_valid(), "Default config should be valid: {:?}", result.errors);
    }

    #[test]
    fn test_user_list_splits_on_semicolons() {
        let exchange = ExchangeConfig {
            users: " alice@example.com;;bob@example.com; ".to_string(),
            ..Default::default()
        };
        assert_eq!(
            exchange.user_list().unwrap(),
            vec!["alice@example.com".to_string(), "bob@example.com".to_string()]
        );
    }

    #[test]
    fn test_empty_user_list_is_rejected() {
        let exchange = ExchangeConfig::default();
        assert!(matches!(exchange.user_list(), Err(ConfigError::EmptyUsers)));

        let exchange = ExchangeConfig {
            users: " ; ;".to_string(),
            ..Default::default()
        };
        assert!(matches!(exchange.user_list(), Err(ConfigError::EmptyUsers)));
    }

    #[test]
    fn test_put_uri_blank_means_stdout() {
        let mut delivery = DeliveryConfig::default();
        assert_eq!(delivery.put_uri(), None);

        delivery.put_uri = "   ".to_string();
        assert_eq!(delivery.put_uri(), None);

        delivery.put_uri = "https://hooks.example.com/cal".to_string();
        assert_eq!(delivery.put_uri(), Some("https://hooks.example.com/cal"));
    }

    #[test]
    fn test_invalid_url_scheme() {
        let mut config = Config::default();
        config.exchange.server_url = "ftp://mail.example.com/EWS".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_invalid_put_uri() {
        let mut config = Config::default();
        config.delivery.put_uri = "not-a-url".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "delivery.put_uri"));
    }

    #[test]
    fn test_password_without_username() {
        let mut config = Config::default();
        config.exchange.password = Some("secret".to_string());
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.field == "exchange.password"));
    }

    #[test]
    fn test_plain_http_with_credentials_is_warning() {
        let mut config = Config::default();
        config.exchange.server_url = "http://mail.example.com/EWS/Exchange.asmx".to_string();
        config.exchange.username = Some("svc".to_string());
        config.exchange.password = Some("secret".to_string());
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.field == "exchange.server_url"));
    }

    #[test]
    fn test_zero_values_are_errors() {
        let mut config = Config::default();
        config.delivery.timeout_secs = 0;
        config.appointments.max_entries = 0;
        config.availability.window_days = 0;
        let result = config.validate();
        let fields: Vec<&str> = result.errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"delivery.timeout_secs"));
        assert!(fields.contains(&"appointments.max_entries"));
        assert!(fields.contains(&"availability.window_days"));
    }

    #[test]
    fn test_day_counts_are_bounded() {
        let mut config = Config::default();
        config.appointments.days = 100_000_000;
        config.availability.days_ahead = u32::MAX;
        let result = config.validate();
        assert!(!result.is_valid());
        let fields: Vec<&str> = result.errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"appointments.days"));
        assert!(fields.contains(&"availability.days_ahead"));

        config.appointments.days = MAX_DAYS;
        config.availability.days_ahead = MAX_DAYS;
        assert!(config.validate().is_valid());
    }

    #[test]
    fn test_merged_interval_range() {
        let mut config = Config::default();
        for minutes in [0, 4, 1441] {
            config.availability.merged_interval_minutes = minutes;
            let result = config.validate();
            assert!(
                result
                    .errors
                    .iter()
                    .any(|e| e.field == "availability.merged_interval_minutes"),
                "{} minutes should be rejected",
                minutes
            );
        }
        for minutes in [5, 30, 1440] {
            config.availability.merged_interval_minutes = minutes;
            assert!(config.validate().is_valid());
        }
    }

    #[test]
    fn test_validation_result_error_summary() {
        let mut result = ValidationResult::default();
        result.add_error("field1", "error1");
        result.add_error("field2", "error2");
        let summary = result.error_summary();
        assert!(summary.contains("field1: error1"));
        assert!(summary.contains("field2: error2"));
    }

    #[test]
    fn test_load_from_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[exchange]
server_url = "https://exchange.example.org/EWS/Exchange.asmx"
users = "room1@example.org;room2@example.org"

[delivery]
put_uri = "https://dashboard.example.org/calendar"
"#,
        );

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(
            config.exchange.server_url,
            "https://exchange.example.org/EWS/Exchange.asmx"
        );
        assert_eq!(config.exchange.user_list().unwrap().len(), 2);
        assert_eq!(config.exchange.version, "Exchange2016");
        assert_eq!(config.delivery.timeout_secs, 10);
        assert_eq!(config.appointments.days, 5);
        assert_eq!(config.appointments.max_entries, 5);
        assert_eq!(config.availability.view, "FreeBusyMerged");
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(matches!(
            Config::load(Some(&path)),
            Err(ConfigError::NotFound(_))
        ));
    }

    #[test]
    fn test_load_validated_rejects_bad_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[exchange]
server_url = "mail.example.com"
"#,
        );
        assert!(matches!(
            Config::load_validated(Some(&path)),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_load_malformed_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "[exchange\nserver_url = ");
        assert!(matches!(
            Config::load(Some(&path)),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_save_new_round_trips_and_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.exchange.users = "alice@example.com".to_string();
        config.save_new(&path).unwrap();

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded.exchange.users, "alice@example.com");

        assert!(matches!(
            config.save_new(&path),
            Err(ConfigError::AlreadyExists(_))
        ));
    }
}
