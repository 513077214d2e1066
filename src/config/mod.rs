//! Configuration management for Mailroom

use crate::domain::parse_address;
use crate::error::ConfigError;
use anyhow::{Context, Result};
use lettre::message::Mailbox;
use std::env;
use std::time::Duration;

/// Email configuration
///
/// Loaded once at startup and treated as immutable afterwards. At most one
/// of `smtp` and `sendgrid` may be enabled; when neither is, email support
/// is switched off rather than treated as an error.
#[derive(Debug, Clone, Default)]
pub struct EmailConfig {
    /// Default sender, either `addr` or `Name <addr>`
    pub sender: String,
    /// Display name overriding the one parsed from `sender`
    pub sender_name: String,
    /// Allow initialization without a transport; sends go to a mock transport
    pub testing: bool,
    pub smtp: SmtpConfig,
    pub sendgrid: SendGridConfig,
    pub backoff: BackoffConfig,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub use_cram_md5: bool,
    /// Maximum number of pooled connections
    pub pool_size: usize,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 587,
            username: String::new(),
            password: String::new(),
            use_cram_md5: false,
            pool_size: 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SendGridConfig {
    pub api_key: String,
    /// API base URL (e.g., https://api.sendgrid.com)
    pub base_url: String,
}

impl Default for SendGridConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_SENDGRID_URL.to_string(),
        }
    }
}

/// Retry budget for a single send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffConfig {
    /// Delay before the second attempt
    pub initial_interval: Duration,
    /// Upper bound for the delay between two attempts
    pub max_interval: Duration,
    /// Total time allowed across all attempts, measured from the first one
    pub max_elapsed_time: Duration,
    /// Bound on each individual attempt
    pub timeout: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(DEFAULT_INITIAL_INTERVAL_MS),
            max_interval: Duration::from_millis(DEFAULT_MAX_INTERVAL_MS),
            max_elapsed_time: Duration::from_millis(DEFAULT_MAX_ELAPSED_TIME_MS),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

/// Logging and metrics configuration
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// "json" or "pretty"
    pub log_format: String,
    /// Register metric descriptions at startup
    pub metrics_enabled: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_format: "pretty".to_string(),
            metrics_enabled: true,
        }
    }
}

impl TelemetryConfig {
    /// Load telemetry configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()),
            metrics_enabled: env::var("METRICS_ENABLED")
                .map(|s| s.to_lowercase() != "false")
                .unwrap_or(true),
        }
    }
}

const DEFAULT_SENDGRID_URL: &str = "https://api.sendgrid.com";
const DEFAULT_INITIAL_INTERVAL_MS: u64 = 5_000;
const DEFAULT_MAX_INTERVAL_MS: u64 = 45_000;
const DEFAULT_MAX_ELAPSED_TIME_MS: u64 = 180_000;
const DEFAULT_TIMEOUT_MS: u64 = 30_000;

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// No validation is run here; call [`EmailConfig::validate`] (or
    /// initialize a mailer) to check the result.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let string = |key: &str| lookup(key).unwrap_or_default();
        let flag = |key: &str| {
            lookup(key)
                .map(|s| matches!(s.trim().to_lowercase().as_str(), "1" | "t" | "true"))
                .unwrap_or(false)
        };
        let millis = |key: &str, default: u64| -> Result<Duration> {
            let ms = match lookup(key) {
                Some(value) => value
                    .trim()
                    .parse()
                    .with_context(|| format!("Invalid {}", key))?,
                None => default,
            };
            Ok(Duration::from_millis(ms))
        };

        Ok(Self {
            sender: string("EMAIL_SENDER"),
            sender_name: string("EMAIL_SENDER_NAME"),
            testing: flag("EMAIL_TESTING"),
            smtp: SmtpConfig {
                host: string("EMAIL_SMTP_HOST"),
                port: lookup("EMAIL_SMTP_PORT")
                    .unwrap_or_else(|| "587".to_string())
                    .trim()
                    .parse()
                    .context("Invalid EMAIL_SMTP_PORT")?,
                username: string("EMAIL_SMTP_USERNAME"),
                password: string("EMAIL_SMTP_PASSWORD"),
                use_cram_md5: flag("EMAIL_SMTP_USE_CRAM_MD5"),
                pool_size: lookup("EMAIL_SMTP_POOL_SIZE")
                    .unwrap_or_else(|| "2".to_string())
                    .trim()
                    .parse()
                    .context("Invalid EMAIL_SMTP_POOL_SIZE")?,
            },
            sendgrid: SendGridConfig {
                api_key: string("EMAIL_SENDGRID_API_KEY"),
                base_url: lookup("EMAIL_SENDGRID_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_SENDGRID_URL.to_string()),
            },
            backoff: BackoffConfig {
                initial_interval: millis(
                    "EMAIL_BACKOFF_INITIAL_INTERVAL_MS",
                    DEFAULT_INITIAL_INTERVAL_MS,
                )?,
                max_interval: millis("EMAIL_BACKOFF_MAX_INTERVAL_MS", DEFAULT_MAX_INTERVAL_MS)?,
                max_elapsed_time: millis(
                    "EMAIL_BACKOFF_MAX_ELAPSED_TIME_MS",
                    DEFAULT_MAX_ELAPSED_TIME_MS,
                )?,
                timeout: millis("EMAIL_BACKOFF_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)?,
            },
        })
    }

    /// Whether any delivery transport is configured, regardless of validity
    pub fn available(&self) -> bool {
        self.smtp.enabled() || self.sendgrid.enabled()
    }

    /// Validate the configuration; the first failing rule is reported
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let available = self.available();

        if available && self.sender.trim().is_empty() {
            return Err(ConfigError::MissingSender);
        }

        if !self.sender.trim().is_empty() && parse_address(&self.sender).is_err() {
            return Err(ConfigError::InvalidSender);
        }

        if self.smtp.enabled() && self.sendgrid.enabled() {
            return Err(ConfigError::Conflict);
        }

        if self.smtp.enabled() {
            self.smtp.validate()?;
        }

        if available {
            self.backoff.validate()?;
        }

        Ok(())
    }

    /// Display name of the sender.
    ///
    /// An explicit `sender_name` wins; otherwise the name part of a
    /// `Name <addr>` sender is used; otherwise the name is empty.
    pub fn sender_name(&self) -> String {
        if !self.sender_name.is_empty() {
            return self.sender_name.clone();
        }

        parse_address(&self.sender)
            .ok()
            .and_then(|mailbox| mailbox.name)
            .unwrap_or_default()
    }

    /// Sender address including the effective display name
    pub fn from_address(&self) -> String {
        let name = self.sender_name();
        match parse_address(&self.sender) {
            Ok(mailbox) if !name.is_empty() => Mailbox::new(Some(name), mailbox.email).to_string(),
            _ => self.sender.clone(),
        }
    }
}

impl SmtpConfig {
    pub fn enabled(&self) -> bool {
        !self.host.is_empty()
    }

    /// Get SMTP server address
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::MissingPort);
        }

        if self.pool_size == 0 {
            return Err(ConfigError::PoolSize);
        }

        if self.use_cram_md5 && (self.username.is_empty() || self.password.is_empty()) {
            return Err(ConfigError::CramMd5Auth);
        }

        Ok(())
    }
}

impl SendGridConfig {
    pub fn enabled(&self) -> bool {
        !self.api_key.is_empty()
    }
}

impl BackoffConfig {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.initial_interval.is_zero() {
            return Err(ConfigError::InitialInterval);
        }

        if self.max_interval.is_zero() {
            return Err(ConfigError::MaxInterval);
        }

        if self.max_elapsed_time.is_zero() {
            return Err(ConfigError::MaxElapsedTime);
        }

        if self.timeout.is_zero() {
            return Err(ConfigError::Timeout);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn smtp_config() -> SmtpConfig {
        SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 587,
            username: "admin".to_string(),
            password: "supersecret".to_string(),
            use_cram_md5: false,
            pool_size: 4,
        }
    }

    fn sendgrid_config() -> SendGridConfig {
        SendGridConfig {
            api_key: "sg:fakeapikey".to_string(),
            ..Default::default()
        }
    }

    fn sendgrid_email_config() -> EmailConfig {
        EmailConfig {
            sender: "peony@example.com".to_string(),
            sendgrid: sendgrid_config(),
            ..Default::default()
        }
    }

    #[test]
    fn test_config_from_lookup() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("EMAIL_SENDER", "Jane Szack <jane@example.com>"),
            ("EMAIL_SENDER_NAME", "Jane Szack"),
            ("EMAIL_TESTING", "true"),
            ("EMAIL_SMTP_HOST", "smtp.example.com"),
            ("EMAIL_SMTP_PORT", "25"),
            ("EMAIL_SMTP_USERNAME", "jszack"),
            ("EMAIL_SMTP_PASSWORD", "supersecret"),
            ("EMAIL_SMTP_USE_CRAM_MD5", "true"),
            ("EMAIL_SMTP_POOL_SIZE", "16"),
            ("EMAIL_SENDGRID_API_KEY", "sg:fakeapikey"),
            ("EMAIL_BACKOFF_TIMEOUT_MS", "1500"),
        ]);

        let config =
            EmailConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();

        assert_eq!(config.sender, "Jane Szack <jane@example.com>");
        assert_eq!(config.sender_name, "Jane Szack");
        assert!(config.testing);
        assert_eq!(config.smtp.host, "smtp.example.com");
        assert_eq!(config.smtp.port, 25);
        assert_eq!(config.smtp.username, "jszack");
        assert_eq!(config.smtp.password, "supersecret");
        assert!(config.smtp.use_cram_md5);
        assert_eq!(config.smtp.pool_size, 16);
        assert_eq!(config.sendgrid.api_key, "sg:fakeapikey");
        assert_eq!(config.sendgrid.base_url, "https://api.sendgrid.com");
        assert_eq!(config.backoff.timeout, Duration::from_millis(1500));
        assert_eq!(config.backoff.initial_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_config_from_lookup_defaults() {
        let config = EmailConfig::from_lookup(|_| None).unwrap();
        assert!(!config.available());
        assert!(!config.testing);
        assert_eq!(config.smtp.port, 587);
        assert_eq!(config.smtp.pool_size, 2);
        assert_eq!(config.backoff, BackoffConfig::default());
    }

    #[test]
    fn test_config_from_lookup_invalid_number() {
        let result = EmailConfig::from_lookup(|key| {
            (key == "EMAIL_SMTP_PORT").then(|| "not-a-port".to_string())
        });
        let err = result.unwrap_err();
        assert!(err.to_string().contains("EMAIL_SMTP_PORT"));

        let result = EmailConfig::from_lookup(|key| {
            (key == "EMAIL_BACKOFF_MAX_INTERVAL_MS").then(|| "soon".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_config_available() {
        assert!(!EmailConfig::default().available());

        let config = EmailConfig {
            smtp: SmtpConfig {
                host: "email.example.com".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.available());

        let config = EmailConfig {
            sendgrid: sendgrid_config(),
            ..Default::default()
        };
        assert!(config.available());

        let config = EmailConfig {
            testing: true,
            ..Default::default()
        };
        assert!(!config.available());
    }

    #[test]
    fn test_config_validation_valid() {
        let configs = vec![
            EmailConfig::default(),
            EmailConfig {
                testing: true,
                ..Default::default()
            },
            sendgrid_email_config(),
            EmailConfig {
                sender: "peony@example.com".to_string(),
                smtp: smtp_config(),
                ..Default::default()
            },
            EmailConfig {
                sender: "Peony Quarterdeck <peony@example.com>".to_string(),
                ..sendgrid_email_config()
            },
            EmailConfig {
                sender: "peony@example.com".to_string(),
                smtp: SmtpConfig {
                    use_cram_md5: true,
                    ..smtp_config()
                },
                ..Default::default()
            },
        ];

        for (i, config) in configs.iter().enumerate() {
            assert!(config.validate().is_ok(), "test case {} failed", i);
        }
    }

    #[test]
    fn test_config_validation_invalid() {
        let cases = vec![
            (
                EmailConfig {
                    smtp: SmtpConfig {
                        host: "email.example.com".to_string(),
                        ..Default::default()
                    },
                    ..Default::default()
                },
                ConfigError::MissingSender,
            ),
            (
                EmailConfig {
                    sender: String::new(),
                    ..sendgrid_email_config()
                },
                ConfigError::MissingSender,
            ),
            (
                EmailConfig {
                    sender: "foo".to_string(),
                    smtp: smtp_config(),
                    ..Default::default()
                },
                ConfigError::InvalidSender,
            ),
            (
                EmailConfig {
                    sender: "orchid@example.com".to_string(),
                    smtp: smtp_config(),
                    sendgrid: sendgrid_config(),
                    ..Default::default()
                },
                ConfigError::Conflict,
            ),
            (
                EmailConfig {
                    sender: "orchid@example.com".to_string(),
                    smtp: SmtpConfig {
                        port: 0,
                        ..smtp_config()
                    },
                    ..Default::default()
                },
                ConfigError::MissingPort,
            ),
            (
                EmailConfig {
                    sender: "orchid@example.com".to_string(),
                    smtp: SmtpConfig {
                        pool_size: 0,
                        ..smtp_config()
                    },
                    ..Default::default()
                },
                ConfigError::PoolSize,
            ),
            (
                EmailConfig {
                    sender: "orchid@example.com".to_string(),
                    smtp: SmtpConfig {
                        use_cram_md5: true,
                        username: String::new(),
                        password: String::new(),
                        ..smtp_config()
                    },
                    ..Default::default()
                },
                ConfigError::CramMd5Auth,
            ),
        ];

        for (i, (config, expected)) in cases.into_iter().enumerate() {
            assert_eq!(config.validate(), Err(expected), "test case {} failed", i);
        }
    }

    #[test]
    fn test_config_validation_backoff() {
        let zero = Duration::ZERO;
        let cases = vec![
            (
                BackoffConfig {
                    initial_interval: zero,
                    ..Default::default()
                },
                ConfigError::InitialInterval,
            ),
            (
                BackoffConfig {
                    max_interval: zero,
                    ..Default::default()
                },
                ConfigError::MaxInterval,
            ),
            (
                BackoffConfig {
                    max_elapsed_time: zero,
                    ..Default::default()
                },
                ConfigError::MaxElapsedTime,
            ),
            (
                BackoffConfig {
                    timeout: zero,
                    ..Default::default()
                },
                ConfigError::Timeout,
            ),
        ];

        for (i, (backoff, expected)) in cases.into_iter().enumerate() {
            let config = EmailConfig {
                backoff,
                ..sendgrid_email_config()
            };
            assert_eq!(config.validate(), Err(expected), "test case {} failed", i);
        }
    }

    #[test]
    fn test_config_validation_backoff_ignored_when_unavailable() {
        let config = EmailConfig {
            testing: true,
            backoff: BackoffConfig {
                initial_interval: Duration::ZERO,
                max_interval: Duration::ZERO,
                max_elapsed_time: Duration::ZERO,
                timeout: Duration::ZERO,
            },
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_conflict_checked_after_sender() {
        let config = EmailConfig {
            smtp: smtp_config(),
            sendgrid: sendgrid_config(),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::MissingSender));
    }

    #[test]
    fn test_telemetry_config_default() {
        let config = TelemetryConfig::default();
        assert_eq!(config.log_format, "pretty");
        assert!(config.metrics_enabled);
    }

    #[test]
    fn test_smtp_addr() {
        let config = SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 527,
            ..Default::default()
        };
        assert_eq!(config.addr(), "smtp.example.com:527");
    }

    #[test]
    fn test_sender_name() {
        let cases = vec![
            ("Jane Szack <jane@example.com>", "", "Jane Szack"),
            ("jane@example.com", "", ""),
            ("", "Jane Szack", "Jane Szack"),
            ("", "", ""),
            ("foo", "", ""),
            ("John Doe <john.doe@example.com>", "Jane Szack", "Jane Szack"),
            ("john.doe@example.com", "John Doe", "John Doe"),
        ];

        for (i, (sender, sender_name, expected)) in cases.into_iter().enumerate() {
            let config = EmailConfig {
                sender: sender.to_string(),
                sender_name: sender_name.to_string(),
                ..Default::default()
            };
            assert_eq!(config.sender_name(), expected, "test case {} failed", i);
        }
    }

    #[test]
    fn test_from_address() {
        let config = EmailConfig {
            sender: "jane@example.com".to_string(),
            sender_name: "Jane Szack".to_string(),
            ..Default::default()
        };
        let mailbox = parse_address(&config.from_address()).unwrap();
        assert_eq!(mailbox.name.as_deref(), Some("Jane Szack"));
        assert_eq!(mailbox.email.to_string(), "jane@example.com");

        let config = EmailConfig {
            sender: "jane@example.com".to_string(),
            ..Default::default()
        };
        assert_eq!(config.from_address(), "jane@example.com");
    }
}
