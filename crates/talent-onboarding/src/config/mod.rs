use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use chrono::Duration;

const DEV_USER_SECRET: &str = "dev-user-session-secret-change-me";
const DEV_ADMIN_SECRET: &str = "dev-admin-session-secret-change-me";

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub database: DatabaseConfig,
    pub uploads: UploadConfig,
    pub auth: AuthConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "6061".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let database = DatabaseConfig {
            url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://onboarding.db".to_string()),
            max_connections: parse_number("DATABASE_MAX_CONNECTIONS", 5)?,
        };

        let uploads = UploadConfig {
            root: PathBuf::from(env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string())),
            max_body_bytes: parse_number("UPLOAD_MAX_BYTES", 25 * 1024 * 1024)?,
        };

        let auth = AuthConfig {
            user_secret: load_secret("JWT_SECRET", DEV_USER_SECRET, environment)?,
            admin_secret: load_secret("ADMIN_JWT_SECRET", DEV_ADMIN_SECRET, environment)?,
            session_ttl: parse_ttl("SESSION_TTL_HOURS", 24, Duration::try_hours)?,
            otp_ttl: parse_ttl("OTP_TTL_MINUTES", 10, Duration::try_minutes)?,
        };

        if auth.user_secret == auth.admin_secret {
            return Err(ConfigError::SharedSigningKey);
        }

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            database,
            uploads,
            auth,
        })
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { key }),
        Err(_) => Ok(default),
    }
}

/// Positive whole number of `unit`s, small enough to fit a `Duration`.
fn parse_ttl(
    key: &'static str,
    default: i64,
    unit: fn(i64) -> Option<Duration>,
) -> Result<Duration, ConfigError> {
    let value = parse_number(key, default)?;
    if value <= 0 {
        return Err(ConfigError::InvalidNumber { key });
    }
    unit(value).ok_or(ConfigError::InvalidNumber { key })
}

fn load_secret(
    key: &'static str,
    fallback: &str,
    environment: AppEnvironment,
) -> Result<String, ConfigError> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ if environment == AppEnvironment::Production => Err(ConfigError::MissingSecret { key }),
        _ => Ok(fallback.to_string()),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Relational store location and pool sizing.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Blob directory for uploaded images and the request body ceiling for multipart forms.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub root: PathBuf,
    pub max_body_bytes: usize,
}

/// Signing material for both principal kinds. Loaded once and never mutated.
#[derive(Clone)]
pub struct AuthConfig {
    pub user_secret: String,
    pub admin_secret: String,
    pub session_ttl: Duration,
    pub otp_ttl: Duration,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("user_secret", &"<redacted>")
            .field("admin_secret", &"<redacted>")
            .field("session_ttl", &self.session_ttl)
            .field("otp_ttl", &self.otp_ttl)
            .finish()
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str },
    MissingSecret { key: &'static str },
    SharedSigningKey,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key } => write!(f, "{key} must be a positive number"),
            ConfigError::MissingSecret { key } => {
                write!(f, "{key} must be set when APP_ENV=production")
            }
            ConfigError::SharedSigningKey => {
                write!(f, "JWT_SECRET and ADMIN_JWT_SECRET must differ")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "DATABASE_URL",
            "DATABASE_MAX_CONNECTIONS",
            "UPLOAD_DIR",
            "UPLOAD_MAX_BYTES",
            "JWT_SECRET",
            "ADMIN_JWT_SECRET",
            "SESSION_TTL_HOURS",
            "OTP_TTL_MINUTES",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 6061);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.uploads.root, PathBuf::from("uploads"));
        assert_eq!(config.auth.session_ttl, Duration::hours(24));
        assert_eq!(config.auth.otp_ttl, Duration::minutes(10));
        assert_ne!(config.auth.user_secret, config.auth.admin_secret);
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 6061));
    }

    #[test]
    fn production_requires_signing_secrets() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_ENV", "production");
        let err = AppConfig::load().expect_err("secrets are mandatory in production");
        assert!(matches!(err, ConfigError::MissingSecret { key: "JWT_SECRET" }));
        reset_env();
    }

    #[test]
    fn rejects_identical_user_and_admin_secrets() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("JWT_SECRET", "same-secret");
        env::set_var("ADMIN_JWT_SECRET", "same-secret");
        let err = AppConfig::load().expect_err("keys must be independent");
        assert!(matches!(err, ConfigError::SharedSigningKey));
        reset_env();
    }

    #[test]
    fn rejects_ttls_that_are_not_positive_or_overflow() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        for (key, raw) in [
            ("SESSION_TTL_HOURS", "0"),
            ("SESSION_TTL_HOURS", "-3"),
            ("OTP_TTL_MINUTES", "-1"),
            ("SESSION_TTL_HOURS", "9223372036854775807"),
        ] {
            reset_env();
            env::set_var(key, raw);
            let err = AppConfig::load().expect_err("ttl must be rejected");
            assert!(
                matches!(err, ConfigError::InvalidNumber { key: rejected } if rejected == key),
                "{key}={raw} gave {err}"
            );
        }

        reset_env();
        env::set_var("OTP_TTL_MINUTES", "15");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.auth.otp_ttl, Duration::minutes(15));
        reset_env();
    }
}
