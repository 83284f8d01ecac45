use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::workflows::submissions::{GenerationParams, ReviewPolicy};

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
    pub review: ReviewConfig,
    pub ai: AiConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            review: ReviewConfig::load()?,
            ai: AiConfig::load()?,
        })
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

/// Review-flow knobs exposed through the environment.
#[derive(Debug, Clone)]
pub struct ReviewConfig {
    pub peers_per_submission: usize,
    pub allow_self_review: bool,
    pub min_feedback_chars: usize,
    pub max_content_bytes: usize,
}

impl ReviewConfig {
    fn load() -> Result<Self, ConfigError> {
        let defaults = ReviewPolicy::default();
        Ok(Self {
            peers_per_submission: parse_env(
                "REVIEW_PEERS_PER_SUBMISSION",
                defaults.peers_per_submission,
            )?,
            allow_self_review: env_flag("REVIEW_ALLOW_SELF_REVIEW", defaults.allow_self_review),
            min_feedback_chars: parse_env(
                "REVIEW_MIN_FEEDBACK_CHARS",
                defaults.min_feedback_chars,
            )?,
            max_content_bytes: parse_env("REVIEW_MAX_CONTENT_BYTES", defaults.max_content_bytes)?,
        })
    }

    pub fn policy(&self) -> ReviewPolicy {
        let defaults = ReviewPolicy::default();
        ReviewPolicy {
            peers_per_submission: self.peers_per_submission,
            allow_self_review: self.allow_self_review,
            min_feedback_chars: self.min_feedback_chars,
            max_feedback_bytes: defaults.max_feedback_bytes,
            max_content_bytes: self.max_content_bytes,
        }
    }
}

/// Completion backend settings. A missing API key is not an error; it simply
/// disables the backend and routes all feedback through the fallback path.
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub request_timeout_secs: u64,
}

impl AiConfig {
    fn load() -> Result<Self, ConfigError> {
        let api_key = env::var("AI_API_KEY").ok().filter(|key| !key.is_empty());
        let base_url = env::var("AI_BASE_URL").unwrap_or_else(|_| {
            "https://generativelanguage.googleapis.com/v1beta/openai".to_string()
        });
        let model = env::var("AI_MODEL").unwrap_or_else(|_| "gemini-2.0-flash".to_string());

        Ok(Self {
            api_key,
            base_url,
            model,
            max_tokens: parse_env("AI_MAX_TOKENS", 3000)?,
            temperature: parse_env("AI_TEMPERATURE", 0.3)?,
            request_timeout_secs: parse_env("AI_TIMEOUT_SECS", 30)?,
        })
    }

    pub fn generation_params(&self) -> GenerationParams {
        GenerationParams {
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { key }),
        Err(_) => Ok(default),
    }
}

fn env_flag(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Err(_) => default,
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key } => {
                write!(f, "{key} must be a valid number")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort => None,
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidNumber { .. } => None,
        }
    }
}
