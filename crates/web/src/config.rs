//! Application configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `HOCSKIN_DATABASE_URL` - `SQLite` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `HOCSKIN_HOST` - Bind address (default: 127.0.0.1)
//! - `HOCSKIN_PORT` - Listen port (default: 5000)
//! - `HOCSKIN_BASE_URL` - Public URL (default: <http://localhost:5000>)
//! - `HOCSKIN_STATIC_DIR` - Static files, result images, reports (default: crates/web/static)
//! - `HOCSKIN_CATALOG_PATH` - Recommendation catalog override (JSON)
//! - `HOCSKIN_MAX_IMAGE_DIM` - Longest edge of analyzed images (default: 400)
//! - `MODEL_SERVER_URL` - Detection model server base URL
//! - `MODEL_CONFIDENCE` - Detection confidence threshold (default: 0.25)
//! - `REPORT_FONT_DIR` - Directory with the report TTF fonts (default: crates/web/fonts)
//! - `REPORT_FONT_FAMILY` - Font family file prefix (default: `LiberationSans`)
//! - `SMTP_HOST`, `SMTP_PORT` (587), `SMTP_USERNAME`, `SMTP_PASSWORD`, `SMTP_FROM`,
//!   `CONTACT_RECIPIENT` - Contact form delivery (all of host/username/password
//!   needed to enable it)
//! - `CHATBOT_API_KEY` - Chatbot API key (enables the chatbot)
//! - `CHATBOT_MODEL` - Model name (default: gemini-1.5-flash)
//! - `CHATBOT_API_URL` - API base URL
//! - `CHATBOT_DOCUMENT` - Knowledge document (default: crates/web/chatbot/knowledge.md)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

const DEFAULT_CHATBOT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// HocSkin application configuration.
#[derive(Debug, Clone)]
pub struct HocSkinConfig {
    /// `SQLite` database connection URL
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL
    pub base_url: String,
    /// Root of the static tree (CSS, `results/`, `reports/`)
    pub static_dir: PathBuf,
    /// Optional catalog JSON replacing the built-in one
    pub catalog_path: Option<PathBuf>,
    /// Longest edge an uploaded image is shrunk to
    pub max_image_dim: u32,
    /// Detection model server
    pub models: ModelServerConfig,
    /// PDF report fonts
    pub report: ReportConfig,
    /// Contact form delivery; `None` disables sending
    pub smtp: Option<SmtpConfig>,
    /// Chatbot API; `None` disables the chatbot
    pub chatbot: Option<ChatbotConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Detection model server configuration.
#[derive(Debug, Clone)]
pub struct ModelServerConfig {
    /// Base URL; `None` means every model reports "not configured"
    pub url: Option<String>,
    /// Minimum detection confidence
    pub confidence: f32,
}

/// PDF report configuration.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub font_dir: PathBuf,
    pub font_family: String,
}

/// SMTP configuration for the contact form.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub from_address: String,
    /// Where contact messages are delivered
    pub contact_recipient: String,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .field("contact_recipient", &self.contact_recipient)
            .finish()
    }
}

/// Chatbot API configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct ChatbotConfig {
    pub api_key: SecretString,
    pub model: String,
    pub api_url: String,
    /// Knowledge document the chatbot answers from
    pub document: PathBuf,
}

impl std::fmt::Debug for ChatbotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatbotConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("api_url", &self.api_url)
            .field("document", &self.document)
            .finish()
    }
}

impl HocSkinConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("HOCSKIN_DATABASE_URL")?;
        let host = parse_env("HOCSKIN_HOST", "127.0.0.1")?;
        let port = parse_env("HOCSKIN_PORT", "5000")?;
        let base_url = get_env_or_default("HOCSKIN_BASE_URL", "http://localhost:5000");
        let static_dir = PathBuf::from(get_env_or_default(
            "HOCSKIN_STATIC_DIR",
            "crates/web/static",
        ));
        let catalog_path = get_optional_env("HOCSKIN_CATALOG_PATH").map(PathBuf::from);
        let max_image_dim: u32 = parse_env("HOCSKIN_MAX_IMAGE_DIM", "400")?;
        if max_image_dim == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "HOCSKIN_MAX_IMAGE_DIM".to_string(),
                "must be positive".to_string(),
            ));
        }

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            static_dir,
            catalog_path,
            max_image_dim,
            models: ModelServerConfig::from_env()?,
            report: ReportConfig::from_env(),
            smtp: SmtpConfig::from_env()?,
            chatbot: ChatbotConfig::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Directory annotated analysis images are written to.
    #[must_use]
    pub fn results_dir(&self) -> PathBuf {
        self.static_dir.join("results")
    }

    /// Directory generated PDF reports are written to.
    #[must_use]
    pub fn reports_dir(&self) -> PathBuf {
        self.static_dir.join("reports")
    }
}

impl ModelServerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let confidence: f32 = parse_env("MODEL_CONFIDENCE", "0.25")?;
        if !(0.0..=1.0).contains(&confidence) {
            return Err(ConfigError::InvalidEnvVar(
                "MODEL_CONFIDENCE".to_string(),
                "must be between 0 and 1".to_string(),
            ));
        }
        Ok(Self {
            url: get_optional_env("MODEL_SERVER_URL"),
            confidence,
        })
    }
}

impl Default for ModelServerConfig {
    fn default() -> Self {
        Self {
            url: None,
            confidence: 0.25,
        }
    }
}

impl ReportConfig {
    fn from_env() -> Self {
        Self {
            font_dir: PathBuf::from(get_env_or_default("REPORT_FONT_DIR", "crates/web/fonts")),
            font_family: get_env_or_default("REPORT_FONT_FAMILY", "LiberationSans"),
        }
    }
}

impl SmtpConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let (Some(host), Some(username), Some(password)) = (
            get_optional_env("SMTP_HOST"),
            get_optional_env("SMTP_USERNAME"),
            get_optional_env("SMTP_PASSWORD"),
        ) else {
            return Ok(None);
        };

        let port = parse_env("SMTP_PORT", "587")?;
        let from_address = get_optional_env("SMTP_FROM").unwrap_or_else(|| username.clone());
        let contact_recipient =
            get_optional_env("CONTACT_RECIPIENT").unwrap_or_else(|| username.clone());

        Ok(Some(Self {
            host,
            port,
            username,
            password: SecretString::from(password),
            from_address,
            contact_recipient,
        }))
    }
}

impl ChatbotConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        if get_optional_env("CHATBOT_API_KEY").is_none() {
            return Ok(None);
        }

        Ok(Some(Self {
            api_key: get_validated_secret("CHATBOT_API_KEY")?,
            model: get_env_or_default("CHATBOT_MODEL", "gemini-1.5-flash"),
            api_url: get_env_or_default("CHATBOT_API_URL", DEFAULT_CHATBOT_API_URL),
            document: PathBuf::from(get_env_or_default(
                "CHATBOT_DOCUMENT",
                "crates/web/chatbot/knowledge.md",
            )),
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable (or its default) into `T`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a real API key."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn test_config() -> HocSkinConfig {
        HocSkinConfig {
            database_url: SecretString::from("sqlite::memory:"),
            host: "127.0.0.1".parse().unwrap(),
            port: 5000,
            base_url: "http://localhost:5000".to_string(),
            static_dir: PathBuf::from("/srv/hocskin/static"),
            catalog_path: None,
            max_image_dim: 400,
            models: ModelServerConfig::default(),
            report: ReportConfig {
                font_dir: PathBuf::from("fonts"),
                font_family: "LiberationSans".to_string(),
            },
            smtp: None,
            chatbot: None,
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_shannon_entropy_high() {
        let entropy = shannon_entropy("aB3$xY9!mK2@nL5#");
        assert!(entropy > 3.3);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-api-key-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("AIzaSyB3xY9mK2nL5pQ7rT0uW4zC6dE8fG1hJ", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_socket_addr() {
        let addr = test_config().socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 5000);
    }

    #[test]
    fn test_static_subdirectories() {
        let config = test_config();
        assert_eq!(config.results_dir(), PathBuf::from("/srv/hocskin/static/results"));
        assert_eq!(config.reports_dir(), PathBuf::from("/srv/hocskin/static/reports"));
    }

    #[test]
    fn test_smtp_config_debug_redacts_password() {
        let config = SmtpConfig {
            host: "smtp.gmail.com".to_string(),
            port: 587,
            username: "hoctechkurumsal@gmail.com".to_string(),
            password: SecretString::from("super_secret_smtp_password"),
            from_address: "hoctechkurumsal@gmail.com".to_string(),
            contact_recipient: "hoctechkurumsal@gmail.com".to_string(),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("smtp.gmail.com"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_smtp_password"));
    }

    #[test]
    fn test_chatbot_config_debug_redacts_key() {
        let config = ChatbotConfig {
            api_key: SecretString::from("AIzaSy-very-real-key"),
            model: "gemini-1.5-flash".to_string(),
            api_url: DEFAULT_CHATBOT_API_URL.to_string(),
            document: PathBuf::from("knowledge.md"),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("gemini-1.5-flash"));
        assert!(!debug_output.contains("AIzaSy-very-real-key"));
    }
}
