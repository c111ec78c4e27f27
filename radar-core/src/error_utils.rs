use crate::error::*;
use std::fmt::{Debug, Display};
use std::time::Duration;
use tracing::{error, info, warn};

/// Classification and logging helpers shared by every error type.
pub trait ErrorExt: Display + Debug {
    /// Stable machine-readable code, used as a log field.
    fn error_code(&self) -> &'static str;

    /// What to tell the operator.
    fn user_friendly_message(&self) -> String;

    fn is_retryable(&self) -> bool {
        false
    }

    /// Server-requested wait, when there was one.
    fn retry_after(&self) -> Option<Duration> {
        None
    }

    fn log_error(&self) -> &Self {
        error!(code = self.error_code(), "{}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!(code = self.error_code(), "{}", self);
        self
    }
}

impl ErrorExt for CoreError {
    fn error_code(&self) -> &'static str {
        match self {
            CoreError::ProductHunt(_) => "PRODUCTHUNT",
            CoreError::Telegram(_) => "TELEGRAM",
            CoreError::State(_) => "STATE",
            CoreError::Config(_) => "CONFIG",
            CoreError::Network(_) => "NETWORK",
            CoreError::InvalidInput { .. } => "INVALID_INPUT",
            CoreError::Internal { .. } => "INTERNAL",
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::ProductHunt(e) => e.user_friendly_message(),
            CoreError::Telegram(e) => e.user_friendly_message(),
            CoreError::State(e) => e.user_friendly_message(),
            CoreError::Config(e) => e.user_friendly_message(),
            CoreError::Network(_) => {
                "Network connection error. Please check your internet connection.".to_string()
            }
            CoreError::InvalidInput { message } => format!("Invalid input: {}", message),
            _ => "An unexpected error occurred. Please try again later.".to_string(),
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            CoreError::ProductHunt(e) => e.is_retryable(),
            CoreError::Telegram(e) => e.is_retryable(),
            CoreError::Network(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            CoreError::ProductHunt(e) => e.retry_after(),
            CoreError::Telegram(e) => e.retry_after(),
            _ => None,
        }
    }

    fn log_error(&self) -> &Self {
        let detail = match self {
            CoreError::ProductHunt(e) => Some(e.error_code()),
            CoreError::Telegram(e) => Some(e.error_code()),
            CoreError::State(e) => Some(e.error_code()),
            CoreError::Config(e) => Some(e.error_code()),
            _ => None,
        };
        error!(code = self.error_code(), detail = detail.unwrap_or("-"), "{}", self);
        self
    }
}

impl ErrorExt for ProductHuntError {
    fn error_code(&self) -> &'static str {
        match self {
            ProductHuntError::InvalidToken => "PH_INVALID_TOKEN",
            ProductHuntError::Forbidden => "PH_FORBIDDEN",
            ProductHuntError::RateLimitExceeded { .. } => "PH_RATE_LIMIT",
            ProductHuntError::GraphQl { .. } => "PH_GRAPHQL",
            ProductHuntError::PostNotFound { .. } => "PH_POST_NOT_FOUND",
            ProductHuntError::RequestTimeout => "PH_TIMEOUT",
            ProductHuntError::InvalidResponse { .. } => "PH_INVALID_RESPONSE",
            ProductHuntError::ServerError { .. } => "PH_SERVER_ERROR",
            ProductHuntError::UnexpectedStatus { .. } => "PH_UNEXPECTED_STATUS",
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ProductHuntError::InvalidToken => {
                "Product Hunt rejected the token. Please check PRODUCTHUNT_TOKEN.".to_string()
            }
            ProductHuntError::Forbidden => {
                "Product Hunt denied access. Please check the PRODUCTHUNT_TOKEN scopes.".to_string()
            }
            ProductHuntError::RateLimitExceeded { retry_after } => format!(
                "Product Hunt rate limit hit. Please wait {} seconds.",
                retry_after
            ),
            ProductHuntError::PostNotFound { slug } => {
                format!("No Product Hunt launch found for '{}'.", slug)
            }
            ProductHuntError::GraphQl { messages } => {
                format!("Product Hunt rejected the query: {}", messages)
            }
            _ => "Product Hunt is not answering properly right now. Please try again later."
                .to_string(),
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProductHuntError::RateLimitExceeded { .. }
                | ProductHuntError::RequestTimeout
                | ProductHuntError::ServerError { .. }
        )
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            ProductHuntError::RateLimitExceeded { retry_after } => {
                Some(Duration::from_secs(*retry_after))
            }
            _ => None,
        }
    }
}

impl ErrorExt for TelegramError {
    fn error_code(&self) -> &'static str {
        match self {
            TelegramError::Api { .. } => "TG_API",
            TelegramError::RateLimited { .. } => "TG_RATE_LIMIT",
            TelegramError::Unauthorized => "TG_UNAUTHORIZED",
            TelegramError::ChatNotFound { .. } => "TG_CHAT_NOT_FOUND",
            TelegramError::InvalidResponse { .. } => "TG_INVALID_RESPONSE",
            TelegramError::RequestTimeout => "TG_TIMEOUT",
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            TelegramError::Unauthorized => {
                "Telegram rejected the bot token. Please check TELEGRAM_BOT_TOKEN.".to_string()
            }
            TelegramError::ChatNotFound { chat_id } => format!(
                "Chat '{}' not found. Make sure the bot is an admin of the channel.",
                chat_id
            ),
            TelegramError::RateLimited { retry_after } => format!(
                "Telegram rate limit hit. Please wait {} seconds.",
                retry_after
            ),
            TelegramError::Api { description, .. } => {
                format!("Telegram refused the message: {}", description)
            }
            _ => "Telegram delivery failed. Please try again later.".to_string(),
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            TelegramError::RateLimited { .. } | TelegramError::RequestTimeout
        )
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            TelegramError::RateLimited { retry_after } => Some(Duration::from_secs(*retry_after)),
            _ => None,
        }
    }
}

impl ErrorExt for StateError {
    fn error_code(&self) -> &'static str {
        match self {
            StateError::WriteFailed { .. } => "STATE_WRITE_FAILED",
            StateError::DirectoryFailed { .. } => "STATE_DIRECTORY_FAILED",
            StateError::EncodeFailed { .. } => "STATE_ENCODE_FAILED",
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            StateError::WriteFailed { path, .. } | StateError::DirectoryFailed { path, .. } => {
                format!(
                    "Could not write state at {}. Duplicate posts are possible until this is fixed.",
                    path
                )
            }
            StateError::EncodeFailed { path, .. } => {
                format!("Could not encode state for {}.", path)
            }
        }
    }
}

impl ErrorExt for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            ConfigError::FileNotFound { .. } => "CONFIG_FILE_NOT_FOUND",
            ConfigError::InvalidFormat { .. } => "CONFIG_INVALID_FORMAT",
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE",
            ConfigError::MissingEnvironmentVariable { .. } => "CONFIG_MISSING_ENV_VAR",
            ConfigError::Parse(_) => "CONFIG_PARSE_ERROR",
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ConfigError::FileNotFound { path } => {
                format!("Configuration file not found at {}.", path)
            }
            ConfigError::InvalidFormat { details } => {
                format!("Configuration file could not be read: {}", details)
            }
            ConfigError::InvalidValue { field, value } => {
                format!("Invalid value '{}' for {}.", value, field)
            }
            ConfigError::MissingEnvironmentVariable { var_name } => format!(
                "Environment variable '{}' is required but not set.",
                var_name
            ),
            ConfigError::Parse(e) => format!("Configuration file is not valid TOML: {}", e),
        }
    }
}

/// Logs an error once with its code, the operator-facing message and any
/// retry hint.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorReporter;

impl ErrorReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn report_error<E: ErrorExt + ?Sized>(&self, error: &E) {
        error.log_error();
        info!("{}", error.user_friendly_message());
        if let Some(wait) = error.retry_after() {
            info!("Retry possible after {:?}", wait);
        }
    }
}
