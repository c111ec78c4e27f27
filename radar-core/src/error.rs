use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Product Hunt API error: {0}")]
    ProductHunt(#[from] ProductHuntError),

    #[error("Telegram error: {0}")]
    Telegram(#[from] TelegramError),

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

#[derive(Error, Debug, Clone)]
pub enum ProductHuntError {
    #[error("Invalid Product Hunt token")]
    InvalidToken,

    #[error("Access forbidden: check the token's permissions")]
    Forbidden,

    #[error("Rate limit exceeded. Retry after {retry_after} seconds")]
    RateLimitExceeded { retry_after: u64 },

    #[error("GraphQL errors: {messages}")]
    GraphQl { messages: String },

    #[error("Post not found: {slug}")]
    PostNotFound { slug: String },

    #[error("Request timeout")]
    RequestTimeout,

    #[error("Invalid API response: {details}")]
    InvalidResponse { details: String },

    #[error("Server error: {status_code}")]
    ServerError { status_code: u16 },

    #[error("Unexpected status: {status_code}")]
    UnexpectedStatus { status_code: u16 },
}

#[derive(Error, Debug, Clone)]
pub enum TelegramError {
    #[error("Telegram API error {code}: {description}")]
    Api { code: u16, description: String },

    #[error("Rate limited by Telegram. Retry after {retry_after} seconds")]
    RateLimited { retry_after: u64 },

    #[error("Invalid bot token")]
    Unauthorized,

    #[error("Chat not found or bot not a member: {chat_id}")]
    ChatNotFound { chat_id: String },

    #[error("Invalid API response: {details}")]
    InvalidResponse { details: String },

    #[error("Request timeout")]
    RequestTimeout,
}

#[derive(Error, Debug)]
pub enum StateError {
    #[error("Failed to write state file {path}: {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create state directory {path}: {source}")]
    DirectoryFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode state for {path}: {source}")]
    EncodeFailed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid configuration format: {details}")]
    InvalidFormat { details: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Environment variable not set: {var_name}")]
    MissingEnvironmentVariable { var_name: String },

    #[error("Configuration parsing error: {0}")]
    Parse(#[from] toml::de::Error),
}
