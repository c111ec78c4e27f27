//! Runtime configuration.
//!
//! Secrets come from the environment (optionally seeded from `.env`).
//! Everything else can also be set in a TOML file: `RADAR_CONFIG` if set,
//! otherwise `radar.toml` in the working directory when it exists.
//! Environment variables override the file.

use crate::error::ConfigError;
use chrono_tz::Tz;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_STATE_DIR: &str = ".state";
pub const DEFAULT_CONFIG_FILE: &str = "radar.toml";
pub const POSTED_IDS_FILE: &str = "posted_ids.json";
pub const ROTATION_FILE: &str = "last_subcat.txt";
pub const DEFAULT_LOG_FILE: &str = "logs/bot.log";
pub const DEFAULT_LOG_RETENTION_DAYS: usize = 30;

pub const ENV_CONFIG_PATH: &str = "RADAR_CONFIG";
pub const ENV_PRODUCTHUNT_TOKEN: &str = "PRODUCTHUNT_TOKEN";
pub const ENV_TELEGRAM_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const ENV_TELEGRAM_CHAT_ID: &str = "TELEGRAM_CHAT_ID";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub producthunt_token: Option<String>,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub state_dir: PathBuf,
    pub log_level: String,
    pub log: LogFileConfig,
    pub schedule: ScheduleConfig,
    pub http: HttpConfig,
    /// Overrides the built-in finance subcategory order when set.
    pub subcategories: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    pub post_time: PostTime,
    pub timezone: Tz,
    pub mode: ScheduledMode,
    pub top: usize,
}

/// Daily-rotated log file next to console output. `path: None` turns it off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFileConfig {
    pub path: Option<PathBuf>,
    pub retention_days: usize,
}

impl LogFileConfig {
    /// Directory and file name prefix for the rolling appender.
    pub fn parts(&self) -> Option<(PathBuf, String)> {
        let path = self.path.as_deref()?;
        let name = path.file_name()?.to_str()?.to_string();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Some((dir, name))
    }
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub page_size: u32,
}

/// Borrowed delivery credentials, present only once validated.
#[derive(Debug, Clone, Copy)]
pub struct TelegramCredentials<'a> {
    pub bot_token: &'a str,
    pub chat_id: &'a str,
}

/// Daily wall-clock time in `HH:MM` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostTime {
    pub hour: u32,
    pub minute: u32,
}

impl FromStr for PostTime {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidValue {
            field: "POST_TIME".to_string(),
            value: s.to_string(),
        };

        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        let hour: u32 = h.parse().map_err(|_| invalid())?;
        let minute: u32 = m.parse().map_err(|_| invalid())?;
        if hour > 23 || minute > 59 {
            return Err(invalid());
        }
        Ok(Self { hour, minute })
    }
}

impl fmt::Display for PostTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Which run mode the scheduler fires each day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledMode {
    Discover,
    Best,
    Rotate,
}

impl FromStr for ScheduledMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "discover" => Ok(Self::Discover),
            "best" => Ok(Self::Best),
            "rotate" => Ok(Self::Rotate),
            other => Err(ConfigError::InvalidValue {
                field: "schedule.mode".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for ScheduledMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Discover => "discover",
            Self::Best => "best",
            Self::Rotate => "rotate",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    schedule: FileSchedule,
    rotation: FileRotation,
    state: FileState,
    http: FileHttp,
    log_level: Option<String>,
    log_file: Option<String>,
    log_retention_days: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileSchedule {
    post_time: Option<String>,
    timezone: Option<String>,
    mode: Option<String>,
    top: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileRotation {
    subcategories: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileState {
    dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileHttp {
    timeout_secs: Option<u64>,
    page_size: Option<u32>,
}

impl AppConfig {
    /// Load from `.env`, the optional TOML file and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let file_contents = match std::env::var(ENV_CONFIG_PATH).ok() {
            Some(path) => Some(read_config_file(Path::new(&path))?),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Some(read_config_file(default_path)?)
                } else {
                    None
                }
            }
        };

        Self::from_sources(file_contents.as_deref(), |key| std::env::var(key).ok())
    }

    /// Build a config from TOML text and an environment lookup.
    pub fn from_sources<F>(file_contents: Option<&str>, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file: FileConfig = match file_contents {
            Some(text) => toml::from_str(text)?,
            None => FileConfig::default(),
        };
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let post_time = env("POST_TIME")
            .or(file.schedule.post_time)
            .unwrap_or_else(|| "09:00".to_string())
            .parse::<PostTime>()?;

        let tz_name = env("TIMEZONE")
            .or(file.schedule.timezone)
            .unwrap_or_else(|| "UTC".to_string());
        let timezone = tz_name
            .trim()
            .parse::<Tz>()
            .map_err(|_| ConfigError::InvalidValue {
                field: "TIMEZONE".to_string(),
                value: tz_name.clone(),
            })?;

        let mode = match file.schedule.mode {
            Some(mode) => mode.parse()?,
            None => ScheduledMode::Discover,
        };

        let timeout_secs = match env("HTTP_TIMEOUT_SECS") {
            Some(raw) => parse_number("HTTP_TIMEOUT_SECS", &raw)?,
            None => file.http.timeout_secs.unwrap_or(30),
        };
        let page_size = match env("PH_PAGE_SIZE") {
            Some(raw) => parse_number("PH_PAGE_SIZE", &raw)?,
            None => file.http.page_size.unwrap_or(20),
        };
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "HTTP_TIMEOUT_SECS".to_string(),
                value: "0".to_string(),
            });
        }
        if page_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "PH_PAGE_SIZE".to_string(),
                value: "0".to_string(),
            });
        }

        let log_path = env("LOG_FILE")
            .or(file.log_file)
            .unwrap_or_else(|| DEFAULT_LOG_FILE.to_string());
        let log = LogFileConfig {
            path: match log_path.trim() {
                "off" | "none" => None,
                path => Some(PathBuf::from(path)),
            },
            retention_days: match env("LOG_RETENTION_DAYS") {
                Some(raw) => parse_number("LOG_RETENTION_DAYS", &raw)?,
                None => file
                    .log_retention_days
                    .unwrap_or(DEFAULT_LOG_RETENTION_DAYS),
            }
            .max(1),
        };

        let subcategories = file
            .rotation
            .subcategories
            .map(|subcats| {
                subcats
                    .into_iter()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|subcats| !subcats.is_empty());

        Ok(Self {
            producthunt_token: env(ENV_PRODUCTHUNT_TOKEN),
            telegram_bot_token: env(ENV_TELEGRAM_BOT_TOKEN),
            telegram_chat_id: env(ENV_TELEGRAM_CHAT_ID),
            state_dir: env("STATE_DIR")
                .map(PathBuf::from)
                .or(file.state.dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR)),
            log_level: env("LOG_LEVEL")
                .or(file.log_level)
                .unwrap_or_else(|| "info".to_string()),
            log,
            schedule: ScheduleConfig {
                post_time,
                timezone,
                mode,
                top: file.schedule.top.unwrap_or(3).max(1),
            },
            http: HttpConfig {
                timeout_secs,
                page_size,
            },
            subcategories,
        })
    }

    pub fn require_producthunt_token(&self) -> Result<&str, ConfigError> {
        self.producthunt_token
            .as_deref()
            .ok_or_else(|| missing(ENV_PRODUCTHUNT_TOKEN))
    }

    pub fn require_telegram(&self) -> Result<TelegramCredentials<'_>, ConfigError> {
        let bot_token = self
            .telegram_bot_token
            .as_deref()
            .ok_or_else(|| missing(ENV_TELEGRAM_BOT_TOKEN))?;
        let chat_id = self
            .telegram_chat_id
            .as_deref()
            .ok_or_else(|| missing(ENV_TELEGRAM_CHAT_ID))?;
        Ok(TelegramCredentials { bot_token, chat_id })
    }

    pub fn posted_ids_path(&self) -> PathBuf {
        self.state_dir.join(POSTED_IDS_FILE)
    }

    pub fn rotation_path(&self) -> PathBuf {
        self.state_dir.join(ROTATION_FILE)
    }

    /// Debug-log the loaded values with secrets masked.
    pub fn log_summary(&self) {
        fn preview(val: &Option<String>) -> String {
            match val {
                Some(v) => {
                    let n = v.chars().take(4).collect::<String>();
                    format!("{}...({} chars)", n, v.len())
                }
                None => "<not set>".to_string(),
            }
        }

        tracing::debug!("Config loaded:");
        tracing::debug!("  PRODUCTHUNT_TOKEN: {}", preview(&self.producthunt_token));
        tracing::debug!("  TELEGRAM_BOT_TOKEN: {}", preview(&self.telegram_bot_token));
        tracing::debug!("  TELEGRAM_CHAT_ID: {:?}", self.telegram_chat_id);
        tracing::debug!("  STATE_DIR: {}", self.state_dir.display());
        match &self.log.path {
            Some(path) => tracing::debug!(
                "  LOG_FILE: {} (kept {} days)",
                path.display(),
                self.log.retention_days
            ),
            None => tracing::debug!("  LOG_FILE: off"),
        }
        tracing::debug!(
            "  schedule: {} {} ({})",
            self.schedule.post_time,
            self.schedule.timezone,
            self.schedule.mode
        );
    }
}

fn read_config_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ConfigError::FileNotFound {
            path: path.display().to_string(),
        },
        _ => ConfigError::InvalidFormat {
            details: format!("{}: {}", path.display(), e),
        },
    })
}

fn parse_number<T: FromStr>(field: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        field: field.to_string(),
        value: raw.to_string(),
    })
}

fn missing(var_name: &str) -> ConfigError {
    ConfigError::MissingEnvironmentVariable {
        var_name: var_name.to_string(),
    }
}
