use serde::Deserialize;
use std::{fmt::Display, fs, path::Path, time::Duration};
use tokio::{fs::File, io::AsyncReadExt};

use crate::screens::polling::{PollTimings, DEFAULT_GRACE_PERIOD, DEFAULT_POLL_INTERVAL};

pub mod sections;

pub use sections::{ApiConfiguration, CoreConfiguration, LogConfiguration, PollingConfiguration};

/// Backend base url injected at build time, used when the configuration has none
pub const BUILD_BACKEND_URL: Option<&str> = option_env!("VERIFICATION_BACKEND_URL");

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_LOG_RETENTION: usize = 7;

#[derive(Deserialize, Clone, Debug, Default)]
pub struct Configuration {
    #[serde(default)]
    pub api: ApiConfiguration,
    #[serde(default)]
    pub polling: PollingConfiguration,
    #[serde(default)]
    pub core: CoreConfiguration,
    #[serde(default)]
    pub log: LogConfiguration,
}

impl Configuration {
    pub fn assert_data_dir_permissions(&self) -> Result<(), &str> {
        let data_dir = self.data_directory();

        if data_dir.trim().is_empty() {
            return Err("data dir cannot be empty");
        }

        let path = Path::new(&data_dir);

        match path.try_exists() {
            Ok(true) => {}
            Ok(false) => return Err("data dir does not exist"),
            Err(_) => return Err("data dir access is denied"),
        }

        if !path.is_dir() {
            return Err("data dir is not a directory");
        }

        let permissions = match fs::metadata(path) {
            Ok(m) => m.permissions(),
            Err(_) => return Err("cannot read data dir metadata"),
        };

        if permissions.readonly() {
            return Err("data_dir cannot be readonly");
        }

        Ok(())
    }

    pub fn data_directory(&self) -> String {
        self.core
            .data_directory
            .clone()
            .unwrap_or_else(|| ".".to_string())
    }

    /// Configured backend url, falling back to the one injected at build time
    pub fn backend_url(&self) -> Result<String, ConfigurationError> {
        self.api
            .backend_url
            .clone()
            .or_else(|| BUILD_BACKEND_URL.map(str::to_string))
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .ok_or_else(|| {
                ConfigurationError::new(
                    "no backend url, set [api] backend_url or build with VERIFICATION_BACKEND_URL"
                        .to_string(),
                )
            })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn poll_timings(&self) -> PollTimings {
        PollTimings {
            interval: self
                .polling
                .interval
                .filter(|i| *i > 0)
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_POLL_INTERVAL),
            grace_period: self
                .polling
                .grace_period
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_GRACE_PERIOD),
        }
    }

    pub fn auto_return(&self) -> bool {
        self.polling.auto_return.unwrap_or(false)
    }

    pub fn log_level(&self) -> String {
        self.log.level.clone().unwrap_or_else(|| "Info".to_string())
    }

    pub fn log_retention(&self) -> usize {
        self.log.retention.unwrap_or(DEFAULT_LOG_RETENTION)
    }
}

pub async fn get_configuration(
    file_path: String,
) -> Result<Configuration, Box<dyn std::error::Error + Send + Sync>> {
    let path = Path::new(&file_path);

    if !path.exists() {
        return Err(Box::new(ConfigurationError::new(format!(
            "configuration file is missing: {file_path}"
        ))));
    }

    let mut file = File::open(path).await?;
    let mut buffer = vec![];

    file.read_to_end(&mut buffer).await?;

    let result = String::from_utf8(buffer)?;

    match toml::from_str::<Configuration>(&result) {
        Ok(c) => Ok(c),
        Err(e) => Err(Box::new(ConfigurationError::new(format!(
            "configuration file is corrupted: {e}"
        )))),
    }
}

#[derive(Debug)]
pub struct ConfigurationError {
    reason: String,
}

impl ConfigurationError {
    pub fn new(reason: String) -> Self {
        Self { reason }
    }
}

impl Display for ConfigurationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reason)
    }
}

impl std::error::Error for ConfigurationError {}
