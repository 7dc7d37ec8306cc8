//! Runtime configuration resolved from `ADHEREWISE_*` environment variables.

use std::path::PathBuf;

pub const DB_PATH_ENV: &str = "ADHEREWISE_DB_PATH";
pub const TRAINING_SAMPLES_ENV: &str = "ADHEREWISE_TRAINING_SAMPLES";
pub const SEED_ENV: &str = "ADHEREWISE_SEED";
pub const LOG_MODE_ENV: &str = "ADHEREWISE_LOG_MODE";
pub const LOG_FILE_ENV: &str = "ADHEREWISE_LOG_FILE";

/// Where log output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogMode {
    #[default]
    Stderr,
    File,
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// SQLite database holding the artifact, history and reference tables
    pub db_path: PathBuf,
    /// Size of the synthetic training set
    pub training_samples: usize,
    /// Seed for synthesis and training
    pub seed: u64,
    pub log_mode: LogMode,
    pub log_file: PathBuf,
    /// Invalid values replaced by defaults, reported once logging is up
    pub warnings: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("data/adherewise.db"),
            training_samples: 1000,
            seed: 42,
            log_mode: LogMode::Stderr,
            log_file: PathBuf::from("data/adherewise.log"),
            warnings: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Read the process environment.
    ///
    /// Invalid values are replaced by their defaults and recorded in
    /// [`AppConfig::warnings`].
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration through `lookup` instead of the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(v) = get(DB_PATH_ENV) {
            cfg.db_path = PathBuf::from(v);
        }

        if let Some(v) = get(TRAINING_SAMPLES_ENV) {
            match v.parse::<usize>() {
                Ok(n) if n > 0 => cfg.training_samples = n,
                _ => cfg.warnings.push(format!(
                    "Ignoring {TRAINING_SAMPLES_ENV}={v:?}; using {}",
                    cfg.training_samples
                )),
            }
        }

        if let Some(v) = get(SEED_ENV) {
            match v.parse::<u64>() {
                Ok(seed) => cfg.seed = seed,
                Err(_) => cfg
                    .warnings
                    .push(format!("Ignoring {SEED_ENV}={v:?}; using {}", cfg.seed)),
            }
        }

        if let Some(v) = get(LOG_MODE_ENV) {
            match v.to_lowercase().as_str() {
                "stderr" => cfg.log_mode = LogMode::Stderr,
                "file" => cfg.log_mode = LogMode::File,
                _ => cfg
                    .warnings
                    .push(format!("Ignoring {LOG_MODE_ENV}={v:?}; logging to stderr")),
            }
        }

        if let Some(v) = get(LOG_FILE_ENV) {
            cfg.log_file = PathBuf::from(v);
        }

        cfg
    }
}
