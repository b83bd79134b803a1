use std::{env, path::PathBuf};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DATA_PATH: &str = "data/store.json";
pub const DEFAULT_STORAGE_KEY: &str = "NUTRI_CHILDREN_V1";

/// Runtime settings, read from `PORT`, `APP_DATA_PATH` and `APP_STORAGE_KEY`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub data_path: PathBuf,
    pub storage_key: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        Self {
            port: non_empty("PORT")
                .and_then(|value| value.trim().parse::<u16>().ok())
                .unwrap_or(defaults.port),
            data_path: non_empty("APP_DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_path),
            storage_key: non_empty("APP_STORAGE_KEY")
                .map(|value| value.trim().to_string())
                .unwrap_or(defaults.storage_key),
        }
    }
}
