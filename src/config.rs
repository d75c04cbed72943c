use crate::errors::{LedgerError, LedgerResult};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub server_port: u16,
    pub default_page_limit: usize,
    pub max_page_limit: usize,
    pub cors_allow_any: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            server_port: 3001,
            default_page_limit: 50,
            max_page_limit: 200,
            cors_allow_any: true,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> LedgerResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> LedgerResult<Self> {
        let defaults = Self::default();

        let server_port = parse_or(&get, "SERVER_PORT", defaults.server_port)?;
        let default_page_limit = parse_or(&get, "DEFAULT_PAGE_LIMIT", defaults.default_page_limit)?;
        let max_page_limit = parse_or(&get, "MAX_PAGE_LIMIT", defaults.max_page_limit)?;
        let cors_allow_any = parse_or(&get, "CORS_ALLOW_ANY", defaults.cors_allow_any)?;

        if default_page_limit == 0 || default_page_limit > max_page_limit {
            return Err(LedgerError::Config(format!(
                "DEFAULT_PAGE_LIMIT must be in 1..={max_page_limit}, got {default_page_limit}"
            )));
        }

        Ok(Self {
            data_dir: get("DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            server_port,
            default_page_limit,
            max_page_limit,
            cors_allow_any,
        })
    }

    /// Clamp a requested page size to the configured bounds.
    pub fn page_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_page_limit)
            .clamp(1, self.max_page_limit)
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> LedgerResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| LedgerError::Config(format!("{key}: {e}"))),
        None => Ok(default),
    }
}
