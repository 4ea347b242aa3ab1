use std::env;
use std::str::FromStr;

use anyhow::{Context, Result};

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub api_prefix: String,

    // Rate limiting
    pub rate_protected_per_min: u32,

    /// Seconds between background scheduler sweeps.
    pub scheduler_interval_secs: u64,
    /// Lifetime of a cached (country, year) holiday list.
    pub holiday_cache_ttl_secs: u64,
    pub log_dir: String,
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn or_default<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
            rate_protected_per_min: or_default("RATE_PROTECTED_PER_MIN", 1000)?,
            scheduler_interval_secs: or_default("SCHEDULER_INTERVAL_SECS", 86_400)?,
            holiday_cache_ttl_secs: or_default("HOLIDAY_CACHE_TTL_SECS", 86_400)?,
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_or_falls_back() {
        // SAFETY: single test touching this variable
        unsafe { env::set_var("HRM_TEST_INTERVAL", "60") };
        assert_eq!(or_default::<u64>("HRM_TEST_INTERVAL", 5).unwrap(), 60);
        assert_eq!(or_default::<u64>("HRM_TEST_UNSET_INTERVAL", 5).unwrap(), 5);

        unsafe { env::set_var("HRM_TEST_BAD_RATE", "lots") };
        assert!(or_default::<u32>("HRM_TEST_BAD_RATE", 1).is_err());
    }
}
