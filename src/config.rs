use crate::date_key::TimezonePolicy;
use crate::errors::ConfigError;
use std::{env, path::PathBuf};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATA_PATH: &str = "data/streaks.json";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub port: u16,
    pub data_path: PathBuf,
    pub timezone: TimezonePolicy,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match lookup("PORT") {
            Some(value) => value
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(value))?,
            None => DEFAULT_PORT,
        };

        let data_path = lookup("APP_DATA_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_PATH));

        let timezone = match lookup("STREAK_TIMEZONE") {
            Some(value) => value.parse().map_err(ConfigError::InvalidTimezone)?,
            None => TimezonePolicy::default(),
        };

        Ok(Self {
            port,
            data_path,
            timezone,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = config(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.data_path, PathBuf::from("data/streaks.json"));
        assert_eq!(config.timezone, TimezonePolicy::Local);
    }

    #[test]
    fn reads_overrides() {
        let config = config(&[
            ("PORT", "9001"),
            ("APP_DATA_PATH", "/tmp/s.json"),
            ("STREAK_TIMEZONE", "utc"),
        ])
        .unwrap();
        assert_eq!(config.port, 9001);
        assert_eq!(config.data_path, PathBuf::from("/tmp/s.json"));
        assert_eq!(config.timezone, TimezonePolicy::Utc);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(config(&[("PORT", "http")]), Err(ConfigError::InvalidPort(_))));
        assert!(matches!(
            config(&[("STREAK_TIMEZONE", "mars")]),
            Err(ConfigError::InvalidTimezone(_))
        ));
    }
}
