use std::{env, str::FromStr};

use chrono_tz::Tz;
use tracing::info;

use crate::error::ConfigError;

pub struct Config {
    pub port: u16,
    pub database: String,
    pub timezone: Tz,
}

impl Config {
    /// Reads the configuration from the environment. Unset keys fall back to defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            port: try_load(&lookup, "PORTAL_PORT", "7878")?,
            database: try_load(&lookup, "PORTAL_DB", "data.db")?,
            timezone: try_load(&lookup, "PORTAL_TIMEZONE", "Asia/Manila")?,
        })
    }
}

fn try_load<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: &str,
) -> Result<T, ConfigError> {
    let value = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    value
        .parse()
        .map_err(|_| ConfigError::InvalidValue { key, value })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults_when_unset() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config.port, 7878);
        assert_eq!(config.database, "data.db");
        assert_eq!(config.timezone, chrono_tz::Asia::Manila);
    }

    #[test]
    fn reads_overrides_and_rejects_garbage() {
        let vars: HashMap<&str, &str> =
            HashMap::from([("PORTAL_PORT", "8080"), ("PORTAL_TIMEZONE", "Europe/London")]);
        let config = Config::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.timezone, chrono_tz::Europe::London);

        let result = Config::from_lookup(|key| (key == "PORTAL_TIMEZONE").then(|| "Mars/Base".to_string()));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { key: "PORTAL_TIMEZONE", .. })
        ));
    }
}
