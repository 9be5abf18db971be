use std::time::Duration;

use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_API_URL: &str = "https://api.wakatime.com/api/v1/";
const HEARTBEATS_PATH: &str = "users/current/heartbeats";

/// Read-only view of the user's settings, captured once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigSnapshot {
    pub api_key: String,
    pub enabled: bool,
    pub debug: bool,
    pub project_name: String,
}

impl ConfigSnapshot {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(ConfigSnapshot {
            api_key: lookup("WAKATIME_API_KEY").unwrap_or_default(),
            enabled: parse_bool(&lookup, "WAKATIME_ENABLED")?.unwrap_or(true),
            debug: parse_bool(&lookup, "WAKATIME_DEBUG")?.unwrap_or(false),
            project_name: lookup("WAKATIME_PROJECT").unwrap_or_default(),
        })
    }

    pub fn is_active(&self) -> bool {
        self.enabled && !self.api_key.is_empty()
    }
}

/// Engine tuning that does not come from the user.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_url: String,
    /// Minimum spacing between non-forced sends. May be zero or negative.
    pub cooldown_secs: f64,
    pub rate_limit_backoff_secs: f64,
    pub request_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            api_url: DEFAULT_API_URL.to_owned(),
            cooldown_secs: 1.0,
            rate_limit_backoff_secs: 60.0,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Settings::default();

        Ok(Settings {
            api_url: lookup("WAKATIME_API_URL").unwrap_or(defaults.api_url),
            cooldown_secs: parse_f64(&lookup, "WAKATIME_COOLDOWN_SECS")?
                .unwrap_or(defaults.cooldown_secs),
            rate_limit_backoff_secs: parse_f64(&lookup, "WAKATIME_RATE_LIMIT_BACKOFF_SECS")?
                .unwrap_or(defaults.rate_limit_backoff_secs),
            request_timeout: parse_f64(&lookup, "WAKATIME_TIMEOUT_SECS")?
                .filter(|secs| *secs > 0.0)
                .map(Duration::from_secs_f64)
                .unwrap_or(defaults.request_timeout),
        })
    }

    pub fn ingestion_url(&self) -> Result<Url, ConfigError> {
        let invalid = |source| ConfigError::InvalidUrl {
            url: self.api_url.clone(),
            source,
        };

        let mut base = Url::parse(&self.api_url).map_err(invalid)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        base.join(HEARTBEATS_PATH).map_err(invalid)
    }
}

fn parse_bool(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<bool>, ConfigError> {
    let value = match lookup(key) {
        Some(v) => v,
        None => return Ok(None),
    };

    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        "" => Ok(None),
        _ => Err(ConfigError::InvalidBool {
            key: key.to_owned(),
            value,
        }),
    }
}

fn parse_f64(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<f64>, ConfigError> {
    let value = match lookup(key) {
        Some(v) if !v.trim().is_empty() => v,
        _ => return Ok(None),
    };

    match value.trim().parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(Some(n)),
        _ => Err(ConfigError::InvalidNumber {
            key: key.to_owned(),
            value,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn snapshot_defaults_to_enabled_without_key() {
        let config = ConfigSnapshot::from_lookup(lookup(&[])).unwrap();

        assert!(config.enabled);
        assert!(!config.debug);
        assert!(!config.is_active());
    }

    #[test]
    fn snapshot_reads_all_keys() {
        let config = ConfigSnapshot::from_lookup(lookup(&[
            ("WAKATIME_API_KEY", "waka_123"),
            ("WAKATIME_ENABLED", "yes"),
            ("WAKATIME_DEBUG", "1"),
            ("WAKATIME_PROJECT", "Platformer"),
        ]))
        .unwrap();

        assert_eq!(config.api_key, "waka_123");
        assert!(config.debug);
        assert_eq!(config.project_name, "Platformer");
        assert!(config.is_active());
    }

    #[test]
    fn disabled_snapshot_is_inactive() {
        let config = ConfigSnapshot::from_lookup(lookup(&[
            ("WAKATIME_API_KEY", "waka_123"),
            ("WAKATIME_ENABLED", "off"),
        ]))
        .unwrap();

        assert!(!config.is_active());
    }

    #[test]
    fn garbage_bool_is_rejected() {
        let err = ConfigSnapshot::from_lookup(lookup(&[("WAKATIME_DEBUG", "maybe")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBool { .. }));
    }

    #[test]
    fn settings_accept_negative_cooldown() {
        let settings = Settings::from_lookup(lookup(&[
            ("WAKATIME_COOLDOWN_SECS", "-2.5"),
            ("WAKATIME_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();

        assert_eq!(settings.cooldown_secs, -2.5);
        assert_eq!(settings.request_timeout, Duration::from_secs(5));
        assert_eq!(settings.rate_limit_backoff_secs, 60.0);
    }

    #[test]
    fn settings_reject_non_numbers() {
        let err = Settings::from_lookup(lookup(&[("WAKATIME_COOLDOWN_SECS", "soon")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { .. }));
    }

    #[test]
    fn ingestion_url_tolerates_missing_slash() {
        let mut settings = Settings::default();
        assert_eq!(
            settings.ingestion_url().unwrap().as_str(),
            "https://api.wakatime.com/api/v1/users/current/heartbeats"
        );

        settings.api_url = "http://127.0.0.1:8080/api/v1".into();
        assert_eq!(
            settings.ingestion_url().unwrap().as_str(),
            "http://127.0.0.1:8080/api/v1/users/current/heartbeats"
        );
    }

    #[test]
    fn bad_api_url_is_reported() {
        let settings = Settings {
            api_url: "not a url".into(),
            ..Settings::default()
        };
        assert!(matches!(
            settings.ingestion_url(),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }
}
