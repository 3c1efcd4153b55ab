use std::time::Duration;
use thiserror::Error;

pub const DEMO_KEY: &str = "DEMO_KEY";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a positive integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub strategy: Duration,
    pub image: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { strategy: Duration::from_secs(90), image: Duration::from_secs(60) }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub api_base: String,
    pub strategy_model: String,
    pub image_model: String,
    pub timeouts: Timeouts,
    pub session_ttl: Duration,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: DEMO_KEY.to_string(),
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            strategy_model: "gemini-3-pro-preview".to_string(),
            image_model: "gemini-2.5-flash-image".to_string(),
            timeouts: Timeouts::default(),
            session_ttl: Duration::from_secs(3600),
            port: 8080,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let text = |name: &str, default: String| get(name).filter(|v| !v.trim().is_empty()).unwrap_or(default);
        let number = |name: &'static str, default: u64| -> Result<u64, ConfigError> {
            match get(name) {
                None => Ok(default),
                Some(value) => value
                    .trim()
                    .parse::<u64>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or(ConfigError::InvalidNumber { name, value }),
            }
        };

        let defaults = Config::default();
        let port = number("PORT", u64::from(defaults.port))?;
        Ok(Self {
            api_key: text("GEMINI_API_KEY", defaults.api_key),
            api_base: text("GEMINI_API_BASE", defaults.api_base),
            strategy_model: text("STRATEGY_MODEL", defaults.strategy_model),
            image_model: text("IMAGE_MODEL", defaults.image_model),
            timeouts: Timeouts {
                strategy: Duration::from_secs(number("STRATEGY_TIMEOUT_SECS", defaults.timeouts.strategy.as_secs())?),
                image: Duration::from_secs(number("IMAGE_TIMEOUT_SECS", defaults.timeouts.image.as_secs())?),
            },
            session_ttl: Duration::from_secs(number("SESSION_TTL_SECS", defaults.session_ttl.as_secs())?),
            port: u16::try_from(port)
                .map_err(|_| ConfigError::InvalidNumber { name: "PORT", value: port.to_string() })?,
        })
    }

    pub fn is_demo(&self) -> bool {
        self.api_key == DEMO_KEY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_to_demo_mode() {
        let config = load(&[]).unwrap();
        assert!(config.is_demo());
        assert_eq!(config.port, 8080);
        assert_eq!(config.strategy_model, "gemini-3-pro-preview");
        assert_eq!(config.image_model, "gemini-2.5-flash-image");
        assert_eq!(config.timeouts, Timeouts::default());
        assert_eq!(config.session_ttl, Duration::from_secs(3600));
    }

    #[test]
    fn reads_overrides() {
        let config = load(&[
            ("GEMINI_API_KEY", "abc"),
            ("STRATEGY_TIMEOUT_SECS", "5"),
            ("IMAGE_TIMEOUT_SECS", " 7 "),
            ("PORT", "3000"),
            ("SESSION_TTL_SECS", "120"),
        ])
        .unwrap();
        assert_eq!(config.session_ttl, Duration::from_secs(120));
        assert!(!config.is_demo());
        assert_eq!(config.timeouts.strategy, Duration::from_secs(5));
        assert_eq!(config.timeouts.image, Duration::from_secs(7));
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn rejects_bad_numbers() {
        assert_eq!(
            load(&[("IMAGE_TIMEOUT_SECS", "soon")]).unwrap_err(),
            ConfigError::InvalidNumber { name: "IMAGE_TIMEOUT_SECS", value: "soon".into() }
        );
        assert!(load(&[("STRATEGY_TIMEOUT_SECS", "0")]).is_err());
        assert!(load(&[("PORT", "70000")]).is_err());
    }
}
