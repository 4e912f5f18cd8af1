use prize_wheel_shared::{ForceOutcome, WheelConfig, WheelVariant};
use std::env;
use std::fmt;
use std::str::FromStr;
use tokio::time::Duration;

use crate::controller::Timings;

const DEFAULT_DEMO_SPINS: u32 = 20;

#[derive(Debug)]
pub enum ConfigError {
    InvalidVar { name: &'static str, value: String },
    ReadFile { path: String, source: std::io::Error },
    ParseFile { path: String, source: serde_json::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidVar { name, value } => write!(f, "Invalid value for {}: {:?}", name, value),
            Self::ReadFile { path, source } => write!(f, "Could not read {}: {}", path, source),
            Self::ParseFile { path, source } => write!(f, "Could not parse {}: {}", path, source),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::ParseFile { source, .. } => Some(source),
            Self::InvalidVar { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub variant: WheelVariant,
    pub wheel: WheelConfig,
    pub force: ForceOutcome,
    pub seed: Option<u64>,
    pub timings: Timings,
    pub demo_spins: u32,
}

impl DriverConfig {
    /// Reads settings from the environment, loading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name: &str| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let variant = parse_var(&lookup, "WHEEL_VARIANT", WheelVariant::Classic)?;
        let wheel = match lookup("WHEEL_CONFIG_PATH") {
            Some(path) => load_wheel_config(&path)?,
            None => variant.config(),
        };
        let defaults = Timings::default();
        let spin_delay_ms = parse_var(&lookup, "WHEEL_SPIN_DELAY_MS", defaults.spin_delay.as_millis() as u64)?;
        let celebration_ms = parse_var(&lookup, "WHEEL_CELEBRATION_MS", defaults.celebration.as_millis() as u64)?;

        Ok(Self {
            variant,
            wheel,
            force: parse_var(&lookup, "WHEEL_FORCE_OUTCOME", ForceOutcome::Auto)?,
            seed: parse_optional_var(&lookup, "WHEEL_SEED")?,
            timings: Timings {
                spin_delay: Duration::from_millis(spin_delay_ms),
                celebration: Duration::from_millis(celebration_ms),
                ..defaults
            },
            demo_spins: parse_var(&lookup, "WHEEL_DEMO_SPINS", DEFAULT_DEMO_SPINS)?,
        })
    }
}

fn parse_optional_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidVar { name, value }),
        None => Ok(None),
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    Ok(parse_optional_var(lookup, name)?.unwrap_or(default))
}

fn load_wheel_config(path: &str) -> Result<WheelConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_string(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::ParseFile {
        path: path.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = DriverConfig::from_lookup(lookup(&[])).expect("defaults");
        assert_eq!(config.variant, WheelVariant::Classic);
        assert_eq!(config.wheel, WheelConfig::classic());
        assert_eq!(config.force, ForceOutcome::Auto);
        assert_eq!(config.seed, None);
        assert_eq!(config.timings, Timings::default());
        assert_eq!(config.demo_spins, 20);
    }

    #[test]
    fn test_overrides() {
        let config = DriverConfig::from_lookup(lookup(&[
            ("WHEEL_VARIANT", "special_guest"),
            ("WHEEL_FORCE_OUTCOME", "win"),
            ("WHEEL_SEED", "1234"),
            ("WHEEL_SPIN_DELAY_MS", "500"),
            ("WHEEL_DEMO_SPINS", "3"),
        ]))
        .expect("valid overrides");
        assert_eq!(config.wheel, WheelConfig::prize_pool_with_special_guest());
        assert_eq!(config.force, ForceOutcome::Win);
        assert_eq!(config.seed, Some(1234));
        assert_eq!(config.timings.spin_delay, Duration::from_millis(500));
        assert_eq!(config.demo_spins, 3);
    }

    #[test]
    fn test_invalid_values() {
        let err = DriverConfig::from_lookup(lookup(&[("WHEEL_FORCE_OUTCOME", "always")]))
            .expect_err("bad outcome");
        assert!(matches!(err, ConfigError::InvalidVar { name: "WHEEL_FORCE_OUTCOME", .. }));

        let err = DriverConfig::from_lookup(lookup(&[("WHEEL_SEED", "-1")])).expect_err("bad seed");
        assert!(err.to_string().contains("WHEEL_SEED"));
    }

    #[test]
    fn test_missing_config_file() {
        let err = DriverConfig::from_lookup(lookup(&[("WHEEL_CONFIG_PATH", "/nonexistent/wheel.json")]))
            .expect_err("missing file");
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }
}
