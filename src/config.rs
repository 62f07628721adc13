use crate::analysis::AnalyzerTiming;
use crate::error::ConfigError;
use std::env;
use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(format!("expected light or dark, got {other:?}")),
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Theme::Light => write!(f, "light"),
            Theme::Dark => write!(f, "dark"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub analysis: AnalyzerTiming,
    pub auth_delay: Duration,
    pub seed: Option<u64>,
    pub addr: SocketAddr,
    pub theme: Theme,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".trinetra"),
            analysis: AnalyzerTiming::default(),
            auth_delay: Duration::from_millis(1000),
            seed: None,
            addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            theme: Theme::default(),
        }
    }
}

impl Settings {
    /// Defaults overridden by `TRINETRA_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();
        if let Some(dir) = lookup("TRINETRA_DATA_DIR") {
            settings.data_dir = PathBuf::from(dir);
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "TRINETRA_ANALYSIS_DELAY_MS")? {
            settings.analysis.base = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "TRINETRA_ANALYSIS_JITTER_MS")? {
            settings.analysis.jitter = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "TRINETRA_AUTH_DELAY_MS")? {
            settings.auth_delay = Duration::from_millis(ms);
        }
        settings.seed = parse_var(&lookup, "TRINETRA_SEED")?;
        if let Some(addr) = parse_var(&lookup, "TRINETRA_ADDR")? {
            settings.addr = addr;
        }
        if let Some(theme) = parse_var(&lookup, "TRINETRA_THEME")? {
            settings.theme = theme;
        }
        Ok(settings)
    }

    /// Removes every simulated delay.
    pub fn without_delays(mut self) -> Self {
        self.analysis = AnalyzerTiming::instant();
        self.auth_delay = Duration::ZERO;
        self
    }
}

fn parse_var<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        debug!("{key} not set, using default");
        return Ok(None);
    };
    raw.trim().parse().map(Some).map_err(|err: T::Err| {
        warn!("Invalid {key} value: {err}");
        ConfigError::InvalidValue {
            key,
            value: raw.clone(),
            message: err.to_string(),
        }
    })
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
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_without_env() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings.data_dir, PathBuf::from(".trinetra"));
        assert_eq!(settings.analysis.base, Duration::from_millis(2000));
        assert_eq!(settings.analysis.jitter, Duration::from_millis(1000));
        assert_eq!(settings.auth_delay, Duration::from_millis(1000));
        assert_eq!(settings.seed, None);
        assert_eq!(settings.theme, Theme::Light);
    }

    #[test]
    fn env_overrides_defaults() {
        let settings = Settings::from_lookup(lookup(&[
            ("TRINETRA_DATA_DIR", "/tmp/trinetra"),
            ("TRINETRA_ANALYSIS_DELAY_MS", "0"),
            ("TRINETRA_SEED", "12"),
            ("TRINETRA_ADDR", "0.0.0.0:9000"),
            ("TRINETRA_THEME", "Dark"),
        ]))
        .unwrap();
        assert_eq!(settings.data_dir, PathBuf::from("/tmp/trinetra"));
        assert_eq!(settings.analysis.base, Duration::ZERO);
        assert_eq!(settings.seed, Some(12));
        assert_eq!(settings.addr.port(), 9000);
        assert_eq!(settings.theme, Theme::Dark);
    }

    #[test]
    fn invalid_values_are_errors() {
        let err = Settings::from_lookup(lookup(&[("TRINETRA_AUTH_DELAY_MS", "soon")])).unwrap_err();
        assert!(err.to_string().contains("TRINETRA_AUTH_DELAY_MS"));
    }
}
