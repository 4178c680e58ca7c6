//! Analysis settings read from the environment.

use std::time::Duration;

/// Default number of wait-and-recheck rounds before a caller gives up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default deadline for a pop analysis.
pub const DEFAULT_POP_TIMEOUT: Duration = Duration::from_secs(30);

/// Default city name used in prompts.
pub const DEFAULT_CITY_NAME: &str = "Almaty";

/// Settings for [`crate::AnalysisCache`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// How many times a caller re-checks a scope that another caller is
    /// generating before failing with `Unavailable`.
    pub max_attempts: u32,
    /// Deadline for [`crate::AnalysisCache::pop_analysis_with_timeout`].
    pub pop_timeout: Duration,
    /// City name substituted into prompts.
    pub city_name: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            pop_timeout: DEFAULT_POP_TIMEOUT,
            city_name: DEFAULT_CITY_NAME.to_string(),
        }
    }
}

impl AnalysisConfig {
    /// Reads `ANALYSIS_MAX_ATTEMPTS`, `POP_ANALYSIS_TIMEOUT_SECS`, and
    /// `CITY_NAME`. Unset or unparseable values fall back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let max_attempts = parse_var("ANALYSIS_MAX_ATTEMPTS")
            .filter(|n: &u32| *n > 0)
            .unwrap_or(defaults.max_attempts);
        let pop_timeout = parse_var("POP_ANALYSIS_TIMEOUT_SECS")
            .map_or(defaults.pop_timeout, Duration::from_secs);
        let city_name = std::env::var("CITY_NAME")
            .ok()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(defaults.city_name);

        Self {
            max_attempts,
            pop_timeout,
            city_name,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("Ignoring invalid {name}={raw:?}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.pop_timeout, Duration::from_secs(30));
        assert_eq!(config.city_name, "Almaty");
    }
}
