use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, VigilError};

const DEFAULT_API_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

impl std::str::FromStr for Theme {
    type Err = VigilError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            "system" | "" => Ok(Theme::System),
            other => Err(VigilError::Config(format!("unknown theme: {other}"))),
        }
    }
}

/// Presentation settings handed down to every panel explicitly.
/// Panels never look these up from ambient state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardContext {
    pub theme: Theme,
    pub organization: Option<String>,
}

impl DashboardContext {
    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Backend
    pub api_url: Url,
    pub api_token: Option<String>,
    pub request_timeout: Duration,

    // Presentation
    pub organization: Option<String>,
    pub theme: Theme,

    // Statistical signal query
    pub signal_threshold: f64,
    pub signal_limit: u32,
}

impl Config {
    /// Load configuration from `.env` and the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let config = Self::from_lookup(|key| std::env::var(key).ok())?;
        config.log_redacted();
        Ok(config)
    }

    /// Build a config from any key lookup. Unset keys fall back to defaults;
    /// set-but-invalid keys are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("VIGIL_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_url = Url::parse(&api_url)
            .map_err(|e| VigilError::Config(format!("VIGIL_API_URL is not a valid URL: {e}")))?;

        let timeout_secs: u64 = parse_or("VIGIL_TIMEOUT_SECS", lookup("VIGIL_TIMEOUT_SECS"), 30)?;
        if timeout_secs == 0 {
            return Err(VigilError::Config(
                "VIGIL_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }

        let theme = match lookup("VIGIL_THEME") {
            Some(raw) => raw.parse()?,
            None => Theme::default(),
        };

        Ok(Self {
            api_url,
            api_token: lookup("VIGIL_API_TOKEN").filter(|t| !t.is_empty()),
            request_timeout: Duration::from_secs(timeout_secs),
            organization: lookup("VIGIL_ORGANIZATION").filter(|o| !o.trim().is_empty()),
            theme,
            signal_threshold: parse_or(
                "VIGIL_SIGNAL_THRESHOLD",
                lookup("VIGIL_SIGNAL_THRESHOLD"),
                2.0,
            )?,
            signal_limit: parse_or("VIGIL_SIGNAL_LIMIT", lookup("VIGIL_SIGNAL_LIMIT"), 20)?,
        })
    }

    /// The presentation context derived from this config.
    pub fn dashboard_context(&self) -> DashboardContext {
        DashboardContext {
            theme: self.theme,
            organization: self.organization.clone(),
        }
    }

    pub fn log_redacted(&self) {
        fn preview_opt(val: &Option<String>) -> String {
            match val {
                Some(v) if !v.is_empty() => {
                    let head: String = v.chars().take(4).collect();
                    format!("{}...({} chars)", head, v.chars().count())
                }
                _ => "<not set>".to_string(),
            }
        }

        tracing::info!("Config loaded:");
        tracing::info!("  VIGIL_API_URL: {}", self.api_url);
        tracing::info!("  VIGIL_API_TOKEN: {}", preview_opt(&self.api_token));
        tracing::info!(
            "  VIGIL_ORGANIZATION: {}",
            self.organization.as_deref().unwrap_or("<all>")
        );
        tracing::info!("  VIGIL_TIMEOUT_SECS: {}", self.request_timeout.as_secs());
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T> {
    match raw {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| VigilError::Config(format!("{key} has an invalid value: {v}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.api_url.as_str(), "http://localhost:8000/");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.theme, Theme::System);
        assert_eq!(config.signal_limit, 20);
        assert!(config.api_token.is_none());
        assert!(config.organization.is_none());
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            ("VIGIL_API_URL", "https://pv.example.com"),
            ("VIGIL_THEME", "Dark"),
            ("VIGIL_ORGANIZATION", "acme-pharma"),
            ("VIGIL_SIGNAL_THRESHOLD", "3.5"),
        ]))
        .unwrap();
        assert_eq!(config.api_url.host_str(), Some("pv.example.com"));
        assert_eq!(config.theme, Theme::Dark);
        assert_eq!(config.signal_threshold, 3.5);

        let ctx = config.dashboard_context();
        assert_eq!(ctx.organization.as_deref(), Some("acme-pharma"));
        assert_eq!(ctx.theme, Theme::Dark);
    }

    #[test]
    fn invalid_values_are_config_errors() {
        assert!(Config::from_lookup(lookup_from(&[("VIGIL_API_URL", "not a url")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("VIGIL_TIMEOUT_SECS", "0")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("VIGIL_SIGNAL_LIMIT", "many")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("VIGIL_THEME", "neon")])).is_err());
    }

    #[test]
    fn blank_token_is_treated_as_unset() {
        let config = Config::from_lookup(lookup_from(&[("VIGIL_API_TOKEN", "")])).unwrap();
        assert!(config.api_token.is_none());
    }
}
