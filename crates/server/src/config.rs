use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Runtime settings, read once at start-up from `BINGED_*` variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind: String,
    pub db_path: String,
    pub refresh_interval: Duration,
    /// Every n-th tick is a full fetch; 0 disables periodic full fetches.
    pub full_refresh_every: u32,
    pub cache_ttl: Duration,
    pub http_timeout: Duration,
    pub page_size: usize,
    pub preferred_rpdb_key: Option<String>,
    pub tmdb_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:7000".to_string(),
            db_path: "binged.db".to_string(),
            refresh_interval: Duration::from_secs(6 * 60 * 60),
            full_refresh_every: 4,
            cache_ttl: Duration::from_secs(7 * 24 * 60 * 60),
            http_timeout: Duration::from_secs(10),
            page_size: 100,
            preferred_rpdb_key: None,
            tmdb_key: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let text = |var: &str| {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Ok(Self {
            bind: text("BINGED_BIND").unwrap_or(defaults.bind),
            db_path: text("BINGED_DB").unwrap_or(defaults.db_path),
            refresh_interval: secs(text("BINGED_REFRESH_SECS"), "BINGED_REFRESH_SECS")?
                .unwrap_or(defaults.refresh_interval),
            full_refresh_every: number(text("BINGED_FULL_REFRESH_EVERY"), "BINGED_FULL_REFRESH_EVERY")?
                .unwrap_or(defaults.full_refresh_every),
            cache_ttl: secs(text("BINGED_CACHE_TTL_SECS"), "BINGED_CACHE_TTL_SECS")?
                .unwrap_or(defaults.cache_ttl),
            http_timeout: secs(text("BINGED_HTTP_TIMEOUT_SECS"), "BINGED_HTTP_TIMEOUT_SECS")?
                .unwrap_or(defaults.http_timeout),
            page_size: number(text("BINGED_PAGE_SIZE"), "BINGED_PAGE_SIZE")?
                .unwrap_or(defaults.page_size),
            preferred_rpdb_key: text("BINGED_PREFERRED_RPDB_KEY"),
            tmdb_key: text("BINGED_TMDB_KEY"),
        })
    }
}

fn number<T: std::str::FromStr>(
    value: Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError> {
    value
        .map(|v| v.parse().map_err(|_| ConfigError::Invalid { var, value: v }))
        .transpose()
}

fn secs(value: Option<String>, var: &'static str) -> Result<Option<Duration>, ConfigError> {
    match number::<u64>(value.clone(), var)? {
        Some(0) => Err(ConfigError::Invalid {
            var,
            value: value.unwrap_or_default(),
        }),
        other => Ok(other.map(Duration::from_secs)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|var| map.get(var).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        assert_eq!(load(&[]).unwrap(), Config::default());
        let cfg = Config::default();
        assert_eq!(cfg.cache_ttl, Duration::from_secs(604_800));
        assert_eq!(cfg.refresh_interval, Duration::from_secs(21_600));
    }

    #[test]
    fn reads_overrides() {
        let cfg = load(&[
            ("BINGED_BIND", "127.0.0.1:9000"),
            ("BINGED_REFRESH_SECS", "60"),
            ("BINGED_FULL_REFRESH_EVERY", "0"),
            ("BINGED_PAGE_SIZE", "25"),
            ("BINGED_PREFERRED_RPDB_KEY", " t1-abc "),
            ("BINGED_TMDB_KEY", ""),
        ])
        .unwrap();
        assert_eq!(cfg.bind, "127.0.0.1:9000");
        assert_eq!(cfg.refresh_interval, Duration::from_secs(60));
        assert_eq!(cfg.full_refresh_every, 0);
        assert_eq!(cfg.page_size, 25);
        assert_eq!(cfg.preferred_rpdb_key.as_deref(), Some("t1-abc"));
        assert_eq!(cfg.tmdb_key, None);
    }

    #[test]
    fn rejects_garbage_and_zero_durations() {
        let err = load(&[("BINGED_PAGE_SIZE", "lots")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                var: "BINGED_PAGE_SIZE",
                value: "lots".into()
            }
        );
        assert!(load(&[("BINGED_HTTP_TIMEOUT_SECS", "0")]).is_err());
    }
}
