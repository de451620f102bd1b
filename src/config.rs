use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Route catalog. Defaults to the built-in office routes when omitted.
    #[serde(default = "default_routes")]
    pub routes: Vec<RouteConfig>,
    /// Allowed CORS origins. Required unless cors_permissive is true.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Explicitly allow all origins (development only). Defaults to false.
    #[serde(default)]
    pub cors_permissive: bool,
    /// Live feed simulation settings
    #[serde(default)]
    pub feed: FeedConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteConfig {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Base departure time in 24-hour "HH:MM" form
    pub departure: String,
    #[serde(default)]
    pub stops: Vec<StopConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StopConfig {
    pub id: String,
    pub name: String,
}

/// Configuration for the simulated live feed
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Interval in milliseconds between feed ticks (default: 4500)
    #[serde(default = "FeedConfig::default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Delay in milliseconds before a join request commits (default: 600)
    #[serde(default = "FeedConfig::default_join_delay_ms")]
    pub join_delay_ms: u64,
    /// IANA timezone ETAs and the service day are displayed in (default: UTC)
    #[serde(default = "FeedConfig::default_timezone")]
    pub timezone: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: Self::default_tick_interval_ms(),
            join_delay_ms: Self::default_join_delay_ms(),
            timezone: Self::default_timezone(),
        }
    }
}

impl FeedConfig {
    fn default_tick_interval_ms() -> u64 {
        4500
    }
    fn default_join_delay_ms() -> u64 {
        600
    }
    fn default_timezone() -> String {
        "UTC".to_string()
    }
}

/// The routes the service ships with when the config file lists none.
pub(crate) fn default_routes() -> Vec<RouteConfig> {
    vec![
        RouteConfig {
            id: "1a".to_string(),
            name: "North Campus Shuttle".to_string(),
            description: "Departs 8:00 AM, stops at North/Main/IT Park".to_string(),
            departure: "08:00".to_string(),
            stops: vec![
                StopConfig {
                    id: "north".to_string(),
                    name: "North".to_string(),
                },
                StopConfig {
                    id: "main".to_string(),
                    name: "Main".to_string(),
                },
                StopConfig {
                    id: "it-park".to_string(),
                    name: "IT Park".to_string(),
                },
            ],
        },
        RouteConfig {
            id: "2b".to_string(),
            name: "Central Express".to_string(),
            description: "Departs 8:15 AM, express to HQ only".to_string(),
            departure: "08:15".to_string(),
            stops: vec![StopConfig {
                id: "hq".to_string(),
                name: "HQ".to_string(),
            }],
        },
        RouteConfig {
            id: "3c".to_string(),
            name: "East Side Loop".to_string(),
            description: "Departs 8:25 AM, stops at Eastside, Market, HQ".to_string(),
            departure: "08:25".to_string(),
            stops: vec![
                StopConfig {
                    id: "eastside".to_string(),
                    name: "Eastside".to_string(),
                },
                StopConfig {
                    id: "market".to_string(),
                    name: "Market".to_string(),
                },
                StopConfig {
                    id: "hq".to_string(),
                    name: "HQ".to_string(),
                },
            ],
        },
    ]
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::ReadError(e.to_string()))?;

        serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to parse config: {0}")]
    ParseError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.routes.len(), 3);
        assert_eq!(config.routes[0].id, "1a");
        assert!(config.cors_origins.is_empty());
        assert!(!config.cors_permissive);
        assert_eq!(config.feed.tick_interval_ms, 4500);
        assert_eq!(config.feed.join_delay_ms, 600);
        assert_eq!(config.feed.timezone, "UTC");
    }

    #[test]
    fn explicit_routes_override_defaults() {
        let yaml = r#"
routes:
  - id: "x1"
    name: "Test Route"
    description: "A route"
    departure: "07:30"
    stops:
      - { id: "a", name: "Stop A" }
feed:
  tick_interval_ms: 1000
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.routes.len(), 1);
        assert_eq!(config.routes[0].departure, "07:30");
        assert_eq!(config.routes[0].stops.len(), 1);
        assert_eq!(config.feed.tick_interval_ms, 1000);
        // Unset feed fields still default
        assert_eq!(config.feed.join_delay_ms, 600);
    }

    #[test]
    fn stops_default_to_empty() {
        let yaml = r#"
routes:
  - id: "x1"
    name: "Test Route"
    description: "A route"
    departure: "07:30"
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.routes[0].stops.is_empty());
    }
}
