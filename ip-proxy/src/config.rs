use std::{collections::HashMap, fs, net::Ipv4Addr, path::Path};

use chrono::NaiveTime;
use ip_proxy_common::{Country, Direction, Reputation, ReputationGroup};
use serde::Deserialize;

use crate::{restrict::RestrictionWindow, Error, Policy, Result};

/// Proxy configuration as read from JSON.
///
/// ```
/// # use ip_proxy::ProxyConfig;
/// let config = ProxyConfig::from_json(r#"{
///     "geolocation": { "countries": { "RUSSIA": "both" } },
///     "reputation": { "enabled": true, "groups": { "TOR": "outbound" } },
///     "tor_whitelist": ["192.168.1.20"],
///     "time_restriction": { "enabled": true, "start": "22:00", "length_minutes": 480 }
/// }"#).unwrap();
/// assert!(config.policy().reputation_enabled);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub geolocation: GeolocationConfig,
    pub reputation: ReputationConfig,
    pub ip_whitelist: Vec<Ipv4Addr>,
    pub tor_whitelist: Vec<Ipv4Addr>,
    pub time_restriction: TimeRestrictionConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeolocationConfig {
    pub enabled: bool,
    pub countries: HashMap<Country, Direction>,
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            countries: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReputationConfig {
    pub enabled: bool,
    pub groups: HashMap<ReputationGroup, Direction>,
    pub categories: HashMap<Reputation, Direction>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeRestrictionConfig {
    pub enabled: bool,
    /// Local wall-clock start, `HH:MM`.
    pub start: String,
    pub length_minutes: u32,
}

impl Default for TimeRestrictionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            start: "00:00".to_string(),
            length_minutes: 0,
        }
    }
}

impl ProxyConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn policy(&self) -> Policy {
        for reputation in self.reputation.categories.keys() {
            if reputation.group() != Some(ReputationGroup::Tor) {
                tracing::warn!(
                    category = %reputation,
                    "only TOR categories can be configured individually, entry ignored"
                );
            }
        }

        Policy {
            geolocation_enabled: self.geolocation.enabled,
            geolocation: self.geolocation.countries.clone(),
            reputation_enabled: self.reputation.enabled,
            reputation_groups: self.reputation.groups.clone(),
            reputation_categories: self.reputation.categories.clone(),
            ip_whitelist: self.ip_whitelist.iter().copied().collect(),
            tor_whitelist: self.tor_whitelist.iter().copied().collect(),
        }
    }

    /// The configured LAN restriction window, `None` when restriction is disabled.
    pub fn restriction_window(&self) -> Result<Option<RestrictionWindow>> {
        let restriction = &self.time_restriction;
        if !restriction.enabled {
            return Ok(None);
        }

        let start = NaiveTime::parse_from_str(&restriction.start, "%H:%M")
            .map_err(|e| Error::InvalidWindow(format!("start '{}': {e}", restriction.start)))?;
        RestrictionWindow::new(start, restriction.length_minutes).map(Some)
    }
}
