use std::{collections::HashMap, fs, io, path::Path};

use thiserror::Error;

use crate::topics::THINGSBOARD_PORT;

pub const POLL_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_CONFIG_PATH: &str = "wiser-gateway.conf";
pub const DEFAULT_DEVICE_PREFIX: &str = "Wiser";
pub const DEFAULT_DEVICE_PROFILE: &str = "default";

const KEY_HUB_SECRET: &str = "hubkey";
const KEY_HUB_ADDRESS: &str = "hubip";
const KEY_TB_SERVER: &str = "tbserver";
const KEY_TB_TOKEN: &str = "tbtoken";
const KEY_TB_PREFIX: &str = "tbprefix";
const KEY_TB_PROFILE: &str = "tbprofile";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read configuration file {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("hub settings missing from configuration: {}", .0.join(", "))]
    MissingHubSettings(Vec<&'static str>),
    #[error("ThingsBoard settings missing from configuration: {}", .0.join(", "))]
    MissingTelemetrySettings(Vec<&'static str>),
    #[error("hub address {0} is not supported: the hub is reached over plain http")]
    UnsupportedHubAddress(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubSettings {
    pub address: String,
    pub secret: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetrySettings {
    pub server: String,
    pub port: u16,
    pub token: String,
    pub device_prefix: String,
    pub device_profile: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub hub: HubSettings,
    pub telemetry: TelemetrySettings,
}

impl GatewayConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| line.split_once('='))
            .map(|(key, value)| (key.trim().to_ascii_lowercase(), value.trim().to_string()))
            .filter(|(_, value)| !value.is_empty())
            .collect();

        let [hub_secret, hub_address] = required(&values, [KEY_HUB_SECRET, KEY_HUB_ADDRESS])
            .map_err(ConfigError::MissingHubSettings)?;
        let [server, token] = required(&values, [KEY_TB_SERVER, KEY_TB_TOKEN])
            .map_err(ConfigError::MissingTelemetrySettings)?;

        if let Some((scheme, _)) = hub_address.split_once("://") {
            if !scheme.eq_ignore_ascii_case("http") {
                return Err(ConfigError::UnsupportedHubAddress(hub_address));
            }
        }

        let optional = |key: &str, default: &str| {
            values
                .get(key)
                .cloned()
                .unwrap_or_else(|| default.to_string())
        };

        Ok(Self {
            hub: HubSettings {
                address: hub_address,
                secret: hub_secret,
            },
            telemetry: TelemetrySettings {
                server,
                port: THINGSBOARD_PORT,
                token,
                device_prefix: optional(KEY_TB_PREFIX, DEFAULT_DEVICE_PREFIX),
                device_profile: optional(KEY_TB_PROFILE, DEFAULT_DEVICE_PROFILE),
            },
        })
    }
}

fn required<const N: usize>(
    values: &HashMap<String, String>,
    keys: [&'static str; N],
) -> Result<[String; N], Vec<&'static str>> {
    let missing: Vec<&'static str> = keys
        .iter()
        .copied()
        .filter(|key| !values.contains_key(*key))
        .collect();
    if !missing.is_empty() {
        return Err(missing);
    }
    Ok(keys.map(|key| values[key].clone()))
}

impl HubSettings {
    pub fn base_url(&self) -> String {
        let address = self.address.trim_end_matches('/');
        if address.starts_with("http://") {
            address.to_string()
        } else {
            format!("http://{address}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const FULL: &str = "\
# wiser gateway
hubkey = abc123
HubIP=192.168.1.20

tbserver=things.example.net
tbtoken=tok
tbprefix=Home
";

    #[test]
    fn parses_required_and_optional_keys() {
        let config = GatewayConfig::parse(FULL).unwrap();
        assert_eq!(
            config,
            GatewayConfig {
                hub: HubSettings {
                    address: "192.168.1.20".to_string(),
                    secret: "abc123".to_string(),
                },
                telemetry: TelemetrySettings {
                    server: "things.example.net".to_string(),
                    port: 1883,
                    token: "tok".to_string(),
                    device_prefix: "Home".to_string(),
                    device_profile: DEFAULT_DEVICE_PROFILE.to_string(),
                },
            }
        );
    }

    #[test]
    fn missing_hub_keys_are_reported_as_hub_error() {
        let err = GatewayConfig::parse("hubip=1.2.3.4\ntbserver=x\ntbtoken=y").unwrap_err();
        match err {
            ConfigError::MissingHubSettings(keys) => assert_eq!(keys, vec!["hubkey"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_telemetry_keys_are_reported_separately() {
        let err = GatewayConfig::parse("hubkey=k\nhubip=1.2.3.4\ntbtoken=").unwrap_err();
        match &err {
            ConfigError::MissingTelemetrySettings(keys) => {
                assert_eq!(keys, &vec!["tbserver", "tbtoken"])
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(
            err.to_string(),
            "ThingsBoard settings missing from configuration: tbserver, tbtoken"
        );
    }

    #[test]
    fn missing_file_is_unreadable() {
        let err = GatewayConfig::load("/nonexistent/wiser-gateway.conf").unwrap_err();
        assert!(matches!(err, ConfigError::Unreadable { .. }));
    }

    #[test]
    fn hub_base_url() {
        let mut hub = HubSettings {
            address: "192.168.1.20".to_string(),
            secret: String::new(),
        };
        assert_eq!(hub.base_url(), "http://192.168.1.20");
        hub.address = "http://127.0.0.1:8080/".to_string();
        assert_eq!(hub.base_url(), "http://127.0.0.1:8080");
    }

    #[test]
    fn https_hub_address_is_rejected() {
        let err = GatewayConfig::parse(
            "hubkey=k\nhubip=https://192.168.1.20\ntbserver=x\ntbtoken=y",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnsupportedHubAddress(ref address) if address == "https://192.168.1.20"
        ));

        let config =
            GatewayConfig::parse("hubkey=k\nhubip=http://192.168.1.20\ntbserver=x\ntbtoken=y")
                .unwrap();
        assert_eq!(config.hub.base_url(), "http://192.168.1.20");
    }
}
