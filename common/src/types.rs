use std::{
    collections::{BTreeMap, HashMap},
    fmt,
};

use serde::{Serialize, Serializer};

pub type DeviceId = u32;

pub type RoomMap = BTreeMap<String, RoomRecord>;

pub type DeviceIndex = HashMap<DeviceId, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriState {
    Off,
    On,
    #[default]
    Unknown,
}

impl TriState {
    // Anything that is not `"off"` reads as `On`, unrecognised text included.
    // It never yields `Unknown`; that is reserved for fields the hub omits.
    pub fn parse_on_off(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("off") {
            Self::Off
        } else {
            Self::On
        }
    }

    pub fn as_on_off(self) -> &'static str {
        match self {
            Self::Off => "Off",
            Self::On => "On",
            Self::Unknown => "Unknown",
        }
    }

    pub fn as_i8(self) -> i8 {
        match self {
            Self::Off => 0,
            Self::On => 1,
            Self::Unknown => -1,
        }
    }
}

impl fmt::Display for TriState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_on_off())
    }
}

impl Serialize for TriState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i8(self.as_i8())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum WindowState {
    Closed,
    Open,
    #[default]
    Unknown,
}

impl WindowState {
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.eq_ignore_ascii_case("closed") {
            Self::Closed
        } else if value.eq_ignore_ascii_case("open") {
            Self::Open
        } else {
            Self::Unknown
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "Closed",
            Self::Open => "Open",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for WindowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct HubState {
    pub heating: TriState,
    pub hotwater: TriState,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRecord {
    pub name: String,
    pub temperature: f64,
    pub window_state: WindowState,
    pub heat_request: TriState,
    pub device_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_voltage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_status: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<DeviceId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trv_temperature: Option<f64>,
}

impl RoomRecord {
    pub fn new(name: impl Into<String>, temperature: f64) -> Self {
        Self {
            name: name.into(),
            temperature,
            window_state: WindowState::Unknown,
            heat_request: TriState::Unknown,
            device_count: 0,
            battery_voltage: None,
            battery_status: None,
            product_type: None,
            device_id: None,
            trv_temperature: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
}

impl LinkState {
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Disconnected => 0,
            Self::Connecting => 1,
            Self::Connected => 2,
        }
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Connecting,
            2 => Self::Connected,
            _ => Self::Disconnected,
        }
    }
}

pub fn from_tenths(raw: i32) -> f64 {
    f64::from(raw) / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_on_off_case_insensitively() {
        for value in ["on", "On", "ON", " on "] {
            assert_eq!(TriState::parse_on_off(value), TriState::On);
        }
        for value in ["off", "Off", "OFF"] {
            assert_eq!(TriState::parse_on_off(value), TriState::Off);
        }
    }

    #[test]
    fn on_off_round_trips_through_text() {
        assert_eq!(TriState::parse_on_off("on").as_on_off(), "On");
        assert_eq!(TriState::parse_on_off("off").as_on_off(), "Off");
        assert_eq!(TriState::parse_on_off("on").as_i8(), 1);
        assert_eq!(TriState::parse_on_off("off").as_i8(), 0);
    }

    #[test]
    fn unrecognised_relay_text_reads_as_on() {
        assert_eq!(TriState::parse_on_off("Standby"), TriState::On);
        assert_eq!(TriState::parse_on_off(""), TriState::On);
    }

    #[test]
    fn tri_state_serialises_as_integer() {
        let hub = HubState {
            heating: TriState::On,
            hotwater: TriState::Unknown,
        };
        assert_eq!(
            serde_json::to_string(&hub).unwrap(),
            r#"{"heating":1,"hotwater":-1}"#
        );
    }

    #[test]
    fn room_record_omits_missing_device_fields() {
        let mut record = RoomRecord::new("Lounge", 20.5);
        record.window_state = WindowState::Closed;
        record.heat_request = TriState::Off;
        record.device_count = 1;

        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            serde_json::json!({
                "name": "Lounge",
                "temperature": 20.5,
                "windowState": "Closed",
                "heatRequest": 0,
                "deviceCount": 1,
            })
        );
    }

    #[test]
    fn window_state_parsing() {
        assert_eq!(WindowState::parse("Open"), WindowState::Open);
        assert_eq!(WindowState::parse("closed"), WindowState::Closed);
        assert_eq!(WindowState::parse("Ajar"), WindowState::Unknown);
    }

    #[test]
    fn tenths_scale() {
        assert_eq!(from_tenths(205), 20.5);
        assert_eq!(from_tenths(-15), -1.5);
    }
}
