use serde::Deserialize;

use crate::types::DeviceId;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HubSnapshot {
    #[serde(rename = "HeatingChannel", default)]
    pub heating_channels: Vec<HeatingChannel>,
    #[serde(rename = "HotWater", default)]
    pub hot_water: Vec<HotWater>,
    #[serde(rename = "Room", default)]
    pub rooms: Vec<Room>,
    #[serde(rename = "Device", default)]
    pub devices: Vec<Device>,
    #[serde(rename = "SmartValve", default)]
    pub smart_valves: Vec<SmartValve>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HeatingChannel {
    #[serde(rename = "HeatingRelayState")]
    pub heating_relay_state: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HotWater {
    #[serde(rename = "HotWaterRelayState")]
    pub hot_water_relay_state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Room {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "CalculatedTemperature")]
    pub calculated_temperature: i32,
    #[serde(rename = "RoomStatId")]
    pub room_stat_id: Option<DeviceId>,
    #[serde(rename = "SmartValveIds", default)]
    pub smart_valve_ids: Vec<DeviceId>,
    #[serde(rename = "WindowState")]
    pub window_state: Option<String>,
    #[serde(rename = "ControlOutputState")]
    pub control_output_state: Option<String>,
}

impl Room {
    pub fn device_ids(&self) -> Vec<DeviceId> {
        self.room_stat_id
            .into_iter()
            .chain(self.smart_valve_ids.iter().copied())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    #[serde(rename = "ProductType")]
    pub product_type: Option<String>,
    #[serde(rename = "BatteryVoltage")]
    pub battery_voltage: Option<i32>,
    #[serde(rename = "BatteryLevel")]
    pub battery_level: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SmartValve {
    pub id: DeviceId,
    #[serde(rename = "MeasuredTemperature")]
    pub measured_temperature: Option<i32>,
}

pub const BATTERY_PRODUCT_TYPES: [&str; 2] = ["RoomStat", "iTRV"];

pub fn battery_status(level: &str) -> Option<u8> {
    match level {
        "Low" => Some(0),
        "OneThird" => Some(1),
        "TwoThirds" => Some(2),
        "Normal" => Some(3),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_hub_document_and_ignores_extra_fields() {
        let snapshot: HubSnapshot = serde_json::from_str(
            r#"{
                "System": {"ActiveSystemVersion": "3.8.8"},
                "HeatingChannel": [{"id": 1, "HeatingRelayState": "Off", "PercentageDemand": 0}],
                "HotWater": [{"id": 2, "HotWaterRelayState": "On"}],
                "Room": [{
                    "id": 1, "Name": "Lounge", "CalculatedTemperature": 201,
                    "RoomStatId": 7, "SmartValveIds": [8, 9],
                    "WindowState": "Closed", "ControlOutputState": "On"
                }, {
                    "id": 2, "Name": "Hall", "CalculatedTemperature": 185
                }],
                "Device": [{"id": 7, "ProductType": "RoomStat", "BatteryVoltage": 30, "BatteryLevel": "Normal"}],
                "SmartValve": [{"id": 8, "MeasuredTemperature": 199}]
            }"#,
        )
        .unwrap();

        assert_eq!(snapshot.heating_channels.len(), 1);
        assert_eq!(snapshot.rooms[0].device_ids(), vec![7, 8, 9]);
        assert!(snapshot.rooms[1].device_ids().is_empty());
        assert_eq!(snapshot.rooms[1].window_state, None);
        assert_eq!(snapshot.devices[0].battery_voltage, Some(30));
        assert_eq!(snapshot.smart_valves[0].measured_temperature, Some(199));
    }

    #[test]
    fn room_without_id_still_decodes() {
        let snapshot: HubSnapshot = serde_json::from_str(
            r#"{"Room": [{"Name": "Loft", "CalculatedTemperature": 150}]}"#,
        )
        .unwrap();
        assert_eq!(snapshot.rooms[0].name, "Loft");
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let snapshot: HubSnapshot = serde_json::from_str("{}").unwrap();
        assert_eq!(snapshot, HubSnapshot::default());
    }

    #[test]
    fn battery_levels() {
        assert_eq!(battery_status("Normal"), Some(3));
        assert_eq!(battery_status("Low"), Some(0));
        assert_eq!(battery_status("Empty"), None);
    }
}
