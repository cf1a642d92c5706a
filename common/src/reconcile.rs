use std::fmt;

use thiserror::Error;

use crate::{
    snapshot::{battery_status, Device, HubSnapshot, Room, BATTERY_PRODUCT_TYPES},
    types::{
        from_tenths, DeviceId, DeviceIndex, HubState, RoomMap, RoomRecord, TriState, WindowState,
    },
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("device {device_id} listed under {section} does not belong to any room")]
    UnknownDevice {
        device_id: DeviceId,
        section: &'static str,
    },
    #[error("hub snapshot is missing {section}.{field}")]
    MissingField {
        section: &'static str,
        field: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relay {
    Heating,
    HotWater,
}

impl Relay {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Heating => "Heating",
            Self::HotWater => "Hot water",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    Relay {
        relay: Relay,
        from: TriState,
        to: TriState,
    },
    Window {
        room: String,
        from: WindowState,
        to: WindowState,
    },
    HeatRequest {
        room: String,
        from: TriState,
        to: TriState,
    },
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Relay { relay, from, to } => {
                write!(f, "{} switched from {from} to {to}", relay.as_str())
            }
            Self::Window { room, from, to } => {
                write!(f, "{room} window changed from {from} to {to}")
            }
            Self::HeatRequest { room, from, to } if *to == TriState::Off => {
                write!(f, "{room} stopped calling for heat ({from} -> {to})")
            }
            Self::HeatRequest { room, from, to } => {
                write!(f, "{room} is calling for heat ({from} -> {to})")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceFieldWarning {
    pub device_id: DeviceId,
    pub product_type: String,
    pub field: &'static str,
}

impl fmt::Display for DeviceFieldWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "device {} ({}) has no usable {}",
            self.device_id, self.product_type, self.field
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub changes: Vec<ChangeEvent>,
    pub warnings: Vec<DeviceFieldWarning>,
}

#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    hub: HubState,
    rooms: RoomMap,
    index: DeviceIndex,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hub_state(hub: HubState) -> Self {
        Self {
            hub,
            ..Self::default()
        }
    }

    pub fn hub_state(&self) -> HubState {
        self.hub
    }

    pub fn rooms(&self) -> &RoomMap {
        &self.rooms
    }

    pub fn device_index(&self) -> &DeviceIndex {
        &self.index
    }

    // Runs one cycle. State is only replaced when the whole snapshot
    // reconciles; on error the previous cycle's state is left as it was.
    pub fn reconcile(&mut self, snapshot: &HubSnapshot) -> Result<CycleReport, ReconcileError> {
        let mut report = CycleReport::default();

        let hub = relay_states(snapshot)?;
        for (relay, from, to) in [
            (Relay::Heating, self.hub.heating, hub.heating),
            (Relay::HotWater, self.hub.hotwater, hub.hotwater),
        ] {
            if from != to {
                report.changes.push(ChangeEvent::Relay { relay, from, to });
            }
        }

        let mut rooms = RoomMap::new();
        let mut index = DeviceIndex::new();
        for room in &snapshot.rooms {
            let record = room_record(room);
            let device_ids = room.device_ids();

            if let Some(previous) = self.previous_record(&record.name, &device_ids) {
                diff_room(previous, &record, &mut report.changes);
            }

            fan_out(record, &device_ids, &mut rooms, &mut index);
        }

        for device in &snapshot.devices {
            let Some(product_type) = device.product_type.as_deref() else {
                continue;
            };
            if !BATTERY_PRODUCT_TYPES.contains(&product_type) {
                continue;
            }

            let record = lookup_mut(&mut rooms, &index, device.id, "Device")?;
            if let Err(field) = merge_battery(record, device, product_type) {
                report.warnings.push(DeviceFieldWarning {
                    device_id: device.id,
                    product_type: product_type.to_string(),
                    field,
                });
            }
        }

        for valve in &snapshot.smart_valves {
            let measured = valve.measured_temperature.ok_or(ReconcileError::MissingField {
                section: "SmartValve",
                field: "MeasuredTemperature",
            })?;
            let record = lookup_mut(&mut rooms, &index, valve.id, "SmartValve")?;
            record.trv_temperature = Some(from_tenths(measured));
        }

        self.hub = hub;
        self.rooms = rooms;
        self.index = index;
        Ok(report)
    }

    fn previous_record(&self, name: &str, device_ids: &[DeviceId]) -> Option<&RoomRecord> {
        self.rooms.get(name).or_else(|| {
            let first = device_ids.first()?;
            self.rooms.get(&synthetic_name(name, *first))
        })
    }
}

pub fn synthetic_name(room: &str, device_id: DeviceId) -> String {
    format!("{room} #{device_id}")
}

fn relay_states(snapshot: &HubSnapshot) -> Result<HubState, ReconcileError> {
    let heating = snapshot
        .heating_channels
        .first()
        .and_then(|channel| channel.heating_relay_state.as_deref())
        .ok_or(ReconcileError::MissingField {
            section: "HeatingChannel",
            field: "HeatingRelayState",
        })?;
    let hotwater = snapshot
        .hot_water
        .first()
        .and_then(|water| water.hot_water_relay_state.as_deref())
        .ok_or(ReconcileError::MissingField {
            section: "HotWater",
            field: "HotWaterRelayState",
        })?;

    Ok(HubState {
        heating: TriState::parse_on_off(heating),
        hotwater: TriState::parse_on_off(hotwater),
    })
}

fn room_record(room: &Room) -> RoomRecord {
    let mut record = RoomRecord::new(room.name.clone(), from_tenths(room.calculated_temperature));
    record.window_state = room
        .window_state
        .as_deref()
        .map_or(WindowState::Unknown, WindowState::parse);
    record.heat_request = room
        .control_output_state
        .as_deref()
        .map_or(TriState::Unknown, TriState::parse_on_off);
    record.device_count = room.device_ids().len();
    record
}

fn diff_room(previous: &RoomRecord, current: &RoomRecord, changes: &mut Vec<ChangeEvent>) {
    if previous.window_state != current.window_state {
        changes.push(ChangeEvent::Window {
            room: current.name.clone(),
            from: previous.window_state,
            to: current.window_state,
        });
    }
    if previous.heat_request != current.heat_request {
        changes.push(ChangeEvent::HeatRequest {
            room: current.name.clone(),
            from: previous.heat_request,
            to: current.heat_request,
        });
    }
}

fn fan_out(
    record: RoomRecord,
    device_ids: &[DeviceId],
    rooms: &mut RoomMap,
    index: &mut DeviceIndex,
) {
    if device_ids.len() <= 1 {
        let key = record.name.clone();
        for id in device_ids {
            index.insert(*id, key.clone());
        }
        rooms.insert(key, record);
        return;
    }

    for id in device_ids {
        let key = synthetic_name(&record.name, *id);
        index.insert(*id, key.clone());
        rooms.insert(key, record.clone());
    }
}

fn lookup_mut<'a>(
    rooms: &'a mut RoomMap,
    index: &DeviceIndex,
    device_id: DeviceId,
    section: &'static str,
) -> Result<&'a mut RoomRecord, ReconcileError> {
    index
        .get(&device_id)
        .and_then(|key| rooms.get_mut(key))
        .ok_or(ReconcileError::UnknownDevice { device_id, section })
}

fn merge_battery(
    record: &mut RoomRecord,
    device: &Device,
    product_type: &str,
) -> Result<(), &'static str> {
    let voltage = device.battery_voltage.ok_or("BatteryVoltage")?;
    let status = device
        .battery_level
        .as_deref()
        .and_then(battery_status)
        .ok_or("BatteryLevel")?;

    record.battery_voltage = Some(from_tenths(voltage));
    record.battery_status = Some(status);
    record.product_type = Some(product_type.to_string());
    record.device_id = Some(device.id);
    Ok(())
}
