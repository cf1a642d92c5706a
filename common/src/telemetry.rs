use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use thiserror::Error;

use crate::{
    config::TelemetrySettings,
    topics::{
        TOPIC_DEVICE_ATTRIBUTES, TOPIC_DEVICE_PROVISION, TOPIC_GATEWAY_TELEMETRY,
        TOPIC_TELEMETRY_SELF,
    },
    types::{HubState, LinkState, RoomMap, RoomRecord},
};

pub const DEVICE_NOTE: &str = "Created by wiser-gateway";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("outgoing queue is full")]
    QueueFull,
    #[error("link is closed")]
    Closed,
}

#[derive(Debug, Error)]
#[error("failed to encode payload for {topic}: {source}")]
pub struct PublishError {
    pub topic: &'static str,
    #[source]
    pub source: serde_json::Error,
}

pub trait TelemetryTransport {
    fn state(&self) -> LinkState;

    fn connect(&self);

    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub provisioned: Vec<String>,
    pub sent: usize,
    pub dropped: Vec<(&'static str, TransportError)>,
    pub reconnects: usize,
}

#[derive(Serialize)]
struct ProvisionRequest<'a> {
    device: &'a str,
    #[serde(rename = "type")]
    profile: &'a str,
}

#[derive(Serialize)]
struct DeviceAttributes<'a> {
    #[serde(rename = "Note")]
    note: &'a str,
}

#[derive(Serialize)]
struct TimeseriesEntry<'a> {
    ts: i64,
    values: &'a RoomRecord,
}

pub struct Publisher<T> {
    transport: T,
    device_prefix: String,
    device_profile: String,
    known_devices: HashSet<String>,
}

impl<T: TelemetryTransport> Publisher<T> {
    pub fn new(transport: T, settings: &TelemetrySettings) -> Self {
        Self {
            transport,
            device_prefix: settings.device_prefix.clone(),
            device_profile: settings.device_profile.clone(),
            known_devices: HashSet::new(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn is_known(&self, device_name: &str) -> bool {
        self.known_devices.contains(device_name)
    }

    pub fn device_name(&self, room_key: &str) -> String {
        format!("{} room {room_key}", self.device_prefix)
    }

    pub fn publish(
        &mut self,
        hub: &HubState,
        rooms: &RoomMap,
        now_ms: i64,
    ) -> Result<PublishReport, PublishError> {
        let mut report = PublishReport::default();

        self.send(TOPIC_TELEMETRY_SELF, encode(TOPIC_TELEMETRY_SELF, hub)?, &mut report);

        for (key, record) in rooms {
            let name = self.device_name(key);

            if !self.known_devices.contains(&name) {
                let provision = ProvisionRequest {
                    device: &name,
                    profile: &self.device_profile,
                };
                let attributes =
                    BTreeMap::from([(name.as_str(), DeviceAttributes { note: DEVICE_NOTE })]);
                let provision = encode(TOPIC_DEVICE_PROVISION, &provision)?;
                let attributes = encode(TOPIC_DEVICE_ATTRIBUTES, &attributes)?;

                self.send(TOPIC_DEVICE_PROVISION, provision, &mut report);
                self.send(TOPIC_DEVICE_ATTRIBUTES, attributes, &mut report);
                self.known_devices.insert(name.clone());
                report.provisioned.push(name.clone());
            }

            let series = BTreeMap::from([(
                name.as_str(),
                [TimeseriesEntry {
                    ts: now_ms,
                    values: record,
                }],
            )]);
            let payload = encode(TOPIC_GATEWAY_TELEMETRY, &series)?;
            self.send(TOPIC_GATEWAY_TELEMETRY, payload, &mut report);
        }

        Ok(report)
    }

    fn send(&self, topic: &'static str, payload: Vec<u8>, report: &mut PublishReport) {
        if self.transport.state() == LinkState::Disconnected {
            self.transport.connect();
            report.reconnects += 1;
        }
        match self.transport.publish(topic, payload) {
            Ok(()) => report.sent += 1,
            Err(err) => report.dropped.push((topic, err)),
        }
    }
}

fn encode<S: Serialize + ?Sized>(topic: &'static str, value: &S) -> Result<Vec<u8>, PublishError> {
    serde_json::to_vec(value).map_err(|source| PublishError { topic, source })
}
