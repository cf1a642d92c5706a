use std::{
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc,
    },
    time::Duration,
};

use rumqttc::{
    AsyncClient, ClientError, ConnectReturnCode, Event, EventLoop, Incoming, MqttOptions,
    Outgoing, QoS,
};
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use wiser_common::{LinkState, TelemetrySettings, TelemetryTransport, TransportError};

const CLIENT_ID: &str = "wiser-gateway";
const KEEP_ALIVE: Duration = Duration::from_secs(60);
const REQUEST_CAPACITY: usize = 64;
const DISCONNECT_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug)]
pub struct LinkStatus(AtomicU8);

impl Default for LinkStatus {
    fn default() -> Self {
        Self(AtomicU8::new(LinkState::Disconnected.as_u8()))
    }
}

impl LinkStatus {
    pub fn load(&self) -> LinkState {
        LinkState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn store(&self, state: LinkState) {
        self.0.store(state.as_u8(), Ordering::Release);
    }

    pub fn swap(&self, state: LinkState) -> LinkState {
        LinkState::from_u8(self.0.swap(state.as_u8(), Ordering::AcqRel))
    }

    pub fn begin_connect(&self) -> bool {
        self.0
            .compare_exchange(
                LinkState::Disconnected.as_u8(),
                LinkState::Connecting.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }
}

pub trait LinkEvents: Send + Sync {
    fn on_connecting(&self) {}
    fn on_connected(&self) {}
    fn on_connect_failed(&self, reason: &str);
    fn on_disconnected(&self, reason: &str);
}

pub struct LoggingLinkEvents {
    server: String,
    port: u16,
}

impl LoggingLinkEvents {
    pub fn new(settings: &TelemetrySettings) -> Self {
        Self {
            server: settings.server.clone(),
            port: settings.port,
        }
    }
}

impl LinkEvents for LoggingLinkEvents {
    fn on_connecting(&self) {
        info!("connecting to ThingsBoard at {}:{}", self.server, self.port);
    }

    fn on_connected(&self) {
        info!("mqtt connected");
    }

    fn on_connect_failed(&self, reason: &str) {
        warn!("mqtt connection to {}:{} failed: {reason}", self.server, self.port);
    }

    fn on_disconnected(&self, reason: &str) {
        warn!("mqtt disconnected: {reason}");
    }
}

// rumqttc-backed transport. The event loop only runs while a connection is
// wanted: it starts on the first `connect()` and parks again after any
// failure until the next publish asks for a reconnect.
pub struct MqttLink {
    client: AsyncClient,
    status: Arc<LinkStatus>,
    wake: Arc<Notify>,
    events: Arc<dyn LinkEvents>,
}

impl MqttLink {
    pub fn start(settings: &TelemetrySettings, events: Arc<dyn LinkEvents>) -> Self {
        let mut options = MqttOptions::new(CLIENT_ID, settings.server.clone(), settings.port);
        options.set_credentials(settings.token.clone(), "");
        options.set_keep_alive(KEEP_ALIVE);

        let (client, eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);
        let status = Arc::new(LinkStatus::default());
        let wake = Arc::new(Notify::new());

        spawn_link_loop(eventloop, status.clone(), wake.clone(), events.clone());

        Self {
            client,
            status,
            wake,
            events,
        }
    }

    pub async fn disconnect(&self) {
        if self.status.load() != LinkState::Connected {
            return;
        }
        if let Err(err) = self.client.disconnect().await {
            warn!("mqtt disconnect request failed: {err}");
            return;
        }

        let deadline = tokio::time::Instant::now() + DISCONNECT_GRACE;
        while self.status.load() == LinkState::Connected && tokio::time::Instant::now() < deadline
        {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

impl TelemetryTransport for MqttLink {
    fn state(&self) -> LinkState {
        self.status.load()
    }

    fn connect(&self) {
        if self.status.begin_connect() {
            self.events.on_connecting();
            self.wake.notify_one();
        }
    }

    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        debug!("publishing {} bytes to {topic}", payload.len());
        self.client
            .try_publish(topic, QoS::AtLeastOnce, false, payload)
            .map_err(|err| match err {
                ClientError::TryRequest(_) => TransportError::QueueFull,
                _ => TransportError::Closed,
            })
    }
}

fn spawn_link_loop(
    mut eventloop: EventLoop,
    status: Arc<LinkStatus>,
    wake: Arc<Notify>,
    events: Arc<dyn LinkEvents>,
) {
    tokio::spawn(async move {
        loop {
            while status.load() == LinkState::Disconnected {
                wake.notified().await;
            }

            match eventloop.poll().await {
                Ok(Event::Incoming(Incoming::ConnAck(ack))) => {
                    if ack.code == ConnectReturnCode::Success {
                        status.store(LinkState::Connected);
                        events.on_connected();
                    } else {
                        status.store(LinkState::Disconnected);
                        events.on_connect_failed(&format!("{:?}", ack.code));
                    }
                }
                Ok(Event::Incoming(Incoming::Disconnect)) => {
                    status.store(LinkState::Disconnected);
                    events.on_disconnected("server sent disconnect");
                }
                Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                    status.store(LinkState::Disconnected);
                    events.on_disconnected("client requested disconnect");
                }
                Ok(_) => {}
                Err(err) => {
                    let reason = err.to_string();
                    match status.swap(LinkState::Disconnected) {
                        LinkState::Connected => events.on_disconnected(&reason),
                        _ => events.on_connect_failed(&reason),
                    }
                }
            }
        }
    });
}
