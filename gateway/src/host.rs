use std::{panic::Location, sync::Arc, time::Duration};

use anyhow::Context;
use chrono::Utc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use wiser_common::{
    config::{DEFAULT_CONFIG_PATH, POLL_INTERVAL_SECS},
    CycleError, CycleOutcome, GatewayConfig, Publisher, ReconcileError, Reconciler, Session,
    TelemetryTransport,
};

use crate::{
    hub::{HubClient, HubError},
    mqtt::{LoggingLinkEvents, MqttLink},
};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("hub request failed")]
    Hub {
        source: HubError,
        location: &'static Location<'static>,
    },
    #[error("poll cycle failed")]
    Cycle {
        source: CycleError,
        location: &'static Location<'static>,
    },
}

impl From<HubError> for GatewayError {
    #[track_caller]
    fn from(source: HubError) -> Self {
        Self::Hub {
            source,
            location: Location::caller(),
        }
    }
}

impl From<CycleError> for GatewayError {
    #[track_caller]
    fn from(source: CycleError) -> Self {
        Self::Cycle {
            source,
            location: Location::caller(),
        }
    }
}

impl GatewayError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Hub { .. } => "hub",
            Self::Cycle { source, .. } => match source {
                CycleError::Reconcile(ReconcileError::UnknownDevice { .. }) => "indexing",
                CycleError::Reconcile(ReconcileError::MissingField { .. }) => "snapshot",
                CycleError::Publish(_) => "encoding",
            },
        }
    }

    pub fn location(&self) -> &'static Location<'static> {
        match self {
            Self::Hub { location, .. } | Self::Cycle { location, .. } => *location,
        }
    }
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config_path =
        std::env::var("WISER_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = GatewayConfig::load(&config_path)
        .with_context(|| format!("failed to load configuration from {config_path}"))?;

    info!(
        "wiser gateway starting: hub {}, ThingsBoard {}:{}",
        config.hub.address, config.telemetry.server, config.telemetry.port
    );

    let mut hub = HubClient::new(&config.hub).context("failed to build hub client")?;
    let events = Arc::new(LoggingLinkEvents::new(&config.telemetry));
    let link = MqttLink::start(&config.telemetry, events);
    let mut session = Session::new(Reconciler::new(), Publisher::new(link, &config.telemetry));

    let outcome = tokio::select! {
        result = poll_loop(&mut hub, &mut session) => result,
        signal = tokio::signal::ctrl_c() => {
            if let Err(err) = signal {
                warn!("shutdown signal listener failed: {err}");
            }
            info!("shutdown requested");
            Ok(())
        }
    };

    session.publisher().transport().disconnect().await;

    if let Err(err) = outcome {
        let (kind, location) = (err.kind(), err.location());
        let err = anyhow::Error::from(err);
        error!(kind, %location, "poll loop stopped: {err:#}");
        return Err(err);
    }
    Ok(())
}

async fn poll_loop<T: TelemetryTransport>(
    hub: &mut HubClient,
    session: &mut Session<T>,
) -> Result<(), GatewayError> {
    let interval = Duration::from_secs(POLL_INTERVAL_SECS);
    loop {
        poll_once(hub, session).await?;
        tokio::time::sleep(interval).await;
    }
}

pub async fn poll_once<T: TelemetryTransport>(
    hub: &mut HubClient,
    session: &mut Session<T>,
) -> Result<CycleOutcome, GatewayError> {
    let snapshot = hub.refresh().await?;
    let outcome = session.cycle(snapshot, Utc::now().timestamp_millis())?;
    log_outcome(&outcome);
    Ok(outcome)
}

fn log_outcome(outcome: &CycleOutcome) {
    for change in &outcome.report.changes {
        info!(target: "wiser::changes", "{change}");
    }
    for warning in &outcome.report.warnings {
        warn!("{warning}; battery data not recorded this cycle");
    }
    for name in &outcome.publish.provisioned {
        info!("room '{name}' unknown during this run, provisioned on ThingsBoard");
    }
    for (topic, err) in &outcome.publish.dropped {
        warn!("telemetry on {topic} dropped: {err}");
    }
    debug!(
        sent = outcome.publish.sent,
        reconnects = outcome.publish.reconnects,
        "poll cycle published"
    );
}
