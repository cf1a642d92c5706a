pub mod config;
pub mod reconcile;
pub mod session;
pub mod snapshot;
pub mod telemetry;
pub mod topics;
pub mod types;

pub use config::{ConfigError, GatewayConfig, HubSettings, TelemetrySettings};
pub use reconcile::{ChangeEvent, CycleReport, DeviceFieldWarning, ReconcileError, Reconciler};
pub use session::{CycleError, CycleOutcome, Session};
pub use snapshot::HubSnapshot;
pub use telemetry::{PublishError, PublishReport, Publisher, TelemetryTransport, TransportError};
pub use topics::*;
pub use types::{HubState, LinkState, RoomMap, RoomRecord, TriState, WindowState};
