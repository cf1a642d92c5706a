use thiserror::Error;

use crate::{
    reconcile::{CycleReport, ReconcileError, Reconciler},
    snapshot::HubSnapshot,
    telemetry::{PublishError, PublishReport, Publisher, TelemetryTransport},
};

#[derive(Debug, Error)]
pub enum CycleError {
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
    #[error(transparent)]
    Publish(#[from] PublishError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleOutcome {
    pub report: CycleReport,
    pub publish: PublishReport,
}

pub struct Session<T> {
    reconciler: Reconciler,
    publisher: Publisher<T>,
}

impl<T: TelemetryTransport> Session<T> {
    pub fn new(reconciler: Reconciler, publisher: Publisher<T>) -> Self {
        Self {
            reconciler,
            publisher,
        }
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn publisher(&self) -> &Publisher<T> {
        &self.publisher
    }

    pub fn cycle(
        &mut self,
        snapshot: &HubSnapshot,
        now_ms: i64,
    ) -> Result<CycleOutcome, CycleError> {
        let report = self.reconciler.reconcile(snapshot)?;
        let publish = self.publisher.publish(
            &self.reconciler.hub_state(),
            self.reconciler.rooms(),
            now_ms,
        )?;
        Ok(CycleOutcome { report, publish })
    }
}
