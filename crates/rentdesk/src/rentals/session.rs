//! Live overview session. Construction runs one reconciliation pass and
//! subscribes to all three collection feeds; a background worker keeps the
//! snapshot current until the session is closed or dropped. Each caller owns
//! its session, so tearing one down never disturbs another.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use super::service::{RentalError, RentalService};
use super::statement::RentalOverview;
use super::store::{PropertyDirectory, ScheduleStore, TenantDirectory};

pub struct RentalSession {
    snapshot: watch::Receiver<RentalOverview>,
    worker: JoinHandle<()>,
}

impl RentalSession {
    /// Builds the first snapshot and spawns the reconciliation worker. Fails
    /// only if the initial pass fails; once running, the worker logs and
    /// keeps the previous snapshot on errors.
    pub async fn initialize<P, T, S>(
        service: Arc<RentalService<P, T, S>>,
    ) -> Result<Self, RentalError>
    where
        P: PropertyDirectory + 'static,
        T: TenantDirectory + 'static,
        S: ScheduleStore + 'static,
    {
        let mut property_events = service.property_feed();
        let mut tenant_events = service.tenant_feed();
        let mut schedule_events = service.schedule_feed();

        let initial = service.overview(Utc::now()).await?;
        let (publisher, snapshot) = watch::channel(initial);

        let worker = tokio::spawn(async move {
            loop {
                let wake = tokio::select! {
                    event = property_events.recv() => event,
                    event = tenant_events.recv() => event,
                    event = schedule_events.recv() => event,
                };
                match wake {
                    Ok(change) => {
                        tracing::debug!(
                            collection = ?change.collection,
                            document_id = %change.document_id,
                            "change event received, reconciling"
                        );
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "change feed lagged, reconciling");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
                match service.overview(Utc::now()).await {
                    Ok(overview) => {
                        if publisher.send(overview).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "reconciliation failed, keeping previous snapshot");
                    }
                }
            }
        });

        Ok(Self { snapshot, worker })
    }

    /// Latest reconciled overview.
    pub fn overview(&self) -> RentalOverview {
        self.snapshot.borrow().clone()
    }

    /// Resolves once a newer snapshot than the last seen one is published.
    /// Returns `false` when the worker has stopped.
    pub async fn changed(&mut self) -> bool {
        self.snapshot.changed().await.is_ok()
    }

    /// Stops the worker. No reconciliation, and therefore no repair write,
    /// happens after this returns.
    pub fn close(self) {
        self.worker.abort();
    }
}

impl Drop for RentalSession {
    fn drop(&mut self) {
        self.worker.abort();
    }
}
