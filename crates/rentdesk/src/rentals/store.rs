//! Persistence seams for the rental core. The real deployment talks to a
//! managed document database; tests and the bundled service use in-memory
//! implementations. Every collection also exposes a broadcast feed of change
//! events so a session can re-reconcile without polling.

use crate::rentals::domain::{
    LeaseStatus, NewSchedule, Property, PropertyId, PropertyStatus, RentalSchedule, ScheduleId,
    Tenant, TenantId, TenantStatus,
};
use serde::Serialize;
use std::collections::BTreeSet;
use std::future::Future;
use tokio::sync::broadcast;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Properties,
    Tenants,
    Schedules,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Updated,
    Removed,
}

/// One document changed in one collection. Consumers treat this as a wake-up
/// call, not a delta; they re-read whatever they need.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub collection: Collection,
    pub document_id: String,
    pub kind: ChangeKind,
}

/// Field-level update for a property document. `None` leaves the stored
/// value alone.
#[derive(Debug, Clone, Default)]
pub struct PropertyPatch {
    pub status: Option<PropertyStatus>,
    pub rented_to: Option<BTreeSet<TenantId>>,
}

impl PropertyPatch {
    pub fn with_status(status: PropertyStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

/// Field-level update for a tenant document.
#[derive(Debug, Clone, Default)]
pub struct TenantPatch {
    pub rented_properties: Option<BTreeSet<PropertyId>>,
    pub status: Option<TenantStatus>,
    pub lease_status: Option<LeaseStatus>,
}

pub trait PropertyDirectory: Send + Sync {
    fn list(&self) -> impl Future<Output = StoreResult<Vec<Property>>> + Send;
    fn get(&self, id: &PropertyId) -> impl Future<Output = StoreResult<Option<Property>>> + Send;
    fn update(
        &self,
        id: &PropertyId,
        patch: PropertyPatch,
    ) -> impl Future<Output = StoreResult<Property>> + Send;
    fn watch(&self) -> broadcast::Receiver<ChangeEvent>;
}

pub trait TenantDirectory: Send + Sync {
    fn list(&self) -> impl Future<Output = StoreResult<Vec<Tenant>>> + Send;
    fn get(&self, id: &TenantId) -> impl Future<Output = StoreResult<Option<Tenant>>> + Send;
    fn update(
        &self,
        id: &TenantId,
        patch: TenantPatch,
    ) -> impl Future<Output = StoreResult<Tenant>> + Send;
    fn watch(&self) -> broadcast::Receiver<ChangeEvent>;
}

pub trait ScheduleStore: Send + Sync {
    fn list(&self) -> impl Future<Output = StoreResult<Vec<RentalSchedule>>> + Send;
    fn get(
        &self,
        id: &ScheduleId,
    ) -> impl Future<Output = StoreResult<Option<RentalSchedule>>> + Send;
    /// Persists a new schedule; the store assigns the id and both
    /// timestamps.
    fn create(&self, new: NewSchedule) -> impl Future<Output = StoreResult<RentalSchedule>> + Send;
    /// Whole-document replace; refreshes `updated_at`. `NotFound` when the
    /// id was never persisted.
    fn put(
        &self,
        schedule: RentalSchedule,
    ) -> impl Future<Output = StoreResult<RentalSchedule>> + Send;
    fn delete(&self, id: &ScheduleId) -> impl Future<Output = StoreResult<()>> + Send;
    fn watch(&self) -> broadcast::Receiver<ChangeEvent>;
}
