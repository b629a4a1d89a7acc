use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::broadcast;

use crate::rentals::domain::{
    LeaseStatus, LeaseTerms, ListingType, NewSchedule, Property, PropertyId, PropertyStatus,
    RentalSchedule, ScheduleId, ScheduleStatus, ScheduleTerms, Tenant, TenantId, TenantStatus,
};
use crate::rentals::service::RentalService;
use crate::rentals::store::{
    ChangeEvent, ChangeKind, Collection, PropertyDirectory, PropertyPatch, ScheduleStore,
    StoreError, StoreResult, TenantDirectory, TenantPatch,
};

pub(super) fn instant(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .expect("valid date")
}

pub(super) fn rental_property(id: &str, price: Option<f64>, deposit: Option<f64>) -> Property {
    Property {
        id: PropertyId(id.to_string()),
        listing_type: ListingType::Rental,
        status: PropertyStatus::Available,
        rented_to: BTreeSet::new(),
        price,
        lease_terms: LeaseTerms { deposit },
    }
}

pub(super) fn sale_property(id: &str) -> Property {
    Property {
        id: PropertyId(id.to_string()),
        listing_type: ListingType::Sale,
        status: PropertyStatus::Available,
        rented_to: BTreeSet::new(),
        price: Some(250_000.0),
        lease_terms: LeaseTerms::default(),
    }
}

pub(super) fn tenant_renting(id: &str, properties: &[&str]) -> Tenant {
    Tenant {
        id: TenantId(id.to_string()),
        rented_properties: properties
            .iter()
            .map(|p| PropertyId(p.to_string()))
            .collect(),
        status: TenantStatus::Active,
        lease_status: LeaseStatus::Active,
    }
}

pub(super) fn terms() -> ScheduleTerms {
    ScheduleTerms {
        lease_start_date: instant(2026, 2, 1),
        lease_end_date: instant(2027, 1, 31),
        monthly_rent: 500.0,
        deposit_amount: 1000.0,
        payment_day: 1,
    }
}

pub(super) fn draft_input(property: &str, tenant: &str) -> NewSchedule {
    let t = terms();
    NewSchedule {
        property_id: PropertyId(property.to_string()),
        tenant_id: TenantId(tenant.to_string()),
        lease_start_date: t.lease_start_date,
        lease_end_date: t.lease_end_date,
        monthly_rent: t.monthly_rent,
        deposit_amount: t.deposit_amount,
        payment_day: t.payment_day,
        status: ScheduleStatus::Draft,
        payments: Vec::new(),
    }
}

pub(super) fn build_service() -> (
    Arc<RentalService<MemoryStore, MemoryStore, MemoryStore>>,
    Arc<MemoryStore>,
) {
    let store = Arc::new(MemoryStore::default());
    let service = Arc::new(RentalService::new(
        store.clone(),
        store.clone(),
        store.clone(),
    ));
    (service, store)
}

/// Seeds one linked pair: an available rental property and a tenant whose
/// record already points at it.
pub(super) fn seed_linked_pair(store: &MemoryStore, property: &str, tenant: &str) {
    store.insert_property(rental_property(property, Some(500.0), Some(1000.0)));
    store.insert_tenant(tenant_renting(tenant, &[property]));
}

pub(super) struct MemoryStore {
    properties: Mutex<HashMap<PropertyId, Property>>,
    tenants: Mutex<HashMap<TenantId, Tenant>>,
    schedules: Mutex<HashMap<ScheduleId, RentalSchedule>>,
    sequence: AtomicU64,
    pub(super) property_writes: AtomicUsize,
    property_events: broadcast::Sender<ChangeEvent>,
    tenant_events: broadcast::Sender<ChangeEvent>,
    schedule_events: broadcast::Sender<ChangeEvent>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            properties: Mutex::new(HashMap::new()),
            tenants: Mutex::new(HashMap::new()),
            schedules: Mutex::new(HashMap::new()),
            sequence: AtomicU64::new(1),
            property_writes: AtomicUsize::new(0),
            property_events: broadcast::channel(16).0,
            tenant_events: broadcast::channel(16).0,
            schedule_events: broadcast::channel(16).0,
        }
    }
}

impl MemoryStore {
    pub(super) fn insert_property(&self, property: Property) {
        self.properties
            .lock()
            .expect("property mutex poisoned")
            .insert(property.id.clone(), property);
    }

    pub(super) fn insert_tenant(&self, tenant: Tenant) {
        self.tenants
            .lock()
            .expect("tenant mutex poisoned")
            .insert(tenant.id.clone(), tenant);
    }

    pub(super) fn property(&self, id: &PropertyId) -> Option<Property> {
        self.properties
            .lock()
            .expect("property mutex poisoned")
            .get(id)
            .cloned()
    }

    pub(super) fn tenant(&self, id: &TenantId) -> Option<Tenant> {
        self.tenants
            .lock()
            .expect("tenant mutex poisoned")
            .get(id)
            .cloned()
    }

    pub(super) fn schedule_count(&self) -> usize {
        self.schedules
            .lock()
            .expect("schedule mutex poisoned")
            .len()
    }

    pub(super) fn stored_schedule(&self, id: &ScheduleId) -> Option<RentalSchedule> {
        self.schedules
            .lock()
            .expect("schedule mutex poisoned")
            .get(id)
            .cloned()
    }
}

impl PropertyDirectory for MemoryStore {
    fn list(&self) -> impl Future<Output = StoreResult<Vec<Property>>> + Send {
        async move {
            Ok(self
                .properties
                .lock()
                .expect("property mutex poisoned")
                .values()
                .cloned()
                .collect())
        }
    }

    fn get(&self, id: &PropertyId) -> impl Future<Output = StoreResult<Option<Property>>> + Send {
        async move { Ok(self.property(id)) }
    }

    fn update(
        &self,
        id: &PropertyId,
        patch: PropertyPatch,
    ) -> impl Future<Output = StoreResult<Property>> + Send {
        async move {
            let mut guard = self.properties.lock().expect("property mutex poisoned");
            let property = guard.get_mut(id).ok_or(StoreError::NotFound)?;
            if let Some(status) = patch.status {
                property.status = status;
            }
            if let Some(rented_to) = patch.rented_to {
                property.rented_to = rented_to;
            }
            let updated = property.clone();
            drop(guard);
            self.property_writes.fetch_add(1, Ordering::SeqCst);
            let _ = self.property_events.send(ChangeEvent {
                collection: Collection::Properties,
                document_id: id.0.clone(),
                kind: ChangeKind::Updated,
            });
            Ok(updated)
        }
    }

    fn watch(&self) -> broadcast::Receiver<ChangeEvent> {
        self.property_events.subscribe()
    }
}

impl TenantDirectory for MemoryStore {
    fn list(&self) -> impl Future<Output = StoreResult<Vec<Tenant>>> + Send {
        async move {
            Ok(self
                .tenants
                .lock()
                .expect("tenant mutex poisoned")
                .values()
                .cloned()
                .collect())
        }
    }

    fn get(&self, id: &TenantId) -> impl Future<Output = StoreResult<Option<Tenant>>> + Send {
        async move { Ok(self.tenant(id)) }
    }

    fn update(
        &self,
        id: &TenantId,
        patch: TenantPatch,
    ) -> impl Future<Output = StoreResult<Tenant>> + Send {
        async move {
            let mut guard = self.tenants.lock().expect("tenant mutex poisoned");
            let tenant = guard.get_mut(id).ok_or(StoreError::NotFound)?;
            if let Some(rented_properties) = patch.rented_properties {
                tenant.rented_properties = rented_properties;
            }
            if let Some(status) = patch.status {
                tenant.status = status;
            }
            if let Some(lease_status) = patch.lease_status {
                tenant.lease_status = lease_status;
            }
            let updated = tenant.clone();
            drop(guard);
            let _ = self.tenant_events.send(ChangeEvent {
                collection: Collection::Tenants,
                document_id: id.0.clone(),
                kind: ChangeKind::Updated,
            });
            Ok(updated)
        }
    }

    fn watch(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tenant_events.subscribe()
    }
}

impl ScheduleStore for MemoryStore {
    fn list(&self) -> impl Future<Output = StoreResult<Vec<RentalSchedule>>> + Send {
        async move {
            Ok(self
                .schedules
                .lock()
                .expect("schedule mutex poisoned")
                .values()
                .cloned()
                .collect())
        }
    }

    fn get(
        &self,
        id: &ScheduleId,
    ) -> impl Future<Output = StoreResult<Option<RentalSchedule>>> + Send {
        async move { Ok(self.stored_schedule(id)) }
    }

    fn create(&self, new: NewSchedule) -> impl Future<Output = StoreResult<RentalSchedule>> + Send {
        async move {
            let id = ScheduleId(format!(
                "sched-{:06}",
                self.sequence.fetch_add(1, Ordering::Relaxed)
            ));
            let now = Utc::now();
            let schedule = RentalSchedule {
                id: id.clone(),
                property_id: new.property_id,
                tenant_id: new.tenant_id,
                lease_start_date: new.lease_start_date,
                lease_end_date: new.lease_end_date,
                monthly_rent: new.monthly_rent,
                deposit_amount: new.deposit_amount,
                payment_day: new.payment_day,
                status: new.status,
                payments: new.payments,
                created_at: now,
                updated_at: now,
            };
            self.schedules
                .lock()
                .expect("schedule mutex poisoned")
                .insert(id.clone(), schedule.clone());
            let _ = self.schedule_events.send(ChangeEvent {
                collection: Collection::Schedules,
                document_id: id.0.clone(),
                kind: ChangeKind::Created,
            });
            Ok(schedule)
        }
    }

    fn put(
        &self,
        mut schedule: RentalSchedule,
    ) -> impl Future<Output = StoreResult<RentalSchedule>> + Send {
        async move {
            let mut guard = self.schedules.lock().expect("schedule mutex poisoned");
            if !guard.contains_key(&schedule.id) {
                return Err(StoreError::NotFound);
            }
            schedule.updated_at = Utc::now();
            guard.insert(schedule.id.clone(), schedule.clone());
            drop(guard);
            let _ = self.schedule_events.send(ChangeEvent {
                collection: Collection::Schedules,
                document_id: schedule.id.0.clone(),
                kind: ChangeKind::Updated,
            });
            Ok(schedule)
        }
    }

    fn delete(&self, id: &ScheduleId) -> impl Future<Output = StoreResult<()>> + Send {
        async move {
            let removed = self
                .schedules
                .lock()
                .expect("schedule mutex poisoned")
                .remove(id);
            if removed.is_none() {
                return Err(StoreError::NotFound);
            }
            let _ = self.schedule_events.send(ChangeEvent {
                collection: Collection::Schedules,
                document_id: id.0.clone(),
                kind: ChangeKind::Removed,
            });
            Ok(())
        }
    }

    fn watch(&self) -> broadcast::Receiver<ChangeEvent> {
        self.schedule_events.subscribe()
    }
}

/// Directory that always fails, for outage behavior tests.
pub(super) struct UnavailableDirectory {
    events: broadcast::Sender<ChangeEvent>,
}

impl Default for UnavailableDirectory {
    fn default() -> Self {
        Self {
            events: broadcast::channel(1).0,
        }
    }
}

impl PropertyDirectory for UnavailableDirectory {
    fn list(&self) -> impl Future<Output = StoreResult<Vec<Property>>> + Send {
        async move { Err(StoreError::Unavailable("simulated outage".to_string())) }
    }

    fn get(&self, _id: &PropertyId) -> impl Future<Output = StoreResult<Option<Property>>> + Send {
        async move { Err(StoreError::Unavailable("simulated outage".to_string())) }
    }

    fn update(
        &self,
        _id: &PropertyId,
        _patch: PropertyPatch,
    ) -> impl Future<Output = StoreResult<Property>> + Send {
        async move { Err(StoreError::Unavailable("simulated outage".to_string())) }
    }

    fn watch(&self) -> broadcast::Receiver<ChangeEvent> {
        self.events.subscribe()
    }
}
