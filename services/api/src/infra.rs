use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use rentdesk::rentals::{
    ChangeEvent, ChangeKind, Collection, LeaseStatus, LeaseTerms, ListingType, NewSchedule,
    Property, PropertyDirectory, PropertyId, PropertyPatch, PropertyStatus, RentalSchedule,
    ScheduleId, ScheduleStore, StoreError, StoreResult, Tenant, TenantDirectory, TenantId,
    TenantPatch, TenantStatus,
};
use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Process-local document store standing in for the production database.
/// Every write fans out a change event so live sessions reconcile.
pub(crate) struct MemoryDocumentStore {
    properties: Mutex<HashMap<PropertyId, Property>>,
    tenants: Mutex<HashMap<TenantId, Tenant>>,
    schedules: Mutex<HashMap<ScheduleId, RentalSchedule>>,
    sequence: AtomicU64,
    property_events: broadcast::Sender<ChangeEvent>,
    tenant_events: broadcast::Sender<ChangeEvent>,
    schedule_events: broadcast::Sender<ChangeEvent>,
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self {
            properties: Mutex::new(HashMap::new()),
            tenants: Mutex::new(HashMap::new()),
            schedules: Mutex::new(HashMap::new()),
            sequence: AtomicU64::new(1),
            property_events: broadcast::channel(64).0,
            tenant_events: broadcast::channel(64).0,
            schedule_events: broadcast::channel(64).0,
        }
    }
}

impl MemoryDocumentStore {
    pub(crate) fn insert_property(&self, property: Property) {
        self.properties
            .lock()
            .expect("property mutex poisoned")
            .insert(property.id.clone(), property);
    }

    pub(crate) fn insert_tenant(&self, tenant: Tenant) {
        self.tenants
            .lock()
            .expect("tenant mutex poisoned")
            .insert(tenant.id.clone(), tenant);
    }
}

impl PropertyDirectory for MemoryDocumentStore {
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
        async move {
            Ok(self
                .properties
                .lock()
                .expect("property mutex poisoned")
                .get(id)
                .cloned())
        }
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

impl TenantDirectory for MemoryDocumentStore {
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
        async move {
            Ok(self
                .tenants
                .lock()
                .expect("tenant mutex poisoned")
                .get(id)
                .cloned())
        }
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

impl ScheduleStore for MemoryDocumentStore {
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
        async move {
            Ok(self
                .schedules
                .lock()
                .expect("schedule mutex poisoned")
                .get(id)
                .cloned())
        }
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

/// Seeds a small portfolio: one pairing whose property status lags behind
/// the tenant link (the self-healing case), one already settled, and one
/// sale listing the rental desk must ignore.
pub(crate) fn seed_demo_data(store: &MemoryDocumentStore) {
    store.insert_property(Property {
        id: PropertyId("maple-04".to_string()),
        listing_type: ListingType::Rental,
        status: PropertyStatus::Available,
        rented_to: BTreeSet::new(),
        price: Some(1180.0),
        lease_terms: LeaseTerms {
            deposit: Some(2360.0),
        },
    });
    store.insert_property(Property {
        id: PropertyId("birch-201".to_string()),
        listing_type: ListingType::Rental,
        status: PropertyStatus::Rented,
        rented_to: [TenantId("t-okafor".to_string())].into_iter().collect(),
        price: Some(940.0),
        lease_terms: LeaseTerms {
            deposit: Some(940.0),
        },
    });
    store.insert_property(Property {
        id: PropertyId("cedar-09".to_string()),
        listing_type: ListingType::Sale,
        status: PropertyStatus::Available,
        rented_to: BTreeSet::new(),
        price: Some(215_000.0),
        lease_terms: LeaseTerms { deposit: None },
    });

    store.insert_tenant(Tenant {
        id: TenantId("t-nguyen".to_string()),
        rented_properties: [PropertyId("maple-04".to_string())].into_iter().collect(),
        status: TenantStatus::Active,
        lease_status: LeaseStatus::Active,
    });
    store.insert_tenant(Tenant {
        id: TenantId("t-okafor".to_string()),
        rented_properties: [PropertyId("birch-201".to_string())].into_iter().collect(),
        status: TenantStatus::Active,
        lease_status: LeaseStatus::Active,
    });
}

pub(crate) fn parse_instant(raw: &str) -> Result<DateTime<Utc>, String> {
    let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| format!("failed to place '{raw}' at midnight"))?;
    Ok(Utc.from_utc_datetime(&midnight))
}
