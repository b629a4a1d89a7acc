use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use super::associations::{self, resolve_associations};
use super::domain::{
    NewSchedule, PaymentReceipt, Property, PropertyId, PropertyStatus, RentalSchedule,
    ScheduleChanges, ScheduleId, ScheduleStatus, ScheduleTerms, Tenant, TenantId, ValidationError,
};
use super::ledger;
use super::statement::{OverviewEntry, RentalOverview, RentalStatement};
use super::store::{
    ChangeEvent, PropertyDirectory, PropertyPatch, ScheduleStore, StoreError, TenantDirectory,
};

/// Service composing the association resolver, the schedule store, and the
/// payment ledger. Collaborators are shared handles so a session worker can
/// hold the same service the router does.
pub struct RentalService<P, T, S> {
    properties: Arc<P>,
    tenants: Arc<T>,
    schedules: Arc<S>,
}

/// Setup addresses either a schedule that already exists or an association
/// pair whose draft has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupTarget {
    Persisted(ScheduleId),
    Association {
        property_id: PropertyId,
        tenant_id: TenantId,
    },
}

impl<P, T, S> RentalService<P, T, S>
where
    P: PropertyDirectory + 'static,
    T: TenantDirectory + 'static,
    S: ScheduleStore + 'static,
{
    pub fn new(properties: Arc<P>, tenants: Arc<T>, schedules: Arc<S>) -> Self {
        Self {
            properties,
            tenants,
            schedules,
        }
    }

    pub fn property_feed(&self) -> broadcast::Receiver<ChangeEvent> {
        self.properties.watch()
    }

    pub fn tenant_feed(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tenants.watch()
    }

    pub fn schedule_feed(&self) -> broadcast::Receiver<ChangeEvent> {
        self.schedules.watch()
    }

    /// One reconciliation pass: resolve associations, issue best-effort
    /// status repairs, and merge persisted schedules with drafts synthesized
    /// for pairs that have none. A pair never yields both.
    pub async fn overview(&self, now: DateTime<Utc>) -> Result<RentalOverview, RentalError> {
        let (properties, tenants) = self.load_directories().await;
        let resolution = resolve_associations(&properties, &tenants);
        self.repair_properties(&resolution.repairs).await;

        let persisted = self.schedules.list().await?;
        let covered: BTreeSet<(&PropertyId, &TenantId)> = persisted
            .iter()
            .map(|schedule| (&schedule.property_id, &schedule.tenant_id))
            .collect();

        let mut entries: Vec<OverviewEntry> = persisted
            .iter()
            .map(|schedule| OverviewEntry::from_schedule(schedule, true, now))
            .collect();
        for pair in &resolution.pairs {
            if covered.contains(&(&pair.property_id, &pair.tenant_id)) {
                continue;
            }
            if let Some(property) = properties.iter().find(|p| p.id == pair.property_id) {
                let draft = RentalSchedule::draft_for(property, &pair.tenant_id, now);
                entries.push(OverviewEntry::from_schedule(&draft, false, now));
            }
        }
        entries.sort_by(|a, b| {
            (&a.property_id, &a.tenant_id, &a.schedule_id)
                .cmp(&(&b.property_id, &b.tenant_id, &b.schedule_id))
        });

        Ok(RentalOverview {
            generated_at: now,
            rented_properties: resolution.rented_properties,
            schedules: entries,
        })
    }

    /// Persists a schedule supplied in full, pre-supplied ledger entries
    /// included. The pair must be backed by an actual association; the store
    /// assigns the id and timestamps.
    pub async fn create_schedule(&self, new: NewSchedule) -> Result<RentalSchedule, RentalError> {
        new.validate()?;
        self.require_association(&new.property_id, &new.tenant_id)
            .await?;
        Ok(self.schedules.create(new).await?)
    }

    /// Applies financial terms to a schedule. Targeting a pair persists the
    /// draft as an active schedule seeded with its deposit and first rent
    /// entry; if the pair already has a persisted schedule, that one is
    /// updated instead. Targeting an id is a plain update that promotes a
    /// stored draft to active.
    pub async fn setup_schedule(
        &self,
        target: SetupTarget,
        terms: ScheduleTerms,
    ) -> Result<RentalSchedule, RentalError> {
        terms.validate()?;
        match target {
            SetupTarget::Persisted(id) => self.apply_terms(&id, terms).await,
            SetupTarget::Association {
                property_id,
                tenant_id,
            } => {
                self.require_association(&property_id, &tenant_id).await?;
                if let Some(existing) = self.find_by_pair(&property_id, &tenant_id).await? {
                    return self.apply_terms(&existing.id, terms).await;
                }
                let payments = ledger::seed_payments(
                    terms.lease_start_date,
                    terms.monthly_rent,
                    terms.deposit_amount,
                );
                let new = NewSchedule {
                    property_id,
                    tenant_id,
                    lease_start_date: terms.lease_start_date,
                    lease_end_date: terms.lease_end_date,
                    monthly_rent: terms.monthly_rent,
                    deposit_amount: terms.deposit_amount,
                    payment_day: terms.payment_day,
                    status: ScheduleStatus::Active,
                    payments,
                };
                Ok(self.schedules.create(new).await?)
            }
        }
    }

    /// Partial update of terms and status. Status changes must follow the
    /// schedule state machine; the merged document is re-validated before it
    /// is written back.
    pub async fn update_schedule(
        &self,
        id: &ScheduleId,
        changes: ScheduleChanges,
    ) -> Result<RentalSchedule, RentalError> {
        let mut schedule = self
            .schedules
            .get(id)
            .await?
            .ok_or_else(|| RentalError::ScheduleNotFound(id.clone()))?;

        if let Some(next) = changes.status {
            if next != schedule.status && !schedule.status.allows(next) {
                return Err(ValidationError::IllegalTransition {
                    from: schedule.status,
                    to: next,
                }
                .into());
            }
            schedule.status = next;
        }
        if let Some(value) = changes.lease_start_date {
            schedule.lease_start_date = value;
        }
        if let Some(value) = changes.lease_end_date {
            schedule.lease_end_date = value;
        }
        if let Some(value) = changes.monthly_rent {
            schedule.monthly_rent = value;
        }
        if let Some(value) = changes.deposit_amount {
            schedule.deposit_amount = value;
        }
        if let Some(value) = changes.payment_day {
            schedule.payment_day = value;
        }
        schedule.terms().validate()?;

        Ok(self.schedules.put(schedule).await?)
    }

    /// Removes a persisted schedule. Associations are untouched, so the next
    /// reconciliation pass synthesizes a fresh draft for the pair.
    pub async fn delete_schedule(&self, id: &ScheduleId) -> Result<(), RentalError> {
        match self.schedules.delete(id).await {
            Ok(()) => Ok(()),
            Err(StoreError::NotFound) => Err(RentalError::ScheduleNotFound(id.clone())),
            Err(err) => Err(err.into()),
        }
    }

    /// Books a receipt against the schedule's ledger and persists the whole
    /// document. Concurrent recorders are not fenced; the last write wins,
    /// matching how the desk has always operated.
    pub async fn record_payment(
        &self,
        id: &ScheduleId,
        receipt: PaymentReceipt,
    ) -> Result<RentalSchedule, RentalError> {
        receipt.validate()?;
        let mut schedule = self
            .schedules
            .get(id)
            .await?
            .ok_or_else(|| RentalError::ScheduleNotFound(id.clone()))?;
        ledger::apply_receipt(&mut schedule.payments, &receipt, Utc::now());
        Ok(self.schedules.put(schedule).await?)
    }

    pub async fn statement(
        &self,
        id: &ScheduleId,
        now: DateTime<Utc>,
    ) -> Result<RentalStatement, RentalError> {
        let schedule = self
            .schedules
            .get(id)
            .await?
            .ok_or_else(|| RentalError::ScheduleNotFound(id.clone()))?;
        Ok(RentalStatement::build(&schedule, now))
    }

    /// Attaches a tenant to a property: one update per side, tenant side
    /// first since it is the authoritative record.
    pub async fn link_tenant(
        &self,
        property_id: &PropertyId,
        tenant_id: &TenantId,
    ) -> Result<(), RentalError> {
        let (property, tenant) = self.load_pair(property_id, tenant_id).await?;
        let (property_patch, tenant_patch) = associations::link_patches(&property, &tenant);
        self.tenants.update(tenant_id, tenant_patch).await?;
        self.properties.update(property_id, property_patch).await?;
        Ok(())
    }

    /// Detaches a tenant from a property. The property keeps whatever status
    /// staff set on it; only the references and the tenant's lease standing
    /// change.
    pub async fn unlink_tenant(
        &self,
        property_id: &PropertyId,
        tenant_id: &TenantId,
    ) -> Result<(), RentalError> {
        let (property, tenant) = self.load_pair(property_id, tenant_id).await?;
        let (property_patch, tenant_patch) = associations::unlink_patches(&property, &tenant);
        self.tenants.update(tenant_id, tenant_patch).await?;
        self.properties.update(property_id, property_patch).await?;
        Ok(())
    }

    /// Directory reads degrade to empty snapshots: an unreachable collection
    /// must not take the overview down with it.
    async fn load_directories(&self) -> (Vec<Property>, Vec<Tenant>) {
        let properties = match self.properties.list().await {
            Ok(list) => list,
            Err(err) => {
                tracing::warn!(error = %err, "property directory unavailable, resolving over empty snapshot");
                Vec::new()
            }
        };
        let tenants = match self.tenants.list().await {
            Ok(list) => list,
            Err(err) => {
                tracing::warn!(error = %err, "tenant directory unavailable, resolving over empty snapshot");
                Vec::new()
            }
        };
        (properties, tenants)
    }

    /// Best-effort `rented` repair for paired properties whose stored status
    /// disagrees. Failures are logged and skipped; a later pass retries.
    async fn repair_properties(&self, repairs: &[PropertyId]) {
        for id in repairs {
            let patch = PropertyPatch::with_status(PropertyStatus::Rented);
            if let Err(err) = self.properties.update(id, patch).await {
                tracing::warn!(property_id = %id, error = %err, "failed to repair property status");
            }
        }
    }

    async fn load_pair(
        &self,
        property_id: &PropertyId,
        tenant_id: &TenantId,
    ) -> Result<(Property, Tenant), RentalError> {
        let property = self
            .properties
            .get(property_id)
            .await?
            .ok_or_else(|| RentalError::PropertyNotFound(property_id.clone()))?;
        let tenant = self
            .tenants
            .get(tenant_id)
            .await?
            .ok_or_else(|| RentalError::TenantNotFound(tenant_id.clone()))?;
        Ok((property, tenant))
    }

    /// Schedules may only be persisted for pairs the tenant record backs.
    async fn require_association(
        &self,
        property_id: &PropertyId,
        tenant_id: &TenantId,
    ) -> Result<(), RentalError> {
        let (_, tenant) = self.load_pair(property_id, tenant_id).await?;
        if !tenant.rented_properties.contains(property_id) {
            return Err(ValidationError::UnknownAssociation {
                property_id: property_id.clone(),
                tenant_id: tenant_id.clone(),
            }
            .into());
        }
        Ok(())
    }

    async fn find_by_pair(
        &self,
        property_id: &PropertyId,
        tenant_id: &TenantId,
    ) -> Result<Option<RentalSchedule>, RentalError> {
        let schedules = self.schedules.list().await?;
        Ok(schedules
            .into_iter()
            .find(|schedule| &schedule.property_id == property_id && &schedule.tenant_id == tenant_id))
    }

    async fn apply_terms(
        &self,
        id: &ScheduleId,
        terms: ScheduleTerms,
    ) -> Result<RentalSchedule, RentalError> {
        let mut schedule = self
            .schedules
            .get(id)
            .await?
            .ok_or_else(|| RentalError::ScheduleNotFound(id.clone()))?;
        schedule.lease_start_date = terms.lease_start_date;
        schedule.lease_end_date = terms.lease_end_date;
        schedule.monthly_rent = terms.monthly_rent;
        schedule.deposit_amount = terms.deposit_amount;
        schedule.payment_day = terms.payment_day;
        if schedule.status == ScheduleStatus::Draft {
            schedule.status = ScheduleStatus::Active;
        }
        Ok(self.schedules.put(schedule).await?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RentalError {
    #[error("schedule {0} not found")]
    ScheduleNotFound(ScheduleId),
    #[error("property {0} not found")]
    PropertyNotFound(PropertyId),
    #[error("tenant {0} not found")]
    TenantNotFound(TenantId),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
