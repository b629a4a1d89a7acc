//! Core entities for the rental desk: properties, tenants, schedules and the
//! payments hanging off a schedule. Documents live in external collections;
//! these types mirror the stored shape plus the inputs accepted at the
//! service boundary.

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PropertyId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TenantId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScheduleId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PaymentId(pub String);

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ScheduleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ScheduleId {
    /// Stable identity for a draft synthesized from an association pair.
    /// Drafts are never looked up by id; the value only lets a client
    /// correlate the same draft across reconciliation passes.
    pub fn draft(property_id: &PropertyId, tenant_id: &TenantId) -> Self {
        Self(format!("draft_{}_{}", property_id.0, tenant_id.0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingType {
    Rental,
    Sale,
}

impl ListingType {
    pub const fn label(self) -> &'static str {
        match self {
            ListingType::Rental => "Rental",
            ListingType::Sale => "Sale",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyStatus {
    Available,
    Rented,
    Sold,
    Maintenance,
}

impl PropertyStatus {
    pub const fn label(self) -> &'static str {
        match self {
            PropertyStatus::Available => "Available",
            PropertyStatus::Rented => "Rented",
            PropertyStatus::Sold => "Sold",
            PropertyStatus::Maintenance => "Under maintenance",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantStatus {
    Active,
    Inactive,
}

impl TenantStatus {
    pub const fn label(self) -> &'static str {
        match self {
            TenantStatus::Active => "Active",
            TenantStatus::Inactive => "Inactive",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaseStatus {
    Active,
    Pending,
    Ended,
}

impl LeaseStatus {
    pub const fn label(self) -> &'static str {
        match self {
            LeaseStatus::Active => "Active lease",
            LeaseStatus::Pending => "Pending lease",
            LeaseStatus::Ended => "Ended lease",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    Draft,
    Active,
    Completed,
    Terminated,
}

impl ScheduleStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ScheduleStatus::Draft => "Draft",
            ScheduleStatus::Active => "Active",
            ScheduleStatus::Completed => "Completed",
            ScheduleStatus::Terminated => "Terminated",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, ScheduleStatus::Completed | ScheduleStatus::Terminated)
    }

    /// Allowed transitions: draft promotes to active; active closes out as
    /// completed or terminated. Terminal states accept nothing.
    pub const fn allows(self, next: ScheduleStatus) -> bool {
        matches!(
            (self, next),
            (ScheduleStatus::Draft, ScheduleStatus::Active)
                | (ScheduleStatus::Active, ScheduleStatus::Completed)
                | (ScheduleStatus::Active, ScheduleStatus::Terminated)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Overdue,
}

impl PaymentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Paid => "Paid",
            PaymentStatus::Overdue => "Overdue",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    Rent,
    SecurityDeposit,
    Other,
}

impl PaymentKind {
    pub const fn label(self) -> &'static str {
        match self {
            PaymentKind::Rent => "Rent",
            PaymentKind::SecurityDeposit => "Security deposit",
            PaymentKind::Other => "Other",
        }
    }
}

/// Lease-level defaults recorded on the property document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeaseTerms {
    #[serde(default)]
    pub deposit: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: PropertyId,
    pub listing_type: ListingType,
    pub status: PropertyStatus,
    /// Informational back-reference; the tenant side is authoritative.
    #[serde(default)]
    pub rented_to: BTreeSet<TenantId>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub lease_terms: LeaseTerms,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    /// Authoritative source of rental associations.
    #[serde(default)]
    pub rented_properties: BTreeSet<PropertyId>,
    pub status: TenantStatus,
    pub lease_status: LeaseStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentalPayment {
    pub id: PaymentId,
    pub amount: f64,
    pub due_date: DateTime<Utc>,
    #[serde(default)]
    pub paid_date: Option<DateTime<Utc>>,
    pub status: PaymentStatus,
    pub kind: PaymentKind,
    pub description: String,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentalSchedule {
    pub id: ScheduleId,
    pub property_id: PropertyId,
    pub tenant_id: TenantId,
    pub lease_start_date: DateTime<Utc>,
    pub lease_end_date: DateTime<Utc>,
    pub monthly_rent: f64,
    pub deposit_amount: f64,
    pub payment_day: u32,
    pub status: ScheduleStatus,
    /// Kept ordered by due date; `ledger::apply_receipt` re-sorts after
    /// every mutation.
    #[serde(default)]
    pub payments: Vec<RentalPayment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RentalSchedule {
    pub fn is_draft(&self) -> bool {
        self.status == ScheduleStatus::Draft
    }

    pub fn terms(&self) -> ScheduleTerms {
        ScheduleTerms {
            lease_start_date: self.lease_start_date,
            lease_end_date: self.lease_end_date,
            monthly_rent: self.monthly_rent,
            deposit_amount: self.deposit_amount,
            payment_day: self.payment_day,
        }
    }

    /// Draft synthesized for an association pair that has no persisted
    /// schedule yet. Defaults come off the property document; the lease
    /// window is one year from `now`.
    pub fn draft_for(property: &Property, tenant_id: &TenantId, now: DateTime<Utc>) -> Self {
        Self {
            id: ScheduleId::draft(&property.id, tenant_id),
            property_id: property.id.clone(),
            tenant_id: tenant_id.clone(),
            lease_start_date: now,
            lease_end_date: now.checked_add_months(Months::new(12)).unwrap_or(now),
            monthly_rent: property.price.unwrap_or(0.0),
            deposit_amount: property.lease_terms.deposit.unwrap_or(0.0),
            payment_day: 1,
            status: ScheduleStatus::Draft,
            payments: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Financial terms shared by the create and setup inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduleTerms {
    pub lease_start_date: DateTime<Utc>,
    pub lease_end_date: DateTime<Utc>,
    pub monthly_rent: f64,
    pub deposit_amount: f64,
    pub payment_day: u32,
}

impl ScheduleTerms {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_amount(self.monthly_rent, "monthly_rent")?;
        validate_amount(self.deposit_amount, "deposit_amount")?;
        if !(1..=31).contains(&self.payment_day) {
            return Err(ValidationError::PaymentDayOutOfRange(self.payment_day));
        }
        if self.lease_end_date <= self.lease_start_date {
            return Err(ValidationError::LeaseWindowInverted {
                start: self.lease_start_date,
                end: self.lease_end_date,
            });
        }
        Ok(())
    }
}

/// Input for `create_schedule`. The store assigns the id and both
/// timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSchedule {
    pub property_id: PropertyId,
    pub tenant_id: TenantId,
    pub lease_start_date: DateTime<Utc>,
    pub lease_end_date: DateTime<Utc>,
    pub monthly_rent: f64,
    pub deposit_amount: f64,
    pub payment_day: u32,
    pub status: ScheduleStatus,
    #[serde(default)]
    pub payments: Vec<RentalPayment>,
}

impl NewSchedule {
    pub fn terms(&self) -> ScheduleTerms {
        ScheduleTerms {
            lease_start_date: self.lease_start_date,
            lease_end_date: self.lease_end_date,
            monthly_rent: self.monthly_rent,
            deposit_amount: self.deposit_amount,
            payment_day: self.payment_day,
        }
    }

    /// Checks the terms plus every ledger entry supplied with the document.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.terms().validate()?;
        for payment in &self.payments {
            validate_amount(payment.amount, "payments.amount")?;
        }
        Ok(())
    }
}

/// Partial update for `update_schedule`; absent fields keep their stored
/// value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleChanges {
    #[serde(default)]
    pub lease_start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub lease_end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub monthly_rent: Option<f64>,
    #[serde(default)]
    pub deposit_amount: Option<f64>,
    #[serde(default)]
    pub payment_day: Option<u32>,
    #[serde(default)]
    pub status: Option<ScheduleStatus>,
}

/// Input for `record_payment`. A receipt targets the ledger entry with the
/// same due date; without a match it books a new entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub amount: f64,
    pub due_date: DateTime<Utc>,
    /// Settlement instant; defaults to the time of recording.
    #[serde(default)]
    pub paid_on: Option<DateTime<Utc>>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl PaymentReceipt {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_amount(self.amount, "amount")
    }
}

fn validate_amount(value: f64, field: &'static str) -> Result<(), ValidationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ValidationError::InvalidAmount { field, value });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} must be a finite, non-negative amount (got {value})")]
    InvalidAmount { field: &'static str, value: f64 },
    #[error("payment_day must fall within 1..=31 (got {0})")]
    PaymentDayOutOfRange(u32),
    #[error("lease_end_date {end} must fall after lease_start_date {start}")]
    LeaseWindowInverted {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("tenant {tenant_id} does not rent property {property_id}")]
    UnknownAssociation {
        property_id: PropertyId,
        tenant_id: TenantId,
    },
    #[error("schedule status cannot move from {from:?} to {to:?}")]
    IllegalTransition {
        from: ScheduleStatus,
        to: ScheduleStatus,
    },
    #[error("setup requires either schedule_id or property_id plus tenant_id")]
    MissingSetupTarget,
}
