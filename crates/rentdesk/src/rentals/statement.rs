//! Read models handed to clients: the merged overview, per-schedule
//! statements, and the CSV export of a statement's ledger.

use crate::rentals::domain::{
    PaymentId, PaymentKind, PaymentStatus, PropertyId, RentalPayment, RentalSchedule, ScheduleId,
    ScheduleStatus, TenantId,
};
use crate::rentals::ledger::{self, LedgerTotals};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io;

/// One ledger entry with its status derived against the read instant.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentView {
    pub id: PaymentId,
    pub amount: f64,
    pub due_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_date: Option<DateTime<Utc>>,
    pub status: PaymentStatus,
    pub status_label: &'static str,
    pub kind: PaymentKind,
    pub kind_label: &'static str,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

impl PaymentView {
    pub(crate) fn from_payment(payment: &RentalPayment, now: DateTime<Utc>) -> Self {
        let status = ledger::effective_status(payment, now);
        Self {
            id: payment.id.clone(),
            amount: payment.amount,
            due_date: payment.due_date,
            paid_date: payment.paid_date,
            status,
            status_label: status.label(),
            kind: payment.kind,
            kind_label: payment.kind.label(),
            description: payment.description.clone(),
            reference: payment.reference.clone(),
            method: payment.method.clone(),
        }
    }
}

/// One schedule row in the merged overview. `persisted` distinguishes stored
/// schedules from drafts synthesized out of the association pass.
#[derive(Debug, Clone, Serialize)]
pub struct OverviewEntry {
    pub schedule_id: ScheduleId,
    pub property_id: PropertyId,
    pub tenant_id: TenantId,
    pub persisted: bool,
    pub status: ScheduleStatus,
    pub status_label: &'static str,
    pub lease_start_date: DateTime<Utc>,
    pub lease_end_date: DateTime<Utc>,
    pub monthly_rent: f64,
    pub deposit_amount: f64,
    pub payment_day: u32,
    pub payments: Vec<PaymentView>,
}

impl OverviewEntry {
    pub(crate) fn from_schedule(
        schedule: &RentalSchedule,
        persisted: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            schedule_id: schedule.id.clone(),
            property_id: schedule.property_id.clone(),
            tenant_id: schedule.tenant_id.clone(),
            persisted,
            status: schedule.status,
            status_label: schedule.status.label(),
            lease_start_date: schedule.lease_start_date,
            lease_end_date: schedule.lease_end_date,
            monthly_rent: schedule.monthly_rent,
            deposit_amount: schedule.deposit_amount,
            payment_day: schedule.payment_day,
            payments: schedule
                .payments
                .iter()
                .map(|payment| PaymentView::from_payment(payment, now))
                .collect(),
        }
    }
}

/// Snapshot of every rental pairing the desk knows about, persisted or not.
#[derive(Debug, Clone, Serialize)]
pub struct RentalOverview {
    pub generated_at: DateTime<Utc>,
    pub rented_properties: Vec<PropertyId>,
    pub schedules: Vec<OverviewEntry>,
}

/// Full statement for one persisted schedule.
#[derive(Debug, Clone, Serialize)]
pub struct RentalStatement {
    pub schedule_id: ScheduleId,
    pub property_id: PropertyId,
    pub tenant_id: TenantId,
    pub status: ScheduleStatus,
    pub status_label: &'static str,
    pub lease_start_date: DateTime<Utc>,
    pub lease_end_date: DateTime<Utc>,
    pub monthly_rent: f64,
    pub as_of: DateTime<Utc>,
    #[serde(flatten)]
    pub totals: LedgerTotals,
    pub payments: Vec<PaymentView>,
}

impl RentalStatement {
    pub(crate) fn build(schedule: &RentalSchedule, now: DateTime<Utc>) -> Self {
        Self {
            schedule_id: schedule.id.clone(),
            property_id: schedule.property_id.clone(),
            tenant_id: schedule.tenant_id.clone(),
            status: schedule.status,
            status_label: schedule.status.label(),
            lease_start_date: schedule.lease_start_date,
            lease_end_date: schedule.lease_end_date,
            monthly_rent: schedule.monthly_rent,
            as_of: now,
            totals: ledger::summarize(schedule, now),
            payments: schedule
                .payments
                .iter()
                .map(|payment| PaymentView::from_payment(payment, now))
                .collect(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to encode statement csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to encode statement csv: {0}")]
    Io(#[from] io::Error),
}

/// Renders the statement's ledger as CSV, one row per payment, for the
/// export button on the accounting screen.
pub fn statement_csv(statement: &RentalStatement) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "due_date",
        "type",
        "description",
        "amount",
        "status",
        "paid_date",
        "reference",
        "method",
    ])?;
    for payment in &statement.payments {
        writer.write_record([
            payment.due_date.format("%Y-%m-%d").to_string(),
            payment.kind_label.to_string(),
            payment.description.clone(),
            format!("{:.2}", payment.amount),
            payment.status_label.to_string(),
            payment
                .paid_date
                .map(|paid| paid.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            payment.reference.clone().unwrap_or_default(),
            payment.method.clone().unwrap_or_default(),
        ])?;
    }
    writer.flush()?;
    let bytes = writer
        .into_inner()
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
