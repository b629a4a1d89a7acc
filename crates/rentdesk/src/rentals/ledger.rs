//! Payment ledger arithmetic. Everything here is pure over a schedule's
//! payment list plus an explicit `now`; persistence and clock reads stay in
//! the service layer.

use crate::rentals::domain::{
    PaymentId, PaymentKind, PaymentReceipt, PaymentStatus, RentalPayment, RentalSchedule,
};
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

static PAYMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_payment_id() -> PaymentId {
    let id = PAYMENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    PaymentId(format!("pay-{id:06}"))
}

/// Presentation status of a single payment. `paid` is sticky; everything
/// else is derived from the due date at read time and never written back.
pub fn effective_status(payment: &RentalPayment, now: DateTime<Utc>) -> PaymentStatus {
    if payment.status == PaymentStatus::Paid {
        PaymentStatus::Paid
    } else if payment.due_date < now {
        PaymentStatus::Overdue
    } else {
        PaymentStatus::Pending
    }
}

/// Books a receipt against the ledger, keyed by exact due date.
///
/// A matching entry is settled in place and keeps its id; without a match a
/// fresh entry is appended. Either way the list comes back sorted by due
/// date. Returns the id of the touched entry.
pub fn apply_receipt(
    payments: &mut Vec<RentalPayment>,
    receipt: &PaymentReceipt,
    now: DateTime<Utc>,
) -> PaymentId {
    let paid_date = receipt.paid_on.unwrap_or(now);
    let touched = match payments
        .iter()
        .position(|payment| payment.due_date == receipt.due_date)
    {
        Some(index) => {
            let entry = &mut payments[index];
            entry.amount = receipt.amount;
            entry.status = PaymentStatus::Paid;
            entry.paid_date = Some(paid_date);
            if let Some(method) = &receipt.method {
                entry.method = Some(method.clone());
            }
            if let Some(reference) = &receipt.reference {
                entry.reference = Some(reference.clone());
            }
            if let Some(notes) = &receipt.notes {
                entry.description = notes.clone();
            }
            entry.id.clone()
        }
        None => {
            let id = next_payment_id();
            payments.push(RentalPayment {
                id: id.clone(),
                amount: receipt.amount,
                due_date: receipt.due_date,
                paid_date: Some(paid_date),
                status: PaymentStatus::Paid,
                kind: PaymentKind::Other,
                description: receipt
                    .notes
                    .clone()
                    .unwrap_or_else(|| "Recorded payment".to_string()),
                reference: receipt.reference.clone(),
                method: receipt.method.clone(),
            });
            id
        }
    };
    payments.sort_by(|a, b| a.due_date.cmp(&b.due_date));
    touched
}

/// The two entries every freshly set-up schedule starts with, both pending
/// and due on the first day of the lease.
pub fn seed_payments(
    lease_start: DateTime<Utc>,
    monthly_rent: f64,
    deposit_amount: f64,
) -> Vec<RentalPayment> {
    vec![
        RentalPayment {
            id: next_payment_id(),
            amount: deposit_amount,
            due_date: lease_start,
            paid_date: None,
            status: PaymentStatus::Pending,
            kind: PaymentKind::SecurityDeposit,
            description: "Security deposit".to_string(),
            reference: None,
            method: None,
        },
        RentalPayment {
            id: next_payment_id(),
            amount: monthly_rent,
            due_date: lease_start,
            paid_date: None,
            status: PaymentStatus::Pending,
            kind: PaymentKind::Rent,
            description: "First month rent".to_string(),
            reference: None,
            method: None,
        },
    ]
}

/// Projects one pending rent entry per calendar month whose due date
/// (`payment_day`, clamped to the month's length) falls inside the lease
/// window, both ends inclusive. An inverted window projects nothing.
pub fn generate_payments(schedule: &RentalSchedule) -> Vec<RentalPayment> {
    let start = schedule.lease_start_date;
    let end = schedule.lease_end_date;
    let mut payments = Vec::new();
    let (mut year, mut month) = (start.year(), start.month());

    while let Some(due) = due_on(year, month, schedule.payment_day) {
        if due > end {
            break;
        }
        if due >= start {
            payments.push(RentalPayment {
                id: next_payment_id(),
                amount: schedule.monthly_rent,
                due_date: due,
                paid_date: None,
                status: PaymentStatus::Pending,
                kind: PaymentKind::Rent,
                description: format!("Monthly rent for {}", due.format("%B %Y")),
                reference: None,
                method: None,
            });
        }
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }
    payments
}

/// Due date of the next rent cycle: `payment_day` of the month after `now`,
/// December rolling into January. The day is clamped so a 31st-of-month
/// agreement still lands inside February.
pub fn next_payment_date(now: DateTime<Utc>, payment_day: u32) -> Option<DateTime<Utc>> {
    let (year, month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };
    due_on(year, month, payment_day)
}

/// Totals shown on a statement. `total_pending` reports the recurring
/// monthly obligation, not a sum over open entries; `next_payment_date`
/// comes from the payment day alone, never from the entry list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LedgerTotals {
    pub total_paid: f64,
    pub total_overdue: f64,
    pub total_pending: f64,
    pub next_payment_date: Option<DateTime<Utc>>,
}

pub fn summarize(schedule: &RentalSchedule, now: DateTime<Utc>) -> LedgerTotals {
    let mut total_paid = 0.0;
    let mut total_overdue = 0.0;
    for payment in &schedule.payments {
        if payment.status == PaymentStatus::Paid {
            total_paid += payment.amount;
        } else if payment.due_date < now {
            total_overdue += payment.amount;
        }
    }
    LedgerTotals {
        total_paid,
        total_overdue,
        total_pending: schedule.monthly_rent,
        next_payment_date: next_payment_date(now, schedule.payment_day),
    }
}

fn due_on(year: i32, month: u32, payment_day: u32) -> Option<DateTime<Utc>> {
    let day = payment_day.min(days_in_month(year, month));
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).single()
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}
