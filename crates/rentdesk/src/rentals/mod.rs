//! Rental schedules and their payment ledgers.
//!
//! Properties and tenants are managed elsewhere; this module derives their
//! rental pairings, keeps one schedule per pairing through its lifecycle,
//! and books payments against each schedule's ledger. Storage is reached
//! through the traits in [`store`], so the same core runs against the
//! production document database and the in-memory store used by tests and
//! the bundled demo.

pub mod associations;
pub mod domain;
pub mod ledger;
pub mod router;
pub mod service;
pub mod session;
pub mod statement;
pub mod store;

#[cfg(test)]
mod tests;

pub use associations::{resolve_associations, AssociationSet, RentalPairing};
pub use domain::{
    LeaseStatus, LeaseTerms, ListingType, NewSchedule, PaymentId, PaymentKind, PaymentReceipt,
    PaymentStatus, Property, PropertyId, PropertyStatus, RentalPayment, RentalSchedule,
    ScheduleChanges, ScheduleId, ScheduleStatus, ScheduleTerms, Tenant, TenantId, TenantStatus,
    ValidationError,
};
pub use ledger::{
    apply_receipt, effective_status, generate_payments, next_payment_date, seed_payments,
    summarize, LedgerTotals,
};
pub use router::rental_router;
pub use service::{RentalError, RentalService, SetupTarget};
pub use session::RentalSession;
pub use statement::{
    statement_csv, ExportError, OverviewEntry, PaymentView, RentalOverview, RentalStatement,
};
pub use store::{
    ChangeEvent, ChangeKind, Collection, PropertyDirectory, PropertyPatch, ScheduleStore,
    StoreError, StoreResult, TenantDirectory, TenantPatch,
};
