use crate::infra::{parse_instant, seed_demo_data, MemoryDocumentStore};
use chrono::{DateTime, Months, Utc};
use clap::Args;
use rentdesk::error::AppError;
use rentdesk::rentals::{
    generate_payments, statement_csv, PaymentReceipt, PropertyId, RentalSchedule, RentalService,
    RentalSession, RentalStatement, ScheduleId, ScheduleStatus, ScheduleTerms, SetupTarget,
    TenantId,
};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Evaluation instant for statements (YYYY-MM-DD). Defaults to now.
    #[arg(long, value_parser = parse_instant)]
    pub(crate) as_of: Option<DateTime<Utc>>,
    /// Print the statement's CSV export at the end of the run.
    #[arg(long)]
    pub(crate) include_csv: bool,
}

#[derive(Args, Debug)]
pub(crate) struct LedgerPreviewArgs {
    /// Lease start date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_instant)]
    pub(crate) lease_start: DateTime<Utc>,
    /// Lease end date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_instant)]
    pub(crate) lease_end: DateTime<Utc>,
    /// Monthly rent amount
    #[arg(long)]
    pub(crate) monthly_rent: f64,
    /// Security deposit amount
    #[arg(long, default_value_t = 0.0)]
    pub(crate) deposit: f64,
    /// Day of the month rent falls due
    #[arg(long, default_value_t = 1)]
    pub(crate) payment_day: u32,
}

pub(crate) fn run_ledger_preview(args: LedgerPreviewArgs) -> Result<(), AppError> {
    let LedgerPreviewArgs {
        lease_start,
        lease_end,
        monthly_rent,
        deposit,
        payment_day,
    } = args;

    let terms = ScheduleTerms {
        lease_start_date: lease_start,
        lease_end_date: lease_end,
        monthly_rent,
        deposit_amount: deposit,
        payment_day,
    };
    terms.validate()?;

    let now = Utc::now();
    let schedule = RentalSchedule {
        id: ScheduleId("preview".to_string()),
        property_id: PropertyId("unassigned".to_string()),
        tenant_id: TenantId("unassigned".to_string()),
        lease_start_date: terms.lease_start_date,
        lease_end_date: terms.lease_end_date,
        monthly_rent: terms.monthly_rent,
        deposit_amount: terms.deposit_amount,
        payment_day: terms.payment_day,
        status: ScheduleStatus::Draft,
        payments: Vec::new(),
        created_at: now,
        updated_at: now,
    };

    let projected = generate_payments(&schedule);
    println!(
        "Projected ledger for {} -> {} (rent {:.2}, day {})",
        lease_start.format("%Y-%m-%d"),
        lease_end.format("%Y-%m-%d"),
        monthly_rent,
        payment_day
    );
    for payment in &projected {
        println!(
            "- {} | {:>10.2} | {}",
            payment.due_date.format("%Y-%m-%d"),
            payment.amount,
            payment.description
        );
    }
    println!(
        "{} payments totalling {:.2}",
        projected.len(),
        projected.iter().map(|payment| payment.amount).sum::<f64>()
    );

    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { as_of, include_csv } = args;
    let as_of = as_of.unwrap_or_else(Utc::now);

    println!("Rental desk demo (evaluated {})", as_of.format("%Y-%m-%d"));

    let store = Arc::new(MemoryDocumentStore::default());
    seed_demo_data(&store);
    let service = Arc::new(RentalService::new(
        store.clone(),
        store.clone(),
        store.clone(),
    ));
    let mut session = RentalSession::initialize(service.clone()).await?;

    println!("\nMerged overview (live session)");
    let overview = session.overview();
    for entry in &overview.schedules {
        println!(
            "- {} x {} -> {} ({})",
            entry.property_id,
            entry.tenant_id,
            entry.status_label,
            if entry.persisted { "stored" } else { "draft" }
        );
    }
    println!(
        "{} rented properties tracked",
        overview.rented_properties.len()
    );

    println!("\nSchedule setup");
    let property_id = PropertyId("maple-04".to_string());
    let tenant_id = TenantId("t-nguyen".to_string());
    let lease_end = as_of
        .checked_add_months(Months::new(12))
        .unwrap_or(as_of);
    let schedule = service
        .setup_schedule(
            SetupTarget::Association {
                property_id: property_id.clone(),
                tenant_id: tenant_id.clone(),
            },
            ScheduleTerms {
                lease_start_date: as_of,
                lease_end_date: lease_end,
                monthly_rent: 1180.0,
                deposit_amount: 2360.0,
                payment_day: 1,
            },
        )
        .await?;
    println!(
        "- Persisted {} for {} x {} ({} seeded payments)",
        schedule.id,
        property_id,
        tenant_id,
        schedule.payments.len()
    );

    println!("\nPayments");
    let settled = service
        .record_payment(
            &schedule.id,
            PaymentReceipt {
                amount: 2360.0,
                due_date: as_of,
                paid_on: Some(as_of),
                method: Some("bank_transfer".to_string()),
                reference: Some("DEP-1001".to_string()),
                notes: None,
            },
        )
        .await?;
    println!(
        "- Deposit settled, ledger still holds {} entries",
        settled.payments.len()
    );
    let extended = service
        .record_payment(
            &schedule.id,
            PaymentReceipt {
                amount: 85.0,
                due_date: as_of + chrono::Duration::days(13),
                paid_on: None,
                method: Some("cash".to_string()),
                reference: None,
                notes: Some("Lock replacement".to_string()),
            },
        )
        .await?;
    println!(
        "- Ad-hoc charge booked, ledger grew to {} entries",
        extended.payments.len()
    );

    let statement = service.statement(&schedule.id, as_of).await?;
    render_statement(&statement);

    if include_csv {
        println!("\nCSV export");
        println!("{}", statement_csv(&statement)?);
    }

    println!("\nProjected monthly ledger");
    let projected = generate_payments(&extended);
    for payment in projected.iter().take(3) {
        println!(
            "- {} | {:>10.2} | {}",
            payment.due_date.format("%Y-%m-%d"),
            payment.amount,
            payment.description
        );
    }
    if projected.len() > 3 {
        println!("  ... {} further entries", projected.len() - 3);
    }

    println!("\nUnlink");
    service
        .unlink_tenant(
            &PropertyId("birch-201".to_string()),
            &TenantId("t-okafor".to_string()),
        )
        .await?;
    if session.changed().await {
        let live = session.overview();
        println!(
            "- Session snapshot now tracks {} pairings",
            live.schedules.len()
        );
    }

    session.close();
    Ok(())
}

fn render_statement(statement: &RentalStatement) {
    println!("\nStatement for {}", statement.schedule_id);
    println!(
        "Window {} -> {} | status {}",
        statement.lease_start_date.format("%Y-%m-%d"),
        statement.lease_end_date.format("%Y-%m-%d"),
        statement.status_label
    );
    println!(
        "Paid {:.2} | overdue {:.2} | pending {:.2}",
        statement.totals.total_paid, statement.totals.total_overdue, statement.totals.total_pending
    );
    if let Some(next) = statement.totals.next_payment_date {
        println!("Next payment due {}", next.format("%Y-%m-%d"));
    }
    for payment in &statement.payments {
        println!(
            "- {} | {:>10.2} | {} | {}",
            payment.due_date.format("%Y-%m-%d"),
            payment.amount,
            payment.status_label,
            payment.description
        );
    }
}
