use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    NewSchedule, PaymentReceipt, PropertyId, ScheduleChanges, ScheduleId, ScheduleTerms, TenantId,
    ValidationError,
};
use super::service::{RentalError, RentalService, SetupTarget};
use super::statement;
use super::store::{PropertyDirectory, ScheduleStore, StoreError, TenantDirectory};

/// Router builder exposing HTTP endpoints for the rental desk.
pub fn rental_router<P, T, S>(service: Arc<RentalService<P, T, S>>) -> Router
where
    P: PropertyDirectory + 'static,
    T: TenantDirectory + 'static,
    S: ScheduleStore + 'static,
{
    Router::new()
        .route("/api/v1/rentals/overview", get(overview_handler::<P, T, S>))
        .route(
            "/api/v1/rentals/schedules",
            post(create_schedule_handler::<P, T, S>),
        )
        .route(
            "/api/v1/rentals/schedules/setup",
            post(setup_schedule_handler::<P, T, S>),
        )
        .route(
            "/api/v1/rentals/schedules/:schedule_id",
            patch(update_schedule_handler::<P, T, S>)
                .delete(delete_schedule_handler::<P, T, S>),
        )
        .route(
            "/api/v1/rentals/schedules/:schedule_id/payments",
            post(record_payment_handler::<P, T, S>),
        )
        .route(
            "/api/v1/rentals/schedules/:schedule_id/statement",
            get(statement_handler::<P, T, S>),
        )
        .route(
            "/api/v1/rentals/schedules/:schedule_id/statement.csv",
            get(statement_csv_handler::<P, T, S>),
        )
        .route("/api/v1/rentals/links", post(link_handler::<P, T, S>))
        .route(
            "/api/v1/rentals/links/:property_id/:tenant_id",
            delete(unlink_handler::<P, T, S>),
        )
        .with_state(service)
}

/// Setup accepts either a persisted schedule id or an association pair,
/// alongside the financial terms to apply.
#[derive(Debug, Deserialize)]
pub(crate) struct SetupScheduleRequest {
    #[serde(default)]
    schedule_id: Option<ScheduleId>,
    #[serde(default)]
    property_id: Option<PropertyId>,
    #[serde(default)]
    tenant_id: Option<TenantId>,
    #[serde(flatten)]
    terms: ScheduleTerms,
}

impl SetupScheduleRequest {
    fn target(&self) -> Result<SetupTarget, ValidationError> {
        if let Some(id) = &self.schedule_id {
            return Ok(SetupTarget::Persisted(id.clone()));
        }
        match (&self.property_id, &self.tenant_id) {
            (Some(property_id), Some(tenant_id)) => Ok(SetupTarget::Association {
                property_id: property_id.clone(),
                tenant_id: tenant_id.clone(),
            }),
            _ => Err(ValidationError::MissingSetupTarget),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct LinkRequest {
    property_id: PropertyId,
    tenant_id: TenantId,
}

pub(crate) async fn overview_handler<P, T, S>(
    State(service): State<Arc<RentalService<P, T, S>>>,
) -> Response
where
    P: PropertyDirectory + 'static,
    T: TenantDirectory + 'static,
    S: ScheduleStore + 'static,
{
    match service.overview(Utc::now()).await {
        Ok(overview) => (StatusCode::OK, axum::Json(overview)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn create_schedule_handler<P, T, S>(
    State(service): State<Arc<RentalService<P, T, S>>>,
    axum::Json(new): axum::Json<NewSchedule>,
) -> Response
where
    P: PropertyDirectory + 'static,
    T: TenantDirectory + 'static,
    S: ScheduleStore + 'static,
{
    match service.create_schedule(new).await {
        Ok(schedule) => (StatusCode::CREATED, axum::Json(schedule)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn setup_schedule_handler<P, T, S>(
    State(service): State<Arc<RentalService<P, T, S>>>,
    axum::Json(request): axum::Json<SetupScheduleRequest>,
) -> Response
where
    P: PropertyDirectory + 'static,
    T: TenantDirectory + 'static,
    S: ScheduleStore + 'static,
{
    let target = match request.target() {
        Ok(target) => target,
        Err(err) => return error_response(RentalError::Validation(err)),
    };
    match service.setup_schedule(target, request.terms).await {
        Ok(schedule) => (StatusCode::OK, axum::Json(schedule)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn update_schedule_handler<P, T, S>(
    State(service): State<Arc<RentalService<P, T, S>>>,
    Path(schedule_id): Path<String>,
    axum::Json(changes): axum::Json<ScheduleChanges>,
) -> Response
where
    P: PropertyDirectory + 'static,
    T: TenantDirectory + 'static,
    S: ScheduleStore + 'static,
{
    let id = ScheduleId(schedule_id);
    match service.update_schedule(&id, changes).await {
        Ok(schedule) => (StatusCode::OK, axum::Json(schedule)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn delete_schedule_handler<P, T, S>(
    State(service): State<Arc<RentalService<P, T, S>>>,
    Path(schedule_id): Path<String>,
) -> Response
where
    P: PropertyDirectory + 'static,
    T: TenantDirectory + 'static,
    S: ScheduleStore + 'static,
{
    let id = ScheduleId(schedule_id);
    match service.delete_schedule(&id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn record_payment_handler<P, T, S>(
    State(service): State<Arc<RentalService<P, T, S>>>,
    Path(schedule_id): Path<String>,
    axum::Json(receipt): axum::Json<PaymentReceipt>,
) -> Response
where
    P: PropertyDirectory + 'static,
    T: TenantDirectory + 'static,
    S: ScheduleStore + 'static,
{
    let id = ScheduleId(schedule_id);
    match service.record_payment(&id, receipt).await {
        Ok(schedule) => (StatusCode::OK, axum::Json(schedule)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn statement_handler<P, T, S>(
    State(service): State<Arc<RentalService<P, T, S>>>,
    Path(schedule_id): Path<String>,
) -> Response
where
    P: PropertyDirectory + 'static,
    T: TenantDirectory + 'static,
    S: ScheduleStore + 'static,
{
    let id = ScheduleId(schedule_id);
    match service.statement(&id, Utc::now()).await {
        Ok(statement) => (StatusCode::OK, axum::Json(statement)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn statement_csv_handler<P, T, S>(
    State(service): State<Arc<RentalService<P, T, S>>>,
    Path(schedule_id): Path<String>,
) -> Response
where
    P: PropertyDirectory + 'static,
    T: TenantDirectory + 'static,
    S: ScheduleStore + 'static,
{
    let id = ScheduleId(schedule_id);
    let statement = match service.statement(&id, Utc::now()).await {
        Ok(statement) => statement,
        Err(err) => return error_response(err),
    };
    match statement::statement_csv(&statement) {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(err) => {
            let payload = json!({
                "error": err.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn link_handler<P, T, S>(
    State(service): State<Arc<RentalService<P, T, S>>>,
    axum::Json(request): axum::Json<LinkRequest>,
) -> Response
where
    P: PropertyDirectory + 'static,
    T: TenantDirectory + 'static,
    S: ScheduleStore + 'static,
{
    match service
        .link_tenant(&request.property_id, &request.tenant_id)
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn unlink_handler<P, T, S>(
    State(service): State<Arc<RentalService<P, T, S>>>,
    Path((property_id, tenant_id)): Path<(String, String)>,
) -> Response
where
    P: PropertyDirectory + 'static,
    T: TenantDirectory + 'static,
    S: ScheduleStore + 'static,
{
    match service
        .unlink_tenant(&PropertyId(property_id), &TenantId(tenant_id))
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(error: RentalError) -> Response {
    let status = match &error {
        RentalError::ScheduleNotFound(_)
        | RentalError::PropertyNotFound(_)
        | RentalError::TenantNotFound(_)
        | RentalError::Store(StoreError::NotFound) => StatusCode::NOT_FOUND,
        RentalError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        RentalError::Store(StoreError::Unavailable(_)) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
