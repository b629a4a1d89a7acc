use crate::cli::ServeArgs;
use crate::infra::{seed_demo_data, AppState, MemoryDocumentStore};
use crate::routes::with_rental_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use rentdesk::config::AppConfig;
use rentdesk::error::AppError;
use rentdesk::rentals::{RentalService, RentalSession};
use rentdesk::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(MemoryDocumentStore::default());
    if config.store.seed_demo {
        seed_demo_data(&store);
        info!("seeded demo portfolio into the in-memory store");
    }

    let service = Arc::new(RentalService::new(
        store.clone(),
        store.clone(),
        store.clone(),
    ));
    let session = RentalSession::initialize(service.clone()).await?;

    let app = with_rental_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "rental desk ready");

    axum::serve(listener, app).await?;
    session.close();
    Ok(())
}
