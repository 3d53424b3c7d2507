use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryAdmissionRepository, LoggingMailTransport};
use crate::routes::with_operational_routes;
use admission_intake::admissions::{AdmissionService, ServiceSettings};
use admission_intake::config::AppConfig;
use admission_intake::error::AppError;
use admission_intake::rendering::{DocumentTemplate, RenderDispatcher};
use admission_intake::telemetry;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::{AtomicBool, Ordering};
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

    std::fs::create_dir_all(&config.storage.upload_dir)?;
    std::fs::create_dir_all(&config.storage.pdf_dir)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let template = Arc::new(
        DocumentTemplate::new(config.branding.clone())
            .with_max_image_bytes(config.storage.max_upload_bytes),
    );
    let renderer = RenderDispatcher::standard(template, &config.rendering);
    info!(
        tiers = ?renderer.tier_names(),
        force_fallback = config.rendering.force_fallback,
        "pdf render chain configured"
    );

    let admission_service = Arc::new(AdmissionService::new(
        Arc::new(InMemoryAdmissionRepository::default()),
        Arc::new(LoggingMailTransport),
        renderer,
        ServiceSettings::from_config(&config),
    ));

    let app = with_operational_routes(admission_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "admission intake service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
