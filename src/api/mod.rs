use crate::identity::Registrar;
use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Method, Request},
    routing::{get, post, put},
    Extension, Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{debug_span, info, Span};
use ulid::Ulid;
use url::Url;
use utoipa_swagger_ui::SwaggerUi;

pub mod handlers;
pub mod openapi;

pub use handlers::AdminGuard;

/// Application routes without the transport layers.
pub fn router(registrar: Arc<Registrar>, admin: Arc<AdminGuard>) -> Router {
    Router::new()
        .route("/", get(|| async { env!("CARGO_PKG_NAME") }))
        .route(
            "/health",
            get(handlers::health::health).options(handlers::health::health),
        )
        .route("/api/health", get(handlers::health::liveness))
        .route("/api/login", post(handlers::login::login))
        .route("/api/submit", post(handlers::submit::submit))
        .route("/api/check-student", post(handlers::check::check_student))
        .route("/api/admin/login", post(handlers::admin::admin_login))
        .route("/api/admin/students", get(handlers::admin::list_students))
        .route(
            "/api/admin/students/:identifier",
            put(handlers::admin::update_student).delete(handlers::admin::delete_student),
        )
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::openapi()))
        .layer(Extension(registrar))
        .layer(Extension(admin))
}

/// Serve the API until ctrl-c.
/// # Errors
/// Returns an error if the origin is invalid or the server fails to start
pub async fn new(
    port: u16,
    registrar: Arc<Registrar>,
    admin: Arc<AdminGuard>,
    frontend_origin: Option<String>,
) -> Result<()> {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
        .allow_origin(allow_origin(frontend_origin.as_deref())?);

    let app = router(registrar, admin).layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static("x-request-id"),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(cors),
    );

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                info!("Failed to listen for shutdown signal: {}", err);
            }
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

// Restrict CORS to the configured frontend, or allow any origin when unset.
fn allow_origin(frontend_origin: Option<&str>) -> Result<AllowOrigin> {
    let Some(origin) = frontend_origin else {
        return Ok(AllowOrigin::from(Any));
    };

    let url = Url::parse(origin).context("Invalid frontend origin")?;
    let origin = url.origin().ascii_serialization();
    let value = HeaderValue::from_str(&origin).context("Invalid frontend origin header")?;

    Ok(AllowOrigin::exact(value))
}

// span
fn make_span(request: &Request<Body>) -> Span {
    let headers = request.headers();
    let path = request.uri().path();
    let request_id = headers
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    debug_span!("http-request", path, ?headers, request_id)
}
