use crate::{identity::Registrar, GIT_COMMIT_HASH};
use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::{timeout, Duration};
use tracing::{debug, error, instrument};
use utoipa::ToSchema;

const HEALTH_STORE_TIMEOUT_SECONDS: u64 = 2;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    store: String,
    database: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Liveness {
    status: String,
}

#[utoipa::path(
    get,
    path= "/api/health",
    responses (
        (status = 200, description = "Process is serving requests", body = Liveness),
    ),
    tag = "health",
)]
// liveness only, never touches the store
pub async fn liveness() -> Json<Liveness> {
    Json(Liveness {
        status: "ok".to_string(),
    })
}

#[utoipa::path(
    get,
    path= "/health",
    responses (
        (status = 200, description = "Store is reachable", body = Health),
        (status = 503, description = "Store is unreachable", body = Health)
    ),
    tag = "health",
)]
// axum handler for health
#[instrument(skip_all)]
pub async fn health(method: Method, registrar: Extension<Arc<Registrar>>) -> impl IntoResponse {
    let store = registrar.store();

    let healthy = match timeout(
        Duration::from_secs(HEALTH_STORE_TIMEOUT_SECONDS),
        store.ping(),
    )
    .await
    {
        Ok(Ok(())) => true,
        Ok(Err(err)) => {
            error!("Failed to ping store: {}", err);
            false
        }
        Err(_) => {
            error!("Store ping timed out");
            false
        }
    };

    let health = Health {
        commit: GIT_COMMIT_HASH.to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store: store.kind().to_string(),
        database: if healthy {
            "ok".to_string()
        } else {
            "error".to_string()
        },
    };

    let body = if method == Method::GET {
        Json(&health).into_response()
    } else {
        Body::empty().into_response()
    };

    let short_hash = if health.commit.len() > 7 {
        &health.commit[0..7]
    } else {
        ""
    };

    let headers = format!("{}:{}:{}", health.name, health.version, short_hash)
        .parse::<HeaderValue>()
        .map(|x_app_header_value| {
            debug!("X-App header: {:?}", x_app_header_value);

            let mut headers = HeaderMap::new();
            headers.insert("X-App", x_app_header_value);
            headers
        })
        .map_err(|err| {
            debug!("Failed to parse X-App header: {}", err);
        })
        .unwrap_or_else(|()| HeaderMap::new());

    if healthy {
        (StatusCode::OK, headers, body)
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, headers, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::test_support::{app, send};
    use anyhow::Result;
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_reports_memory_store() -> Result<()> {
        let (app, _store) = app();
        let request = Request::builder()
            .method("GET")
            .uri("/health")
            .body(Body::empty())?;
        let (status, body) = send(&app, request).await?;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], env!("CARGO_PKG_NAME"));
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(body["store"], "memory");
        assert_eq!(body["database"], "ok");
        Ok(())
    }

    #[tokio::test]
    async fn liveness_is_ok() -> Result<()> {
        let (app, _store) = app();
        let request = Request::builder()
            .method("GET")
            .uri("/api/health")
            .body(Body::empty())?;
        let (status, body) = send(&app, request).await?;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({ "status": "ok" }));
        Ok(())
    }

    #[tokio::test]
    async fn health_options_has_header_and_no_body() -> Result<()> {
        let (app, _store) = app();
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/health")
            .body(Body::empty())?;
        let response = app.oneshot(request).await?;

        assert_eq!(response.status(), StatusCode::OK);
        let x_app = response
            .headers()
            .get("X-App")
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        assert!(x_app.starts_with(&format!(
            "{}:{}:",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        )));

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        assert!(bytes.is_empty());
        Ok(())
    }
}
