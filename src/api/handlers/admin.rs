//! Admin panel endpoints.
//!
//! Flow Overview:
//! 1) `POST /api/admin/login` is a stateless credential check; no session is issued.
//! 2) Every other admin route re-checks HTTP Basic credentials on each request.
//! 3) Edits merge into existing records only; deletes are permanent.

use super::{
    error_response, rejection_response, MessageResponse, StudentPayload, StudentView,
};
use crate::identity::{identifier::normalize, Registrar};
use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::{header::AUTHORIZATION, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use base64ct::{Base64, Encoding};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{debug, instrument, warn};
use utoipa::ToSchema;

/// Configured admin credentials. `None` disables the admin panel.
#[derive(Default)]
pub struct AdminGuard {
    credentials: Option<(String, SecretString)>,
}

impl AdminGuard {
    #[must_use]
    pub fn new(username: &str, password: SecretString) -> Self {
        Self {
            credentials: Some((username.to_string(), password)),
        }
    }

    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.credentials.is_some()
    }

    #[must_use]
    pub fn check(&self, username: &str, password: &str) -> bool {
        self.credentials.as_ref().is_some_and(|(expected, secret)| {
            let username_matches = bool::from(expected.as_bytes().ct_eq(username.as_bytes()));
            let password_matches =
                bool::from(secret.expose_secret().as_bytes().ct_eq(password.as_bytes()));

            !password.is_empty() && username_matches & password_matches
        })
    }

    /// Validate an `Authorization: Basic ..` header.
    #[must_use]
    pub fn authorize(&self, headers: &HeaderMap) -> bool {
        headers
            .get(AUTHORIZATION)
            .and_then(basic_credentials)
            .is_some_and(|(username, password)| self.check(&username, &password))
    }
}

impl std::fmt::Debug for AdminGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminGuard")
            .field(
                "username",
                &self.credentials.as_ref().map(|(username, _)| username),
            )
            .field("password", &"***")
            .finish()
    }
}

fn basic_credentials(value: &HeaderValue) -> Option<(String, String)> {
    let encoded = value.to_str().ok()?.strip_prefix("Basic ")?.trim();
    let decoded = Base64::decode_vec(encoded).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

fn unauthorized() -> Response {
    let mut response =
        MessageResponse::reply(StatusCode::UNAUTHORIZED, "Admin credentials required");
    response.headers_mut().insert(
        "WWW-Authenticate",
        HeaderValue::from_static("Basic realm=\"registrar-admin\""),
    );
    response
}

#[derive(ToSchema, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdminLogin {
    username: String,
    password: String,
}

#[utoipa::path(
    post,
    path = "/api/admin/login",
    request_body = AdminLogin,
    responses (
        (status = 200, description = "Admin credentials accepted", body = MessageResponse),
        (status = 401, description = "Invalid admin credentials", body = MessageResponse),
    ),
    tag = "admin"
)]
#[instrument(skip(guard, payload))]
pub async fn admin_login(
    guard: Extension<Arc<AdminGuard>>,
    payload: Result<Json<AdminLogin>, JsonRejection>,
) -> Response {
    let login = match payload {
        Ok(Json(login)) => login,
        Err(rejection) => return rejection_response(&rejection),
    };

    if guard.check(&login.username, &login.password) {
        debug!("Admin login successful");

        MessageResponse::reply(StatusCode::OK, "Admin login successful")
    } else {
        warn!("Admin login rejected");

        MessageResponse::reply(StatusCode::UNAUTHORIZED, "Invalid admin credentials")
    }
}

#[utoipa::path(
    get,
    path = "/api/admin/students",
    responses (
        (status = 200, description = "All students ordered by identifier", body = [StudentView]),
        (status = 401, description = "Missing or invalid admin credentials", body = MessageResponse),
    ),
    security(("basic" = [])),
    tag = "admin"
)]
#[instrument(skip_all)]
pub async fn list_students(
    headers: HeaderMap,
    guard: Extension<Arc<AdminGuard>>,
    registrar: Extension<Arc<Registrar>>,
) -> Response {
    if !guard.authorize(&headers) {
        return unauthorized();
    }

    match registrar.list().await {
        Ok(records) => {
            let students: Vec<StudentView> = records.into_iter().map(StudentView::from).collect();

            (StatusCode::OK, Json(students)).into_response()
        }
        Err(err) => error_response(&err),
    }
}

#[utoipa::path(
    put,
    path = "/api/admin/students/{identifier}",
    params(
        ("identifier" = String, Path, description = "Student identifier")
    ),
    request_body = StudentPayload,
    responses (
        (status = 200, description = "Student updated", body = StudentView),
        (status = 400, description = "Invalid payload", body = MessageResponse),
        (status = 401, description = "Missing or invalid admin credentials", body = MessageResponse),
        (status = 404, description = "Student not found", body = MessageResponse),
    ),
    security(("basic" = [])),
    tag = "admin"
)]
#[instrument(skip(headers, guard, registrar, payload))]
pub async fn update_student(
    Path(identifier): Path<String>,
    headers: HeaderMap,
    guard: Extension<Arc<AdminGuard>>,
    registrar: Extension<Arc<Registrar>>,
    payload: Result<Json<StudentPayload>, JsonRejection>,
) -> Response {
    if !guard.authorize(&headers) {
        return unauthorized();
    }

    let payload = match payload {
        Ok(Json(payload)) => payload,
        Err(rejection) => return rejection_response(&rejection),
    };

    let (body_identifier, patch) = payload.into_parts();
    if body_identifier.is_some_and(|body| normalize(&body) != normalize(&identifier)) {
        return MessageResponse::reply(
            StatusCode::BAD_REQUEST,
            "identifier cannot be changed",
        );
    }

    match registrar.update(&identifier, patch).await {
        Ok(Some(record)) => (StatusCode::OK, Json(StudentView::from(record))).into_response(),
        Ok(None) => MessageResponse::reply(StatusCode::NOT_FOUND, "Student not found"),
        Err(err) => error_response(&err),
    }
}

#[utoipa::path(
    delete,
    path = "/api/admin/students/{identifier}",
    params(
        ("identifier" = String, Path, description = "Student identifier")
    ),
    responses (
        (status = 204, description = "Student deleted"),
        (status = 401, description = "Missing or invalid admin credentials", body = MessageResponse),
        (status = 404, description = "Student not found", body = MessageResponse),
    ),
    security(("basic" = [])),
    tag = "admin"
)]
#[instrument(skip(headers, guard, registrar))]
pub async fn delete_student(
    Path(identifier): Path<String>,
    headers: HeaderMap,
    guard: Extension<Arc<AdminGuard>>,
    registrar: Extension<Arc<Registrar>>,
) -> Response {
    if !guard.authorize(&headers) {
        return unauthorized();
    }

    match registrar.delete(&identifier).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => MessageResponse::reply(StatusCode::NOT_FOUND, "Student not found"),
        Err(err) => error_response(&err),
    }
}
