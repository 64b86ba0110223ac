use super::{error_response, rejection_response, MessageResponse, StudentView};
use crate::identity::{Outcome, Registrar, RegistryError};
use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    identifier: String,
    password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LoginStatus {
    Registered,
    Authenticated,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    pub status: LoginStatus,
    pub student: StudentView,
}

#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses (
        (status = 200, description = "Returning student authenticated", body = LoginResponse, content_type = "application/json"),
        (status = 201, description = "New student registered", body = LoginResponse, content_type = "application/json"),
        (status = 400, description = "Missing credentials or identifier outside the student domain", body = MessageResponse),
        (status = 401, description = "Invalid credentials", body = MessageResponse),
        (status = 409, description = "Identifier changed concurrently on both attempts", body = MessageResponse),
        (status = 500, description = "Store or hasher failure", body = MessageResponse),
    ),
    tag = "students"
)]
// axum handler for login / first-time registration
#[instrument(skip(registrar, payload))]
pub async fn login(
    registrar: Extension<Arc<Registrar>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return rejection_response(&rejection),
    };

    let outcome = match registrar
        .resolve(&request.identifier, &request.password)
        .await
    {
        Err(RegistryError::DuplicateIdentifier) => {
            // Lost a registration or claim race; resolve against the winner.
            debug!("Retrying resolution after concurrent write");

            registrar
                .resolve(&request.identifier, &request.password)
                .await
        }
        other => other,
    };

    match outcome {
        Ok(Outcome::NewRegistration(record)) => (
            StatusCode::CREATED,
            Json(LoginResponse {
                status: LoginStatus::Registered,
                student: record.into(),
            }),
        )
            .into_response(),

        Ok(Outcome::Authenticated(record)) => (
            StatusCode::OK,
            Json(LoginResponse {
                status: LoginStatus::Authenticated,
                student: record.into(),
            }),
        )
            .into_response(),

        Ok(Outcome::Rejected) => {
            debug!("Unauthorized");

            MessageResponse::reply(StatusCode::UNAUTHORIZED, "Invalid credentials")
        }

        Err(err) => error_response(&err),
    }
}
