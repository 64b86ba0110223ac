pub mod admin;
pub mod check;
pub mod health;
pub mod login;
pub mod submit;

pub use self::admin::AdminGuard;

// common types and helpers for the handlers
use crate::identity::{Profile, RegistryError, StudentPatch, StudentRecord};
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub(crate) fn reply(status: StatusCode, message: impl Into<String>) -> Response {
        (
            status,
            Json(Self {
                message: message.into(),
            }),
        )
            .into_response()
    }
}

/// Public view of a student. Never carries the credential.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StudentView {
    pub id: Uuid,
    pub identifier: String,
    pub revision: i64,
    #[serde(flatten)]
    pub profile: Profile,
}

impl From<StudentRecord> for StudentView {
    fn from(record: StudentRecord) -> Self {
        Self {
            id: record.id,
            identifier: record.identifier,
            revision: record.revision,
            profile: record.profile,
        }
    }
}

/// Body accepted by submit and admin edit.
///
/// Unknown keys are rejected. The storage metadata keys a client may echo
/// back from an earlier response are accepted and discarded.
#[derive(ToSchema, Deserialize, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StudentPayload {
    pub identifier: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub student_id: Option<String>,
    pub education: Option<String>,
    pub major: Option<String>,
    pub degree_start: Option<String>,
    pub degree_end: Option<String>,
    pub gender: Option<String>,
    #[serde(rename = "_id")]
    #[schema(value_type = Option<Object>)]
    pub store_id: Option<serde_json::Value>,
    #[serde(rename = "__v")]
    #[schema(value_type = Option<Object>)]
    pub store_version: Option<serde_json::Value>,
    #[schema(value_type = Option<Object>)]
    pub id: Option<serde_json::Value>,
    #[schema(value_type = Option<Object>)]
    pub revision: Option<serde_json::Value>,
}

impl std::fmt::Debug for StudentPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StudentPayload")
            .field("identifier", &self.identifier)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish_non_exhaustive()
    }
}

impl StudentPayload {
    /// Split into the identifier and a patch with storage metadata stripped.
    pub(crate) fn into_parts(self) -> (Option<String>, StudentPatch) {
        if self.store_id.is_some()
            || self.store_version.is_some()
            || self.id.is_some()
            || self.revision.is_some()
        {
            debug!("Discarding client-supplied storage metadata");
        }

        let patch = StudentPatch {
            credential: self.password,
            profile: Profile {
                first_name: self.first_name,
                last_name: self.last_name,
                email: self.email,
                student_id: self.student_id,
                education: self.education,
                major: self.major,
                degree_start: self.degree_start,
                degree_end: self.degree_end,
                gender: self.gender,
            },
        };

        (self.identifier, patch)
    }
}

pub(crate) fn rejection_response(rejection: &JsonRejection) -> Response {
    debug!("Rejected payload: {}", rejection.body_text());

    MessageResponse::reply(StatusCode::BAD_REQUEST, rejection.body_text())
}

pub(crate) fn error_response(err: &RegistryError) -> Response {
    if err.is_client_error() {
        debug!("Invalid request: {err}");

        return MessageResponse::reply(StatusCode::BAD_REQUEST, err.to_string());
    }

    if matches!(err, RegistryError::DuplicateIdentifier) {
        debug!("Concurrent registration: {err}");

        return MessageResponse::reply(StatusCode::CONFLICT, err.to_string());
    }

    error!("Request failed: {err}");

    MessageResponse::reply(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}
