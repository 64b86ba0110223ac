use super::{error_response, rejection_response, MessageResponse, StudentView};
use crate::identity::Registrar;
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

#[derive(ToSchema, Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct CheckRequest {
    identifier: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct CheckResponse {
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student: Option<StudentView>,
}

#[utoipa::path(
    post,
    path = "/api/check-student",
    request_body = CheckRequest,
    responses (
        (status = 200, description = "Whether a student with this identifier exists", body = CheckResponse, content_type = "application/json"),
        (status = 400, description = "Missing identifier", body = MessageResponse),
        (status = 500, description = "Store failure", body = MessageResponse),
    ),
    tag = "students"
)]
// axum handler for the existence check done before showing the login form
#[instrument(skip(registrar, payload))]
pub async fn check_student(
    registrar: Extension<Arc<Registrar>>,
    payload: Result<Json<CheckRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return rejection_response(&rejection),
    };

    match registrar
        .lookup(request.identifier.as_deref().unwrap_or_default())
        .await
    {
        Ok(student) => {
            debug!("Student exists: {}", student.is_some());

            (
                StatusCode::OK,
                Json(CheckResponse {
                    exists: student.is_some(),
                    student: student.map(StudentView::from),
                }),
            )
                .into_response()
        }
        Err(err) => error_response(&err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::test_support::{app, post_json, send};
    use anyhow::Result;
    use serde_json::json;

    #[tokio::test]
    async fn check_reports_existence() -> Result<()> {
        let (app, _store) = app();
        let identifier = "ada@students.example.edu";

        let (status, response) = send(
            &app,
            post_json("/api/check-student", &json!({ "identifier": identifier }))?,
        )
        .await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(response, json!({ "exists": false }));

        send(
            &app,
            post_json("/api/submit", &json!({ "identifier": identifier, "major": "CS" }))?,
        )
        .await?;

        let (status, response) = send(
            &app,
            post_json("/api/check-student", &json!({ "identifier": identifier }))?,
        )
        .await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(response["exists"], true);
        assert_eq!(response["student"]["major"], "CS");
        Ok(())
    }

    #[tokio::test]
    async fn check_requires_identifier() -> Result<()> {
        let (app, _store) = app();
        let (status, _) = send(&app, post_json("/api/check-student", &json!({}))?).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        Ok(())
    }
}
