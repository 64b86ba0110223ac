use super::{error_response, rejection_response, MessageResponse, StudentPayload, StudentView};
use crate::identity::Registrar;
use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::{debug, instrument};

#[utoipa::path(
    post,
    path = "/api/submit",
    request_body = StudentPayload,
    responses (
        (status = 200, description = "Student created or updated", body = StudentView, content_type = "application/json"),
        (status = 400, description = "Missing identifier or unknown field", body = MessageResponse),
        (status = 500, description = "Store or hasher failure", body = MessageResponse),
    ),
    tag = "students"
)]
// axum handler for the registration form
#[instrument(skip(registrar, payload))]
pub async fn submit(
    registrar: Extension<Arc<Registrar>>,
    payload: Result<Json<StudentPayload>, JsonRejection>,
) -> Response {
    let payload = match payload {
        Ok(Json(payload)) => payload,
        Err(rejection) => return rejection_response(&rejection),
    };

    let (identifier, patch) = payload.into_parts();

    match registrar
        .upsert(identifier.as_deref().unwrap_or_default(), patch)
        .await
    {
        Ok(record) => {
            debug!("Student {} saved", record.identifier);

            (StatusCode::OK, Json(StudentView::from(record))).into_response()
        }
        Err(err) => error_response(&err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::test_support::{app, post_json, send};
    use crate::identity::CredentialStore;
    use anyhow::Result;
    use serde_json::json;

    const STUDENT: &str = "ada@students.example.edu";

    #[tokio::test]
    async fn submit_creates_and_merges() -> Result<()> {
        let (app, _store) = app();

        let (status, first) = send(
            &app,
            post_json(
                "/api/submit",
                &json!({ "identifier": STUDENT, "firstName": "Ada", "major": "CS" }),
            )?,
        )
        .await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["revision"], 1);

        let (status, second) = send(
            &app,
            post_json(
                "/api/submit",
                &json!({ "identifier": STUDENT, "gender": "female" }),
            )?,
        )
        .await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(second["id"], first["id"]);
        assert_eq!(second["firstName"], "Ada");
        assert_eq!(second["major"], "CS");
        assert_eq!(second["gender"], "female");
        Ok(())
    }

    #[tokio::test]
    async fn submit_discards_storage_metadata() -> Result<()> {
        let (app, _store) = app();
        let (_, created) = send(
            &app,
            post_json("/api/submit", &json!({ "identifier": STUDENT, "major": "CS" }))?,
        )
        .await?;

        let (status, updated) = send(
            &app,
            post_json(
                "/api/submit",
                &json!({
                    "identifier": STUDENT,
                    "major": "Math",
                    "_id": "forged",
                    "__v": 42,
                    "id": "00000000-0000-0000-0000-000000000000",
                    "revision": 100
                }),
            )?,
        )
        .await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["id"], created["id"]);
        assert_eq!(updated["revision"], 2);
        assert_eq!(updated["major"], "Math");
        Ok(())
    }

    #[tokio::test]
    async fn submit_hashes_password() -> Result<()> {
        let (app, store) = app();
        let (status, _) = send(
            &app,
            post_json(
                "/api/submit",
                &json!({ "identifier": STUDENT, "password": "hunter2" }),
            )?,
        )
        .await?;
        assert_eq!(status, StatusCode::OK);

        let stored = store
            .find_by_identifier(STUDENT)
            .await?
            .and_then(|record| record.credential);
        assert!(stored.is_some_and(|credential| credential.starts_with("$2")));
        Ok(())
    }

    #[tokio::test]
    async fn submit_rejects_missing_identifier_and_unknown_keys() -> Result<()> {
        let (app, store) = app();

        let (status, response) =
            send(&app, post_json("/api/submit", &json!({ "major": "CS" }))?).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["message"], "identifier is required");

        let (status, _) = send(
            &app,
            post_json(
                "/api/submit",
                &json!({ "identifier": STUDENT, "favouriteColour": "blue" }),
            )?,
        )
        .await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(store.list().await?.is_empty());
        Ok(())
    }
}
