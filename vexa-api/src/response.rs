/// Success envelope shared by every handler
///
/// | operation | status | body |
/// |-----------|--------|------|
/// | read | 200 | `{ "data": T }` |
/// | create | 201 | `{ "data": T, "message": "..." }` |
/// | update | 200 | `{ "data": T, "message": "..." }` |
/// | delete | 200 | `{ "message": "..." }` |
///
/// Failures go through [`ApiError`](crate::error::ApiError) instead.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    #[serde(skip)]
    status: StatusCode,

    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,

    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            data: Some(data),
            message: None,
        }
    }

    pub fn created(data: T, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CREATED,
            data: Some(data),
            message: Some(message.into()),
        }
    }

    pub fn updated(data: T, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            data: Some(data),
            message: Some(message.into()),
        }
    }
}

impl Envelope<()> {
    /// Message-only body, used for deletions
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            data: None,
            message: Some(message.into()),
        }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    async fn body_of<T: Serialize>(envelope: Envelope<T>) -> (StatusCode, Value) {
        let response = envelope.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_read_envelope() {
        let (status, body) = body_of(Envelope::ok(vec![1, 2])).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "data": [1, 2] }));
    }

    #[tokio::test]
    async fn test_created_envelope() {
        let (status, body) = body_of(Envelope::created(json!({"id": 1}), "Project created")).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body, json!({ "data": {"id": 1}, "message": "Project created" }));
    }

    #[tokio::test]
    async fn test_delete_envelope_has_no_data() {
        let (status, body) = body_of(Envelope::message("Task deleted")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "message": "Task deleted" }));
    }

    #[tokio::test]
    async fn test_empty_list_is_still_data() {
        let (_, body) = body_of(Envelope::ok(Vec::<i32>::new())).await;
        assert_eq!(body, json!({ "data": [] }));
    }
}
