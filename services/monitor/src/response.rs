//! JSON error helpers over `ed_protocol::HttpErrorEnvelope`, the non-upload
//! HTTP error contract (this service has no upload endpoint of its own).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ed_protocol::HttpErrorEnvelope;

fn json_error(status: StatusCode, code: &str, message: impl Into<String>) -> Response {
    (
        status,
        Json(HttpErrorEnvelope {
            code: code.to_owned(),
            message: message.into(),
            details: None,
        }),
    )
        .into_response()
}

pub fn bad_request(message: impl Into<String>) -> Response {
    json_error(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
}

pub fn internal_error(message: impl Into<String>) -> Response {
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn parse(response: Response) -> (StatusCode, HttpErrorEnvelope) {
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn bad_request_sets_bad_request_contract() {
        let (status, envelope) = parse(bad_request("invalid maxDays")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(envelope.code, "BAD_REQUEST");
        assert_eq!(envelope.message, "invalid maxDays");
    }

    #[tokio::test]
    async fn internal_error_sets_internal_contract() {
        let (status, envelope) = parse(internal_error("database unavailable")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(envelope.code, "INTERNAL_ERROR");
        assert_eq!(envelope.message, "database unavailable");
    }
}
