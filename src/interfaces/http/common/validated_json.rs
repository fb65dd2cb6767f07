//! JSON extractor that also runs `validator` rules
//!
//! Malformed bodies are rejected with 400, bodies that parse but break a
//! field rule with 422 and one `field: message` entry per violation.

use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use validator::Validate;

use super::ApiResponse;

/// `axum::Json<T>` plus `Validate::validate()`.
///
/// ```ignore
/// async fn add_funds(ValidatedJson(body): ValidatedJson<AddFundsRequest>) { .. }
/// ```
pub struct ValidatedJson<T>(pub T);

pub enum ValidatedJsonRejection {
    Malformed(JsonRejection),
    Invalid(validator::ValidationErrors),
}

fn describe(errors: &validator::ValidationErrors) -> String {
    let mut fields: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match e.message {
                Some(ref m) => format!("{}: {}", field, m),
                None => format!("{}: {}", field, e.code),
            })
        })
        .collect();
    fields.sort();
    if fields.is_empty() {
        "Validation failed".to_string()
    } else {
        fields.join("; ")
    }
}

impl IntoResponse for ValidatedJsonRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Malformed(rejection) => {
                let body = ApiResponse::<()>::error_with_code(
                    format!("Invalid JSON: {}", rejection.body_text()),
                    "invalid_input",
                );
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            Self::Invalid(errors) => {
                let body = ApiResponse::<()>::error_with_code(describe(&errors), "validation_failed");
                (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
            }
        }
    }
}

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ValidatedJsonRejection;

    async fn from_request(req: axum::extract::Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(ValidatedJsonRejection::Malformed)?;
        value.validate().map_err(ValidatedJsonRejection::Invalid)?;
        Ok(ValidatedJson(value))
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::post;
    use axum::Router;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct Deposit {
        #[validate(length(min = 1, max = 10))]
        note: String,
        #[validate(range(min = 1, max = 10000))]
        cents: i64,
    }

    async fn handler(ValidatedJson(body): ValidatedJson<Deposit>) -> String {
        body.cents.to_string()
    }

    async fn send(body: &'static str) -> StatusCode {
        use tower::Service;
        let mut svc = Router::new().route("/funds", post(handler)).into_service();
        let req = Request::builder()
            .method("POST")
            .uri("/funds")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        svc.call(req).await.unwrap().status()
    }

    #[tokio::test]
    async fn accepts_valid_body() {
        assert_eq!(send(r#"{"note":"top-up","cents":500}"#).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn malformed_json_is_400() {
        assert_eq!(send("{not json").await, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn rule_violation_is_422() {
        assert_eq!(
            send(r#"{"note":"","cents":0}"#).await,
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
