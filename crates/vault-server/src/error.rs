use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use vault_ledger::LedgerError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ServerError::PayloadTooLarge(rejection.body_text())
        } else {
            ServerError::BadRequest(rejection.body_text())
        }
    }
}

impl From<PathRejection> for ServerError {
    fn from(rejection: PathRejection) -> Self {
        ServerError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ServerError {
    fn from(rejection: QueryRejection) -> Self {
        ServerError::BadRequest(rejection.body_text())
    }
}

impl ServerError {
    fn status(&self) -> StatusCode {
        match self {
            ServerError::Ledger(e) => match e {
                LedgerError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                LedgerError::NotFound { .. } => StatusCode::NOT_FOUND,
                LedgerError::Forbidden(_) => StatusCode::FORBIDDEN,
                LedgerError::ChainMismatch { .. } => StatusCode::CONFLICT,
                LedgerError::SignatureInvalid => StatusCode::UNPROCESSABLE_ENTITY,
                LedgerError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServerError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ServerError::Ledger(e) => e.kind(),
            ServerError::BadRequest(_) => "invalid_input",
            ServerError::Forbidden(_) => "forbidden",
            ServerError::PayloadTooLarge(_) => "payload_too_large",
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = match &self {
            ServerError::Ledger(LedgerError::Storage(e)) => {
                tracing::error!(error = %e, "Storage failure");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let mut body = serde_json::json!({
            "error": message,
            "kind": self.kind(),
        });
        if let ServerError::Ledger(LedgerError::ChainMismatch { tail }) = &self {
            body["tail"] = serde_json::to_value(tail).unwrap_or_default();
        }

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vault_shared::protocol::ChainTail;
    use vault_store::StoreError;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (LedgerError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (LedgerError::not_found("user", "u"), StatusCode::NOT_FOUND),
            (LedgerError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (
                LedgerError::ChainMismatch {
                    tail: ChainTail::default(),
                },
                StatusCode::CONFLICT,
            ),
            (LedgerError::SignatureInvalid, StatusCode::UNPROCESSABLE_ENTITY),
            (
                LedgerError::Storage(StoreError::NotFound),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ServerError::from(err).into_response().status(), expected);
        }
    }
}
