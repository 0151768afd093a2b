use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::db::error::DatabaseError;
use crate::geo::error::OverrideError;

/// Operator-facing errors. Bodies are plain text with the status name on the
/// first line.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Bad Request\n{0}")]
    BadRequest(String),
    #[error("Not Found")]
    NotFound,
    #[error("Not Acceptable\n{0}")]
    NotAcceptable(String),
    #[error("Internal Server Error\n{0}")]
    Internal(String),
}

impl From<OverrideError> for ServerError {
    fn from(value: OverrideError) -> Self {
        match value {
            OverrideError::Disabled => Self::NotAcceptable(value.to_string()),
            OverrideError::NotFound => Self::NotFound,
            OverrideError::MalformedAsn => Self::BadRequest(value.to_string()),
            OverrideError::Database(e) => Self::Internal(e.to_string()),
        }
    }
}

impl From<DatabaseError> for ServerError {
    fn from(value: DatabaseError) -> Self {
        Self::Internal(value.to_string())
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::NotAcceptable(_) => StatusCode::NOT_ACCEPTABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

#[derive(Debug, Error)]
pub enum StartError {
    #[error("failed to load TLS material: {0}")]
    Tls(#[from] super::tls::TlsError),
    #[error("failed to bind to tcp: {0}")]
    TcpBind(#[source] std::io::Error),
    #[error("failed to serve: {0}")]
    Serve(#[source] std::io::Error),
}
