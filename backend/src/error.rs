//! Fault taxonomy of the issuance pipeline.
//!
//! Every variant aborts the current request. Nothing already issued is rolled
//! back: artifacts and ledger rows from earlier recipients of the same batch
//! stay where they are.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use common::model::issuance::IssuanceStage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IssuanceError {
    /// Required input is missing or unusable. Raised before any side effect.
    #[error("{0}")]
    Validation(String),

    /// A date field could not be parsed.
    #[error("Invalid date {value:?} in {field}: expected {expected}")]
    Parse {
        field: String,
        value: String,
        expected: &'static str,
    },

    /// The document could not be turned into an artifact.
    #[error("Certificate rendering failed: {0}")]
    Render(String),

    /// The ledger could not record the certificate.
    #[error("Certificate ledger error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, IssuanceError>;

impl IssuanceError {
    /// The pipeline stage this fault aborts.
    pub fn stage(&self) -> IssuanceStage {
        match self {
            IssuanceError::Validation(_) | IssuanceError::Parse { .. } => IssuanceStage::Validating,
            IssuanceError::Render(_) => IssuanceStage::Rendering,
            IssuanceError::Storage(_) => IssuanceStage::Persisting,
        }
    }
}

impl From<rusqlite::Error> for IssuanceError {
    fn from(e: rusqlite::Error) -> Self {
        IssuanceError::Storage(e.to_string())
    }
}

impl From<genpdf::error::Error> for IssuanceError {
    fn from(e: genpdf::error::Error) -> Self {
        IssuanceError::Render(e.to_string())
    }
}

impl From<image::ImageError> for IssuanceError {
    fn from(e: image::ImageError) -> Self {
        IssuanceError::Render(e.to_string())
    }
}

impl From<png::EncodingError> for IssuanceError {
    fn from(e: png::EncodingError) -> Self {
        IssuanceError::Render(e.to_string())
    }
}

impl ResponseError for IssuanceError {
    fn status_code(&self) -> StatusCode {
        match self {
            IssuanceError::Validation(_) | IssuanceError::Parse { .. } => StatusCode::BAD_REQUEST,
            IssuanceError::Render(_) | IssuanceError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .content_type("text/plain; charset=utf-8")
            .body(self.to_string())
    }
}
