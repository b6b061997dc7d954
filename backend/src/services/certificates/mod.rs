//! # Certificate Service Module
//!
//! HTTP surface of the issuance pipeline, under `/api/certificates`.
//!
//! ## Sub-modules:
//! - `issue`: accepts the upload form (spreadsheet or manual entry) and
//!   answers with the first issued certificate as a PDF attachment.
//! - `list`: the issuance ledger as JSON.
//! - `artifact`: re-downloads the PDF of an issued certificate.

mod artifact;
pub mod issue;
mod list;

use crate::error::{IssuanceError, Result};
use actix_web::web::{get, post, scope};
use actix_web::Scope;

/// The base path for all certificate-related API endpoints.
const API_PATH: &str = "/api/certificates";

/// Configures and returns the Actix `Scope` for the certificate routes.
///
/// # Registered Routes:
///
/// *   **`GET /`** (`list::process`): every ledger row in issuance order.
/// *   **`POST /issue`** (`issue::process`): multipart form with the `excel`
///     file field and the `content`, `student_name`, `single_date` and
///     `single_place` text fields.
/// *   **`GET /{certificate_number}/artifact`** (`artifact::process`): the
///     stored PDF of one certificate.
pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("", get().to(list::process))
        .route("/issue", post().to(issue::process))
        .route("/{certificate_number}/artifact", get().to(artifact::process))
}

/// Runs blocking ledger/renderer work off the async workers.
async fn run_blocking<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| IssuanceError::Render(format!("Issuance task join error: {}", e)))?
}
