use super::run_blocking;
use crate::certificates::pipeline::IssuancePipeline;
use crate::error::Result;
use actix_files::NamedFile;
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpRequest, HttpResponse};
use log::warn;

/// Handler for `GET /api/certificates/{certificate_number}/artifact`.
///
/// - `200 OK` with the PDF as an attachment named after the certificate.
/// - `404 Not Found` when the number was never issued or its file is gone.
pub(crate) async fn process(
    req: HttpRequest,
    certificate_number: web::Path<String>,
    pipeline: web::Data<IssuancePipeline>,
) -> Result<HttpResponse> {
    let number = certificate_number.into_inner();
    let pipeline = pipeline.into_inner();
    let lookup = number.clone();
    let record = run_blocking(move || pipeline.ledger().find_by_number(&lookup)).await?;

    let Some(record) = record else {
        return Ok(HttpResponse::NotFound().body(format!("Certificate {} not found", number)));
    };

    match NamedFile::open(&record.artifact_location) {
        Ok(file) => Ok(file
            .set_content_disposition(ContentDisposition {
                disposition: DispositionType::Attachment,
                parameters: vec![DispositionParam::Filename(record.download_name())],
            })
            .into_response(&req)),
        Err(e) => {
            warn!(
                "Artifact of {} missing at {}: {}",
                record.certificate_number, record.artifact_location, e
            );
            Ok(HttpResponse::NotFound().body(format!("Artifact of {} is no longer available", number)))
        }
    }
}
