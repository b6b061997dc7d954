use super::run_blocking;
use crate::certificates::pipeline::IssuancePipeline;
use crate::error::Result;
use actix_web::{web, HttpResponse};

/// Handler for `GET /api/certificates`: the audit trail of issued certificates.
pub(crate) async fn process(pipeline: web::Data<IssuancePipeline>) -> Result<HttpResponse> {
    let pipeline = pipeline.into_inner();
    let records = run_blocking(move || pipeline.ledger().list()).await?;
    Ok(HttpResponse::Ok().json(records))
}
