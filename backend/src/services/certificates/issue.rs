//! # Certificate Issuance Service
//!
//! Handles the upload form, for both `POST /` and
//! `POST /api/certificates/issue`.
//!
//! ## Workflow
//!
//! 1.  **Form reading**: the multipart payload is drained field by field. The
//!     `excel` field carries the spreadsheet, either a workbook or a CSV
//!     export, told apart by its file name; `content`,
//!     `student_name`, `single_date` and `single_place` are text fields. A file
//!     field without a file name counts as "no spreadsheet".
//! 2.  **Validation**: the form is turned into an `IssuanceRequest` (bulk when a
//!     spreadsheet was sent, single otherwise). Invalid forms are answered
//!     with `400 Bad Request` and a plain-text message.
//! 3.  **Issuance**: the pipeline runs on the blocking thread pool.
//! 4.  **Response**: the first issued certificate's PDF, as an attachment named
//!     `<certificate_number>.pdf`. The remaining certificates of a batch are
//!     stored and listed by `GET /api/certificates`.

use super::run_blocking;
use crate::certificates::pipeline::{IssuancePipeline, IssuanceRequest};
use crate::config::Config;
use crate::error::{IssuanceError, Result};
use crate::services::data_sources;
use actix_files::NamedFile;
use actix_multipart::{Field, Multipart};
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpRequest, HttpResponse};
use common::requests::IssueForm;
use futures_util::StreamExt;
use log::info;

/// Name of the file field holding the spreadsheet.
const SPREADSHEET_FIELD: &str = "excel";

pub(crate) async fn process(
    req: HttpRequest,
    payload: Multipart,
    pipeline: web::Data<IssuancePipeline>,
    config: web::Data<Config>,
) -> Result<HttpResponse> {
    let form = read_form(payload, config.max_upload_bytes).await?;
    let request = IssuanceRequest::from_form(form)?;

    let pipeline = pipeline.into_inner();
    let records = run_blocking(move || pipeline.issue(&request)).await?;

    let first = records
        .into_iter()
        .next()
        .ok_or_else(|| IssuanceError::Render("No certificate was produced".to_string()))?;
    info!(
        "Delivering {} ({})",
        first.certificate_number, first.artifact_location
    );

    let file = NamedFile::open(&first.artifact_location).map_err(|e| {
        IssuanceError::Render(format!(
            "Artifact {} not readable: {}",
            first.artifact_location, e
        ))
    })?;
    Ok(file
        .set_content_disposition(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(first.download_name())],
        })
        .into_response(&req))
}

/// Reads the upload form. Text fields are trimmed; unknown fields are drained
/// and ignored.
async fn read_form(mut payload: Multipart, limit: usize) -> Result<IssueForm> {
    let mut form = IssueForm::default();

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(malformed)?;
        let name = field
            .content_disposition()
            .and_then(|cd| cd.get_name().map(|n| n.to_string()))
            .unwrap_or_default();

        match name.as_str() {
            SPREADSHEET_FIELD => {
                let filename = field
                    .content_disposition()
                    .and_then(|cd| cd.get_filename().map(|f| f.to_string()))
                    .unwrap_or_default();
                let bytes = read_field(&mut field, limit).await?;
                if filename.is_empty() {
                    continue;
                }
                form.spreadsheet = Some(data_sources::decode_upload(&filename, &bytes)?);
            }
            "content" => form.content = read_text(&mut field, limit).await?,
            "student_name" => form.student_name = read_text(&mut field, limit).await?,
            "single_date" => form.single_date = read_text(&mut field, limit).await?,
            "single_place" => form.single_place = read_text(&mut field, limit).await?,
            _ => {
                read_field(&mut field, limit).await?;
            }
        }
    }

    Ok(form)
}

async fn read_field(field: &mut Field, limit: usize) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        bytes.extend_from_slice(&chunk.map_err(malformed)?);
        if bytes.len() > limit {
            return Err(IssuanceError::Validation(format!(
                "Error: Upload exceeds the limit of {} bytes.",
                limit
            )));
        }
    }
    Ok(bytes)
}

async fn read_text(field: &mut Field, limit: usize) -> Result<String> {
    let bytes = read_field(field, limit).await?;
    Ok(String::from_utf8_lossy(&bytes).trim().to_string())
}

fn malformed(e: actix_multipart::MultipartError) -> IssuanceError {
    IssuanceError::Validation(format!("Error: Malformed upload: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificates::document::DocumentTemplate;
    use crate::certificates::ledger::Ledger;
    use crate::certificates::renderer::testing::RecordingRenderer;
    use actix_web::http::{header, StatusCode};
    use actix_web::{test, App};
    use std::path::Path;
    use std::sync::Arc;

    const BOUNDARY: &str = "----certificate-test-boundary";

    enum Part<'a> {
        Text(&'a str, &'a str),
        File(&'a str, &'a str, &'a [u8]),
    }

    fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            match part {
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                            name, value
                        )
                        .as_bytes(),
                    );
                }
                Part::File(name, filename, content) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                            name, filename
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(content);
                    body.extend_from_slice(b"\r\n");
                }
            }
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn test_config(dir: &Path) -> Config {
        Config {
            host: "127.0.0.1".to_string(),
            port: 0,
            db_path: dir.join("certificates.db"),
            output_dir: dir.join("pdfs"),
            base_dir: dir.to_path_buf(),
            document_template: None,
            open_browser: false,
            max_upload_bytes: 1024 * 1024,
        }
    }

    fn pipeline(dir: &Path) -> IssuancePipeline {
        IssuancePipeline::new(
            Ledger::open(&dir.join("certificates.db")).unwrap(),
            Arc::new(RecordingRenderer::new(&dir.join("pdfs"))),
            DocumentTemplate::default(),
            dir,
        )
    }

    fn post(parts: &[Part<'_>]) -> test::TestRequest {
        test::TestRequest::post()
            .uri("/api/certificates/issue")
            .insert_header((
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            ))
            .set_payload(multipart_body(parts))
    }

    #[actix_web::test]
    async fn empty_form_is_rejected_without_issuing() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = web::Data::new(pipeline(dir.path()));
        let app = test::init_service(
            App::new()
                .app_data(pipeline.clone())
                .app_data(web::Data::new(test_config(dir.path())))
                .service(crate::services::certificates::configure_routes()),
        )
        .await;

        let resp = test::call_service(&app, post(&[Part::Text("content", "body")]).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = test::read_body(resp).await;
        assert_eq!(body, "Error: Upload Excel OR enter Student Name.");
        assert!(pipeline.ledger().list().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn bulk_upload_returns_first_certificate() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = web::Data::new(pipeline(dir.path()));
        let app = test::init_service(
            App::new()
                .app_data(pipeline.clone())
                .app_data(web::Data::new(test_config(dir.path())))
                .service(crate::services::certificates::configure_routes()),
        )
        .await;

        let csv = "Student Name,Course Name\nAsha,B.Sc\nRavi,B.Com\nMeera,BA";
        let req = post(&[
            Part::Text("content", "completed {{course_name}}"),
            Part::File("excel", "students.csv", csv.as_bytes()),
        ])
        .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let disposition = resp
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.starts_with("attachment"));
        assert!(disposition.contains("ACDT-C-25-001.pdf"));
        let body = test::read_body(resp).await;
        assert!(String::from_utf8_lossy(&body).contains("completed B.Sc"));

        let issued = pipeline.ledger().list().unwrap();
        assert_eq!(issued.len(), 3);
        assert_eq!(issued[2].certificate_number, "ACDT-C-25-003");
        assert_eq!(issued[2].recipient_name, "Meera");
    }

    #[actix_web::test]
    async fn single_entry_is_issued() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = web::Data::new(pipeline(dir.path()));
        let app = test::init_service(
            App::new()
                .app_data(pipeline.clone())
                .app_data(web::Data::new(test_config(dir.path())))
                .service(crate::services::certificates::configure_routes()),
        )
        .await;

        let req = post(&[
            Part::File("excel", "", b""),
            Part::Text("student_name", " Asha "),
            Part::Text("content", "for the workshop"),
            Part::Text("single_date", "2025-03-01"),
            Part::Text("single_place", "Mumbai"),
        ])
        .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = String::from_utf8_lossy(&test::read_body(resp).await).to_string();
        assert!(body.contains("# Asha"));
        assert!(body.contains("Date: 01-03-2025"));

        let req = test::TestRequest::get().uri("/api/certificates").to_request();
        let listed: Vec<common::model::certificate::CertificateRecord> =
            test::call_and_read_body_json(&app, req).await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].recipient_name, "Asha");

        let req = test::TestRequest::get()
            .uri("/api/certificates/ACDT-C-25-001/artifact")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
        let req = test::TestRequest::get()
            .uri("/api/certificates/ACDT-C-25-999/artifact")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn workbook_upload_is_issued() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = web::Data::new(pipeline(dir.path()));
        let app = test::init_service(
            App::new()
                .app_data(pipeline.clone())
                .app_data(web::Data::new(test_config(dir.path())))
                .service(crate::services::certificates::configure_routes()),
        )
        .await;

        let workbook = data_sources::workbook::testing::roster(&["Asha", "Ravi"]);
        let req = post(&[
            Part::Text("content", "body"),
            Part::File("excel", "students.xlsx", &workbook),
        ])
        .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let issued = pipeline.ledger().list().unwrap();
        assert_eq!(issued.len(), 2);
        assert_eq!(issued[1].recipient_name, "Ravi");
    }

    #[actix_web::test]
    async fn unreadable_workbook_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = web::Data::new(pipeline(dir.path()));
        let app = test::init_service(
            App::new()
                .app_data(pipeline.clone())
                .app_data(web::Data::new(test_config(dir.path())))
                .service(crate::services::certificates::configure_routes()),
        )
        .await;

        let req = post(&[
            Part::Text("content", "body"),
            Part::File("excel", "students.xlsx", b"PK"),
        ])
        .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(pipeline.ledger().list().unwrap().is_empty());
    }
}
