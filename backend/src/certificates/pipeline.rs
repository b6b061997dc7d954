//! Certificate issuance: validation, numbering, rendering and recording.
//!
//! A request moves through `Validating → Numbering → Rendering → Persisting
//! → Done` (bulk requests repeat the middle stages once per row) and ends in
//! `Failed` on the first fault. Validation parses every input up front, so a
//! request rejected there leaves no trace. Later faults stop the request but
//! keep whatever earlier recipients already received.

use crate::certificates::dates;
use crate::certificates::document::{base_url, DocumentTemplate, RenderContext};
use crate::certificates::ledger::Ledger;
use crate::certificates::numbering::NumberingAuthority;
use crate::certificates::renderer::ArtifactRenderer;
use crate::certificates::template::{self, Fields};
use crate::error::{IssuanceError, Result};
use common::model::certificate::CertificateRecord;
use common::model::issuance::IssuanceStage;
use common::model::recipient::{RecipientRow, ISSUE_DATE, KNOWN_FIELDS, PLACE, STUDENT_NAME};
use common::requests::{IssueForm, SingleRequest};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Returned when the form carries neither a spreadsheet nor a student name.
pub const MISSING_INPUT: &str = "Error: Upload Excel OR enter Student Name.";
pub const MISSING_CONTENT: &str = "Error: Enter the certificate content template.";
pub const EMPTY_SPREADSHEET: &str = "Error: The uploaded spreadsheet has no recipient rows.";

/// Fields a manual request exposes to its body template besides the known
/// spreadsheet columns.
const SINGLE_FIELDS: [&str; 2] = ["single_place", "single_issue_date"];

/// Recipients from a spreadsheet sharing one body template.
#[derive(Debug, Clone)]
pub struct BulkRequest {
    pub rows: Vec<RecipientRow>,
    pub body_template: String,
}

#[derive(Debug, Clone)]
pub enum IssuanceRequest {
    Bulk(BulkRequest),
    Single(SingleRequest),
}

impl IssuanceRequest {
    /// Chooses the issuance mode for a submitted form.
    ///
    /// An uploaded spreadsheet always selects bulk mode; otherwise a student
    /// name and a body template select single mode.
    pub fn from_form(form: IssueForm) -> Result<IssuanceRequest> {
        if let Some(rows) = form.spreadsheet {
            let request = BulkRequest {
                rows,
                body_template: form.content,
            };
            validate_bulk(&request)?;
            return Ok(IssuanceRequest::Bulk(request));
        }

        let request = SingleRequest {
            student_name: form.student_name,
            content: form.content,
            single_date: form.single_date,
            single_place: form.single_place,
        };
        if request.student_name.trim().is_empty() {
            return Err(IssuanceError::Validation(MISSING_INPUT.to_string()));
        }
        validate_single(&request)?;
        Ok(IssuanceRequest::Single(request))
    }
}

fn validate_bulk(request: &BulkRequest) -> Result<()> {
    if request.rows.is_empty() {
        return Err(IssuanceError::Validation(EMPTY_SPREADSHEET.to_string()));
    }
    if request.body_template.trim().is_empty() {
        return Err(IssuanceError::Validation(MISSING_CONTENT.to_string()));
    }
    Ok(())
}

fn validate_single(request: &SingleRequest) -> Result<()> {
    if request.student_name.trim().is_empty() {
        return Err(IssuanceError::Validation(MISSING_INPUT.to_string()));
    }
    if request.content.trim().is_empty() {
        return Err(IssuanceError::Validation(MISSING_CONTENT.to_string()));
    }
    Ok(())
}

/// One recipient after validation: every value is final and every date
/// already formatted.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PreparedRecipient {
    student_name: String,
    body_fields: Fields<'static>,
    place: String,
    issue_date: String,
    single_place: String,
    single_issue_date: String,
}

impl PreparedRecipient {
    fn from_row(row: &RecipientRow, index: usize) -> Result<Self> {
        let field = format!("row {} {}", index + 1, ISSUE_DATE);
        let issue_date = dates::display(dates::parse_day_first(row.get(ISSUE_DATE), &field)?);

        let mut body_fields: Fields<'static> = row
            .known_fields()
            .map(|(name, value)| (name, value.to_string()))
            .collect();
        body_fields.insert(ISSUE_DATE, issue_date.clone());

        Ok(PreparedRecipient {
            student_name: row.student_name().to_string(),
            body_fields,
            place: row.get(PLACE).to_string(),
            issue_date,
            single_place: String::new(),
            single_issue_date: String::new(),
        })
    }

    fn from_single(request: &SingleRequest) -> Result<Self> {
        let single_issue_date = dates::display(dates::parse_iso(&request.single_date, "single_date")?);
        let single_place = request.single_place.trim().to_string();
        let student_name = request.student_name.trim().to_string();

        let body_fields = Fields::from([
            (STUDENT_NAME, student_name.clone()),
            (PLACE, single_place.clone()),
            (ISSUE_DATE, single_issue_date.clone()),
            ("single_place", single_place.clone()),
            ("single_issue_date", single_issue_date.clone()),
        ]);

        Ok(PreparedRecipient {
            student_name,
            body_fields,
            place: String::new(),
            issue_date: String::new(),
            single_place,
            single_issue_date,
        })
    }

    fn context(&self, certificate_number: &str, certificate_body: String, base_url: &str) -> RenderContext {
        RenderContext {
            student_name: self.student_name.clone(),
            certificate_body,
            certificate_number: certificate_number.to_string(),
            place: self.place.clone(),
            issue_date: self.issue_date.clone(),
            single_place: self.single_place.clone(),
            single_issue_date: self.single_issue_date.clone(),
            base_url: base_url.to_string(),
        }
    }
}

fn warn_unknown_fields(body_template: &str, extra: &[&str]) {
    for name in template::referenced_fields(body_template) {
        if !KNOWN_FIELDS.contains(&name.as_str()) && !extra.contains(&name.as_str()) {
            warn!("Body template refers to unknown field {:?}; it will render blank", name);
        }
    }
}

/// Issues certificates against one ledger.
///
/// Whole requests are serialized by an internal gate, so the certificates of
/// one batch receive consecutive numbers. The ledger additionally makes each
/// number reservation atomic across processes.
pub struct IssuancePipeline {
    ledger: Ledger,
    authority: NumberingAuthority,
    renderer: Arc<dyn ArtifactRenderer>,
    document: DocumentTemplate,
    base_dir: PathBuf,
    gate: Mutex<()>,
}

impl IssuancePipeline {
    pub fn new(
        ledger: Ledger,
        renderer: Arc<dyn ArtifactRenderer>,
        document: DocumentTemplate,
        base_dir: impl Into<PathBuf>,
    ) -> Self {
        IssuancePipeline {
            ledger,
            authority: NumberingAuthority::default(),
            renderer,
            document,
            base_dir: base_dir.into(),
            gate: Mutex::new(()),
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Runs either mode. The records come back in issuance order; callers
    /// that deliver a single artifact take the first one.
    pub fn issue(&self, request: &IssuanceRequest) -> Result<Vec<CertificateRecord>> {
        match request {
            IssuanceRequest::Bulk(bulk) => self.run_batch(bulk),
            IssuanceRequest::Single(single) => self.run_single(single).map(|record| vec![record]),
        }
    }

    /// Issues one certificate per row, in row order.
    ///
    /// Returns every produced record. All `issue_date` cells are parsed
    /// before the first number is reserved, so a malformed date rejects the
    /// whole batch without side effects. A fault further on stops the batch;
    /// rows issued before it stay issued.
    pub fn run_batch(&self, request: &BulkRequest) -> Result<Vec<CertificateRecord>> {
        let prepared = self.validate(|| {
            validate_bulk(request)?;
            warn_unknown_fields(&request.body_template, &[]);
            request
                .rows
                .iter()
                .enumerate()
                .map(|(index, row)| PreparedRecipient::from_row(row, index))
                .collect::<Result<Vec<_>>>()
        })?;

        let _serial = self.gate.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let total = prepared.len();
        let mut records = Vec::with_capacity(total);
        for (index, recipient) in prepared.iter().enumerate() {
            let record = self.issue_one(recipient, &request.body_template, index + 1 < total)?;
            records.push(record);
        }
        info!(
            "Issued {} certificates from spreadsheet ({} .. {})",
            records.len(),
            records.first().map(|r| r.certificate_number.as_str()).unwrap_or(""),
            records.last().map(|r| r.certificate_number.as_str()).unwrap_or("")
        );
        Ok(records)
    }

    /// Issues a single manually entered certificate.
    pub fn run_single(&self, request: &SingleRequest) -> Result<CertificateRecord> {
        let prepared = self.validate(|| {
            validate_single(request)?;
            warn_unknown_fields(&request.content, &SINGLE_FIELDS);
            PreparedRecipient::from_single(request)
        })?;

        let _serial = self.gate.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.issue_one(&prepared, &request.content, false)
    }

    fn validate<T>(&self, check: impl FnOnce() -> Result<T>) -> Result<T> {
        debug!("Stage {:?}", IssuanceStage::Validating);
        check().map_err(|e| {
            warn!("Issuance request rejected: {}", e);
            e
        })
    }

    /// Number, render and record one recipient.
    fn issue_one(
        &self,
        recipient: &PreparedRecipient,
        body_template: &str,
        more_after: bool,
    ) -> Result<CertificateRecord> {
        let mut stage = IssuanceStage::Validating.next(true);
        debug!("Stage {:?} for {:?}", stage, recipient.student_name);

        let result = self
            .ledger
            .reserve_and_append(&self.authority, &recipient.student_name, |number| {
                stage = stage.next(true);
                debug!("Stage {:?} for {}", stage, number);

                let body = template::render(body_template, &recipient.body_fields);
                let context =
                    recipient.context(number.as_str(), body, &base_url(&self.base_dir));
                let markup = self.document.render(&context);
                let path = self
                    .renderer
                    .render_to_file(&markup, &self.base_dir, number.as_str())?;

                stage = stage.next(true);
                debug!("Stage {:?} for {}", stage, number);
                Ok(path.to_string_lossy().into_owned())
            });

        match result {
            Ok(record) => {
                debug!("Stage {:?} after {}", stage.next(more_after), record.certificate_number);
                info!(
                    "Issued {} to {:?} at {}",
                    record.certificate_number, record.recipient_name, record.artifact_location
                );
                Ok(record)
            }
            Err(e) => {
                warn!(
                    "Issuance for {:?} stopped in {:?} (reached {:?}), request is {:?}: {}",
                    recipient.student_name,
                    e.stage(),
                    stage,
                    IssuanceStage::Failed,
                    e
                );
                Err(e)
            }
        }
    }
}
