use crate::model::recipient::RecipientRow;

/// Manual issuance of a single certificate.
#[derive(Debug, Clone, Default)]
pub struct SingleRequest {
    pub student_name: String,
    /// Body template.
    pub content: String,
    /// ISO `YYYY-MM-DD`; empty when not given.
    pub single_date: String,
    pub single_place: String,
}

/// Everything the upload form submitted, before validation decides between
/// bulk and single issuance.
///
/// `spreadsheet` is `None` when no file was uploaded; text fields arrive
/// already trimmed.
#[derive(Debug, Clone, Default)]
pub struct IssueForm {
    pub spreadsheet: Option<Vec<RecipientRow>>,
    pub content: String,
    pub student_name: String,
    pub single_date: String,
    pub single_place: String,
}
