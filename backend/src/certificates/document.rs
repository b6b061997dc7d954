//! The fixed document skeleton every certificate body is embedded into.

use crate::certificates::template::{self, Fields};
use std::fs;
use std::io;
use std::path::Path;

/// Built-in skeleton, in the markup understood by the PDF renderer.
pub const BUILTIN_DOCUMENT: &str = "\
# CERTIFICATE
## Certificate No: {{ certificate_number }}

This is to certify that

# {{ student_name }}

{{ certificate_body }}

Place: {{ place }}{{ single_place }}
Date: {{ issue_date }}{{ single_issue_date }}
";

/// Everything the document skeleton can refer to.
///
/// `place`/`issue_date` come from spreadsheet rows, `single_place`/
/// `single_issue_date` from manual requests; the other pair is left blank.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderContext {
    pub student_name: String,
    /// Already rendered body; inserted as plain text.
    pub certificate_body: String,
    pub certificate_number: String,
    pub place: String,
    pub issue_date: String,
    pub single_place: String,
    pub single_issue_date: String,
    /// `file://` URL of the asset base directory.
    pub base_url: String,
}

impl RenderContext {
    pub fn fields(&self) -> Fields<'static> {
        Fields::from([
            ("student_name", self.student_name.clone()),
            ("certificate_body", self.certificate_body.clone()),
            ("certificate_number", self.certificate_number.clone()),
            ("place", self.place.clone()),
            ("issue_date", self.issue_date.clone()),
            ("single_place", self.single_place.clone()),
            ("single_issue_date", self.single_issue_date.clone()),
            ("base_url", self.base_url.clone()),
        ])
    }
}

/// `file://` URL for a local directory.
pub fn base_url(base_dir: &Path) -> String {
    let path = base_dir.to_string_lossy().replace('\\', "/");
    if path.starts_with('/') {
        format!("file://{}", path)
    } else {
        format!("file:///{}", path)
    }
}

#[derive(Debug, Clone)]
pub struct DocumentTemplate {
    text: String,
}

impl Default for DocumentTemplate {
    fn default() -> Self {
        DocumentTemplate {
            text: BUILTIN_DOCUMENT.to_string(),
        }
    }
}

impl DocumentTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        DocumentTemplate { text: text.into() }
    }

    pub fn from_file(path: &Path) -> io::Result<Self> {
        Ok(DocumentTemplate::new(fs::read_to_string(path)?))
    }

    pub fn render(&self, context: &RenderContext) -> String {
        template::render(&self.text, &context.fields())
    }
}
