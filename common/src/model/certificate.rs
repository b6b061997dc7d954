use serde::{Deserialize, Serialize};

/// One row of the issuance ledger.
///
/// Records are created exactly once, right after the certificate's artifact
/// has been rendered, and are never updated or deleted afterwards. Ordered by
/// `id`, the numeric suffixes of `certificate_number` form a gap-free sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateRecord {
    /// Row id assigned by the ledger on insert.
    pub id: i64,
    /// Certificate number in the `ACDT-C-25-NNN` format.
    pub certificate_number: String,
    /// Recipient name as it appeared on the certificate. May be empty.
    pub recipient_name: String,
    /// Where the rendered artifact was stored.
    pub artifact_location: String,
}

/// A ledger row that has not been assigned an `id` yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCertificate {
    pub certificate_number: String,
    pub recipient_name: String,
    pub artifact_location: String,
}

impl CertificateRecord {
    /// File name offered to the client when downloading the artifact.
    pub fn download_name(&self) -> String {
        match self.artifact_location.rsplit_once('.') {
            Some((_, ext)) if !ext.contains(['/', '\\']) => {
                format!("{}.{}", self.certificate_number, ext)
            }
            _ => self.certificate_number.clone(),
        }
    }
}
