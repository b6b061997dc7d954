//! Certificate numbering: `ACDT-C-25-001`, `ACDT-C-25-002`, ...
//!
//! The next number is always derived from the most recently inserted ledger
//! row, so the ledger stays the single source of truth. The ledger calls into
//! this module from inside the same transaction that inserts the new row.

use common::model::certificate::CertificateRecord;
use std::fmt;

/// Fixed prefix of every certificate number.
pub const PREFIX: &str = "ACDT-C";
/// Fixed scheme tag (issuance batch/year grouping).
pub const SCHEME_TAG: &str = "25";
/// Minimum width of the zero-padded sequence.
const MIN_DIGITS: usize = 3;

/// A rendered certificate number together with its sequence value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateNumber {
    sequence: u64,
    text: String,
}

impl CertificateNumber {
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for CertificateNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Mints numbers of the form `PREFIX-TAG-NNN`.
#[derive(Debug, Clone)]
pub struct NumberingAuthority {
    prefix: String,
    scheme_tag: String,
}

impl Default for NumberingAuthority {
    fn default() -> Self {
        NumberingAuthority::new(PREFIX, SCHEME_TAG)
    }
}

impl NumberingAuthority {
    pub fn new(prefix: impl Into<String>, scheme_tag: impl Into<String>) -> Self {
        NumberingAuthority {
            prefix: prefix.into(),
            scheme_tag: scheme_tag.into(),
        }
    }

    /// Number following the most recently appended ledger row.
    ///
    /// An empty ledger yields the seed number (`...-001`). A stored number
    /// without trailing digits counts as 0, which also yields `...-001`.
    pub fn next_number(&self, latest: Option<&CertificateRecord>) -> CertificateNumber {
        let previous = latest
            .and_then(|record| trailing_sequence(&record.certificate_number))
            .unwrap_or(0);
        self.format(previous.saturating_add(1))
    }

    /// Renders `sequence` with this authority's prefix and scheme tag.
    pub fn format(&self, sequence: u64) -> CertificateNumber {
        CertificateNumber {
            sequence,
            text: format!(
                "{}-{}-{:0width$}",
                self.prefix,
                self.scheme_tag,
                sequence,
                width = MIN_DIGITS
            ),
        }
    }
}

/// Value of the trailing run of ASCII digits, if any.
///
/// Runs too long for a `u64` are treated like a missing run.
pub fn trailing_sequence(number: &str) -> Option<u64> {
    let digits_start = number
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)?;
    number[digits_start..].parse().ok()
}
