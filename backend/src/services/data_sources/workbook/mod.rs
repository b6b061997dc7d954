//! Spreadsheet uploads as Excel or OpenDocument workbooks.
//!
//! Only the first sheet is read. Its first row holds the column titles and
//! each further non-blank row is one recipient.

mod decode;

pub use decode::{decode_recipients, is_workbook};

#[cfg(test)]
pub(crate) use decode::testing;
