//! Spreadsheet uploads in CSV form.
//!
//! The first line holds the column titles; each further non-blank line is
//! one recipient.

mod decode;

pub use decode::decode_recipients;
