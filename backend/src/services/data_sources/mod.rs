//! Decoders for the uploaded recipient spreadsheet.

pub mod csv;
pub mod workbook;

use crate::error::{IssuanceError, Result};
use common::model::recipient::RecipientRow;

/// Decodes an upload, choosing the format by its file name. Anything that
/// is not a workbook is read as CSV.
pub fn decode_upload(filename: &str, bytes: &[u8]) -> Result<Vec<RecipientRow>> {
    if workbook::is_workbook(filename) {
        workbook::decode_recipients(bytes)
    } else {
        csv::decode_recipients(bytes)
    }
}

/// Pairs each record with the title row. Untitled columns are dropped,
/// missing trailing cells read as empty and all-empty records are skipped.
pub(crate) fn rows_from_table<I>(titles: Vec<String>, records: I) -> Result<Vec<RecipientRow>>
where
    I: IntoIterator<Item = Vec<String>>,
{
    if titles.iter().all(|t| t.is_empty()) {
        return Err(IssuanceError::Validation(
            "Error: The spreadsheet has no column titles.".to_string(),
        ));
    }

    let mut rows = Vec::new();
    for values in records {
        if values.iter().all(|v| v.is_empty()) {
            continue;
        }
        let pairs = titles
            .iter()
            .enumerate()
            .filter(|(_, title)| !title.is_empty())
            .map(|(i, title)| (title.as_str(), values.get(i).cloned().unwrap_or_default()));
        rows.push(RecipientRow::from_pairs(pairs));
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_format_follows_the_file_name() {
        let rows = decode_upload("students.csv", b"student_name\nAsha\n").unwrap();
        assert_eq!(rows[0].student_name(), "Asha");

        let bytes = workbook::testing::roster(&["Asha", "Ravi"]);
        let rows = decode_upload("Students.XLSX", &bytes).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].student_name(), "Ravi");
    }

    #[test]
    fn untitled_columns_are_dropped() {
        let titles = vec!["student_name".to_string(), String::new()];
        let records = vec![vec!["Asha".to_string(), "stray".to_string()]];
        let rows = rows_from_table(titles, records).unwrap();
        assert_eq!(rows[0].student_name(), "Asha");
        assert!(!rows[0].contains(""));
    }
}
