use crate::error::{IssuanceError, Result};
use crate::services::data_sources::rows_from_table;
use common::model::recipient::RecipientRow;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// The delimiter occurring most often in the header line.
fn detect_delimiter(header_line: &str) -> u8 {
    [b',', b';', b'\t', b'|']
        .into_iter()
        .max_by_key(|&d| header_line.bytes().filter(|&b| b == d).count())
        .filter(|&d| header_line.as_bytes().contains(&d))
        .unwrap_or(b',')
}

/// Removes surrounding quotes and non-breaking spaces spreadsheet exports
/// like to leave behind.
fn normalize_cell(cell: &str) -> String {
    let s = cell.trim();
    let s = s
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .unwrap_or(s);
    s.replace('\u{00A0}', " ").trim().to_string()
}

/// Decodes an uploaded CSV into recipient rows, in file order.
///
/// Column titles are normalized by `RecipientRow`; missing trailing cells
/// read as empty and lines with only empty cells are skipped.
pub fn decode_recipients(bytes: &[u8]) -> Result<Vec<RecipientRow>> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let text = std::str::from_utf8(bytes).map_err(|_| {
        IssuanceError::Validation("Error: The spreadsheet must be UTF-8 encoded CSV.".to_string())
    })?;

    let header_line = text.lines().next().unwrap_or("");
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(detect_delimiter(header_line))
        .flexible(true)
        .from_reader(text.as_bytes());

    let titles: Vec<String> = reader
        .headers()
        .map_err(invalid_csv)?
        .iter()
        .map(normalize_cell)
        .collect();
    let records = reader
        .records()
        .map(|record| {
            record
                .map(|r| r.iter().map(normalize_cell).collect::<Vec<_>>())
                .map_err(invalid_csv)
        })
        .collect::<Result<Vec<_>>>()?;
    rows_from_table(titles, records)
}

fn invalid_csv(e: csv::Error) -> IssuanceError {
    IssuanceError::Validation(format!("Error: The spreadsheet could not be read: {}", e))
}
