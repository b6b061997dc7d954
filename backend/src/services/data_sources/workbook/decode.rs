use crate::certificates::dates::DISPLAY_FORMAT;
use crate::error::{IssuanceError, Result};
use crate::services::data_sources::rows_from_table;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::{NaiveDate, NaiveDateTime};
use common::model::recipient::RecipientRow;
use std::io::Cursor;

const EXTENSIONS: [&str; 5] = [".xlsx", ".xlsm", ".xlsb", ".xls", ".ods"];

pub fn is_workbook(filename: &str) -> bool {
    let lower = filename.to_lowercase();
    EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Decodes the first sheet of an uploaded workbook into recipient rows.
///
/// Date cells come out as `DD-MM-YYYY` so they read the same as a typed
/// day-first date.
pub fn decode_recipients(bytes: &[u8]) -> Result<Vec<RecipientRow>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(unreadable)?;
    let sheet = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| IssuanceError::Validation("Error: The workbook has no sheets.".to_string()))?
        .map_err(unreadable)?;

    let mut table = sheet
        .rows()
        .map(|row| row.iter().map(cell_text).collect::<Vec<_>>());
    let titles = table.next().unwrap_or_default();
    rows_from_table(titles, table)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.replace('\u{00A0}', " ").trim().to_string(),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(value) => value.format(DISPLAY_FORMAT).to_string(),
            None => dt.as_f64().to_string(),
        },
        Data::DateTimeIso(s) => iso_date(s)
            .map(|d| d.format(DISPLAY_FORMAT).to_string())
            .unwrap_or_else(|| s.clone()),
        other => other.to_string(),
    }
}

/// OpenDocument stores dates as `2025-03-01` or `2025-03-01T10:00:00`.
fn iso_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

fn unreadable(e: calamine::Error) -> IssuanceError {
    IssuanceError::Validation(format!("Error: The workbook could not be read: {}", e))
}


#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

    fn class_workbook() -> Vec<u8> {
        let mut workbook = Workbook::new();
        let date_format = Format::new().set_num_format("dd/mm/yyyy");

        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "Student Name").unwrap();
        sheet.write_string(0, 1, " Issue Date ").unwrap();
        sheet.write_string(0, 2, "Semester").unwrap();
        sheet.write_string(1, 0, "Asha").unwrap();
        let issued = ExcelDateTime::from_ymd(2025, 3, 1).unwrap();
        sheet.write_datetime_with_format(1, 1, &issued, &date_format).unwrap();
        sheet.write_number(1, 2, 4).unwrap();
        sheet.write_string(3, 0, "Ravi").unwrap();
        sheet.write_string(3, 2, "V").unwrap();

        let other = workbook.add_worksheet();
        other.write_string(0, 0, "Student Name").unwrap();
        other.write_string(1, 0, "Not on the first sheet").unwrap();

        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn reads_the_first_sheet() {
        let rows = decode_recipients(&class_workbook()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].student_name(), "Asha");
        assert_eq!(rows[0].get("semester"), "4");
        assert_eq!(rows[1].student_name(), "Ravi");
        assert_eq!(rows[1].get("semester"), "V");
    }

    #[test]
    fn date_cells_read_day_first() {
        let rows = decode_recipients(&class_workbook()).unwrap();
        assert_eq!(rows[0].get("issue_date"), "01-03-2025");
        assert_eq!(rows[1].get("issue_date"), "");
    }

    #[test]
    fn recognizes_workbook_names() {
        assert!(is_workbook("Students.XLSX"));
        assert!(is_workbook("class.ods"));
        assert!(is_workbook("legacy.xls"));
        assert!(!is_workbook("students.csv"));
    }

    #[test]
    fn rejects_bytes_that_are_not_a_workbook() {
        assert!(matches!(
            decode_recipients(b"student_name\nAsha\n"),
            Err(IssuanceError::Validation(_))
        ));
    }
}
