use std::collections::BTreeMap;

pub const STUDENT_NAME: &str = "student_name";
pub const COLLEGE_NAME: &str = "college_name";
pub const COLLEGE_LOCATION: &str = "college_location";
pub const SEMESTER: &str = "semester";
pub const COURSE_NAME: &str = "course_name";
pub const REG_ID: &str = "reg_id";
pub const INTERNSHIP_HOURS: &str = "internship_hours";
pub const INTERNSHIP_PROGRAM: &str = "internship_program";
pub const PLACE: &str = "place";
pub const ISSUE_DATE: &str = "issue_date";

/// Spreadsheet columns the issuance pipeline knows how to use.
pub const KNOWN_FIELDS: [&str; 10] = [
    STUDENT_NAME,
    COLLEGE_NAME,
    COLLEGE_LOCATION,
    SEMESTER,
    COURSE_NAME,
    REG_ID,
    INTERNSHIP_HOURS,
    INTERNSHIP_PROGRAM,
    PLACE,
    ISSUE_DATE,
];

/// Normalizes a spreadsheet header: trimmed, lower-cased, and every run of
/// inner whitespace replaced by a single `_`.
///
/// `"  Student   Name "` becomes `"student_name"`.
pub fn normalize_field_name(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

/// One recipient read from a bulk upload.
///
/// Lookups never fail: a column that was not in the spreadsheet reads as an
/// empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipientRow {
    fields: BTreeMap<String, String>,
}

impl RecipientRow {
    /// Builds a row from header/value pairs, normalizing every header.
    /// When two headers normalize to the same name the later column wins.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let fields = pairs
            .into_iter()
            .map(|(k, v)| (normalize_field_name(k.as_ref()), v.into()))
            .collect();
        RecipientRow { fields }
    }

    /// Value of `field`, or `""` when the column is absent.
    pub fn get(&self, field: &str) -> &str {
        self.fields.get(field).map(String::as_str).unwrap_or("")
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn student_name(&self) -> &str {
        self.get(STUDENT_NAME)
    }

    /// Known fields with their values (blank when absent), in `KNOWN_FIELDS` order.
    pub fn known_fields(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        KNOWN_FIELDS.iter().map(move |&name| (name, self.get(name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_headers() {
        assert_eq!(normalize_field_name("  Student   Name "), "student_name");
        assert_eq!(normalize_field_name("REG_ID"), "reg_id");
        assert_eq!(normalize_field_name("Issue\tDate"), "issue_date");
        assert_eq!(normalize_field_name("   "), "");
    }

    #[test]
    fn missing_fields_read_blank() {
        let row = RecipientRow::from_pairs([("Student Name", "Asha"), ("Favourite Colour", "red")]);
        assert_eq!(row.student_name(), "Asha");
        assert_eq!(row.get(PLACE), "");
        assert!(!row.contains(PLACE));
        assert!(row.contains("favourite_colour"));
    }

    #[test]
    fn known_fields_cover_every_column_in_order() {
        let row = RecipientRow::from_pairs([("Semester", "5")]);
        let fields: Vec<_> = row.known_fields().collect();
        assert_eq!(fields.len(), KNOWN_FIELDS.len());
        assert_eq!(fields[0], (STUDENT_NAME, ""));
        assert_eq!(fields[3], (SEMESTER, "5"));
    }
}
