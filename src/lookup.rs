//! Named substitution tables used for pseudonymization.
//!
//! Tables are loaded from an INI-style file with one section per table, or from a JSON object
//! of objects when the file has a `.json` extension:
//!
//! ```ini
//! [Tag2Name]
//! (0010,0010) = PatientName
//!
//! [PatientName]
//! Doe^John = ANON001
//! ```
//!
//! Table names are matched exactly. Keys are matched case-insensitively and with surrounding
//! whitespace removed.

use dicom_core::Tag;
use log::debug;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Table mapping a normalized tag string like `(0010,0010)` to the name of the table holding
/// that tag's substitutions.
pub const TAG_TO_NAME_TABLE: &str = "Tag2Name";

/// Table mapping original patient folder names to pseudonymous IDs.
pub const PATIENT_NAME_TABLE: &str = "PatientName";

#[derive(Error, Debug)]
pub enum LookupLoadError {
    #[error("failed to read lookup table file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("syntax error on line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("duplicate table [{0}]")]
    DuplicateTable(String),

    #[error("duplicate key {key:?} in table [{table}]")]
    DuplicateKey { table: String, key: String },

    #[error("invalid JSON lookup tables: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LookupTables(BTreeMap<String, BTreeMap<String, String>>);

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}

/// Returns the string under which `tag` is looked up in the `Tag2Name` table.
///
/// ```
/// use dicom_deidentification::lookup::normalized_tag_key;
/// use dicom_deidentification::tags;
///
/// assert_eq!(normalized_tag_key(&tags::PATIENT_NAME), "(0010,0010)");
/// ```
pub fn normalized_tag_key(tag: &Tag) -> String {
    format!("({:04x},{:04x})", tag.group(), tag.element())
}

impl LookupTables {
    pub fn new() -> Self {
        LookupTables(BTreeMap::new())
    }

    /// Loads lookup tables from `path`.
    ///
    /// Files with a `.json` extension are read as JSON, anything else as INI-style sections.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, LookupLoadError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| LookupLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let tables = if is_json {
            Self::from_json_str(&content)?
        } else {
            Self::from_ini_str(&content)?
        };

        debug!(
            "loaded {} lookup tables from {}",
            tables.0.len(),
            path.display()
        );
        Ok(tables)
    }

    pub fn from_json_str(content: &str) -> Result<Self, LookupLoadError> {
        let raw: BTreeMap<String, BTreeMap<String, String>> = serde_json::from_str(content)?;

        let mut tables = LookupTables::new();
        for (table, entries) in raw {
            for (key, value) in entries {
                tables.insert_new(&table, &key, value)?;
            }
        }
        Ok(tables)
    }

    /// Parses INI-style sections.
    ///
    /// Supports `key = value` and `key: value` entries, `#` and `;` comment lines, and indented
    /// continuation lines, which are appended to the previous value after a newline.
    pub fn from_ini_str(content: &str) -> Result<Self, LookupLoadError> {
        let mut tables = LookupTables::new();
        let mut table: Option<String> = None;
        let mut last_key: Option<String> = None;

        for (index, raw_line) in content.lines().enumerate() {
            let line = index + 1;
            let trimmed = raw_line.trim();

            if trimmed.is_empty() {
                last_key = None;
                continue;
            }
            if trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }

            if raw_line.starts_with(char::is_whitespace) {
                if let (Some(table), Some(key)) = (&table, &last_key) {
                    if let Some(value) = tables.0.get_mut(table).and_then(|t| t.get_mut(key)) {
                        value.push('\n');
                        value.push_str(trimmed);
                        continue;
                    }
                }
            }

            if let Some(rest) = trimmed.strip_prefix('[') {
                let name = rest
                    .strip_suffix(']')
                    .ok_or_else(|| LookupLoadError::Syntax {
                        line,
                        message: format!("unterminated table header {trimmed:?}"),
                    })?
                    .trim();
                if tables.0.contains_key(name) {
                    return Err(LookupLoadError::DuplicateTable(name.to_string()));
                }
                tables.0.insert(name.to_string(), BTreeMap::new());
                table = Some(name.to_string());
                last_key = None;
                continue;
            }

            let Some(current_table) = &table else {
                return Err(LookupLoadError::Syntax {
                    line,
                    message: "entry outside of any table".into(),
                });
            };

            let separator = trimmed
                .find(|c: char| c == '=' || c == ':')
                .ok_or_else(|| LookupLoadError::Syntax {
                    line,
                    message: format!("expected 'key = value', got {trimmed:?}"),
                })?;
            let key = &trimmed[..separator];
            if key.trim().is_empty() {
                return Err(LookupLoadError::Syntax {
                    line,
                    message: "empty key".into(),
                });
            }
            let value = trimmed[separator + 1..].trim();

            tables.insert_new(current_table, key, value.to_string())?;
            last_key = Some(normalize_key(key));
        }

        Ok(tables)
    }

    fn insert_new(&mut self, table: &str, key: &str, value: String) -> Result<(), LookupLoadError> {
        let entries = self.0.entry(table.to_string()).or_default();
        match entries.entry(normalize_key(key)) {
            Entry::Occupied(entry) => Err(LookupLoadError::DuplicateKey {
                table: table.to_string(),
                key: entry.key().clone(),
            }),
            Entry::Vacant(entry) => {
                entry.insert(value);
                Ok(())
            }
        }
    }

    /// Adds or replaces an entry, creating the table if needed.
    pub fn insert(&mut self, table: &str, key: &str, value: &str) -> Option<String> {
        self.0
            .entry(table.to_string())
            .or_default()
            .insert(normalize_key(key), value.to_string())
    }

    pub fn get(&self, table: &str, key: &str) -> Option<&str> {
        self.0
            .get(table)
            .and_then(|entries| entries.get(&normalize_key(key)))
            .map(String::as_str)
    }

    pub fn contains_table(&self, table: &str) -> bool {
        self.0.contains_key(table)
    }

    /// Returns the name of the table holding the substitutions for `tag`, as registered in
    /// the `Tag2Name` table.
    pub fn table_for_tag(&self, tag: &Tag) -> Option<&str> {
        self.get(TAG_TO_NAME_TABLE, &normalized_tag_key(tag))
    }

    /// Returns the pseudonymous ID for a patient folder name, as registered in the
    /// `PatientName` table.
    pub fn patient_id(&self, name: &str) -> Option<&str> {
        self.get(PATIENT_NAME_TABLE, name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags;

    const INI: &str = "\
# pseudonyms for the toy dataset
[Tag2Name]
(0010,0010) = PatientName
(0010, 0020): PatientID

[PatientName]
Doe^John = ANON001
MaBaoguo = ANON002

; ids
[PatientID]
203087 = 1001
";

    #[test]
    fn test_from_ini_str() {
        let tables = LookupTables::from_ini_str(INI).unwrap();
        assert_eq!(tables.len(), 3);
        assert_eq!(tables.get("PatientName", "Doe^John"), Some("ANON001"));
        assert_eq!(tables.get("PatientID", "203087"), Some("1001"));
        assert_eq!(tables.get("PatientID", "999"), None);
        assert_eq!(tables.get("Unknown", "203087"), None);
    }

    #[test]
    fn test_keys_are_case_insensitive() {
        let tables = LookupTables::from_ini_str(INI).unwrap();
        assert_eq!(tables.patient_id("mabaoguo"), Some("ANON002"));
        assert_eq!(tables.patient_id("MABAOGUO"), Some("ANON002"));
    }

    #[test]
    fn test_table_names_are_case_sensitive() {
        let tables = LookupTables::from_ini_str(INI).unwrap();
        assert!(tables.contains_table("PatientName"));
        assert!(!tables.contains_table("patientname"));
    }

    #[test]
    fn test_table_for_tag() {
        let tables = LookupTables::from_ini_str(INI).unwrap();
        assert_eq!(tables.table_for_tag(&tags::PATIENT_NAME), Some("PatientName"));
        // keys written with a space after the comma are not normalized
        assert_eq!(tables.table_for_tag(&tags::PATIENT_ID), None);
        assert_eq!(tables.table_for_tag(&tags::PATIENT_AGE), None);
    }

    #[test]
    fn test_normalized_tag_key() {
        assert_eq!(normalized_tag_key(&Tag(0x0008, 0x103e)), "(0008,103e)");
        assert_eq!(normalized_tag_key(&Tag(0x7FE0, 0x0010)), "(7fe0,0010)");
    }

    #[test]
    fn test_hex_tag_keys_match_in_any_case() {
        let tables =
            LookupTables::from_ini_str("[Tag2Name]\n(0008,103E) = SeriesDescription\n").unwrap();
        assert_eq!(
            tables.table_for_tag(&tags::SERIES_DESCRIPTION),
            Some("SeriesDescription")
        );
    }

    #[test]
    fn test_continuation_lines() {
        let tables = LookupTables::from_ini_str("[Notes]\nkey = first\n  second\n").unwrap();
        assert_eq!(tables.get("Notes", "key"), Some("first\nsecond"));
    }

    #[test]
    fn test_value_may_contain_separators() {
        let tables = LookupTables::from_ini_str("[Times]\nnoon = 12:00\n").unwrap();
        assert_eq!(tables.get("Times", "noon"), Some("12:00"));
    }

    #[test]
    fn test_entry_outside_table() {
        let result = LookupTables::from_ini_str("key = value\n");
        assert!(matches!(
            result,
            Err(LookupLoadError::Syntax { line: 1, .. })
        ));
    }

    #[test]
    fn test_missing_separator() {
        let result = LookupTables::from_ini_str("[PatientName]\njust a key\n");
        assert!(matches!(
            result,
            Err(LookupLoadError::Syntax { line: 2, .. })
        ));
    }

    #[test]
    fn test_unterminated_header() {
        let result = LookupTables::from_ini_str("[PatientName\n");
        assert!(matches!(
            result,
            Err(LookupLoadError::Syntax { line: 1, .. })
        ));
    }

    #[test]
    fn test_duplicate_table() {
        let result = LookupTables::from_ini_str("[PatientName]\n[PatientName]\n");
        assert!(matches!(result, Err(LookupLoadError::DuplicateTable(name)) if name == "PatientName"));
    }

    #[test]
    fn test_duplicate_key() {
        let result = LookupTables::from_ini_str("[PatientName]\nP1 = A\np1 = B\n");
        assert!(matches!(
            result,
            Err(LookupLoadError::DuplicateKey { table, key }) if table == "PatientName" && key == "p1"
        ));
    }

    #[test]
    fn test_from_json_str() {
        let tables = LookupTables::from_json_str(
            r#"{"Tag2Name": {"(0010,0010)": "PatientName"}, "PatientName": {"P1": "ANON001"}}"#,
        )
        .unwrap();
        assert_eq!(tables.patient_id("P1"), Some("ANON001"));
        assert_eq!(tables.table_for_tag(&tags::PATIENT_NAME), Some("PatientName"));
    }

    #[test]
    fn test_from_json_str_invalid() {
        let result = LookupTables::from_json_str(r#"{"PatientName": ["P1"]}"#);
        assert!(matches!(result, Err(LookupLoadError::Json(_))));
    }

    #[test]
    fn test_insert() {
        let mut tables = LookupTables::new();
        assert!(tables.is_empty());
        assert_eq!(tables.insert("PatientName", "P1", "ANON001"), None);
        assert_eq!(
            tables.insert("PatientName", "P1", "ANON002"),
            Some("ANON001".to_string())
        );
        assert_eq!(tables.patient_id("P1"), Some("ANON002"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();

        let ini_path = dir.path().join("lookup.ini");
        fs::write(&ini_path, INI).unwrap();
        let tables = LookupTables::load(&ini_path).unwrap();
        assert_eq!(tables.patient_id("Doe^John"), Some("ANON001"));

        let json_path = dir.path().join("lookup.json");
        fs::write(&json_path, r#"{"PatientName": {"P1": "ANON001"}}"#).unwrap();
        let tables = LookupTables::load(&json_path).unwrap();
        assert_eq!(tables.patient_id("P1"), Some("ANON001"));
    }

    #[test]
    fn test_load_missing_file() {
        let result = LookupTables::load("does/not/exist.ini");
        assert!(matches!(result, Err(LookupLoadError::Io { .. })));
    }
}
