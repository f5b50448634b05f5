//! Loads a column-level schema export (CSV) into normalized records.

use crate::schema::{ColumnRecord, KeyType};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

pub const REQUIRED_COLUMNS: [&str; 6] = [
    "TABLE_NAME",
    "COLUMN_NAME",
    "DATA_TYPE",
    "CHARACTER_MAXIMUM_LENGTH",
    "KEY_TYPE",
    "IS_INDEXED",
];

#[derive(Debug, thiserror::Error)]
pub enum SchemaFormatError {
    #[error("CSV file must contain the following columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    #[error("Line {line}: invalid {column} value {value:?}")]
    InvalidValue {
        line: u64,
        column: &'static str,
        value: String,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Failed to open schema file: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(rename = "TABLE_NAME")]
    table_name: String,
    #[serde(rename = "COLUMN_NAME")]
    column_name: String,
    #[serde(rename = "DATA_TYPE")]
    data_type: String,
    #[serde(rename = "CHARACTER_MAXIMUM_LENGTH")]
    max_length: String,
    #[serde(rename = "KEY_TYPE")]
    key_type: String,
    #[serde(rename = "IS_INDEXED")]
    is_indexed: String,
}

pub struct SchemaLoader;

impl SchemaLoader {
    pub fn load_path<P, S>(path: P, tables: &[S]) -> Result<Vec<ColumnRecord>, SchemaFormatError>
    where
        P: AsRef<Path>,
        S: AsRef<str>,
    {
        let file = File::open(path.as_ref())?;
        Self::load_reader(file, tables)
    }

    /// Reads every row, validates it, then keeps the rows whose table is in
    /// `tables` (compared after uppercasing the caller's names).
    pub fn load_reader<R, S>(
        reader: R,
        tables: &[S],
    ) -> Result<Vec<ColumnRecord>, SchemaFormatError>
    where
        R: Read,
        S: AsRef<str>,
    {
        let wanted: HashSet<String> = tables.iter().map(|t| t.as_ref().to_uppercase()).collect();

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        let mut missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|c| !headers.iter().any(|h| h == **c))
            .map(|c| c.to_string())
            .collect();
        if !missing.is_empty() {
            missing.sort();
            return Err(SchemaFormatError::MissingColumns(missing));
        }

        let mut records = Vec::new();
        let mut total = 0usize;
        for result in rdr.records() {
            let row = result?;
            let line = row.position().map(|p| p.line()).unwrap_or(0);
            let raw: RawRow = row.deserialize(Some(&headers))?;
            let record = normalize(raw, line)?;
            total += 1;
            if wanted.contains(&record.table_name) {
                records.push(record);
            }
        }

        debug!(total, kept = records.len(), "loaded schema rows");
        Ok(records)
    }
}

fn normalize(raw: RawRow, line: u64) -> Result<ColumnRecord, SchemaFormatError> {
    let max_length = parse_max_length(&raw.max_length).ok_or_else(|| {
        SchemaFormatError::InvalidValue {
            line,
            column: "CHARACTER_MAXIMUM_LENGTH",
            value: raw.max_length.clone(),
        }
    })?;
    let is_indexed = parse_flag(&raw.is_indexed).ok_or_else(|| SchemaFormatError::InvalidValue {
        line,
        column: "IS_INDEXED",
        value: raw.is_indexed.clone(),
    })?;

    Ok(ColumnRecord {
        table_name: normalize_name(&raw.table_name),
        column_name: normalize_name(&raw.column_name),
        data_type: normalize_name(&raw.data_type),
        max_length,
        key_type: KeyType::from_str(&raw.key_type.to_uppercase()),
        is_indexed,
    })
}

pub fn normalize_name(s: &str) -> String {
    s.to_uppercase().replace('&', "AND")
}

fn is_null(s: &str) -> bool {
    s.is_empty()
        || s.eq_ignore_ascii_case("NULL")
        || s.eq_ignore_ascii_case("NAN")
        || s.eq_ignore_ascii_case("NONE")
}

/// `Some(None)` for a missing length, `None` for text that is not a length.
fn parse_max_length(s: &str) -> Option<Option<i64>> {
    if is_null(s) {
        return Some(None);
    }
    if let Ok(n) = s.parse::<i64>() {
        return Some(Some(n));
    }
    // Dataframe and spreadsheet exports write integral floats, e.g. `50.0`.
    match s.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 => Some(Some(f as i64)),
        _ => None,
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    if is_null(s) {
        return Some(false);
    }
    match s.to_uppercase().as_str() {
        "TRUE" | "T" | "YES" | "Y" | "1" => Some(true),
        "FALSE" | "F" | "NO" | "N" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str =
        "TABLE_NAME,COLUMN_NAME,DATA_TYPE,CHARACTER_MAXIMUM_LENGTH,KEY_TYPE,IS_INDEXED\n";

    fn load(body: &str, tables: &[&str]) -> Result<Vec<ColumnRecord>, SchemaFormatError> {
        let input = format!("{}{}", HEADER, body);
        SchemaLoader::load_reader(input.as_bytes(), tables)
    }

    #[test]
    fn test_normalizes_case_and_ampersand() {
        let records = load("p&l,cost&price,r&d type,,,\n", &["P&L"]);
        // Caller names are only uppercased, so `P&L` no longer matches `PANDL`.
        assert!(records.unwrap().is_empty());

        let records = load("p&l,cost&price,r&d type,,,\n", &["pandl"]).unwrap();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.table_name, "PANDL");
        assert_eq!(r.column_name, "COSTANDPRICE");
        assert_eq!(r.data_type, "RANDD TYPE");
        for text in [&r.table_name, &r.column_name, &r.data_type] {
            assert!(!text.contains('&'));
            assert_eq!(text, &text.to_uppercase());
        }
    }

    #[test]
    fn test_filter_is_case_insensitive_and_exact() {
        let body = "\
customer,custno,int,,primary key,true
Customers,custno,int,,,false
site,custno,int,,foreign key,false
";
        let records = load(body, &["Customer", "SITE"]).unwrap();
        let tables: Vec<&str> = records.iter().map(|r| r.table_name.as_str()).collect();
        assert_eq!(tables, vec!["CUSTOMER", "SITE"]);
    }

    #[test]
    fn test_missing_columns() {
        let input = "TABLE_NAME,COLUMN_NAME,DATA_TYPE\nA,B,INT\n";
        let err = SchemaLoader::load_reader(input.as_bytes(), &["A"]).unwrap_err();
        match err {
            SchemaFormatError::MissingColumns(cols) => {
                assert_eq!(cols, vec!["CHARACTER_MAXIMUM_LENGTH", "IS_INDEXED", "KEY_TYPE"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_extra_columns_ignored() {
        let input = concat!(
            "ORDINAL,TABLE_NAME,COLUMN_NAME,DATA_TYPE,CHARACTER_MAXIMUM_LENGTH,",
            "KEY_TYPE,IS_INDEXED,NOTE\n",
            "1,quote,quoteno,varchar,20,PRIMARY KEY,1,x\n",
        );
        let records = SchemaLoader::load_reader(input.as_bytes(), &["QUOTE"]).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].max_length, Some(20));
        assert_eq!(records[0].key_type, KeyType::Primary);
        assert!(records[0].is_indexed);
    }

    #[test]
    fn test_max_length_variants() {
        let body = "\
t,a,varchar,50,,
t,b,int,,,
t,c,varchar,50.0,,
t,d,int,NULL,,
t,e,nvarchar,-1,,
";
        let records = load(body, &["T"]).unwrap();
        let lengths: Vec<Option<i64>> = records.iter().map(|r| r.max_length).collect();
        assert_eq!(lengths, vec![Some(50), None, Some(50), None, Some(-1)]);
    }

    #[test]
    fn test_invalid_max_length_rejected() {
        let err = load("t,a,varchar,fifty,,\n", &["T"]).unwrap_err();
        match err {
            SchemaFormatError::InvalidValue { line, column, value } => {
                assert_eq!(line, 2);
                assert_eq!(column, "CHARACTER_MAXIMUM_LENGTH");
                assert_eq!(value, "fifty");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_row_rejected_even_when_filtered_out() {
        let err = load("other,a,int,,,maybe\n", &["T"]).unwrap_err();
        assert!(matches!(err, SchemaFormatError::InvalidValue { column: "IS_INDEXED", .. }));
    }

    #[test]
    fn test_index_flags() {
        let body = "t,a,int,,,True\nt,b,int,,,0\nt,c,int,,,\nt,d,int,,,yes\n";
        let flags: Vec<bool> = load(body, &["t"]).unwrap().iter().map(|r| r.is_indexed).collect();
        assert_eq!(flags, vec![true, false, false, true]);
    }

    #[test]
    fn test_load_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tables.csv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "{}invoice, invoiceno ,int,,Primary Key,1", HEADER).unwrap();

        let records = SchemaLoader::load_path(&path, &["invoice"]).unwrap();
        assert_eq!(records[0].column_name, "INVOICENO");
        assert_eq!(records[0].key_type, KeyType::Primary);
    }

    #[test]
    fn test_load_path_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = SchemaLoader::load_path(dir.path().join("nope.csv"), &["A"]).unwrap_err();
        assert!(matches!(err, SchemaFormatError::Io(_)));
    }
}
