use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::StringRecord;
use thiserror::Error;

use super::model::{Column, RepositoryRecord, RepositoryTable};

/// Cell spellings treated as "no value", checked after trimming.
const MISSING_TOKENS: [&str; 11] = [
    "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "null", "NULL", "None", "#N/A", "<NA>",
];

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Error reading CSV file: {0}")]
    Unparseable(String),

    #[error("The required columns are not available in the dataset (missing: {})", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a repository table from a file on disk.
pub fn load_path(path: &Path) -> Result<RepositoryTable, LoadError> {
    let bytes = std::fs::read(path)?;
    log::debug!("Read {} bytes from {}", bytes.len(), path.display());
    load_bytes(&bytes)
}

/// Parse an ISO-8859-1, comma-delimited buffer with a header row.
///
/// Rows the CSV reader rejects, or that carry more fields than the header,
/// are skipped. Rows with fewer fields are padded with missing values. Rows
/// missing `language`, `repositories` or `contributors` are dropped.
pub fn load_bytes(bytes: &[u8]) -> Result<RepositoryTable, LoadError> {
    let text = decode_latin1(bytes);
    if text.trim().is_empty() {
        return Err(LoadError::Unparseable("No columns to parse from file".into()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b',')
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| LoadError::Unparseable(format!("reading header row: {e}")))?
        .clone();

    let mut positions: BTreeMap<Column, usize> = BTreeMap::new();
    for (idx, header) in headers.iter().enumerate() {
        if let Some(col) = Column::from_header(header) {
            positions.entry(col).or_insert(idx);
        }
    }

    let missing: Vec<String> = Column::REQUIRED
        .iter()
        .filter(|c| !positions.contains_key(*c))
        .map(|c| c.name().to_string())
        .collect();
    if !missing.is_empty() {
        return Err(LoadError::MissingColumns(missing));
    }

    let width = headers.len();
    let mut records = Vec::new();
    let mut malformed = 0usize;
    let mut incomplete = 0usize;

    for (row_no, result) in reader.records().enumerate() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                log::debug!("Skipping row {row_no}: {e}");
                malformed += 1;
                continue;
            }
        };
        if row.len() > width {
            log::debug!("Skipping row {row_no}: expected {width} fields, saw {}", row.len());
            malformed += 1;
            continue;
        }
        match parse_record(&row, &positions) {
            Some(rec) => records.push(rec),
            None => incomplete += 1,
        }
    }

    if malformed > 0 {
        log::warn!("Skipped {malformed} malformed rows");
    }
    if incomplete > 0 {
        log::info!("Dropped {incomplete} rows missing language, repositories or contributors");
    }

    let columns: BTreeSet<Column> = positions.into_keys().collect();
    Ok(RepositoryTable::from_records(records, columns))
}

/// ISO-8859-1 maps every byte to the code point of the same value.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

// ---------------------------------------------------------------------------
// Cell parsing
// ---------------------------------------------------------------------------

fn parse_record(row: &StringRecord, positions: &BTreeMap<Column, usize>) -> Option<RepositoryRecord> {
    let cell = |col: Column| {
        positions
            .get(&col)
            .and_then(|&idx| row.get(idx))
            .filter(|s| !is_missing(s))
    };
    let count = |col: Column| cell(col).and_then(parse_count);

    Some(RepositoryRecord {
        language: cell(Column::Language)?.to_string(),
        repositories: cell(Column::Repositories)?.to_string(),
        contributors: count(Column::Contributors)?,
        stars_count: count(Column::StarsCount),
        forks_count: count(Column::ForksCount),
        issues_count: count(Column::IssuesCount),
        pull_requests: count(Column::PullRequests),
        created_at: cell(Column::CreatedAt).and_then(parse_timestamp),
    })
}

fn is_missing(s: &str) -> bool {
    let s = s.trim();
    s.is_empty() || MISSING_TOKENS.contains(&s)
}

/// Parse a non-negative integer count. Integral floats such as `12.0` are
/// accepted; anything else is treated as missing.
pub fn parse_count(s: &str) -> Option<u64> {
    let s = s.trim();
    if let Ok(n) = s.parse::<u64>() {
        return Some(n);
    }
    let f = s.parse::<f64>().ok()?;
    if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 {
        Some(f as u64)
    } else {
        None
    }
}

/// Parse a `created_at` cell. Offsets are normalised to UTC.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in ["%Y-%m-%d", "%m/%d/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latin1_decoding() {
        assert_eq!(decode_latin1(b"caf\xe9"), "café");
        assert_eq!(decode_latin1(&[0x41, 0xff]), "A\u{ff}");
    }

    #[test]
    fn test_missing_contributors_row_is_dropped() {
        let csv = b"repositories,language,contributors,stars_count\n\
                    repoA,py,3,100\n\
                    repoB,go,,50\n\
                    repoC,rust,NaN,5\n";
        let table = load_bytes(csv).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.records[0].repositories, "repoA");
        assert_eq!(table.records[0].stars_count, Some(100));
    }

    #[test]
    fn test_overlong_rows_are_skipped_and_short_rows_padded() {
        let csv = b"repositories,language,contributors,stars_count\n\
                    repoA,py,3,100,unexpected\n\
                    repoB,go,2\n";
        let table = load_bytes(csv).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.records[0].repositories, "repoB");
        assert_eq!(table.records[0].stars_count, None);
    }

    #[test]
    fn test_missing_required_columns_reported_by_name() {
        let err = load_bytes(b"repositories,stars_count\nrepoA,1\n").unwrap_err();
        match err {
            LoadError::MissingColumns(cols) => assert_eq!(cols, ["language", "contributors"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_input_is_unparseable() {
        assert!(matches!(load_bytes(b""), Err(LoadError::Unparseable(_))));
        assert!(matches!(load_bytes(b"\n  \n"), Err(LoadError::Unparseable(_))));
    }

    #[test]
    fn test_header_only_gives_empty_table() {
        let table = load_bytes(b"language,repositories,contributors\n").unwrap();
        assert!(table.is_empty());
        assert!(!table.has_column(Column::CreatedAt));
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("42"), Some(42));
        assert_eq!(parse_count(" 12.0 "), Some(12));
        assert_eq!(parse_count("1.5"), None);
        assert_eq!(parse_count("-3"), None);
        assert_eq!(parse_count("1k"), None);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2021, 3, 4).unwrap();
        for s in [
            "2021-03-04",
            "03/04/2021",
            "2021-03-04 10:11:12",
            "2021-03-04T10:11:12",
            "2021-03-04T10:11:12Z",
            "2021-03-04 10:11:12.250",
        ] {
            let ts = parse_timestamp(s).unwrap_or_else(|| panic!("failed to parse {s}"));
            assert_eq!(ts.date(), expected, "{s}");
        }
        assert_eq!(parse_timestamp("yesterday"), None);
    }
}
