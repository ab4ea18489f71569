use std::collections::BTreeSet;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};

// ---------------------------------------------------------------------------
// Column – the known header names
// ---------------------------------------------------------------------------

/// Every column the dashboard understands, keyed by its exact header text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Column {
    Language,
    Repositories,
    Contributors,
    StarsCount,
    ForksCount,
    IssuesCount,
    PullRequests,
    CreatedAt,
}

impl Column {
    pub const ALL: [Column; 8] = [
        Column::Language,
        Column::Repositories,
        Column::Contributors,
        Column::StarsCount,
        Column::ForksCount,
        Column::IssuesCount,
        Column::PullRequests,
        Column::CreatedAt,
    ];

    /// Columns a row must carry a value for to survive loading.
    pub const REQUIRED: [Column; 3] = [Column::Language, Column::Repositories, Column::Contributors];

    pub fn name(self) -> &'static str {
        match self {
            Column::Language => "language",
            Column::Repositories => "repositories",
            Column::Contributors => "contributors",
            Column::StarsCount => "stars_count",
            Column::ForksCount => "forks_count",
            Column::IssuesCount => "issues_count",
            Column::PullRequests => "pull_requests",
            Column::CreatedAt => "created_at",
        }
    }

    pub fn from_header(header: &str) -> Option<Column> {
        Column::ALL.into_iter().find(|c| c.name() == header)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// NumericColumn – inputs of the correlation matrix
// ---------------------------------------------------------------------------

/// The numeric columns that take part in the correlation heatmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NumericColumn {
    StarsCount,
    ForksCount,
    IssuesCount,
    PullRequests,
    Contributors,
}

impl NumericColumn {
    pub const ALL: [NumericColumn; 5] = [
        NumericColumn::StarsCount,
        NumericColumn::ForksCount,
        NumericColumn::IssuesCount,
        NumericColumn::PullRequests,
        NumericColumn::Contributors,
    ];

    pub fn column(self) -> Column {
        match self {
            NumericColumn::StarsCount => Column::StarsCount,
            NumericColumn::ForksCount => Column::ForksCount,
            NumericColumn::IssuesCount => Column::IssuesCount,
            NumericColumn::PullRequests => Column::PullRequests,
            NumericColumn::Contributors => Column::Contributors,
        }
    }

    pub fn name(self) -> &'static str {
        self.column().name()
    }

    /// Read this column from a record as a float, `None` when missing.
    pub fn value(self, record: &RepositoryRecord) -> Option<f64> {
        let v = match self {
            NumericColumn::StarsCount => record.stars_count,
            NumericColumn::ForksCount => record.forks_count,
            NumericColumn::IssuesCount => record.issues_count,
            NumericColumn::PullRequests => record.pull_requests,
            NumericColumn::Contributors => Some(record.contributors),
        };
        v.map(|n| n as f64)
    }
}

// ---------------------------------------------------------------------------
// RepositoryRecord – one row of the table
// ---------------------------------------------------------------------------

/// A single repository (one row of the source file).
#[derive(Debug, Clone, PartialEq)]
pub struct RepositoryRecord {
    pub language: String,
    pub repositories: String,
    pub contributors: u64,
    pub stars_count: Option<u64>,
    pub forks_count: Option<u64>,
    pub issues_count: Option<u64>,
    pub pull_requests: Option<u64>,
    pub created_at: Option<NaiveDateTime>,
}

impl RepositoryRecord {
    /// Record with only the required fields set.
    pub fn new(language: impl Into<String>, repositories: impl Into<String>, contributors: u64) -> Self {
        RepositoryRecord {
            language: language.into(),
            repositories: repositories.into(),
            contributors,
            stars_count: None,
            forks_count: None,
            issues_count: None,
            pull_requests: None,
            created_at: None,
        }
    }

    pub fn with_stars(mut self, stars: u64) -> Self {
        self.stars_count = Some(stars);
        self
    }

    pub fn with_created_at(mut self, created_at: NaiveDateTime) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

// ---------------------------------------------------------------------------
// RepositoryTable – the complete loaded dataset
// ---------------------------------------------------------------------------

/// The loaded table with the column indices the filter widgets need.
#[derive(Debug, Clone)]
pub struct RepositoryTable {
    /// All retained rows, in file order.
    pub records: Vec<RepositoryRecord>,
    /// Columns present in the header.
    pub columns: BTreeSet<Column>,
    pub languages: BTreeSet<String>,
    pub repositories: BTreeSet<String>,
    pub contributors: BTreeSet<u64>,
    /// Largest `stars_count` seen, if any row has one.
    pub max_stars: Option<u64>,
    /// Earliest and latest `created_at` calendar dates.
    pub date_range: Option<(NaiveDate, NaiveDate)>,
}

impl RepositoryTable {
    /// Build column indices from the loaded records.
    pub fn from_records(records: Vec<RepositoryRecord>, columns: BTreeSet<Column>) -> Self {
        let mut languages = BTreeSet::new();
        let mut repositories = BTreeSet::new();
        let mut contributors = BTreeSet::new();
        let mut max_stars: Option<u64> = None;
        let mut date_range: Option<(NaiveDate, NaiveDate)> = None;

        for rec in &records {
            languages.insert(rec.language.clone());
            repositories.insert(rec.repositories.clone());
            contributors.insert(rec.contributors);
            if let Some(s) = rec.stars_count {
                max_stars = Some(max_stars.map_or(s, |m| m.max(s)));
            }
            if let Some(ts) = rec.created_at {
                let d = ts.date();
                date_range = Some(match date_range {
                    Some((lo, hi)) => (lo.min(d), hi.max(d)),
                    None => (d, d),
                });
            }
        }

        RepositoryTable {
            records,
            columns,
            languages,
            repositories,
            contributors,
            max_stars,
            date_range,
        }
    }

    pub fn has_column(&self, column: Column) -> bool {
        self.columns.contains(&column)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_columns() -> BTreeSet<Column> {
        Column::ALL.into_iter().collect()
    }

    #[test]
    fn test_column_header_lookup() {
        assert_eq!(Column::from_header("stars_count"), Some(Column::StarsCount));
        assert_eq!(Column::from_header("Stars_Count"), None);
        assert_eq!(Column::PullRequests.to_string(), "pull_requests");
    }

    #[test]
    fn test_table_indices() {
        let d1 = NaiveDate::from_ymd_opt(2020, 5, 1).unwrap().and_hms_opt(8, 0, 0).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2019, 1, 3).unwrap().and_hms_opt(23, 0, 0).unwrap();
        let table = RepositoryTable::from_records(
            vec![
                RepositoryRecord::new("py", "a", 3).with_stars(10).with_created_at(d1),
                RepositoryRecord::new("go", "b", 1).with_created_at(d2),
                RepositoryRecord::new("py", "c", 3).with_stars(7),
            ],
            all_columns(),
        );

        assert_eq!(table.len(), 3);
        assert_eq!(table.languages.iter().collect::<Vec<_>>(), ["go", "py"]);
        assert_eq!(table.contributors.iter().copied().collect::<Vec<_>>(), [1, 3]);
        assert_eq!(table.max_stars, Some(10));
        assert_eq!(table.date_range, Some((d2.date(), d1.date())));
    }

    #[test]
    fn test_numeric_column_reads_contributors() {
        let rec = RepositoryRecord::new("rust", "x", 4);
        assert_eq!(NumericColumn::Contributors.value(&rec), Some(4.0));
        assert_eq!(NumericColumn::ForksCount.value(&rec), None);
    }
}
