use std::collections::BTreeSet;

use chrono::NaiveDate;

use super::model::{Column, RepositoryRecord, RepositoryTable};

// ---------------------------------------------------------------------------
// Filter predicates
// ---------------------------------------------------------------------------

/// Inclusive bounds on `stars_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StarsRange {
    pub min: u64,
    pub max: u64,
}

impl StarsRange {
    pub fn contains(&self, stars: u64) -> bool {
        self.min <= stars && stars <= self.max
    }
}

/// Inclusive calendar-day bounds on `created_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// The user's current selections.
///
/// An empty categorical set means "no restriction" for that column.
/// `stars` is `None` when the file has no `stars_count` column and `dates`
/// is `None` when it has no usable `created_at` values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterState {
    pub languages: BTreeSet<String>,
    pub repositories: BTreeSet<String>,
    pub contributors: BTreeSet<u64>,
    pub stars: Option<StarsRange>,
    pub dates: Option<DateRange>,
}

impl FilterState {
    /// Nothing selected, stars in `[0, observed max]`, dates spanning the
    /// observed range.
    pub fn defaults_for(table: &RepositoryTable) -> Self {
        let stars = table.has_column(Column::StarsCount).then(|| StarsRange {
            min: 0,
            max: table.max_stars.unwrap_or(0),
        });
        let dates = if table.has_column(Column::CreatedAt) {
            table.date_range.map(|(start, end)| DateRange { start, end })
        } else {
            None
        };

        FilterState {
            stars,
            dates,
            ..FilterState::default()
        }
    }

    /// Whether a single record passes every active filter.
    ///
    /// Records without a `stars_count` (or `created_at`) value fail an active
    /// stars (or date) range, since the comparison is undefined for them.
    pub fn matches(&self, record: &RepositoryRecord) -> bool {
        if !self.languages.is_empty() && !self.languages.contains(&record.language) {
            return false;
        }
        if !self.repositories.is_empty() && !self.repositories.contains(&record.repositories) {
            return false;
        }
        if !self.contributors.is_empty() && !self.contributors.contains(&record.contributors) {
            return false;
        }
        if let Some(range) = &self.stars {
            match record.stars_count {
                Some(s) if range.contains(s) => {}
                _ => return false,
            }
        }
        if let Some(range) = &self.dates {
            match record.created_at {
                Some(ts) if range.contains(ts.date()) => {}
                _ => return false,
            }
        }
        true
    }
}

/// Return indices of records that pass all active filters, in table order.
pub fn filtered_indices(table: &RepositoryTable, filters: &FilterState) -> Vec<usize> {
    table
        .records
        .iter()
        .enumerate()
        .filter(|(_, rec)| filters.matches(rec))
        .map(|(i, _)| i)
        .collect()
}
