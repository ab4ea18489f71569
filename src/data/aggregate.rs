use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::model::{Column, NumericColumn, RepositoryRecord, RepositoryTable};

// ---------------------------------------------------------------------------
// Aggregate rows
// ---------------------------------------------------------------------------

/// Total stars for one (language, repository) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageRepositoryStars {
    pub language: String,
    pub repositories: String,
    pub stars_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageCount {
    pub language: String,
    pub repository_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageContributors {
    pub language: String,
    pub contributors: u64,
}

/// Total stars of the repositories created in one calendar month.
/// `created_at` is the first day of that month and is written as `YYYY-MM`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyStars {
    #[serde(with = "year_month")]
    pub created_at: NaiveDate,
    pub stars_count: u64,
}

/// One point of the stars-vs-forks bubble chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BubblePoint {
    pub stars_count: Option<u64>,
    pub forks_count: Option<u64>,
    pub contributors: u64,
    pub language: String,
}

/// One leaf of the language → repository treemap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreemapRow {
    pub language: String,
    pub repositories: String,
    pub stars_count: Option<u64>,
}

mod year_month {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&date.format("%Y-%m"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDate, D::Error> {
        let text = String::deserialize(d)?;
        NaiveDate::parse_from_str(&format!("{text}-01"), "%Y-%m-%d").map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Groupings
// ---------------------------------------------------------------------------

/// Sum of `stars_count` per (language, repository), ordered by key.
/// Missing star counts contribute nothing. Sums saturate at `u64::MAX`.
pub fn stars_by_language_repository<'a>(
    rows: impl IntoIterator<Item = &'a RepositoryRecord>,
) -> Vec<LanguageRepositoryStars> {
    let mut groups: BTreeMap<(&str, &str), u64> = BTreeMap::new();
    for rec in rows {
        let total = groups
            .entry((rec.language.as_str(), rec.repositories.as_str()))
            .or_default();
        *total = total.saturating_add(rec.stars_count.unwrap_or(0));
    }
    groups
        .into_iter()
        .map(|((language, repositories), stars_count)| LanguageRepositoryStars {
            language: language.to_string(),
            repositories: repositories.to_string(),
            stars_count,
        })
        .collect()
}

/// Number of rows per language.
pub fn language_distribution<'a>(rows: impl IntoIterator<Item = &'a RepositoryRecord>) -> Vec<LanguageCount> {
    let mut groups: BTreeMap<&str, u64> = BTreeMap::new();
    for rec in rows {
        let count = groups.entry(rec.language.as_str()).or_default();
        *count = count.saturating_add(1);
    }
    groups
        .into_iter()
        .map(|(language, repository_count)| LanguageCount {
            language: language.to_string(),
            repository_count,
        })
        .collect()
}

pub fn contributors_by_language<'a>(
    rows: impl IntoIterator<Item = &'a RepositoryRecord>,
) -> Vec<LanguageContributors> {
    let mut groups: BTreeMap<&str, u64> = BTreeMap::new();
    for rec in rows {
        let total = groups.entry(rec.language.as_str()).or_default();
        *total = total.saturating_add(rec.contributors);
    }
    groups
        .into_iter()
        .map(|(language, contributors)| LanguageContributors {
            language: language.to_string(),
            contributors,
        })
        .collect()
}

/// Sum of `stars_count` per creation month. Rows without a timestamp are
/// left out.
pub fn stars_over_time<'a>(rows: impl IntoIterator<Item = &'a RepositoryRecord>) -> Vec<MonthlyStars> {
    let mut groups: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for rec in rows {
        let Some(ts) = rec.created_at else {
            continue;
        };
        let Some(month) = NaiveDate::from_ymd_opt(ts.year(), ts.month(), 1) else {
            continue;
        };
        let total = groups.entry(month).or_default();
        *total = total.saturating_add(rec.stars_count.unwrap_or(0));
    }
    groups
        .into_iter()
        .map(|(created_at, stars_count)| MonthlyStars {
            created_at,
            stars_count,
        })
        .collect()
}

pub fn bubble_points<'a>(rows: impl IntoIterator<Item = &'a RepositoryRecord>) -> Vec<BubblePoint> {
    rows.into_iter()
        .map(|rec| BubblePoint {
            stars_count: rec.stars_count,
            forks_count: rec.forks_count,
            contributors: rec.contributors,
            language: rec.language.clone(),
        })
        .collect()
}

pub fn treemap_rows<'a>(rows: impl IntoIterator<Item = &'a RepositoryRecord>) -> Vec<TreemapRow> {
    rows.into_iter()
        .map(|rec| TreemapRow {
            language: rec.language.clone(),
            repositories: rec.repositories.clone(),
            stars_count: rec.stars_count,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Correlation
// ---------------------------------------------------------------------------

/// Pairwise Pearson correlation. `None` marks an undefined coefficient.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub columns: Vec<NumericColumn>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.values.get(row).and_then(|r| r.get(col)).copied().flatten()
    }
}

/// Correlate `columns` over `rows`, using for each pair only the rows where
/// both values are present.
///
/// A coefficient is undefined with fewer than two paired observations or
/// when either side has zero variance. The diagonal is exactly 1.0 for every
/// column with nonzero variance.
pub fn correlation_matrix<'a>(
    rows: impl IntoIterator<Item = &'a RepositoryRecord>,
    columns: &[NumericColumn],
) -> CorrelationMatrix {
    let samples: Vec<Vec<Option<f64>>> = rows
        .into_iter()
        .map(|rec| columns.iter().map(|c| c.value(rec)).collect())
        .collect();

    let n = columns.len();
    let mut values = vec![vec![None; n]; n];
    for i in 0..n {
        for j in i..n {
            let pairs: Vec<(f64, f64)> = samples
                .iter()
                .filter_map(|row| Some((row[i]?, row[j]?)))
                .collect();
            let mut r = pearson(&pairs);
            if i == j {
                r = r.map(|_| 1.0);
            }
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    CorrelationMatrix {
        columns: columns.to_vec(),
        values,
    }
}

fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for &(x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    let denom = (sxx * syy).sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return None;
    }
    Some((sxy / denom).clamp(-1.0, 1.0))
}

// ---------------------------------------------------------------------------
// Dashboard – every aggregate for one filter selection
// ---------------------------------------------------------------------------

/// Which table the language distribution counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionSource {
    /// Every loaded row, ignoring the filters.
    #[default]
    Loaded,
    /// Only the rows passing the filters.
    Filtered,
}

/// All chart inputs computed from a table and its filtered indices.
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub filtered_rows: usize,
    pub stars_by_language_repository: Vec<LanguageRepositoryStars>,
    pub language_distribution: Vec<LanguageCount>,
    pub contributors_by_language: Vec<LanguageContributors>,
    pub correlation: CorrelationMatrix,
    pub bubble_points: Vec<BubblePoint>,
    pub treemap_rows: Vec<TreemapRow>,
    /// `None` when the table has no `created_at` column.
    pub stars_over_time: Option<Vec<MonthlyStars>>,
}

impl Dashboard {
    pub fn compute(table: &RepositoryTable, indices: &[usize], source: DistributionSource) -> Self {
        let filtered: Vec<&RepositoryRecord> = indices.iter().filter_map(|&i| table.records.get(i)).collect();

        let language_distribution = match source {
            DistributionSource::Loaded => language_distribution(&table.records),
            DistributionSource::Filtered => language_distribution(filtered.iter().copied()),
        };

        let numeric: Vec<NumericColumn> = NumericColumn::ALL
            .into_iter()
            .filter(|c| table.has_column(c.column()))
            .collect();

        let stars_over_time = table
            .has_column(Column::CreatedAt)
            .then(|| stars_over_time(filtered.iter().copied()));

        Dashboard {
            filtered_rows: filtered.len(),
            stars_by_language_repository: stars_by_language_repository(filtered.iter().copied()),
            language_distribution,
            contributors_by_language: contributors_by_language(filtered.iter().copied()),
            correlation: correlation_matrix(filtered.iter().copied(), &numeric),
            bubble_points: bubble_points(filtered.iter().copied()),
            treemap_rows: treemap_rows(filtered.iter().copied()),
            stars_over_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(lang: &str, repo: &str, contributors: u64, stars: u64, forks: u64) -> RepositoryRecord {
        let mut r = RepositoryRecord::new(lang, repo, contributors).with_stars(stars);
        r.forks_count = Some(forks);
        r
    }

    #[test]
    fn test_stars_grouping_sums_duplicates() {
        let rows = vec![
            rec("py", "repoA", 1, 100, 0),
            rec("go", "repoB", 1, 50, 0),
            rec("py", "repoA", 1, 25, 0),
            RepositoryRecord::new("py", "repoC", 1),
        ];
        let grouped = stars_by_language_repository(&rows);
        assert_eq!(
            grouped,
            vec![
                LanguageRepositoryStars { language: "go".into(), repositories: "repoB".into(), stars_count: 50 },
                LanguageRepositoryStars { language: "py".into(), repositories: "repoA".into(), stars_count: 125 },
                LanguageRepositoryStars { language: "py".into(), repositories: "repoC".into(), stars_count: 0 },
            ]
        );
    }

    #[test]
    fn test_group_sums_saturate_instead_of_overflowing() {
        let rows = vec![
            rec("py", "a", u64::MAX - 1, u64::MAX, 0),
            rec("py", "a", 5, 1, 0),
        ];
        let stars = stars_by_language_repository(&rows);
        assert_eq!(stars.len(), 1);
        assert_eq!(stars[0].stars_count, u64::MAX);

        let contributors = contributors_by_language(&rows);
        assert_eq!(contributors[0].contributors, u64::MAX);
    }

    #[test]
    fn test_language_counts_and_contributors() {
        let rows = vec![rec("py", "a", 3, 0, 0), rec("go", "b", 4, 0, 0), rec("py", "c", 5, 0, 0)];
        let counts = language_distribution(&rows);
        assert_eq!(counts[0], LanguageCount { language: "go".into(), repository_count: 1 });
        assert_eq!(counts[1], LanguageCount { language: "py".into(), repository_count: 2 });

        let contributors = contributors_by_language(&rows);
        assert_eq!(contributors[1], LanguageContributors { language: "py".into(), contributors: 8 });
    }

    #[test]
    fn test_correlation_is_symmetric_with_unit_diagonal() {
        let rows = vec![
            rec("py", "a", 1, 10, 3),
            rec("py", "b", 4, 20, 1),
            rec("go", "c", 2, 35, 8),
            rec("go", "d", 7, 5, 2),
        ];
        let columns = [NumericColumn::StarsCount, NumericColumn::ForksCount, NumericColumn::Contributors];
        let m = correlation_matrix(&rows, &columns);
        for i in 0..3 {
            assert_eq!(m.get(i, i), Some(1.0));
            for j in 0..3 {
                assert_eq!(m.get(i, j), m.get(j, i));
                let v = m.get(i, j).unwrap();
                assert!((-1.0..=1.0).contains(&v));
            }
        }
    }

    #[test]
    fn test_correlation_perfect_and_undefined() {
        let rows = vec![rec("py", "a", 5, 1, 2), rec("py", "b", 5, 2, 4), rec("py", "c", 5, 3, 6)];
        let columns = [NumericColumn::StarsCount, NumericColumn::ForksCount, NumericColumn::Contributors];
        let m = correlation_matrix(&rows, &columns);
        assert!((m.get(0, 1).unwrap() - 1.0).abs() < 1e-12);
        // contributors is constant: zero variance leaves its row undefined
        assert_eq!(m.get(2, 2), None);
        assert_eq!(m.get(0, 2), None);
    }

    #[test]
    fn test_correlation_uses_pairwise_complete_rows() {
        let mut rows = vec![rec("py", "a", 1, 1, 1), rec("py", "b", 2, 2, 2), rec("py", "c", 3, 3, 3)];
        rows.push(RepositoryRecord::new("py", "d", 100).with_stars(0));
        let columns = [NumericColumn::StarsCount, NumericColumn::ForksCount];
        let m = correlation_matrix(&rows, &columns);
        // the fourth row has no forks and is ignored for the pair
        assert!((m.get(0, 1).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_stars_over_time_groups_by_month() {
        let day = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(12, 0, 0).unwrap();
        let rows = vec![
            RepositoryRecord::new("py", "a", 1).with_stars(10).with_created_at(day(2021, 3, 2)),
            RepositoryRecord::new("py", "b", 1).with_stars(5).with_created_at(day(2021, 3, 30)),
            RepositoryRecord::new("go", "c", 1).with_stars(1).with_created_at(day(2020, 12, 31)),
            RepositoryRecord::new("go", "d", 1).with_stars(99),
        ];
        let series = stars_over_time(&rows);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].created_at, NaiveDate::from_ymd_opt(2020, 12, 1).unwrap());
        assert_eq!(series[0].stars_count, 1);
        assert_eq!(series[1].stars_count, 15);
    }

    #[test]
    fn test_dashboard_distribution_source() {
        let rows = vec![rec("py", "a", 1, 10, 1), rec("go", "b", 1, 20, 1)];
        let table = RepositoryTable::from_records(rows, Column::REQUIRED.into_iter().chain([Column::StarsCount]).collect());

        let loaded = Dashboard::compute(&table, &[0], DistributionSource::Loaded);
        assert_eq!(loaded.language_distribution.len(), 2);
        assert_eq!(loaded.stars_by_language_repository.len(), 1);
        assert_eq!(loaded.stars_over_time, None);
        assert_eq!(loaded.correlation.columns, vec![NumericColumn::StarsCount, NumericColumn::Contributors]);

        let filtered = Dashboard::compute(&table, &[0], DistributionSource::Filtered);
        assert_eq!(filtered.language_distribution, vec![LanguageCount { language: "py".into(), repository_count: 1 }]);
    }
}
