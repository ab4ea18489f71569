//! CSV exports of the dashboard aggregates.
//!
//! Every chart has exactly one export with a fixed file name. The same bytes
//! back the "Download CSV" buttons and the headless `--export-dir` mode.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::data::aggregate::Dashboard;

pub const CSV_CONTENT_TYPE: &str = "text/csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportKind {
    StarsByLanguageRepository,
    LanguageDistribution,
    Correlation,
    BubbleChart,
    Treemap,
    ContributorsByLanguage,
    StarsOverTime,
}

impl ExportKind {
    pub const ALL: [ExportKind; 7] = [
        ExportKind::StarsByLanguageRepository,
        ExportKind::LanguageDistribution,
        ExportKind::Correlation,
        ExportKind::BubbleChart,
        ExportKind::Treemap,
        ExportKind::ContributorsByLanguage,
        ExportKind::StarsOverTime,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            ExportKind::StarsByLanguageRepository => "stars_count_by_language_repository.csv",
            ExportKind::LanguageDistribution => "language_distribution.csv",
            ExportKind::Correlation => "correlation_data.csv",
            ExportKind::BubbleChart => "bubble_chart_data.csv",
            ExportKind::Treemap => "treemap_data.csv",
            ExportKind::ContributorsByLanguage => "contributors_by_language.csv",
            ExportKind::StarsOverTime => "stars_over_time.csv",
        }
    }

    pub fn content_type(self) -> &'static str {
        CSV_CONTENT_TYPE
    }

    /// Button caption in the UI.
    pub fn label(self) -> &'static str {
        match self {
            ExportKind::StarsByLanguageRepository => "Download Stars Count Data",
            ExportKind::LanguageDistribution => "Download Language Distribution Data",
            ExportKind::Correlation => "Download Correlation Data",
            ExportKind::BubbleChart => "Download Bubble Chart Data",
            ExportKind::Treemap => "Download Treemap Data",
            ExportKind::ContributorsByLanguage => "Download Contributors Data",
            ExportKind::StarsOverTime => "Download Stars Over Time Data",
        }
    }
}

/// Serialise one aggregate. Returns `None` when the dashboard has no data
/// for it (stars over time without a `created_at` column).
pub fn to_csv(kind: ExportKind, dashboard: &Dashboard) -> Result<Option<Vec<u8>>> {
    let bytes = match kind {
        ExportKind::StarsByLanguageRepository => rows_to_csv(
            &["language", "repositories", "stars_count"],
            &dashboard.stars_by_language_repository,
        )?,
        ExportKind::LanguageDistribution => {
            rows_to_csv(&["language", "repository_count"], &dashboard.language_distribution)?
        }
        ExportKind::Correlation => correlation_to_csv(dashboard)?,
        ExportKind::BubbleChart => rows_to_csv(
            &["stars_count", "forks_count", "contributors", "language"],
            &dashboard.bubble_points,
        )?,
        ExportKind::Treemap => rows_to_csv(
            &["language", "repositories", "stars_count"],
            &dashboard.treemap_rows,
        )?,
        ExportKind::ContributorsByLanguage => {
            rows_to_csv(&["language", "contributors"], &dashboard.contributors_by_language)?
        }
        ExportKind::StarsOverTime => match &dashboard.stars_over_time {
            Some(series) => rows_to_csv(&["created_at", "stars_count"], series)?,
            None => return Ok(None),
        },
    };
    Ok(Some(bytes))
}

/// Write every available export into `dir`, returning the written paths.
pub fn write_all(dir: &Path, dashboard: &Dashboard) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let mut written = Vec::new();
    for kind in ExportKind::ALL {
        let Some(bytes) = to_csv(kind, dashboard)? else {
            log::info!("Skipping {}: no creation dates in dataset", kind.file_name());
            continue;
        };
        let path = dir.join(kind.file_name());
        std::fs::write(&path, bytes).with_context(|| format!("writing {}", path.display()))?;
        log::info!("Wrote {}", path.display());
        written.push(path);
    }
    Ok(written)
}

// The header is written explicitly so that empty aggregates still carry it.
fn rows_to_csv<T: Serialize>(header: &[&str], rows: &[T]) -> Result<Vec<u8>> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    wtr.write_record(header)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    finish(wtr)
}

/// Square matrix with an unnamed index column; undefined cells are empty.
fn correlation_to_csv(dashboard: &Dashboard) -> Result<Vec<u8>> {
    let m = &dashboard.correlation;
    let mut wtr = csv::Writer::from_writer(Vec::new());

    let mut header = vec![String::new()];
    header.extend(m.columns.iter().map(|c| c.name().to_string()));
    wtr.write_record(&header)?;

    for (i, col) in m.columns.iter().enumerate() {
        let mut record = vec![col.name().to_string()];
        record.extend((0..m.columns.len()).map(|j| m.get(i, j).map(|v| v.to_string()).unwrap_or_default()));
        wtr.write_record(&record)?;
    }
    finish(wtr)
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    wtr.into_inner()
        .map_err(|e| e.into_error())
        .context("flushing CSV buffer")
}
