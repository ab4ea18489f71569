use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use repo_dashboard::data::aggregate::{
    Dashboard, DistributionSource, LanguageContributors, LanguageCount, LanguageRepositoryStars, MonthlyStars,
};
use repo_dashboard::data::filter::{FilterState, StarsRange, filtered_indices};
use repo_dashboard::data::loader::{self, LoadError};
use repo_dashboard::data::model::RepositoryTable;
use repo_dashboard::export::{self, ExportKind};
use serde::de::DeserializeOwned;
use tempfile::TempDir;

const DATASET: &[u8] = b"repositories,stars_count,forks_count,issues_count,pull_requests,contributors,language,created_at\n\
octo/alpha,100,10,4,2,3,Python,2020-01-15\n\
acme/beta,50,5,1,0,2,Go,2020-01-20\n\
acme/gamma,7,1,0,0,1,Python,2020-03-02\n\
caf\xe9/delta,250,40,12,9,8,Rust,2021-06-30 14:00:00\n\
broken/row,1,2,3,4,5,Go,2020-01-01,extra\n\
no/contributors,9,1,1,1,,Go,2020-02-02\n\
acme/epsilon,,3,2,1,4,Go,\n";

fn write_dataset(bytes: &[u8]) -> (TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("github_dataset.csv");
    fs::write(&path, bytes).expect("write dataset");
    (dir, path)
}

fn load() -> (TempDir, RepositoryTable) {
    let (dir, path) = write_dataset(DATASET);
    let table = loader::load_path(&path).expect("load dataset");
    (dir, table)
}

fn read_csv<T: DeserializeOwned>(path: &Path) -> Vec<T> {
    let mut rdr = csv::Reader::from_path(path).expect("open export");
    rdr.deserialize().collect::<Result<_, _>>().expect("parse export")
}

#[test]
fn load_skips_malformed_and_incomplete_rows() {
    let (_tmp, table) = load();
    let names: Vec<&str> = table.records.iter().map(|r| r.repositories.as_str()).collect();
    assert_eq!(names, ["octo/alpha", "acme/beta", "acme/gamma", "café/delta", "acme/epsilon"]);
    assert_eq!(table.max_stars, Some(250));
    assert_eq!(
        table.date_range,
        Some((NaiveDate::from_ymd_opt(2020, 1, 15).unwrap(), NaiveDate::from_ymd_opt(2021, 6, 30).unwrap()))
    );
}

#[test]
fn missing_required_column_is_reported() {
    let (_tmp, path) = write_dataset(b"repositories,language,stars_count\nx,Go,1\n");
    match loader::load_path(&path) {
        Err(LoadError::MissingColumns(cols)) => assert_eq!(cols, ["contributors"]),
        other => panic!("expected missing columns, got {other:?}"),
    }
}

#[test]
fn filtered_view_is_ordered_subset() {
    let (_tmp, table) = load();
    let mut filters = FilterState::defaults_for(&table);
    filters.languages.insert("Go".into());
    filters.languages.insert("Rust".into());

    let idx = filtered_indices(&table, &filters);
    assert!(idx.windows(2).all(|w| w[0] < w[1]));
    assert!(idx.iter().all(|&i| i < table.len()));
    // acme/epsilon has no stars and fails the default stars range
    assert_eq!(idx, vec![1, 3]);
}

#[test]
fn empty_selection_and_full_stars_range_are_identity() {
    let (_tmp, table) = load();
    let defaults = FilterState::defaults_for(&table);
    let baseline = filtered_indices(&table, &defaults);

    let mut widened = defaults.clone();
    widened.stars = Some(StarsRange { min: 0, max: table.max_stars.unwrap() });
    widened.languages.clear();
    assert_eq!(filtered_indices(&table, &widened), baseline);

    let with_stars: Vec<usize> = (0..table.len())
        .filter(|&i| table.records[i].stars_count.is_some())
        .collect();
    assert_eq!(baseline, with_stars);
}

#[test]
fn grouped_stars_sum_matches_filtered_total() {
    let (_tmp, table) = load();
    let mut filters = FilterState::defaults_for(&table);
    filters.stars = Some(StarsRange { min: 10, max: 300 });
    let idx = filtered_indices(&table, &filters);
    let dash = Dashboard::compute(&table, &idx, DistributionSource::Loaded);

    let grouped: u64 = dash.stars_by_language_repository.iter().map(|g| g.stars_count).sum();
    let direct: u64 = idx.iter().filter_map(|&i| table.records[i].stars_count).sum();
    assert_eq!(grouped, direct);
    assert_eq!(grouped, 400);
}

#[test]
fn language_filter_example() {
    let (_tmp, path) = write_dataset(b"language,repositories,stars_count,contributors\npy,repoA,100,1\ngo,repoB,50,1\n");
    let table = loader::load_path(&path).unwrap();
    let mut filters = FilterState::defaults_for(&table);
    filters.languages.insert("py".into());

    let idx = filtered_indices(&table, &filters);
    assert_eq!(idx, vec![0]);
    let dash = Dashboard::compute(&table, &idx, DistributionSource::Loaded);
    assert_eq!(
        dash.stars_by_language_repository,
        vec![LanguageRepositoryStars { language: "py".into(), repositories: "repoA".into(), stars_count: 100 }]
    );
}

#[test]
fn export_round_trip() {
    let (tmp, table) = load();
    let idx = filtered_indices(&table, &FilterState::defaults_for(&table));
    let dash = Dashboard::compute(&table, &idx, DistributionSource::Loaded);

    let out = tmp.path().join("exports");
    let written = export::write_all(&out, &dash).expect("write exports");
    assert_eq!(written.len(), ExportKind::ALL.len());

    let stars: Vec<LanguageRepositoryStars> = read_csv(&out.join(ExportKind::StarsByLanguageRepository.file_name()));
    assert_eq!(stars, dash.stars_by_language_repository);

    let langs: Vec<LanguageCount> = read_csv(&out.join(ExportKind::LanguageDistribution.file_name()));
    assert_eq!(langs, dash.language_distribution);
    // the distribution counts the loaded table, including acme/epsilon
    assert_eq!(langs.iter().find(|l| l.language == "Go").unwrap().repository_count, 2);

    let contributors: Vec<LanguageContributors> = read_csv(&out.join(ExportKind::ContributorsByLanguage.file_name()));
    assert_eq!(contributors, dash.contributors_by_language);

    let monthly: Vec<MonthlyStars> = read_csv(&out.join(ExportKind::StarsOverTime.file_name()));
    assert_eq!(monthly, dash.stars_over_time.clone().unwrap());
    assert_eq!(monthly[0].stars_count, 150);

    let raw = fs::read_to_string(out.join(ExportKind::StarsOverTime.file_name())).unwrap();
    assert!(raw.starts_with("created_at,stars_count\n2020-01,150\n"), "{raw}");
}

#[test]
fn exports_without_dates_skip_time_series() {
    let (tmp, path) =
        write_dataset(b"language,repositories,contributors,stars_count,forks_count\npy,a,1,3,1\ngo,b,2,5,4\n");
    let table = loader::load_path(&path).unwrap();
    let idx = filtered_indices(&table, &FilterState::defaults_for(&table));
    let dash = Dashboard::compute(&table, &idx, DistributionSource::Filtered);

    let out = tmp.path().join("exports");
    let written = export::write_all(&out, &dash).unwrap();
    assert_eq!(written.len(), ExportKind::ALL.len() - 1);
    assert!(!out.join(ExportKind::StarsOverTime.file_name()).exists());
    assert!(out.join(ExportKind::Correlation.file_name()).exists());
}

#[test]
fn huge_star_counts_in_one_group_saturate() {
    let table =
        loader::load_bytes(b"language,repositories,contributors,stars_count\npy,a,1,18446744073709551615\npy,a,1,1\n")
            .expect("load dataset");
    let idx: Vec<usize> = (0..table.len()).collect();
    let dash = Dashboard::compute(&table, &idx, DistributionSource::Filtered);
    assert_eq!(
        dash.stars_by_language_repository,
        vec![LanguageRepositoryStars { language: "py".into(), repositories: "a".into(), stars_count: u64::MAX }]
    );
    assert_eq!(dash.contributors_by_language[0].contributors, 2);
}
