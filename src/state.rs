use std::path::Path;

use crate::color::ColorMap;
use crate::config::DashboardConfig;
use crate::data::aggregate::Dashboard;
use crate::data::filter::{FilterState, filtered_indices};
use crate::data::loader::{self, LoadError};
use crate::data::model::RepositoryTable;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: DashboardConfig,

    /// Loaded table (None until a load succeeds).
    pub table: Option<RepositoryTable>,

    /// File name of the loaded table, shown in the top bar.
    pub source_name: Option<String>,

    /// Current filter selections.
    pub filters: FilterState,

    /// Indices of records passing the current filters (cached).
    pub visible_indices: Vec<usize>,

    /// Aggregates for `visible_indices` (cached).
    pub dashboard: Option<Dashboard>,

    /// Language colours shared by every chart.
    pub color_map: Option<ColorMap>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            config,
            table: None,
            source_name: None,
            filters: FilterState::default(),
            visible_indices: Vec::new(),
            dashboard: None,
            color_map: None,
            status_message: None,
        }
    }

    /// Load the configured default file.
    pub fn load_default(&mut self) {
        let path = self.config.data_path.clone();
        self.load_path(&path);
    }

    pub fn load_path(&mut self, path: &Path) {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.apply_load(name, loader::load_path(path));
    }

    /// Ingest the outcome of a load. A failure clears the previous table so
    /// no filters or charts are shown for it.
    pub fn apply_load(&mut self, source: String, result: Result<RepositoryTable, LoadError>) {
        match result {
            Ok(table) => {
                log::info!(
                    "Loaded {} repositories from {source} ({} languages)",
                    table.len(),
                    table.languages.len()
                );
                self.set_table(table);
                self.source_name = Some(source);
            }
            Err(e) => {
                log::error!("Failed to load {source}: {e}");
                self.table = None;
                self.source_name = None;
                self.visible_indices.clear();
                self.dashboard = None;
                self.color_map = None;
                self.status_message = Some(e.to_string());
            }
        }
    }

    /// Install a new table with default filters.
    pub fn set_table(&mut self, table: RepositoryTable) {
        self.filters = FilterState::defaults_for(&table);
        self.color_map = Some(ColorMap::new(&table.languages));
        self.table = Some(table);
        self.status_message = None;
        self.refresh();
    }

    /// Recompute `visible_indices` and the dashboard after a filter change.
    pub fn refresh(&mut self) {
        let Some(table) = &self.table else {
            return;
        };
        self.visible_indices = filtered_indices(table, &self.filters);
        self.dashboard = Some(Dashboard::compute(
            table,
            &self.visible_indices,
            self.config.language_distribution,
        ));
    }

    /// Restore the default selections for the loaded table.
    pub fn reset_filters(&mut self) {
        if let Some(table) = &self.table {
            self.filters = FilterState::defaults_for(table);
            self.refresh();
        }
    }

    pub fn toggle_language(&mut self, language: &str) {
        if !self.filters.languages.remove(language) {
            self.filters.languages.insert(language.to_string());
        }
        self.refresh();
    }

    pub fn toggle_repository(&mut self, repository: &str) {
        if !self.filters.repositories.remove(repository) {
            self.filters.repositories.insert(repository.to_string());
        }
        self.refresh();
    }

    pub fn toggle_contributors(&mut self, contributors: u64) {
        if !self.filters.contributors.remove(&contributors) {
            self.filters.contributors.insert(contributors);
        }
        self.refresh();
    }
}
