use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use eframe::egui;

use repo_dashboard::app::DashboardApp;
use repo_dashboard::config::DashboardConfig;
use repo_dashboard::data::aggregate::Dashboard;
use repo_dashboard::data::filter::{FilterState, filtered_indices};
use repo_dashboard::data::loader;
use repo_dashboard::export;

#[derive(Parser)]
#[command(
    name = "repo-dashboard",
    about = "Interactive dashboard over a CSV of GitHub repositories",
    after_help = "\
EXAMPLES:
    repo-dashboard                                 Open the configured default dataset
    repo-dashboard --data github_dataset.csv       Open a specific file
    repo-dashboard --export-dir out/               Write every chart's CSV and exit"
)]
struct Args {
    /// Dataset loaded at start-up (overrides `data_path` from the config)
    #[arg(short, long, value_name = "FILE")]
    data: Option<PathBuf>,

    /// JSON config file (defaults to ./repo-dashboard.json when present)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Run without UI: write all chart exports into DIR using default filters
    #[arg(long, value_name = "DIR")]
    export_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = DashboardConfig::resolve(args.config.as_deref())?;
    if let Some(data) = args.data {
        config.data_path = data;
    }

    if let Some(dir) = args.export_dir {
        return export_headless(&config, &dir);
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 900.0])
            .with_min_inner_size([640.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "GitHub Repository Dashboard",
        options,
        Box::new(move |_cc| Ok(Box::new(DashboardApp::new(config)))),
    )
    .map_err(|e| anyhow::anyhow!("running UI: {e}"))
}

fn export_headless(config: &DashboardConfig, dir: &std::path::Path) -> Result<()> {
    let table = loader::load_path(&config.data_path)
        .with_context(|| format!("loading {}", config.data_path.display()))?;
    let filters = FilterState::defaults_for(&table);
    let indices = filtered_indices(&table, &filters);
    let dashboard = Dashboard::compute(&table, &indices, config.language_distribution);

    let written = export::write_all(dir, &dashboard)?;
    println!("Wrote {} files to {}", written.len(), dir.display());
    Ok(())
}
