use std::collections::BTreeMap;
use std::f64::consts::TAU;

use chrono::{Datelike, NaiveDate};
use eframe::egui::{self, Align2, Color32, FontId, Rect, RichText, ScrollArea, Sense, Stroke, Ui, Vec2};
use egui_plot::{Bar, BarChart, Legend, Line, Plot, PlotPoints, Points, Polygon};

use crate::color::{ColorMap, diverging};
use crate::data::aggregate::{Dashboard, LanguageRepositoryStars, MonthlyStars, TreemapRow};
use crate::data::model::RepositoryTable;
use crate::export::{self, ExportKind};
use crate::state::AppState;

const CHART_HEIGHT: f32 = 320.0;
const PREVIEW_ROWS: usize = 200;
/// Largest bubble radius in points.
const BUBBLE_MAX_RADIUS: f32 = 30.0;

// ---------------------------------------------------------------------------
// Central panel
// ---------------------------------------------------------------------------

/// Render every chart of the dashboard with its CSV download button.
pub fn dashboard(ui: &mut Ui, state: &mut AppState) {
    let (Some(table), Some(dash)) = (&state.table, &state.dashboard) else {
        ui.centered_and_justified(|ui: &mut Ui| match &state.status_message {
            Some(msg) => ui.heading(RichText::new(msg).color(Color32::RED)),
            None => ui.heading("Open a file to view the dashboard  (File → Open…)"),
        });
        return;
    };
    let fallback;
    let colors = match state.color_map.as_ref() {
        Some(cm) => cm,
        None => {
            fallback = ColorMap::new(&table.languages);
            &fallback
        }
    };
    let mut failure: Option<String> = None;

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            data_preview(ui, table, &state.visible_indices, dash);
            ui.separator();

            ui.columns(2, |cols| {
                cols[0].heading("Stars Count by Language and Repository");
                stars_bar_chart(&mut cols[0], &dash.stars_by_language_repository, colors);
                download_button(&mut cols[0], dash, ExportKind::StarsByLanguageRepository, &mut failure);

                cols[1].heading("Distribution of Programming Languages (by Repositories)");
                language_pie(&mut cols[1], dash, colors);
                download_button(&mut cols[1], dash, ExportKind::LanguageDistribution, &mut failure);
            });
            ui.separator();

            ui.heading("Correlation Heatmap");
            correlation_heatmap(ui, dash);
            download_button(ui, dash, ExportKind::Correlation, &mut failure);
            ui.separator();

            ui.heading("Stars vs Forks with Contributors as Bubble Size");
            bubble_chart(ui, dash, colors);
            download_button(ui, dash, ExportKind::BubbleChart, &mut failure);
            ui.separator();

            ui.heading("Treemap of Stars by Language and Repository");
            treemap(ui, &dash.treemap_rows, colors);
            download_button(ui, dash, ExportKind::Treemap, &mut failure);
            ui.separator();

            ui.heading("Contributors per Language");
            contributors_chart(ui, dash, colors);
            download_button(ui, dash, ExportKind::ContributorsByLanguage, &mut failure);

            if let Some(series) = &dash.stars_over_time {
                ui.separator();
                ui.heading("Stars Over Time");
                stars_over_time_chart(ui, series);
                download_button(ui, dash, ExportKind::StarsOverTime, &mut failure);
            }
        });

    if let Some(msg) = failure {
        state.status_message = Some(msg);
    }
}

// ---------------------------------------------------------------------------
// Download
// ---------------------------------------------------------------------------

fn download_button(ui: &mut Ui, dash: &Dashboard, kind: ExportKind, failure: &mut Option<String>) {
    let clicked = ui
        .button(kind.label())
        .on_hover_text(format!("{} ({})", kind.file_name(), kind.content_type()))
        .clicked();
    if !clicked {
        return;
    }

    let Some(path) = rfd::FileDialog::new()
        .set_file_name(kind.file_name())
        .add_filter("CSV", &["csv"])
        .save_file()
    else {
        return;
    };

    let result = export::to_csv(kind, dash).and_then(|bytes| {
        let bytes = bytes.unwrap_or_default();
        std::fs::write(&path, bytes).map_err(anyhow::Error::from)
    });
    match result {
        Ok(()) => log::info!("Saved {}", path.display()),
        Err(e) => {
            log::error!("Failed to save {}: {e:#}", path.display());
            *failure = Some(format!("Error: {e:#}"));
        }
    }
}

// ---------------------------------------------------------------------------
// Data preview
// ---------------------------------------------------------------------------

fn data_preview(ui: &mut Ui, table: &RepositoryTable, visible: &[usize], dash: &Dashboard) {
    egui::CollapsingHeader::new(format!("Filtered Data ({} rows)", visible.len()))
        .default_open(false)
        .show(ui, |ui: &mut Ui| {
            if let Some(note) = preview_note(visible.len(), "rows") {
                ui.weak(note);
            }
            ScrollArea::both().id_salt("filtered_rows").max_height(260.0).show(ui, |ui: &mut Ui| {
                egui::Grid::new("filtered_grid").striped(true).show(ui, |ui: &mut Ui| {
                    for header in [
                        "repositories",
                        "language",
                        "contributors",
                        "stars_count",
                        "forks_count",
                        "issues_count",
                        "pull_requests",
                        "created_at",
                    ] {
                        ui.strong(header);
                    }
                    ui.end_row();

                    let opt = |v: Option<u64>| v.map(|n| n.to_string()).unwrap_or_default();
                    for rec in visible.iter().take(PREVIEW_ROWS).filter_map(|&i| table.records.get(i)) {
                        ui.label(&rec.repositories);
                        ui.label(&rec.language);
                        ui.label(rec.contributors.to_string());
                        ui.label(opt(rec.stars_count));
                        ui.label(opt(rec.forks_count));
                        ui.label(opt(rec.issues_count));
                        ui.label(opt(rec.pull_requests));
                        ui.label(rec.created_at.map(|t| t.to_string()).unwrap_or_default());
                        ui.end_row();
                    }
                });
            });
        });

    egui::CollapsingHeader::new(format!(
        "Grouped Data ({} groups)",
        dash.stars_by_language_repository.len()
    ))
    .default_open(false)
    .show(ui, |ui: &mut Ui| {
        if let Some(note) = preview_note(dash.stars_by_language_repository.len(), "groups") {
            ui.weak(note);
        }
        ScrollArea::vertical().id_salt("grouped_rows").max_height(260.0).show(ui, |ui: &mut Ui| {
            egui::Grid::new("grouped_grid").striped(true).show(ui, |ui: &mut Ui| {
                ui.strong("language");
                ui.strong("repositories");
                ui.strong("stars_count");
                ui.end_row();
                for g in dash.stars_by_language_repository.iter().take(PREVIEW_ROWS) {
                    ui.label(&g.language);
                    ui.label(&g.repositories);
                    ui.label(g.stars_count.to_string());
                    ui.end_row();
                }
            });
        });
    });
}

/// Caption for a preview grid that only lists the first `PREVIEW_ROWS` entries.
fn preview_note(total: usize, unit: &str) -> Option<String> {
    (total > PREVIEW_ROWS).then(|| format!("Showing the first {PREVIEW_ROWS} of {total} {unit}"))
}

// ---------------------------------------------------------------------------
// Bar charts
// ---------------------------------------------------------------------------

/// One bar per (language, repository), coloured and grouped by language.
fn stars_bar_chart(ui: &mut Ui, groups: &[LanguageRepositoryStars], colors: &ColorMap) {
    let labels: Vec<String> = groups.iter().map(|g| g.repositories.clone()).collect();
    let mut charts: Vec<BarChart> = Vec::new();
    let mut start = 0;
    while start < groups.len() {
        let language = &groups[start].language;
        let end = groups[start..]
            .iter()
            .position(|g| &g.language != language)
            .map_or(groups.len(), |n| start + n);
        let bars: Vec<Bar> = (start..end)
            .map(|i| Bar::new(i as f64, groups[i].stars_count as f64).name(&groups[i].repositories))
            .collect();
        charts.push(
            BarChart::new(bars)
                .width(0.8)
                .color(colors.color_for(language))
                .name(language),
        );
        start = end;
    }

    Plot::new("stars_by_repository")
        .legend(Legend::default())
        .height(CHART_HEIGHT)
        .y_axis_label("stars_count")
        .x_axis_formatter(move |mark, _range| index_label(&labels, mark.value))
        .show(ui, |plot_ui| {
            for chart in charts {
                plot_ui.bar_chart(chart);
            }
        });
}

fn contributors_chart(ui: &mut Ui, dash: &Dashboard, colors: &ColorMap) {
    let labels: Vec<String> = dash
        .contributors_by_language
        .iter()
        .map(|g| g.language.clone())
        .collect();
    let bars: Vec<Bar> = dash
        .contributors_by_language
        .iter()
        .enumerate()
        .map(|(i, g)| {
            Bar::new(i as f64, g.contributors as f64)
                .name(&g.language)
                .fill(colors.color_for(&g.language))
        })
        .collect();

    Plot::new("contributors_by_language")
        .height(CHART_HEIGHT)
        .y_axis_label("contributors")
        .x_axis_formatter(move |mark, _range| index_label(&labels, mark.value))
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).width(0.7).name("Total Contributors per Language"));
        });
}

/// Axis label for integer positions only.
fn index_label(labels: &[String], value: f64) -> String {
    if value.fract() != 0.0 || value < 0.0 {
        return String::new();
    }
    labels.get(value as usize).cloned().unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Donut chart
// ---------------------------------------------------------------------------

fn language_pie(ui: &mut Ui, dash: &Dashboard, colors: &ColorMap) {
    let total = dash
        .language_distribution
        .iter()
        .map(|g| g.repository_count)
        .fold(0, u64::saturating_add);
    if total == 0 {
        ui.label("No repositories to show.");
        return;
    }

    let slices: Vec<Polygon> = {
        let mut angle = 0.0;
        dash.language_distribution
            .iter()
            .map(|g| {
                let share = g.repository_count as f64 / total as f64;
                let sweep = share * TAU;
                let poly = Polygon::new(donut_segment(angle, angle + sweep))
                    .fill_color(colors.color_for(&g.language))
                    .stroke(Stroke::new(1.0, Color32::WHITE))
                    .name(format!("{} ({:.1}%)", g.language, share * 100.0));
                angle += sweep;
                poly
            })
            .collect()
    };

    Plot::new("language_distribution")
        .legend(Legend::default())
        .height(CHART_HEIGHT)
        .data_aspect(1.0)
        .show_axes(false)
        .show_grid(false)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            for slice in slices {
                plot_ui.polygon(slice);
            }
        });
}

/// Ring segment between radius 0.5 and 1.0, starting at 12 o'clock and
/// running clockwise.
fn donut_segment(from: f64, to: f64) -> PlotPoints<'static> {
    const INNER: f64 = 0.5;
    let steps = (((to - from) / TAU) * 128.0).ceil().max(2.0) as usize;
    let point = |a: f64, r: f64| [r * a.sin(), r * a.cos()];

    let outer = (0..=steps).map(|i| from + (to - from) * i as f64 / steps as f64);
    let inner = (0..=steps).rev().map(|i| from + (to - from) * i as f64 / steps as f64);
    outer
        .map(|a| point(a, 1.0))
        .chain(inner.map(|a| point(a, INNER)))
        .collect()
}

// ---------------------------------------------------------------------------
// Heatmap
// ---------------------------------------------------------------------------

fn correlation_heatmap(ui: &mut Ui, dash: &Dashboard) {
    let m = &dash.correlation;
    let n = m.columns.len();
    if n == 0 {
        ui.label("No numeric columns to correlate.");
        return;
    }

    let label_w = 110.0;
    let cell = 72.0;
    let size = Vec2::new(label_w + cell * n as f32, label_w * 0.3 + cell * n as f32);
    let (rect, _) = ui.allocate_exact_size(size, Sense::hover());
    let painter = ui.painter_at(rect);
    let font = FontId::proportional(12.0);
    let text_color = ui.visuals().text_color();
    let origin = rect.min + Vec2::new(label_w, label_w * 0.3);

    for (j, col) in m.columns.iter().enumerate() {
        let pos = origin + Vec2::new(cell * (j as f32 + 0.5), -8.0);
        painter.text(pos, Align2::CENTER_BOTTOM, col.name(), font.clone(), text_color);
    }

    for (i, row_col) in m.columns.iter().enumerate() {
        let y = origin.y + cell * i as f32;
        painter.text(
            egui::pos2(origin.x - 6.0, y + cell * 0.5),
            Align2::RIGHT_CENTER,
            row_col.name(),
            font.clone(),
            text_color,
        );
        for j in 0..n {
            let cell_rect = Rect::from_min_size(egui::pos2(origin.x + cell * j as f32, y), Vec2::splat(cell));
            let (fill, text) = match m.get(i, j) {
                Some(v) => (diverging(v), format!("{v:.2}")),
                None => (Color32::from_gray(200), "nan".to_string()),
            };
            painter.rect_filled(cell_rect.shrink(1.0), 0.0, fill);
            painter.text(cell_rect.center(), Align2::CENTER_CENTER, text, font.clone(), Color32::BLACK);
        }
    }
}

// ---------------------------------------------------------------------------
// Bubble chart
// ---------------------------------------------------------------------------

/// Stars (log scale) against forks. Rows without a positive star count or
/// without forks cannot be placed and are left out.
fn bubble_chart(ui: &mut Ui, dash: &Dashboard, colors: &ColorMap) {
    let max_contributors = dash
        .bubble_points
        .iter()
        .map(|p| p.contributors)
        .max()
        .unwrap_or(0)
        .max(1) as f64;

    let points: Vec<Points> = dash
        .bubble_points
        .iter()
        .filter_map(|p| {
            let stars = p.stars_count.filter(|&s| s > 0)?;
            let forks = p.forks_count?;
            let radius = (p.contributors as f64 / max_contributors).sqrt() as f32 * BUBBLE_MAX_RADIUS;
            Some(
                Points::new(vec![[(stars as f64).log10(), forks as f64]])
                    .radius(radius.max(2.0))
                    .filled(true)
                    .color(colors.color_for(&p.language).gamma_multiply(0.7))
                    .name(&p.language),
            )
        })
        .collect();

    Plot::new("stars_vs_forks")
        .legend(Legend::default())
        .height(CHART_HEIGHT)
        .x_axis_label("stars_count (log)")
        .y_axis_label("forks_count")
        .x_axis_formatter(|mark, _range| format!("{:.0}", 10f64.powf(mark.value)))
        .show(ui, |plot_ui| {
            for p in points {
                plot_ui.points(p);
            }
        });
}

// ---------------------------------------------------------------------------
// Treemap
// ---------------------------------------------------------------------------

/// Star totals per language and repository, both in ascending key order.
/// Rows without a star count contribute nothing.
fn treemap_groups(rows: &[TreemapRow]) -> Vec<(&str, Vec<(&str, u64)>)> {
    let mut groups: BTreeMap<&str, BTreeMap<&str, u64>> = BTreeMap::new();
    for row in rows {
        let total = groups
            .entry(row.language.as_str())
            .or_default()
            .entry(row.repositories.as_str())
            .or_default();
        *total = total.saturating_add(row.stars_count.unwrap_or(0));
    }
    groups
        .into_iter()
        .map(|(language, repos)| (language, repos.into_iter().collect()))
        .collect()
}

/// Slice-and-dice treemap: languages split the width by total stars, then
/// repositories split each language column by height.
fn treemap(ui: &mut Ui, rows: &[TreemapRow], colors: &ColorMap) {
    let groups: Vec<(&str, Vec<(&str, u64)>, u64)> = treemap_groups(rows)
        .into_iter()
        .map(|(language, repos)| {
            let lang_total = repos.iter().map(|r| r.1).fold(0, u64::saturating_add);
            (language, repos, lang_total)
        })
        .collect();
    let total = groups.iter().map(|g| g.2).fold(0, u64::saturating_add);
    if total == 0 {
        ui.label("No stars to show.");
        return;
    }

    let width = ui.available_width();
    let (rect, _) = ui.allocate_exact_size(Vec2::new(width, CHART_HEIGHT), Sense::hover());
    let painter = ui.painter_at(rect);
    let font = FontId::proportional(11.0);

    let mut x = rect.min.x;
    for (language, repos, lang_total) in &groups {
        if *lang_total == 0 {
            continue;
        }
        let w = rect.width() * (*lang_total as f32 / total as f32);
        let base = colors.color_for(language);

        let mut y = rect.min.y;
        for (repository, stars) in repos {
            let h = rect.height() * (*stars as f32 / *lang_total as f32);
            let tile = Rect::from_min_size(egui::pos2(x, y), Vec2::new(w, h));
            painter.rect_filled(tile.shrink(0.5), 2.0, base);
            if tile.width() > 60.0 && tile.height() > 16.0 {
                painter.text(
                    tile.left_top() + Vec2::new(4.0, 2.0),
                    Align2::LEFT_TOP,
                    format!("{language} / {repository}\n{stars}"),
                    font.clone(),
                    Color32::BLACK,
                );
            }
            y += h;
        }
        x += w;
    }
}

// ---------------------------------------------------------------------------
// Time series
// ---------------------------------------------------------------------------

fn stars_over_time_chart(ui: &mut Ui, series: &[MonthlyStars]) {
    let points: Vec<[f64; 2]> = series
        .iter()
        .map(|m| [month_index(m.created_at) as f64, m.stars_count as f64])
        .collect();

    Plot::new("stars_over_time")
        .height(CHART_HEIGHT)
        .x_axis_label("created_at")
        .y_axis_label("stars_count")
        .x_axis_formatter(|mark, _range| month_label(mark.value))
        .show(ui, |plot_ui| {
            plot_ui.line(Line::new(PlotPoints::from(points.clone())).name("Stars Over Time").width(2.0));
            plot_ui.points(Points::new(points).radius(3.0));
        });
}

fn month_index(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month0())
}

fn month_label(value: f64) -> String {
    if value.fract() != 0.0 {
        return String::new();
    }
    let idx = value as i64;
    format!("{:04}-{:02}", idx.div_euclid(12), idx.rem_euclid(12) + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_axis_labels() {
        let d = NaiveDate::from_ymd_opt(2021, 3, 1).unwrap();
        assert_eq!(month_label(month_index(d) as f64), "2021-03");
        assert_eq!(month_label(0.5), "");
    }

    #[test]
    fn test_index_label() {
        let labels = vec!["a".to_string(), "b".to_string()];
        assert_eq!(index_label(&labels, 1.0), "b");
        assert_eq!(index_label(&labels, 1.5), "");
        assert_eq!(index_label(&labels, 7.0), "");
    }

    #[test]
    fn test_preview_note_only_when_truncated() {
        assert_eq!(preview_note(PREVIEW_ROWS, "rows"), None);
        assert_eq!(
            preview_note(PREVIEW_ROWS + 1, "rows").as_deref(),
            Some("Showing the first 200 of 201 rows")
        );
    }

    #[test]
    fn test_treemap_groups_sum_rows_per_repository() {
        let row = |language: &str, repositories: &str, stars: Option<u64>| TreemapRow {
            language: language.into(),
            repositories: repositories.into(),
            stars_count: stars,
        };
        let rows = vec![
            row("py", "b", Some(3)),
            row("go", "x", Some(7)),
            row("py", "a", Some(u64::MAX)),
            row("py", "a", Some(1)),
            row("py", "b", None),
        ];
        assert_eq!(
            treemap_groups(&rows),
            vec![("go", vec![("x", 7)]), ("py", vec![("a", u64::MAX), ("b", 3)])]
        );
    }

    #[test]
    fn test_donut_segment_is_closed_ring() {
        let pts = donut_segment(0.0, TAU / 4.0);
        let pts = pts.points();
        let first = pts.first().unwrap();
        assert!((first.x - 0.0).abs() < 1e-9 && (first.y - 1.0).abs() < 1e-9);
        let last = pts.last().unwrap();
        assert!((last.x - 0.0).abs() < 1e-9 && (last.y - 0.5).abs() < 1e-9);
    }
}
