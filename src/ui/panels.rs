use std::collections::BTreeSet;

use eframe::egui::{self, Color32, DragValue, RichText, ScrollArea, Ui};
use egui_extras::DatePickerButton;

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel. The dashboard is recomputed only when a
/// selection actually changed this frame.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filter the data");
    ui.separator();

    let Some(table) = &state.table else {
        ui.label("No dataset loaded.");
        return;
    };
    let before = state.filters.clone();
    let filters = &mut state.filters;
    let color_map = state.color_map.as_ref();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            multiselect(ui, "Pick your language", &table.languages, &mut filters.languages, |lang| {
                color_map.map(|cm| cm.color_for(lang))
            });
            multiselect(
                ui,
                "Pick the repository",
                &table.repositories,
                &mut filters.repositories,
                |_| None,
            );
            multiselect(
                ui,
                "Pick the contributors count",
                &table.contributors,
                &mut filters.contributors,
                |_| None,
            );
            ui.separator();

            // ---- Stars range ----
            if let Some(range) = &mut filters.stars {
                ui.strong("Stars count");
                ui.horizontal(|ui: &mut Ui| {
                    ui.label("Min");
                    ui.add(DragValue::new(&mut range.min).speed(1.0));
                    ui.label("Max");
                    ui.add(DragValue::new(&mut range.max).speed(1.0));
                });
                ui.separator();
            }

            // ---- Creation date range ----
            if let Some(range) = &mut filters.dates {
                ui.strong("Created between");
                ui.horizontal(|ui: &mut Ui| {
                    ui.label("Start");
                    ui.add(DatePickerButton::new(&mut range.start).id_salt("start_date"));
                });
                ui.horizontal(|ui: &mut Ui| {
                    ui.label("End");
                    ui.add(DatePickerButton::new(&mut range.end).id_salt("end_date"));
                });
                ui.separator();
            }

            if ui.button("Reset filters").clicked() {
                *filters = crate::data::filter::FilterState::defaults_for(table);
            }
        });

    if state.filters != before {
        state.refresh();
    }
}

/// Collapsible checkbox list. An empty selection means "everything".
fn multiselect<T: Ord + Clone + ToString>(
    ui: &mut Ui,
    title: &str,
    options: &BTreeSet<T>,
    selected: &mut BTreeSet<T>,
    color: impl Fn(&T) -> Option<Color32>,
) {
    let summary = if selected.is_empty() {
        "all".to_string()
    } else {
        format!("{}/{}", selected.len(), options.len())
    };

    egui::CollapsingHeader::new(RichText::new(format!("{title}  ({summary})")).strong())
        .id_salt(title)
        .default_open(false)
        .show(ui, |ui: &mut Ui| {
            if ui.small_button("Clear").clicked() {
                selected.clear();
            }
            ScrollArea::vertical()
                .id_salt(title)
                .max_height(220.0)
                .show(ui, |ui: &mut Ui| {
                    for value in options {
                        let mut text = RichText::new(value.to_string());
                        if let Some(c) = color(value) {
                            text = text.color(c);
                        }
                        let mut checked = selected.contains(value);
                        if ui.checkbox(&mut checked, text).changed() {
                            if checked {
                                selected.insert(value.clone());
                            } else {
                                selected.remove(value);
                            }
                        }
                    }
                });
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui.button("Reload default").clicked() {
                state.load_default();
                ui.close_menu();
            }
        });

        ui.separator();

        if let (Some(table), Some(name)) = (&state.table, &state.source_name) {
            ui.label(format!(
                "{name}: {} repositories loaded, {} visible",
                table.len(),
                state.visible_indices.len()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open repository dataset")
        .add_filter("Delimited text", &["csv", "txt"])
        .pick_file();

    if let Some(path) = file {
        state.load_path(&path);
    }
}
