use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::{Column, TableBuilder};

use ec_peaks::data::reformat::Separator;

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – run parameters
// ---------------------------------------------------------------------------

fn labelled_text(ui: &mut Ui, label: &str, value: &mut String) {
    ui.horizontal(|ui: &mut Ui| {
        ui.label(label);
        ui.text_edit_singleline(value);
    });
}

/// Render the parameter form.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Extracting Information from EC Data");
    ui.separator();

    let mut run = false;

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            let form = &mut state.form;

            // ---- Input files ----
            ui.strong("Input");
            ui.horizontal(|ui: &mut Ui| {
                ui.label("User Folder");
                ui.text_edit_singleline(&mut form.folder);
                if ui.button("Browse…").clicked() {
                    if let Some(dir) = rfd::FileDialog::new().pick_folder() {
                        form.folder = dir.display().to_string();
                    }
                }
            });
            labelled_text(ui, "Headers", &mut form.header);
            egui::ComboBox::from_id_salt("separator")
                .selected_text(match form.separator {
                    Separator::Comma => "Comma",
                    Separator::Tab => "Tab",
                })
                .show_ui(ui, |ui: &mut Ui| {
                    ui.selectable_value(&mut form.separator, Separator::Comma, "Comma");
                    ui.selectable_value(&mut form.separator, Separator::Tab, "Tab");
                });
            ui.horizontal(|ui: &mut Ui| {
                ui.label("Blank Lines");
                ui.add(egui::DragValue::new(&mut form.blank_lines).range(0..=100));
            });
            labelled_text(ui, "List Columns", &mut form.columns);
            ui.separator();

            // ---- Preprocessing ----
            ui.strong("Preprocessing");
            ui.horizontal(|ui: &mut Ui| {
                ui.checkbox(&mut form.smooth, "Smooth");
                ui.add_enabled(
                    form.smooth,
                    egui::DragValue::new(&mut form.smooth_span).range(1..=1000),
                );
            });
            ui.checkbox(&mut form.entire_bound, "Entire Bound");
            ui.add_enabled_ui(!form.entire_bound, |ui: &mut Ui| {
                labelled_text(ui, "Lower Bound", &mut form.lower_bound);
                labelled_text(ui, "Upper Bound", &mut form.upper_bound);
            });
            ui.separator();

            // ---- Detection ----
            ui.strong("Detection");
            labelled_text(ui, "Threshold", &mut form.threshold);
            labelled_text(ui, "Min Height", &mut form.min_height);
            ui.checkbox(&mut form.peak, "Check for Peak, Uncheck for Valley");
            ui.checkbox(&mut form.local_minimum, "Simple local-minimum scan");
            ui.add_enabled_ui(form.local_minimum, |ui: &mut Ui| {
                labelled_text(ui, "Scan Threshold", &mut form.scan_threshold);
            });
            ui.checkbox(&mut form.graph, "Get Graphs");
            ui.separator();

            if ui.button("Run").clicked() {
                run = true;
            }
        });

    if run {
        state.run();
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Load parameters…").clicked() {
                if let Some(path) = json_dialog("Load run parameters").pick_file() {
                    state.load_config(&path);
                }
                ui.close_menu();
            }
            if ui.button("Save parameters…").clicked() {
                if let Some(path) = json_dialog("Save run parameters").save_file() {
                    state.save_config(&path);
                }
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(msg) = &state.status_message {
            let color = if msg.starts_with("Error") {
                Color32::RED
            } else {
                Color32::LIGHT_GREEN
            };
            ui.label(RichText::new(msg).color(color));
        }
    });
}

fn json_dialog(title: &str) -> rfd::FileDialog {
    rfd::FileDialog::new()
        .set_title(title)
        .add_filter("JSON", &["json"])
}

// ---------------------------------------------------------------------------
// Bottom panel – batch outcomes
// ---------------------------------------------------------------------------

/// One row per (file, column) pass of the last run.
pub fn results_table(ui: &mut Ui, state: &AppState) {
    let Some(batch) = &state.batch else {
        ui.label("No run yet.");
        return;
    };

    TableBuilder::new(ui)
        .striped(true)
        .column(Column::auto().at_least(200.0))
        .column(Column::auto())
        .column(Column::auto())
        .column(Column::auto())
        .column(Column::remainder())
        .header(20.0, |mut header| {
            header.col(|ui| {
                ui.strong("File");
            });
            header.col(|ui| {
                ui.strong("Column");
            });
            header.col(|ui| {
                ui.strong("Peaks");
            });
            header.col(|ui| {
                ui.strong("Baseline / extent");
            });
            header.col(|ui| {
                ui.strong("Report / error");
            });
        })
        .body(|mut body| {
            for item in &batch.items {
                body.row(18.0, |mut row| {
                    let file = item
                        .source
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    row.col(|ui| {
                        ui.label(file);
                    });
                    row.col(|ui| {
                        ui.label(item.column.as_str());
                    });
                    match &item.result {
                        Ok(outcome) => {
                            row.col(|ui| {
                                ui.label(outcome.rows_appended.to_string());
                            });
                            row.col(|ui| {
                                let lines: Vec<String> =
                                    outcome.analysis.columns.iter().map(|c| c.describe()).collect();
                                ui.label(lines.join("; "));
                            });
                            row.col(|ui| {
                                ui.label(outcome.report.display().to_string());
                            });
                        }
                        Err(message) => {
                            row.col(|ui| {
                                ui.label("–");
                            });
                            row.col(|ui| {
                                ui.label("–");
                            });
                            row.col(|ui| {
                                ui.label(RichText::new(message).color(Color32::RED));
                            });
                        }
                    }
                });
            }
        });
}
