use eframe::egui::{self, Color32, RichText, ScrollArea, Slider, Ui};

use crate::chart::Encoding;
use crate::state::{AppState, Banner, Phase};

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    let Some(dataset) = &state.dataset else {
        ui.label("No dataset loaded.");
        return;
    };

    // Clone what we need so we can mutate state below.
    let (lo, hi) = dataset.grade_range;
    let classes: Vec<(String, String)> = dataset
        .class_entries()
        .map(|(k, d)| (k.clone(), d.clone()))
        .collect();
    let has_classification = dataset.has_classification;

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Grade ----
            ui.strong("Cu grade");
            let mut threshold = state.threshold_mode;
            if ui.checkbox(&mut threshold, "Minimum threshold only").changed() {
                state.set_threshold_mode(threshold);
            }

            let mut min = state.grade_min;
            let mut max = state.grade_max;
            let min_label = if state.threshold_mode { "Cu ≥" } else { "Min" };
            let min_changed = ui
                .add(Slider::new(&mut min, lo..=hi).text(min_label).max_decimals(3))
                .changed();
            let max_changed = ui
                .add_enabled(
                    !state.threshold_mode,
                    Slider::new(&mut max, lo..=hi).text("Max").max_decimals(3),
                )
                .changed();
            if min_changed || max_changed {
                // Dragging one handle past the other drags the other along.
                if min_changed && min > max {
                    max = min;
                }
                if max_changed && max < min {
                    min = max;
                }
                state.set_grade_range(min, max);
            }
            ui.separator();

            // ---- Encoding ----
            ui.strong("Color");
            let mut encoding = state.encoding;
            ui.radio_value(&mut encoding, Encoding::Continuous, "Single series by grade");
            ui.add_enabled_ui(has_classification, |ui: &mut Ui| {
                ui.radio_value(&mut encoding, Encoding::ByClassification, "One series per class");
            });
            if encoding != state.encoding {
                state.set_encoding(encoding);
            }
            ui.separator();

            // ---- Classification ----
            if !has_classification {
                ui.label("No classification column in this dataset.");
                return;
            }

            let n_selected = state.selected_classes.as_ref().map_or(0, |s| s.len());
            let header_text = format!("Classification  ({n_selected}/{})", classes.len());
            egui::CollapsingHeader::new(RichText::new(header_text).strong())
                .id_salt("classification")
                .default_open(true)
                .show(ui, |ui: &mut Ui| {
                    ui.horizontal(|ui: &mut Ui| {
                        if ui.small_button("All").clicked() {
                            state.select_all();
                        }
                        if ui.small_button("None").clicked() {
                            state.select_none();
                        }
                    });

                    for (key, display) in &classes {
                        let mut checked = state
                            .selected_classes
                            .as_ref()
                            .is_some_and(|s| s.contains(key));
                        if ui.checkbox(&mut checked, display.as_str()).changed() {
                            state.toggle_class(key);
                        }
                    }
                });

            ui.separator();
            if ui.button("Reset filters").clicked() {
                state.reset_filters();
            }
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("Data", |ui: &mut Ui| {
            if ui.button("Reload").clicked() {
                state.request_reload();
                ui.ctx().request_repaint();
                ui.close_menu();
            }
        });

        ui.separator();

        match (&state.phase, &state.dataset) {
            (Phase::Loaded, Some(ds)) => {
                ui.label(format!(
                    "{} blocks loaded, {} visible",
                    ds.len(),
                    state.visible_count()
                ));
            }
            (Phase::Idle | Phase::Loading, _) => {
                ui.label("Loading…");
            }
            _ => {}
        }

        ui.separator();

        match &state.banner {
            Some(Banner::Success(msg)) => {
                ui.label(RichText::new(msg).color(Color32::from_rgb(80, 180, 90)));
            }
            Some(Banner::Error(msg)) => {
                ui.label(RichText::new(msg).color(Color32::RED));
            }
            None => {}
        }
    });
}
