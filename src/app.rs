use eframe::egui;

use crate::state::AppState;
use crate::ui::{panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct EcPeaksApp {
    pub state: AppState,
}

impl eframe::App for EcPeaksApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: run parameters ----
        egui::SidePanel::left("form_panel")
            .default_width(260.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Bottom panel: per-file outcomes ----
        egui::TopBottomPanel::bottom("results_panel")
            .default_height(180.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::results_table(ui, &self.state);
            });

        // ---- Central panel: peak preview ----
        egui::CentralPanel::default().show(ctx, |ui| {
            plot::preview_plot(ui, &self.state);
        });
    }
}
