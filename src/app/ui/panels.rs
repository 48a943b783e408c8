use eframe::egui::{self, Align, Color32, Context, Layout, RichText};

use super::super::{ViewModel, ViewTab};

impl ViewModel {
    pub(in crate::app) fn show(&mut self, ctx: &Context) {
        self.poll_fetches();

        let elapsed = ctx.input(|input| input.stable_dt).clamp(1.0 / 240.0, 1.0 / 20.0);
        let layout_moving = self.engine.tick(elapsed);

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("replica-explorer");
                    ui.separator();
                    ui.label(format!("dataset: {}", self.dataset_name));
                    ui.label(format!("items: {}", self.results_fetch.dataset().len()));
                    ui.label(format!("results: {}", self.results.len()));
                    ui.separator();
                    ui.selectable_value(&mut self.tab, ViewTab::Embedding, "Embedding");
                    ui.selectable_value(&mut self.tab, ViewTab::Results, "Results");
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        if self.is_fetching() {
                            ui.spinner();
                        }
                        ui.label(format!(
                            "{} current, {} negative",
                            self.selection.current().len(),
                            self.selection.negative().len()
                        ));
                    });
                });
            });

        if let Some(notice) = self.notice.clone() {
            egui::TopBottomPanel::top("notice")
                .resizable(false)
                .show(ctx, |ui| {
                    ui.horizontal(|ui| {
                        ui.label(RichText::new(notice).color(Color32::from_rgb(240, 176, 90)));
                        ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                            if ui.small_button("Dismiss").clicked() {
                                self.notice = None;
                            }
                        });
                    });
                });
        }

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(340.0)
            .show(ctx, |ui| self.draw_controls(ui));

        egui::CentralPanel::default().show(ctx, |ui| match self.tab {
            ViewTab::Embedding => self.draw_embedding(ui),
            ViewTab::Results => self.draw_results(ui),
        });

        let selection_changed = self.apply_pending_intents();

        if layout_moving || selection_changed || self.is_fetching() || self.dragging.is_some() {
            ctx.request_repaint();
        }
    }
}
