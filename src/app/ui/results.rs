use eframe::egui::{self, Align, Layout, RichText, Ui};

use crate::selection::{SelectionIntent, SelectionState};
use crate::util::truncate_label;

use super::super::ViewModel;
use super::super::render_utils::{CURRENT_COLOR, NEGATIVE_COLOR};

const ROW_HEIGHT: f32 = 24.0;

impl ViewModel {
    pub(in crate::app) fn draw_results(&mut self, ui: &mut Ui) {
        self.results_highlight.refresh();

        if self.results.is_empty() {
            ui.vertical_centered(|ui| {
                ui.add_space(80.0);
                if self.results_fetch.is_pending() {
                    ui.spinner();
                } else {
                    ui.label("No results.");
                }
            });
            return;
        }

        ui.label("Click to mark as current, right-click to mark as negative.");
        ui.separator();

        let mut intent = None;
        egui::ScrollArea::vertical()
            .id_salt("results_list")
            .auto_shrink([false, false])
            .show_rows(ui, ROW_HEIGHT, self.results.len(), |ui, row_range| {
                for index in row_range {
                    let Some(id) = self.results.get(index) else {
                        continue;
                    };
                    let state = self.results_highlight.state_of(id);
                    let item = self.results_fetch.dataset().item(id);
                    let name = item.map(|item| item.display_name()).unwrap_or(id.as_str());
                    let image_url = item.and_then(|item| item.image_url.as_deref());

                    let (marker, text) = match state {
                        SelectionState::Current => (
                            "+",
                            RichText::new(truncate_label(name, 64)).color(CURRENT_COLOR),
                        ),
                        SelectionState::Negative => (
                            "-",
                            RichText::new(truncate_label(name, 64))
                                .color(NEGATIVE_COLOR)
                                .strikethrough(),
                        ),
                        SelectionState::None => (" ", RichText::new(truncate_label(name, 64))),
                    };

                    ui.horizontal(|ui| {
                        ui.monospace(marker);
                        let mut response =
                            ui.selectable_label(state != SelectionState::None, text);
                        if let Some(url) = image_url {
                            response = response.on_hover_text(url);
                        }
                        if response.clicked() {
                            intent = Some(SelectionIntent::ToggleCurrent(id.clone()));
                        } else if response.secondary_clicked() {
                            intent = Some(SelectionIntent::ToggleNegative(id.clone()));
                        }
                        ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                            ui.weak(truncate_label(id, 24));
                        });
                    });
                }
            });

        if let Some(intent) = intent {
            self.pending_intents.push(intent);
        }
    }
}
