use eframe::egui::{self, Key, Response, RichText, Ui};

use crate::data::ANNOTATION_KINDS;
use crate::selection::{SelectionIntent, to_query};
use crate::util::truncate_label;

use super::super::ViewModel;
use super::super::render_utils::{CURRENT_COLOR, NEGATIVE_COLOR, link_color};

const SLIDER_KEY_BASE_RATE: f32 = 10.0;
const SLIDER_KEY_ACCEL_PER_SEC: f32 = 9.0;
const SLIDER_KEY_ACCEL_MAX: f32 = 40.0;
const MAX_RESULTS_LIMIT: usize = 500;

#[derive(Clone, Copy, Default)]
struct SliderKeyHoldState {
    secs: f32,
    integer_carry: f32,
}

fn slider_key_accel_multiplier(hold_secs: f32) -> f32 {
    let ramp = hold_secs * SLIDER_KEY_ACCEL_PER_SEC;
    (1.0 + ramp + ramp * ramp * 0.15).min(SLIDER_KEY_ACCEL_MAX)
}

/// Arrow keys nudge a focused integer slider, faster the longer they are held.
fn apply_slider_arrow_acceleration(
    ui: &Ui,
    response: &Response,
    value: &mut usize,
    min: usize,
    max: usize,
) -> bool {
    let state_id = response.id.with("arrow_key_hold_state");
    if !response.has_focus() {
        ui.ctx()
            .data_mut(|data| data.insert_temp(state_id, SliderKeyHoldState::default()));
        return false;
    }

    let mut hold_state = ui.ctx().data(|data| {
        data.get_temp::<SliderKeyHoldState>(state_id)
            .unwrap_or_default()
    });
    let (delta_time, increase_down, decrease_down) = ui.input(|input| {
        (
            input.stable_dt.min(0.1),
            input.key_down(Key::ArrowRight) || input.key_down(Key::ArrowUp),
            input.key_down(Key::ArrowLeft) || input.key_down(Key::ArrowDown),
        )
    });

    let direction = (increase_down as i8) - (decrease_down as i8);
    if direction == 0 {
        ui.ctx()
            .data_mut(|data| data.insert_temp(state_id, SliderKeyHoldState::default()));
        return false;
    }

    hold_state.secs += delta_time;
    let speed = SLIDER_KEY_BASE_RATE * slider_key_accel_multiplier(hold_state.secs);
    hold_state.integer_carry += direction as f32 * speed * delta_time;
    let whole_delta = hold_state.integer_carry.trunc() as isize;
    hold_state.integer_carry -= whole_delta as f32;

    let old_value = *value;
    if whole_delta != 0 {
        *value = (*value as isize + whole_delta).clamp(min as isize, max as isize) as usize;
    }

    ui.ctx().request_repaint();
    ui.ctx()
        .data_mut(|data| data.insert_temp(state_id, hold_state));
    *value != old_value
}

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Search");
        ui.separator();

        let search_response = ui
            .text_edit_singleline(&mut self.search)
            .on_hover_text("Fuzzy match on item labels and ids. Press Enter to search.");
        let submitted =
            search_response.lost_focus() && ui.input(|input| input.key_pressed(Key::Enter));

        let mut search_requested = submitted;
        let mut selection_search_requested = false;
        ui.horizontal(|ui| {
            search_requested |= ui.button("Search").clicked();
            let has_selection = !self.selection.snapshot().is_empty();
            selection_search_requested = ui
                .add_enabled(has_selection, egui::Button::new("Search by selection"))
                .on_hover_text("Rank items near current picks and away from negative picks.")
                .clicked();
        });

        let slider = ui
            .add(
                egui::Slider::new(&mut self.max_results, 1..=MAX_RESULTS_LIMIT)
                    .text("Max results"),
            )
            .on_hover_text("Number of results a search returns.");
        if slider.hovered() {
            slider.request_focus();
        }
        apply_slider_arrow_acceleration(ui, &slider, &mut self.max_results, 1, MAX_RESULTS_LIMIT);

        if search_requested {
            self.request_text_search();
        } else if selection_search_requested {
            self.request_selection_search();
        }

        ui.add_space(8.0);
        self.draw_selection_lists(ui);

        ui.add_space(8.0);
        self.draw_layout_controls(ui);
    }

    fn draw_selection_lists(&mut self, ui: &mut Ui) {
        ui.heading("Selection");
        ui.separator();

        let mut intent = None;
        let lists = [
            ("Current", CURRENT_COLOR, self.selection.current()),
            ("Negative", NEGATIVE_COLOR, self.selection.negative()),
        ];
        for (title, color, ids) in lists {
            ui.label(RichText::new(format!("{title} ({})", ids.len())).color(color));
            egui::ScrollArea::vertical()
                .id_salt(title)
                .max_height(140.0)
                .auto_shrink([false, true])
                .show(ui, |ui| {
                    for id in ids {
                        let name = self
                            .results_fetch
                            .dataset()
                            .item(id)
                            .map(|item| item.display_name())
                            .unwrap_or(id.as_str());
                        if ui
                            .small_button(format!("x  {}", truncate_label(name, 40)))
                            .on_hover_text("Remove from this set")
                            .clicked()
                        {
                            intent = Some(if title == "Current" {
                                SelectionIntent::ToggleCurrent(id.clone())
                            } else {
                                SelectionIntent::ToggleNegative(id.clone())
                            });
                        }
                    }
                });
        }

        let has_selection =
            !self.selection.current().is_empty() || !self.selection.negative().is_empty();
        ui.horizontal(|ui| {
            if ui
                .add_enabled(has_selection, egui::Button::new("Reset selection"))
                .clicked()
            {
                intent = Some(SelectionIntent::Reset);
            }
            if ui
                .add_enabled(has_selection, egui::Button::new("Copy as query"))
                .on_hover_text("Copy the selection as q=/n= query parameters")
                .clicked()
            {
                ui.ctx().copy_text(to_query(&self.selection.snapshot()));
            }
        });

        let current = self.selection.current().len();
        let link_count =
            current * current.saturating_sub(1) / 2 + current * self.selection.negative().len();
        let mut link_requested = false;
        ui.horizontal(|ui| {
            egui::ComboBox::from_id_salt("link_kind")
                .selected_text(self.link_kind.label())
                .show_ui(ui, |ui| {
                    for kind in ANNOTATION_KINDS {
                        ui.selectable_value(&mut self.link_kind, kind, kind.label());
                    }
                });
            link_requested = ui
                .add_enabled(
                    link_count > 0,
                    egui::Button::new(format!("Link selection ({link_count})")),
                )
                .on_hover_text(
                    "Link current picks to each other with the chosen kind, \
                     and to negative picks as negative",
                )
                .clicked();
        });
        if link_requested {
            self.link_selection();
        }

        if let Some(intent) = intent {
            self.pending_intents.push(intent);
        }
    }

    fn draw_layout_controls(&mut self, ui: &mut Ui) {
        ui.heading("Layout");
        ui.separator();

        let simulator = self.engine.simulator();
        let status = if !simulator.is_running() {
            "stopped"
        } else if !simulator.pull_enabled() {
            "embedding pull off"
        } else if simulator.alpha() < simulator.params().alpha_min {
            "settled"
        } else {
            "running"
        };
        ui.label(format!("Status: {status}"));
        ui.label(format!("Alpha: {:.4}", simulator.alpha()));
        let optimizer = self.engine.optimizer();
        ui.label(format!(
            "t-SNE over {} items: step {}, cost {:.4}",
            optimizer.len(),
            optimizer.iteration(),
            optimizer.cost()
        ));

        let mut kinds = self
            .engine
            .links()
            .iter()
            .map(|link| link.kind)
            .collect::<Vec<_>>();
        kinds.sort_unstable();
        kinds.dedup();
        if !kinds.is_empty() {
            ui.horizontal_wrapped(|ui| {
                ui.label("Links:");
                for kind in kinds {
                    ui.label(RichText::new(kind.label()).color(link_color(kind)));
                }
            });
        }

        ui.horizontal(|ui| {
            if ui
                .button("Restart layout")
                .on_hover_text("Re-arm the simulation and the embedding pull")
                .clicked()
            {
                self.engine.restart();
            }
            if ui.button("Stop").clicked() {
                self.engine.stop();
            }
        });
    }
}
