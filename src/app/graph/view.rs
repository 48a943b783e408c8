use eframe::egui::{self, Align2, Color32, FontId, Sense, Stroke, Ui, vec2};

use crate::selection::SelectionState;
use crate::util::truncate_label;

use super::super::ViewModel;
use super::super::render_utils::{
    NODE_COLOR, blend_color, circle_visible, draw_background, link_color, segment_maybe_visible,
    selection_color, world_to_screen,
};

impl ViewModel {
    pub(in crate::app) fn draw_embedding(&mut self, ui: &mut Ui) {
        self.embedding_highlight.refresh();

        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);
        draw_background(&painter, rect, self.pan, self.zoom);

        self.handle_graph_zoom(ui, rect, &response);
        self.handle_graph_pan(&response);

        if self.engine.nodes().is_empty() {
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                if self.is_fetching() {
                    "Fetching distances..."
                } else {
                    "No results to lay out."
                },
                FontId::proportional(15.0),
                Color32::from_gray(190),
            );
            return;
        }

        let radius =
            (self.engine.simulator().params().node_radius * self.zoom.powf(0.5)).clamp(3.0, 48.0);
        let screen_positions = self
            .engine
            .nodes()
            .nodes()
            .iter()
            .map(|node| world_to_screen(rect, self.pan, self.zoom, node.position))
            .collect::<Vec<_>>();
        let visible_indices = (0..screen_positions.len())
            .filter(|&index| circle_visible(rect, screen_positions[index], radius))
            .collect::<Vec<_>>();

        let hovered = if self.dragging.is_some() {
            self.dragging
        } else {
            Self::hovered_index(ui, &visible_indices, &screen_positions, radius)
        };
        if hovered.is_some() {
            ui.output_mut(|output| {
                output.cursor_icon = if self.dragging.is_some() {
                    egui::CursorIcon::Grabbing
                } else {
                    egui::CursorIcon::PointingHand
                };
            });
        }

        self.handle_node_drag(rect, &response, hovered);
        self.handle_node_clicks(&response, hovered);

        let link_width = (1.4 * self.zoom.sqrt()).clamp(0.6, 3.2);
        for link in self.engine.links() {
            let start = screen_positions[link.source];
            let end = screen_positions[link.target];
            if !segment_maybe_visible(rect, start, end) {
                continue;
            }
            painter.line_segment([start, end], Stroke::new(link_width, link_color(link.kind)));
        }

        let nodes = self.engine.nodes().nodes();
        let mut selection_animating = false;
        for &index in &visible_indices {
            let node = &nodes[index];
            let position = screen_positions[index];
            let state = self.embedding_highlight.state_of(&node.id);
            let is_hovered = hovered == Some(index);

            let base = if is_hovered {
                blend_color(NODE_COLOR, Color32::WHITE, 0.35)
            } else {
                NODE_COLOR
            };
            let fill = selection_color(state).unwrap_or(base);
            let selection_mix = ui.ctx().animate_bool(
                ui.make_persistent_id(("node-selection", node.entity)),
                state != SelectionState::None,
            );
            if selection_mix > 0.0 && selection_mix < 1.0 {
                selection_animating = true;
            }
            if selection_mix > 0.0 {
                let halo_strength = (selection_mix * (1.0 - selection_mix) * 4.0).clamp(0.0, 1.0);
                let halo_alpha = (30.0 + (halo_strength * 145.0)) as u8;
                painter.circle_stroke(
                    position,
                    radius + 4.0 + ((1.0 - selection_mix) * 6.0),
                    Stroke::new(
                        1.0 + (halo_strength * 1.6),
                        Color32::from_rgba_unmultiplied(fill.r(), fill.g(), fill.b(), halo_alpha),
                    ),
                );
            }
            painter.circle_filled(position, radius, fill);

            let ring = if node.pin.is_some() {
                Stroke::new(2.4, Color32::from_rgb(250, 226, 120))
            } else if state != SelectionState::None {
                Stroke::new(2.0, Color32::from_gray(240))
            } else {
                Stroke::new(1.0, Color32::from_rgba_unmultiplied(12, 12, 12, 190))
            };
            painter.circle_stroke(position, radius, ring);

            if is_hovered || self.zoom > 1.6 {
                let label = self
                    .results_fetch
                    .dataset()
                    .item(&node.id)
                    .map(|item| item.display_name())
                    .unwrap_or(node.id.as_str());
                painter.text(
                    position + vec2(radius + 5.0, 0.0),
                    Align2::LEFT_CENTER,
                    truncate_label(label, 48),
                    FontId::proportional(12.0),
                    Color32::from_gray(236),
                );
            }
        }

        if selection_animating {
            ui.ctx().request_repaint();
        }

        let simulator = self.engine.simulator();
        painter.text(
            rect.left_top() + vec2(10.0, 10.0),
            Align2::LEFT_TOP,
            format!(
                "{} nodes  |  {} links  |  alpha {:.4}  |  t-SNE step {}",
                nodes.len(),
                self.engine.links().len(),
                simulator.alpha(),
                self.engine.optimizer().iteration(),
            ),
            FontId::proportional(13.0),
            Color32::from_gray(220),
        );
    }
}
