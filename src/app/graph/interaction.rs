use eframe::egui::{self, Pos2, Rect, Ui};

use crate::selection::SelectionIntent;

use super::super::ViewModel;
use super::super::render_utils::screen_to_world;

impl ViewModel {
    pub(in crate::app) fn handle_graph_zoom(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
    ) {
        if !response.hovered() {
            return;
        }

        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if scroll.abs() <= f32::EPSILON {
            return;
        }

        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .unwrap_or_else(|| rect.center());
        let world_before = screen_to_world(rect, self.pan, self.zoom, pointer);

        let zoom_factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
        self.zoom = (self.zoom * zoom_factor).clamp(0.1, 8.0);
        self.pan = pointer - rect.center() - (world_before * self.zoom);
    }

    pub(in crate::app) fn handle_graph_pan(&mut self, response: &egui::Response) {
        if response.dragged_by(egui::PointerButton::Secondary)
            || response.dragged_by(egui::PointerButton::Middle)
        {
            self.pan += response.drag_delta();
        }
    }

    /// Primary drag pins the node under the pointer and moves it with the
    /// pointer until the button is released.
    pub(in crate::app) fn handle_node_drag(
        &mut self,
        rect: Rect,
        response: &egui::Response,
        hovered: Option<usize>,
    ) {
        if response.drag_started_by(egui::PointerButton::Primary)
            && let Some(index) = hovered
            && self.engine.start_drag(index)
        {
            self.dragging = Some(index);
        }

        let Some(index) = self.dragging else {
            return;
        };

        if response.dragged_by(egui::PointerButton::Primary)
            && let Some(pointer) = response.interact_pointer_pos()
        {
            let world = screen_to_world(rect, self.pan, self.zoom, pointer);
            self.engine.drag_to(index, world);
        }

        if response.drag_stopped() {
            self.engine.end_drag(index);
            self.dragging = None;
        }
    }

    /// Turns clicks on a node into selection intents.
    pub(in crate::app) fn handle_node_clicks(
        &mut self,
        response: &egui::Response,
        hovered: Option<usize>,
    ) {
        let Some(node) = hovered.and_then(|index| self.engine.nodes().nodes().get(index)) else {
            return;
        };

        let id = node.id.clone();
        if response.clicked_by(egui::PointerButton::Primary) {
            self.pending_intents.push(SelectionIntent::ToggleCurrent(id));
        } else if response.clicked_by(egui::PointerButton::Secondary) {
            self.pending_intents.push(SelectionIntent::ToggleNegative(id));
        }
    }

    pub(in crate::app) fn hovered_index(
        ui: &Ui,
        visible_indices: &[usize],
        screen_positions: &[Pos2],
        screen_radius: f32,
    ) -> Option<usize> {
        let pointer = ui.input(|input| input.pointer.hover_pos())?;
        visible_indices
            .iter()
            .filter_map(|&index| {
                let distance = screen_positions[index].distance(pointer);
                (distance <= screen_radius).then_some((index, distance))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| index)
    }
}
