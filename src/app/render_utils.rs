use eframe::egui::{Color32, Painter, Pos2, Rect, Stroke, Vec2};

use crate::layout::LinkKind;
use crate::selection::SelectionState;

pub(super) const CURRENT_COLOR: Color32 = Color32::from_rgb(96, 200, 120);
pub(super) const NEGATIVE_COLOR: Color32 = Color32::from_rgb(232, 92, 86);
pub(super) const NODE_COLOR: Color32 = Color32::from_rgb(104, 150, 214);

pub(super) fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let inverse = 1.0 - amount;

    Color32::from_rgba_unmultiplied(
        ((base.r() as f32 * inverse) + (overlay.r() as f32 * amount)) as u8,
        ((base.g() as f32 * inverse) + (overlay.g() as f32 * amount)) as u8,
        ((base.b() as f32 * inverse) + (overlay.b() as f32 * amount)) as u8,
        ((base.a() as f32 * inverse) + (overlay.a() as f32 * amount)) as u8,
    )
}

pub(super) fn selection_color(state: SelectionState) -> Option<Color32> {
    match state {
        SelectionState::None => None,
        SelectionState::Current => Some(CURRENT_COLOR),
        SelectionState::Negative => Some(NEGATIVE_COLOR),
    }
}

pub(super) fn link_color(kind: LinkKind) -> Color32 {
    match kind {
        LinkKind::Duplicate => Color32::from_rgb(238, 180, 80),
        LinkKind::NonDuplicate => Color32::from_rgba_unmultiplied(150, 150, 150, 120),
        LinkKind::Proposal => Color32::from_rgb(120, 170, 240),
        LinkKind::Positive => CURRENT_COLOR,
        LinkKind::Negative => NEGATIVE_COLOR,
        LinkKind::Personal => Color32::from_rgb(190, 130, 230),
        LinkKind::Undefined => Color32::from_rgba_unmultiplied(110, 110, 110, 110),
    }
}

pub(super) fn draw_background(painter: &Painter, rect: Rect, pan: Vec2, zoom: f32) {
    painter.rect_filled(rect, 0.0, Color32::from_rgb(22, 24, 28));

    let step = (64.0 * zoom.clamp(0.5, 2.0)).max(24.0);
    let origin = rect.center() + pan;
    let stroke = Stroke::new(1.0, Color32::from_rgba_unmultiplied(64, 70, 78, 60));

    let mut x = origin.x.rem_euclid(step) + rect.left();
    while x < rect.right() {
        painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], stroke);
        x += step;
    }

    let mut y = origin.y.rem_euclid(step) + rect.top();
    while y < rect.bottom() {
        painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], stroke);
        y += step;
    }
}

pub(super) fn circle_visible(rect: Rect, position: Pos2, radius: f32) -> bool {
    rect.expand(radius).contains(position)
}

/// Cheap bounding-box test; may keep a few segments that miss `rect`.
pub(super) fn segment_maybe_visible(rect: Rect, start: Pos2, end: Pos2) -> bool {
    Rect::from_two_pos(start, end).intersects(rect)
}

pub(super) fn world_to_screen(rect: Rect, pan: Vec2, zoom: f32, world: Vec2) -> Pos2 {
    rect.center() + pan + world * zoom
}

pub(super) fn screen_to_world(rect: Rect, pan: Vec2, zoom: f32, screen: Pos2) -> Vec2 {
    (screen - rect.center() - pan) / zoom
}

#[cfg(test)]
mod tests {
    use super::*;

    use eframe::egui::{pos2, vec2};

    #[test]
    fn screen_and_world_transforms_invert() {
        let rect = Rect::from_min_max(pos2(10.0, 20.0), pos2(410.0, 320.0));
        let pan = vec2(-35.0, 12.5);
        let world = vec2(120.0, -48.0);
        let screen = world_to_screen(rect, pan, 1.75, world);
        let back = screen_to_world(rect, pan, 1.75, screen);
        assert!((back - world).length() < 1e-3);
    }

    #[test]
    fn visibility_checks_account_for_radius() {
        let rect = Rect::from_min_max(pos2(0.0, 0.0), pos2(100.0, 100.0));
        assert!(circle_visible(rect, pos2(105.0, 50.0), 8.0));
        assert!(!circle_visible(rect, pos2(120.0, 50.0), 8.0));
        assert!(segment_maybe_visible(rect, pos2(-50.0, 50.0), pos2(150.0, 50.0)));
        assert!(!segment_maybe_visible(rect, pos2(-50.0, -5.0), pos2(-10.0, -40.0)));
    }

    #[test]
    fn negative_and_current_use_distinct_colors() {
        assert_eq!(selection_color(SelectionState::None), None);
        assert_ne!(
            selection_color(SelectionState::Current),
            selection_color(SelectionState::Negative)
        );
    }
}
