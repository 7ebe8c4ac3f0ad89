use eframe::egui::{Color32, Painter, Pos2, Rect, Stroke};

use crate::engine::viewport::Viewport;

/// Spacing of the background grid in world units, one cell per block.
const GRID_STEP: f32 = 100.0;

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

pub(super) fn draw_background(painter: &Painter, rect: Rect, viewport: &Viewport) {
    painter.rect_filled(rect, 0.0, Color32::from_rgb(236, 239, 242));

    let step = viewport.scale(GRID_STEP / 2.0).max(12.0);
    let origin = rect.min + viewport.offset();
    let stroke = Stroke::new(1.0, Color32::from_rgba_unmultiplied(120, 130, 140, 40));

    let mut x = rect.left() + (origin.x - rect.left()).rem_euclid(step);
    while x < rect.right() {
        painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], stroke);
        x += step;
    }

    let mut y = rect.top() + (origin.y - rect.top()).rem_euclid(step);
    while y < rect.bottom() {
        painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], stroke);
        y += step;
    }
}

/// Polyline points for `values` scaled into `rect`, with `max` at the top.
pub(super) fn sparkline_points(rect: Rect, values: &[f64], max: f64) -> Vec<Pos2> {
    if values.is_empty() || max <= 0.0 {
        return Vec::new();
    }

    let span = (values.len().max(2) - 1) as f32;
    values
        .iter()
        .enumerate()
        .map(|(index, value)| {
            let t = (value / max).clamp(0.0, 1.0) as f32;
            Pos2::new(
                rect.left() + rect.width() * (index as f32 / span),
                rect.bottom() - rect.height() * t,
            )
        })
        .collect()
}
