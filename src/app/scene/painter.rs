use eframe::egui::{Color32, Painter, Pos2, Shape, Stroke, Vec2};

use super::Surface;

/// Paints scene primitives onto an egui canvas whose top-left corner sits
/// at `origin` in window coordinates.
pub struct PainterSurface<'a> {
    painter: &'a Painter,
    origin: Vec2,
}

impl<'a> PainterSurface<'a> {
    pub fn new(painter: &'a Painter, origin: Pos2) -> Self {
        Self {
            painter,
            origin: origin.to_vec2(),
        }
    }
}

impl Surface for PainterSurface<'_> {
    fn line(&mut self, from: Pos2, to: Pos2, stroke: Stroke) {
        self.painter
            .line_segment([from + self.origin, to + self.origin], stroke);
    }

    fn circle(&mut self, center: Pos2, radius: f32, fill: Color32, stroke: Stroke) {
        self.painter
            .circle(center + self.origin, radius, fill, stroke);
    }

    fn polygon(&mut self, points: Vec<Pos2>, fill: Color32, stroke: Stroke) {
        let points = points.into_iter().map(|point| point + self.origin).collect();
        self.painter
            .add(Shape::convex_polygon(points, fill, stroke));
    }
}
