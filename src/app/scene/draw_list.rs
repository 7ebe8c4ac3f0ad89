use eframe::egui::{Color32, Pos2, Stroke};

use super::{Layer, Surface};

#[derive(Clone, Debug, PartialEq)]
pub enum Primitive {
    Line {
        from: Pos2,
        to: Pos2,
        stroke: Stroke,
    },
    Circle {
        center: Pos2,
        radius: f32,
        fill: Color32,
        stroke: Stroke,
    },
    Polygon {
        points: Vec<Pos2>,
        fill: Color32,
        stroke: Stroke,
    },
}

/// A surface that records primitives instead of rasterizing them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DrawList {
    layer: Option<Layer>,
    items: Vec<(Option<Layer>, Primitive)>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_layer(&self, layer: Layer) -> impl Iterator<Item = &Primitive> {
        self.items
            .iter()
            .filter(move |(tag, _)| *tag == Some(layer))
            .map(|(_, primitive)| primitive)
    }

    /// Layers in the order they first received a primitive.
    pub fn layer_sequence(&self) -> Vec<Layer> {
        let mut sequence: Vec<Layer> = Vec::new();
        for layer in self.items.iter().filter_map(|(tag, _)| *tag) {
            if sequence.last() != Some(&layer) {
                sequence.push(layer);
            }
        }
        sequence
    }

    fn push(&mut self, primitive: Primitive) {
        self.items.push((self.layer, primitive));
    }
}

impl Surface for DrawList {
    fn begin_layer(&mut self, layer: Layer) {
        self.layer = Some(layer);
    }

    fn line(&mut self, from: Pos2, to: Pos2, stroke: Stroke) {
        self.push(Primitive::Line { from, to, stroke });
    }

    fn circle(&mut self, center: Pos2, radius: f32, fill: Color32, stroke: Stroke) {
        self.push(Primitive::Circle {
            center,
            radius,
            fill,
            stroke,
        });
    }

    fn polygon(&mut self, points: Vec<Pos2>, fill: Color32, stroke: Stroke) {
        self.push(Primitive::Polygon {
            points,
            fill,
            stroke,
        });
    }
}
