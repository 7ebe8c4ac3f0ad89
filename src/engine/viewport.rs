use eframe::egui::{Pos2, Vec2, vec2};

pub const MIN_ZOOM: f32 = 0.5;
pub const MAX_ZOOM: f32 = 2.0;
pub const DEFAULT_OFFSET: Vec2 = vec2(50.0, 50.0);
pub const DEFAULT_ZOOM: f32 = 1.0;

/// Pan/zoom state of the map canvas.
///
/// Screen coordinates are canvas-local: `(0, 0)` is the canvas top-left.
/// `screen = world * zoom + offset`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    offset: Vec2,
    zoom: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            offset: DEFAULT_OFFSET,
            zoom: DEFAULT_ZOOM,
        }
    }
}

impl Viewport {
    #[cfg(test)]
    pub fn new(offset: Vec2, zoom: f32) -> Self {
        Self {
            offset,
            zoom: clamp_zoom(zoom),
        }
    }

    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn pan(&mut self, delta: Vec2) {
        self.offset += delta;
    }

    /// Scales by `factor` around `anchor` (screen space), clamped to
    /// `[MIN_ZOOM, MAX_ZOOM]`. The world point under `anchor` stays put.
    pub fn zoom_by(&mut self, factor: f32, anchor: Pos2) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }

        let next_zoom = clamp_zoom(self.zoom * factor);
        let world_under_anchor = self.screen_to_world(anchor);
        self.zoom = next_zoom;
        self.offset = anchor.to_vec2() - world_under_anchor.to_vec2() * next_zoom;
    }

    pub fn world_to_screen(&self, world: Pos2) -> Pos2 {
        (world.to_vec2() * self.zoom + self.offset).to_pos2()
    }

    pub fn screen_to_world(&self, screen: Pos2) -> Pos2 {
        ((screen.to_vec2() - self.offset) / self.zoom).to_pos2()
    }

    /// World-space length in screen pixels.
    pub fn scale(&self, world_length: f32) -> f32 {
        world_length * self.zoom
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn clamp_zoom(zoom: f32) -> f32 {
    if zoom.is_finite() {
        zoom.clamp(MIN_ZOOM, MAX_ZOOM)
    } else {
        DEFAULT_ZOOM
    }
}
