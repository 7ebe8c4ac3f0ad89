use eframe::egui::{self, Rect, Ui};

use crate::engine::hit_test::{NODE_RADIUS, pick_node};
use crate::sim::WorldSnapshot;

use super::super::ViewModel;

const WHEEL_ZOOM_IN: f32 = 1.1;
const WHEEL_ZOOM_OUT: f32 = 0.9;
const BUTTON_ZOOM: f32 = 1.2;

impl ViewModel {
    pub(in crate::app) fn handle_map_zoom(&mut self, ui: &Ui, rect: Rect, response: &egui::Response) {
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
        let factor = if scroll > 0.0 {
            WHEEL_ZOOM_IN
        } else {
            WHEEL_ZOOM_OUT
        };
        self.viewport.zoom_by(factor, pointer - rect.min.to_vec2());
    }

    pub(in crate::app) fn handle_map_pan(&mut self, response: &egui::Response) {
        if response.dragged_by(egui::PointerButton::Primary)
            || response.dragged_by(egui::PointerButton::Secondary)
            || response.dragged_by(egui::PointerButton::Middle)
        {
            self.viewport.pan(response.drag_delta());
        }
    }

    pub(in crate::app) fn zoom_step(&mut self, rect: Rect, zoom_in: bool) {
        let factor = if zoom_in { BUTTON_ZOOM } else { 1.0 / BUTTON_ZOOM };
        let center = rect.center() - rect.min.to_vec2();
        self.viewport.zoom_by(factor, center);
    }

    /// Selects the node under a primary click, or clears the selection when
    /// the click lands on empty map.
    pub(in crate::app) fn handle_map_click(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
        snapshot: &WorldSnapshot,
    ) {
        let hovered = response.hover_pos().and_then(|pointer| {
            pick_node(
                &snapshot.nodes,
                &self.viewport,
                pointer - rect.min.to_vec2(),
                NODE_RADIUS,
            )
        });

        if hovered.is_some() {
            ui.output_mut(|output| {
                output.cursor_icon = egui::CursorIcon::PointingHand;
            });
        }

        if response.clicked_by(egui::PointerButton::Primary) {
            let clicked = response.interact_pointer_pos().and_then(|pointer| {
                pick_node(
                    &snapshot.nodes,
                    &self.viewport,
                    pointer - rect.min.to_vec2(),
                    NODE_RADIUS,
                )
            });
            self.set_selected(clicked.map(|node| node.id.clone()));
        }
    }
}
