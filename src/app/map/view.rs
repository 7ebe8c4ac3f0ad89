use eframe::egui::{self, RichText, Sense, Ui};

use crate::engine::session::Session;

use super::super::ViewModel;
use super::super::render_utils::draw_background;
use super::super::scene::{self, PainterSurface};

impl ViewModel {
    pub(in crate::app) fn draw_map(&mut self, ui: &mut Ui, session: &Session) {
        let snapshot = session.snapshot();

        let toolbar = ui.horizontal(|ui| {
            let zoom_in = ui.button("+").on_hover_text("Zoom in").clicked();
            let zoom_out = ui.button("−").on_hover_text("Zoom out").clicked();
            let reset = ui
                .button("Reset view")
                .on_hover_text("Restore the default pan and zoom.")
                .clicked();
            ui.label(format!("zoom {:.0}%", self.viewport.zoom() * 100.0));
            let drawn = self.last_report.drawn;
            ui.small(format!(
                "{} roads · {} vehicles · {} incidents",
                drawn.roads, drawn.vehicles, drawn.incidents
            ))
            .on_hover_text(format!(
                "{} intersections, {} signals, {} arrows drawn",
                drawn.intersections, drawn.lights, drawn.arrows
            ));

            if !self.last_report.skipped.is_empty() {
                ui.separator();
                let skipped = &self.last_report.skipped;
                ui.label(
                    RichText::new(format!("{} elements reference missing nodes", skipped.len()))
                        .color(egui::Color32::from_rgb(0xFF, 0x85, 0x1B)),
                )
                .on_hover_ui(|ui| {
                    for missing in skipped.iter().take(12) {
                        ui.small(format!("{missing:?}"));
                    }
                });
            }
            (zoom_in, zoom_out, reset)
        });
        let (zoom_in, zoom_out, reset) = toolbar.inner;

        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());

        if zoom_in || zoom_out {
            self.zoom_step(rect, zoom_in);
        }
        if reset {
            self.viewport.reset();
        }

        self.handle_map_zoom(ui, rect, &response);
        self.handle_map_pan(&response);
        self.handle_map_click(ui, rect, &response, &snapshot);

        let painter = ui.painter_at(rect);
        draw_background(&painter, rect, &self.viewport);

        let mut surface = PainterSurface::new(&painter, rect.min);
        self.last_report = scene::draw(
            &mut surface,
            &snapshot,
            &self.viewport,
            self.layers,
            self.selected.as_deref(),
        );
    }
}
