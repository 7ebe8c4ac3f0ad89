use std::time::{Duration, Instant};

use eframe::egui::{self, RichText, Ui};
use tracing::warn;

use crate::engine::clock::ClockState;
use crate::engine::session::{Command, Session};
use crate::sim::IncidentKind;
use crate::util::short_label;

use super::super::ViewModel;

const MAX_MANUAL_STEPS: u32 = 100;
const MAX_INCIDENT_DURATION: u32 = 50;

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui, session: &mut Session, now: Instant) {
        ui.heading("Map Layers");
        ui.separator();
        ui.checkbox(&mut self.layers.roads, "Roads");
        ui.checkbox(&mut self.layers.density, "Traffic density")
            .on_hover_text("Color roads by congestion. Off draws them gray.");
        ui.add_enabled(
            self.layers.density,
            egui::Checkbox::new(&mut self.layers.arrows, "Direction arrows"),
        );
        ui.checkbox(&mut self.layers.intersections, "Intersections");
        ui.checkbox(&mut self.layers.lights, "Traffic lights");
        ui.checkbox(&mut self.layers.vehicles, "Vehicles");
        ui.checkbox(&mut self.layers.incidents, "Incidents");

        ui.add_space(8.0);
        self.draw_simulation_controls(ui, session, now);

        ui.add_space(8.0);
        self.draw_incident_form(ui, session);

        ui.add_space(8.0);
        self.draw_light_controls(ui, session);

        ui.add_space(8.0);
        self.draw_routing(ui, session);
    }

    fn draw_simulation_controls(&mut self, ui: &mut Ui, session: &mut Session, now: Instant) {
        ui.heading("Simulation");
        ui.separator();

        let running = matches!(session.clock().state(), ClockState::Running(_));
        ui.horizontal(|ui| {
            let label = if running { "Pause" } else { "Start" };
            if ui.button(label).clicked() {
                if running {
                    session.stop();
                } else {
                    let interval = Duration::from_secs_f32(self.interval_secs);
                    self.report_clock(session.start(interval, now));
                }
            }

            let reset = ui.add_enabled(
                !session.is_running(&Command::Reset),
                egui::Button::new("Reset simulation"),
            );
            if reset.on_hover_text("Restore the initial network state.").clicked() {
                session.reset();
            }
        });

        let slider = ui.add(
            egui::Slider::new(&mut self.interval_secs, 0.5..=5.0)
                .step_by(0.5)
                .suffix(" s")
                .text("Step interval"),
        );
        if slider.changed() {
            let interval = Duration::from_secs_f32(self.interval_secs);
            self.report_clock(session.set_interval(interval));
        }

        ui.horizontal(|ui| {
            ui.add(
                egui::DragValue::new(&mut self.step_count)
                    .range(1..=MAX_MANUAL_STEPS)
                    .suffix(" steps"),
            );
            let queued = session.clock().queued_manual();
            let step = ui.add_enabled(queued.is_none(), egui::Button::new("Run steps"));
            if step.clicked() {
                match session.step(self.step_count) {
                    Ok(_) => self.clock_error = None,
                    Err(error) => {
                        warn!(%error, "manual step rejected");
                        self.clock_error = Some(error.to_string());
                    }
                }
            }
            if let Some(steps) = queued {
                ui.label(RichText::new(format!("{steps} queued")).italics())
                    .on_hover_text("Waits for the step already in flight.");
            }
        });

        if let Some(request) = session.clock().in_flight() {
            ui.small(format!(
                "advancing {} step{} ({:?})",
                request.steps,
                if request.steps == 1 { "" } else { "s" },
                request.source
            ));
        }
    }

    fn draw_incident_form(&mut self, ui: &mut Ui, session: &mut Session) {
        ui.heading("Add Incident");
        ui.separator();

        let snapshot = session.snapshot();
        egui::ComboBox::from_label("Location")
            .selected_text(if self.incident.location.is_empty() {
                "choose intersection".to_owned()
            } else {
                short_label(&self.incident.location)
            })
            .show_ui(ui, |ui| {
                for node in &snapshot.nodes {
                    ui.selectable_value(
                        &mut self.incident.location,
                        node.id.clone(),
                        short_label(&node.id),
                    );
                }
            });

        ui.horizontal_wrapped(|ui| {
            for kind in IncidentKind::ALL {
                ui.selectable_value(&mut self.incident.kind, kind, kind.label());
            }
        });

        ui.add(
            egui::Slider::new(&mut self.incident.duration, 1..=MAX_INCIDENT_DURATION)
                .text("Duration (steps)"),
        );

        let ready = snapshot.node(&self.incident.location).is_some();
        if ui.add_enabled(ready, egui::Button::new("Add incident")).clicked() {
            session.add_incident(
                &self.incident.location,
                self.incident.kind,
                self.incident.duration,
            );
        }
    }

    fn report_clock<E: std::fmt::Display>(&mut self, result: Result<(), E>) {
        match result {
            Ok(()) => self.clock_error = None,
            Err(error) => {
                warn!(%error, "clock command rejected");
                self.clock_error = Some(error.to_string());
            }
        }
    }
}
