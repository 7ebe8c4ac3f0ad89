use eframe::egui::{self, RichText, Ui};

use crate::engine::session::Session;
use crate::sim::{IncidentKind, LightPhase, VehicleStatus};
use crate::util::short_label;

use super::super::ViewModel;
use super::super::scene::palette::{incident_color, light_color, vehicle_style};
use super::DEFAULT_INCIDENT_DURATION;

impl ViewModel {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui, session: &mut Session) {
        ui.heading("Intersection Details");
        ui.add_space(6.0);

        let Some(selected_id) = self.selected.clone() else {
            ui.label("Click an intersection on the map to inspect it.");
            return;
        };

        let snapshot = session.snapshot();
        let Some(node) = snapshot.node(&selected_id) else {
            ui.label("The selected intersection is no longer in the network.");
            if ui.button("Clear selection").clicked() {
                self.set_selected(None);
            }
            return;
        };

        ui.label(RichText::new(short_label(&node.id)).strong());
        ui.small(node.id.as_str());
        ui.label(format!("Position: ({:.0}, {:.0})", node.x, node.y));

        ui.separator();
        ui.label(RichText::new("Traffic light").strong());
        match snapshot.traffic_lights.get(&node.id) {
            Some(light) => {
                for (name, direction) in [("North-South", &light.north_south), ("East-West", &light.east_west)] {
                    ui.horizontal(|ui| {
                        let state = match direction.current_state {
                            LightPhase::Green => "green",
                            LightPhase::Red => "red",
                            LightPhase::Unknown => "unknown",
                        };
                        ui.label(format!("{name}:"));
                        ui.colored_label(light_color(direction.current_state), state);
                        ui.label(format!(
                            "{:.0}s of {}s",
                            direction.time_in_state, direction.green_time
                        ));
                    });
                }
                let edited = session
                    .store()
                    .pending_edit()
                    .is_some_and(|edit| edit.intersection_id == node.id);
                if edited {
                    ui.small("Timing shows an unconfirmed local edit.");
                    if let Some(server) = session.store().committed().traffic_lights.get(&node.id) {
                        ui.small(format!(
                            "Server timing: {}s N-S, {}s E-W",
                            server.north_south.green_time, server.east_west.green_time
                        ));
                    }
                }
            }
            None => {
                ui.label("No signal at this intersection.");
            }
        }

        ui.separator();
        let vehicles: Vec<_> = snapshot.vehicles_at(&node.id).collect();
        ui.label(RichText::new(format!("Vehicles here ({})", vehicles.len())).strong());
        if vehicles.is_empty() {
            ui.label("None.");
        } else {
            egui::ScrollArea::vertical()
                .id_salt("vehicles_here_scroll")
                .max_height(160.0)
                .show(ui, |ui| {
                    for (id, vehicle) in &vehicles {
                        let (color, _) = vehicle_style(vehicle.kind);
                        let status = match vehicle.status {
                            VehicleStatus::Moving => "moving",
                            VehicleStatus::Arrived => "arrived",
                            VehicleStatus::Unknown => "unknown",
                        };
                        ui.horizontal(|ui| {
                            ui.colored_label(color, "●");
                            ui.label(format!(
                                "{id} · {status} → {}",
                                short_label(&vehicle.destination)
                            ));
                        });
                    }
                });
        }

        ui.separator();
        let incidents: Vec<_> = snapshot.incidents_at(&node.id).collect();
        ui.label(RichText::new(format!("Incidents ({})", incidents.len())).strong());
        for incident in &incidents {
            ui.horizontal(|ui| {
                ui.colored_label(incident_color(incident.kind), "▲");
                ui.label(format!(
                    "{} · severity {:.0}% · {} steps left",
                    incident.kind.label(),
                    incident.severity * 100.0,
                    incident.duration
                ));
                if let Some(road) = &incident.road_id {
                    ui.small(format!("on {}", short_label(road)));
                }
            });
        }

        ui.add_space(4.0);
        ui.label(format!("Add incident ({DEFAULT_INCIDENT_DURATION} steps)"));
        ui.horizontal_wrapped(|ui| {
            for kind in IncidentKind::ALL {
                let button = egui::Button::new(RichText::new(kind.label()).color(incident_color(kind)));
                if ui.add(button).clicked() {
                    session.add_incident(&node.id, kind, DEFAULT_INCIDENT_DURATION);
                }
            }
        });
    }
}
