use eframe::egui::{self, RichText, Ui};

use crate::engine::session::{Command, RouteQuery, Session};
use crate::sim::WorldSnapshot;
use crate::util::short_label;

use super::super::ViewModel;

fn node_picker(ui: &mut Ui, label: &str, value: &mut String, snapshot: &WorldSnapshot) {
    egui::ComboBox::from_label(label)
        .selected_text(if value.is_empty() {
            "choose".to_owned()
        } else {
            short_label(value)
        })
        .show_ui(ui, |ui| {
            for node in &snapshot.nodes {
                ui.selectable_value(value, node.id.clone(), short_label(&node.id));
            }
        });
}

fn route_summary(route: &RouteQuery) -> String {
    let from = short_label(&route.start);
    let to = short_label(&route.end);
    if !route.result.is_reachable() {
        return format!("No route from {from} to {to}.");
    }

    let length = route
        .result
        .length
        .map_or_else(|| "unknown".to_owned(), |length| format!("{length:.1}"));
    format!(
        "{from} → {to}: {} stops, length {length}{}",
        route.result.path.len(),
        if route.result.traffic_adjusted {
            " (traffic adjusted)"
        } else {
            ""
        }
    )
}

impl ViewModel {
    pub(in crate::app) fn draw_routing(&mut self, ui: &mut Ui, session: &mut Session) {
        ui.heading("Routing");
        ui.separator();

        let snapshot = session.snapshot();
        node_picker(ui, "Start", &mut self.route_start, &snapshot);
        node_picker(ui, "End", &mut self.route_end, &snapshot);

        let ready = snapshot.node(&self.route_start).is_some() && snapshot.node(&self.route_end).is_some();
        let pending = session.jobs_running(|command| matches!(command, Command::Route { .. }));
        ui.horizontal(|ui| {
            if ui
                .add_enabled(ready && !pending, egui::Button::new("Find route"))
                .clicked()
            {
                session.calculate_route(&self.route_start, &self.route_end);
            }
            if pending {
                ui.spinner();
            }
        });

        if let Some(route) = session.route() {
            ui.label(route_summary(route));
            if route.result.is_reachable() {
                ui.small(
                    route
                        .result
                        .path
                        .iter()
                        .map(|id| short_label(id))
                        .collect::<Vec<_>>()
                        .join(" → "),
                );
            }
        }

        ui.add_space(6.0);
        let rerouting = session.is_running(&Command::RerouteVehicles);
        if ui
            .add_enabled(!rerouting, egui::Button::new("Reroute all vehicles"))
            .on_hover_text("Recompute every moving vehicle's route for current congestion.")
            .clicked()
        {
            session.reroute_vehicles();
        }
        ui.label(RichText::new("Vehicles avoid congested roads after rerouting.").weak());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::RouteResult;

    fn query(path: &[&str], length: Option<f64>) -> RouteQuery {
        RouteQuery {
            start: "intersection_0_0".to_owned(),
            end: "intersection_2_2".to_owned(),
            result: RouteResult {
                path: path.iter().map(|id| (*id).to_owned()).collect(),
                length,
                traffic_adjusted: true,
            },
        }
    }

    #[test]
    fn unreachable_route_reads_as_no_route() {
        let summary = route_summary(&query(&[], None));
        assert!(summary.starts_with("No route"));
    }

    #[test]
    fn reachable_route_lists_stop_count_and_length() {
        let summary = route_summary(&query(
            &["intersection_0_0", "intersection_1_0", "intersection_2_2"],
            Some(212.5),
        ));
        assert!(summary.contains("3 stops"));
        assert!(summary.contains("212.5"));
        assert!(summary.ends_with("(traffic adjusted)"));
    }
}
