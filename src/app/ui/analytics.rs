use std::time::SystemTime;

use eframe::egui::{self, Color32, RichText, Sense, Stroke, Ui, vec2};

use crate::engine::analyzer::{FleetStats, HistoryWindow, Trend};
use crate::engine::session::Session;
use crate::util::{format_age, short_label};

use super::super::ViewModel;
use super::super::render_utils::{blend_color, sparkline_points};
use super::super::scene::palette::{DensityBand, density_color};

const SPARKLINE_HEIGHT: f32 = 64.0;
const BUCKET_LABELS: [&str; 4] = ["≤25", "26–50", "51–75", ">75"];

fn trend_color(trend: Trend) -> Color32 {
    match trend {
        Trend::Increasing => DensityBand::Jammed.color(),
        Trend::Decreasing => DensityBand::Free.color(),
        Trend::Stable => Color32::GRAY,
    }
}

impl ViewModel {
    pub(in crate::app) fn draw_analytics(&mut self, ui: &mut Ui, session: &Session) {
        ui.heading("Analytics");
        ui.add_space(4.0);

        let snapshot = session.snapshot();
        let stats = FleetStats::of(&snapshot);
        let analyzer = session.analyzer();

        egui::Grid::new("fleet_stats")
            .num_columns(2)
            .striped(true)
            .show(ui, |ui| {
                ui.label("Vehicles");
                ui.label(stats.total_vehicles.to_string());
                ui.end_row();
                ui.label("Moving");
                ui.label(stats.moving.to_string());
                ui.end_row();
                ui.label("Arrived");
                ui.label(stats.arrived.to_string());
                ui.end_row();
                ui.label("Average density");
                ui.colored_label(
                    density_color(stats.avg_density),
                    format!("{:.1}", stats.avg_density),
                );
                ui.end_row();
                ui.label("Active incidents");
                ui.label(stats.active_incidents.to_string());
                ui.end_row();
            });

        ui.add_space(4.0);
        ui.label(RichText::new("Road density distribution").strong());
        let total_roads: usize = stats.density_buckets.iter().sum();
        for (index, count) in stats.density_buckets.iter().enumerate() {
            let band = match index {
                0 => DensityBand::Free,
                1 => DensityBand::Moderate,
                2 => DensityBand::Heavy,
                _ => DensityBand::Jammed,
            };
            let fraction = if total_roads == 0 {
                0.0
            } else {
                *count as f32 / total_roads as f32
            };
            ui.horizontal(|ui| {
                ui.label(format!("{:>6}", BUCKET_LABELS[index]));
                ui.add(
                    egui::ProgressBar::new(fraction)
                        .desired_width(160.0)
                        .fill(band.color())
                        .text(format!("{count}")),
                )
                .on_hover_text(band.label());
            });
        }

        if stats.active_incidents > 0 {
            ui.add_space(4.0);
            ui.label(RichText::new("Incidents by type").strong());
            for (kind, count) in &stats.incidents_by_kind {
                ui.label(format!("{kind}: {count}"));
            }
        }

        ui.separator();
        ui.horizontal(|ui| {
            ui.label(RichText::new("Congestion trend").strong());
            let trend = analyzer.trend();
            ui.colored_label(trend_color(trend), trend.label());
        });
        match analyzer.latest() {
            Some(sample) => ui
                .small(format!(
                    "{} samples, last at snapshot #{} ({})",
                    analyzer.len(),
                    sample.sequence,
                    format_age(sample.timestamp, SystemTime::now())
                ))
                .on_hover_text(format!(
                    "moving {} · arrived {} · incidents {}",
                    sample.moving_count, sample.arrived_count, sample.incident_count
                )),
            None => ui.small("No samples yet."),
        };

        ui.add_space(4.0);
        ui.horizontal(|ui| {
            for window in HistoryWindow::ALL {
                ui.selectable_value(&mut self.history_window, window, window.label());
            }
        });
        let series: Vec<f64> = analyzer
            .window(self.history_window)
            .map(|sample| sample.avg_density)
            .collect();
        let (rect, _) = ui.allocate_exact_size(
            vec2(ui.available_width(), SPARKLINE_HEIGHT),
            Sense::hover(),
        );
        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 2.0, blend_color(Color32::WHITE, Color32::GRAY, 0.12));
        let points = sparkline_points(rect, &series, 100.0);
        if points.len() >= 2 {
            let color = series
                .last()
                .map_or(Color32::GRAY, |latest| density_color(*latest));
            painter.add(egui::Shape::line(points, Stroke::new(1.5, color)));
        } else {
            let placeholder = if analyzer.is_empty() {
                "waiting for the first snapshot…"
            } else {
                "collecting samples…"
            };
            painter.text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                placeholder,
                egui::FontId::proportional(12.0),
                Color32::GRAY,
            );
        }

        ui.separator();
        ui.label(RichText::new("Hotspots").strong());
        if analyzer.hotspots().is_empty() {
            ui.label("No roads above the congestion threshold.");
        }
        for hotspot in analyzer.hotspots() {
            ui.horizontal(|ui| {
                ui.colored_label(density_color(hotspot.density), format!("{:.0}", hotspot.density));
                let label = ui.link(short_label(&hotspot.road_id));
                if label.clicked() {
                    let source = snapshot
                        .edges
                        .iter()
                        .find(|edge| edge.id == hotspot.road_id)
                        .map(|edge| edge.source.clone());
                    if source.is_some() {
                        self.set_selected(source);
                    }
                }
            });
        }
    }
}
