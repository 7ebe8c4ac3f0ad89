use eframe::egui::{self, RichText, Ui};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::engine::session::{Command, Session};
use crate::engine::store::{MAX_GREEN_SECS, MIN_GREEN_SECS, PendingEdit};
use crate::sim::{LightPhase, TrafficLight};
use crate::util::short_label;

use super::super::scene::palette::light_color;
use super::super::{LightEditor, ViewModel};

const LIGHT_LIST_ROWS: usize = 12;

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_ascii_lowercase(), &query.to_ascii_lowercase()))
}

/// Intersection ids matching `query`, best match first. An empty query
/// keeps every id in its original order.
pub(super) fn filter_intersections<'a, I>(ids: I, query: &str) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a String>,
{
    let query = query.trim();
    if query.is_empty() {
        return ids.into_iter().map(String::as_str).collect();
    }

    let matcher = SkimMatcherV2::default();
    let mut scored: Vec<(i64, &str)> = ids
        .into_iter()
        .filter_map(|id| {
            fuzzy_match_score(&matcher, id, query)
                .or_else(|| fuzzy_match_score(&matcher, &short_label(id), query))
                .map(|score| (score, id.as_str()))
        })
        .collect();
    scored.sort_by(|(a_score, a_id), (b_score, b_id)| b_score.cmp(a_score).then(a_id.cmp(b_id)));
    scored.into_iter().map(|(_, id)| id).collect()
}

fn phase_label(ui: &mut Ui, name: &str, phase: LightPhase, green_time: u32) {
    let text = match phase {
        LightPhase::Green => "green",
        LightPhase::Red => "red",
        LightPhase::Unknown => "?",
    };
    ui.label(format!("{name}:"));
    ui.label(RichText::new(text).color(light_color(phase)).strong());
    ui.label(format!("{green_time}s green"));
}

impl ViewModel {
    pub(in crate::app) fn draw_light_controls(&mut self, ui: &mut Ui, session: &mut Session) {
        ui.heading("Traffic Lights");
        ui.separator();

        let optimizing = session.is_running(&Command::OptimizeLights);
        let optimize = ui
            .add_enabled(!optimizing, egui::Button::new("Optimize all lights"))
            .on_hover_text("Ask the simulation to retime every light for current traffic.");
        if optimize.clicked() {
            session.optimize_lights();
        }

        ui.add_space(4.0);
        ui.label("Filter intersections");
        ui.text_edit_singleline(&mut self.light_filter);

        let snapshot = session.snapshot();
        let matches = filter_intersections(snapshot.traffic_lights.keys(), &self.light_filter);

        egui::ScrollArea::vertical()
            .id_salt("light_list_scroll")
            .max_height(22.0 * LIGHT_LIST_ROWS as f32)
            .auto_shrink([false, true])
            .show(ui, |ui| {
                if matches.is_empty() {
                    ui.label("No intersections match.");
                }
                for id in &matches {
                    let is_open = self
                        .light_editor
                        .as_ref()
                        .is_some_and(|editor| editor.intersection_id == *id);
                    if ui.selectable_label(is_open, short_label(id)).clicked() {
                        self.open_light_editor(id, snapshot.traffic_lights.get(*id));
                        self.set_selected(Some((*id).to_owned()));
                    }
                }
            });

        self.draw_light_editor(ui, session);
    }

    fn open_light_editor(&mut self, intersection_id: &str, light: Option<&TrafficLight>) {
        let Some(light) = light else {
            return;
        };
        self.light_editor = Some(LightEditor {
            intersection_id: intersection_id.to_owned(),
            north_south: light.north_south.green_time.clamp(MIN_GREEN_SECS, MAX_GREEN_SECS),
            east_west: light.east_west.green_time.clamp(MIN_GREEN_SECS, MAX_GREEN_SECS),
            error: None,
        });
    }

    fn draw_light_editor(&mut self, ui: &mut Ui, session: &mut Session) {
        let Some(editor) = self.light_editor.as_mut() else {
            return;
        };
        let snapshot = session.snapshot();
        let Some(light) = snapshot.traffic_lights.get(&editor.intersection_id) else {
            self.light_editor = None;
            return;
        };

        ui.separator();
        ui.label(RichText::new(short_label(&editor.intersection_id)).strong());
        ui.horizontal(|ui| {
            phase_label(
                ui,
                "N-S",
                light.north_south.current_state,
                light.north_south.green_time,
            );
        });
        ui.horizontal(|ui| {
            phase_label(
                ui,
                "E-W",
                light.east_west.current_state,
                light.east_west.green_time,
            );
        });

        ui.add(
            egui::Slider::new(&mut editor.north_south, MIN_GREEN_SECS..=MAX_GREEN_SECS)
                .suffix(" s")
                .text("N-S green"),
        );
        ui.add(
            egui::Slider::new(&mut editor.east_west, MIN_GREEN_SECS..=MAX_GREEN_SECS)
                .suffix(" s")
                .text("E-W green"),
        );

        let mut close = false;
        ui.horizontal(|ui| {
            if ui.button("Apply").clicked() {
                let edit = PendingEdit {
                    intersection_id: editor.intersection_id.clone(),
                    north_south_green: editor.north_south,
                    east_west_green: editor.east_west,
                };
                editor.error = session.commit_edit(edit).err().map(|error| error.to_string());
            }
            close = ui.button("Close").clicked();
        });

        if let Some(error) = &editor.error {
            ui.colored_label(light_color(LightPhase::Red), error.as_str());
        }
        if close {
            self.light_editor = None;
        }
    }
}
