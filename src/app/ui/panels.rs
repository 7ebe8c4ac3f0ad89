use std::time::{Instant, SystemTime};

use eframe::egui::{self, Align, Color32, Context, Layout, RichText, Ui};

use crate::engine::clock::ClockState;
use crate::engine::session::Session;
use crate::util::format_age;

use super::super::ViewModel;

const ERROR_TINT: Color32 = Color32::from_rgb(0xFF, 0x41, 0x36);
const NOTICE_TINT: Color32 = Color32::from_rgb(0x2E, 0xCC, 0x40);

impl ViewModel {
    pub(in crate::app) fn show(
        &mut self,
        ctx: &Context,
        session: &mut Session,
        api_url: &str,
        now: Instant,
    ) {
        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| self.draw_top_bar(ui, session, api_url));

        if session.store().failure().is_some()
            || session.notice().is_some()
            || self.clock_error.is_some()
        {
            egui::TopBottomPanel::bottom("status")
                .resizable(false)
                .show(ctx, |ui| self.draw_status(ui, session));
        }

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(330.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical()
                    .id_salt("controls_scroll")
                    .show(ui, |ui| self.draw_controls(ui, session, now));
            });

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(340.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical()
                    .id_salt("details_scroll")
                    .show(ui, |ui| {
                        self.draw_details(ui, session);
                        ui.separator();
                        self.draw_analytics(ui, session);
                    });
            });

        egui::CentralPanel::default().show(ctx, |ui| self.draw_map(ui, session));
    }

    fn draw_top_bar(&mut self, ui: &mut Ui, session: &mut Session, api_url: &str) {
        let snapshot = session.snapshot();

        ui.horizontal(|ui| {
            ui.heading("Traffic Control");
            ui.separator();
            ui.label(format!("server: {api_url}"));
            ui.label(format!("snapshot #{}", session.store().sequence()));
            ui.label(format!("intersections: {}", snapshot.nodes.len()));
            ui.label(format!("roads: {}", snapshot.edges.len()));
            ui.label(format!("vehicles: {}", snapshot.vehicle_positions.len()));

            let refresh = ui.add_enabled(
                !session.is_refreshing(),
                egui::Button::new("Refresh"),
            );
            if refresh.clicked() {
                session.refresh();
            }

            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                match session.clock().state() {
                    ClockState::Running(interval) => {
                        ui.label(
                            RichText::new(format!("running every {:.1}s", interval.as_secs_f32()))
                                .color(NOTICE_TINT),
                        );
                    }
                    ClockState::Stopped => {
                        ui.label("paused");
                    }
                }
                if session.is_busy() {
                    ui.spinner();
                }
                if session.store().pending_edit().is_some() {
                    ui.label(RichText::new("unconfirmed edit").italics())
                        .on_hover_text("Shown locally until the next refresh replaces it.");
                }
            });
        });
    }

    fn draw_status(&mut self, ui: &mut Ui, session: &mut Session) {
        let wall_now = SystemTime::now();

        if let Some(failure) = session.store().failure() {
            let mut dismiss = false;
            ui.horizontal(|ui| {
                ui.label(RichText::new("Error").strong().color(ERROR_TINT));
                ui.label(format!("{} failed: {}", failure.operation, failure.error))
                    .on_hover_text(format!("endpoint: {}", failure.error.endpoint()));
                if failure.error.is_transport() {
                    ui.label(RichText::new("(showing last good data)").italics());
                }
                dismiss = ui.small_button("Dismiss").clicked();
            });
            if dismiss {
                session.store_mut().dismiss_failure();
            }
        }

        if let Some(notice) = session.notice() {
            let mut dismiss = false;
            ui.horizontal(|ui| {
                ui.label(RichText::new("Done").strong().color(NOTICE_TINT));
                ui.label(notice.message.as_str());
                ui.small(format_age(notice.at, wall_now));
                dismiss = ui.small_button("Dismiss").clicked();
            });
            if dismiss {
                session.dismiss_notice();
            }
        }

        if let Some(message) = &self.clock_error {
            let mut dismiss = false;
            ui.horizontal(|ui| {
                ui.label(RichText::new("Clock").strong().color(ERROR_TINT));
                ui.label(message.as_str());
                dismiss = ui.small_button("Dismiss").clicked();
            });
            if dismiss {
                self.clock_error = None;
            }
        }
    }
}
