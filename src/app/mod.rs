use std::sync::Arc;
use std::time::{Duration, Instant};

use eframe::egui::{self, Context};
use tracing::{info, warn};

use crate::engine::analyzer::HistoryWindow;
use crate::engine::session::Session;
use crate::engine::viewport::Viewport;
use crate::sim::IncidentKind;

use scene::{LayerFlags, RenderReport};

mod map;
mod render_utils;
mod scene;
mod ui;

pub struct AppConfig {
    pub api_url: String,
    pub interval: Duration,
    pub autostart: bool,
}

pub struct DashboardApp {
    session: Session,
    config: AppConfig,
    state: AppState,
}

enum AppState {
    Loading,
    Ready(Box<ViewModel>),
    Error(String),
}

struct ViewModel {
    viewport: Viewport,
    layers: LayerFlags,
    selected: Option<String>,
    interval_secs: f32,
    step_count: u32,
    incident: IncidentForm,
    light_filter: String,
    light_editor: Option<LightEditor>,
    route_start: String,
    route_end: String,
    history_window: HistoryWindow,
    clock_error: Option<String>,
    last_report: RenderReport,
}

struct IncidentForm {
    location: String,
    kind: IncidentKind,
    duration: u32,
}

struct LightEditor {
    intersection_id: String,
    north_south: u32,
    east_west: u32,
    error: Option<String>,
}

impl DashboardApp {
    pub fn new(cc: &eframe::CreationContext<'_>, mut session: Session, config: AppConfig) -> Self {
        let ctx = cc.egui_ctx.clone();
        session.set_waker(Arc::new(move || ctx.request_repaint()));
        session.refresh();

        Self {
            session,
            config,
            state: AppState::Loading,
        }
    }

    fn retry(&mut self) -> AppState {
        self.session.store_mut().dismiss_failure();
        self.session.refresh();
        AppState::Loading
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        self.session.pump(now);

        let mut transition = None;
        let mut retry = false;

        match &mut self.state {
            AppState::Loading => {
                if self.session.snapshot().has_data() {
                    info!(api = %self.config.api_url, "first snapshot received");
                    let mut model = ViewModel::new(self.config.interval);
                    if self.config.autostart {
                        if let Err(error) = self.session.start(self.config.interval, now) {
                            warn!(%error, "autostart rejected");
                            model.clock_error = Some(error.to_string());
                        }
                    }
                    transition = Some(AppState::Ready(Box::new(model)));
                } else if !self.session.is_refreshing() {
                    if let Some(failure) = self.session.store().failure() {
                        transition = Some(AppState::Error(failure.error.to_string()));
                    }
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading traffic network...");
                        ui.add_space(8.0);
                        ui.label(self.config.api_url.as_str());
                        ui.spinner();
                    });
                });
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load the traffic network");
                    ui.add_space(6.0);
                    ui.label(format!("Simulation server: {}", self.config.api_url));
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    retry = ui.button("Retry").clicked();
                });
            }
            AppState::Ready(model) => {
                model.show(ctx, &mut self.session, &self.config.api_url, now);
            }
        }

        if retry {
            transition = Some(self.retry());
        }
        if let Some(next_state) = transition {
            self.state = next_state;
        }

        if let Some(wait) = self.session.next_wake(Instant::now()) {
            ctx.request_repaint_after(wait);
        }
    }
}

impl ViewModel {
    fn new(interval: Duration) -> Self {
        Self {
            viewport: Viewport::default(),
            layers: LayerFlags::default(),
            selected: None,
            interval_secs: interval.as_secs_f32(),
            step_count: 1,
            incident: IncidentForm {
                location: String::new(),
                kind: IncidentKind::Accident,
                duration: ui::DEFAULT_INCIDENT_DURATION,
            },
            light_filter: String::new(),
            light_editor: None,
            route_start: String::new(),
            route_end: String::new(),
            history_window: HistoryWindow::default(),
            clock_error: None,
            last_report: RenderReport::default(),
        }
    }

    fn set_selected(&mut self, selected: Option<String>) {
        if self.selected == selected {
            return;
        }
        if let Some(id) = &selected {
            self.incident.location = id.clone();
        }
        self.selected = selected;
    }
}
