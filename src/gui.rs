use eframe::egui;

use crate::backend::{Backend, Readiness};
use crate::config::Config;
use crate::feed::{FeedEvent, RouteFeed};
use crate::position;
use crate::route::{RouteCoordinate, RouteLocation};

mod map_view;

use map_view::MapView;

const HEADER_BG: egui::Color32 = egui::Color32::from_rgb(0x1e, 0x29, 0x3b);

/// Route data as last reported by the feed. Earlier data is kept when a refresh fails.
#[derive(Default)]
struct RouteData {
    location: Option<RouteLocation>,
    route: Vec<RouteCoordinate>,
    location_answered: bool,
    coordinates_answered: bool,
    location_error: Option<String>,
    coordinates_error: Option<String>,
}

impl RouteData {
    fn apply(&mut self, event: FeedEvent) {
        match event {
            FeedEvent::Location(Ok(location)) => {
                self.location = location;
                self.location_error = None;
                self.location_answered = true;
            }
            FeedEvent::Location(Err(e)) => {
                self.location_error = Some(e.to_string());
                self.location_answered = true;
            }
            FeedEvent::Coordinates(Ok(route)) => {
                self.route = route;
                self.coordinates_error = None;
                self.coordinates_answered = true;
            }
            FeedEvent::Coordinates(Err(e)) => {
                self.coordinates_error = Some(e.to_string());
                self.coordinates_answered = true;
            }
        }
    }

    fn error(&self) -> Option<&str> {
        self.location_error.as_deref().or(self.coordinates_error.as_deref())
    }
}

pub struct TourMapApp {
    tour_id: String,
    api_configured: bool,
    feed: Option<RouteFeed>,
    data: RouteData,
    view: MapView,
}

impl TourMapApp {
    fn new(ctx: &egui::Context, config: Config, tour_id: String, backend: Backend) -> Self {
        let feed = match RouteFeed::spawn(&config.api_base_url, &tour_id, config.poll_interval(), ctx.clone()) {
            Ok(feed) => Some(feed),
            Err(e) => {
                tracing::warn!("[GUI] route feed disabled: {}", e);
                None
            }
        };
        Self {
            api_configured: config.api_configured(),
            view: MapView::new(backend, &config, ctx),
            tour_id,
            feed,
            data: RouteData::default(),
        }
    }

    fn is_loading(&self) -> bool {
        self.feed.is_some() && !(self.data.location_answered && self.data.coordinates_answered)
    }

    fn route_summary(&mut self) -> String {
        let scene = self.view.scene(self.data.location.as_ref(), &self.data.route);
        let g = &scene.geometry;
        let mut summary = format!("{} points", g.len());
        if g.has_line() {
            summary.push_str(&format!(" · {}", position::format_distance(g.length_m())));
            if let Some(bearing) = position::last_heading(g.points()) {
                summary.push_str(&format!(" · heading {}", position::format_bearing(bearing)));
            }
        }
        summary
    }

    pub fn run(config: Config, tour_id: String, backend: Backend) -> Result<(), eframe::Error> {
        let width = config.map.width.unwrap_or(1280) as f32;
        let height = config.map.height.unwrap_or(800) as f32;
        let title = format!("{} v{} | Tour #{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"), tour_id);

        let options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size([width, height])
                .with_title(title),
            ..Default::default()
        };

        eframe::run_native(
            "tourmap",
            options,
            Box::new(move |cc| Ok(Box::new(TourMapApp::new(&cc.egui_ctx, config, tour_id, backend)))),
        )
    }
}

impl eframe::App for TourMapApp {
    // Required by eframe 0.34; all drawing happens in `update`, which eframe still calls before `ui`.
    fn ui(&mut self, _ui: &mut egui::Ui, _frame: &mut eframe::Frame) {}

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if let Some(feed) = &self.feed {
            for event in feed.poll() {
                self.data.apply(event);
            }
        }

        let mut summary = self.route_summary();
        if self.view.readiness() == Readiness::NotReady {
            summary.push_str(" · map loading");
        }
        let mut selected = self.view.backend();

        egui::TopBottomPanel::top("header")
            .frame(egui::Frame::default().fill(HEADER_BG).inner_margin(10.0))
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading(
                        egui::RichText::new(format!("Route Location View - Tour #{}", self.tour_id))
                            .color(egui::Color32::WHITE),
                    );
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        egui::ComboBox::from_id_salt("backend")
                            .selected_text(selected.to_string())
                            .show_ui(ui, |ui| {
                                for backend in Backend::ALL {
                                    ui.selectable_value(&mut selected, backend, backend.to_string());
                                }
                            });
                        ui.label(egui::RichText::new(summary).color(egui::Color32::LIGHT_GRAY));
                    });
                });
            });

        if selected != self.view.backend() {
            self.view.switch(selected, ctx);
        }

        let loading = self.is_loading();
        egui::CentralPanel::default().show(ctx, |ui| {
            if !self.api_configured {
                ui.colored_label(
                    egui::Color32::from_rgb(0xED, 0x6C, 0x02),
                    "API not configured. Set api_base_url in tourmap.conf to load route data.",
                );
            }
            if let Some(error) = self.data.error() {
                ui.colored_label(egui::Color32::from_rgb(0xD3, 0x2F, 0x2F), format!("Error loading map data: {}", error));
            }

            if loading {
                crate::backend::loading_placeholder(ui);
            } else {
                self.view.show(ui, self.data.location.as_ref(), &self.data.route);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::FeedError;

    #[test]
    fn test_failed_refresh_keeps_last_data() {
        let mut data = RouteData::default();
        data.apply(FeedEvent::Location(Ok(Some(RouteLocation::at(1.0, 2.0)))));
        data.apply(FeedEvent::Coordinates(Ok(vec![RouteCoordinate::new(1.0, 2.0)])));
        assert!(data.error().is_none());

        data.apply(FeedEvent::Location(Err(FeedError::Status { what: "route location", status: 502 })));
        assert_eq!(data.location, Some(RouteLocation::at(1.0, 2.0)));
        assert!(data.error().unwrap().contains("502"));

        data.apply(FeedEvent::Location(Ok(None)));
        assert_eq!(data.location, None);
        assert!(data.error().is_none());
        assert!(data.location_answered && data.coordinates_answered);
    }

    #[test]
    fn test_summary_ignores_stationary_fixes() {
        let ctx = egui::Context::default();
        let mut app = TourMapApp::new(&ctx, Config::default(), "1".to_string(), Backend::HostedTile);
        assert!(app.feed.is_none());

        let fix = RouteCoordinate::new(60.1, 25.0);
        app.data.route = vec![RouteCoordinate::new(60.0, 25.0), fix, fix];
        let summary = app.route_summary();
        assert!(summary.starts_with("3 points"), "{}", summary);
        assert!(summary.contains("heading") && summary.ends_with("° N"), "{}", summary);

        app.data.route = vec![fix, fix];
        assert!(!app.route_summary().contains("heading"));
    }
}
