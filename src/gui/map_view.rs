// The map area of the window: owns the active backend adapter and its lifecycle
use eframe::egui;

use crate::backend::{self, Backend, MapAdapter, Readiness, RouteScene};
use crate::config::Config;
use crate::geometry::GeometryCache;
use crate::route::{RouteCoordinate, RouteLocation};

pub struct MapView {
    adapter: Box<dyn MapAdapter>,
    cache: GeometryCache,
    config: Config,
}

impl MapView {
    pub fn new(backend: Backend, config: &Config, ctx: &egui::Context) -> Self {
        let mut adapter = backend::create_adapter(backend, config);
        adapter.initialize(ctx);
        Self { adapter, cache: GeometryCache::new(), config: config.clone() }
    }

    pub fn backend(&self) -> Backend {
        self.adapter.backend()
    }

    pub fn readiness(&mut self) -> Readiness {
        self.adapter.readiness()
    }

    /// Replace the adapter. The old one is fully torn down before the new one exists.
    pub fn switch(&mut self, backend: Backend, ctx: &egui::Context) {
        if backend == self.backend() {
            return;
        }
        tracing::info!("[MAP] switching {} -> {}", self.backend(), backend);
        self.adapter.teardown();
        let mut next = backend::create_adapter(backend, &self.config);
        next.initialize(ctx);
        self.adapter = next;
    }

    /// Derive the scene for this pass; geometry is reused while the route is unchanged.
    pub fn scene(&mut self, location: Option<&RouteLocation>, route: &[RouteCoordinate]) -> RouteScene {
        RouteScene::resolve(location, route, &mut self.cache)
    }

    pub fn show(&mut self, ui: &mut egui::Ui, location: Option<&RouteLocation>, route: &[RouteCoordinate]) {
        let scene = self.scene(location, route);
        self.adapter.render(ui, &scene);
    }
}

impl Drop for MapView {
    fn drop(&mut self) {
        self.adapter.teardown();
    }
}
