// Hosted-tile backend: raster tiles behind a session token; markers and the
// route line are described again on every pass and drawn by a plugin
use eframe::egui;
use serde::Deserialize;
use walkers::sources::{Attribution, TileSource};
use walkers::{HttpTiles, Map, MapMemory, Plugin, Projector, TileId};

use super::paint::{self, LinePaint};
use super::{AdapterError, Backend, MapAdapter, Readiness, RouteScene, Startup};
use crate::camera::CameraPolicy;
use crate::config::HostedConfig;
use crate::markers::{self, MarkerSpec};
use crate::route::MapPosition;

/// Tile session returned by `createSession`; must accompany every tile request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileSession {
    pub session: String,
    #[serde(default)]
    pub expiry: Option<String>,
    #[serde(default = "default_tile_width")]
    pub tile_width: u32,
}

fn default_tile_width() -> u32 {
    256
}

fn create_session(config: &HostedConfig) -> Result<TileSession, AdapterError> {
    let client = reqwest::blocking::Client::new();
    let response = client
        .post(&config.session_url)
        .query(&[("key", config.api_key.as_str())])
        .json(&serde_json::json!({
            "mapType": config.map_type,
            "language": config.language,
            "region": config.region,
        }))
        .send()?;
    let status = response.status();
    if !status.is_success() {
        return Err(AdapterError::Status { what: "tile session", status: status.as_u16() });
    }
    let body = response.text()?;
    serde_json::from_str(&body).map_err(|source| AdapterError::Decode { what: "tile session", source })
}

pub struct SessionTiles {
    template: String,
    session: String,
    api_key: String,
    tile_size: u32,
}

impl SessionTiles {
    fn url_for(&self, zoom: u8, x: u32, y: u32) -> String {
        let base = self
            .template
            .replace("{z}", &zoom.to_string())
            .replace("{x}", &x.to_string())
            .replace("{y}", &y.to_string());
        format!("{}?session={}&key={}", base, self.session, self.api_key)
    }
}

impl TileSource for SessionTiles {
    fn tile_url(&self, tile_id: TileId) -> String {
        self.url_for(tile_id.zoom, tile_id.x, tile_id.y)
    }

    fn attribution(&self) -> Attribution {
        Attribution {
            text: "Map data © Google",
            url: "https://www.google.com/intl/en_us/help/terms_maps/",
            logo_light: None,
            logo_dark: None,
        }
    }

    fn tile_size(&self) -> u32 {
        self.tile_size
    }

    fn max_zoom(&self) -> u8 {
        21
    }
}

/// One visual element of a pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Overlay {
    Polyline { path: Vec<MapPosition>, paint: LinePaint },
    Marker(MarkerSpec),
}

/// Everything the hosted map shows for `scene`: the full polyline with start
/// and end markers for a path of two or more points, otherwise one marker at
/// the current position if there is one.
pub fn describe_overlays(scene: &RouteScene) -> Vec<Overlay> {
    let mut overlays = Vec::with_capacity(3);
    if scene.geometry.has_line() {
        overlays.push(Overlay::Polyline {
            path: scene.geometry.line_path().to_vec(),
            paint: LinePaint::ROUTE,
        });
    }
    overlays.extend(markers::route_markers(scene.position, &scene.geometry).into_iter().map(Overlay::Marker));
    overlays
}

struct OverlayPlugin {
    overlays: Vec<Overlay>,
}

impl Plugin for OverlayPlugin {
    fn run(
        self: Box<Self>,
        ui: &mut egui::Ui,
        _response: &egui::Response,
        projector: &Projector,
        _memory: &MapMemory,
    ) {
        let painter = ui.painter();
        let to_screen = |p: MapPosition| {
            let v = projector.project(p.to_walkers());
            egui::pos2(v.x, v.y)
        };
        for overlay in &self.overlays {
            match overlay {
                Overlay::Polyline { path, paint } => {
                    let points: Vec<egui::Pos2> = path.iter().map(|p| to_screen(*p)).collect();
                    paint::paint_line(painter, &points, paint);
                }
                Overlay::Marker(marker) => paint::paint_marker(painter, to_screen(marker.position), marker),
            }
        }
    }
}

pub struct HostedAdapter {
    config: HostedConfig,
    policy: CameraPolicy,
    startup: Startup<TileSession>,
    tiles: Option<HttpTiles>,
    memory: MapMemory,
}

impl HostedAdapter {
    pub fn new(config: HostedConfig, policy: CameraPolicy) -> Self {
        Self { config, policy, startup: Startup::Idle, tiles: None, memory: MapMemory::default() }
    }

    fn mount(&mut self, session: TileSession, ctx: &egui::Context) {
        tracing::debug!("[HOSTED] tile session ready (expires {:?})", session.expiry);
        let source = SessionTiles {
            template: self.config.tile_url.clone(),
            session: session.session,
            api_key: self.config.api_key.clone(),
            tile_size: session.tile_width,
        };
        self.tiles = Some(HttpTiles::new(source, ctx.clone()));
        self.memory = MapMemory::default();
        if self.memory.set_zoom(self.policy.zoom).is_err() {
            tracing::warn!("[HOSTED] zoom {} rejected", self.policy.zoom);
        }
    }
}

impl MapAdapter for HostedAdapter {
    fn backend(&self) -> Backend {
        Backend::HostedTile
    }

    fn initialize(&mut self, ctx: &egui::Context) {
        if !self.startup.is_idle() {
            return;
        }
        if self.config.api_key.trim().is_empty() {
            tracing::warn!("[HOSTED] {}", AdapterError::MissingCredential(Backend::HostedTile));
            self.startup = Startup::Unconfigured;
            return;
        }
        let config = self.config.clone();
        self.startup = Startup::spawn("hosted-session", ctx, move || create_session(&config));
    }

    fn readiness(&mut self) -> Readiness {
        if self.tiles.is_some() { Readiness::Ready } else { Readiness::NotReady }
    }

    fn render(&mut self, ui: &mut egui::Ui, scene: &RouteScene) {
        if let Some(session) = self.startup.poll() {
            self.mount(session, ui.ctx());
        }
        let Some(tiles) = self.tiles.as_mut() else {
            super::loading_placeholder(ui);
            return;
        };

        let center = self.policy.center(scene.position);
        let map = Map::new(Some(tiles), &mut self.memory, center.to_walkers())
            .with_plugin(OverlayPlugin { overlays: describe_overlays(scene) });
        ui.add(map);
    }

    fn teardown(&mut self) {
        if self.tiles.take().is_some() {
            tracing::debug!("[HOSTED] tile session released");
        }
        self.startup = Startup::Idle;
        self.memory = MapMemory::default();
    }
}

impl Drop for HostedAdapter {
    fn drop(&mut self) {
        self.teardown();
    }
}
