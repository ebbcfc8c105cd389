// Vector-tile backend: a style-driven map instance with a named route source,
// a line layer on top of it, and markers owned by a MarkerSet
use eframe::egui;
use geo::LineString;
use std::collections::BTreeMap;
use walkers::{HttpTiles, Map, MapMemory, Plugin, Position, Projector};

use super::paint::{self, LinePaint};
use super::style::{self, RequestTransform, StyleDocument, TemplateTiles};
use super::{AdapterError, Backend, MapAdapter, Readiness, RouteScene, SceneKey, Startup};
use crate::camera::{self, CameraCommand, CameraPolicy};
use crate::config::VectorConfig;
use crate::markers::{self, MarkerHost, MarkerSet, MarkerSpec};
use crate::route::MapPosition;

pub const ROUTE_SOURCE_ID: &str = "route-line";
pub const ROUTE_LAYER_ID: &str = "route-line-layer";

/// GeoJSON source holding one LineString in (lng, lat).
#[derive(Debug, Clone, PartialEq)]
pub struct GeoJsonSource {
    data: LineString<f64>,
    revision: u64,
}

impl GeoJsonSource {
    pub fn new(data: LineString<f64>) -> Self {
        Self { data, revision: 0 }
    }

    pub fn data(&self) -> &LineString<f64> {
        &self.data
    }

    /// Number of `set_data` calls since creation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn to_geojson(&self) -> serde_json::Value {
        let coordinates: Vec<[f64; 2]> = self.data.coords().map(|c| [c.x, c.y]).collect();
        serde_json::json!({
            "type": "Feature",
            "properties": {},
            "geometry": { "type": "LineString", "coordinates": coordinates },
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineLayer {
    pub id: String,
    pub source: String,
    pub paint: LinePaint,
}

pub type MarkerId = u64;

/// Retained content of a vector map instance: sources, layers, markers.
#[derive(Debug, Default)]
pub struct MapScene {
    sources: BTreeMap<String, GeoJsonSource>,
    layers: Vec<LineLayer>,
    markers: BTreeMap<MarkerId, MarkerSpec>,
    next_marker: MarkerId,
}

impl MapScene {
    pub fn source(&self, id: &str) -> Option<&GeoJsonSource> {
        self.sources.get(id)
    }

    /// Add a source; an existing source with the same id is left untouched.
    pub fn add_source(&mut self, id: &str, source: GeoJsonSource) -> bool {
        if self.sources.contains_key(id) {
            tracing::warn!("[VECTOR] source {:?} already exists", id);
            return false;
        }
        self.sources.insert(id.to_string(), source);
        true
    }

    /// Replace only the geometry of an existing source.
    pub fn set_source_data(&mut self, id: &str, data: LineString<f64>) -> bool {
        match self.sources.get_mut(id) {
            Some(source) => {
                source.data = data;
                source.revision += 1;
                true
            }
            None => false,
        }
    }

    pub fn layer(&self, id: &str) -> Option<&LineLayer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn add_layer(&mut self, layer: LineLayer) -> bool {
        if self.layer(&layer.id).is_some() {
            tracing::warn!("[VECTOR] layer {:?} already exists", layer.id);
            return false;
        }
        self.layers.push(layer);
        true
    }

    pub fn layers(&self) -> &[LineLayer] {
        &self.layers
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn markers(&self) -> impl Iterator<Item = &MarkerSpec> {
        self.markers.values()
    }
}

impl MarkerHost for MapScene {
    type Handle = MarkerId;

    fn add_marker(&mut self, marker: &MarkerSpec) -> MarkerId {
        self.next_marker += 1;
        self.markers.insert(self.next_marker, *marker);
        self.next_marker
    }

    fn remove_marker(&mut self, handle: MarkerId) {
        self.markers.remove(&handle);
    }
}

/// Bring `scene` in line with `input`: route source and layer (created once,
/// then updated in place), markers, and the camera framing to apply.
pub(crate) fn sync_scene(
    scene: &mut MapScene,
    markers: &mut MarkerSet<MarkerId>,
    input: &RouteScene,
    policy: &CameraPolicy,
) -> CameraCommand {
    let geometry = &input.geometry;
    // Axis swap to (lng, lat) happens here and nowhere upstream
    let line = LineString::from(geometry.line_path_lng_lat());

    if geometry.has_line() {
        if scene.source(ROUTE_SOURCE_ID).is_none() {
            scene.add_source(ROUTE_SOURCE_ID, GeoJsonSource::new(line));
        } else {
            scene.set_source_data(ROUTE_SOURCE_ID, line);
        }
        if scene.layer(ROUTE_LAYER_ID).is_none() {
            scene.add_layer(LineLayer {
                id: ROUTE_LAYER_ID.to_string(),
                source: ROUTE_SOURCE_ID.to_string(),
                paint: LinePaint::ROUTE,
            });
        }
    } else if scene.source(ROUTE_SOURCE_ID).is_some_and(|s| s.data().0.len() > 1) {
        // Path shrank below two points: drop the drawn line, keep the layer
        scene.set_source_data(ROUTE_SOURCE_ID, line);
    }

    if let Some(source) = scene.source(ROUTE_SOURCE_ID) {
        tracing::debug!("[VECTOR] {} rev={} {}", ROUTE_SOURCE_ID, source.revision(), source.to_geojson());
    }

    markers.replace_all(scene, &markers::route_markers(input.position, geometry));
    tracing::debug!("[VECTOR] synced: {} markers, {} sources", markers.len(), scene.source_count());
    policy.frame(input.position, geometry)
}

struct ScenePlugin<'a> {
    scene: &'a MapScene,
}

impl Plugin for ScenePlugin<'_> {
    fn run(
        self: Box<Self>,
        ui: &mut egui::Ui,
        _response: &egui::Response,
        projector: &Projector,
        _memory: &MapMemory,
    ) {
        let painter = ui.painter();
        for layer in self.scene.layers() {
            let Some(source) = self.scene.source(&layer.source) else {
                continue;
            };
            let points: Vec<egui::Pos2> = source
                .data()
                .coords()
                .map(|c| {
                    let v = projector.project(walkers::lon_lat(c.x, c.y));
                    egui::pos2(v.x, v.y)
                })
                .collect();
            paint::paint_line(painter, &points, &layer.paint);
        }
        for marker in self.scene.markers() {
            let v = projector.project(marker.position.to_walkers());
            paint::paint_marker(painter, egui::pos2(v.x, v.y), marker);
        }
    }
}

/// One map instance: tiles, camera memory and the retained scene.
pub struct VectorMap {
    scene: MapScene,
    tiles: HttpTiles,
    memory: MapMemory,
    position: Position,
    tile_size: f64,
    max_zoom: f64,
    style_loaded: bool,
}

impl VectorMap {
    fn new(
        style: &StyleDocument,
        config: &VectorConfig,
        transform: RequestTransform,
        center: MapPosition,
        zoom: f64,
        ctx: &egui::Context,
    ) -> Self {
        let source = match &style.raster_tiles {
            Some(template) => TemplateTiles {
                template: template.clone(),
                transform: Some(transform),
                tile_size: style.tile_size,
                max_zoom: style.max_zoom,
                attribution: ("Ola Maps", "https://maps.olakrutrim.com"),
            },
            None => {
                tracing::info!(
                    "[VECTOR] style {:?} declares no raster source, drawing fallback tiles {}",
                    style.name.as_deref().unwrap_or("(unnamed)"),
                    config.fallback_tiles
                );
                TemplateTiles {
                    template: config.fallback_tiles.clone(),
                    transform: None,
                    tile_size: 256,
                    max_zoom: 19,
                    attribution: ("OpenStreetMap contributors", "https://www.openstreetmap.org/copyright"),
                }
            }
        };
        let tile_size = f64::from(source.tile_size);
        let max_zoom = f64::from(source.max_zoom);

        let mut memory = MapMemory::default();
        if memory.set_zoom(zoom).is_err() {
            tracing::warn!("[VECTOR] initial zoom {} rejected", zoom);
        }

        Self {
            scene: MapScene::default(),
            tiles: HttpTiles::new(source, ctx.clone()),
            memory,
            position: center.to_walkers(),
            tile_size,
            max_zoom,
            style_loaded: false,
        }
    }

    /// True once the first frame with the style has been drawn.
    pub fn is_style_loaded(&self) -> bool {
        self.style_loaded
    }

    fn apply_camera(&mut self, command: CameraCommand, viewport: egui::Vec2) {
        let (center, zoom) = match command {
            CameraCommand::Fit { bounds, padding } => {
                let vp = camera::fit_bounds(&bounds, viewport.x, viewport.y, padding, self.tile_size, self.max_zoom);
                (vp.center, vp.zoom)
            }
            CameraCommand::Center { center, zoom } => (center, zoom),
        };
        self.position = center.to_walkers();
        self.memory.center_at(self.position);
        if self.memory.set_zoom(zoom).is_err() {
            tracing::warn!("[VECTOR] zoom {} rejected", zoom);
        }
    }

    fn show(&mut self, ui: &mut egui::Ui) {
        let map = Map::new(Some(&mut self.tiles), &mut self.memory, self.position)
            .with_plugin(ScenePlugin { scene: &self.scene });
        let response = ui.add(map);
        self.style_loaded = true;

        // Navigation control, bottom right
        let size = egui::vec2(28.0, 28.0);
        let zoom_in = egui::Rect::from_min_size(response.rect.right_bottom() - egui::vec2(40.0, 76.0), size);
        let zoom_out = egui::Rect::from_min_size(response.rect.right_bottom() - egui::vec2(40.0, 44.0), size);
        if ui.put(zoom_in, egui::Button::new("+")).clicked() {
            let _ = self.memory.zoom_in();
        }
        if ui.put(zoom_out, egui::Button::new("−")).clicked() {
            let _ = self.memory.zoom_out();
        }
    }
}

pub struct VectorAdapter {
    config: VectorConfig,
    policy: CameraPolicy,
    startup: Startup<StyleDocument>,
    map: Option<VectorMap>,
    markers: MarkerSet<MarkerId>,
    synced: Option<SceneKey>,
}

impl VectorAdapter {
    pub fn new(config: VectorConfig, policy: CameraPolicy) -> Self {
        Self {
            config,
            policy,
            startup: Startup::Idle,
            map: None,
            markers: MarkerSet::new(),
            synced: None,
        }
    }

    fn transform(&self) -> RequestTransform {
        RequestTransform {
            alias_from: self.config.host_alias_from.clone(),
            alias_to: self.config.host_alias_to.clone(),
            api_key: self.config.api_key.clone(),
        }
    }

    fn mount(&mut self, style: StyleDocument, ctx: &egui::Context, scene: &RouteScene) {
        tracing::debug!("[VECTOR] style {:?} loaded, creating map instance", style.name);
        let center = self.policy.center(scene.position);
        self.map = Some(VectorMap::new(&style, &self.config, self.transform(), center, self.policy.zoom, ctx));
        self.synced = None;
    }
}

impl MapAdapter for VectorAdapter {
    fn backend(&self) -> Backend {
        Backend::VectorTile
    }

    fn initialize(&mut self, ctx: &egui::Context) {
        if !self.startup.is_idle() {
            return;
        }
        if self.config.api_key.trim().is_empty() {
            tracing::warn!("[VECTOR] {}", AdapterError::MissingCredential(Backend::VectorTile));
            self.startup = Startup::Unconfigured;
            return;
        }
        let url = self.config.style_url();
        let transform = self.transform();
        tracing::debug!("[VECTOR] fetching style {}", url);
        self.startup = Startup::spawn("vector-style", ctx, move || style::fetch_style(&url, &transform));
    }

    fn readiness(&mut self) -> Readiness {
        if self.map.is_some() { Readiness::Ready } else { Readiness::NotReady }
    }

    fn render(&mut self, ui: &mut egui::Ui, scene: &RouteScene) {
        if let Some(style) = self.startup.poll() {
            self.mount(style, ui.ctx(), scene);
        }
        let Some(map) = self.map.as_mut() else {
            super::loading_placeholder(ui);
            return;
        };

        // Before the style is drawn there is nothing to mutate; the next pass retries
        if map.is_style_loaded() && self.synced != Some(scene.key()) {
            let command = sync_scene(&mut map.scene, &mut self.markers, scene, &self.policy);
            map.apply_camera(command, ui.available_size());
            self.synced = Some(scene.key());
        }
        map.show(ui);
    }

    fn teardown(&mut self) {
        if let Some(mut map) = self.map.take() {
            if !self.markers.is_empty() {
                tracing::debug!("[VECTOR] removing {} markers", self.markers.len());
                self.markers.clear(&mut map.scene);
            }
            tracing::debug!("[VECTOR] map instance destroyed");
        }
        // A pending style fetch finds its receiver gone
        self.startup = Startup::Idle;
        self.synced = None;
    }
}

impl Drop for VectorAdapter {
    fn drop(&mut self) {
        self.teardown();
    }
}
