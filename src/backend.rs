// Map backends: one adapter trait, two implementations picked by `Backend`
use crossbeam_channel::{Receiver, TryRecvError, bounded};
use eframe::egui;
use std::fmt;
use std::sync::Arc;
use std::thread;
use thiserror::Error;

use crate::config::Config;
use crate::geometry::{GeometryCache, RouteGeometry};
use crate::route::{self, MapPosition, RouteCoordinate, RouteLocation};

pub mod hosted;
pub mod paint;
pub mod style;
pub mod vector;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Backend {
    /// Raster tiles from a hosted map service, redrawn declaratively every frame
    #[value(name = "hosted")]
    HostedTile,
    /// Style-driven map instance with a mutable route source
    #[value(name = "vector")]
    VectorTile,
}

impl Backend {
    pub const ALL: [Backend; 2] = [Backend::HostedTile, Backend::VectorTile];
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::HostedTile => write!(f, "Google Maps"),
            Backend::VectorTile => write!(f, "Ola Maps"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    NotReady,
    Ready,
}

#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("no API key configured for {0}")]
    MissingCredential(Backend),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{what} request failed with HTTP {status}")]
    Status { what: &'static str, status: u16 },

    #[error("invalid {what}: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to start loader thread: {0}")]
    Thread(#[from] std::io::Error),

    #[error("loader thread exited without a result")]
    Abandoned,
}

/// What a backend draws in one pass: the resolved current position and the
/// memoized geometry of the path.
#[derive(Debug, Clone)]
pub struct RouteScene {
    pub position: Option<MapPosition>,
    pub geometry: Arc<RouteGeometry>,
}

/// Identity of a scene's inputs; equal keys mean nothing to redraw imperatively.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneKey {
    generation: u64,
    position: Option<MapPosition>,
}

impl RouteScene {
    pub fn resolve(
        location: Option<&RouteLocation>,
        route: &[RouteCoordinate],
        cache: &mut GeometryCache,
    ) -> Self {
        Self { position: route::current_position(location, route), geometry: cache.update(route) }
    }

    pub fn key(&self) -> SceneKey {
        SceneKey { generation: self.geometry.generation(), position: self.position }
    }
}

/// A map backend bound to one view.
///
/// `initialize` may start background work; until it finishes `readiness` is
/// `NotReady` and `render` draws a loading placeholder. `teardown` releases
/// every renderer-owned resource and must run before another adapter takes
/// over the same view.
pub trait MapAdapter {
    fn backend(&self) -> Backend;
    fn initialize(&mut self, ctx: &egui::Context);
    fn readiness(&mut self) -> Readiness;
    fn render(&mut self, ui: &mut egui::Ui, scene: &RouteScene);
    fn teardown(&mut self);
}

pub fn create_adapter(backend: Backend, config: &Config) -> Box<dyn MapAdapter> {
    let policy = config.map.camera_policy();
    match backend {
        Backend::HostedTile => Box::new(hosted::HostedAdapter::new(config.hosted.clone(), policy)),
        Backend::VectorTile => Box::new(vector::VectorAdapter::new(config.vector.clone(), policy)),
    }
}

/// Spinner shown while a backend is not ready, or forever when it cannot be.
pub fn loading_placeholder(ui: &mut egui::Ui) {
    let size = egui::vec2(ui.available_width(), 400.0);
    ui.allocate_ui_with_layout(size, egui::Layout::centered_and_justified(egui::Direction::TopDown), |ui| {
        ui.spinner();
    });
}

/// One-shot background initialization of a backend.
pub(crate) enum Startup<T> {
    Idle,
    /// No credential; stays here for good
    Unconfigured,
    Pending(Receiver<Result<T, AdapterError>>),
    Failed,
    Done,
}

impl<T: Send + 'static> Startup<T> {
    pub(crate) fn spawn<F>(name: &str, ctx: &egui::Context, job: F) -> Self
    where
        F: FnOnce() -> Result<T, AdapterError> + Send + 'static,
    {
        let (tx, rx) = bounded(1);
        let ctx = ctx.clone();
        let spawned = thread::Builder::new().name(name.to_string()).spawn(move || {
            // The receiver is gone if the adapter was torn down meanwhile
            let _ = tx.send(job());
            ctx.request_repaint();
        });
        match spawned {
            Ok(_) => Startup::Pending(rx),
            Err(e) => {
                tracing::error!("[BACKEND] {}: {}", name, AdapterError::from(e));
                Startup::Failed
            }
        }
    }

    /// Hands out the initialization result once, when it arrives.
    pub(crate) fn poll(&mut self) -> Option<T> {
        let Startup::Pending(rx) = self else {
            return None;
        };
        let result = match rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Err(AdapterError::Abandoned),
        };
        match result {
            Ok(value) => {
                *self = Startup::Done;
                Some(value)
            }
            Err(e) => {
                tracing::error!("[BACKEND] initialization failed: {}", e);
                *self = Startup::Failed;
                None
            }
        }
    }

    pub(crate) fn is_idle(&self) -> bool {
        matches!(self, Startup::Idle)
    }
}
