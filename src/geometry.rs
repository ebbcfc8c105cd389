// Renderer-agnostic geometry derived from a tour path
use crate::position;
use crate::route::{MapPosition, RouteCoordinate};
use std::sync::Arc;

/// Axis-aligned bounding region in (lat, lng).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    pub fn from_point(p: MapPosition) -> Self {
        Self { min_lat: p.lat, max_lat: p.lat, min_lng: p.lng, max_lng: p.lng }
    }

    pub fn extend(mut self, p: MapPosition) -> Self {
        self.min_lat = self.min_lat.min(p.lat);
        self.max_lat = self.max_lat.max(p.lat);
        self.min_lng = self.min_lng.min(p.lng);
        self.max_lng = self.max_lng.max(p.lng);
        self
    }

    #[cfg(test)]
    pub fn contains(&self, p: MapPosition) -> bool {
        (self.min_lat..=self.max_lat).contains(&p.lat)
            && (self.min_lng..=self.max_lng).contains(&p.lng)
    }

    #[cfg(test)]
    pub fn is_degenerate(&self) -> bool {
        self.min_lat == self.max_lat && self.min_lng == self.max_lng
    }
}

/// Geometry of one path. Built once per distinct input, see [`GeometryCache`].
#[derive(Debug, Clone, PartialEq)]
pub struct RouteGeometry {
    points: Vec<MapPosition>,
    bounds: Option<Bounds>,
    generation: u64,
}

impl RouteGeometry {
    pub fn build(route: &[RouteCoordinate]) -> Self {
        Self::with_generation(route, 0)
    }

    fn with_generation(route: &[RouteCoordinate], generation: u64) -> Self {
        let points: Vec<MapPosition> = route.iter().map(RouteCoordinate::position).collect();
        let bounds = points
            .split_first()
            .map(|(first, rest)| rest.iter().fold(Bounds::from_point(*first), |b, p| b.extend(*p)));
        Self { points, bounds, generation }
    }

    pub fn points(&self) -> &[MapPosition] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Drawable line in (lat, lng); empty unless the path has at least two points.
    pub fn line_path(&self) -> &[MapPosition] {
        if self.has_line() { &self.points } else { &[] }
    }

    pub fn has_line(&self) -> bool {
        self.points.len() > 1
    }

    /// Line with swapped axes for engines that speak (lng, lat).
    pub fn line_path_lng_lat(&self) -> Vec<[f64; 2]> {
        self.line_path().iter().map(|p| [p.lng, p.lat]).collect()
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    pub fn start(&self) -> Option<MapPosition> {
        self.points.first().copied()
    }

    pub fn end(&self) -> Option<MapPosition> {
        self.points.last().copied()
    }

    /// Geodesic length in meters.
    pub fn length_m(&self) -> f64 {
        position::path_length(&self.points)
    }

    /// Changes whenever the cache rebuilt the geometry from a different input.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Default for RouteGeometry {
    fn default() -> Self {
        Self::build(&[])
    }
}

/// Memoizes [`RouteGeometry`] on its input so unchanged routes hand out the same `Arc`.
#[derive(Debug, Default)]
pub struct GeometryCache {
    input: Vec<RouteCoordinate>,
    current: Arc<RouteGeometry>,
    generation: u64,
}

impl GeometryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, route: &[RouteCoordinate]) -> Arc<RouteGeometry> {
        if self.input != route {
            self.generation += 1;
            self.input = route.to_vec();
            self.current = Arc::new(RouteGeometry::with_generation(route, self.generation));
            tracing::debug!(
                "[GEOMETRY] rebuilt gen={} points={}",
                self.generation,
                self.current.len()
            );
        }
        Arc::clone(&self.current)
    }
}
