// Camera framing for route views
use crate::geometry::{Bounds, RouteGeometry};
use crate::route::MapPosition;
use std::f64::consts::PI;

const MAX_MERCATOR_LAT: f64 = 85.051_128_78;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPolicy {
    pub default_center: MapPosition,
    pub zoom: f64,
    /// Padding around fitted bounds, in screen points
    pub fit_padding: f32,
}

impl Default for CameraPolicy {
    fn default() -> Self {
        Self { default_center: MapPosition::new(28.6139, 77.209), zoom: 14.0, fit_padding: 50.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraCommand {
    /// Frame the whole region; the zoom follows from the viewport size.
    Fit { bounds: Bounds, padding: f32 },
    Center { center: MapPosition, zoom: f64 },
}

impl CameraPolicy {
    /// Center used when a backend only knows how to center: live position, else the default.
    pub fn center(&self, position: Option<MapPosition>) -> MapPosition {
        position.unwrap_or(self.default_center)
    }

    /// Framing for backends that can fit bounds.
    pub fn frame(&self, position: Option<MapPosition>, geometry: &RouteGeometry) -> CameraCommand {
        match geometry.bounds() {
            Some(bounds) if geometry.has_line() => {
                CameraCommand::Fit { bounds, padding: self.fit_padding }
            }
            _ => CameraCommand::Center { center: self.center(position), zoom: self.zoom },
        }
    }
}

/// Resolved camera state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub center: MapPosition,
    pub zoom: f64,
}

// Web Mercator in unit square, y grows southwards
fn mercator_x(lng: f64) -> f64 {
    (lng + 180.0) / 360.0
}

fn mercator_y(lat: f64) -> f64 {
    let lat = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();
    (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0
}

fn mercator_lat(y: f64) -> f64 {
    (PI * (1.0 - 2.0 * y)).sinh().atan().to_degrees()
}

/// Zoom and center that frame `bounds` inside a `width` x `height` viewport,
/// leaving `padding` on every side.
pub fn fit_bounds(
    bounds: &Bounds,
    width: f32,
    height: f32,
    padding: f32,
    tile_size: f64,
    max_zoom: f64,
) -> Viewport {
    let west = mercator_x(bounds.min_lng);
    let east = mercator_x(bounds.max_lng);
    let north = mercator_y(bounds.max_lat);
    let south = mercator_y(bounds.min_lat);

    let avail_w = f64::from((width - 2.0 * padding).max(1.0));
    let avail_h = f64::from((height - 2.0 * padding).max(1.0));

    let zoom_for = |span: f64, avail: f64| {
        if span <= f64::EPSILON { max_zoom } else { (avail / (span * tile_size)).log2() }
    };
    let zoom = zoom_for(east - west, avail_w).min(zoom_for(south - north, avail_h)).clamp(0.0, max_zoom);

    let center = MapPosition::new(
        mercator_lat((north + south) / 2.0),
        (bounds.min_lng + bounds.max_lng) / 2.0,
    );
    Viewport { center, zoom }
}

/// Screen offset of `p` from the viewport center, in points.
pub fn screen_offset(viewport: &Viewport, p: MapPosition, tile_size: f64) -> (f64, f64) {
    let world = tile_size * 2f64.powf(viewport.zoom);
    (
        (mercator_x(p.lng) - mercator_x(viewport.center.lng)) * world,
        (mercator_y(p.lat) - mercator_y(viewport.center.lat)) * world,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::RouteCoordinate;

    fn geometry(points: &[(f64, f64)]) -> RouteGeometry {
        let route: Vec<_> = points.iter().map(|&(lat, lng)| RouteCoordinate::new(lat, lng)).collect();
        RouteGeometry::build(&route)
    }

    #[test]
    fn test_short_paths_center_at_fixed_zoom() {
        let policy = CameraPolicy::default();
        let here = MapPosition::new(12.9, 77.6);

        assert_eq!(
            policy.frame(None, &geometry(&[])),
            CameraCommand::Center { center: policy.default_center, zoom: 14.0 }
        );
        assert_eq!(
            policy.frame(Some(here), &geometry(&[(1.0, 1.0)])),
            CameraCommand::Center { center: here, zoom: 14.0 }
        );
    }

    #[test]
    fn test_long_paths_fit_bounds() {
        let policy = CameraPolicy::default();
        let g = geometry(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]);
        match policy.frame(Some(MapPosition::new(50.0, 50.0)), &g) {
            CameraCommand::Fit { bounds, padding } => {
                assert_eq!(bounds, g.bounds().unwrap());
                assert_eq!(padding, 50.0);
            }
            other => panic!("expected fit, got {:?}", other),
        }
    }

    #[test]
    fn test_fit_keeps_all_points_inside_padding() {
        let g = geometry(&[(28.60, 77.20), (28.62, 77.25), (28.55, 77.31), (28.70, 77.22), (28.64, 77.18)]);
        let (w, h, pad) = (800.0f32, 600.0f32, 50.0f32);
        let vp = fit_bounds(&g.bounds().unwrap(), w, h, pad, 256.0, 19.0);

        assert!(vp.zoom > 5.0 && vp.zoom < 19.0, "zoom {}", vp.zoom);
        for p in g.points() {
            let (dx, dy) = screen_offset(&vp, *p, 256.0);
            assert!(dx.abs() <= f64::from(w / 2.0 - pad) + 1e-6, "x offset {}", dx);
            assert!(dy.abs() <= f64::from(h / 2.0 - pad) + 1e-6, "y offset {}", dy);
        }
    }

    #[test]
    fn test_fit_degenerate_bounds_uses_max_zoom() {
        let b = Bounds::from_point(MapPosition::new(10.0, 20.0));
        let vp = fit_bounds(&b, 800.0, 600.0, 50.0, 256.0, 18.0);
        assert_eq!(vp.zoom, 18.0);
        assert!((vp.center.lat - 10.0).abs() < 1e-9);
        assert!((vp.center.lng - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_mercator_roundtrip_latitude() {
        for lat in [-60.0, -1.5, 0.0, 28.6139, 70.0] {
            assert!((mercator_lat(mercator_y(lat)) - lat).abs() < 1e-9);
        }
    }
}
