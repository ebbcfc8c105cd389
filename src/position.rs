use crate::route::MapPosition;
use geo::{Bearing, Distance, Geodesic, Point};

// geo points are (x = lng, y = lat)
fn point(p: MapPosition) -> Point<f64> {
    Point::new(p.lng, p.lat)
}

pub fn distance_and_bearing(from: MapPosition, to: MapPosition) -> (f64, f64) {
    let start = point(from);
    let end = point(to);
    let distance = Geodesic.distance(start, end);
    let raw_bearing = Geodesic.bearing(start, end);
    let bearing = (raw_bearing + 360.0) % 360.0;
    (distance, bearing)
}

/// Geodesic length of a path in meters.
pub fn path_length(path: &[MapPosition]) -> f64 {
    path.windows(2).map(|w| Geodesic.distance(point(w[0]), point(w[1]))).sum()
}

/// Bearing of the last movement along `path`: from the latest point that
/// differs from the final one. `None` while the path has not moved.
pub fn last_heading(path: &[MapPosition]) -> Option<f64> {
    let (last, rest) = path.split_last()?;
    let prev = rest.iter().rev().find(|p| *p != last)?;
    Some(distance_and_bearing(*prev, *last).1)
}

/// Format distance for display
/// < 1000m: whole meters
/// >= 1000m: show as km with 2 decimal places
pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 { format!("{:.0} m", meters) } else { format!("{:.2} km", meters / 1000.0) }
}

/// Compass direction for a bearing in degrees.
pub fn format_bearing(degrees: f64) -> String {
    let directions = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];
    let idx = ((degrees + 22.5) / 45.0) as usize % 8;
    format!("{:.0}° {}", degrees, directions[idx])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_helsinki_tampere() {
        let helsinki = MapPosition::new(60.1699, 24.9384);
        let tampere = MapPosition::new(61.4978, 23.7610);
        let (dist, bearing) = distance_and_bearing(helsinki, tampere);
        assert!((dist / 1000.0 - 160.0).abs() < 5.0, "got {} m", dist);
        // Tampere is north-north-west of Helsinki
        assert!(bearing > 330.0 && bearing < 360.0, "got {}", bearing);
    }

    #[test]
    fn test_path_length_sums_segments() {
        let a = MapPosition::new(0.0, 0.0);
        let b = MapPosition::new(0.0, 1.0);
        let c = MapPosition::new(0.0, 2.0);
        let ab = distance_and_bearing(a, b).0;
        let total = path_length(&[a, b, c]);
        assert!((total - 2.0 * ab).abs() < 1.0);
        assert_eq!(path_length(&[a]), 0.0);
        assert_eq!(path_length(&[]), 0.0);
    }

    #[test]
    fn test_last_heading_skips_stationary_fixes() {
        let a = MapPosition::new(60.0, 25.0);
        let north = MapPosition::new(60.1, 25.0);
        let heading = last_heading(&[a, north, north, north]).unwrap();
        assert!(heading < 1.0 || heading > 359.0, "got {}", heading);

        assert_eq!(last_heading(&[a, a]), None);
        assert_eq!(last_heading(&[a]), None);
        assert_eq!(last_heading(&[]), None);
    }

    #[test]
    fn test_format() {
        assert_eq!(format_distance(999.4), "999 m");
        assert_eq!(format_distance(12_340.0), "12.34 km");
        assert_eq!(format_bearing(0.0), "0° N");
        assert_eq!(format_bearing(90.0), "90° E");
        assert_eq!(format_bearing(350.0), "350° N");
    }
}
