// Route data model as delivered by the tour API, and resolution of the current position
use serde::{Deserialize, Deserializer, Serialize};

/// Canonical point on the map. Always (lat, lng); backends that want (lng, lat)
/// swap inside their own adapter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapPosition {
    pub lat: f64,
    pub lng: f64,
}

impl MapPosition {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn to_walkers(self) -> walkers::Position {
        walkers::lat_lon(self.lat, self.lng)
    }
}

/// One element of the tour path, `[lat, lng]` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct RouteCoordinate {
    pub lat: f64,
    pub lng: f64,
}

impl RouteCoordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn position(&self) -> MapPosition {
        MapPosition { lat: self.lat, lng: self.lng }
    }
}

impl From<[f64; 2]> for RouteCoordinate {
    fn from([lat, lng]: [f64; 2]) -> Self {
        Self { lat, lng }
    }
}

impl From<RouteCoordinate> for [f64; 2] {
    fn from(c: RouteCoordinate) -> Self {
        [c.lat, c.lng]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    /// `None` when the field was missing or contained anything but numbers.
    #[serde(default, deserialize_with = "lenient_numbers")]
    pub coordinates: Option<Vec<f64>>,
}

/// Latest telemetry fix of a tour. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteLocation {
    #[serde(default)]
    pub geo_location: Option<GeoLocation>,
}

impl RouteLocation {
    pub fn at(lat: f64, lng: f64) -> Self {
        Self { geo_location: Some(GeoLocation { coordinates: Some(vec![lat, lng]) }) }
    }

    /// The (lat, lng) pair, only if the record carries exactly two numbers.
    pub fn coordinate_pair(&self) -> Option<(f64, f64)> {
        match self.geo_location.as_ref()?.coordinates.as_deref()? {
            [lat, lng] => Some((*lat, *lng)),
            _ => None,
        }
    }
}

// Anything that is not a list of numbers becomes None instead of failing the response
fn lenient_numbers<'de, D>(deserializer: D) -> Result<Option<Vec<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let Some(serde_json::Value::Array(items)) = value else {
        return Ok(None);
    };
    Ok(items.iter().map(serde_json::Value::as_f64).collect())
}

/// `{"data": ...}` envelope used by every tour endpoint.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    pub data: T,
}

/// Resolve the single "current position" of a tour.
///
/// Live telemetry wins when it carries a coordinate pair, then the start of the
/// path, otherwise there is nothing to show.
pub fn current_position(
    location: Option<&RouteLocation>,
    route: &[RouteCoordinate],
) -> Option<MapPosition> {
    if let Some((lat, lng)) = location.and_then(RouteLocation::coordinate_pair) {
        return Some(MapPosition { lat, lng });
    }
    route.first().map(RouteCoordinate::position)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(points: &[(f64, f64)]) -> Vec<RouteCoordinate> {
        points.iter().map(|&(lat, lng)| RouteCoordinate::new(lat, lng)).collect()
    }

    #[test]
    fn test_location_wins_over_route() {
        let loc = RouteLocation::at(10.5, 20.25);
        for path in [route(&[]), route(&[(1.0, 2.0)]), route(&[(1.0, 2.0), (3.0, 4.0)])] {
            assert_eq!(current_position(Some(&loc), &path), Some(MapPosition::new(10.5, 20.25)));
        }
    }

    #[test]
    fn test_falls_back_to_route_start() {
        let path = route(&[(1.0, 2.0), (3.0, 4.0)]);
        assert_eq!(current_position(None, &path), Some(MapPosition::new(1.0, 2.0)));

        // A record without coordinates carries no information either
        let empty = RouteLocation::default();
        assert_eq!(current_position(Some(&empty), &path), Some(MapPosition::new(1.0, 2.0)));
    }

    #[test]
    fn test_nothing_known() {
        assert_eq!(current_position(None, &[]), None);
        assert_eq!(current_position(Some(&RouteLocation::default()), &[]), None);
    }

    #[test]
    fn test_wrong_arity_is_ignored() {
        let three: RouteLocation =
            serde_json::from_str(r#"{"geoLocation":{"coordinates":[1,2,3]}}"#).unwrap();
        assert_eq!(three.coordinate_pair(), None);
        let path = route(&[(5.0, 6.0)]);
        assert_eq!(current_position(Some(&three), &path), Some(MapPosition::new(5.0, 6.0)));
    }

    #[test]
    fn test_malformed_location_fields_degrade() {
        let samples = [
            r#"{}"#,
            r#"{"geoLocation":null}"#,
            r#"{"geoLocation":{}}"#,
            r#"{"geoLocation":{"coordinates":null}}"#,
            r#"{"geoLocation":{"coordinates":"28.6,77.2"}}"#,
            r#"{"geoLocation":{"coordinates":["28.6", 77.2]}}"#,
        ];
        for s in samples {
            let loc: RouteLocation = serde_json::from_str(s).unwrap();
            assert_eq!(loc.coordinate_pair(), None, "input: {}", s);
        }
    }

    #[test]
    fn test_envelopes_decode() {
        let locs: ApiEnvelope<Vec<RouteLocation>> = serde_json::from_str(
            r#"{"data":[{"geoLocation":{"coordinates":[28.61,77.20]}},{"geoLocation":{}}]}"#,
        )
        .unwrap();
        assert_eq!(locs.data.len(), 2);
        assert_eq!(locs.data[0].coordinate_pair(), Some((28.61, 77.20)));

        let coords: ApiEnvelope<Vec<RouteCoordinate>> =
            serde_json::from_str(r#"{"data":[[1,2],[3.5,4.5]]}"#).unwrap();
        assert_eq!(coords.data, route(&[(1.0, 2.0), (3.5, 4.5)]));
    }

    #[test]
    fn test_coordinate_sequence_is_strict() {
        // Required pairs must really be pairs
        assert!(serde_json::from_str::<Vec<RouteCoordinate>>(r#"[[1,2],[3]]"#).is_err());
        assert!(serde_json::from_str::<Vec<RouteCoordinate>>(r#"[[1,2],null]"#).is_err());
    }
}
