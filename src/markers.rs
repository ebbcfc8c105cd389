// Ownership of the marker visuals placed on one map instance
use crate::geometry::RouteGeometry;
use crate::route::MapPosition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerKind {
    /// GPS navigation arrow, used for the path start and for a lone position
    Start,
    /// Home icon at the path end
    End,
}

impl MarkerKind {
    /// Icon edge length in points.
    pub fn size(self) -> f32 {
        match self {
            MarkerKind::Start => 40.0,
            MarkerKind::End => 30.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerSpec {
    pub kind: MarkerKind,
    pub position: MapPosition,
}

impl MarkerSpec {
    pub fn start(position: MapPosition) -> Self {
        Self { kind: MarkerKind::Start, position }
    }

    pub fn end(position: MapPosition) -> Self {
        Self { kind: MarkerKind::End, position }
    }
}

/// Markers a route should show: start and end for a drawable line, otherwise a
/// single start marker at the current position, otherwise nothing.
pub fn route_markers(position: Option<MapPosition>, geometry: &RouteGeometry) -> Vec<MarkerSpec> {
    match (geometry.has_line(), geometry.start(), geometry.end()) {
        (true, Some(start), Some(end)) => vec![MarkerSpec::start(start), MarkerSpec::end(end)],
        _ => position.map(MarkerSpec::start).into_iter().collect(),
    }
}

/// A map instance able to display markers.
pub trait MarkerHost {
    type Handle;

    fn add_marker(&mut self, marker: &MarkerSpec) -> Self::Handle;
    fn remove_marker(&mut self, handle: Self::Handle);
}

/// The markers currently on a map, replaced as a whole.
#[derive(Debug)]
pub struct MarkerSet<H> {
    tracked: Vec<H>,
}

impl<H> Default for MarkerSet<H> {
    fn default() -> Self {
        Self { tracked: Vec::new() }
    }
}

impl<H> MarkerSet<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove every tracked marker from `host`, add `markers`, and track them.
    pub fn replace_all<M>(&mut self, host: &mut M, markers: &[MarkerSpec])
    where
        M: MarkerHost<Handle = H>,
    {
        self.clear(host);
        self.tracked = markers.iter().map(|m| host.add_marker(m)).collect();
    }

    pub fn clear<M>(&mut self, host: &mut M)
    where
        M: MarkerHost<Handle = H>,
    {
        for handle in self.tracked.drain(..) {
            host.remove_marker(handle);
        }
    }

    pub fn len(&self) -> usize {
        self.tracked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::route::RouteCoordinate;
    use std::collections::BTreeMap;

    /// Host that only records which markers are alive.
    #[derive(Default)]
    pub(crate) struct FakeHost {
        pub live: BTreeMap<u32, MarkerSpec>,
        next: u32,
        pub removed_unknown: usize,
    }

    impl MarkerHost for FakeHost {
        type Handle = u32;

        fn add_marker(&mut self, marker: &MarkerSpec) -> u32 {
            self.next += 1;
            self.live.insert(self.next, *marker);
            self.next
        }

        fn remove_marker(&mut self, handle: u32) {
            if self.live.remove(&handle).is_none() {
                self.removed_unknown += 1;
            }
        }
    }

    fn p(lat: f64, lng: f64) -> MapPosition {
        MapPosition::new(lat, lng)
    }

    #[test]
    fn test_replace_drops_previous_set() {
        let mut host = FakeHost::default();
        let mut set = MarkerSet::new();
        let a = [MarkerSpec::start(p(1.0, 1.0)), MarkerSpec::end(p(2.0, 2.0))];
        let b = [MarkerSpec::start(p(5.0, 5.0))];

        set.replace_all(&mut host, &a);
        set.replace_all(&mut host, &b);

        let live: Vec<_> = host.live.values().copied().collect();
        assert_eq!(live, b.to_vec());
        assert_eq!(set.len(), 1);
        assert_eq!(host.removed_unknown, 0);
    }

    #[test]
    fn test_replace_and_clear_are_idempotent() {
        let mut host = FakeHost::default();
        let mut set = MarkerSet::new();
        let a = [MarkerSpec::start(p(1.0, 1.0)), MarkerSpec::end(p(2.0, 2.0))];

        set.replace_all(&mut host, &a);
        set.replace_all(&mut host, &a);
        assert_eq!(host.live.len(), 2);

        set.clear(&mut host);
        set.clear(&mut host);
        assert!(host.live.is_empty());
        assert!(set.is_empty());
        assert_eq!(host.removed_unknown, 0);
    }

    #[test]
    fn test_route_marker_rules() {
        let pos = Some(p(9.0, 9.0));

        let empty = RouteGeometry::build(&[]);
        assert!(route_markers(None, &empty).is_empty());
        assert_eq!(route_markers(pos, &empty), vec![MarkerSpec::start(p(9.0, 9.0))]);

        let single = RouteGeometry::build(&[RouteCoordinate::new(1.0, 2.0)]);
        assert_eq!(route_markers(pos, &single), vec![MarkerSpec::start(p(9.0, 9.0))]);

        let line = RouteGeometry::build(&[
            RouteCoordinate::new(1.0, 2.0),
            RouteCoordinate::new(3.0, 4.0),
            RouteCoordinate::new(5.0, 6.0),
        ]);
        // The live position is subsumed by the line endpoints
        assert_eq!(
            route_markers(pos, &line),
            vec![MarkerSpec::start(p(1.0, 2.0)), MarkerSpec::end(p(5.0, 6.0))]
        );
    }
}
