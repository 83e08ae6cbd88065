use serde::Serialize;

/// A position in degrees. Routing services take (lon, lat); the rest of the
/// pipeline keeps (lat, lon) as stored in the sheet.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn lon_lat(&self) -> [f64; 2] {
        [self.lon, self.lat]
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
pub struct ClusterId(pub usize);

impl ClusterId {
    /// 1-indexed label used in summaries and popups.
    pub fn ordinal(self) -> usize {
        self.0 + 1
    }
}

/// A row of the city sheet before clustering.
#[derive(Clone, Debug, PartialEq)]
pub struct CityRow {
    pub name: String,
    pub position: Coordinate,
}

#[derive(Clone, Debug, PartialEq)]
pub struct City {
    pub name: String,
    pub position: Coordinate,
    pub cluster: ClusterId,
}

/// Raw rows of a sheet nobody interprets yet.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawSheet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RouteGeometry {
    pub path: Vec<Coordinate>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SegmentOutcome {
    Drawn(RouteGeometry),
    Failed(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct RouteSegment {
    pub cluster: ClusterId,
    pub from: String,
    pub to: String,
    pub start: Coordinate,
    pub end: Coordinate,
    pub outcome: SegmentOutcome,
}

impl RouteSegment {
    pub fn is_drawn(&self) -> bool {
        matches!(self.outcome, SegmentOutcome::Drawn(_))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Marker {
    pub cluster: ClusterId,
    pub name: String,
    pub position: Coordinate,
    pub color: String,
    pub popup: String,
}
