use crate::geo::GeoPoint;

/// Geographic extent grown point-by-point.
///
/// Longitudes are treated as plain numbers (no antimeridian wrapping);
/// callers that span the antimeridian must split the extent themselves.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct LatLngBounds {
    extents: Option<Extents>,
}

#[derive(Debug, Copy, Clone, PartialEq)]
struct Extents {
    south: f64,
    west: f64,
    north: f64,
    east: f64,
}

impl LatLngBounds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of(points: &[GeoPoint]) -> Self {
        let mut bounds = Self::new();
        for p in points {
            bounds.extend(*p);
        }
        bounds
    }

    pub fn is_empty(&self) -> bool {
        self.extents.is_none()
    }

    /// Grows the extent to include `point`. Non-finite points are ignored.
    pub fn extend(&mut self, point: GeoPoint) {
        if !point.lat_deg.is_finite() || !point.lng_deg.is_finite() {
            return;
        }
        match &mut self.extents {
            None => {
                self.extents = Some(Extents {
                    south: point.lat_deg,
                    west: point.lng_deg,
                    north: point.lat_deg,
                    east: point.lng_deg,
                });
            }
            Some(e) => {
                e.south = e.south.min(point.lat_deg);
                e.north = e.north.max(point.lat_deg);
                e.west = e.west.min(point.lng_deg);
                e.east = e.east.max(point.lng_deg);
            }
        }
    }

    pub fn south_west(&self) -> Option<GeoPoint> {
        self.extents.map(|e| GeoPoint::at_surface(e.south, e.west))
    }

    pub fn north_east(&self) -> Option<GeoPoint> {
        self.extents.map(|e| GeoPoint::at_surface(e.north, e.east))
    }

    pub fn center(&self) -> Option<GeoPoint> {
        self.extents
            .map(|e| GeoPoint::at_surface(0.5 * (e.south + e.north), 0.5 * (e.west + e.east)))
    }
}
