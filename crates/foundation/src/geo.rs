/// Geodetic point in degrees and meters.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct GeoPoint {
    pub lat_deg: f64,
    pub lng_deg: f64,
    pub alt_m: f64,
}

impl GeoPoint {
    pub fn new(lat_deg: f64, lng_deg: f64, alt_m: f64) -> Self {
        Self {
            lat_deg,
            lng_deg,
            alt_m,
        }
    }

    pub fn at_surface(lat_deg: f64, lng_deg: f64) -> Self {
        Self::new(lat_deg, lng_deg, 0.0)
    }

    /// The same point with altitude stripped, for 2D display.
    pub fn at_ground(self) -> Self {
        Self { alt_m: 0.0, ..self }
    }

    pub fn with_altitude(self, alt_m: f64) -> Self {
        Self { alt_m, ..self }
    }

    pub fn is_finite(&self) -> bool {
        self.lat_deg.is_finite() && self.lng_deg.is_finite() && self.alt_m.is_finite()
    }
}
