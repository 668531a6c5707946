use foundation::geo::GeoPoint;
use serde::Deserialize;

/// Canonical camera parameters for the 3D globe view.
///
/// The view widget is the single authority for these values; copies held
/// elsewhere are caches re-synchronized from the widget's property-change
/// events. Every field is always defined; there is no partial state.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraState {
    pub center: GeoPoint,
    /// Camera-to-target distance (meters).
    pub range_m: f64,
    /// Azimuthal rotation around the target (degrees).
    pub heading_deg: f64,
    /// Degrees away from straight-down, held in [0, 90] by the drag
    /// handlers that produce it.
    pub tilt_deg: f64,
    /// Unconstrained; the renderer wraps it visually.
    pub roll_deg: f64,
}

impl Default for CameraState {
    /// Seed state installed before any event has arrived.
    fn default() -> Self {
        Self {
            center: GeoPoint::default(),
            range_m: 0.0,
            heading_deg: 0.0,
            tilt_deg: 0.0,
            roll_deg: 0.0,
        }
    }
}

/// The view restored by a double-click reset.
pub const INITIAL_VIEW: CameraState = CameraState {
    center: GeoPoint {
        lat_deg: 37.72809,
        lng_deg: -119.64473,
        alt_m: 1300.0,
    },
    range_m: 5000.0,
    heading_deg: 61.0,
    tilt_deg: 69.0,
    roll_deg: 0.0,
};

#[derive(Debug, Deserialize)]
struct LocationPayload {
    #[serde(alias = "latitude")]
    lat: f64,
    #[serde(alias = "longitude")]
    lng: f64,
    #[serde(default)]
    altitude: f64,
}

/// Reads a center payload through its canonical serialization.
///
/// The view may report its center as a plain literal (`lat`/`lng`) or as the
/// serialized form of a richer location object (`latitude`/`longitude`),
/// either with an optional `altitude`. Anything else is noise and yields
/// `None`.
pub fn geo_from_value(value: &serde_json::Value) -> Option<GeoPoint> {
    let payload: LocationPayload = serde_json::from_value(value.clone()).ok()?;
    let point = GeoPoint::new(payload.lat, payload.lng, payload.altitude);
    point.is_finite().then_some(point)
}
