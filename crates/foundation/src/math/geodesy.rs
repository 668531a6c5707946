use crate::geo::GeoPoint;

/// WGS84 semi-major axis (meters), used as the spherical earth radius.
pub const WGS84_A: f64 = 6_378_137.0;

/// Wraps a longitude into [-180, 180).
pub fn normalize_lng_deg(lng_deg: f64) -> f64 {
    (lng_deg + 180.0).rem_euclid(360.0) - 180.0
}

/// Great-circle destination: the point `distance_m` along `bearing_rad`
/// (clockwise from north) from `origin`, on a sphere of radius [`WGS84_A`].
///
/// Total for any finite bearing and any `distance_m >= 0`; the result is at
/// ground level (altitude 0).
pub fn destination_point(origin: GeoPoint, bearing_rad: f64, distance_m: f64) -> GeoPoint {
    let lat1 = origin.lat_deg.to_radians();
    let lng1 = origin.lng_deg.to_radians();
    let ang = distance_m / WGS84_A;

    let sin_lat1 = lat1.sin();
    let cos_lat1 = lat1.cos();
    let sin_ang = ang.sin();
    let cos_ang = ang.cos();

    let sin_lat2 = sin_lat1 * cos_ang + cos_lat1 * sin_ang * bearing_rad.cos();
    let lat2 = sin_lat2.clamp(-1.0, 1.0).asin();
    let lng2 = lng1 + (bearing_rad.sin() * sin_ang * cos_lat1).atan2(cos_ang - sin_lat1 * sin_lat2);

    GeoPoint::at_surface(lat2.to_degrees(), normalize_lng_deg(lng2.to_degrees()))
}
