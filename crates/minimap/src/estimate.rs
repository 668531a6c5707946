use camera::state::CameraState;
use foundation::geo::GeoPoint;
use foundation::math::destination_point;

/// Ground point the camera effectively sits over.
///
/// The camera orbits `center` at `range_m`; its ground track lies
/// `range * sin(tilt)` behind the center, opposite the heading. Pure and
/// deterministic, total for any tilt in [0, 90] and any non-negative range.
/// The result carries no altitude.
pub fn estimate_camera_position(camera: &CameraState) -> GeoPoint {
    let ground_offset_m = camera.range_m * camera.tilt_deg.to_radians().sin();
    let bearing_rad = (camera.heading_deg + 180.0).to_radians();
    destination_point(camera.center, bearing_rad, ground_offset_m)
}
