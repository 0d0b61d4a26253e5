use std::f64::consts::PI;

/// Mean Earth radius, in meters
pub const EARTH_RADIUS_METERS: f64 = 6371.0 * 1000.0;

const DEG_TO_RAD: f64 = PI / 180.0;

/// Great-circle distance (in meters) between two coordinates expressed
/// in decimal degrees, using the Haversine formula on a spherical Earth.
///
/// No ellipsoid correction is applied: this is meant for proximity
/// reporting, not navigation grade ranging.
pub fn distance_calculate(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat_rad = (lat2 - lat1) * DEG_TO_RAD;
    let d_lon_rad = (lon2 - lon1) * DEG_TO_RAD;

    let lat1_rad = lat1 * DEG_TO_RAD;
    let lat2_rad = lat2 * DEG_TO_RAD;

    let a = (d_lat_rad / 2.0).sin().powi(2)
        + (d_lon_rad / 2.0).sin().powi(2) * lat1_rad.cos() * lat2_rad.cos();

    // rounding may push a marginally above 1 for antipodal points
    let c = 2.0 * a.sqrt().min(1.0).asin();

    EARTH_RADIUS_METERS * c
}
