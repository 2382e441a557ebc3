//! Unit-sphere geodesy.
//!
//! The globe is modelled as a sphere in a Y-up, right-handed frame:
//! - `+Y` points to the north pole.
//! - `(lon 0, lat 0)` maps to `+Z`.
//! - `(lon 90E, lat 0)` maps to `+X`.

use super::Vec3;

/// Geographic coordinates in degrees.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LonLat {
    pub lon_deg: f64,
    pub lat_deg: f64,
}

impl LonLat {
    pub fn new(lon_deg: f64, lat_deg: f64) -> Self {
        Self { lon_deg, lat_deg }
    }

    pub fn is_valid(self) -> bool {
        self.lon_deg.is_finite() && self.lat_deg.is_finite() && self.lat_deg.abs() <= 90.0
    }

    pub fn to_unit(self) -> Vec3 {
        lon_lat_to_unit(self.lon_deg, self.lat_deg)
    }
}

pub fn lon_lat_to_unit(lon_deg: f64, lat_deg: f64) -> Vec3 {
    let (sin_lat, cos_lat) = lat_deg.to_radians().sin_cos();
    let (sin_lon, cos_lon) = lon_deg.to_radians().sin_cos();
    Vec3::new(cos_lat * sin_lon, sin_lat, cos_lat * cos_lon)
}

pub fn unit_to_lon_lat(v: Vec3) -> LonLat {
    let lat = v.y.clamp(-1.0, 1.0).asin();
    let lon = v.x.atan2(v.z);
    LonLat::new(lon.to_degrees(), lat.to_degrees())
}

/// Latitude (degrees) of a direction in globe-local space.
pub fn latitude_deg(v: Vec3) -> f64 {
    match v.normalize() {
        Some(n) => n.y.clamp(-1.0, 1.0).asin().to_degrees(),
        None => 0.0,
    }
}

/// Great-circle angle between two directions, in degrees.
///
/// Uses `atan2(|a x b|, a . b)` so nearly coincident points stay accurate.
pub fn angular_distance_deg(a: Vec3, b: Vec3) -> f64 {
    a.cross(b).length().atan2(a.dot(b)).to_degrees()
}
