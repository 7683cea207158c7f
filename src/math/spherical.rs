// Spherical camera coordinates: azimuth, inclination, distance.
//
// Azimuth and inclination describe where the eye sits as seen from the target,
// measured in canonical space. Positive inclination puts the eye above the
// target, i.e. the camera looks downward.

use nalgebra_glm as glm;

use super::{GEOMETRY_EPSILON, Point3, clamp_inclination, transform_vector};
use crate::error::{CameraError, CameraResult};

/// Normalized eye->target direction in canonical space.
fn canonical_view_direction(
    eye: &Point3,
    target: &Point3,
    to_canonical: &glm::DMat4,
) -> CameraResult<glm::DVec3> {
    let v = target - eye;
    if glm::length(&v) < GEOMETRY_EPSILON {
        return Err(CameraError::DegenerateGeometry("eye and target coincide"));
    }
    Ok(transform_vector(&glm::normalize(&v), to_canonical))
}

/// Wrap degrees into [-180, 180).
pub fn normalize_degrees(deg: f64) -> f64 {
    (deg + 180.0).rem_euclid(360.0) - 180.0
}

/// Horizontal angle in degrees, in [-180, 180).
///
/// `atan2(x, z)` of the canonical view direction, shifted by a half turn so the
/// value is the bearing from target to eye.
pub fn azimuth(eye: &Point3, target: &Point3, to_canonical: &glm::DMat4) -> CameraResult<f64> {
    let v = canonical_view_direction(eye, target, to_canonical)?;
    Ok(normalize_degrees(v.x.atan2(v.z).to_degrees() + 180.0))
}

/// Vertical angle in degrees, positive when looking down.
pub fn inclination(eye: &Point3, target: &Point3, to_canonical: &glm::DMat4) -> CameraResult<f64> {
    let v = canonical_view_direction(eye, target, to_canonical)?;
    Ok(-v.y.clamp(-1.0, 1.0).asin().to_degrees())
}

pub fn distance(eye: &Point3, target: &Point3) -> f64 {
    glm::distance(eye, target)
}

/// Canonical unit direction for the given angles (degrees).
pub(crate) fn spherical_direction(azimuth_deg: f64, inclination_deg: f64) -> glm::DVec3 {
    let az = azimuth_deg.to_radians();
    let inc = inclination_deg.to_radians();
    glm::vec3(inc.cos() * az.sin(), inc.sin(), inc.cos() * az.cos())
}

/// Eye position `distance` away from `target` along the given angles.
///
/// Inclination is clamped short of +/-90 degrees.
pub fn new_eye_from_angles(
    target: &Point3,
    azimuth_deg: f64,
    inclination_deg: f64,
    distance: f64,
    from_canonical: &glm::DMat4,
) -> Point3 {
    let direction = spherical_direction(azimuth_deg, clamp_inclination(inclination_deg));
    let direction = transform_vector(&direction, from_canonical);
    target + direction * distance
}
