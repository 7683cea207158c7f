// Camera math
// Everything angular is computed in canonical (Y-up) space, see `transform`.

pub mod auxiliary;
pub mod bounds;
pub mod lens;
pub mod level;
pub mod spherical;
pub mod transform;

use nalgebra_glm as glm;

pub use auxiliary::*;
pub use bounds::*;
pub use lens::*;
pub use level::*;
pub use spherical::*;
pub use transform::*;

/// Position in document or canonical space.
pub type Point3 = glm::DVec3;
/// Direction in document or canonical space.
pub type Vector3 = glm::DVec3;

/// Inclination/tilt never reach the poles.
pub const MAX_INCLINATION_DEG: f64 = 89.999;

/// Below this length a direction is treated as undefined.
pub const GEOMETRY_EPSILON: f64 = 1e-9;

pub fn point(x: f64, y: f64, z: f64) -> Point3 {
    glm::vec3(x, y, z)
}

pub(crate) fn clamp_inclination(deg: f64) -> f64 {
    deg.clamp(-MAX_INCLINATION_DEG, MAX_INCLINATION_DEG)
}

#[cfg(test)]
pub(crate) fn assert_vec_close(a: &glm::DVec3, b: &glm::DVec3, eps: f64) {
    assert!(
        (a - b).norm() <= eps,
        "vectors differ: ({:.9}, {:.9}, {:.9}) vs ({:.9}, {:.9}, {:.9})",
        a.x,
        a.y,
        a.z,
        b.x,
        b.y,
        b.z
    );
}
