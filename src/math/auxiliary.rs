// Auxiliary camera moves: dolly, pan, tilt.
// All three work in the canonical horizontal (XZ) plane and hand back document
// space eye/target pairs.

use nalgebra_glm as glm;

use super::{
    CanonicalTransform, GEOMETRY_EPSILON, Point3, Vector3, azimuth, clamp_inclination, inclination,
    spherical_direction,
};
use crate::error::CameraResult;

/// Horizontal separation below which pan picks a default direction.
pub const PAN_MIN_RADIUS: f64 = 1e-6;

/// Eye/target pair produced by an auxiliary move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeTarget {
    pub eye: Point3,
    pub target: Point3,
}

/// Horizontal (up-perpendicular) length of the eye->target vector.
pub fn dolly(eye: &Point3, target: &Point3, doc_up: &Vector3) -> f64 {
    let v = target - eye;
    let up = glm::normalize(doc_up);
    let horizontal = v - up * glm::dot(&v, &up);
    glm::length(&horizontal)
}

/// Pan reads back as the azimuth.
pub fn pan(eye: &Point3, target: &Point3, to_canonical: &glm::DMat4) -> CameraResult<f64> {
    azimuth(eye, target, to_canonical)
}

/// Tilt reads back as the inclination; the UI shows it negated.
pub fn tilt(eye: &Point3, target: &Point3, to_canonical: &glm::DMat4) -> CameraResult<f64> {
    inclination(eye, target, to_canonical)
}

/// Move the eye in the canonical horizontal plane so its horizontal distance to
/// the target becomes `horizontal_distance`.
///
/// The eye keeps its canonical height. The target's height is recomputed so the
/// slope of the view ray is unchanged. Target X/Z stay put.
pub fn set_dolly(
    eye: &Point3,
    target: &Point3,
    horizontal_distance: f64,
    min_distance: f64,
    transform: &CanonicalTransform,
) -> EyeTarget {
    let eye_c = transform.point_to_canonical(eye);
    let target_c = transform.point_to_canonical(target);
    let v = target_c - eye_c;

    let mut horizontal = glm::vec3(v.x, 0.0, v.z);
    let mut horizontal_len = glm::length(&horizontal);
    if horizontal_len < min_distance {
        horizontal = glm::vec3(1.0, 0.0, 0.0);
        horizontal_len = 1.0;
    }
    let horizontal = glm::normalize(&horizontal);

    let new_eye_c = glm::vec3(
        target_c.x - horizontal.x * horizontal_distance,
        eye_c.y,
        target_c.z - horizontal.z * horizontal_distance,
    );

    let slope = v.y.atan2(horizontal_len);
    let new_target_c = glm::vec3(
        target_c.x,
        new_eye_c.y + slope.tan() * horizontal_distance,
        target_c.z,
    );

    EyeTarget {
        eye: transform.point_from_canonical(&new_eye_c),
        target: transform.point_from_canonical(&new_target_c),
    }
}

/// Swing the target around the eye in the canonical horizontal plane.
///
/// Radius is the current horizontal eye->target distance (1.0 when the view is
/// vertical). The target keeps its canonical height and the eye does not move.
/// The target lands at `radians(pan + 180)` measured as `sin` on X, `cos` on Z.
pub fn set_pan(eye: &Point3, target: &Point3, pan_deg: f64, transform: &CanonicalTransform) -> EyeTarget {
    let eye_c = transform.point_to_canonical(eye);
    let target_c = transform.point_to_canonical(target);
    let v = target_c - eye_c;

    let mut radius = v.x.hypot(v.z);
    if radius < PAN_MIN_RADIUS {
        radius = 1.0;
    }

    let pan_rad = (pan_deg + 180.0).to_radians();
    let new_target_c = glm::vec3(
        eye_c.x + pan_rad.sin() * radius,
        target_c.y,
        eye_c.z + pan_rad.cos() * radius,
    );

    EyeTarget {
        eye: *eye,
        target: transform.point_from_canonical(&new_target_c),
    }
}

/// Rotate the view ray up or down at fixed heading and length; the eye stays put.
///
/// Tilt is clamped short of +/-90 degrees; positive tilt looks up.
pub fn set_tilt(eye: &Point3, target: &Point3, tilt_deg: f64, transform: &CanonicalTransform) -> EyeTarget {
    let tilt_deg = clamp_inclination(tilt_deg);
    let eye_c = transform.point_to_canonical(eye);
    let target_c = transform.point_to_canonical(target);
    let v = target_c - eye_c;
    let distance = glm::length(&v);

    // Heading of the view ray itself, not the eye bearing.
    let heading = if distance > GEOMETRY_EPSILON {
        let n = v / distance;
        n.x.atan2(n.z).to_degrees()
    } else {
        0.0
    };

    let new_target_c = eye_c + spherical_direction(heading, tilt_deg) * distance;

    EyeTarget {
        eye: *eye,
        target: transform.point_from_canonical(&new_target_c),
    }
}

/// Up vector perpendicular to `view` and as close as possible to `doc_up`.
///
/// Returns `None` when the view runs along `doc_up`.
pub fn corrected_up_vector(view: &Vector3, doc_up: &Vector3) -> Option<Vector3> {
    let view = glm::normalize(view);
    let up = doc_up - view * glm::dot(doc_up, &view);
    (glm::length(&up) > 1e-6).then(|| glm::normalize(&up))
}
