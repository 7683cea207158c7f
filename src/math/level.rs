// Eye/target level: the projection of a point onto the document up vector.

use nalgebra_glm as glm;

use super::{BoundingBox, Point3, Vector3};

/// Height of `point` along `up`.
pub fn level_of(point: &Point3, up: &Vector3) -> f64 {
    glm::dot(point, up)
}

/// Translate `point` along `up` until its level equals `level`.
pub fn apply_level(point: &Point3, up: &Vector3, level: f64) -> Point3 {
    let delta = level - level_of(point, up);
    point + up * delta
}

/// Move the eye to `eye_level` along `up`.
pub fn apply_eye_level(eye: &Point3, up: &Vector3, eye_level: f64) -> Point3 {
    apply_level(eye, up, eye_level)
}

/// Move the target to `target_level` along `up`.
pub fn apply_target_level(target: &Point3, up: &Vector3, target_level: f64) -> Point3 {
    apply_level(target, up, target_level)
}

/// Whether `level` lies within one model height of the model's vertical center.
///
/// Without a bounding box any level within +/-10000 is accepted.
pub fn level_in_model_range(bounds: Option<&BoundingBox>, up: &Vector3, level: f64) -> bool {
    match bounds {
        Some(bb) => {
            let low = level_of(&bb.min, up);
            let high = level_of(&bb.max, up);
            let height = (high - low).abs();
            let center = (high + low) / 2.0;
            (center - height..=center + height).contains(&level)
        }
        None => (-10000.0..=10000.0).contains(&level),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{assert_vec_close, point};
    use approx::assert_abs_diff_eq;

    #[test]
    fn apply_level_moves_only_along_up() {
        let up = glm::vec3(0.0, 0.0, 1.0);
        let moved = apply_eye_level(&point(3.0, 4.0, 53.0), &up, 50.0);
        assert_vec_close(&moved, &point(3.0, 4.0, 50.0), 1e-12);
        assert_abs_diff_eq!(level_of(&moved, &up), 50.0, epsilon = 1e-12);
    }

    #[test]
    fn apply_level_with_tilted_up() {
        let up = glm::normalize(&glm::vec3(0.0, 1.0, 1.0));
        let start = point(2.0, 1.0, -1.0);
        let moved = apply_target_level(&start, &up, 7.5);
        assert_abs_diff_eq!(level_of(&moved, &up), 7.5, epsilon = 1e-12);
        // Offset is parallel to up.
        let offset = moved - start;
        assert_abs_diff_eq!(glm::length(&glm::cross(&offset, &up)), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn model_range_uses_height_around_center() {
        let up = glm::vec3(0.0, 0.0, 1.0);
        let bb = BoundingBox::new(point(-5.0, -5.0, 0.0), point(5.0, 5.0, 20.0));
        assert!(level_in_model_range(Some(&bb), &up, 25.0));
        assert!(level_in_model_range(Some(&bb), &up, -10.0));
        assert!(!level_in_model_range(Some(&bb), &up, 31.0));
        assert!(level_in_model_range(None, &up, 9999.0));
        assert!(!level_in_model_range(None, &up, 10001.0));
    }
}
