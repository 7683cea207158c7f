//! Document <-> canonical space conversions.
//!
//! Canonical space is Y-up. The document's own up vector (read from its front
//! named view) is rotated onto canonical Y so that every angular formula in the
//! crate is independent of how the document is oriented.

use log::{debug, info};
use nalgebra_glm as glm;

use super::{GEOMETRY_EPSILON, Point3, Vector3};
use crate::host::Document;

/// Fixed up axis of canonical space.
pub fn canonical_up() -> Vector3 {
    glm::vec3(0.0, 1.0, 0.0)
}

/// Up vector assumed when a document offers nothing better.
pub fn default_document_up() -> Vector3 {
    glm::vec3(0.0, 0.0, 1.0)
}

/// Derive the document's up vector from its front named view.
///
/// Never fails: without an active model, a front view, or a usable up vector the
/// default Z-up axis is returned.
pub fn derive_document_up(document: Option<&dyn Document>) -> Vector3 {
    let Some(document) = document.filter(|d| d.has_active_model()) else {
        info!("No active design - using default Z-up vector");
        return default_document_up();
    };

    match document.front_view() {
        Some(front) if glm::length(&front.up) > GEOMETRY_EPSILON => {
            let up = glm::normalize(&front.up);
            debug!(
                "Derived up vector from front named view: ({:.3}, {:.3}, {:.3})",
                up.x, up.y, up.z
            );
            up
        }
        _ => {
            info!("Front named view unavailable - using default Z-up vector");
            default_document_up()
        }
    }
}

/// Minimal rotation taking unit `from` onto unit `to`.
///
/// When the two are antiparallel the rotation is a half turn about an axis
/// perpendicular to `from`, chosen from the X axis (or Z if `from` lies on X).
fn rotation_between(from: &Vector3, to: &Vector3) -> glm::DMat3 {
    let from = glm::normalize(from);
    let to = glm::normalize(to);
    let cos = glm::dot(&from, &to);

    if cos >= 1.0 - GEOMETRY_EPSILON {
        return glm::DMat3::identity();
    }

    if cos <= -1.0 + GEOMETRY_EPSILON {
        let mut axis = glm::cross(&from, &glm::vec3(1.0, 0.0, 0.0));
        if glm::length(&axis) < 1e-6 {
            axis = glm::cross(&from, &glm::vec3(0.0, 0.0, 1.0));
        }
        let k = glm::normalize(&axis);
        // Half turn: 2kk^T - I
        return glm::DMat3::new(
            2.0 * k.x * k.x - 1.0,
            2.0 * k.x * k.y,
            2.0 * k.x * k.z,
            2.0 * k.y * k.x,
            2.0 * k.y * k.y - 1.0,
            2.0 * k.y * k.z,
            2.0 * k.z * k.x,
            2.0 * k.z * k.y,
            2.0 * k.z * k.z - 1.0,
        );
    }

    // Rodrigues: I + [v]x + [v]x^2 / (1 + cos)
    let v = glm::cross(&from, &to);
    let skew = glm::DMat3::new(0.0, -v.z, v.y, v.z, 0.0, -v.x, -v.y, v.x, 0.0);
    glm::DMat3::identity() + skew + skew * skew * (1.0 / (1.0 + cos))
}

/// Rotation mapping `doc_up` onto canonical Y (document -> canonical).
pub fn to_canonical_matrix(doc_up: &Vector3) -> glm::DMat4 {
    glm::mat3_to_mat4(&rotation_between(doc_up, &canonical_up()))
}

/// Rotation mapping canonical Y onto `doc_up` (canonical -> document).
///
/// Built as the transpose of [`to_canonical_matrix`] so the pair are exact
/// inverses, including the antiparallel case.
pub fn from_canonical_matrix(doc_up: &Vector3) -> glm::DMat4 {
    glm::transpose(&to_canonical_matrix(doc_up))
}

/// Transform a point; translation applies.
pub fn transform_point(p: &Point3, m: &glm::DMat4) -> Point3 {
    let r = m * glm::vec4(p.x, p.y, p.z, 1.0);
    glm::vec3(r.x, r.y, r.z)
}

/// Transform a direction; translation is ignored.
pub fn transform_vector(v: &Vector3, m: &glm::DMat4) -> Vector3 {
    let r = m * glm::vec4(v.x, v.y, v.z, 0.0);
    glm::vec3(r.x, r.y, r.z)
}

/// Both directions of the document/canonical mapping for one document up.
#[derive(Debug, Clone)]
pub struct CanonicalTransform {
    pub doc_up: Vector3,
    pub to_canonical: glm::DMat4,
    pub from_canonical: glm::DMat4,
}

impl CanonicalTransform {
    pub fn new(doc_up: Vector3) -> Self {
        let doc_up = if glm::length(&doc_up) > GEOMETRY_EPSILON {
            glm::normalize(&doc_up)
        } else {
            default_document_up()
        };
        Self {
            doc_up,
            to_canonical: to_canonical_matrix(&doc_up),
            from_canonical: from_canonical_matrix(&doc_up),
        }
    }

    /// Recomputed per operation; deriving is cheap.
    pub fn for_document(document: Option<&dyn Document>) -> Self {
        Self::new(derive_document_up(document))
    }

    pub fn point_to_canonical(&self, p: &Point3) -> Point3 {
        transform_point(p, &self.to_canonical)
    }

    pub fn vector_to_canonical(&self, v: &Vector3) -> Vector3 {
        transform_vector(v, &self.to_canonical)
    }

    pub fn point_from_canonical(&self, p: &Point3) -> Point3 {
        transform_point(p, &self.from_canonical)
    }

    pub fn vector_from_canonical(&self, v: &Vector3) -> Vector3 {
        transform_vector(v, &self.from_canonical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::assert_vec_close;

    fn sample_ups() -> Vec<Vector3> {
        vec![
            glm::vec3(0.0, 0.0, 1.0),
            glm::vec3(0.0, 1.0, 0.0),
            glm::vec3(0.0, -1.0, 0.0),
            glm::vec3(1.0, 0.0, 0.0),
            glm::vec3(0.0, 0.0, -1.0),
            glm::normalize(&glm::vec3(1.0, 2.0, 3.0)),
            glm::normalize(&glm::vec3(-0.3, -0.9, 0.1)),
            glm::normalize(&glm::vec3(1e-7, -1.0, 0.0)),
        ]
    }

    #[test]
    fn from_and_to_canonical_are_inverses() {
        for up in sample_ups() {
            let product = from_canonical_matrix(&up) * to_canonical_matrix(&up);
            let identity = glm::DMat4::identity();
            for i in 0..4 {
                for j in 0..4 {
                    assert!(
                        (product[(i, j)] - identity[(i, j)]).abs() < 1e-9,
                        "up {:?} entry ({}, {})",
                        up,
                        i,
                        j
                    );
                }
            }
        }
    }

    #[test]
    fn doc_up_maps_onto_canonical_y() {
        for up in sample_ups() {
            let mapped = transform_vector(&up, &to_canonical_matrix(&up));
            assert_vec_close(&mapped, &canonical_up(), 1e-9);
        }
    }

    #[test]
    fn antiparallel_up_is_finite_and_deterministic() {
        let down = glm::vec3(0.0, -1.0, 0.0);
        let a = to_canonical_matrix(&down);
        let b = to_canonical_matrix(&down);
        assert!(a.iter().all(|v| v.is_finite()));
        assert_eq!(a, b);
        assert_vec_close(&transform_vector(&down, &a), &canonical_up(), 1e-12);
    }

    #[test]
    fn z_up_rotation_keeps_x_axis() {
        let t = CanonicalTransform::new(glm::vec3(0.0, 0.0, 1.0));
        assert_vec_close(
            &t.vector_to_canonical(&glm::vec3(1.0, 0.0, 0.0)),
            &glm::vec3(1.0, 0.0, 0.0),
            1e-12,
        );
    }

    #[test]
    fn points_pick_up_translation_vectors_do_not() {
        let mut m = glm::DMat4::identity();
        m[(0, 3)] = 5.0;
        let p = glm::vec3(1.0, 2.0, 3.0);
        assert_vec_close(&transform_point(&p, &m), &glm::vec3(6.0, 2.0, 3.0), 1e-12);
        assert_vec_close(&transform_vector(&p, &m), &p, 1e-12);
    }

    #[test]
    fn zero_up_falls_back_to_default() {
        let t = CanonicalTransform::new(glm::vec3(0.0, 0.0, 0.0));
        assert_vec_close(&t.doc_up, &default_document_up(), 1e-12);
    }
}
