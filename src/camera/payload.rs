// Pending property edits and the payload built from them.

use log::{debug, error};
use serde::{Deserialize, Serialize};

use super::{CameraState, ProjectionType, Xyz};
use crate::error::{CameraError, CameraResult};
use crate::host::Document;
use crate::math::{
    CanonicalTransform, Point3, Vector3, apply_eye_level, apply_target_level, azimuth, distance,
    focal_length_to_fov, inclination, new_eye_from_angles, set_dolly, set_pan, set_tilt,
};

/// Dolly edits never collapse the horizontal separation below this.
pub const DOLLY_MIN_DISTANCE: f64 = 1.0;

/// Lens edit, either as an angle or as a focal length. The last one set wins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LensChange {
    FovDegrees(f64),
    FocalLength(f64),
}

impl LensChange {
    pub fn fov_degrees(self, sensor_width: f64) -> f64 {
        match self {
            LensChange::FovDegrees(deg) => deg,
            LensChange::FocalLength(mm) => focal_length_to_fov(mm, sensor_width),
        }
    }
}

/// One UI property edit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PropertyChange {
    Projection(ProjectionType),
    Distance(f64),
    Azimuth(f64),
    Inclination(f64),
    Fov(f64),
    FocalLength(f64),
    Dolly(f64),
    Pan(f64),
    Tilt(f64),
    EyeLevel(f64),
    TargetLevel(f64),
}

/// Sparse set of property edits waiting to be applied.
///
/// Absolute overrides (`eye`, `target`, `up`) beat derived fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingUpdate {
    pub projection: Option<ProjectionType>,
    pub azimuth: Option<f64>,
    pub inclination: Option<f64>,
    pub distance: Option<f64>,
    pub lens: Option<LensChange>,
    pub eye: Option<Point3>,
    pub target: Option<Point3>,
    pub up: Option<Vector3>,
    pub eye_level: Option<f64>,
    pub target_level: Option<f64>,
    pub dolly: Option<f64>,
    pub pan: Option<f64>,
    pub tilt: Option<f64>,
}

impl PendingUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Record an edit; a newer edit of the same property replaces the older one.
    pub fn merge(&mut self, change: PropertyChange) {
        match change {
            PropertyChange::Projection(p) => self.projection = Some(p),
            PropertyChange::Distance(v) => self.distance = Some(v),
            PropertyChange::Azimuth(v) => self.azimuth = Some(v),
            PropertyChange::Inclination(v) => self.inclination = Some(v),
            PropertyChange::Fov(v) => self.lens = Some(LensChange::FovDegrees(v)),
            PropertyChange::FocalLength(v) => self.lens = Some(LensChange::FocalLength(v)),
            PropertyChange::Dolly(v) => self.dolly = Some(v),
            PropertyChange::Pan(v) => self.pan = Some(v),
            PropertyChange::Tilt(v) => self.tilt = Some(v),
            PropertyChange::EyeLevel(v) => self.eye_level = Some(v),
            PropertyChange::TargetLevel(v) => self.target_level = Some(v),
        }
    }

    pub fn with(mut self, change: PropertyChange) -> Self {
        self.merge(change);
        self
    }

    pub fn changes_lens(&self) -> bool {
        self.lens.is_some()
    }

    /// Pin eye/target/up to `camera` as explicit overrides.
    pub fn capture_pose(&mut self, camera: &CameraState) {
        self.eye = Some(camera.eye);
        self.target = Some(camera.target);
        self.up = Some(camera.up);
    }
}

/// Complete camera ready to be written, plus what the edit touched.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraPayload {
    pub camera: CameraState,
    pub changes_lens: bool,
}

fn active_document(document: Option<&dyn Document>) -> CameraResult<&dyn Document> {
    match document {
        Some(d) if d.has_active_model() => Ok(d),
        _ => {
            error!("No active design. Camera payload aborted.");
            Err(CameraError::NoActiveModel)
        }
    }
}

/// Merge `pending` with `current` into a full camera.
///
/// Resolution order:
/// 1. explicit eye/target/up overrides
/// 2. azimuth/inclination/distance, defaulting to values read off `current`
/// 3. eye and target level adjustments
/// 4. tilt, else pan, else dolly, each recomputed from `current` and replacing
///    the eye/target from the steps above
pub fn build_payload(
    pending: &PendingUpdate,
    current: &CameraState,
    document: Option<&dyn Document>,
    sensor_width: f64,
) -> CameraResult<CameraPayload> {
    let document = active_document(document)?;
    let transform = CanonicalTransform::for_document(Some(document));

    let mut eye = match pending.eye {
        Some(eye) => eye,
        None => {
            let az = match pending.azimuth {
                Some(az) => az,
                None => azimuth(&current.eye, &current.target, &transform.to_canonical)?,
            };
            let inc = match pending.inclination {
                Some(inc) => inc,
                None => inclination(&current.eye, &current.target, &transform.to_canonical)?,
            };
            let dist = pending
                .distance
                .unwrap_or_else(|| distance(&current.eye, &current.target));
            let eye = new_eye_from_angles(&current.target, az, inc, dist, &transform.from_canonical);
            match pending.eye_level {
                Some(level) => apply_eye_level(&eye, &transform.doc_up, level),
                None => eye,
            }
        }
    };

    let mut target = match (pending.target, pending.target_level) {
        (Some(target), _) => target,
        (None, Some(level)) => apply_target_level(&current.target, &transform.doc_up, level),
        (None, None) => current.target,
    };

    let up = pending.up.unwrap_or(transform.doc_up);

    let moved = if let Some(tilt) = pending.tilt {
        Some(set_tilt(&current.eye, &current.target, tilt, &transform))
    } else if let Some(pan) = pending.pan {
        Some(set_pan(&current.eye, &current.target, pan, &transform))
    } else {
        pending
            .dolly
            .map(|d| set_dolly(&current.eye, &current.target, d, DOLLY_MIN_DISTANCE, &transform))
    };
    if let Some(moved) = moved {
        eye = moved.eye;
        target = moved.target;
    }

    let fov_deg = pending
        .lens
        .map(|lens| lens.fov_degrees(sensor_width))
        .unwrap_or_else(|| current.fov_degrees());

    let camera = CameraState {
        eye,
        target,
        up,
        fov: fov_deg.to_radians(),
        projection: pending.projection.unwrap_or(current.projection),
        is_fit_view: false,
        is_smooth_transition: false,
    };
    debug!(
        "Built payload: eye ({:.3}, {:.3}, {:.3}) target ({:.3}, {:.3}, {:.3}) fov {:.2}",
        camera.eye.x, camera.eye.y, camera.eye.z, camera.target.x, camera.target.y, camera.target.z, fov_deg
    );

    Ok(CameraPayload {
        camera,
        changes_lens: pending.changes_lens(),
    })
}

/// Camera stored in canonical space so it can be pasted into a document with a
/// different up axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalCamera {
    pub eye: Xyz,
    pub target: Xyz,
    pub up_vector: Xyz,
    pub perspective_angle: f64,
    pub camera_type: ProjectionType,
}

impl CanonicalCamera {
    pub fn capture(camera: &CameraState, transform: &CanonicalTransform) -> Self {
        Self {
            eye: transform.point_to_canonical(&camera.eye).into(),
            target: transform.point_to_canonical(&camera.target).into(),
            up_vector: transform.vector_to_canonical(&camera.up).into(),
            perspective_angle: camera.fov,
            camera_type: camera.projection,
        }
    }
}

/// Payload for a canonical snapshot, mapped into the active document's space.
pub fn build_payload_from_canonical(
    snapshot: &CanonicalCamera,
    document: Option<&dyn Document>,
) -> CameraResult<CameraPayload> {
    let document = active_document(document)?;
    let transform = CanonicalTransform::for_document(Some(document));

    let camera = CameraState {
        eye: transform.point_from_canonical(&snapshot.eye.into()),
        target: transform.point_from_canonical(&snapshot.target.into()),
        up: transform.vector_from_canonical(&snapshot.up_vector.into()),
        fov: snapshot.perspective_angle,
        projection: snapshot.camera_type,
        is_fit_view: false,
        is_smooth_transition: false,
    };
    Ok(CameraPayload {
        camera,
        changes_lens: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryDocument;
    use crate::math::{DEFAULT_SENSOR_WIDTH_MM, assert_vec_close, dolly, level_of, point};
    use approx::assert_abs_diff_eq;
    use nalgebra_glm as glm;

    fn z_up_document() -> MemoryDocument {
        MemoryDocument::new(glm::vec3(0.0, 0.0, 1.0))
    }

    fn camera() -> CameraState {
        CameraState::new(
            point(0.0, -100.0, 30.0),
            point(0.0, 0.0, 0.0),
            glm::vec3(0.0, 0.0, 1.0),
            40.0,
            ProjectionType::Perspective,
        )
    }

    fn build(pending: &PendingUpdate, current: &CameraState, doc: &MemoryDocument) -> CameraPayload {
        build_payload(pending, current, Some(doc as &dyn Document), DEFAULT_SENSOR_WIDTH_MM).unwrap()
    }

    #[test]
    fn merge_overwrites_same_property() {
        let mut pending = PendingUpdate::default();
        assert!(pending.is_empty());
        pending.merge(PropertyChange::Distance(10.0));
        pending.merge(PropertyChange::Distance(20.0));
        pending.merge(PropertyChange::Azimuth(5.0));
        assert_eq!(pending.distance, Some(20.0));
        assert_eq!(pending.azimuth, Some(5.0));

        pending.merge(PropertyChange::Fov(30.0));
        pending.merge(PropertyChange::FocalLength(50.0));
        assert_eq!(pending.lens, Some(LensChange::FocalLength(50.0)));
        assert!(pending.changes_lens());
    }

    #[test]
    fn empty_update_reproduces_current_camera() {
        let doc = z_up_document();
        let current = camera();
        let payload = build(&PendingUpdate::default(), &current, &doc);
        assert_vec_close(&payload.camera.eye, &current.eye, 1e-9);
        assert_vec_close(&payload.camera.target, &current.target, 1e-12);
        assert_abs_diff_eq!(payload.camera.fov, current.fov, epsilon = 1e-12);
        assert!(!payload.changes_lens);
    }

    #[test]
    fn distance_edit_keeps_angles() {
        let doc = z_up_document();
        let current = camera();
        let payload = build(&PendingUpdate::default().with(PropertyChange::Distance(50.0)), &current, &doc);
        assert_abs_diff_eq!(distance(&payload.camera.eye, &payload.camera.target), 50.0, epsilon = 1e-9);

        let t = CanonicalTransform::new(glm::vec3(0.0, 0.0, 1.0));
        let before = azimuth(&current.eye, &current.target, &t.to_canonical).unwrap();
        let after = azimuth(&payload.camera.eye, &payload.camera.target, &t.to_canonical).unwrap();
        assert_abs_diff_eq!(before, after, epsilon = 1e-9);
    }

    #[test]
    fn explicit_overrides_win() {
        let doc = z_up_document();
        let eye = point(1.0, 2.0, 3.0);
        let pending = PendingUpdate {
            eye: Some(eye),
            distance: Some(999.0),
            eye_level: Some(-50.0),
            ..Default::default()
        };
        let payload = build(&pending, &camera(), &doc);
        assert_vec_close(&payload.camera.eye, &eye, 1e-12);
    }

    #[test]
    fn level_edits_move_along_document_up() {
        let doc = z_up_document();
        let pending = PendingUpdate::default()
            .with(PropertyChange::EyeLevel(12.0))
            .with(PropertyChange::TargetLevel(4.0));
        let payload = build(&pending, &camera(), &doc);
        let up = glm::vec3(0.0, 0.0, 1.0);
        assert_abs_diff_eq!(level_of(&payload.camera.eye, &up), 12.0, epsilon = 1e-9);
        assert_abs_diff_eq!(level_of(&payload.camera.target, &up), 4.0, epsilon = 1e-9);
    }

    #[test]
    fn tilt_beats_pan_beats_dolly() {
        let doc = z_up_document();
        let current = camera();
        let t = CanonicalTransform::new(glm::vec3(0.0, 0.0, 1.0));

        let all = PendingUpdate::default()
            .with(PropertyChange::Dolly(10.0))
            .with(PropertyChange::Pan(45.0))
            .with(PropertyChange::Tilt(10.0));
        let tilt_only = PendingUpdate::default().with(PropertyChange::Tilt(10.0));
        assert_eq!(build(&all, &current, &doc), build(&tilt_only, &current, &doc));

        let pan_and_dolly = PendingUpdate::default()
            .with(PropertyChange::Dolly(10.0))
            .with(PropertyChange::Pan(45.0));
        let payload = build(&pan_and_dolly, &current, &doc);
        let expected = set_pan(&current.eye, &current.target, 45.0, &t);
        assert_vec_close(&payload.camera.target, &expected.target, 1e-12);

        let dolly_only = build(&PendingUpdate::default().with(PropertyChange::Dolly(10.0)), &current, &doc);
        assert_abs_diff_eq!(dolly(&dolly_only.camera.eye, &dolly_only.camera.target, &t.doc_up), 10.0, epsilon = 1e-9);
    }

    #[test]
    fn focal_length_becomes_fov() {
        let doc = z_up_document();
        let payload = build(&PendingUpdate::default().with(PropertyChange::FocalLength(18.0)), &camera(), &doc);
        assert_abs_diff_eq!(payload.camera.fov_degrees(), 90.0, epsilon = 1e-9);
        assert!(payload.changes_lens);
    }

    #[test]
    fn up_defaults_to_document_up_and_flags_are_cleared() {
        let doc = z_up_document();
        let mut current = camera();
        current.up = glm::normalize(&glm::vec3(0.0, 0.3, 1.0));
        current.is_fit_view = true;
        let payload = build(&PendingUpdate::default(), &current, &doc);
        assert_vec_close(&payload.camera.up, &glm::vec3(0.0, 0.0, 1.0), 1e-12);
        assert!(!payload.camera.is_fit_view);
        assert!(!payload.camera.is_smooth_transition);
    }

    #[test]
    fn no_active_model_aborts() {
        let result = build_payload(&PendingUpdate::default(), &camera(), None, DEFAULT_SENSOR_WIDTH_MM);
        assert!(matches!(result, Err(CameraError::NoActiveModel)));

        let empty = MemoryDocument::without_model();
        let result = build_payload(
            &PendingUpdate::default(),
            &camera(),
            Some(&empty as &dyn Document),
            DEFAULT_SENSOR_WIDTH_MM,
        );
        assert!(matches!(result, Err(CameraError::NoActiveModel)));
    }

    #[test]
    fn degenerate_current_camera_needs_explicit_angles() {
        let doc = z_up_document();
        let mut current = camera();
        current.eye = current.target;
        let result = build_payload(&PendingUpdate::default(), &current, Some(&doc as &dyn Document), 36.0);
        assert!(matches!(result, Err(CameraError::DegenerateGeometry(_))));

        let pending = PendingUpdate::default()
            .with(PropertyChange::Azimuth(30.0))
            .with(PropertyChange::Inclination(10.0))
            .with(PropertyChange::Distance(20.0));
        let payload = build(&pending, &current, &doc);
        assert_abs_diff_eq!(distance(&payload.camera.eye, &payload.camera.target), 20.0, epsilon = 1e-9);
    }

    #[test]
    fn canonical_snapshot_moves_between_documents() {
        let z_doc = z_up_document();
        let y_doc = MemoryDocument::new(glm::vec3(0.0, 1.0, 0.0));
        let current = camera();

        let snapshot = CanonicalCamera::capture(&current, &CanonicalTransform::new(glm::vec3(0.0, 0.0, 1.0)));
        let same = build_payload_from_canonical(&snapshot, Some(&z_doc as &dyn Document)).unwrap();
        assert_vec_close(&same.camera.eye, &current.eye, 1e-9);
        assert_vec_close(&same.camera.up, &current.up, 1e-9);

        // In a Y-up document canonical and document space coincide.
        let other = build_payload_from_canonical(&snapshot, Some(&y_doc as &dyn Document)).unwrap();
        assert_vec_close(&other.camera.eye, &point(0.0, 30.0, 100.0), 1e-9);
        assert_vec_close(&other.camera.up, &glm::vec3(0.0, 1.0, 0.0), 1e-9);
        assert_eq!(other.camera.projection, ProjectionType::Perspective);
    }
}
