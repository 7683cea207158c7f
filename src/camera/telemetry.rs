use log::{debug, error};
use serde::Serialize;

use super::{CameraState, ProjectionType, Xyz};
use crate::error::{CameraError, CameraResult};
use crate::host::Document;
use crate::math::{CanonicalTransform, DistanceBounds, azimuth, distance, dolly, inclination, level_of, pan, tilt};

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Flat camera readout pushed to the palette after every change.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySnapshot {
    pub camera_type: ProjectionType,
    pub eye: Xyz,
    pub eye_level: f64,
    pub target: Xyz,
    pub up_vector: Xyz,
    #[serde(rename = "eye_canonical")]
    pub eye_canonical: Xyz,
    #[serde(rename = "target_canonical")]
    pub target_canonical: Xyz,
    #[serde(rename = "upVector_canonical")]
    pub up_vector_canonical: Xyz,
    pub azimuth: f64,
    pub inclination: f64,
    pub distance: f64,
    /// Degrees.
    pub fov: f64,
    pub min_distance: f64,
    pub max_distance: f64,
    pub dolly: f64,
    pub pan: f64,
    /// Reported with the sign flipped so that positive means looking up.
    pub tilt: f64,
}

/// Read everything the palette shows off `camera`.
///
/// Fails with `NoActiveModel` without a design, and with `DegenerateGeometry`
/// when eye and target coincide.
pub fn gather_telemetry(
    camera: &CameraState,
    document: Option<&dyn Document>,
    bounds: &DistanceBounds,
) -> CameraResult<TelemetrySnapshot> {
    let Some(document) = document.filter(|d| d.has_active_model()) else {
        error!("No active design. Telemetry aborted.");
        return Err(CameraError::NoActiveModel);
    };
    let t = CanonicalTransform::for_document(Some(document));

    let azimuth = azimuth(&camera.eye, &camera.target, &t.to_canonical)?;
    let inclination = inclination(&camera.eye, &camera.target, &t.to_canonical)?;
    let pan = pan(&camera.eye, &camera.target, &t.to_canonical)?;
    let tilt = tilt(&camera.eye, &camera.target, &t.to_canonical)?;

    let snapshot = TelemetrySnapshot {
        camera_type: camera.projection,
        eye: camera.eye.into(),
        eye_level: level_of(&camera.eye, &t.doc_up),
        target: camera.target.into(),
        up_vector: camera.up.into(),
        eye_canonical: t.point_to_canonical(&camera.eye).into(),
        target_canonical: t.point_to_canonical(&camera.target).into(),
        up_vector_canonical: t.vector_to_canonical(&camera.up).into(),
        azimuth: round2(azimuth),
        inclination: round2(inclination),
        distance: distance(&camera.eye, &camera.target),
        fov: camera.fov_degrees(),
        min_distance: bounds.min_distance,
        max_distance: bounds.max_distance,
        dolly: dolly(&camera.eye, &camera.target, &t.doc_up),
        pan: round2(pan),
        tilt: -round2(tilt),
    };
    debug!(
        "Telemetry: azimuth={} inclination={} distance={:.3} fov={:.2} dolly={:.3} pan={} tilt={}",
        snapshot.azimuth,
        snapshot.inclination,
        snapshot.distance,
        snapshot.fov,
        snapshot.dolly,
        snapshot.pan,
        snapshot.tilt
    );
    Ok(snapshot)
}
