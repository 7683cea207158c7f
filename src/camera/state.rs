use nalgebra_glm as glm;
use serde::{Deserialize, Serialize};

use crate::math::{FUSION_DEFAULT_FOV_DEG, GEOMETRY_EPSILON, Point3, Vector3, point};

/// Projection of the viewport camera. Wire values follow the host enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ProjectionType {
    Orthographic,
    Perspective,
}

impl ProjectionType {
    pub fn label(self) -> &'static str {
        match self {
            ProjectionType::Orthographic => "Orthographic",
            ProjectionType::Perspective => "Perspective",
        }
    }
}

impl From<ProjectionType> for u8 {
    fn from(value: ProjectionType) -> Self {
        match value {
            ProjectionType::Orthographic => 0,
            ProjectionType::Perspective => 1,
        }
    }
}

impl TryFrom<u8> for ProjectionType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ProjectionType::Orthographic),
            1 => Ok(ProjectionType::Perspective),
            other => Err(format!("unknown camera type {}", other)),
        }
    }
}

/// `{x, y, z}` object used on the UI wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Xyz {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl From<Point3> for Xyz {
    fn from(v: Point3) -> Self {
        Self { x: v.x, y: v.y, z: v.z }
    }
}

impl From<Xyz> for Point3 {
    fn from(v: Xyz) -> Self {
        point(v.x, v.y, v.z)
    }
}

/// Full viewport camera, as read from or written to the host.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraState {
    pub eye: Point3,
    pub target: Point3,
    pub up: Vector3,
    /// Perspective angle in radians.
    pub fov: f64,
    pub projection: ProjectionType,
    pub is_fit_view: bool,
    pub is_smooth_transition: bool,
}

impl CameraState {
    pub fn new(eye: Point3, target: Point3, up: Vector3, fov_deg: f64, projection: ProjectionType) -> Self {
        Self {
            eye,
            target,
            up,
            fov: fov_deg.to_radians(),
            projection,
            is_fit_view: false,
            is_smooth_transition: false,
        }
    }

    pub fn fov_degrees(&self) -> f64 {
        self.fov.to_degrees()
    }

    pub fn view_vector(&self) -> Vector3 {
        self.target - self.eye
    }

    /// Eye on target, or up running along the view.
    pub fn is_degenerate(&self) -> bool {
        let view = self.view_vector();
        if glm::length(&view) < GEOMETRY_EPSILON || glm::length(&self.up) < GEOMETRY_EPSILON {
            return true;
        }
        glm::length(&glm::cross(&glm::normalize(&view), &glm::normalize(&self.up))) < GEOMETRY_EPSILON
    }

    /// Copy with fit and smooth-transition cleared, the way every write goes out.
    pub fn without_transitions(&self) -> Self {
        Self {
            is_fit_view: false,
            is_smooth_transition: false,
            ..self.clone()
        }
    }
}

impl Default for CameraState {
    fn default() -> Self {
        Self::new(
            point(50.0, -50.0, 50.0),
            point(0.0, 0.0, 0.0),
            glm::vec3(0.0, 0.0, 1.0),
            FUSION_DEFAULT_FOV_DEG,
            ProjectionType::Perspective,
        )
    }
}

/// Camera captured when the session opened; reset returns to it.
#[derive(Debug, Clone, Default)]
pub struct InitialState {
    state: Option<CameraState>,
}

impl InitialState {
    pub fn record(&mut self, camera: CameraState) {
        self.state = Some(camera);
    }

    pub fn get(&self) -> Option<&CameraState> {
        self.state.as_ref()
    }

    pub fn clear(&mut self) {
        self.state = None;
    }
}
