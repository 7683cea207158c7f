// Eased eye/target level transitions.

use std::thread;
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::camera::CameraState;
use crate::error::CameraResult;
use crate::host::Viewport;
use crate::math::{Point3, Vector3, level_of};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    #[default]
    Cubic,
    Sine,
}

impl Easing {
    pub fn apply(self, t: f64) -> f64 {
        match self {
            Easing::Cubic => ease_in_out_cubic(t),
            Easing::Sine => ease_in_out_sine(t),
        }
    }
}

pub fn ease_in_out_cubic(t: f64) -> f64 {
    let t = t * 2.0;
    if t < 1.0 {
        t * t * t / 2.0
    } else {
        let t = t - 2.0;
        (t * t * t + 2.0) / 2.0
    }
}

pub fn ease_in_out_sine(t: f64) -> f64 {
    -((std::f64::consts::PI * t).cos() - 1.0) / 2.0
}

/// Upper bound on frames per animation.
pub const MAX_STEPS: usize = 2_400;

/// Planned move of eye and target along the document up to new levels.
///
/// Each frame offsets the starting points by the eased fraction of the level
/// delta; eye and target interpolate independently.
#[derive(Debug, Clone)]
pub struct LevelAnimation {
    start_eye: Point3,
    start_target: Point3,
    up: Vector3,
    eye_delta: f64,
    target_delta: f64,
    steps: usize,
    interval: Duration,
    easing: Easing,
}

impl LevelAnimation {
    pub fn new(
        camera: &CameraState,
        up: Vector3,
        eye_level: f64,
        target_level: f64,
        duration: Duration,
        fps: u32,
        easing: Easing,
    ) -> Self {
        let steps = ((duration.as_secs_f64() * f64::from(fps)).round() as usize).clamp(1, MAX_STEPS);
        Self {
            start_eye: camera.eye,
            start_target: camera.target,
            up,
            eye_delta: eye_level - level_of(&camera.eye, &up),
            target_delta: target_level - level_of(&camera.target, &up),
            steps,
            interval: duration / steps as u32,
            easing,
        }
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Eye and target for step `i` (0-based); the last step lands exactly.
    pub fn frame(&self, i: usize) -> (Point3, Point3) {
        let t = (i + 1) as f64 / self.steps as f64;
        let eased = self.easing.apply(t);
        (
            self.start_eye + self.up * (self.eye_delta * eased),
            self.start_target + self.up * (self.target_delta * eased),
        )
    }

    pub fn frames(&self) -> impl Iterator<Item = (Point3, Point3)> + '_ {
        (0..self.steps).map(|i| self.frame(i))
    }

    /// Commit every frame to the viewport, blocking until the last one.
    ///
    /// `on_step` sees the camera after each commit.
    pub fn run(&self, viewport: &mut dyn Viewport, mut on_step: impl FnMut(&CameraState)) -> CameraResult<()> {
        debug!(
            "Animating level change over {} steps (eye {:+.3}, target {:+.3})",
            self.steps, self.eye_delta, self.target_delta
        );
        for (i, (eye, target)) in self.frames().enumerate() {
            let mut camera = viewport.camera()?.without_transitions();
            camera.eye = eye;
            camera.target = target;
            viewport.set_camera(&camera)?;
            viewport.refresh()?;
            on_step(&viewport.camera()?);
            if i + 1 < self.steps && !self.interval.is_zero() {
                thread::sleep(self.interval);
            }
        }
        Ok(())
    }
}
