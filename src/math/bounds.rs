// Slider range for the camera distance, scaled from the model size.

use log::info;
use nalgebra_glm as glm;
use serde::Serialize;

use super::Point3;

/// Axis-aligned box of the model's root component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Point3,
    pub max: Point3,
}

impl BoundingBox {
    pub fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    pub fn diagonal(&self) -> f64 {
        glm::distance(&self.max, &self.min)
    }
}

/// Min/max camera distance offered by the UI. Not enforced on the camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistanceBounds {
    pub min_distance: f64,
    pub max_distance: f64,
    pub diagonal_length: f64,
    pub distance_multiplier: f64,
}

impl DistanceBounds {
    pub fn from_diagonal(diagonal: f64, multiplier: f64) -> Self {
        Self {
            min_distance: (diagonal / multiplier).max(1.0),
            max_distance: diagonal * multiplier,
            diagonal_length: diagonal,
            distance_multiplier: multiplier,
        }
    }

    /// Range used when there is no model to measure.
    pub fn fallback(multiplier: f64) -> Self {
        Self {
            min_distance: 10.0,
            max_distance: 10000.0,
            diagonal_length: 100.0,
            distance_multiplier: multiplier,
        }
    }
}

pub fn distance_bounds_from_model(bounding_box: Option<&BoundingBox>, multiplier: f64) -> DistanceBounds {
    match bounding_box {
        Some(bb) => {
            let bounds = DistanceBounds::from_diagonal(bb.diagonal(), multiplier);
            info!(
                "Model diagonal: {:.1}, distance range: {:.1} - {:.1}",
                bounds.diagonal_length, bounds.min_distance, bounds.max_distance
            );
            bounds
        }
        None => {
            info!("No design context - using default distance range: 10 - 10000");
            DistanceBounds::fallback(multiplier)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::point;

    #[test]
    fn bounds_scale_with_diagonal() {
        let b = DistanceBounds::from_diagonal(100.0, 4.0);
        assert_eq!(b.min_distance, 25.0);
        assert_eq!(b.max_distance, 400.0);
    }

    #[test]
    fn small_models_floor_min_at_one() {
        let b = DistanceBounds::from_diagonal(2.0, 4.0);
        assert_eq!(b.min_distance, 1.0);
        assert_eq!(b.max_distance, 8.0);
    }

    #[test]
    fn missing_model_uses_fixed_range() {
        let b = distance_bounds_from_model(None, 4.0);
        assert_eq!((b.min_distance, b.max_distance), (10.0, 10000.0));
    }

    #[test]
    fn bounding_box_diagonal_feeds_bounds() {
        let bb = BoundingBox::new(point(0.0, 0.0, 0.0), point(30.0, 40.0, 0.0));
        let b = distance_bounds_from_model(Some(&bb), 4.0);
        assert_eq!(b.diagonal_length, 50.0);
        assert_eq!(b.min_distance, 12.5);
        assert_eq!(b.max_distance, 200.0);
    }
}
