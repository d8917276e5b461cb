/*

    Orthographic camera fitting: given collection bounds
    and one of the six views, derive where the camera
    sits, how it is oriented and its projection.

    @date: Oct, 2025
    @author: bartu
*/


use crate::prelude::*;
use crate::bbox::Bounds;
use crate::view::View;

/// Floor for the largest bounds dimension, keeps tiny collections framable.
const MIN_MAX_DIMENSION: Float = 1.0;
/// Minimum standoff from the bounds center.
const MIN_DISTANCE: Float = 0.5;
/// Flat silhouettes would otherwise get a zero ortho scale.
const MIN_ORTHO_SCALE: Float = 0.01;
const MIN_CLIP_START: Float = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, SmartDefault)]
pub struct OrthoProjection {
    #[default = 6.0]
    pub ortho_scale: Float,
    #[default = 0.1]
    pub clip_start: Float,
    #[default = 100.0]
    pub clip_end: Float,
}

/// Camera placement for one view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraFit {
    pub location: Vector3,
    /// Translation(location) * rotation, columns are the camera's right, up and backward axes.
    pub matrix_world: Matrix4,
    pub projection: OrthoProjection,
    /// Distance from the bounds center to the camera.
    pub distance: Float,
}

impl CameraFit {
    pub fn right(&self) -> Vector3 {
        self.matrix_world.x_axis.truncate()
    }

    pub fn up(&self) -> Vector3 {
        self.matrix_world.y_axis.truncate()
    }

    /// Direction the camera looks along (-w).
    pub fn forward(&self) -> Vector3 {
        -self.matrix_world.z_axis.truncate()
    }
}

/// Camera-to-world matrix for a camera at `location` looking along `direction`.
pub fn orthographic_camera_matrix(location: Vector3, direction: Vector3, up: Vector3) -> Matrix4 {
    // Camera looks down its local -Z, so w = -gaze
    let w = -direction.normalize();
    let u = up.normalize().cross(w).normalize();
    let v = w.cross(u).normalize();

    debug_assert!(approx_zero(u.dot(w)));
    debug_assert!(approx_zero(v.dot(w)));
    debug_assert!(approx_zero(v.dot(u)));

    Matrix4::from_cols(u.extend(0.0), v.extend(0.0), w.extend(0.0), location.extend(1.0))
}

pub fn configure_view(bounds: &Bounds, view: View, padding: Float) -> CameraFit {
    let axes = view.axes();
    let size = bounds.size();
    let center = bounds.center();

    let max_dimension = size.x.max(size.y).max(size.z).max(MIN_MAX_DIMENSION);
    let padding_distance = max_dimension * padding;

    let axis_size = axis_component(&size, axes.depth_axis);
    let mut distance = axis_size * 0.5 + padding_distance;
    if distance < MIN_DISTANCE {
        distance = MIN_DISTANCE + padding_distance;
    }

    // Only the two in-plane axes frame the image
    let plane_width = axis_component(&size, axes.plane_axes.0);
    let plane_height = axis_component(&size, axes.plane_axes.1);
    let ortho_scale = plane_width.max(plane_height).max(MIN_ORTHO_SCALE) * (1.0 + padding * 2.0);

    let location = center - axes.direction.normalize() * distance;
    let matrix_world = orthographic_camera_matrix(location, axes.direction, axes.up);

    let projection = OrthoProjection {
        ortho_scale,
        clip_start: (distance * 0.1).max(MIN_CLIP_START),
        clip_end: distance + max_dimension * 4.0 + padding_distance,
    };
    debug!("{} view: distance {:.4}, ortho scale {:.4}, camera at {:?}", view, distance, ortho_scale, location);

    CameraFit {
        location,
        matrix_world,
        projection,
        distance,
    }
}
