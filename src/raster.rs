/*

    Still render for the in-memory scene: cast one
    orthographic ray per pixel from the active camera
    against every visible, renderable object's local
    bounding box.

    Shading is environment-only: a hit takes the active
    world's background color times strength, so the flat
    white world yields a clean silhouette.

    @date: Oct 11, 2025
    @author: Bartu
*/

use rayon::prelude::*;
use std::time::Instant;

use crate::bbox::BoundsAccumulator;
use crate::camera::OrthoProjection;
use crate::error::HostError;
use crate::host::{EvalContext, Host, SceneGraph, SceneObject};
use crate::image::{get_pixel_centers, ImageData};
use crate::memory::MemoryScene;
use crate::prelude::*;

/// Ambient used when the world has no usable background node.
const DEFAULT_AMBIENT: Float = 0.05;


#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Vector3,
    pub direction: Vector3,
}

impl Ray {
    pub fn new(origin: Vector3, direction: Vector3) -> Self {
        Self {
            origin,
            direction,
        }
    }
}

/// Object prepared for hit testing: local box plus world-to-local matrix.
#[derive(Debug)]
struct Target {
    to_local: Matrix4,
    local_min: Vector3,
    local_max: Vector3,
}

impl Target {
    fn new(object: &SceneObject) -> Option<Self> {
        let mut acc = BoundsAccumulator::default();
        for corner in object.bound_box {
            acc.add_point(corner);
        }
        let local = acc.finish()?;
        Some(Self {
            to_local: object.matrix_world.inverse(),
            local_min: local.minimum,
            local_max: local.maximum,
        })
    }

    /// Ray parameter where the ray enters the box, if it hits within [t_min, t_max].
    fn intersect(&self, ray: &Ray, t_min: Float, t_max: Float) -> Option<Float> {
        // Same t in both spaces since the matrix is affine
        let o = transform_point(&self.to_local, &ray.origin);
        let d = transform_dir(&self.to_local, &ray.direction);

        let mut t_enter = t_min;
        let mut t_exit = t_max;
        for axis in 0..3 {
            let (min, max) = (self.local_min[axis], self.local_max[axis]);
            if approx_zero(d[axis]) {
                // Parallel to this slab
                if o[axis] < min || o[axis] > max {
                    return None;
                }
                continue;
            }
            let mut t1 = (min - o[axis]) / d[axis];
            let mut t2 = (max - o[axis]) / d[axis];
            if t2 < t1 {
                std::mem::swap(&mut t1, &mut t2);
            }
            t_enter = t_enter.max(t1);
            t_exit = t_exit.min(t2);
            if t_enter > t_exit {
                return None;
            }
        }
        Some(t_enter)
    }
}

/// Frame corners [top-left, top-right, bottom-left, bottom-right] of an
/// orthographic camera. The ortho scale spans the larger image side.
pub fn frame_corners(matrix_world: &Matrix4, projection: &OrthoProjection, width: usize, height: usize) -> [Vector3; 4] {
    let aspect = width as Float / height as Float;
    let (half_w, half_h) = if aspect >= 1.0 {
        (projection.ortho_scale * 0.5, projection.ortho_scale * 0.5 / aspect)
    } else {
        (projection.ortho_scale * 0.5 * aspect, projection.ortho_scale * 0.5)
    };

    let position = matrix_world.w_axis.truncate();
    let u = matrix_world.x_axis.truncate();
    let v = matrix_world.y_axis.truncate();
    [
        position - u * half_w + v * half_h,
        position + u * half_w + v * half_h,
        position - u * half_w - v * half_h,
        position + u * half_w - v * half_h,
    ]
}

fn ambient_color(scene: &MemoryScene) -> Vector3 {
    scene
        .active_world()
        .as_deref()
        .and_then(|name| scene.world(name))
        .filter(|world| world.use_nodes)
        .and_then(|world| world.background)
        .map(|bg| bg.color * bg.strength)
        .unwrap_or(Vector3::splat(DEFAULT_AMBIENT))
}

pub fn render_active_camera(scene: &MemoryScene) -> Result<ImageData, HostError> {
    let camera_name = scene.active_camera().ok_or(HostError::NoActiveCamera)?;
    let camera = scene
        .camera(&camera_name)
        .ok_or_else(|| HostError::MissingCamera(camera_name.clone()))?;

    let render = scene.render_settings();
    let (width, height) = render.effective_resolution();
    let (width, height) = (width as usize, height as usize);
    let start = Instant::now();

    let ctx = EvalContext { evaluated: true, view_layer: scene.view_layer_name() };
    let targets: Vec<Target> = scene
        .all_objects(scene.root_collection())
        .iter()
        .filter(|obj| !obj.hide_render)
        .filter(|obj| ctx.view_layer.is_none_or(|layer| scene.visible_in_layer(obj, layer)))
        .map(|obj| scene.evaluated(obj))
        .filter(|obj| obj.kind.is_renderable())
        .filter_map(|obj| Target::new(&obj))
        .collect();
    info!(">> Rendering {} objects at {}x{} from '{}'", targets.len(), width, height, camera_name);

    let ambient = ambient_color(scene);
    let hit_color = ambient.extend(1.0);
    let miss_color = if render.film_transparent {
        Vector4::ZERO
    } else {
        ambient.extend(1.0)
    };

    let projection = camera.projection;
    let forward = -camera.matrix_world.z_axis.truncate().normalize();
    let corners = frame_corners(&camera.matrix_world, &projection, width, height);
    let origins = get_pixel_centers(width, height, &corners);

    // --- Rayon Multithreading ---
    let pixel_colors: Vec<Vector4> = origins
        .par_iter()
        .map(|origin| {
            let ray = Ray::new(*origin, forward);
            let hit = targets
                .iter()
                .any(|t| t.intersect(&ray, projection.clip_start, projection.clip_end).is_some());
            if hit { hit_color } else { miss_color }
        })
        .collect();
    // -----------------------------

    info!("Rendering took: {:?}", start.elapsed());
    Ok(ImageData::new(width, height, pixel_colors))
}
