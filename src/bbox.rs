/*

    World-space Axis Aligned Bounding Box of
    a collection's visible, renderable geometry.

    @author: bartu
    @date: 9 Nov, 2025
*/


use crate::prelude::*;

use crate::host::{EvalContext, SceneGraph};
use crate::interval::Interval;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub minimum: Vector3,
    pub maximum: Vector3,
}

impl Bounds {
    pub fn new_from(xint: &Interval, yint: &Interval, zint: &Interval) -> Option<Self> {
        if !(xint.validate() && yint.validate() && zint.validate()) {
            return None;
        }
        Some(Self {
            minimum: Vector3::new(xint.min, yint.min, zint.min),
            maximum: Vector3::new(xint.max, yint.max, zint.max),
        })
    }

    pub fn size(&self) -> Vector3 {
        self.maximum - self.minimum
    }

    pub fn center(&self) -> Vector3 {
        (self.minimum + self.maximum) * 0.5
    }
}

/// Running min/max over sampled points, one interval per axis.
#[derive(Debug, Clone, Copy)]
pub struct BoundsAccumulator {
    axes: [Interval; 3],
}

impl Default for BoundsAccumulator {
    fn default() -> Self {
        Self { axes: [Interval::EMPTY; 3] }
    }
}

impl BoundsAccumulator {
    pub fn add_point(&mut self, p: Vector3) {
        for (axis, int) in self.axes.iter_mut().enumerate() {
            int.expand(p[axis]);
        }
    }

    /// None if no point was ever added.
    pub fn finish(&self) -> Option<Bounds> {
        Bounds::new_from(&self.axes[0], &self.axes[1], &self.axes[2])
    }
}

/// The 8 corners of the box spanned by `min` and `max`.
pub fn box_corners(min: Vector3, max: Vector3) -> [Vector3; 8] {
    [
        Vector3::new(min.x, min.y, min.z),
        Vector3::new(min.x, min.y, max.z),
        Vector3::new(min.x, max.y, max.z),
        Vector3::new(min.x, max.y, min.z),
        Vector3::new(max.x, min.y, min.z),
        Vector3::new(max.x, min.y, max.z),
        Vector3::new(max.x, max.y, max.z),
        Vector3::new(max.x, max.y, min.z),
    ]
}

/// Tight world-space bounds for visible, renderable objects in `collection`.
///
/// Returns None for empty collections, collections where everything is
/// hidden, and collections holding only non-renderable kinds (empties,
/// lights, cameras). That is an expected outcome, not an error.
pub fn compute_bounds<G: SceneGraph + ?Sized>(graph: &G, collection: &str, ctx: &EvalContext) -> Option<Bounds> {

    let mut acc = BoundsAccumulator::default();
    let mut sampled = 0usize;

    for obj in graph.all_objects(collection) {
        if obj.hide_render {
            debug!("Skipping '{}', hidden from render", obj.name);
            continue;
        }
        if let Some(layer) = ctx.view_layer {
            if !graph.visible_in_layer(&obj, layer) {
                debug!("Skipping '{}', not visible in view layer '{}'", obj.name, layer);
                continue;
            }
        }

        let source = if ctx.evaluated { graph.evaluated(&obj) } else { obj };
        if !source.kind.is_renderable() {
            continue;
        }
        for corner in source.world_corners() {
            acc.add_point(corner);
        }
        sampled += 1;
    }

    let bounds = acc.finish();
    match &bounds {
        Some(b) => debug!("Bounds of '{}' over {} objects: {:?} .. {:?}", collection, sampled, b.minimum, b.maximum),
        None => debug!("No renderable geometry found in '{}'", collection),
    }
    bounds
}
