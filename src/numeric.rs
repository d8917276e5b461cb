/*

    Declare numeric types used throughout this crate.

    Host scene data (world matrices, bounding corners)
    is double precision, so everything here is built on
    bevy_math's D* types.

    @date: 2 Oct, 2025
    @author: Bartu
*/

use bevy_math::{DMat4, DVec3, DVec4};
pub type Float = f64;
pub type Vector3 = DVec3;
pub type Matrix4 = DMat4;
pub type Vector4 = DVec4;

pub fn approx_zero(x: Float) -> bool {
    x.abs() < 1e-8
}

pub fn approx_eq(a: Float, b: Float) -> bool {
    approx_zero(a - b)
}

pub fn transform_point(mat: &Matrix4, v: &Vector3) -> Vector3 {
    let v4 = Vector4::new(v.x, v.y, v.z, 1.0);
    let r = *mat * v4;
    Vector3::new(r.x, r.y, r.z)
}

pub fn transform_dir(mat: &Matrix4, v: &Vector3) -> Vector3 {
    // Only difference from transform_point is that last component
    // w = 0
    let v4 = Vector4::new(v.x, v.y, v.z, 0.0);
    let r = *mat * v4;
    Vector3::new(r.x, r.y, r.z)
}

/// Component of `v` along axis index 0, 1 or 2 (x, y, z).
pub fn axis_component(v: &Vector3, axis: usize) -> Float {
    v[axis]
}
