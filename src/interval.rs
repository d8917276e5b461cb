/*

    Closed range [min, max] along a single axis.
    Bounds are folded one axis at a time by
    expanding an interval that starts EMPTY:
    EMPTY is (inf, -inf), i.e. nothing sampled yet.

    @author: Bartu
    @date: Sept 2025

*/

use crate::numeric::{Float};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub min: Float,
    pub max: Float,
}

impl Interval {

    pub const EMPTY: Self = Self {
        min: FloatConst::INF,
        max: FloatConst::NEG_INF,
    };

    pub fn new(min: Float, max: Float) -> Self {
        Self {
            min,
            max,
        }
    }

    /// False while nothing has been folded in (min > max).
    pub fn validate(&self) -> bool {
        self.max >= self.min
    }

    pub fn size(&self) -> Float {
        self.max - self.min
    }

    pub fn expand(&mut self, x: Float) {
        if x < self.min { self.min = x; }
        if x > self.max { self.max = x; }
    }

}


pub trait FloatConst: Copy {
    const INF: Self;
    const NEG_INF: Self;
}

impl FloatConst for f32 {
    const INF: Self = f32::INFINITY;
    const NEG_INF: Self = f32::NEG_INFINITY;
}

impl FloatConst for f64 {
    const INF: Self = f64::INFINITY;
    const NEG_INF: Self = f64::NEG_INFINITY;
}
