/*

    The six canonical axis-aligned views.

    Each view maps to a fixed (direction, up, depth axis,
    plane axes) entry, so no look-at solving is needed.

    @date: Nov, 2025
    @author: bartu
*/

use std::fmt;
use std::str::FromStr;

use crate::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    Front,
    Back,
    Right,
    Left,
    Top,
    Bottom,
}

/// Static table entry for a view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewAxes {
    /// Direction the camera looks along, pointing from the camera into the scene.
    pub direction: Vector3,
    pub up: Vector3,
    /// Axis index the camera looks along.
    pub depth_axis: usize,
    /// The two in-plane axis indices (width, height).
    pub plane_axes: (usize, usize),
}

impl View {
    /// Capture order.
    pub const ALL: [View; 6] = [View::Front, View::Back, View::Right, View::Left, View::Top, View::Bottom];

    pub fn axes(&self) -> ViewAxes {
        let (direction, up, depth_axis, plane_axes) = match self {
            View::Front  => (Vector3::new(0.0, -1.0, 0.0), Vector3::Z, 1, (0, 2)),
            View::Back   => (Vector3::new(0.0, 1.0, 0.0),  Vector3::Z, 1, (0, 2)),
            View::Right  => (Vector3::new(-1.0, 0.0, 0.0), Vector3::Z, 0, (1, 2)),
            View::Left   => (Vector3::new(1.0, 0.0, 0.0),  Vector3::Z, 0, (1, 2)),
            View::Top    => (Vector3::new(0.0, 0.0, -1.0), Vector3::Y, 2, (0, 1)),
            View::Bottom => (Vector3::new(0.0, 0.0, 1.0),  Vector3::Y, 2, (0, 1)),
        };
        ViewAxes { direction, up, depth_axis, plane_axes }
    }

    /// Upper-case identifier, as stored in settings.
    pub fn key(&self) -> &'static str {
        match self {
            View::Front => "FRONT",
            View::Back => "BACK",
            View::Right => "RIGHT",
            View::Left => "LEFT",
            View::Top => "TOP",
            View::Bottom => "BOTTOM",
        }
    }

    /// Lower-case name used in output file names.
    pub fn file_stem(&self) -> String {
        self.key().to_lowercase()
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown view '{0}'")]
pub struct UnknownView(pub String);

impl FromStr for View {
    type Err = UnknownView;

    /// Accepts only the six exact upper-case keys.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        View::ALL
            .into_iter()
            .find(|v| v.key() == s)
            .ok_or_else(|| UnknownView(s.to_string()))
    }
}
