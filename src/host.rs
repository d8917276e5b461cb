/*

    Collaborator interface consumed from the host
    3D application: read-only scene graph access,
    global render/world state, temporary camera and
    world data-blocks, and the still render itself.

    Everything is addressed by name, the same way
    the host resolves data-blocks, so identities
    survive objects being replaced or deleted.

    @date: Nov, 2025
    @author: bartu
*/

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::camera::OrthoProjection;
use crate::error::HostError;
use crate::prelude::*;

/// Identity of a scene, stable for the lifetime of the host session.
pub type SceneId = u64;

/// Geometry kind of a scene object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectKind {
    Mesh,
    Curve,
    Surface,
    Meta,
    Font,
    Volume,
    #[serde(rename = "GPENCIL")]
    GreasePencil,
    #[serde(rename = "POINTCLOUD")]
    PointCloud,
    Empty,
    Light,
    Camera,
    Armature,
    Lattice,
    Speaker,
}

impl ObjectKind {
    /// Kinds that produce visible surfaces in a render.
    pub fn is_renderable(&self) -> bool {
        matches!(
            self,
            ObjectKind::Mesh
                | ObjectKind::Curve
                | ObjectKind::Surface
                | ObjectKind::Meta
                | ObjectKind::Font
                | ObjectKind::Volume
                | ObjectKind::GreasePencil
                | ObjectKind::PointCloud
        )
    }
}

/// Read-only view of an object as the host exposes it.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    pub name: String,
    pub kind: ObjectKind,
    pub hide_render: bool,
    pub matrix_world: Matrix4,
    /// The 8 corners of the local-space bounding box.
    pub bound_box: [Vector3; 8],
}

impl SceneObject {
    pub fn world_corners(&self) -> impl Iterator<Item = Vector3> + '_ {
        self.bound_box
            .iter()
            .map(move |corner| transform_point(&self.matrix_world, corner))
    }
}

/// How `compute_bounds` should look at objects.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvalContext<'a> {
    /// Use post-modifier geometry.
    pub evaluated: bool,
    /// Skip objects not visible in this view layer.
    pub view_layer: Option<&'a str>,
}

pub trait SceneGraph {
    /// Every object linked into `collection` or any collection nested under it.
    /// Unknown collections yield nothing.
    fn all_objects(&self, collection: &str) -> Vec<SceneObject>;

    fn visible_in_layer(&self, object: &SceneObject, view_layer: &str) -> bool;

    /// Post-modifier form of `object`.
    fn evaluated(&self, object: &SceneObject) -> SceneObject {
        object.clone()
    }
}


#[derive(Debug, Clone, PartialEq, Eq, Deserialize, SmartDefault)]
#[serde(default, rename_all = "PascalCase")]
pub struct ImageSettings {
    #[default = "PNG"]
    pub file_format: String,
    #[default = "RGB"]
    pub color_mode: String,
    #[default = "8"]
    pub color_depth: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, SmartDefault)]
#[serde(default, rename_all = "PascalCase")]
pub struct RenderSettings {
    #[default = "CYCLES"]
    pub engine: String,

    #[default = "//"]
    pub filepath: String,

    #[default = 1920]
    #[serde(deserialize_with = "deser_u32")]
    pub resolution_x: u32,

    #[default = 1080]
    #[serde(deserialize_with = "deser_u32")]
    pub resolution_y: u32,

    #[default = 100]
    #[serde(deserialize_with = "deser_u32")]
    pub resolution_percentage: u32,

    #[serde(deserialize_with = "deser_bool")]
    pub film_transparent: bool,

    pub image_settings: ImageSettings,
}

impl RenderSettings {
    /// Pixel size of the rendered image after the percentage scale.
    pub fn effective_resolution(&self) -> (u32, u32) {
        let scale = |r: u32| ((r as u64 * self.resolution_percentage as u64) / 100).max(1) as u32;
        (scale(self.resolution_x), scale(self.resolution_y))
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Background {
    #[serde(deserialize_with = "deser_vec3")]
    pub color: Vector3,
    #[serde(deserialize_with = "deser_float")]
    pub strength: Float,
}

/// Environment data-block. Only the first "Background" shader
/// node of its node tree is modelled.
#[derive(Debug, Clone, PartialEq, Deserialize, SmartDefault)]
#[serde(default, rename_all = "PascalCase")]
pub struct World {
    #[serde(deserialize_with = "deser_bool")]
    pub use_nodes: bool,
    pub background: Option<Background>,
}

impl World {
    /// Uniform, shadowless white environment.
    pub fn flat() -> Self {
        World {
            use_nodes: true,
            background: Some(Background {
                color: Vector3::ONE,
                strength: 1.0,
            }),
        }
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Finished,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportLevel {
    Info,
    Error,
}


pub trait Host: SceneGraph {
    fn scene_id(&self) -> SceneId;

    // ---- context -------------------------------------------------------
    fn active_collection(&self) -> Option<String>;
    fn context_collection(&self) -> Option<String>;
    fn view_layer(&self) -> Option<String>;

    /// Whether an evaluated (post-modifier) graph is available.
    fn supports_evaluation(&self) -> bool {
        true
    }

    // ---- render settings -----------------------------------------------
    fn render_settings(&self) -> &RenderSettings;
    fn render_settings_mut(&mut self) -> &mut RenderSettings;

    /// Engine identifiers this host build offers.
    fn available_engines(&self) -> Vec<String>;

    /// Scene-wide lighting toggles, independent of the selected engine.
    /// Which toggles exist varies per host version.
    fn engine_toggles(&self) -> BTreeMap<String, bool>;

    /// Returns false when the host does not expose `name`.
    fn set_engine_toggle(&mut self, name: &str, value: bool) -> bool;

    // ---- cameras ---------------------------------------------------------
    fn active_camera(&self) -> Option<String>;
    fn set_active_camera(&mut self, name: Option<&str>);
    fn object_exists(&self, name: &str) -> bool;

    /// Creates an orthographic camera object and links it into the scene.
    /// Returns the final (possibly uniquified) name.
    fn create_camera(&mut self, base_name: &str) -> String;
    fn set_camera(&mut self, name: &str, matrix_world: Matrix4, projection: OrthoProjection) -> Result<(), HostError>;

    /// Removes the camera object together with its camera data.
    fn remove_camera(&mut self, name: &str) -> bool;

    // ---- worlds ----------------------------------------------------------
    fn active_world(&self) -> Option<String>;
    fn set_active_world(&mut self, name: Option<&str>);
    fn world(&self, name: &str) -> Option<&World>;
    fn world_mut(&mut self, name: &str) -> Option<&mut World>;

    /// Returns the final (possibly uniquified) name.
    fn create_world(&mut self, base_name: &str, world: World) -> String;
    fn world_users(&self, name: &str) -> usize;
    fn remove_world(&mut self, name: &str) -> bool;

    // ---- output ----------------------------------------------------------
    /// Resolves host-relative paths (`//` prefix) to a filesystem path.
    fn resolve_path(&self, path: &str) -> PathBuf;

    /// Renders the active camera to `render_settings().filepath`.
    fn render_still(&mut self) -> Result<RenderOutcome, HostError>;

    fn report(&mut self, level: ReportLevel, message: &str) {
        match level {
            ReportLevel::Info => info!("{}", message),
            ReportLevel::Error => error!("{}", message),
        }
    }
}
