/*

    In-process host: a scene description read from JSON
    that implements the whole Host interface, including
    a still render to disk.

    Data-blocks are identified by name. Names created at
    runtime are made unique the same way the host does it
    ("Name", "Name.001", "Name.002", ...).

    @date: 2 Oct, 2025
    @author: Bartu
*/

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::bbox::{box_corners, BoundsAccumulator};
use crate::camera::OrthoProjection;
use crate::error::HostError;
use crate::host::*;
use crate::json_parser::load_ply_vertices;
use crate::prelude::*;
use crate::raster;

static NEXT_SCENE_ID: AtomicU64 = AtomicU64::new(1);

fn next_scene_id() -> SceneId {
    NEXT_SCENE_ID.fetch_add(1, Ordering::Relaxed)
}

fn default_engines() -> Vec<String> {
    ["BLENDER_EEVEE_NEXT", "BLENDER_WORKBENCH", "CYCLES"].iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, Deserialize, SmartDefault)]
#[serde(default, rename_all = "PascalCase")]
pub struct CollectionData {
    pub name: String,
    pub objects: Vec<String>,
    pub children: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, SmartDefault)]
#[serde(default, rename_all = "PascalCase")]
pub struct ObjectData {
    pub name: String,

    #[default(ObjectKind::Mesh)]
    #[serde(rename = "Type")]
    pub kind: ObjectKind,

    #[serde(deserialize_with = "deser_bool")]
    pub hide_render: bool,

    #[serde(deserialize_with = "deser_vec3")]
    pub translation: Vector3,

    /// XYZ euler angles in degrees.
    #[serde(deserialize_with = "deser_vec3")]
    pub rotation: Vector3,

    #[default(Vector3::ONE)]
    #[serde(deserialize_with = "deser_vec3")]
    pub scale: Vector3,

    #[serde(deserialize_with = "deser_opt_vec3")]
    pub bound_min: Option<Vector3>,

    #[serde(deserialize_with = "deser_opt_vec3")]
    pub bound_max: Option<Vector3>,

    #[serde(deserialize_with = "deser_vertex_data")]
    pub vertices: Vec<Vector3>,

    pub ply_file: Option<String>,

    /// Post-modifier growth of the local bounds on every side.
    #[serde(deserialize_with = "deser_float")]
    pub inflate: Float,
}

impl ObjectData {
    pub fn matrix_world(&self) -> Matrix4 {
        let r = self.rotation;
        let rotation = bevy_math::DQuat::from_euler(
            bevy_math::EulerRot::XYZ,
            r.x.to_radians(),
            r.y.to_radians(),
            r.z.to_radians(),
        );
        Matrix4::from_scale_rotation_translation(self.scale, rotation, self.translation)
    }

    /// Local (min, max); explicit bounds win over vertex data, unit cube otherwise.
    pub fn local_bounds(&self) -> (Vector3, Vector3) {
        if let (Some(min), Some(max)) = (self.bound_min, self.bound_max) {
            return (min.min(max), min.max(max));
        }
        let mut acc = BoundsAccumulator::default();
        for v in &self.vertices {
            acc.add_point(*v);
        }
        match acc.finish() {
            Some(b) => (b.minimum, b.maximum),
            None => (-Vector3::ONE, Vector3::ONE),
        }
    }

    fn to_scene_object(&self) -> SceneObject {
        let (min, max) = self.local_bounds();
        SceneObject {
            name: self.name.clone(),
            kind: self.kind,
            hide_render: self.hide_render,
            matrix_world: self.matrix_world(),
            bound_box: box_corners(min, max),
        }
    }
}

#[derive(Debug, Clone, Deserialize, SmartDefault)]
#[serde(default, rename_all = "PascalCase")]
pub struct ViewLayerData {
    #[default = "ViewLayer"]
    pub name: String,
    /// Objects hidden in this view layer.
    pub hidden: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, rename_all = "PascalCase")]
pub struct CameraData {
    pub name: String,
    #[serde(skip)]
    pub matrix_world: Matrix4,
    #[serde(skip)]
    pub projection: OrthoProjection,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, rename_all = "PascalCase")]
pub struct WorldData {
    pub name: String,
    #[serde(flatten)]
    pub data: World,
    /// References held outside of this scene.
    pub fake_users: usize,
}

#[derive(Debug, Deserialize, SmartDefault)]
#[serde(default, rename_all = "PascalCase")]
pub struct MemoryScene {
    #[default = "Scene"]
    pub name: String,

    #[serde(skip)]
    #[default(_code = "next_scene_id()")]
    id: SceneId,

    /// Used for `//` paths, defaults to the capture file's folder.
    pub project_dir: Option<PathBuf>,

    #[default = "Scene Collection"]
    pub scene_collection: String,
    pub active_collection: Option<String>,
    pub collections: Vec<CollectionData>,
    pub objects: Vec<ObjectData>,
    pub view_layer: Option<ViewLayerData>,

    pub render: RenderSettings,
    #[default(_code = "default_engines()")]
    pub engines: Vec<String>,
    pub engine_toggles: BTreeMap<String, bool>,

    pub cameras: Vec<CameraData>,
    pub active_camera: Option<String>,

    pub worlds: Vec<WorldData>,
    pub active_world: Option<String>,

    /// Simulates the user interrupting the next render.
    #[serde(deserialize_with = "deser_bool")]
    pub cancel_render: bool,

    #[serde(skip)]
    reports: Vec<(ReportLevel, String)>,

    #[serde(skip)]
    renders: usize,
}

impl MemoryScene {

    pub fn setup_after_json(&mut self, json_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
        if self.project_dir.is_none() {
            self.project_dir = Some(json_dir.to_path_buf());
        }
        for obj in self.objects.iter_mut() {
            if let Some(ply) = &obj.ply_file {
                let ply_path = json_dir.join(ply);
                obj.vertices = load_ply_vertices(&ply_path)?;
                info!("Loaded {} vertices for '{}' from {}", obj.vertices.len(), obj.name, ply_path.display());
            }
        }
        debug!("Scene '{}' has {} objects in {} collections", self.name, self.objects.len(), self.collections.len());
        Ok(())
    }

    pub fn root_collection(&self) -> &str {
        &self.scene_collection
    }

    pub fn view_layer_name(&self) -> Option<&str> {
        self.view_layer.as_ref().map(|layer| layer.name.as_str())
    }

    pub fn camera(&self, name: &str) -> Option<&CameraData> {
        self.cameras.iter().find(|c| c.name == name)
    }

    pub fn world_count(&self) -> usize {
        self.worlds.len()
    }

    pub fn add_fake_user(&mut self, world: &str) {
        if let Some(w) = self.worlds.iter_mut().find(|w| w.name == world) {
            w.fake_users += 1;
        }
    }

    pub fn set_available_engines(&mut self, engines: Vec<String>) {
        self.engines = engines;
    }

    pub fn reports(&self) -> &[(ReportLevel, String)] {
        &self.reports
    }

    /// Number of renders that actually ran.
    pub fn render_count(&self) -> usize {
        self.renders
    }

    fn object(&self, name: &str) -> Option<&ObjectData> {
        self.objects.iter().find(|o| o.name == name)
    }

    fn collection(&self, name: &str) -> Option<&CollectionData> {
        self.collections.iter().find(|c| c.name == name)
    }

    fn unique_name(&self, base: &str, taken: impl Fn(&str) -> bool) -> String {
        if !taken(base) {
            return base.to_string();
        }
        (1..)
            .map(|i| format!("{}.{:03}", base, i))
            .find(|candidate| !taken(candidate))
            .unwrap_or_else(|| base.to_string())
    }

    fn collect_object_names(&self, collection: &str, visited: &mut BTreeSet<String>, out: &mut Vec<String>) {
        if !visited.insert(collection.to_string()) {
            return;
        }
        let Some(data) = self.collection(collection) else {
            return;
        };
        for name in &data.objects {
            if !out.contains(name) {
                out.push(name.clone());
            }
        }
        for child in &data.children {
            self.collect_object_names(child, visited, out);
        }
    }
}

impl SceneGraph for MemoryScene {
    fn all_objects(&self, collection: &str) -> Vec<SceneObject> {
        // An undeclared scene collection holds every object
        if collection == self.scene_collection && self.collection(collection).is_none() {
            return self.objects.iter().map(ObjectData::to_scene_object).collect();
        }

        let mut names = Vec::new();
        self.collect_object_names(collection, &mut BTreeSet::new(), &mut names);
        names
            .iter()
            .filter_map(|name| {
                let obj = self.object(name);
                if obj.is_none() {
                    warn!("Collection '{}' links unknown object '{}'", collection, name);
                }
                obj
            })
            .map(ObjectData::to_scene_object)
            .collect()
    }

    fn visible_in_layer(&self, object: &SceneObject, view_layer: &str) -> bool {
        match &self.view_layer {
            Some(layer) if layer.name == view_layer => !layer.hidden.contains(&object.name),
            _ => true,
        }
    }

    fn evaluated(&self, object: &SceneObject) -> SceneObject {
        let inflate = self.object(&object.name).map(|o| o.inflate).unwrap_or(0.0);
        if approx_zero(inflate) {
            return object.clone();
        }
        let mut acc = BoundsAccumulator::default();
        for corner in object.bound_box {
            acc.add_point(corner);
        }
        let mut evaluated = object.clone();
        if let Some(local) = acc.finish() {
            evaluated.bound_box = box_corners(local.minimum - Vector3::splat(inflate), local.maximum + Vector3::splat(inflate));
        }
        evaluated
    }
}

impl Host for MemoryScene {
    fn scene_id(&self) -> SceneId {
        self.id
    }

    fn active_collection(&self) -> Option<String> {
        self.active_collection.clone()
    }

    /// The scene collection, unless the scene declares none (empty name).
    fn context_collection(&self) -> Option<String> {
        (!self.scene_collection.is_empty()).then(|| self.scene_collection.clone())
    }

    fn view_layer(&self) -> Option<String> {
        self.view_layer_name().map(str::to_string)
    }

    fn render_settings(&self) -> &RenderSettings {
        &self.render
    }

    fn render_settings_mut(&mut self) -> &mut RenderSettings {
        &mut self.render
    }

    fn available_engines(&self) -> Vec<String> {
        self.engines.clone()
    }

    fn engine_toggles(&self) -> BTreeMap<String, bool> {
        self.engine_toggles.clone()
    }

    fn set_engine_toggle(&mut self, name: &str, value: bool) -> bool {
        match self.engine_toggles.get_mut(name) {
            Some(toggle) => {
                *toggle = value;
                true
            }
            None => false,
        }
    }

    fn active_camera(&self) -> Option<String> {
        self.active_camera.clone()
    }

    fn set_active_camera(&mut self, name: Option<&str>) {
        self.active_camera = name.map(str::to_string);
    }

    fn object_exists(&self, name: &str) -> bool {
        self.object(name).is_some() || self.camera(name).is_some()
    }

    fn create_camera(&mut self, base_name: &str) -> String {
        let name = self.unique_name(base_name, |n| self.object_exists(n));
        self.cameras.push(CameraData {
            name: name.clone(),
            ..Default::default()
        });
        name
    }

    fn set_camera(&mut self, name: &str, matrix_world: Matrix4, projection: OrthoProjection) -> Result<(), HostError> {
        let camera = self
            .cameras
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| HostError::MissingCamera(name.to_string()))?;
        camera.matrix_world = matrix_world;
        camera.projection = projection;
        Ok(())
    }

    fn remove_camera(&mut self, name: &str) -> bool {
        let before = self.cameras.len();
        self.cameras.retain(|c| c.name != name);
        if self.active_camera.as_deref() == Some(name) {
            self.active_camera = None;
        }
        self.cameras.len() != before
    }

    fn active_world(&self) -> Option<String> {
        self.active_world.clone()
    }

    fn set_active_world(&mut self, name: Option<&str>) {
        self.active_world = name.map(str::to_string);
    }

    fn world(&self, name: &str) -> Option<&World> {
        self.worlds.iter().find(|w| w.name == name).map(|w| &w.data)
    }

    fn world_mut(&mut self, name: &str) -> Option<&mut World> {
        self.worlds.iter_mut().find(|w| w.name == name).map(|w| &mut w.data)
    }

    fn create_world(&mut self, base_name: &str, world: World) -> String {
        let name = self.unique_name(base_name, |n| self.world(n).is_some());
        self.worlds.push(WorldData {
            name: name.clone(),
            data: world,
            fake_users: 0,
        });
        name
    }

    fn world_users(&self, name: &str) -> usize {
        let fake = self.worlds.iter().find(|w| w.name == name).map_or(0, |w| w.fake_users);
        let active = usize::from(self.active_world.as_deref() == Some(name));
        fake + active
    }

    fn remove_world(&mut self, name: &str) -> bool {
        let before = self.worlds.len();
        self.worlds.retain(|w| w.name != name);
        if self.active_world.as_deref() == Some(name) {
            self.active_world = None;
        }
        self.worlds.len() != before
    }

    fn resolve_path(&self, path: &str) -> PathBuf {
        match path.strip_prefix("//") {
            Some(relative) => self
                .project_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(relative),
            None => PathBuf::from(path),
        }
    }

    fn render_still(&mut self) -> Result<RenderOutcome, HostError> {
        if self.cancel_render {
            info!("Render interrupted");
            return Ok(RenderOutcome::Cancelled);
        }
        let image = raster::render_active_camera(self)?;
        let path = self.resolve_path(&self.render.filepath);
        let settings = &self.render.image_settings;
        image.save(&path, &settings.file_format, &settings.color_depth)?;
        self.renders += 1;
        Ok(RenderOutcome::Finished)
    }

    fn report(&mut self, level: ReportLevel, message: &str) {
        match level {
            ReportLevel::Info => info!("{}", message),
            ReportLevel::Error => error!("{}", message),
        }
        self.reports.push((level, message.to_string()));
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn scene() -> MemoryScene {
        serde_json::from_str(r#"{
            "Collections": [
                { "Name": "Props", "Objects": ["Crate", "Lamp"], "Children": ["Small"] },
                { "Name": "Small", "Objects": ["Pebble", "Crate"], "Children": ["Props"] }
            ],
            "Objects": [
                { "Name": "Crate", "Type": "MESH", "Translation": "1 0 0" },
                { "Name": "Lamp", "Type": "LIGHT" },
                { "Name": "Pebble", "Type": "MESH", "Scale": "0.1 0.1 0.1", "Inflate": 0.5 },
                { "Name": "Loose", "Type": "CURVE", "Vertices": "0 0 0 2 4 6" }
            ],
            "ViewLayer": { "Name": "ViewLayer", "Hidden": ["Pebble"] },
            "ProjectDir": "/project"
        }"#).unwrap()
    }

    #[test]
    fn nested_collections_are_traversed_once() {
        let s = scene();
        let names: Vec<String> = s.all_objects("Props").into_iter().map(|o| o.name).collect();
        assert_eq!(names, vec!["Crate", "Lamp", "Pebble"]);
        assert!(s.all_objects("Nope").is_empty());
        assert_eq!(s.all_objects("Scene Collection").len(), 4);
    }

    #[test]
    fn object_geometry_sources() {
        let s = scene();
        let loose = s.object("Loose").unwrap();
        assert_eq!(loose.local_bounds(), (Vector3::ZERO, Vector3::new(2.0, 4.0, 6.0)));
        let crate_obj = s.object("Crate").unwrap().to_scene_object();
        assert!(crate_obj.world_corners().all(|c| c.x == 0.0 || c.x == 2.0));
    }

    #[test]
    fn rotation_is_in_degrees() {
        let obj = ObjectData { rotation: Vector3::new(0.0, 0.0, 90.0), ..Default::default() };
        let x = transform_dir(&obj.matrix_world(), &Vector3::X);
        assert!(x.abs_diff_eq(Vector3::Y, 1e-12));
    }

    #[test]
    fn view_layer_and_evaluation() {
        let s = scene();
        let pebble = s.object("Pebble").unwrap().to_scene_object();
        assert!(!s.visible_in_layer(&pebble, "ViewLayer"));
        assert!(s.visible_in_layer(&pebble, "OtherLayer"));
        let evaluated = s.evaluated(&pebble);
        assert_eq!(evaluated.bound_box[6], Vector3::splat(1.5));
    }

    #[test]
    fn names_are_uniquified() {
        let mut s = scene();
        assert_eq!(s.create_camera("Cam"), "Cam");
        assert_eq!(s.create_camera("Cam"), "Cam.001");
        assert_eq!(s.create_camera("Crate"), "Crate.001");
        assert_eq!(s.create_world("W", World::flat()), "W");
        assert_eq!(s.create_world("W", World::flat()), "W.001");
        assert!(s.remove_camera("Cam"));
        assert!(!s.remove_camera("Cam"));
    }

    #[test]
    fn world_users_count_active_and_fake() {
        let mut s = scene();
        let w = s.create_world("W", World::default());
        assert_eq!(s.world_users(&w), 0);
        s.set_active_world(Some(&w));
        assert_eq!(s.world_users(&w), 1);
        s.add_fake_user(&w);
        assert_eq!(s.world_users(&w), 2);
        assert!(s.remove_world(&w));
        assert_eq!(s.active_world(), None);
    }

    #[test]
    fn project_relative_paths() {
        let s = scene();
        assert_eq!(s.resolve_path("//renders"), PathBuf::from("/project/renders"));
        assert_eq!(s.resolve_path("/abs/dir"), PathBuf::from("/abs/dir"));
    }

    #[test]
    fn scenes_get_distinct_ids() {
        assert_ne!(MemoryScene::default().scene_id(), MemoryScene::default().scene_id());
    }

    #[test]
    fn render_without_camera_fails() {
        let mut s = scene();
        assert!(matches!(s.render_still(), Err(HostError::NoActiveCamera)));
    }
}
