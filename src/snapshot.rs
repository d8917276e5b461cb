/*

    Backup and restore of every piece of global render/world
    state a capture mutates, plus the flat-lighting setup.

    SceneTransaction ties the two together: it snapshots on
    begin and restores (and deletes the temporary camera) when
    dropped, which covers normal returns, early returns through
    `?`, reported cancellation and panics alike.

    @date: Nov, 2025
    @author: bartu
*/

use std::collections::{BTreeMap, HashMap};

use crate::host::{Host, ImageSettings, SceneId, World};
use crate::settings::ImageFormat;
use crate::prelude::*;

pub const TEMP_WORLD_BASENAME: &str = "CubeCaptureFlatWorld";
pub const TEMP_CAMERA_BASENAME: &str = "CubeCaptureTempCamera";

const EEVEE_NEXT: &str = "BLENDER_EEVEE_NEXT";
const EEVEE_LEGACY: &str = "BLENDER_EEVEE";

/// Toggles switched off for flat lighting, whichever of them the host exposes.
pub const FLATTEN_TOGGLES: [&str; 4] = [
    "use_gtao",
    "use_ssr",
    "use_screen_space_reflections",
    "use_soft_shadows",
];

#[derive(Debug, Clone, PartialEq)]
pub struct SceneSettingsSnapshot {
    pub engine: String,
    pub filepath: String,
    pub resolution_x: u32,
    pub resolution_y: u32,
    pub resolution_percentage: u32,
    pub film_transparent: bool,
    pub image_settings: ImageSettings,
    pub engine_toggles: BTreeMap<String, bool>,
    pub camera_name: Option<String>,
    pub use_nodes: bool,
    pub background_color: Vector3,
    pub background_strength: Float,
    pub world_name: Option<String>,
}

impl SceneSettingsSnapshot {

    pub fn backup<H: Host + ?Sized>(host: &H) -> Self {
        let render = host.render_settings();

        let world_name = host.active_world();
        let mut use_nodes = false;
        let mut background_color = Vector3::ZERO;
        let mut background_strength = 1.0;
        if let Some(world) = world_name.as_deref().and_then(|name| host.world(name)) {
            use_nodes = world.use_nodes;
            if use_nodes {
                if let Some(bg) = &world.background {
                    background_color = bg.color;
                    background_strength = bg.strength;
                }
            }
        }

        Self {
            engine: render.engine.clone(),
            filepath: render.filepath.clone(),
            resolution_x: render.resolution_x,
            resolution_y: render.resolution_y,
            resolution_percentage: render.resolution_percentage,
            film_transparent: render.film_transparent,
            image_settings: render.image_settings.clone(),
            engine_toggles: host.engine_toggles(),
            camera_name: host.active_camera(),
            use_nodes,
            background_color,
            background_strength,
            world_name,
        }
    }

    pub fn restore<H: Host + ?Sized>(&self, host: &mut H, temp_worlds: &mut TempWorldRegistry) {
        {
            let render = host.render_settings_mut();
            render.engine = self.engine.clone();
            render.filepath = self.filepath.clone();
            render.resolution_x = self.resolution_x;
            render.resolution_y = self.resolution_y;
            render.resolution_percentage = self.resolution_percentage;
            render.film_transparent = self.film_transparent;
            render.image_settings = self.image_settings.clone();
        }
        for (name, value) in &self.engine_toggles {
            host.set_engine_toggle(name, *value);
        }

        // Re-resolve by name; anything deleted meanwhile becomes "none"
        let camera = self.camera_name.as_deref().filter(|name| host.object_exists(name));
        host.set_active_camera(camera);

        let world = self.world_name.as_deref().filter(|name| host.world(name).is_some());
        host.set_active_world(world);
        if let Some(world) = world.and_then(|name| host.world_mut(name)) {
            if self.use_nodes {
                if let Some(bg) = world.background.as_mut() {
                    bg.color = self.background_color;
                    bg.strength = self.background_strength;
                }
            }
            world.use_nodes = self.use_nodes;
        }

        if let Some(temp_name) = temp_worlds.take(host.scene_id()) {
            if host.world(&temp_name).is_some() && host.world_users(&temp_name) == 0 {
                debug!("Removing temporary world '{}'", temp_name);
                host.remove_world(&temp_name);
            }
        }
    }
}

/// Temporary flat worlds created per scene, waiting to be collected on restore.
#[derive(Debug, Default)]
pub struct TempWorldRegistry {
    assignments: HashMap<SceneId, String>,
}

impl TempWorldRegistry {
    pub fn assign(&mut self, scene: SceneId, world_name: String) {
        if let Some(previous) = self.assignments.insert(scene, world_name) {
            warn!("Scene {} already had temporary world '{}' assigned", scene, previous);
        }
    }

    pub fn take(&mut self, scene: SceneId) -> Option<String> {
        self.assignments.remove(&scene)
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

/// Best real-time engine this host offers, if any.
pub fn select_realtime_engine(available: &[String]) -> Option<&'static str> {
    [EEVEE_NEXT, EEVEE_LEGACY]
        .into_iter()
        .find(|id| available.iter().any(|a| a == id))
}

/// Swap the scene's lighting for a uniform white environment on a transparent film.
pub fn ensure_flat_lighting<H: Host + ?Sized>(host: &mut H, temp_worlds: &mut TempWorldRegistry) {
    match select_realtime_engine(&host.available_engines()) {
        Some(engine) => host.render_settings_mut().engine = engine.to_string(),
        None => warn!("No real-time engine available, keeping '{}'", host.render_settings().engine),
    }
    host.render_settings_mut().film_transparent = true;

    for toggle in FLATTEN_TOGGLES {
        if host.set_engine_toggle(toggle, false) {
            debug!("Disabled {}", toggle);
        }
    }

    let world_name = host.create_world(TEMP_WORLD_BASENAME, World::flat());
    host.set_active_world(Some(&world_name));
    temp_worlds.assign(host.scene_id(), world_name);
}

pub fn apply_render_resolution<H: Host + ?Sized>(host: &mut H, width: u32, height: u32) {
    let render = host.render_settings_mut();
    render.resolution_x = width;
    render.resolution_y = height;
    render.resolution_percentage = 100;
}

pub fn apply_image_format<H: Host + ?Sized>(host: &mut H, format: ImageFormat) {
    let image_settings = &mut host.render_settings_mut().image_settings;
    image_settings.file_format = format.file_format().to_string();
    image_settings.color_mode = format.color_mode().to_string();
    image_settings.color_depth = format.color_depth().to_string();
}


/// Scope guard around the mutate-and-render phase of a capture.
pub struct SceneTransaction<'a, H: Host + ?Sized> {
    host: &'a mut H,
    temp_worlds: &'a mut TempWorldRegistry,
    snapshot: Option<SceneSettingsSnapshot>,
    camera: Option<String>,
}

impl<'a, H: Host + ?Sized> SceneTransaction<'a, H> {
    pub fn begin(host: &'a mut H, temp_worlds: &'a mut TempWorldRegistry) -> Self {
        let snapshot = SceneSettingsSnapshot::backup(&*host);
        debug!("Scene settings backed up: {:?}", snapshot);
        Self {
            host,
            temp_worlds,
            snapshot: Some(snapshot),
            camera: None,
        }
    }

    pub fn host(&mut self) -> &mut H {
        self.host
    }

    /// Creates the temporary orthographic camera, deleted again when the transaction ends.
    pub fn create_camera(&mut self) -> String {
        let name = self.host.create_camera(TEMP_CAMERA_BASENAME);
        debug!("Created temporary camera '{}'", name);
        self.camera = Some(name.clone());
        name
    }

    pub fn ensure_flat_lighting(&mut self) {
        ensure_flat_lighting(&mut *self.host, &mut *self.temp_worlds);
    }
}

impl<'a, H: Host + ?Sized> Drop for SceneTransaction<'a, H> {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            snapshot.restore(&mut *self.host, &mut *self.temp_worlds);
            debug!("Scene settings restored");
        }
        if let Some(camera) = self.camera.take() {
            if !self.host.remove_camera(&camera) {
                warn!("Temporary camera '{}' was already gone", camera);
            }
        }
    }
}
