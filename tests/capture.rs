use std::fs;
use std::path::Path;

use cube_capture::capture::{CaptureOutcome, CaptureSession};
use cube_capture::error::CaptureError;
use cube_capture::host::{Host, ReportLevel};
use cube_capture::json_parser::parse_capture_json;
use cube_capture::memory::MemoryScene;
use cube_capture::settings::{CaptureSettings, ImageFormat};
use cube_capture::snapshot::{SceneSettingsSnapshot, TEMP_CAMERA_BASENAME, TEMP_WORLD_BASENAME};

const SCENE: &str = r#"{
    "ActiveCollection": "Collection",
    "Collections": [
        { "Name": "Collection", "Objects": ["Cube", "Lamp"] },
        { "Name": "Lights", "Objects": ["Lamp"] },
        { "Name": "Nothing" }
    ],
    "Objects": [
        { "Name": "Cube", "Type": "MESH", "BoundMin": "-0.5 -0.5 -0.5", "BoundMax": "0.5 0.5 0.5" },
        { "Name": "Lamp", "Type": "LIGHT", "Translation": "4 -4 6" }
    ],
    "ViewLayer": { "Name": "ViewLayer" },
    "Render": { "Engine": "CYCLES", "ResolutionX": 1920, "ResolutionY": 1080,
                "ResolutionPercentage": 100, "Filepath": "//tmp/" },
    "Engines": ["CYCLES", "BLENDER_EEVEE_NEXT", "BLENDER_WORKBENCH"],
    "EngineToggles": { "use_gtao": true, "use_soft_shadows": true },
    "Cameras": [ { "Name": "Camera" } ],
    "ActiveCamera": "Camera",
    "Worlds": [ { "Name": "World", "UseNodes": true,
                  "Background": { "Color": "0.05 0.05 0.05", "Strength": 1.0 } } ],
    "ActiveWorld": "World"
}"#;

fn scene_in(dir: &Path) -> MemoryScene {
    let mut scene: MemoryScene = serde_json::from_str(SCENE).unwrap();
    scene.project_dir = Some(dir.to_path_buf());
    scene
}

fn settings() -> CaptureSettings {
    CaptureSettings {
        base_filename: "cube".to_string(),
        resolution_x: 512,
        resolution_y: 512,
        padding_ratio: 0.05,
        ..Default::default()
    }
}

fn assert_untouched(scene: &MemoryScene, before: &SceneSettingsSnapshot) {
    assert_eq!(&SceneSettingsSnapshot::backup(scene), before);
    assert_eq!(scene.render_settings().engine, "CYCLES");
    assert_eq!(scene.active_camera().as_deref(), Some("Camera"));
    assert_eq!(scene.active_world().as_deref(), Some("World"));
    assert!(!scene.object_exists(TEMP_CAMERA_BASENAME));
    assert_eq!(scene.cameras.len(), 1);
    assert!(scene.world(TEMP_WORLD_BASENAME).is_none());
    assert_eq!(scene.world_count(), 1);
}

#[test]
fn front_capture_writes_png_and_restores_scene() {
    let dir = tempfile::tempdir().unwrap();
    let mut scene = scene_in(dir.path());
    let before = SceneSettingsSnapshot::backup(&scene);

    let outcome = CaptureSession::new().capture(&mut scene, &settings()).unwrap();

    let expected = dir.path().join("renders").join("cube_front.png");
    assert_eq!(outcome, CaptureOutcome::Saved(expected.clone()));
    let image = image::open(&expected).unwrap().to_rgba8();
    assert_eq!(image.dimensions(), (512, 512));

    // Flat lighting: white silhouette on a transparent film
    assert_eq!(image.get_pixel(256, 256).0, [255, 255, 255, 255]);
    assert_eq!(image.get_pixel(0, 0).0[3], 0);

    assert_untouched(&scene, &before);
    assert_eq!(scene.render_count(), 1);
    let (level, message) = scene.reports().last().unwrap();
    assert_eq!(*level, ReportLevel::Info);
    assert!(message.contains("cube_front.png"));
}

#[test]
fn empty_collection_aborts_without_files() {
    let dir = tempfile::tempdir().unwrap();
    let mut scene = scene_in(dir.path());
    let before = SceneSettingsSnapshot::backup(&scene);

    for collection in ["Nothing", "Lights"] {
        scene.active_collection = Some(collection.to_string());
        let err = CaptureSession::new().capture(&mut scene, &settings()).unwrap_err();
        assert!(matches!(&err, CaptureError::NoGeometry(c) if c == collection));
        assert!(err.is_pre_mutation());
    }

    assert!(!dir.path().join("renders").exists());
    assert_untouched(&scene, &before);
    assert_eq!(scene.reports().last().unwrap().0, ReportLevel::Error);
}

#[test]
fn missing_collection_is_a_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut scene = scene_in(dir.path());
    scene.active_collection = None;
    scene.scene_collection = String::new();

    let err = CaptureSession::new().capture(&mut scene, &settings()).unwrap_err();
    assert!(matches!(err, CaptureError::NoCollection));
    assert_eq!(err.to_string(), "No active collection found.");
}

#[test]
fn falls_back_to_scene_collection() {
    let dir = tempfile::tempdir().unwrap();
    let mut scene = scene_in(dir.path());
    scene.active_collection = None;

    let outcome = CaptureSession::new().capture(&mut scene, &settings()).unwrap();
    assert!(matches!(outcome, CaptureOutcome::Saved(_)));
}

#[test]
fn unknown_view_is_rejected_before_mutation() {
    let dir = tempfile::tempdir().unwrap();
    let mut scene = scene_in(dir.path());
    let before = SceneSettingsSnapshot::backup(&scene);
    let settings = CaptureSettings { view_direction: "ISOMETRIC".to_string(), ..settings() };

    let err = CaptureSession::new().capture(&mut scene, &settings).unwrap_err();
    assert!(matches!(&err, CaptureError::UnsupportedView(v) if v == "ISOMETRIC"));
    assert_untouched(&scene, &before);
    assert!(!dir.path().join("renders").exists());
}

#[test]
fn cancelled_render_still_restores() {
    let dir = tempfile::tempdir().unwrap();
    let mut scene = scene_in(dir.path());
    scene.cancel_render = true;
    let before = SceneSettingsSnapshot::backup(&scene);

    let outcome = CaptureSession::new().capture(&mut scene, &settings()).unwrap();
    assert_eq!(outcome, CaptureOutcome::Cancelled);
    assert_untouched(&scene, &before);
    assert_eq!(scene.render_count(), 0);
    assert_eq!(scene.reports().last().unwrap().1, "Render cancelled.");
}

#[test]
fn failure_while_mutated_still_restores() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, b"not a directory").unwrap();

    let mut scene = scene_in(dir.path());
    let before = SceneSettingsSnapshot::backup(&scene);
    let settings = CaptureSettings {
        output_directory: blocker.join("renders").to_string_lossy().into_owned(),
        ..settings()
    };

    let err = CaptureSession::new().capture(&mut scene, &settings).unwrap_err();
    assert!(matches!(err, CaptureError::OutputDirectory { .. }));
    assert!(!err.is_pre_mutation());
    assert_untouched(&scene, &before);
}

#[test]
fn scene_lighting_keeps_world_and_opaque_film() {
    let dir = tempfile::tempdir().unwrap();
    let mut scene = scene_in(dir.path());
    let before = SceneSettingsSnapshot::backup(&scene);
    let settings = CaptureSettings {
        use_scene_lighting: true,
        view_direction: "TOP".to_string(),
        resolution_x: 128,
        resolution_y: 64,
        ..settings()
    };

    let CaptureOutcome::Saved(path) = CaptureSession::new().capture(&mut scene, &settings).unwrap() else {
        panic!("render should finish");
    };
    assert!(path.ends_with("renders/cube_top.png"));
    let image = image::open(&path).unwrap().to_rgba8();
    assert_eq!(image.dimensions(), (128, 64));
    // World background stays in place, so the film is opaque
    assert_eq!(image.get_pixel(0, 0).0[3], 255);
    assert_untouched(&scene, &before);
}

#[test]
fn exr_output_uses_exr_extension() {
    let dir = tempfile::tempdir().unwrap();
    let mut scene = scene_in(dir.path());
    let settings = CaptureSettings { image_format: ImageFormat::OpenExr, resolution_x: 64, resolution_y: 64, ..settings() };

    let outcome = CaptureSession::new().capture(&mut scene, &settings).unwrap();
    let expected = dir.path().join("renders").join("cube_front.exr");
    assert_eq!(outcome, CaptureOutcome::Saved(expected.clone()));
    assert!(expected.exists());
    // Host image settings are back to what they were
    assert_eq!(scene.render_settings().image_settings.file_format, "PNG");
}

#[test]
fn capture_all_writes_six_views_and_reuses_session() {
    let dir = tempfile::tempdir().unwrap();
    let mut scene = scene_in(dir.path());
    let before = SceneSettingsSnapshot::backup(&scene);
    let settings = CaptureSettings { resolution_x: 64, resolution_y: 64, ..settings() };

    let batch = CaptureSession::new().capture_all(&mut scene, &settings).unwrap();
    assert!(!batch.cancelled);
    let names: Vec<String> = batch
        .saved
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["cube_front.png", "cube_back.png", "cube_right.png", "cube_left.png", "cube_top.png", "cube_bottom.png"]);
    assert!(batch.saved.iter().all(|p| p.exists()));
    assert_untouched(&scene, &before);
}

#[test]
fn capture_all_stops_at_cancellation() {
    let dir = tempfile::tempdir().unwrap();
    let mut scene = scene_in(dir.path());
    scene.cancel_render = true;

    let batch = CaptureSession::new().capture_all(&mut scene, &settings()).unwrap();
    assert!(batch.cancelled);
    assert!(batch.saved.is_empty());
}

#[test]
fn capture_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let json = format!(r#"{{ "Settings": {{ "BaseFilename": "shot", "ResolutionX": "32", "ResolutionY": 64,
                                          "ViewDirection": "LEFT", "PaddingRatio": 2.0 }},
                             "Scene": {} }}"#, SCENE);
    let path = dir.path().join("capture.json");
    fs::write(&path, json).unwrap();

    let mut capture = parse_capture_json(&path).unwrap();
    // Values are clamped into the UI ranges on load
    assert_eq!(capture.settings.resolution_x, 64);
    assert_eq!(capture.settings.padding_ratio, 1.0);

    let outcome = CaptureSession::new().capture(&mut capture.scene, &capture.settings).unwrap();
    assert_eq!(outcome, CaptureOutcome::Saved(dir.path().join("renders").join("shot_left.png")));
}
