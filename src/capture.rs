/*

    Capture orchestration: resolve the target collection,
    fit bounds, then configure a temporary orthographic
    camera inside a scene transaction and render to disk.

    Anything that can fail before the scene is touched
    (no collection, no geometry, unknown view) is checked
    first; after that every exit path goes through the
    transaction's restore.

    @date: Nov, 2025
    @author: bartu
*/

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::bbox::{compute_bounds, Bounds};
use crate::camera::configure_view;
use crate::error::CaptureError;
use crate::host::{EvalContext, Host, RenderOutcome, ReportLevel};
use crate::settings::CaptureSettings;
use crate::snapshot::{apply_image_format, apply_render_resolution, SceneTransaction, TempWorldRegistry};
use crate::view::View;
use crate::prelude::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    Saved(PathBuf),
    Cancelled,
}

/// Result of capturing several views in a row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub saved: Vec<PathBuf>,
    pub cancelled: bool,
}

/// Owns per-scene bookkeeping for a series of captures.
#[derive(Debug, Default)]
pub struct CaptureSession {
    temp_worlds: TempWorldRegistry,
}

impl CaptureSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the view named in `settings`.
    pub fn capture<H: Host + ?Sized>(&mut self, host: &mut H, settings: &CaptureSettings) -> Result<CaptureOutcome, CaptureError> {
        let result = self.run(host, settings, &settings.view_direction);
        report_result(host, &result);
        result
    }

    /// Capture an explicit view, ignoring the configured one.
    pub fn capture_view<H: Host + ?Sized>(&mut self, host: &mut H, settings: &CaptureSettings, view: View) -> Result<CaptureOutcome, CaptureError> {
        let result = self.run(host, settings, view.key());
        report_result(host, &result);
        result
    }

    /// Capture all six views in order, each in its own transaction.
    /// Stops at the first cancellation or error.
    pub fn capture_all<H: Host + ?Sized>(&mut self, host: &mut H, settings: &CaptureSettings) -> Result<BatchOutcome, CaptureError> {
        let mut batch = BatchOutcome::default();
        for view in View::ALL {
            match self.capture_view(host, settings, view)? {
                CaptureOutcome::Saved(path) => batch.saved.push(path),
                CaptureOutcome::Cancelled => {
                    batch.cancelled = true;
                    break;
                }
            }
        }
        Ok(batch)
    }

    fn run<H: Host + ?Sized>(&mut self, host: &mut H, settings: &CaptureSettings, view_key: &str) -> Result<CaptureOutcome, CaptureError> {
        let span = tracing::span!(tracing::Level::INFO, "capture", view = view_key);
        let _enter = span.enter();

        let collection = host
            .active_collection()
            .or_else(|| host.context_collection())
            .ok_or(CaptureError::NoCollection)?;

        let view_layer = host.view_layer();
        let ctx = EvalContext {
            evaluated: host.supports_evaluation(),
            view_layer: view_layer.as_deref(),
        };
        let bounds = compute_bounds(&*host, &collection, &ctx)
            .ok_or_else(|| CaptureError::NoGeometry(collection.clone()))?;

        let view = view_key
            .parse::<View>()
            .map_err(|e| CaptureError::UnsupportedView(e.0))?;

        info!("Capturing {} view of '{}'", view, collection);
        self.render_view(host, settings, &bounds, view)
    }

    fn render_view<H: Host + ?Sized>(&mut self, host: &mut H, settings: &CaptureSettings, bounds: &Bounds, view: View) -> Result<CaptureOutcome, CaptureError> {
        let padding = settings.padding_ratio.max(0.0);

        // Restores settings and deletes the camera when dropped
        let mut tx = SceneTransaction::begin(host, &mut self.temp_worlds);
        let camera = tx.create_camera();

        if !settings.use_scene_lighting {
            tx.ensure_flat_lighting();
        }

        let host = tx.host();
        apply_render_resolution(host, settings.resolution_x, settings.resolution_y);
        apply_image_format(host, settings.image_format);
        host.set_active_camera(Some(&camera));

        let fit = configure_view(bounds, view, padding);
        host.set_camera(&camera, fit.matrix_world, fit.projection)?;

        let filename = output_filename(&settings.base_filename, view);
        let target = prepare_output_path(&*host, &settings.output_directory, &filename)?;
        let output = ensure_extension(&target, settings.image_format.extension());
        host.render_settings_mut().filepath = output.to_string_lossy().into_owned();

        let outcome = match host.render_still()? {
            RenderOutcome::Cancelled => CaptureOutcome::Cancelled,
            RenderOutcome::Finished => CaptureOutcome::Saved(output),
        };
        Ok(outcome)
    }
}

fn report_result<H: Host + ?Sized>(host: &mut H, result: &Result<CaptureOutcome, CaptureError>) {
    match result {
        Ok(CaptureOutcome::Saved(path)) => host.report(ReportLevel::Info, &format!("Render saved to {}.", path.display())),
        Ok(CaptureOutcome::Cancelled) => host.report(ReportLevel::Info, "Render cancelled."),
        Err(e) => host.report(ReportLevel::Error, &e.to_string()),
    }
}

/// `{prefix}_{view}` without extension.
pub fn output_filename(prefix: &str, view: View) -> String {
    format!("{}_{}", prefix, view.file_stem())
}

/// Resolves `directory` through the host, creates it, and joins `filename`.
pub fn prepare_output_path<H: Host + ?Sized>(host: &H, directory: &str, filename: &str) -> Result<PathBuf, CaptureError> {
    let dir = host.resolve_path(directory);
    fs::create_dir_all(&dir).map_err(|source| CaptureError::OutputDirectory {
        path: dir.clone(),
        source,
    })?;
    Ok(dir.join(filename))
}

/// Appends `extension` (with its dot) unless the path already ends with it, ignoring case.
pub fn ensure_extension(path: &Path, extension: &str) -> PathBuf {
    let current = path.to_string_lossy().to_lowercase();
    if current.ends_with(&extension.to_lowercase()) {
        return path.to_path_buf();
    }
    let mut s = OsString::from(path.as_os_str());
    s.push(extension);
    PathBuf::from(s)
}
