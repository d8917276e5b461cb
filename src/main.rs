/*

    Capture orthographic views of a scene collection.

    Usage: cubecapture <capture>.json [VIEW|all]

    VIEW overrides the configured view (FRONT, BACK, RIGHT,
    LEFT, TOP, BOTTOM); "all" captures the six views in order.

    @date: Oct, 2025
    @author: Bartu
*/

use std::{self, env, path::Path, time::Instant};
use tracing::{info, warn, error};

use cube_capture::capture::{CaptureOutcome, CaptureSession};
use cube_capture::json_parser::parse_capture_json;
use cube_capture::view::View;

fn main() -> Result<(), Box<dyn std::error::Error>> {

    // Logging on console
    tracing_subscriber::fmt::init();

    // Parse args
    let args: Vec<String> = env::args().collect();
    let (json_path, view_arg) = match args.len() {
        1 => {
            warn!("No arguments were provided, setting default capture path...");
            ("./capture.json".to_string(), None)
        }
        2 => (args[1].clone(), None),
        3 => (args[1].clone(), Some(args[2].clone())),
        _ => {
            error!("Usage: {} <capture>.json [VIEW|all]", args[0]);
            std::process::exit(1);
        }
    };

    info!("Loading capture from {}...", json_path);
    let mut capture = parse_capture_json(Path::new(&json_path)).map_err(|e| {
        error!("Failed to load capture file: {}", e);
        e
    })?;

    let start = Instant::now();
    let mut session = CaptureSession::new();
    match view_arg.as_deref() {
        Some("all") | Some("ALL") => {
            let batch = session.capture_all(&mut capture.scene, &capture.settings)?;
            for path in &batch.saved {
                println!("{}", path.display());
            }
            if batch.cancelled {
                warn!("Capture cancelled after {} views", batch.saved.len());
            }
        }
        Some(key) => {
            let view: View = key.to_uppercase().parse()?;
            if let CaptureOutcome::Saved(path) = session.capture_view(&mut capture.scene, &capture.settings, view)? {
                println!("{}", path.display());
            }
        }
        None => {
            if let CaptureOutcome::Saved(path) = session.capture(&mut capture.scene, &capture.settings)? {
                println!("{}", path.display());
            }
        }
    }
    info!("Finished execution in {:?}.", start.elapsed());
    Ok(())
}
