/*

    Error types. HostError covers failures inside the
    host (missing data-blocks, image writing); CaptureError
    is what a capture reports to the user.

    @date: Nov, 2025
    @author: bartu
*/

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("camera '{0}' does not exist")]
    MissingCamera(String),
    #[error("no active camera to render from")]
    NoActiveCamera,
    #[error("unsupported image format '{0}'")]
    UnsupportedFormat(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Image(#[from] ::image::ImageError),
    #[error(transparent)]
    Encoding(#[from] png::EncodingError),
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("No active collection found.")]
    NoCollection,
    #[error("Collection '{0}' does not contain renderable geometry.")]
    NoGeometry(String),
    #[error("Selected view '{0}' is not supported.")]
    UnsupportedView(String),
    #[error("failed to create output directory {}: {source}", path.display())]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Host(#[from] HostError),
}

impl CaptureError {
    /// Configuration and content errors are raised before the scene is touched.
    pub fn is_pre_mutation(&self) -> bool {
        matches!(self, CaptureError::NoCollection | CaptureError::NoGeometry(_) | CaptureError::UnsupportedView(_))
    }
}
