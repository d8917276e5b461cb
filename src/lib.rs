
pub mod numeric;
pub mod interval;
pub mod bbox;
pub mod view;
pub mod camera;
pub mod host;
pub mod error;
pub mod settings;
pub mod snapshot;
pub mod capture;
pub mod image;
pub mod raster;
pub mod memory;
pub mod json_parser;

pub mod prelude;
