/*

    User-editable capture configuration.

    Lives next to the scene (the "Settings" block of a
    capture file). Keys are PascalCase and all optional.

    @date: Nov, 2025
    @author: bartu
*/

use crate::prelude::*;

pub const MIN_RESOLUTION: u32 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
pub enum ImageFormat {
    /// 8-bit RGBA PNG
    #[default]
    #[serde(rename = "PNG")]
    Png,
    /// Float RGBA OpenEXR
    #[serde(rename = "OPEN_EXR")]
    OpenExr,
}

impl ImageFormat {
    /// Host file format identifier.
    pub fn file_format(&self) -> &'static str {
        match self {
            ImageFormat::Png => "PNG",
            ImageFormat::OpenExr => "OPEN_EXR",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => ".png",
            ImageFormat::OpenExr => ".exr",
        }
    }

    pub fn color_depth(&self) -> &'static str {
        match self {
            ImageFormat::Png => "8",
            ImageFormat::OpenExr => "16",
        }
    }

    pub fn color_mode(&self) -> &'static str {
        "RGBA"
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, SmartDefault)]
#[serde(default, rename_all = "PascalCase")]
pub struct CaptureSettings {
    /// May start with `//` to be relative to the project directory.
    #[default = "//renders"]
    pub output_directory: String,

    #[default = "cube_capture"]
    pub base_filename: String,

    #[default = 2048]
    #[serde(deserialize_with = "deser_u32")]
    pub resolution_x: u32,

    #[default = 2048]
    #[serde(deserialize_with = "deser_u32")]
    pub resolution_y: u32,

    /// One of FRONT, BACK, RIGHT, LEFT, TOP, BOTTOM. Checked at capture time.
    #[default = "FRONT"]
    pub view_direction: String,

    pub image_format: ImageFormat,

    /// Extra framing as a fraction of the largest dimension.
    #[default = 0.05]
    #[serde(deserialize_with = "deser_float")]
    pub padding_ratio: Float,

    #[serde(deserialize_with = "deser_bool")]
    pub use_scene_lighting: bool,
}

impl CaptureSettings {
    /// Clamp values into the ranges the host UI enforces.
    pub fn sanitized(mut self) -> Self {
        if self.resolution_x < MIN_RESOLUTION {
            warn!("ResolutionX {} is below {}, clamping", self.resolution_x, MIN_RESOLUTION);
            self.resolution_x = MIN_RESOLUTION;
        }
        if self.resolution_y < MIN_RESOLUTION {
            warn!("ResolutionY {} is below {}, clamping", self.resolution_y, MIN_RESOLUTION);
            self.resolution_y = MIN_RESOLUTION;
        }
        if !(0.0..=1.0).contains(&self.padding_ratio) {
            let clamped = if self.padding_ratio.is_nan() { 0.0 } else { self.padding_ratio.clamp(0.0, 1.0) };
            warn!("PaddingRatio {} is outside [0, 1], using {}", self.padding_ratio, clamped);
            self.padding_ratio = clamped;
        }
        self
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_host_properties() {
        let s = CaptureSettings::default();
        assert_eq!(s.output_directory, "//renders");
        assert_eq!(s.base_filename, "cube_capture");
        assert_eq!((s.resolution_x, s.resolution_y), (2048, 2048));
        assert_eq!(s.view_direction, "FRONT");
        assert_eq!(s.image_format, ImageFormat::Png);
        assert_eq!(s.padding_ratio, 0.05);
        assert!(!s.use_scene_lighting);
    }

    #[test]
    fn parses_partial_json_with_string_numbers() {
        let s: CaptureSettings = serde_json::from_str(
            r#"{"ResolutionX": "512", "ResolutionY": 256, "ImageFormat": "OPEN_EXR",
                "PaddingRatio": "0.25", "UseSceneLighting": "true", "ViewDirection": "TOP"}"#,
        ).unwrap();
        assert_eq!((s.resolution_x, s.resolution_y), (512, 256));
        assert_eq!(s.image_format, ImageFormat::OpenExr);
        assert_eq!(s.padding_ratio, 0.25);
        assert!(s.use_scene_lighting);
        assert_eq!(s.view_direction, "TOP");
        assert_eq!(s.base_filename, "cube_capture");
    }

    #[test]
    fn sanitized_clamps_out_of_range_values() {
        let s = CaptureSettings { resolution_x: 10, padding_ratio: 3.0, ..Default::default() }.sanitized();
        assert_eq!(s.resolution_x, MIN_RESOLUTION);
        assert_eq!(s.resolution_y, 2048);
        assert_eq!(s.padding_ratio, 1.0);

        let s = CaptureSettings { padding_ratio: -0.5, ..Default::default() }.sanitized();
        assert_eq!(s.padding_ratio, 0.0);
    }

    #[test]
    fn format_table() {
        assert_eq!(ImageFormat::Png.extension(), ".png");
        assert_eq!(ImageFormat::OpenExr.extension(), ".exr");
        assert_eq!(ImageFormat::OpenExr.color_depth(), "16");
        assert_eq!(ImageFormat::Png.file_format(), "PNG");
    }
}
