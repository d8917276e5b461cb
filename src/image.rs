
use std::path::Path;
use std::io::BufWriter;
use std::fs::File;

use crate::error::HostError;
use crate::prelude::*;

/// Linear RGBA pixel buffer, row-major from the top-left.
#[derive(Clone, Debug)]
pub struct ImageData {
    pixel_colors : Vec<Vector4>,
    width : usize,
    height: usize,
}


impl ImageData {

    pub fn new(width: usize, height: usize, pixel_colors: Vec<Vector4>) -> Self {
        debug_assert_eq!(pixel_colors.len(), width * height);
        ImageData {
            pixel_colors,
            width,
            height,
        }
    }

    pub fn new_from_background(width: usize, height: usize, background: Vector4) -> Self {
        Self::new(width, height, vec![background; width * height])
    }

    /// Return [R1, G1, B1, A1, R2, ...] with every channel clamped to [0, 1]
    pub fn flatten_color(&self) -> impl Iterator<Item = Float> + '_ {
        self.pixel_colors.iter().flat_map(|v| [v.x, v.y, v.z, v.w]).map(|c| c.clamp(0.0, 1.0))
    }

    pub fn to_rgba8(&self) -> Vec<u8> {
        self.flatten_color().map(|c| (c * 255.0).round() as u8).collect()
    }

    /// Big-endian samples, as PNG stores 16-bit data.
    pub fn to_rgba16_be(&self) -> Vec<u8> {
        self.flatten_color()
            .flat_map(|c| ((c * 65535.0).round() as u16).to_be_bytes())
            .collect()
    }

    /// Writes the image according to the host's file format and color depth identifiers.
    ///
    /// `color_depth` selects 8 or 16 bit samples for PNG only. OpenEXR is
    /// always written with 32-bit float channels, whatever depth is set.
    pub fn save(&self, path: &Path, file_format: &str, color_depth: &str) -> Result<(), HostError> {
        match file_format {
            "PNG" => {
                let depth = if color_depth == "16" { png::BitDepth::Sixteen } else { png::BitDepth::Eight };
                self.save_png(path, depth)
            }
            "OPEN_EXR" => {
                if color_depth != "32" {
                    debug!("OpenEXR depth '{}' requested, writing 32-bit float", color_depth);
                }
                self.save_exr(path)
            }
            other => Err(HostError::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn save_png(&self, path: &Path, depth: png::BitDepth) -> Result<(), HostError> {
        // DISCLAIMER: This function is based on https://docs.rs/png/0.18.0/png/
        let file = File::create(path)?;
        let w = &mut BufWriter::new(file);
        let mut encoder = png::Encoder::new(w, self.width as u32, self.height as u32);

        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(depth);
        let mut writer = encoder.write_header()?;

        let data = match depth {
            png::BitDepth::Sixteen => self.to_rgba16_be(),
            _ => self.to_rgba8(),
        };
        writer.write_image_data(&data)?;
        info!("Image saved to {}", path.display());
        Ok(())
    }

    pub fn save_exr(&self, path: &Path) -> Result<(), HostError> {
        // Unclamped, HDR values survive
        let raw: Vec<f32> = self
            .pixel_colors
            .iter()
            .flat_map(|v| [v.x as f32, v.y as f32, v.z as f32, v.w as f32])
            .collect();
        let buffer = ::image::Rgba32FImage::from_raw(self.width as u32, self.height as u32, raw)
            .ok_or_else(|| HostError::Other("pixel buffer does not match image size".to_string()))?;
        buffer.save_with_format(path, ::image::ImageFormat::OpenExr)?;
        info!("Image saved to {}", path.display());
        Ok(())
    }
}


/// Pixel centers of an orthographic frame, row by row from the top-left.
/// `corners` are [top-left, top-right, bottom-left, bottom-right].
pub fn get_pixel_centers(width: usize, height: usize, corners: &[Vector3; 4]) -> Vec<Vector3> {
    let mut pixel_centers = Vec::with_capacity(width * height);

    for row in 0..height {
        for col in 0..width {
            let u = (col as Float + 0.5) / width as Float; // pixel width
            let v = (row as Float + 0.5) / height as Float; // pixel height

            let top = corners[0] * (1.0 - u) + corners[1] * u;
            let bottom = corners[2] * (1.0 - u) + corners[3] * u;
            let center = top * (1.0 - v) + bottom * v;

            pixel_centers.push(center);
        }
    }

    pixel_centers
}
