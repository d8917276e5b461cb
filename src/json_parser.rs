/*

    Provide utilities to parse capture files.

    A capture file is a JSON document holding the capture
    settings and the scene they apply to:

        { "Settings": { ... }, "Scene": { ... } }

    The parser is somewhat robust, let <a> be integer or float type,
    in JSON file <a> can be given both in quotes (string) or as is.
    Vectors are given either as "<a> <a> <a>" or [<a>, <a>, <a>].

    e.g. In JSON file both
    "ResolutionX": "512" and "ResolutionX": 512
    works as ResolutionX: u32 in source code

    @date: 2 Oct, 2025
    @author: bartu
*/

use std::fmt::{self};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Deserializer};
use serde::de::{self, Visitor, SeqAccess};
use tracing::debug;

use crate::memory::MemoryScene;
use crate::numeric::{Float, Vector3};
use crate::settings::CaptureSettings;

#[derive(Debug, Deserialize)]
pub struct CaptureFile {
    #[serde(rename = "Settings", default)]
    pub settings: CaptureSettings,

    #[serde(rename = "Scene")]
    pub scene: MemoryScene,
}

pub fn parse_capture_json(path: &Path) -> Result<CaptureFile, Box<dyn std::error::Error>> {

    let span = tracing::span!(tracing::Level::INFO, "load_capture");
    let _enter = span.enter();

    // Open file
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    debug!("Reading file from {}", path.display());

    // Parse JSON into settings + scene
    let mut capture: CaptureFile = serde_json::from_reader(reader)?;
    capture.settings = capture.settings.sanitized();

    let json_dir = path.parent().unwrap_or(Path::new("."));
    capture.scene.setup_after_json(json_dir)?;
    Ok(capture)
}


pub(crate) fn deser_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    /*
        Deserialize u32 type given as either string or number in JSON
    */
    let s: serde_json::Value = Deserialize::deserialize(deserializer)?;
    match s {
        serde_json::Value::Number(n) => n.as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| de::Error::custom("Invalid unsigned integer")),
        serde_json::Value::String(s) => s.trim().parse::<u32>()
            .map_err(|_| de::Error::custom("Failed to parse unsigned integer from string")),
        t => Err(de::Error::custom(format!("Expected int or string, found {t}"))),
    }
}

// Handles floats as string or number
pub(crate) fn deser_float<'de, D>(deserializer: D) -> Result<Float, D::Error>
where
    D: Deserializer<'de>,
{
    /*
        Deserialize float type given as either string or number in JSON
    */
    let s: serde_json::Value = Deserialize::deserialize(deserializer)?;
    match s {
        serde_json::Value::Number(n) => n.as_f64()
            .map(|v| v as Float)
            .ok_or_else(|| de::Error::custom("Invalid float")),
        serde_json::Value::String(s) => s.trim().parse::<Float>()
            .map_err(|_| de::Error::custom("Failed to parse float from string")),
        t => Err(de::Error::custom(format!("Expected float or string, found {t}"))),
    }
}

pub(crate) fn deser_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    struct BoolVisitor;

    impl<'de> serde::de::Visitor<'de> for BoolVisitor {
        type Value = bool;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            write!(f, "a boolean or a string containing true/false")
        }

        fn visit_bool<E>(self, v: bool) -> Result<bool, E>
        where
            E: serde::de::Error,
        {
            Ok(v)
        }

        fn visit_str<E>(self, v: &str) -> Result<bool, E>
        where
            E: serde::de::Error,
        {
            match v.to_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                "1" => Ok(true),
                "0" => Ok(false),
                _ => Err(E::custom(format!("invalid bool '{}'", v))),
            }
        }

        fn visit_string<E>(self, v: String) -> Result<bool, E>
        where
            E: serde::de::Error,
        {
            self.visit_str(&v)
        }

        fn visit_u64<E>(self, v: u64) -> Result<bool, E>
        where
            E: serde::de::Error,
        {
            Ok(v != 0)
        }
    }

    deserializer.deserialize_any(BoolVisitor)
}

pub(crate) fn deser_vec3<'de, D>(deserializer: D) -> Result<Vector3, D::Error>
where
    D: Deserializer<'de>,
{
    struct Vec3Visitor;

    impl<'de> Visitor<'de> for Vec3Visitor {
        type Value = Vector3;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a Vec3 as a string 'x y z' or an array [x, y, z]")
        }

        // Given "X Y Z"
        fn visit_str<E>(self, value: &str) -> Result<Vector3, E>
        where
            E: de::Error,
        {
            parse_vec3_str(value).map_err(de::Error::custom)
        }

        // Given [X, Y, Z]
        fn visit_seq<A>(self, mut seq: A) -> Result<Vector3, A::Error>
        where
            A: SeqAccess<'de>,
        {
            let x: Float = seq
                .next_element()?
                .ok_or_else(|| de::Error::custom("Expected 3 elements in Vec3 array"))?;
            let y: Float = seq
                .next_element()?
                .ok_or_else(|| de::Error::custom("Expected 3 elements in Vec3 array"))?;
            let z: Float = seq
                .next_element()?
                .ok_or_else(|| de::Error::custom("Expected 3 elements in Vec3 array"))?;
            if seq.next_element::<Float>()?.is_some() {
                return Err(de::Error::custom("Expected only 3 elements in Vec3 array"));
            }
            Ok(Vector3::new(x, y, z))
        }
    }

    deserializer.deserialize_any(Vec3Visitor)
}

pub(crate) fn deser_opt_vec3<'de, D>(deserializer: D) -> Result<Option<Vector3>, D::Error>
where
    D: Deserializer<'de>,
{
    // Only called when the key is present; null still means "not given"
    let value: serde_json::Value = Deserialize::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    deser_vec3(value).map(Some).map_err(de::Error::custom)
}

/// Helper function: parse a string like "25 25 25" into Vector3
fn parse_vec3_str(s: &str) -> Result<Vector3, String> {
    let parts: Vec<&str> = s.split_whitespace().collect();
    if parts.len() != 3 {
        return Err(format!("Expected 3 values, got {}", parts.len()));
    }
    let x = parts[0].parse::<Float>().map_err(|e| e.to_string())?;
    let y = parts[1].parse::<Float>().map_err(|e| e.to_string())?;
    let z = parts[2].parse::<Float>().map_err(|e| e.to_string())?;
    Ok(Vector3::new(x, y, z))
}


pub(crate) fn deser_vertex_data<'de, D>(deserializer: D) -> Result<Vec<Vector3>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    parse_string_vecvec3(&s).map_err(serde::de::Error::custom)
}


pub fn parse_string_vecvec3(s: &str) -> Result<Vec<Vector3>, String> {
    let nums: Vec<Float> = s
        .split_whitespace()
        .map(|x| x.parse::<Float>().map_err(|e| e.to_string()))
        .collect::<Result<_, _>>()?;

    if nums.len() % 3 != 0 {
        return Err(format!("Input length {} not divisible by 3", nums.len()));
    }

    Ok(nums.chunks(3).map(|c| Vector3::new(c[0], c[1], c[2])).collect())
}


#[derive(Deserialize)]
struct PlyVertex {
    x: f32,
    y: f32,
    z: f32,
}

#[derive(Deserialize)]
struct PlyMesh {
    vertex: Vec<PlyVertex>,
}

/// Vertex positions of a PLY mesh; faces are not needed for bounds.
pub fn load_ply_vertices(path: &Path) -> Result<Vec<Vector3>, Box<dyn std::error::Error>> {
    debug!("Loading PLY vertices from {}", path.display());
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let plymesh: PlyMesh = serde_ply::from_reader(reader)?;
    Ok(plymesh
        .vertex
        .iter()
        .map(|v| Vector3::new(v.x as Float, v.y as Float, v.z as Float))
        .collect())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(deserialize_with = "deser_vec3")]
        v: Vector3,
        #[serde(deserialize_with = "deser_u32")]
        n: u32,
        #[serde(deserialize_with = "deser_bool")]
        b: bool,
        #[serde(default, deserialize_with = "deser_opt_vec3")]
        o: Option<Vector3>,
    }

    #[test]
    fn accepts_strings_and_numbers() {
        let p: Probe = serde_json::from_str(r#"{"v": "1 2.5 -3", "n": "64", "b": "1"}"#).unwrap();
        assert_eq!(p.v, Vector3::new(1.0, 2.5, -3.0));
        assert_eq!(p.n, 64);
        assert!(p.b);
        assert_eq!(p.o, None);

        let p: Probe = serde_json::from_str(r#"{"v": [1, 2, 3], "n": 7, "b": false, "o": [0, 0, 1]}"#).unwrap();
        assert_eq!(p.v, Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(p.n, 7);
        assert!(!p.b);
        assert_eq!(p.o, Some(Vector3::Z));
    }

    #[test]
    fn rejects_malformed_vectors() {
        assert!(serde_json::from_str::<Probe>(r#"{"v": "1 2", "n": 1, "b": true}"#).is_err());
        assert!(serde_json::from_str::<Probe>(r#"{"v": [1, 2, 3, 4], "n": 1, "b": true}"#).is_err());
        assert!(serde_json::from_str::<Probe>(r#"{"v": "1 2 3", "n": -1, "b": true}"#).is_err());
    }

    #[test]
    fn vertex_strings() {
        let verts = parse_string_vecvec3("0 0 0  1 1 1").unwrap();
        assert_eq!(verts, vec![Vector3::ZERO, Vector3::ONE]);
        assert!(parse_string_vecvec3("0 0").is_err());
    }

    #[test]
    fn ascii_ply_vertices() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tri.ply");
        std::fs::write(&path, "ply\nformat ascii 1.0\nelement vertex 3\nproperty float x\nproperty float y\nproperty float z\nend_header\n0 0 0\n2 0 0\n0 3 -1\n").unwrap();
        let verts = load_ply_vertices(&path).unwrap();
        assert_eq!(verts.len(), 3);
        assert_eq!(verts[2], Vector3::new(0.0, 3.0, -1.0));
    }
}
