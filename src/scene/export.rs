//! glTF 2.0 export, as embedded-buffer JSON (`.gltf`) or binary (`.glb`).

use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::{json, Value};
use thiserror::Error;

use super::Scene;

const GLB_MAGIC: u32 = 0x4654_6C67;
const GLB_VERSION: u32 = 2;
const CHUNK_JSON: u32 = 0x4E4F_534A;
const CHUNK_BIN: u32 = 0x004E_4942;

const FLOAT: u32 = 5126;
const UNSIGNED_INT: u32 = 5125;
const ARRAY_BUFFER: u32 = 34962;
const ELEMENT_ARRAY_BUFFER: u32 = 34963;
const TRIANGLES: u32 = 4;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Scene has no geometry to export")]
    EmptyGeometry,

    #[error("Failed to encode glTF document: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// Text glTF with the buffer embedded as a data URI.
    #[default]
    Gltf,
    /// Binary glTF.
    Glb,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Gltf => "gltf",
            Self::Glb => "glb",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Gltf => "model/gltf+json",
            Self::Glb => "model/gltf-binary",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gltf" => Ok(Self::Gltf),
            "glb" => Ok(Self::Glb),
            other => Err(format!("unknown export format: {}", other)),
        }
    }
}

/// A file ready to be written to disk or offered as a download.
#[derive(Debug, Clone)]
pub struct ExportedFile {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

pub fn export(scene: &Scene, format: ExportFormat) -> Result<ExportedFile, ExportError> {
    let geometry = &scene.geometry;
    let (min, max) = geometry.bounds().ok_or(ExportError::EmptyGeometry)?;
    if geometry.is_empty() {
        return Err(ExportError::EmptyGeometry);
    }

    let mut buffer = Vec::with_capacity(geometry.vertex_count() * 24 + geometry.indices.len() * 4);
    for p in &geometry.positions {
        p.iter().for_each(|c| buffer.extend_from_slice(&c.to_le_bytes()));
    }
    let normals_offset = buffer.len();
    for n in &geometry.normals {
        n.iter().for_each(|c| buffer.extend_from_slice(&c.to_le_bytes()));
    }
    let indices_offset = buffer.len();
    for i in &geometry.indices {
        buffer.extend_from_slice(&i.to_le_bytes());
    }

    let mut document = document(scene, min, max, normals_offset, indices_offset, buffer.len());

    let bytes = match format {
        ExportFormat::Gltf => {
            document["buffers"][0]["uri"] = Value::String(format!(
                "data:application/octet-stream;base64,{}",
                STANDARD.encode(&buffer)
            ));
            serde_json::to_vec_pretty(&document)?
        }
        ExportFormat::Glb => glb(&serde_json::to_vec(&document)?, buffer),
    };

    let file_name = format!("{}.{}", file_stem(&scene.name), format.extension());
    tracing::info!(file = %file_name, size = bytes.len(), "Exported scene");
    Ok(ExportedFile {
        file_name,
        mime_type: format.mime_type(),
        bytes,
    })
}

fn document(
    scene: &Scene,
    min: [f32; 3],
    max: [f32; 3],
    normals_offset: usize,
    indices_offset: usize,
    buffer_len: usize,
) -> Value {
    let geometry = &scene.geometry;
    let material = &scene.material;
    let name = if scene.name.is_empty() { "model" } else { scene.name.as_str() };

    let mut node = json!({ "name": name, "mesh": 0 });
    if !scene.transform.is_identity() {
        node["translation"] = json!(scene.transform.translation);
        node["rotation"] = json!(scene.transform.rotation);
    }

    let mut gltf_material = json!({
        "name": format!("{}-material", name),
        "pbrMetallicRoughness": {
            "baseColorFactor": material.base_color,
            "metallicFactor": material.metalness,
            "roughnessFactor": material.roughness,
        },
        "alphaMode": if material.transparent { "BLEND" } else { "OPAQUE" },
    });
    let mut extensions_used = Vec::new();
    if material.emissive_intensity > 0.0 && material.emissive.iter().any(|c| *c > 0.0) {
        let strength = material.emissive_intensity;
        let factor = strength.min(1.0);
        gltf_material["emissiveFactor"] = json!(material.emissive.map(|c| c * factor));
        if strength > 1.0 {
            gltf_material["extensions"] = json!({
                "KHR_materials_emissive_strength": { "emissiveStrength": strength }
            });
            extensions_used.push("KHR_materials_emissive_strength");
        }
    }

    let mut document = json!({
        "asset": { "version": "2.0", "generator": concat!("xenoar ", env!("CARGO_PKG_VERSION")) },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [node],
        "meshes": [{
            "name": name,
            "primitives": [{
                "attributes": { "POSITION": 0, "NORMAL": 1 },
                "indices": 2,
                "material": 0,
                "mode": TRIANGLES,
            }],
        }],
        "materials": [gltf_material],
        "accessors": [
            {
                "bufferView": 0,
                "componentType": FLOAT,
                "count": geometry.vertex_count(),
                "type": "VEC3",
                "min": min,
                "max": max,
            },
            {
                "bufferView": 1,
                "componentType": FLOAT,
                "count": geometry.normals.len(),
                "type": "VEC3",
            },
            {
                "bufferView": 2,
                "componentType": UNSIGNED_INT,
                "count": geometry.indices.len(),
                "type": "SCALAR",
            },
        ],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": normals_offset, "target": ARRAY_BUFFER },
            { "buffer": 0, "byteOffset": normals_offset, "byteLength": indices_offset - normals_offset, "target": ARRAY_BUFFER },
            { "buffer": 0, "byteOffset": indices_offset, "byteLength": buffer_len - indices_offset, "target": ELEMENT_ARRAY_BUFFER },
        ],
        "buffers": [{ "byteLength": buffer_len }],
    });
    if !extensions_used.is_empty() {
        document["extensionsUsed"] = json!(extensions_used);
    }
    document
}

fn glb(json: &[u8], mut bin: Vec<u8>) -> Vec<u8> {
    let mut json = json.to_vec();
    while json.len() % 4 != 0 {
        json.push(b' ');
    }
    while bin.len() % 4 != 0 {
        bin.push(0);
    }
    let total = 12 + 8 + json.len() + 8 + bin.len();

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&GLB_MAGIC.to_le_bytes());
    out.extend_from_slice(&GLB_VERSION.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());
    out.extend_from_slice(&(json.len() as u32).to_le_bytes());
    out.extend_from_slice(&CHUNK_JSON.to_le_bytes());
    out.extend_from_slice(&json);
    out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    out.extend_from_slice(&CHUNK_BIN.to_le_bytes());
    out.extend_from_slice(&bin);
    out
}

/// The object's name made safe for a file name; `model` if nothing is left.
fn file_stem(name: &str) -> String {
    let stem: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let stem = stem.trim_matches('.').trim();
    if stem.is_empty() {
        "model".to_string()
    } else {
        stem.to_string()
    }
}
