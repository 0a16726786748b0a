use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The AI-produced description of a physical object.
///
/// Field names follow the camelCase JSON document the inference endpoint is asked
/// to return. Unknown fields are ignored so that older prompts (e.g. ones that
/// still emit `textureDesc`) keep parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObjectDescription {
    /// Short human-readable name, e.g. "Mug".
    pub name: String,
    pub shape_type: ShapeKind,
    pub dimensions: Dimensions,
    /// Raw triangle mesh. Only meaningful for [`ShapeKind::ComplexMesh`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh_data: Option<MeshData>,
    pub material: MaterialSpec,
    /// Free-text description of the object's shape and surroundings.
    #[serde(default)]
    pub spatial_description: String,
}

impl ObjectDescription {
    /// Label shown by the viewer for this kind of geometry.
    pub fn geometry_label(&self) -> &'static str {
        if self.mesh_data.is_some() {
            "AI Mesh Geometry"
        } else {
            "Parametric Object"
        }
    }
}

/// The kind of geometry to materialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    Box,
    Sphere,
    Cylinder,
    Capsule,
    Torus,
    /// Arbitrary triangle mesh carried in [`ObjectDescription::mesh_data`].
    #[serde(rename = "complex")]
    ComplexMesh,
}

impl ShapeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Box => "box",
            Self::Sphere => "sphere",
            Self::Cylinder => "cylinder",
            Self::Capsule => "capsule",
            Self::Torus => "torus",
            Self::ComplexMesh => "complex",
        }
    }
}

/// Bounding dimensions in scene units. The object is expected to fit a 1x1x1 box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
    pub depth: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segments: Option<u32>,
}

/// A flat triangle mesh: `vertices` holds xyz triples, `indices` holds index triples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MeshData {
    pub vertices: Vec<f32>,
    #[serde(default)]
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }
}

/// Physically-based surface parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaterialSpec {
    /// sRGB hex colour, `#rgb` or `#rrggbb`.
    pub color: String,
    pub metalness: f64,
    pub roughness: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emissive: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emissive_intensity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transparent: Option<bool>,
}
