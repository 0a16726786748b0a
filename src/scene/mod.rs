//! Scene materialization: turning an [`ObjectDescription`] into geometry and a
//! physically-based material that can be exported or placed in AR.

mod ar;
mod color;
mod export;
mod geometry;

pub use ar::{place, ArError, ArRuntime, FloorPlane, Pose, Ray, OPTIONAL_FEATURES, REQUIRED_FEATURES};
pub use color::Color;
pub use export::{export, ExportError, ExportFormat, ExportedFile};
pub use geometry::Geometry;

use crate::models::{MaterialSpec, ObjectDescription, ShapeKind};

const ROUND_SEGMENTS: u32 = 32;
const CAPSULE_CAP_SEGMENTS: u32 = 4;
const TORUS_TUBE: f32 = 0.05;
const TORUS_RADIAL_SEGMENTS: u32 = 16;
const TORUS_TUBULAR_SEGMENTS: u32 = 100;
const FALLBACK_DETAIL: u32 = 4;

/// Surface parameters in the form glTF expects.
#[derive(Debug, Clone, PartialEq)]
pub struct PbrMaterial {
    /// Linear RGBA.
    pub base_color: [f32; 4],
    pub metalness: f32,
    pub roughness: f32,
    /// Linear RGB, before intensity is applied.
    pub emissive: [f32; 3],
    pub emissive_intensity: f32,
    pub transparent: bool,
}

impl From<&MaterialSpec> for PbrMaterial {
    fn from(spec: &MaterialSpec) -> Self {
        let [r, g, b] = Color::from_hex(&spec.color)
            .unwrap_or(Color {
                r: 1.0,
                g: 1.0,
                b: 1.0,
            })
            .to_linear();
        let emissive = spec
            .emissive
            .as_deref()
            .and_then(Color::from_hex)
            .unwrap_or(Color::BLACK)
            .to_linear();
        let opacity = spec.opacity.unwrap_or(1.0).clamp(0.0, 1.0) as f32;
        Self {
            base_color: [r, g, b, opacity],
            metalness: spec.metalness.clamp(0.0, 1.0) as f32,
            roughness: spec.roughness.clamp(0.0, 1.0) as f32,
            emissive,
            emissive_intensity: spec.emissive_intensity.unwrap_or(0.0).max(0.0) as f32,
            transparent: spec.transparent.unwrap_or(false) || opacity < 1.0,
        }
    }
}

/// Placement of the object in the world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: [f32; 3],
    /// Unit quaternion `[x, y, z, w]`.
    pub rotation: [f32; 4],
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        translation: [0.0, 0.0, 0.0],
        rotation: [0.0, 0.0, 0.0, 1.0],
    };

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A renderable object built from one description.
#[derive(Debug, Clone)]
pub struct Scene {
    pub name: String,
    pub shape: ShapeKind,
    pub geometry: Geometry,
    pub material: PbrMaterial,
    pub transform: Transform,
    /// Height of the reference ground grid, level with the object's base.
    pub ground_y: f32,
    /// Half the object's height; how far its centre sits above a surface.
    pub half_height: f32,
}

impl Scene {
    /// Build geometry and material for `description`.
    pub fn materialize(description: &ObjectDescription) -> Self {
        let dims = &description.dimensions;
        let (width, height, depth) = (dims.width as f32, dims.height as f32, dims.depth as f32);
        let radius = |fallback: f32| dims.radius.map(|r| r as f32).unwrap_or(fallback);

        let geometry = match (description.shape_type, &description.mesh_data) {
            (ShapeKind::ComplexMesh, Some(mesh)) => Geometry::from_mesh(mesh),
            (ShapeKind::ComplexMesh, None) => Geometry::icosphere(width / 2.0, FALLBACK_DETAIL),
            (ShapeKind::Sphere, _) => {
                Geometry::sphere(radius(width / 2.0), ROUND_SEGMENTS, ROUND_SEGMENTS)
            }
            (ShapeKind::Cylinder, _) => {
                Geometry::cylinder(radius(width / 2.0), height, ROUND_SEGMENTS)
            }
            (ShapeKind::Capsule, _) => Geometry::capsule(
                radius(width / 4.0),
                height,
                CAPSULE_CAP_SEGMENTS,
                ROUND_SEGMENTS,
            ),
            (ShapeKind::Torus, _) => Geometry::torus(
                radius(width / 2.0),
                TORUS_TUBE,
                TORUS_RADIAL_SEGMENTS,
                TORUS_TUBULAR_SEGMENTS,
            ),
            (ShapeKind::Box, _) => Geometry::cuboid(width, height, depth),
        };

        tracing::debug!(
            name = %description.name,
            vertices = geometry.vertex_count(),
            triangles = geometry.triangle_count(),
            "Materialized scene"
        );

        Self {
            name: description.name.clone(),
            shape: description.shape_type,
            geometry,
            material: PbrMaterial::from(&description.material),
            transform: Transform::IDENTITY,
            ground_y: -height / 2.0,
            half_height: height / 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Dimensions, MeshData};

    fn description(shape: ShapeKind) -> ObjectDescription {
        ObjectDescription {
            name: "Thing".to_string(),
            shape_type: shape,
            dimensions: Dimensions {
                width: 1.0,
                height: 2.0,
                depth: 1.0,
                radius: None,
                segments: None,
            },
            mesh_data: None,
            material: MaterialSpec {
                color: "#ffffff".to_string(),
                metalness: 0.0,
                roughness: 1.0,
                emissive: None,
                emissive_intensity: None,
                opacity: None,
                transparent: None,
            },
            spatial_description: String::new(),
        }
    }

    #[test]
    fn sphere_defaults_radius_to_half_width() {
        let scene = Scene::materialize(&description(ShapeKind::Sphere));
        let (_, max) = scene.geometry.bounds().unwrap();
        assert!((max[1] - 0.5).abs() < 1e-4);
    }

    #[test]
    fn explicit_radius_wins() {
        let mut desc = description(ShapeKind::Sphere);
        desc.dimensions.radius = Some(0.2);
        let (_, max) = Scene::materialize(&desc).geometry.bounds().unwrap();
        assert!((max[1] - 0.2).abs() < 1e-4);
    }

    #[test]
    fn complex_uses_mesh_data_when_present() {
        let mut desc = description(ShapeKind::ComplexMesh);
        desc.mesh_data = Some(MeshData {
            vertices: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            indices: vec![0, 1, 2],
        });
        let scene = Scene::materialize(&desc);
        assert_eq!(scene.geometry.vertex_count(), 3);
        assert_eq!(scene.geometry.triangle_count(), 1);
    }

    #[test]
    fn complex_without_mesh_falls_back_to_icosphere() {
        let scene = Scene::materialize(&description(ShapeKind::ComplexMesh));
        assert_eq!(scene.geometry.triangle_count(), 20 * 4usize.pow(FALLBACK_DETAIL));
    }

    #[test]
    fn ground_sits_under_the_object() {
        let scene = Scene::materialize(&description(ShapeKind::Box));
        assert_eq!(scene.ground_y, -1.0);
        assert!(scene.transform.is_identity());
    }

    #[test]
    fn material_defaults_and_transparency() {
        let mut spec = description(ShapeKind::Box).material;
        let material = PbrMaterial::from(&spec);
        assert_eq!(material.emissive, [0.0, 0.0, 0.0]);
        assert_eq!(material.emissive_intensity, 0.0);
        assert!(!material.transparent);

        spec.opacity = Some(0.5);
        let material = PbrMaterial::from(&spec);
        assert!(material.transparent);
        assert_eq!(material.base_color[3], 0.5);
    }
}
