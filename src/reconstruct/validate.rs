use thiserror::Error;

use crate::models::{Dimensions, MaterialSpec, MeshData, ObjectDescription};
use crate::scene::Color;

/// Reasons a parsed description is rejected before it reaches the materializer.
#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    #[error("dimension `{field}` must be a positive number, got {value}")]
    InvalidDimension { field: &'static str, value: f64 },

    #[error("material `{field}` must be between 0 and 1, got {value}")]
    OutOfRange { field: &'static str, value: f64 },

    #[error("emissive intensity must be non-negative, got {0}")]
    NegativeEmissive(f64),

    #[error("`{field}` is not a hex colour: {value:?}")]
    InvalidColor { field: &'static str, value: String },

    #[error("mesh has no vertices")]
    EmptyMesh,

    #[error("vertex list length {0} is not a multiple of 3")]
    RaggedVertices(usize),

    #[error("vertex component {0} is not a finite number")]
    NonFiniteVertex(usize),

    #[error("mesh has {count} vertices, limit is {limit}")]
    TooManyVertices { count: usize, limit: usize },

    #[error("non-indexed mesh has {0} vertices, not a whole number of triangles")]
    IncompleteTriangle(usize),

    #[error("index list length {0} is not a multiple of 3")]
    RaggedIndices(usize),

    #[error("index {index} at position {position} is out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        position: usize,
        index: u32,
        vertex_count: usize,
    },
}

/// Check everything the materializer relies on.
pub fn validate(description: &ObjectDescription, max_vertices: usize) -> Result<(), GeometryError> {
    validate_dimensions(&description.dimensions)?;
    validate_material(&description.material)?;
    if let Some(mesh) = &description.mesh_data {
        validate_mesh(mesh, max_vertices)?;
    }
    Ok(())
}

fn validate_dimensions(dimensions: &Dimensions) -> Result<(), GeometryError> {
    let fields = [
        ("width", Some(dimensions.width)),
        ("height", Some(dimensions.height)),
        ("depth", Some(dimensions.depth)),
        ("radius", dimensions.radius),
    ];
    for (field, value) in fields {
        if let Some(value) = value {
            if !value.is_finite() || value <= 0.0 {
                return Err(GeometryError::InvalidDimension { field, value });
            }
        }
    }
    Ok(())
}

fn validate_material(material: &MaterialSpec) -> Result<(), GeometryError> {
    let unit_fields = [
        ("metalness", Some(material.metalness)),
        ("roughness", Some(material.roughness)),
        ("opacity", material.opacity),
    ];
    for (field, value) in unit_fields {
        if let Some(value) = value {
            if !(0.0..=1.0).contains(&value) {
                return Err(GeometryError::OutOfRange { field, value });
            }
        }
    }
    if let Some(intensity) = material.emissive_intensity {
        if !intensity.is_finite() || intensity < 0.0 {
            return Err(GeometryError::NegativeEmissive(intensity));
        }
    }

    let colors = [("color", Some(&material.color)), ("emissive", material.emissive.as_ref())];
    for (field, value) in colors {
        if let Some(value) = value {
            if Color::from_hex(value).is_none() {
                return Err(GeometryError::InvalidColor {
                    field,
                    value: value.clone(),
                });
            }
        }
    }
    Ok(())
}

fn validate_mesh(mesh: &MeshData, max_vertices: usize) -> Result<(), GeometryError> {
    if mesh.vertices.is_empty() {
        return Err(GeometryError::EmptyMesh);
    }
    if mesh.vertices.len() % 3 != 0 {
        return Err(GeometryError::RaggedVertices(mesh.vertices.len()));
    }
    if let Some(position) = mesh.vertices.iter().position(|v| !v.is_finite()) {
        return Err(GeometryError::NonFiniteVertex(position));
    }

    let vertex_count = mesh.vertex_count();
    if vertex_count > max_vertices {
        return Err(GeometryError::TooManyVertices {
            count: vertex_count,
            limit: max_vertices,
        });
    }

    if mesh.indices.is_empty() {
        // Non-indexed triangle list
        if vertex_count % 3 != 0 {
            return Err(GeometryError::IncompleteTriangle(vertex_count));
        }
        return Ok(());
    }
    if mesh.indices.len() % 3 != 0 {
        return Err(GeometryError::RaggedIndices(mesh.indices.len()));
    }
    if let Some((position, &index)) = mesh
        .indices
        .iter()
        .enumerate()
        .find(|(_, i)| **i as usize >= vertex_count)
    {
        return Err(GeometryError::IndexOutOfRange {
            position,
            index,
            vertex_count,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ShapeKind;

    fn description(mesh: Option<MeshData>) -> ObjectDescription {
        ObjectDescription {
            name: "Rock".to_string(),
            shape_type: ShapeKind::ComplexMesh,
            dimensions: Dimensions {
                width: 1.0,
                height: 0.5,
                depth: 0.8,
                radius: None,
                segments: None,
            },
            mesh_data: mesh,
            material: MaterialSpec {
                color: "#808080".to_string(),
                metalness: 0.1,
                roughness: 0.9,
                emissive: None,
                emissive_intensity: None,
                opacity: None,
                transparent: None,
            },
            spatial_description: String::new(),
        }
    }

    fn triangle(indices: Vec<u32>) -> MeshData {
        MeshData {
            vertices: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            indices,
        }
    }

    #[test]
    fn accepts_well_formed_mesh() {
        assert_eq!(validate(&description(Some(triangle(vec![0, 1, 2]))), 100), Ok(()));
    }

    #[test]
    fn accepts_non_indexed_triangle_list() {
        assert_eq!(validate(&description(Some(triangle(vec![]))), 100), Ok(()));
    }

    #[test]
    fn rejects_index_past_last_vertex() {
        let err = validate(&description(Some(triangle(vec![0, 1, 3]))), 100).unwrap_err();
        assert_eq!(
            err,
            GeometryError::IndexOutOfRange {
                position: 2,
                index: 3,
                vertex_count: 3
            }
        );
    }

    #[test]
    fn rejects_ragged_lists() {
        let mut mesh = triangle(vec![0, 1]);
        assert_eq!(
            validate(&description(Some(mesh.clone())), 100),
            Err(GeometryError::RaggedIndices(2))
        );
        mesh.vertices.push(1.0);
        assert_eq!(
            validate(&description(Some(mesh)), 100),
            Err(GeometryError::RaggedVertices(10))
        );
    }

    #[test]
    fn rejects_vertex_count_over_limit() {
        let err = validate(&description(Some(triangle(vec![0, 1, 2]))), 2).unwrap_err();
        assert_eq!(err, GeometryError::TooManyVertices { count: 3, limit: 2 });
    }

    #[test]
    fn rejects_non_positive_dimensions() {
        let mut desc = description(None);
        desc.dimensions.height = 0.0;
        assert!(matches!(
            validate(&desc, 100),
            Err(GeometryError::InvalidDimension { field: "height", .. })
        ));
    }

    #[test]
    fn rejects_material_out_of_range() {
        let mut desc = description(None);
        desc.material.roughness = 1.5;
        assert!(matches!(
            validate(&desc, 100),
            Err(GeometryError::OutOfRange { field: "roughness", .. })
        ));
    }

    #[test]
    fn rejects_named_colours() {
        let mut desc = description(None);
        desc.material.color = "red".to_string();
        assert!(matches!(
            validate(&desc, 100),
            Err(GeometryError::InvalidColor { field: "color", .. })
        ));
    }
}
