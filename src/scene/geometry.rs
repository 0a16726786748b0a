//! Triangle geometry for each shape kind.
//!
//! Everything is built centred on the origin, y-up, with counter-clockwise
//! front faces.

use std::collections::HashMap;
use std::f32::consts::{FRAC_PI_2, PI, TAU};

use crate::models::MeshData;

/// Indexed triangle geometry with per-vertex normals.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Geometry {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

impl Geometry {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.indices.is_empty()
    }

    /// Axis-aligned bounds as `(min, max)`.
    pub fn bounds(&self) -> Option<([f32; 3], [f32; 3])> {
        let first = *self.positions.first()?;
        Some(self.positions.iter().fold((first, first), |(mut min, mut max), p| {
            for axis in 0..3 {
                min[axis] = min[axis].min(p[axis]);
                max[axis] = max[axis].max(p[axis]);
            }
            (min, max)
        }))
    }

    pub fn cuboid(width: f32, height: f32, depth: f32) -> Self {
        let (hx, hy, hz) = (width / 2.0, height / 2.0, depth / 2.0);
        // (normal, u axis, v axis) per face; u x v == normal
        let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
            ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
            ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
            ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
            ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
            ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ];
        let half = [hx, hy, hz];
        let mut geometry = Self::default();
        for (normal, u, v) in faces {
            let base = geometry.positions.len() as u32;
            for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                let mut p = [0.0; 3];
                for axis in 0..3 {
                    p[axis] = (normal[axis] + su * u[axis] + sv * v[axis]) * half[axis];
                }
                geometry.positions.push(p);
                geometry.normals.push(normal);
            }
            geometry
                .indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        geometry
    }

    pub fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> Self {
        let profile: Vec<ProfilePoint> = (0..=height_segments)
            .map(|i| {
                let phi = -FRAC_PI_2 + PI * i as f32 / height_segments as f32;
                ProfilePoint::on_arc(radius, 0.0, phi)
            })
            .collect();
        lathe(&profile, width_segments)
    }

    /// Open-ended tube of `radius` with flat caps.
    pub fn cylinder(radius: f32, height: f32, radial_segments: u32) -> Self {
        let h = height / 2.0;
        let profile = [
            ProfilePoint {
                radius,
                y: -h,
                normal: [1.0, 0.0],
            },
            ProfilePoint {
                radius,
                y: h,
                normal: [1.0, 0.0],
            },
        ];
        let mut geometry = lathe(&profile, radial_segments);
        geometry.append_cap(radius, h, radial_segments, true);
        geometry.append_cap(radius, -h, radial_segments, false);
        geometry
    }

    /// Cylinder of `length` with hemispherical ends of `radius`.
    pub fn capsule(radius: f32, length: f32, cap_segments: u32, radial_segments: u32) -> Self {
        let h = length / 2.0;
        let mut profile = Vec::with_capacity(2 * (cap_segments as usize + 1));
        for i in 0..=cap_segments {
            let phi = -FRAC_PI_2 + FRAC_PI_2 * i as f32 / cap_segments as f32;
            profile.push(ProfilePoint::on_arc(radius, -h, phi));
        }
        for i in 0..=cap_segments {
            let phi = FRAC_PI_2 * i as f32 / cap_segments as f32;
            profile.push(ProfilePoint::on_arc(radius, h, phi));
        }
        lathe(&profile, radial_segments)
    }

    /// Ring of major `radius` lying in the XY plane.
    pub fn torus(radius: f32, tube: f32, radial_segments: u32, tubular_segments: u32) -> Self {
        let mut geometry = Self::default();
        for j in 0..=radial_segments {
            let v = j as f32 / radial_segments as f32 * TAU;
            for i in 0..=tubular_segments {
                let u = i as f32 / tubular_segments as f32 * TAU;
                let ring = radius + tube * v.cos();
                let p = [ring * u.cos(), ring * u.sin(), tube * v.sin()];
                let center = [radius * u.cos(), radius * u.sin(), 0.0];
                geometry.positions.push(p);
                geometry.normals.push(normalize(sub(p, center)));
            }
        }
        let row = tubular_segments + 1;
        for j in 1..=radial_segments {
            for i in 1..=tubular_segments {
                let a = row * j + i - 1;
                let b = row * (j - 1) + i - 1;
                let c = row * (j - 1) + i;
                let d = row * j + i;
                geometry.indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }
        geometry
    }

    /// Subdivided icosahedron of `radius`.
    pub fn icosphere(radius: f32, detail: u32) -> Self {
        let t = (1.0 + 5.0_f32.sqrt()) / 2.0;
        let mut unit: Vec<[f32; 3]> = [
            [-1.0, t, 0.0],
            [1.0, t, 0.0],
            [-1.0, -t, 0.0],
            [1.0, -t, 0.0],
            [0.0, -1.0, t],
            [0.0, 1.0, t],
            [0.0, -1.0, -t],
            [0.0, 1.0, -t],
            [t, 0.0, -1.0],
            [t, 0.0, 1.0],
            [-t, 0.0, -1.0],
            [-t, 0.0, 1.0],
        ]
        .into_iter()
        .map(normalize)
        .collect();
        let mut faces: Vec<[u32; 3]> = vec![
            [0, 11, 5],
            [0, 5, 1],
            [0, 1, 7],
            [0, 7, 10],
            [0, 10, 11],
            [1, 5, 9],
            [5, 11, 4],
            [11, 10, 2],
            [10, 7, 6],
            [7, 1, 8],
            [3, 9, 4],
            [3, 4, 2],
            [3, 2, 6],
            [3, 6, 8],
            [3, 8, 9],
            [4, 9, 5],
            [2, 4, 11],
            [6, 2, 10],
            [8, 6, 7],
            [9, 8, 1],
        ];

        for _ in 0..detail {
            let mut midpoints: HashMap<(u32, u32), u32> = HashMap::new();
            let mut midpoint = |a: u32, b: u32, unit: &mut Vec<[f32; 3]>| -> u32 {
                let key = (a.min(b), a.max(b));
                *midpoints.entry(key).or_insert_with(|| {
                    let (pa, pb) = (unit[a as usize], unit[b as usize]);
                    unit.push(normalize([
                        (pa[0] + pb[0]) / 2.0,
                        (pa[1] + pb[1]) / 2.0,
                        (pa[2] + pb[2]) / 2.0,
                    ]));
                    (unit.len() - 1) as u32
                })
            };
            faces = faces
                .into_iter()
                .flat_map(|[a, b, c]| {
                    let ab = midpoint(a, b, &mut unit);
                    let bc = midpoint(b, c, &mut unit);
                    let ca = midpoint(c, a, &mut unit);
                    [[a, ab, ca], [b, bc, ab], [c, ca, bc], [ab, bc, ca]]
                })
                .collect();
        }

        Self {
            positions: unit.iter().map(|n| scale(*n, radius)).collect(),
            normals: unit,
            indices: faces.into_iter().flatten().collect(),
        }
    }

    /// Geometry from a flat mesh. Without indices the vertices are read as a
    /// plain triangle list. Normals are averaged from the faces.
    pub fn from_mesh(mesh: &MeshData) -> Self {
        let positions: Vec<[f32; 3]> = mesh
            .vertices
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect();
        let indices = if mesh.indices.is_empty() {
            (0..positions.len() as u32).collect()
        } else {
            mesh.indices.clone()
        };
        let normals = vertex_normals(&positions, &indices);
        Self {
            positions,
            normals,
            indices,
        }
    }

    fn append_cap(&mut self, radius: f32, y: f32, segments: u32, top: bool) {
        let normal = [0.0, if top { 1.0 } else { -1.0 }, 0.0];
        let center = self.positions.len() as u32;
        self.positions.push([0.0, y, 0.0]);
        self.normals.push(normal);
        for x in 0..=segments {
            let theta = x as f32 / segments as f32 * TAU;
            self.positions
                .push([radius * theta.sin(), y, radius * theta.cos()]);
            self.normals.push(normal);
        }
        for x in 0..segments {
            let (a, b) = (center + 1 + x, center + 2 + x);
            if top {
                self.indices.extend_from_slice(&[center, a, b]);
            } else {
                self.indices.extend_from_slice(&[center, b, a]);
            }
        }
    }
}

/// A point of a 2D profile swept around the y axis.
struct ProfilePoint {
    radius: f32,
    y: f32,
    /// Outward normal in the (radial, y) plane.
    normal: [f32; 2],
}

impl ProfilePoint {
    fn on_arc(radius: f32, center_y: f32, phi: f32) -> Self {
        Self {
            radius: radius * phi.cos(),
            y: center_y + radius * phi.sin(),
            normal: [phi.cos(), phi.sin()],
        }
    }
}

/// Sweep `profile` (ordered bottom to top) around the y axis.
fn lathe(profile: &[ProfilePoint], segments: u32) -> Geometry {
    let mut geometry = Geometry::default();
    for point in profile {
        for x in 0..=segments {
            let theta = x as f32 / segments as f32 * TAU;
            let (sin, cos) = theta.sin_cos();
            geometry
                .positions
                .push([point.radius * sin, point.y, point.radius * cos]);
            geometry
                .normals
                .push([point.normal[0] * sin, point.normal[1], point.normal[0] * cos]);
        }
    }
    let row = segments + 1;
    for j in 0..profile.len().saturating_sub(1) as u32 {
        for x in 0..segments {
            let a = row * (j + 1) + x;
            let b = row * j + x;
            let c = row * j + x + 1;
            let d = row * (j + 1) + x + 1;
            geometry.indices.extend_from_slice(&[a, b, d, b, c, d]);
        }
    }
    geometry
}

fn vertex_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut normals = vec![[0.0_f32; 3]; positions.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        let (Some(pa), Some(pb), Some(pc)) = (positions.get(a), positions.get(b), positions.get(c))
        else {
            continue;
        };
        // Unnormalized: larger faces weigh more
        let face = cross(sub(*pb, *pa), sub(*pc, *pa));
        for i in [a, b, c] {
            for axis in 0..3 {
                normals[i][axis] += face[axis];
            }
        }
    }
    normals.into_iter().map(normalize).collect()
}

fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn scale(v: [f32; 3], s: f32) -> [f32; 3] {
    [v[0] * s, v[1] * s, v[2] * s]
}

fn normalize(v: [f32; 3]) -> [f32; 3] {
    let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if len <= f32::EPSILON {
        [0.0, 1.0, 0.0]
    } else {
        scale(v, 1.0 / len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: [f32; 3], b: [f32; 3]) {
        for axis in 0..3 {
            assert!((a[axis] - b[axis]).abs() < 1e-4, "{:?} != {:?}", a, b);
        }
    }

    /// Every face normal must point the same way as its vertex normals.
    fn assert_outward(geometry: &Geometry) {
        for tri in geometry.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let face = cross(
                sub(geometry.positions[b], geometry.positions[a]),
                sub(geometry.positions[c], geometry.positions[a]),
            );
            let area = (face[0] * face[0] + face[1] * face[1] + face[2] * face[2]).sqrt();
            if area < 1e-6 {
                continue;
            }
            let n = geometry.normals[a];
            let dot = face[0] * n[0] + face[1] * n[1] + face[2] * n[2];
            assert!(dot > 0.0, "triangle {:?} faces inward", tri);
        }
    }

    #[test]
    fn cuboid_matches_dimensions() {
        let geometry = Geometry::cuboid(2.0, 1.0, 0.5);
        assert_eq!(geometry.vertex_count(), 24);
        assert_eq!(geometry.triangle_count(), 12);
        let (min, max) = geometry.bounds().unwrap();
        assert_close(min, [-1.0, -0.5, -0.25]);
        assert_close(max, [1.0, 0.5, 0.25]);
        assert_outward(&geometry);
    }

    #[test]
    fn sphere_has_radius_and_outward_faces() {
        let geometry = Geometry::sphere(0.5, 32, 32);
        for p in &geometry.positions {
            let r = (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt();
            assert!((r - 0.5).abs() < 1e-4);
        }
        assert_outward(&geometry);
    }

    #[test]
    fn cylinder_spans_height() {
        let geometry = Geometry::cylinder(0.25, 1.0, 32);
        let (min, max) = geometry.bounds().unwrap();
        assert!((min[1] + 0.5).abs() < 1e-5);
        assert!((max[1] - 0.5).abs() < 1e-5);
        assert_outward(&geometry);
    }

    #[test]
    fn capsule_adds_caps_to_length() {
        let geometry = Geometry::capsule(0.25, 1.0, 4, 32);
        let (min, max) = geometry.bounds().unwrap();
        assert!((min[1] + 0.75).abs() < 1e-5);
        assert!((max[1] - 0.75).abs() < 1e-5);
        assert_outward(&geometry);
    }

    #[test]
    fn torus_lies_in_xy_plane() {
        let geometry = Geometry::torus(0.5, 0.05, 16, 100);
        let (min, max) = geometry.bounds().unwrap();
        assert!((max[0] - 0.55).abs() < 1e-4);
        assert!((max[2] - 0.05).abs() < 1e-4);
        assert!((min[2] + 0.05).abs() < 1e-4);
        assert_outward(&geometry);
    }

    #[test]
    fn icosphere_subdivides() {
        assert_eq!(Geometry::icosphere(1.0, 0).triangle_count(), 20);
        let geometry = Geometry::icosphere(0.5, 2);
        assert_eq!(geometry.triangle_count(), 320);
        assert_eq!(geometry.vertex_count(), 162);
        assert_outward(&geometry);
    }

    #[test]
    fn mesh_without_indices_is_a_triangle_list() {
        let mesh = MeshData {
            vertices: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            indices: vec![],
        };
        let geometry = Geometry::from_mesh(&mesh);
        assert_eq!(geometry.indices, vec![0, 1, 2]);
        assert_close(geometry.normals[0], [0.0, 0.0, 1.0]);
    }
}
