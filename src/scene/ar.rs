//! Placing a scene in the real world through an AR runtime.

use thiserror::Error;

use super::Scene;

/// Session features the runtime must provide.
pub const REQUIRED_FEATURES: &[&str] = &["hit-test"];
/// Session features used when available.
pub const OPTIONAL_FEATURES: &[&str] = &["dom-overlay"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArError {
    #[error("AR is not supported on this device")]
    Unsupported,

    #[error("No surface found under the reticle")]
    NoSurface,
}

/// A ray cast from the viewer into the world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: [f32; 3],
    pub direction: [f32; 3],
}

/// A position and orientation on a detected surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: [f32; 3],
    /// Unit quaternion `[x, y, z, w]`.
    pub orientation: [f32; 4],
}

pub trait ArRuntime {
    fn is_session_supported(&self) -> bool;

    /// Intersect `ray` with the surfaces the runtime has detected.
    fn hit_test(&mut self, ray: &Ray) -> Option<Pose>;
}

/// A runtime that knows about one horizontal plane, such as a detected floor.
#[derive(Debug, Clone, Copy)]
pub struct FloorPlane {
    pub height: f32,
}

impl ArRuntime for FloorPlane {
    fn is_session_supported(&self) -> bool {
        true
    }

    fn hit_test(&mut self, ray: &Ray) -> Option<Pose> {
        let dy = ray.direction[1];
        if dy.abs() <= f32::EPSILON {
            return None;
        }
        let t = (self.height - ray.origin[1]) / dy;
        if t < 0.0 {
            return None;
        }
        Some(Pose {
            position: [
                ray.origin[0] + ray.direction[0] * t,
                self.height,
                ray.origin[2] + ray.direction[2] * t,
            ],
            orientation: [0.0, 0.0, 0.0, 1.0],
        })
    }
}

/// Rest the scene on whatever surface `ray` hits.
pub fn place(runtime: &mut impl ArRuntime, scene: &mut Scene, ray: &Ray) -> Result<Pose, ArError> {
    if !runtime.is_session_supported() {
        return Err(ArError::Unsupported);
    }
    let pose = runtime.hit_test(ray).ok_or(ArError::NoSurface)?;
    let [x, y, z] = pose.position;
    scene.transform.translation = [x, y + scene.half_height, z];
    scene.transform.rotation = pose.orientation;
    tracing::info!(?pose, name = %scene.name, "Placed scene");
    Ok(pose)
}
