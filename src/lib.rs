//! XenoAR: capture a physical object with the camera, reconstruct it with a
//! hosted multimodal model, and keep, export, or place the resulting 3D object.

pub mod api;
pub mod app;
pub mod capture;
pub mod config;
pub mod library;
pub mod models;
pub mod reconstruct;
pub mod router;
pub mod scene;
pub mod store;
