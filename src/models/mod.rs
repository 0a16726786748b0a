//! Domain models for XenoAR.
//!
//! # Core Concepts
//!
//! ## Transient Entities
//!
//! - [`CapturedImage`]: One encoded camera frame. Lives only as long as the capture
//!   session, unless it is submitted for reconstruction.
//! - [`ObjectDescription`]: The shape, dimensions, material, and optional raw mesh the
//!   inference endpoint produced for a set of images. Immutable once parsed.
//!
//! ## Permanent Entities
//!
//! - [`StoredObject`]: A named, timestamped copy of an [`ObjectDescription`] kept in
//!   the local asset library.

mod capture;
mod object;
mod stored;

pub use capture::*;
pub use object::*;
pub use stored::*;
