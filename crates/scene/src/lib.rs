#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Reference underwater scene for exercising sonar pipelines.
//!
//! A [`Scene`] is a flat list of analytic shapes (planes, spheres and
//! oriented boxes), each with an acoustic [`Material`]. Rays are cast on the
//! CPU against every object and the closest hit wins.

use thiserror::Error;

pub mod material;
pub mod scene;
pub mod shapes;

pub use material::Material;
pub use scene::{Hit, Scene, SceneObject};
pub use shapes::Shape;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    #[error("invalid {kind}: {reason}")]
    InvalidShape {
        kind: &'static str,
        reason: &'static str,
    },
    #[error("reflectivity {0} outside [0, 1]")]
    InvalidReflectivity(f32),
}
