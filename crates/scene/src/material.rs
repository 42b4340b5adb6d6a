use serde::{Deserialize, Serialize};

use crate::SceneError;

/// Acoustic surface properties.
///
/// `reflectivity` is the fraction of incident energy echoed back at normal
/// incidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub reflectivity: f32,
}

impl Material {
    pub const STEEL: Self = Self { reflectivity: 0.95 };
    pub const ROCK: Self = Self { reflectivity: 0.7 };
    pub const SAND: Self = Self { reflectivity: 0.4 };
    pub const MUD: Self = Self { reflectivity: 0.15 };

    pub fn new(reflectivity: f32) -> Result<Self, SceneError> {
        let material = Self { reflectivity };
        material.validate()?;
        Ok(material)
    }

    pub fn validate(&self) -> Result<(), SceneError> {
        if (0.0..=1.0).contains(&self.reflectivity) {
            Ok(())
        } else {
            Err(SceneError::InvalidReflectivity(self.reflectivity))
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::ROCK
    }
}
