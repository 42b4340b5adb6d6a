use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::{Material, SceneError, Shape};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub shape: Shape,
    #[serde(default)]
    pub material: Material,
}

/// Closest surface along a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub distance: f32,
    /// Unit normal facing the ray origin.
    pub normal: Vec3,
    pub reflectivity: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub objects: Vec<SceneObject>,
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, object: SceneObject) -> Result<usize, SceneError> {
        object.shape.validate()?;
        object.material.validate()?;
        self.objects.push(object);
        Ok(self.objects.len() - 1)
    }

    pub fn add_plane(&mut self, normal: Vec3, offset: f32, material: Material) -> Result<usize, SceneError> {
        self.add(SceneObject {
            name: None,
            shape: Shape::Plane { normal, offset },
            material,
        })
    }

    pub fn add_sphere(&mut self, center: Vec3, radius: f32, material: Material) -> Result<usize, SceneError> {
        self.add(SceneObject {
            name: None,
            shape: Shape::Sphere { center, radius },
            material,
        })
    }

    pub fn add_box(
        &mut self,
        center: Vec3,
        half_extents: Vec3,
        rotation: Quat,
        material: Material,
    ) -> Result<usize, SceneError> {
        self.add(SceneObject {
            name: None,
            shape: Shape::Box {
                center,
                half_extents,
                rotation,
            },
            material,
        })
    }

    /// Checks every object, e.g. after deserializing a scene file.
    pub fn validate(&self) -> Result<(), SceneError> {
        for object in &self.objects {
            object.shape.validate()?;
            object.material.validate()?;
        }
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Casts a ray and returns the nearest hit. `dir` need not be normalised;
    /// distances are always in scene units.
    #[must_use]
    pub fn cast(&self, origin: Vec3, dir: Vec3) -> Option<Hit> {
        let dir = dir.try_normalize()?;
        self.objects
            .iter()
            .filter_map(|object| {
                object.shape.intersect(origin, dir).map(|(distance, normal)| Hit {
                    distance,
                    normal,
                    reflectivity: object.material.reflectivity,
                })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}
