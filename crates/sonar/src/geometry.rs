use glam::{Mat4, Vec3};

use crate::config::validate_orientation;
use crate::error::SonarError;

/// Sonar pose: position, look direction and up vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewGeometry {
    pub eye: Vec3,
    pub direction: Vec3,
    pub up: Vec3,
}

impl ViewGeometry {
    pub fn new(eye: Vec3, direction: Vec3, up: Vec3) -> Result<Self, SonarError> {
        validate_orientation(eye, direction, up)?;
        Ok(Self {
            eye,
            direction: direction.normalize(),
            up: up.normalize(),
        })
    }

    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.eye + self.direction, self.up)
    }
}

/// Pending and committed copies of the pose.
///
/// The owning sensor stages a pose at any time; the pipeline only ever reads
/// the committed copy, which changes once per transform commit.
#[derive(Debug, Clone)]
pub struct StagedGeometry {
    pending: ViewGeometry,
    committed: ViewGeometry,
    commits: u64,
}

impl StagedGeometry {
    #[must_use]
    pub fn new(initial: ViewGeometry) -> Self {
        Self {
            pending: initial,
            committed: initial,
            commits: 0,
        }
    }

    pub fn stage(&mut self, eye: Vec3, direction: Vec3, up: Vec3) -> Result<(), SonarError> {
        self.pending = ViewGeometry::new(eye, direction, up)?;
        Ok(())
    }

    pub fn commit(&mut self) -> &ViewGeometry {
        self.committed = self.pending;
        self.commits += 1;
        &self.committed
    }

    #[must_use]
    pub fn pending(&self) -> &ViewGeometry {
        &self.pending
    }

    #[must_use]
    pub fn committed(&self) -> &ViewGeometry {
        &self.committed
    }

    #[must_use]
    pub fn commits(&self) -> u64 {
        self.commits
    }
}
