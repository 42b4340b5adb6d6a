//! Scenario files: a scene plus the sonars moving through it.

use std::path::Path;

use anyhow::{Context, Result};
use glam::{Quat, Vec3};
use scene::Scene;
use serde::{Deserialize, Serialize};
use sonar::SonarConfig;

/// Scenario used when no file is given.
pub const DEFAULT_SCENARIO: &str = include_str!("../scenarios/harbour.json");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub scene: Scene,
    pub sensors: Vec<SensorSpec>,
}

/// One sonar and how its carrier moves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSpec {
    pub name: String,
    pub sonar: SonarConfig,
    #[serde(default)]
    pub motion: Motion,
}

/// Constant velocity and yaw rate of the carrier, per tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Motion {
    pub velocity: Vec3,
    pub yaw_rate_deg: f32,
}

/// Eye, look direction and up vector of a sonar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub eye: Vec3,
    pub direction: Vec3,
    pub up: Vec3,
}

impl Motion {
    /// Pose after `tick` ticks, starting from `start`.
    pub fn pose_at(&self, start: Pose, tick: u32) -> Pose {
        let t = tick as f32;
        let yaw = Quat::from_rotation_y((self.yaw_rate_deg * t).to_radians());
        Pose {
            eye: start.eye + self.velocity * t,
            direction: yaw * start.direction,
            up: yaw * start.up,
        }
    }
}

impl SensorSpec {
    /// Pose given in the sonar configuration.
    pub fn start_pose(&self) -> Pose {
        match &self.sonar {
            SonarConfig::Fls(c) => Pose { eye: c.eye, direction: c.direction, up: c.up },
            SonarConfig::Msis(c) => Pose { eye: c.eye, direction: c.direction, up: c.up },
            SonarConfig::Sss(c) => Pose { eye: c.eye, direction: c.direction, up: c.forward },
        }
    }

    pub fn set_seed(&mut self, seed: u64) {
        match &mut self.sonar {
            SonarConfig::Fls(c) => c.seed = Some(seed),
            SonarConfig::Msis(c) => c.seed = Some(seed),
            SonarConfig::Sss(c) => c.seed = Some(seed),
        }
    }
}

impl Scenario {
    pub fn parse(text: &str) -> Result<Self> {
        let scenario: Scenario = serde_json::from_str(text).context("malformed scenario")?;
        scenario.scene.validate().context("invalid scene")?;
        for sensor in &scenario.sensors {
            sensor
                .sonar
                .validate()
                .with_context(|| format!("invalid sonar '{}'", sensor.name))?;
        }
        Ok(scenario)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        Self::parse(&text)
    }
}
