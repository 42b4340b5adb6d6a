//! Construction-time sonar settings.
//!
//! Angles are given in degrees here and converted to radians by the sonar
//! views. Every struct deserializes with `serde`; missing fields fall back to
//! the `Default` impl.

use compute::{ColorMap, SampleFormat};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{invalid, SonarError};

/// Upper limit of beam samples per raster axis.
pub const MAX_BEAM_SAMPLES: u32 = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeWindow {
    pub near: f32,
    pub far: f32,
}

impl RangeWindow {
    #[must_use]
    pub const fn new(near: f32, far: f32) -> Self {
        Self { near, far }
    }

    #[must_use]
    pub fn span(&self) -> f32 {
        self.far - self.near
    }

    pub fn validate(&self) -> Result<(), SonarError> {
        if !(self.near.is_finite() && self.far.is_finite()) || self.near <= 0.0 || self.near >= self.far {
            return Err(invalid(format!(
                "range window must satisfy 0 < near < far, got ({}, {})",
                self.near, self.far
            )));
        }
        Ok(())
    }
}

impl Default for RangeWindow {
    fn default() -> Self {
        Self::new(0.5, 50.0)
    }
}

/// Standard deviations of the multiplicative and additive gaussian noise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Noise {
    pub multiplicative: f32,
    pub additive: f32,
}

impl Noise {
    #[must_use]
    pub const fn new(multiplicative: f32, additive: f32) -> Self {
        Self {
            multiplicative,
            additive,
        }
    }

    pub fn validate(&self) -> Result<(), SonarError> {
        let ok = |s: f32| s.is_finite() && s >= 0.0;
        if !ok(self.multiplicative) || !ok(self.additive) {
            return Err(invalid(format!(
                "noise deviations must be non-negative, got ({}, {})",
                self.multiplicative, self.additive
            )));
        }
        Ok(())
    }
}

pub(crate) fn validate_gain(gain: f32) -> Result<(), SonarError> {
    if gain.is_finite() && gain > 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("gain must be positive, got {gain}")))
    }
}

pub(crate) fn validate_fov(name: &str, degrees: f32, max: f32) -> Result<(), SonarError> {
    if degrees.is_finite() && degrees > 0.0 && degrees <= max {
        Ok(())
    } else {
        Err(invalid(format!("{name} must lie in (0, {max}] degrees, got {degrees}")))
    }
}

pub(crate) fn validate_count(name: &str, count: u32) -> Result<(), SonarError> {
    if count == 0 {
        Err(invalid(format!("{name} must be non-zero")))
    } else {
        Ok(())
    }
}

/// Eye must be finite; direction and up must be non-zero and not parallel.
pub(crate) fn validate_orientation(eye: Vec3, direction: Vec3, up: Vec3) -> Result<(), SonarError> {
    if !eye.is_finite() || !direction.is_finite() || !up.is_finite() {
        return Err(invalid("sonar pose must be finite"));
    }
    let (Some(dir), Some(up)) = (direction.try_normalize(), up.try_normalize()) else {
        return Err(invalid("direction and up must be non-zero"));
    };
    if dir.cross(up).length_squared() < 1e-8 {
        return Err(invalid("direction and up must not be parallel"));
    }
    Ok(())
}

/// Beam sample count along one raster axis.
#[must_use]
pub fn beam_samples(width_deg: f32, bins: f32, factor: f32) -> u32 {
    ((width_deg * bins * factor).ceil() as u32).clamp(1, MAX_BEAM_SAMPLES)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlsConfig {
    pub eye: Vec3,
    pub direction: Vec3,
    pub up: Vec3,
    pub horizontal_fov_deg: f32,
    pub vertical_fov_deg: f32,
    pub beams: u32,
    pub bins: u32,
    pub range: RangeWindow,
    pub gain: f32,
    pub noise: Noise,
    pub format: SampleFormat,
    pub color_map: ColorMap,
    pub seed: Option<u64>,
}

impl Default for FlsConfig {
    fn default() -> Self {
        Self {
            eye: Vec3::ZERO,
            direction: Vec3::NEG_Z,
            up: Vec3::Y,
            horizontal_fov_deg: 90.0,
            vertical_fov_deg: 20.0,
            beams: 512,
            bins: 500,
            range: RangeWindow::default(),
            gain: 1.0,
            noise: Noise::default(),
            format: SampleFormat::U8,
            color_map: ColorMap::default(),
            seed: None,
        }
    }
}

impl FlsConfig {
    pub fn validate(&self) -> Result<(), SonarError> {
        validate_orientation(self.eye, self.direction, self.up)?;
        validate_fov("horizontal fov", self.horizontal_fov_deg, 180.0)?;
        validate_fov("vertical fov", self.vertical_fov_deg, 179.0)?;
        validate_count("beam count", self.beams)?;
        validate_count("bin count", self.bins)?;
        let views = (self.horizontal_fov_deg / crate::fls::MAX_SINGLE_FOV_DEG).ceil() as u32;
        if self.beams < views {
            return Err(invalid(format!(
                "{} beams cannot be split across {views} views",
                self.beams
            )));
        }
        self.range.validate()?;
        validate_gain(self.gain)?;
        self.noise.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MsisConfig {
    pub eye: Vec3,
    pub direction: Vec3,
    pub up: Vec3,
    pub horizontal_beam_width_deg: f32,
    pub vertical_beam_width_deg: f32,
    pub steps: u32,
    pub bins: u32,
    pub range: RangeWindow,
    pub gain: f32,
    pub noise: Noise,
    pub rotation_limits_deg: (f32, f32),
    pub format: SampleFormat,
    pub color_map: ColorMap,
    pub seed: Option<u64>,
}

impl Default for MsisConfig {
    fn default() -> Self {
        Self {
            eye: Vec3::ZERO,
            direction: Vec3::NEG_Z,
            up: Vec3::Y,
            horizontal_beam_width_deg: 2.0,
            vertical_beam_width_deg: 30.0,
            steps: 200,
            bins: 100,
            range: RangeWindow::default(),
            gain: 1.0,
            noise: Noise::default(),
            rotation_limits_deg: (-180.0, 180.0),
            format: SampleFormat::U8,
            color_map: ColorMap::default(),
            seed: None,
        }
    }
}

pub(crate) fn validate_limits(limits: (f32, f32)) -> Result<(), SonarError> {
    let (lo, hi) = limits;
    if !(lo.is_finite() && hi.is_finite()) || lo < -180.0 || hi > 180.0 || lo >= hi {
        return Err(invalid(format!(
            "rotation limits must satisfy -180 <= min < max <= 180, got ({lo}, {hi})"
        )));
    }
    Ok(())
}

impl MsisConfig {
    pub fn validate(&self) -> Result<(), SonarError> {
        validate_orientation(self.eye, self.direction, self.up)?;
        validate_fov("horizontal beam width", self.horizontal_beam_width_deg, 179.0)?;
        validate_fov("vertical beam width", self.vertical_beam_width_deg, 179.0)?;
        validate_count("step count", self.steps)?;
        validate_count("bin count", self.bins)?;
        self.range.validate()?;
        validate_gain(self.gain)?;
        self.noise.validate()?;
        validate_limits(self.rotation_limits_deg)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SssConfig {
    pub eye: Vec3,
    /// Nadir direction.
    pub direction: Vec3,
    /// Along-track direction of travel.
    pub forward: Vec3,
    pub vertical_beam_width_deg: f32,
    pub horizontal_beam_width_deg: f32,
    pub bins: u32,
    pub lines: u32,
    pub tilt_deg: f32,
    pub range: RangeWindow,
    pub gain: f32,
    pub noise: Noise,
    pub format: SampleFormat,
    pub color_map: ColorMap,
    pub seed: Option<u64>,
}

impl Default for SssConfig {
    fn default() -> Self {
        Self {
            eye: Vec3::ZERO,
            direction: Vec3::NEG_Y,
            forward: Vec3::NEG_Z,
            vertical_beam_width_deg: 50.0,
            horizontal_beam_width_deg: 1.0,
            bins: 400,
            lines: 200,
            tilt_deg: 30.0,
            range: RangeWindow::new(1.0, 50.0),
            gain: 1.0,
            noise: Noise::default(),
            format: SampleFormat::U8,
            color_map: ColorMap::default(),
            seed: None,
        }
    }
}

impl SssConfig {
    pub fn validate(&self) -> Result<(), SonarError> {
        validate_orientation(self.eye, self.direction, self.forward)?;
        validate_fov("vertical beam width", self.vertical_beam_width_deg, 179.0)?;
        validate_fov("horizontal beam width", self.horizontal_beam_width_deg, 179.0)?;
        validate_count("bin count", self.bins)?;
        validate_count("line count", self.lines)?;
        if self.bins % 2 != 0 {
            return Err(invalid(format!(
                "bin count must be even to split the swath, got {}",
                self.bins
            )));
        }
        if !(0.0..=90.0).contains(&self.tilt_deg) {
            return Err(invalid(format!("tilt must lie in [0, 90] degrees, got {}", self.tilt_deg)));
        }
        self.range.validate()?;
        validate_gain(self.gain)?;
        self.noise.validate()
    }
}

/// Any sonar configuration, tagged by `kind` in scenario files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SonarConfig {
    Fls(FlsConfig),
    Msis(MsisConfig),
    Sss(SssConfig),
}

impl SonarConfig {
    pub fn validate(&self) -> Result<(), SonarError> {
        match self {
            SonarConfig::Fls(c) => c.validate(),
            SonarConfig::Msis(c) => c.validate(),
            SonarConfig::Sss(c) => c.validate(),
        }
    }
}
