//! Rotation step counter of a mechanically scanning head.

use std::f32::consts::TAU;

use crate::config::validate_limits;
use crate::error::{invalid, SonarError};

/// Produces the rotation step pushed to an MSIS every tick.
///
/// Full-circle limits wrap through `[0, steps)`. Narrower limits sweep back
/// and forth between the outermost steps inside the limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationStepper {
    steps: u32,
    low: i32,
    high: i32,
    full_circle: bool,
    current: i32,
    direction: i32,
}

impl RotationStepper {
    pub fn new(steps: u32, limits_deg: (f32, f32)) -> Result<Self, SonarError> {
        if steps == 0 {
            return Err(invalid("step count must be non-zero"));
        }
        let mut stepper = Self {
            steps,
            low: 0,
            high: 0,
            full_circle: true,
            current: 0,
            direction: 1,
        };
        stepper.set_limits(limits_deg)?;
        Ok(stepper)
    }

    /// Replaces the sweep limits, pulling the current step inside them.
    pub fn set_limits(&mut self, limits_deg: (f32, f32)) -> Result<(), SonarError> {
        validate_limits(limits_deg)?;
        let (lo, hi) = limits_deg;
        self.full_circle = hi - lo >= 360.0;
        if self.full_circle {
            self.low = 0;
            self.high = self.steps as i32 - 1;
            self.current = self.current.rem_euclid(self.steps as i32);
            return Ok(());
        }
        let per_step = 360.0 / self.steps as f32;
        let mut low = (lo / per_step).ceil() as i32;
        let mut high = (hi / per_step).floor() as i32;
        if low > high {
            // narrower than one step
            let centre = ((lo + hi) / 2.0 / per_step).round() as i32;
            low = centre;
            high = centre;
        }
        self.low = low;
        self.high = high;
        self.current = self.current.clamp(low, high);
        Ok(())
    }

    #[must_use]
    pub fn current(&self) -> i32 {
        self.current
    }

    #[must_use]
    pub fn steps(&self) -> u32 {
        self.steps
    }

    /// Lowest and highest step the head visits.
    #[must_use]
    pub fn step_range(&self) -> (i32, i32) {
        (self.low, self.high)
    }

    #[must_use]
    pub fn is_full_circle(&self) -> bool {
        self.full_circle
    }

    /// Head angle of the current step in radians.
    #[must_use]
    pub fn angle(&self) -> f32 {
        self.current as f32 * TAU / self.steps as f32
    }

    /// Moves one step and returns the new step.
    pub fn advance(&mut self) -> i32 {
        if self.full_circle {
            self.current = (self.current + 1).rem_euclid(self.steps as i32);
            return self.current;
        }
        if self.low == self.high {
            return self.current;
        }
        let mut next = self.current + self.direction;
        if next > self.high || next < self.low {
            self.direction = -self.direction;
            next = self.current + self.direction;
        }
        self.current = next;
        self.current
    }
}
