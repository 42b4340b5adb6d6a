//! Headless scenario loop.
//!
//! Every tick each sensor stages its carrier pose, requests an update and
//! runs one sonar tick. Frames delivered to the mailboxes are written as a
//! color-mapped display PNG and a grayscale PNG of the raw output.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::{GrayImage, RgbImage};
use sonar::{RotationStepper, Sonar, SonarConfig, SonarContext, SonarFrame, SonarPipeline};

use crate::scenario::{Pose, Scenario, SensorSpec};

pub struct RunOptions {
    pub ticks: u32,
    pub out_dir: Option<PathBuf>,
    pub seed: Option<u64>,
}

struct Sensor {
    spec: SensorSpec,
    start: Pose,
    sonar: Sonar,
    stepper: Option<RotationStepper>,
    frames: usize,
}

impl Sensor {
    fn new(spec: SensorSpec, ctx: &std::sync::Arc<SonarContext>) -> Result<Self> {
        let sonar = Sonar::from_config(&spec.sonar, ctx.clone())
            .with_context(|| format!("creating sonar '{}'", spec.name))?;
        let stepper = match &spec.sonar {
            SonarConfig::Msis(c) => Some(RotationStepper::new(c.steps, c.rotation_limits_deg)?),
            _ => None,
        };
        Ok(Self {
            start: spec.start_pose(),
            spec,
            sonar,
            stepper,
            frames: 0,
        })
    }

    fn tick(&mut self, scene: &scene::Scene, tick: u32) -> Result<()> {
        let pose = self.spec.motion.pose_at(self.start, tick);
        self.sonar
            .base_mut()
            .stage_transform(pose.eye, pose.direction, pose.up)?;
        if let (Some(stepper), Some(msis)) = (self.stepper.as_mut(), self.sonar.as_msis_mut()) {
            msis.set_rotation_step(stepper.advance());
        }
        self.sonar.base_mut().mark_for_update();
        self.sonar
            .tick(scene)
            .with_context(|| format!("sonar '{}' tick {tick}", self.spec.name))?;
        Ok(())
    }

    fn drain(&mut self, out_dir: Option<&Path>) -> Result<()> {
        let Some(frame) = self.sonar.base().mailbox().take() else {
            return Ok(());
        };
        self.frames += 1;
        tracing::debug!(sensor = %self.spec.name, tick = frame.tick, "frame delivered");
        if let Some(dir) = out_dir {
            write_frame(dir, &self.spec.name, &frame)?;
        }
        Ok(())
    }
}

fn write_frame(dir: &Path, name: &str, frame: &SonarFrame) -> Result<()> {
    let (dw, dh) = frame.display_size;
    let display = RgbImage::from_raw(dw, dh, frame.display.clone())
        .context("display image does not match its size")?;
    let path = dir.join(format!("{name}_{:04}_display.png", frame.tick));
    display
        .save(&path)
        .with_context(|| format!("writing {}", path.display()))?;

    let (ow, oh) = frame.output_size;
    let raw: Vec<u8> = frame
        .output_strengths()
        .into_iter()
        .map(|s| (s.clamp(0.0, 1.0) * 255.0).round() as u8)
        .collect();
    let raw = GrayImage::from_raw(ow, oh, raw).context("raw output does not match its size")?;
    let path = dir.join(format!("{name}_{:04}_raw.png", frame.tick));
    raw.save(&path)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

pub fn run(mut scenario: Scenario, options: &RunOptions) -> Result<()> {
    if let Some(seed) = options.seed {
        for (i, sensor) in scenario.sensors.iter_mut().enumerate() {
            sensor.set_seed(seed.wrapping_add(i as u64));
        }
    }
    if let Some(dir) = &options.out_dir {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }

    let ctx = SonarContext::with_default_backend();
    let mut sensors = scenario
        .sensors
        .into_iter()
        .map(|spec| Sensor::new(spec, &ctx))
        .collect::<Result<Vec<_>>>()?;
    tracing::info!(
        sensors = sensors.len(),
        objects = scenario.scene.len(),
        ticks = options.ticks,
        "starting scenario"
    );

    let out_dir = options.out_dir.as_deref();
    for tick in 0..options.ticks {
        for sensor in &mut sensors {
            sensor.tick(&scenario.scene, tick)?;
            sensor.drain(out_dir)?;
        }
        if (tick + 1) % 50 == 0 {
            tracing::info!("tick {} complete", tick + 1);
        }
    }

    // the last readback lands at one more commit
    for sensor in &mut sensors {
        sensor.sonar.commit_transform();
        sensor.drain(out_dir)?;
        tracing::info!(sensor = %sensor.spec.name, frames = sensor.frames, "sensor finished");
    }
    Ok(())
}
