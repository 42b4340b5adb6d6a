//! State shared by every sonar variant.

use std::sync::Arc;

use compute::{BufferView, ColorMap, SampleFormat};
use glam::{Mat4, Vec2, Vec3};

use crate::config::{validate_gain, Noise, RangeWindow};
use crate::context::SonarContext;
use crate::error::SonarError;
use crate::geometry::{StagedGeometry, ViewGeometry};
use crate::readback::{ReadbackStage, SonarMailbox};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SonarKind {
    ForwardLooking,
    MechanicalScanning,
    SideScan,
}

/// Runtime-adjustable settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SonarSettings {
    pub range: RangeWindow,
    pub gain: f32,
    pub noise: Noise,
    pub color_map: ColorMap,
}

/// What a transform commit changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitOutcome {
    pub range_changed: bool,
    pub gain_changed: bool,
    /// A staged readback was delivered to the mailbox.
    pub delivered: bool,
}

impl CommitOutcome {
    #[must_use]
    pub fn settings_changed(&self) -> bool {
        self.range_changed || self.gain_changed
    }
}

pub struct SonarView {
    kind: SonarKind,
    ctx: Arc<SonarContext>,
    geometry: StagedGeometry,
    view_matrix: Mat4,
    projection: Mat4,
    clip: (f32, f32),
    fov: Vec2,
    pending: SonarSettings,
    current: SonarSettings,
    update_requested: bool,
    enabled: bool,
    format: SampleFormat,
    readback: ReadbackStage,
    mailbox: SonarMailbox,
    rng: fastrand::Rng,
    tick: u64,
}

pub(crate) struct ViewInit {
    pub kind: SonarKind,
    pub pose: ViewGeometry,
    pub settings: SonarSettings,
    pub fov: Vec2,
    pub format: SampleFormat,
    pub display_size: (u32, u32),
    pub output_size: (u32, u32),
    pub seed: Option<u64>,
}

impl SonarView {
    pub(crate) fn new(init: ViewInit, ctx: Arc<SonarContext>) -> Self {
        let rng = init.seed.map_or_else(fastrand::Rng::new, fastrand::Rng::with_seed);
        Self {
            kind: init.kind,
            ctx,
            geometry: StagedGeometry::new(init.pose),
            view_matrix: init.pose.view_matrix(),
            projection: Mat4::IDENTITY,
            clip: (init.settings.range.near, init.settings.range.far),
            fov: init.fov,
            pending: init.settings,
            current: init.settings,
            update_requested: false,
            enabled: true,
            format: init.format,
            readback: ReadbackStage::new(init.display_size, init.output_size, init.format),
            mailbox: SonarMailbox::new(),
            rng,
            tick: 0,
        }
    }

    /// Records a pose for the next commit.
    pub fn stage_transform(&mut self, eye: Vec3, direction: Vec3, up: Vec3) -> Result<(), SonarError> {
        self.geometry.stage(eye, direction, up)
    }

    /// Applies the staged pose and settings, then hands any mapped readback
    /// to the mailbox.
    pub(crate) fn commit(&mut self) -> CommitOutcome {
        self.view_matrix = self.geometry.commit().view_matrix();
        let range_changed = self.pending.range != self.current.range;
        let gain_changed = self.pending.gain.to_bits() != self.current.gain.to_bits();
        self.current = self.pending;
        let delivered = self.readback.deliver(self.ctx.backend(), &self.mailbox);
        CommitOutcome {
            range_changed,
            gain_changed,
            delivered,
        }
    }

    pub fn set_range(&mut self, near: f32, far: f32) -> Result<(), SonarError> {
        let range = RangeWindow::new(near, far);
        range.validate()?;
        self.pending.range = range;
        Ok(())
    }

    pub fn set_gain(&mut self, gain: f32) -> Result<(), SonarError> {
        validate_gain(gain)?;
        self.pending.gain = gain;
        Ok(())
    }

    pub fn set_noise(&mut self, multiplicative: f32, additive: f32) -> Result<(), SonarError> {
        let noise = Noise::new(multiplicative, additive);
        noise.validate()?;
        self.pending.noise = noise;
        Ok(())
    }

    pub fn set_color_map(&mut self, color_map: ColorMap) {
        self.pending.color_map = color_map;
    }

    pub fn mark_for_update(&mut self) {
        self.update_requested = true;
    }

    /// True at most once per [`mark_for_update`](Self::mark_for_update).
    /// A request made while disabled is dropped.
    pub fn needs_update(&mut self) -> bool {
        let requested = std::mem::take(&mut self.update_requested);
        requested && self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn set_projection(&mut self, projection: Mat4, near: f32, far: f32) {
        self.projection = projection;
        self.clip = (near, far);
    }

    pub(crate) fn next_noise_seed(&mut self) -> u32 {
        self.rng.u32(..)
    }

    /// Returns the index of the pass being computed and advances the counter.
    pub(crate) fn advance_tick(&mut self) -> u64 {
        let tick = self.tick;
        self.tick += 1;
        tick
    }

    /// Index of the most recent compute pass, if any ran.
    pub(crate) fn last_tick(&self) -> Option<u64> {
        self.tick.checked_sub(1)
    }

    pub(crate) fn request_readback(
        &mut self,
        tick: u64,
        display: BufferView,
        output: BufferView,
    ) -> Result<(), SonarError> {
        self.readback
            .request(self.ctx.backend(), tick, display, output)
            .map_err(SonarError::from)
    }

    pub(crate) fn context(&self) -> &SonarContext {
        &self.ctx
    }

    #[must_use]
    pub fn kind(&self) -> SonarKind {
        self.kind
    }

    #[must_use]
    pub fn eye(&self) -> Vec3 {
        self.geometry.committed().eye
    }

    #[must_use]
    pub fn direction(&self) -> Vec3 {
        self.geometry.committed().direction
    }

    #[must_use]
    pub fn up(&self) -> Vec3 {
        self.geometry.committed().up
    }

    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        self.view_matrix
    }

    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    #[must_use]
    pub fn near_clip(&self) -> f32 {
        self.clip.0
    }

    #[must_use]
    pub fn far_clip(&self) -> f32 {
        self.clip.1
    }

    #[must_use]
    pub fn fov_x(&self) -> f32 {
        self.fov.x
    }

    #[must_use]
    pub fn fov_y(&self) -> f32 {
        self.fov.y
    }

    #[must_use]
    pub fn output_format(&self) -> SampleFormat {
        self.format
    }

    /// Settings in effect since the last commit.
    #[must_use]
    pub fn settings(&self) -> &SonarSettings {
        &self.current
    }

    #[must_use]
    pub fn color_map(&self) -> ColorMap {
        self.current.color_map
    }

    #[must_use]
    pub fn mailbox(&self) -> &SonarMailbox {
        &self.mailbox
    }

    /// Number of completed compute passes.
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    #[must_use]
    pub fn has_pending_readback(&self) -> bool {
        self.readback.has_pending()
    }
}

impl std::fmt::Debug for SonarView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SonarView")
            .field("kind", &self.kind)
            .field("format", &self.format)
            .field("settings", &self.current)
            .field("enabled", &self.enabled)
            .field("tick", &self.tick)
            .finish_non_exhaustive()
    }
}
