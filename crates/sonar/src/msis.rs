//! Mechanically scanning imaging sonar.
//!
//! A single narrow beam is rendered per tick and merged into one column of a
//! persistent rotation image. The owning sensor pushes the rotation step.

use std::f32::consts::TAU;
use std::sync::Arc;

use compute::params::{MsisAccumulateParams, MsisUpdateParams};
use compute::{layout, BufferView, Kernel};
use glam::{Mat4, Vec2};

use crate::capture::{CapturePass, CaptureTarget, SceneRenderer};
use crate::config::{beam_samples, validate_limits, MsisConfig, RangeWindow};
use crate::context::SonarContext;
use crate::display::{self, DisplayMesh};
use crate::error::SonarError;
use crate::geometry::ViewGeometry;
use crate::sonar::SonarPipeline;
use crate::view::{CommitOutcome, SonarKind, SonarSettings, SonarView, ViewInit};

/// Beam samples per degree and bin on both raster axes.
pub const RES_FACTOR: f32 = 0.1;

pub struct Msis {
    base: SonarView,
    steps: u32,
    bins: u32,
    beam_width: Vec2,
    samples: (u32, u32),
    pending_step: i32,
    step: i32,
    pending_limits: (f32, f32),
    limits: (f32, f32),
    beam_view: Mat4,
    target: CaptureTarget,
    mesh: DisplayMesh,
    image: BufferView,
    display: BufferView,
}

impl Msis {
    pub fn new(config: &MsisConfig, ctx: Arc<SonarContext>) -> Result<Self, SonarError> {
        config.validate()?;
        let beam_width = Vec2::new(
            config.horizontal_beam_width_deg.to_radians(),
            config.vertical_beam_width_deg.to_radians(),
        );
        let bins_f = config.bins as f32;
        let samples = (
            beam_samples(config.horizontal_beam_width_deg, bins_f, RES_FACTOR),
            beam_samples(config.vertical_beam_width_deg, bins_f, RES_FACTOR),
        );
        let target = CaptureTarget::new(samples.0, samples.1, 1)?;
        let limits = (
            config.rotation_limits_deg.0.to_radians(),
            config.rotation_limits_deg.1.to_radians(),
        );
        let mesh = DisplayMesh::new(Self::fan(config.rotation_limits_deg, config.range, config.steps));
        let display_size = (config.bins, config.bins);
        let pose = ViewGeometry::new(config.eye, config.direction, config.up)?;

        let base = SonarView::new(
            ViewInit {
                kind: SonarKind::MechanicalScanning,
                pose,
                settings: SonarSettings {
                    range: config.range,
                    gain: config.gain,
                    noise: config.noise,
                    color_map: config.color_map,
                },
                fov: beam_width,
                format: config.format,
                display_size,
                output_size: (config.steps, config.bins),
                seed: config.seed,
            },
            ctx,
        );

        let mut msis = Self {
            base,
            steps: config.steps,
            bins: config.bins,
            beam_width,
            samples,
            pending_step: 0,
            step: 0,
            pending_limits: limits,
            limits,
            beam_view: pose.view_matrix(),
            target,
            mesh,
            image: Self::blank_image(config),
            display: BufferView::zeroed(vec![display_size.1 as usize, display_size.0 as usize], 3),
        };
        msis.update_projection(config.range);
        tracing::info!(
            steps = config.steps,
            bins = config.bins,
            samples_x = samples.0,
            samples_y = samples.1,
            format = ?config.format,
            "mechanically scanning sonar created"
        );
        Ok(msis)
    }

    fn blank_image(config: &MsisConfig) -> BufferView {
        BufferView::zeroed(
            vec![config.bins as usize, config.steps as usize],
            config.format.bytes_per_texel(),
        )
    }

    fn fan(limits_deg: (f32, f32), range: RangeWindow, steps: u32) -> Vec<compute::DisplayVertex> {
        let divisions = display::msis_fan_divisions(limits_deg.1 - limits_deg.0, steps);
        display::msis_fan(
            (limits_deg.0.to_radians(), limits_deg.1.to_radians()),
            range,
            divisions,
        )
    }

    fn update_projection(&mut self, range: RangeWindow) {
        let (h, v) = (self.beam_width.x / 2.0, self.beam_width.y / 2.0);
        let near = range.near * h.max(v).cos();
        let projection = Mat4::perspective_rh(self.beam_width.y, h.tan() / v.tan(), near, range.far);
        self.base.set_projection(projection, near, range.far);
    }

    /// Sets the head position applied at the next commit. Any integer is
    /// accepted and wrapped onto the rotation image.
    pub fn set_rotation_step(&mut self, step: i32) {
        self.pending_step = step;
    }

    /// Sets the display sector in degrees, applied at the next commit.
    pub fn set_rotation_limits(&mut self, min_deg: f32, max_deg: f32) -> Result<(), SonarError> {
        validate_limits((min_deg, max_deg))?;
        self.pending_limits = (min_deg.to_radians(), max_deg.to_radians());
        Ok(())
    }

    /// Committed rotation step.
    #[must_use]
    pub fn rotation_step(&self) -> i32 {
        self.step
    }

    #[must_use]
    pub fn rotation_limits(&self) -> (f32, f32) {
        self.limits
    }

    /// Image column the committed step writes to.
    #[must_use]
    pub fn rotation_column(&self) -> u32 {
        column_of(self.step, self.steps)
    }

    #[must_use]
    pub fn step_count(&self) -> u32 {
        self.steps
    }

    #[must_use]
    pub fn beam_samples(&self) -> (u32, u32) {
        self.samples
    }

    /// View matrix of the rotated beam.
    #[must_use]
    pub fn beam_view(&self) -> Mat4 {
        self.beam_view
    }

    /// Persistent rotation image, `bins` rows of `steps` columns.
    #[must_use]
    pub fn image(&self) -> &BufferView {
        &self.image
    }

    fn clear_image(&mut self) {
        let format = self.base.output_format();
        self.image = BufferView::zeroed(
            vec![self.bins as usize, self.steps as usize],
            format.bytes_per_texel(),
        );
        tracing::debug!("rotation image cleared");
    }
}

/// Column of rotation step `step` in an image of `steps` columns; step 0
/// lands in the centre.
#[must_use]
pub fn column_of(step: i32, steps: u32) -> u32 {
    let n = i64::from(steps);
    (i64::from(step) + n / 2).rem_euclid(n) as u32
}

impl SonarPipeline for Msis {
    fn base(&self) -> &SonarView {
        &self.base
    }

    fn base_mut(&mut self) -> &mut SonarView {
        &mut self.base
    }

    fn commit_transform(&mut self) -> CommitOutcome {
        let outcome = self.base.commit();
        self.step = self.pending_step;
        let angle = self.step as f32 * TAU / self.steps as f32;
        self.beam_view = Mat4::from_rotation_y(angle) * self.base.view_matrix();

        // columns merged under the old range or gain would mix scales
        if outcome.settings_changed() {
            self.clear_image();
        }
        let limits_changed = self.pending_limits != self.limits;
        self.limits = self.pending_limits;
        if outcome.range_changed {
            self.update_projection(self.base.settings().range);
        }
        if outcome.range_changed || limits_changed {
            let limits_deg = (self.limits.0.to_degrees(), self.limits.1.to_degrees());
            self.mesh
                .rebuild(Self::fan(limits_deg, self.base.settings().range, self.steps));
        }
        outcome
    }

    fn compute_output(&mut self, renderer: &dyn SceneRenderer) -> Result<(), SonarError> {
        let pass = CapturePass {
            view: self.beam_view,
            projection: self.base.projection_matrix(),
            eye: self.base.eye(),
            width: self.target.width(),
            height: self.target.height(),
        };
        self.target.capture(renderer, &[pass])?;

        let seed = self.base.next_noise_seed();
        let settings = *self.base.settings();
        let format = self.base.output_format();
        let ctx = self.base.context();
        let (sx, sy) = self.samples;
        let hist_shape = vec![sy as usize, self.bins as usize];

        let accumulate = MsisAccumulateParams {
            samples_x: sx,
            samples_y: sy,
            n_bins: self.bins,
            range_min: settings.range.near,
            range_max: settings.range.far,
        };
        let hist = ctx.run(
            Kernel::MsisAccumulate,
            &[
                self.target.as_view(),
                BufferView::zeroed(hist_shape.clone(), 4),
                BufferView::uniform(&accumulate),
            ],
            layout::tiled(self.bins, sy),
            hist_shape,
            4,
        )?;

        let update = MsisUpdateParams {
            samples_y: sy,
            n_bins: self.bins,
            n_steps: self.steps,
            column: self.rotation_column(),
            noise_seed: seed,
            gain: settings.gain,
            noise_multiplicative: settings.noise.multiplicative,
            noise_additive: settings.noise.additive,
        };
        self.image = ctx.run(
            ctx.kernels(format).msis_update,
            &[hist, self.image.clone(), BufferView::uniform(&update)],
            layout::linear(layout::packed_words(self.bins * self.steps, format)),
            self.image.shape.clone(),
            format.bytes_per_texel(),
        )?;

        let tick = self.base.advance_tick();
        tracing::debug!(tick, step = self.step, column = update.column, "msis column updated");
        Ok(())
    }

    fn draw_display(&mut self, updated: bool) -> Result<(), SonarError> {
        let Some(tick) = self.base.last_tick().filter(|_| updated) else {
            return Ok(());
        };
        self.display = display::visualize(
            self.base.context(),
            self.base.output_format(),
            self.base.color_map(),
            &self.image,
            self.output_size(),
            &self.mesh,
            self.display_size(),
        )?;
        self.base
            .request_readback(tick, self.display.clone(), self.image.clone())
    }

    fn output_image(&self) -> &BufferView {
        &self.image
    }

    fn output_size(&self) -> (u32, u32) {
        (self.steps, self.bins)
    }

    fn display_image(&self) -> &BufferView {
        &self.display
    }

    fn display_size(&self) -> (u32, u32) {
        (self.bins, self.bins)
    }

    fn display_mesh(&self) -> &DisplayMesh {
        &self.mesh
    }
}

impl std::fmt::Debug for Msis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Msis")
            .field("base", &self.base)
            .field("steps", &self.steps)
            .field("bins", &self.bins)
            .field("step", &self.step)
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compute::SampleFormat;
    use glam::Vec3;

    fn config() -> MsisConfig {
        MsisConfig {
            horizontal_beam_width_deg: 3.0,
            vertical_beam_width_deg: 20.0,
            steps: 8,
            bins: 32,
            range: RangeWindow::new(1.0, 20.0),
            format: SampleFormat::F32,
            seed: Some(3),
            ..MsisConfig::default()
        }
    }

    #[test]
    fn column_offsets_by_half_a_turn() {
        assert_eq!(column_of(0, 8), 4);
        assert_eq!(column_of(3, 8), 7);
        assert_eq!(column_of(4, 8), 0);
        assert_eq!(column_of(-1, 8), 3);
        assert_eq!(column_of(-5, 8), 7);
        assert_eq!(column_of(2, 5), 4);
    }

    #[test]
    fn step_applies_at_commit() {
        let mut msis = Msis::new(&config(), SonarContext::with_default_backend()).unwrap();
        msis.set_rotation_step(2);
        assert_eq!(msis.rotation_step(), 0);
        msis.commit_transform();
        assert_eq!(msis.rotation_step(), 2);
        assert_eq!(msis.rotation_column(), 6);
        // a quarter turn to the right
        let ahead = msis.beam_view().inverse().transform_vector3(Vec3::NEG_Z);
        assert!((ahead - Vec3::X).length() < 1e-5, "{ahead:?}");
    }

    #[test]
    fn beam_samples_per_axis() {
        let msis = Msis::new(&config(), SonarContext::with_default_backend()).unwrap();
        // ceil(3 * 32 * 0.1), ceil(20 * 32 * 0.1)
        assert_eq!(msis.beam_samples(), (10, 64));
    }

    #[test]
    fn limits_change_rebuilds_the_fan() {
        let mut msis = Msis::new(&config(), SonarContext::with_default_backend()).unwrap();
        msis.commit_transform();
        assert_eq!(msis.display_mesh().generation(), 0);
        msis.set_rotation_limits(-45.0, 45.0).unwrap();
        msis.commit_transform();
        assert_eq!(msis.display_mesh().generation(), 1);
        assert!(msis.set_rotation_limits(10.0, -10.0).is_err());
        msis.base_mut().set_range(1.0, 10.0).unwrap();
        msis.commit_transform();
        assert_eq!(msis.display_mesh().generation(), 2);
        msis.commit_transform();
        assert_eq!(msis.display_mesh().generation(), 2);
    }

    #[test]
    fn range_or_gain_change_clears_the_image() {
        let mut msis = Msis::new(&config(), SonarContext::with_default_backend()).unwrap();
        let blank = msis.image().data.clone();
        msis.commit_transform();
        assert!(Arc::ptr_eq(&msis.image().data, &blank));

        msis.base_mut().set_gain(2.0).unwrap();
        msis.commit_transform();
        let cleared = msis.image().data.clone();
        assert!(!Arc::ptr_eq(&cleared, &blank));
        assert!(cleared.iter().all(|&b| b == 0));

        msis.set_rotation_step(3);
        msis.commit_transform();
        assert!(Arc::ptr_eq(&msis.image().data, &cleared));

        msis.base_mut().set_range(2.0, 20.0).unwrap();
        msis.commit_transform();
        assert!(!Arc::ptr_eq(&msis.image().data, &cleared));
    }

    #[test]
    fn display_is_square() {
        let msis = Msis::new(&config(), SonarContext::with_default_backend()).unwrap();
        assert_eq!(msis.display_size(), (32, 32));
        assert_eq!(msis.output_size(), (8, 32));
        assert_eq!(msis.image().shape, vec![32, 8]);
    }
}
