//! Side-scan sonar.
//!
//! Two oblique views, port then starboard, are captured per tick. Each tick
//! appends one line to a waterfall kept in two ping-pong images: the older
//! image is shifted down by a row into the other slot and the newest line is
//! written on top of it.

use std::f32::consts::FRAC_PI_2;
use std::sync::Arc;

use compute::params::{ShiftParams, SssAccumulateParams, SssLineParams};
use compute::{layout, BufferView, Kernel};
use glam::{Mat4, Vec2};

use crate::capture::{CapturePass, CaptureTarget, SceneRenderer};
use crate::config::{beam_samples, RangeWindow, SssConfig};
use crate::context::SonarContext;
use crate::display::{self, DisplayMesh};
use crate::error::SonarError;
use crate::geometry::ViewGeometry;
use crate::sonar::SonarPipeline;
use crate::view::{CommitOutcome, SonarKind, SonarSettings, SonarView, ViewInit};

/// Across-track beam samples per degree and half-swath bin.
pub const VRES_FACTOR: f32 = 0.2;
/// Along-track beam samples per degree.
pub const HRES_FACTOR: f32 = 100.0;

pub struct Sss {
    base: SonarView,
    bins: u32,
    lines: u32,
    beam_width: Vec2,
    samples: (u32, u32),
    view_rotations: [Mat4; 2],
    target: CaptureTarget,
    mesh: DisplayMesh,
    images: [BufferView; 2],
    parity: usize,
    display: BufferView,
}

impl Sss {
    pub fn new(config: &SssConfig, ctx: Arc<SonarContext>) -> Result<Self, SonarError> {
        config.validate()?;
        let half = config.bins / 2;
        // x across track, y along track
        let beam_width = Vec2::new(
            config.vertical_beam_width_deg.to_radians(),
            config.horizontal_beam_width_deg.to_radians(),
        );
        let samples = (
            beam_samples(config.vertical_beam_width_deg, half as f32, VRES_FACTOR),
            beam_samples(config.horizontal_beam_width_deg, 1.0, HRES_FACTOR),
        );
        let target = CaptureTarget::new(samples.0, samples.1, 2)?;
        let offset = FRAC_PI_2 - config.tilt_deg.to_radians();
        let view_rotations = [Mat4::from_rotation_y(-offset), Mat4::from_rotation_y(offset)];
        let image_shape = vec![config.lines as usize, config.bins as usize];
        let texel = config.format.bytes_per_texel();

        let base = SonarView::new(
            ViewInit {
                kind: SonarKind::SideScan,
                pose: ViewGeometry::new(config.eye, config.direction, config.forward)?,
                settings: SonarSettings {
                    range: config.range,
                    gain: config.gain,
                    noise: config.noise,
                    color_map: config.color_map,
                },
                fov: beam_width,
                format: config.format,
                display_size: (config.bins, config.lines),
                output_size: (config.bins, config.lines),
                seed: config.seed,
            },
            ctx,
        );

        let mut sss = Self {
            base,
            bins: config.bins,
            lines: config.lines,
            beam_width,
            samples,
            view_rotations,
            target,
            mesh: DisplayMesh::new(display::full_quad()),
            images: [
                BufferView::zeroed(image_shape.clone(), texel),
                BufferView::zeroed(image_shape, texel),
            ],
            parity: 0,
            display: BufferView::zeroed(vec![config.lines as usize, config.bins as usize], 3),
        };
        sss.update_projection(config.range);
        tracing::info!(
            bins = config.bins,
            lines = config.lines,
            samples_x = samples.0,
            samples_y = samples.1,
            format = ?config.format,
            "side-scan sonar created"
        );
        Ok(sss)
    }

    fn update_projection(&mut self, range: RangeWindow) {
        let (across, along) = (self.beam_width.x / 2.0, self.beam_width.y / 2.0);
        let near = range.near * across.max(along).cos();
        let projection = Mat4::perspective_rh(self.beam_width.y, across.tan() / along.tan(), near, range.far);
        self.base.set_projection(projection, near, range.far);
    }

    /// Slot holding the most recently written waterfall.
    #[must_use]
    pub fn parity(&self) -> usize {
        self.parity
    }

    #[must_use]
    pub fn current_image(&self) -> &BufferView {
        &self.images[self.parity]
    }

    #[must_use]
    pub fn beam_samples(&self) -> (u32, u32) {
        self.samples
    }

    /// Port and starboard view rotations applied after the body view.
    #[must_use]
    pub fn view_rotations(&self) -> &[Mat4; 2] {
        &self.view_rotations
    }
}

impl SonarPipeline for Sss {
    fn base(&self) -> &SonarView {
        &self.base
    }

    fn base_mut(&mut self) -> &mut SonarView {
        &mut self.base
    }

    fn commit_transform(&mut self) -> CommitOutcome {
        let outcome = self.base.commit();
        if outcome.range_changed {
            self.update_projection(self.base.settings().range);
        }
        outcome
    }

    fn compute_output(&mut self, renderer: &dyn SceneRenderer) -> Result<(), SonarError> {
        let view = self.base.view_matrix();
        let projection = self.base.projection_matrix();
        let eye = self.base.eye();
        let passes = self.view_rotations.map(|rotation| CapturePass {
            view: rotation * view,
            projection,
            eye,
            width: self.target.width(),
            height: self.target.height(),
        });
        self.target.capture(renderer, &passes)?;

        let seed = self.base.next_noise_seed();
        let settings = *self.base.settings();
        let format = self.base.output_format();
        let ctx = self.base.context();
        let kernels = ctx.kernels(format);
        let (sx, sy) = self.samples;
        let half = self.bins / 2;
        let hist_shape = vec![2, sx as usize, half as usize];
        let image_shape = vec![self.lines as usize, self.bins as usize];
        let texel = format.bytes_per_texel();

        let accumulate = SssAccumulateParams {
            samples_x: sx,
            samples_y: sy,
            half_bins: half,
            range_min: settings.range.near,
            range_max: settings.range.far,
        };
        let hist = ctx.run(
            Kernel::SssAccumulate,
            &[
                self.target.as_view(),
                BufferView::zeroed(hist_shape.clone(), 4),
                BufferView::uniform(&accumulate),
            ],
            layout::tiled(half, 2 * sx),
            hist_shape,
            4,
        )?;

        let shift = ShiftParams {
            width: self.bins,
            height: self.lines,
        };
        let shifted = ctx.run(
            kernels.sss_shift,
            &[
                self.images[self.parity].clone(),
                BufferView::zeroed(image_shape.clone(), texel),
                BufferView::uniform(&shift),
            ],
            layout::linear(layout::packed_words(self.bins * self.lines, format)),
            image_shape.clone(),
            texel,
        )?;

        let line = SssLineParams {
            samples_x: sx,
            half_bins: half,
            width: self.bins,
            height: self.lines,
            noise_seed: seed,
            gain: settings.gain,
            vertical_fov: self.beam_width.x,
            noise_multiplicative: settings.noise.multiplicative,
            noise_additive: settings.noise.additive,
        };
        let written = ctx.run(
            kernels.sss_line,
            &[hist, shifted, BufferView::uniform(&line)],
            layout::linear(layout::packed_words(self.bins, format)),
            image_shape,
            texel,
        )?;

        let next = 1 - self.parity;
        self.images[next] = written;
        self.parity = next;
        let tick = self.base.advance_tick();
        tracing::debug!(tick, parity = self.parity, "waterfall line written");
        Ok(())
    }

    fn draw_display(&mut self, updated: bool) -> Result<(), SonarError> {
        let Some(tick) = self.base.last_tick().filter(|_| updated) else {
            return Ok(());
        };
        let current = self.images[self.parity].clone();
        self.display = display::visualize(
            self.base.context(),
            self.base.output_format(),
            self.base.color_map(),
            &current,
            self.output_size(),
            &self.mesh,
            self.display_size(),
        )?;
        self.base.request_readback(tick, self.display.clone(), current)
    }

    fn output_image(&self) -> &BufferView {
        self.current_image()
    }

    fn output_size(&self) -> (u32, u32) {
        (self.bins, self.lines)
    }

    fn display_image(&self) -> &BufferView {
        &self.display
    }

    fn display_size(&self) -> (u32, u32) {
        (self.bins, self.lines)
    }

    fn display_mesh(&self) -> &DisplayMesh {
        &self.mesh
    }
}

impl std::fmt::Debug for Sss {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sss")
            .field("base", &self.base)
            .field("bins", &self.bins)
            .field("lines", &self.lines)
            .field("parity", &self.parity)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compute::SampleFormat;
    use glam::Vec3;

    fn config() -> SssConfig {
        SssConfig {
            vertical_beam_width_deg: 40.0,
            horizontal_beam_width_deg: 0.5,
            bins: 40,
            lines: 6,
            tilt_deg: 30.0,
            format: SampleFormat::U16,
            seed: Some(11),
            ..SssConfig::default()
        }
    }

    #[test]
    fn sample_counts_follow_beam_widths() {
        let sss = Sss::new(&config(), SonarContext::with_default_backend()).unwrap();
        // ceil(40 * 20 * 0.2), ceil(0.5 * 100)
        assert_eq!(sss.beam_samples(), (160, 50));
    }

    #[test]
    fn port_view_looks_left_of_track() {
        let sss = Sss::new(&config(), SonarContext::with_default_backend()).unwrap();
        let view = sss.base().view_matrix();
        let look = |r: &Mat4| (*r * view).inverse().transform_vector3(Vec3::NEG_Z);
        let [port, starboard] = sss.view_rotations().each_ref().map(look);
        // heading -Z with +Y up: port is -X
        assert!(port.x < 0.0 && starboard.x > 0.0);
        // 30 degrees below the horizon
        assert!((port.y + 0.5).abs() < 1e-5 && (starboard.y + 0.5).abs() < 1e-5);
    }

    #[test]
    fn parity_alternates_every_tick() {
        let mut sss = Sss::new(&config(), SonarContext::with_default_backend()).unwrap();
        let scene = scene::Scene::new();
        assert_eq!(sss.parity(), 0);
        for expected in [1, 0, 1] {
            sss.commit_transform();
            sss.compute_output(&scene).unwrap();
            assert_eq!(sss.parity(), expected);
        }
        assert_eq!(sss.base().tick(), 3);
    }

    #[test]
    fn gain_change_keeps_the_waterfall() {
        let mut sss = Sss::new(&config(), SonarContext::with_default_backend()).unwrap();
        sss.commit_transform();
        sss.compute_output(&scene::Scene::new()).unwrap();
        sss.base_mut().set_gain(3.0).unwrap();
        let outcome = sss.commit_transform();
        assert!(outcome.gain_changed);
        assert_eq!(sss.parity(), 1);
        assert_eq!(sss.display_mesh().generation(), 0);
    }
}
