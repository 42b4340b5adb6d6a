//! Forward-looking sonar.
//!
//! The horizontal fan is covered by several narrow pinhole views rendered
//! into the layers of one capture target. Views are ordered left to right
//! and every view but the last carries the same number of beams.

use std::sync::Arc;

use compute::params::{EncodeParams, FlsAccumulateParams};
use compute::{layout, BufferView, Kernel};
use glam::{Mat4, Vec2};

use crate::capture::{CapturePass, CaptureTarget, SceneRenderer};
use crate::config::{beam_samples, FlsConfig, RangeWindow};
use crate::context::SonarContext;
use crate::display::{self, DisplayMesh};
use crate::error::{invalid, SonarError};
use crate::geometry::ViewGeometry;
use crate::sonar::SonarPipeline;
use crate::view::{CommitOutcome, SonarKind, SonarSettings, SonarView, ViewInit};

/// Widest horizontal angle one capture view may cover.
pub const MAX_SINGLE_FOV_DEG: f32 = 20.0;
/// Vertical beam samples per degree and bin.
pub const VRES_FACTOR: f32 = 0.1;

/// Split of the beams across capture views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeamPartition {
    pub views: u32,
    pub beams_first: u32,
    pub beams_last: u32,
}

impl BeamPartition {
    /// Spreads `beams` over `ceil(fov / 20°)` views.
    ///
    /// Leading views take `round(beams / views)` each and the last one the
    /// remainder. When rounding up would leave the last view without beams the
    /// leading share is rounded down instead.
    pub fn new(beams: u32, horizontal_fov_deg: f32) -> Result<Self, SonarError> {
        let views = ((horizontal_fov_deg / MAX_SINGLE_FOV_DEG).ceil() as u32).max(1);
        if beams < views {
            return Err(invalid(format!("{beams} beams cannot be split across {views} views")));
        }
        let mut beams_first = (beams as f32 / views as f32).round() as u32;
        if beams_first * (views - 1) >= beams {
            beams_first = beams / views;
        }
        Ok(Self {
            views,
            beams_first,
            beams_last: beams - beams_first * (views - 1),
        })
    }

    /// Raster width shared by all views.
    #[must_use]
    pub fn view_beams(&self) -> u32 {
        self.beams_first.max(self.beams_last)
    }

    #[must_use]
    pub fn beams_of(&self, view: u32) -> u32 {
        if view + 1 == self.views {
            self.beams_last
        } else {
            self.beams_first
        }
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.beams_first * (self.views - 1) + self.beams_last
    }
}

pub struct Fls {
    base: SonarView,
    beams: u32,
    bins: u32,
    hfov: f32,
    vfov: f32,
    partition: BeamPartition,
    beam_samples: u32,
    view_rotations: Vec<Mat4>,
    target: CaptureTarget,
    mesh: DisplayMesh,
    fan_divisions: u32,
    display_size: (u32, u32),
    output: BufferView,
    display: BufferView,
}

impl Fls {
    pub fn new(config: &FlsConfig, ctx: Arc<SonarContext>) -> Result<Self, SonarError> {
        config.validate()?;
        let hfov = config.horizontal_fov_deg.to_radians();
        let vfov = config.vertical_fov_deg.to_radians();
        let partition = BeamPartition::new(config.beams, config.horizontal_fov_deg)?;
        let beam_samples = beam_samples(config.vertical_fov_deg, config.bins as f32, VRES_FACTOR);
        let target = CaptureTarget::new(partition.view_beams(), beam_samples, partition.views)?;

        let display_size = display::fls_display_size(hfov, config.bins);
        let fan_divisions = display::fls_fan_divisions(config.horizontal_fov_deg, config.beams);
        let mesh = DisplayMesh::new(display::fls_fan(hfov, config.range, fan_divisions));
        let output_size = (config.beams, config.bins);

        let base = SonarView::new(
            ViewInit {
                kind: SonarKind::ForwardLooking,
                pose: ViewGeometry::new(config.eye, config.direction, config.up)?,
                settings: SonarSettings {
                    range: config.range,
                    gain: config.gain,
                    noise: config.noise,
                    color_map: config.color_map,
                },
                fov: Vec2::new(hfov, vfov),
                format: config.format,
                display_size,
                output_size,
                seed: config.seed,
            },
            ctx,
        );

        let mut fls = Self {
            base,
            beams: config.beams,
            bins: config.bins,
            hfov,
            vfov,
            partition,
            beam_samples,
            view_rotations: Vec::with_capacity(partition.views as usize),
            target,
            mesh,
            fan_divisions,
            display_size,
            output: BufferView::zeroed(
                vec![config.bins as usize, config.beams as usize],
                config.format.bytes_per_texel(),
            ),
            display: BufferView::zeroed(vec![display_size.1 as usize, display_size.0 as usize], 3),
        };
        fls.view_rotations = fls.compute_view_rotations();
        fls.update_projection(config.range);
        tracing::info!(
            views = partition.views,
            beams_first = partition.beams_first,
            beams_last = partition.beams_last,
            beam_samples,
            format = ?config.format,
            "forward-looking sonar created"
        );
        Ok(fls)
    }

    /// Horizontal angle covered by one view raster.
    fn view_fov(&self) -> f32 {
        self.partition.view_beams() as f32 / self.beams as f32 * self.hfov
    }

    fn compute_view_rotations(&self) -> Vec<Mat4> {
        let corr = self.view_fov();
        let mut acc = 0.0;
        (0..self.partition.views)
            .map(|view| {
                let rotation = Mat4::from_rotation_y(-self.hfov / 2.0 + acc + corr / 2.0);
                acc += self.partition.beams_of(view) as f32 / self.beams as f32 * self.hfov;
                rotation
            })
            .collect()
    }

    fn update_projection(&mut self, range: RangeWindow) {
        let corr = self.view_fov();
        let near = range.near * (corr / 2.0).max(self.vfov / 2.0).cos();
        let aspect = (corr / 2.0).tan() / (self.vfov / 2.0).tan();
        let projection = Mat4::perspective_rh(self.vfov, aspect, near, range.far);
        self.base.set_projection(projection, near, range.far);
    }

    #[must_use]
    pub fn partition(&self) -> BeamPartition {
        self.partition
    }

    #[must_use]
    pub fn beam_samples(&self) -> u32 {
        self.beam_samples
    }

    #[must_use]
    pub fn view_rotations(&self) -> &[Mat4] {
        &self.view_rotations
    }

    #[must_use]
    pub fn fan_divisions(&self) -> u32 {
        self.fan_divisions
    }
}

impl SonarPipeline for Fls {
    fn base(&self) -> &SonarView {
        &self.base
    }

    fn base_mut(&mut self) -> &mut SonarView {
        &mut self.base
    }

    fn commit_transform(&mut self) -> CommitOutcome {
        let outcome = self.base.commit();
        if outcome.range_changed {
            let range = self.base.settings().range;
            self.update_projection(range);
            self.mesh.rebuild(display::fls_fan(self.hfov, range, self.fan_divisions));
        }
        outcome
    }

    fn compute_output(&mut self, renderer: &dyn SceneRenderer) -> Result<(), SonarError> {
        let view = self.base.view_matrix();
        let projection = self.base.projection_matrix();
        let eye = self.base.eye();
        let passes: Vec<CapturePass> = self
            .view_rotations
            .iter()
            .map(|rotation| CapturePass {
                view: *rotation * view,
                projection,
                eye,
                width: self.target.width(),
                height: self.target.height(),
            })
            .collect();
        self.target.capture(renderer, &passes)?;

        let seed = self.base.next_noise_seed();
        let settings = *self.base.settings();
        let format = self.base.output_format();
        let ctx = self.base.context();
        let shape = vec![self.bins as usize, self.beams as usize];

        let accumulate = FlsAccumulateParams {
            n_views: self.partition.views,
            beams_first: self.partition.beams_first,
            beams_total: self.beams,
            view_beams: self.partition.view_beams(),
            beam_samples: self.beam_samples,
            n_bins: self.bins,
            range_min: settings.range.near,
            range_max: settings.range.far,
            gain: settings.gain,
        };
        let hist = ctx.run(
            Kernel::FlsAccumulate,
            &[
                self.target.as_view(),
                BufferView::zeroed(shape.clone(), 4),
                BufferView::uniform(&accumulate),
            ],
            layout::tiled(self.beams, self.bins),
            shape.clone(),
            4,
        )?;

        let encode = EncodeParams {
            width: self.beams,
            height: self.bins,
            noise_seed: seed,
            noise_multiplicative: settings.noise.multiplicative,
            noise_additive: settings.noise.additive,
        };
        self.output = ctx.run(
            ctx.kernels(format).fls_encode,
            &[
                hist,
                BufferView::zeroed(shape.clone(), format.bytes_per_texel()),
                BufferView::uniform(&encode),
            ],
            layout::linear(layout::packed_words(self.beams * self.bins, format)),
            shape,
            format.bytes_per_texel(),
        )?;

        let tick = self.base.advance_tick();
        tracing::debug!(tick, "fls output computed");
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
            &self.output,
            self.output_size(),
            &self.mesh,
            self.display_size,
        )?;
        self.base
            .request_readback(tick, self.display.clone(), self.output.clone())
    }

    fn output_image(&self) -> &BufferView {
        &self.output
    }

    fn output_size(&self) -> (u32, u32) {
        (self.beams, self.bins)
    }

    fn display_image(&self) -> &BufferView {
        &self.display
    }

    fn display_size(&self) -> (u32, u32) {
        self.display_size
    }

    fn display_mesh(&self) -> &DisplayMesh {
        &self.mesh
    }
}

impl std::fmt::Debug for Fls {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fls")
            .field("base", &self.base)
            .field("partition", &self.partition)
            .field("beam_samples", &self.beam_samples)
            .field("bins", &self.bins)
            .finish_non_exhaustive()
    }
}
