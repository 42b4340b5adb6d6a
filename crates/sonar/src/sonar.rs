use std::sync::Arc;

use compute::BufferView;

use crate::capture::SceneRenderer;
use crate::config::SonarConfig;
use crate::context::SonarContext;
use crate::display::DisplayMesh;
use crate::error::SonarError;
use crate::fls::Fls;
use crate::msis::Msis;
use crate::sss::Sss;
use crate::view::{CommitOutcome, SonarKind, SonarView};

/// Capability shared by every sonar variant.
///
/// A tick is `commit_transform`, then `compute_output` when an update was
/// requested, then `draw_display`. Readbacks requested while drawing are
/// delivered to the mailbox at the following commit.
pub trait SonarPipeline {
    fn base(&self) -> &SonarView;

    fn base_mut(&mut self) -> &mut SonarView;

    /// Applies staged pose and settings, re-deriving projection and display
    /// geometry where they changed.
    fn commit_transform(&mut self) -> CommitOutcome;

    /// Captures the scene and runs the accumulation and encoding stages.
    fn compute_output(&mut self, renderer: &dyn SceneRenderer) -> Result<(), SonarError>;

    /// Color-maps the latest output and requests its readback. Does nothing
    /// unless `updated`.
    fn draw_display(&mut self, updated: bool) -> Result<(), SonarError>;

    fn output_image(&self) -> &BufferView;

    /// Output width and height in texels.
    fn output_size(&self) -> (u32, u32);

    fn display_image(&self) -> &BufferView;

    fn display_size(&self) -> (u32, u32);

    fn display_mesh(&self) -> &DisplayMesh;

    /// Runs one full tick. Returns whether a new output was computed.
    fn tick(&mut self, renderer: &dyn SceneRenderer) -> Result<bool, SonarError> {
        self.commit_transform();
        let updated = self.base_mut().needs_update();
        if updated {
            self.compute_output(renderer)?;
        }
        self.draw_display(updated)?;
        Ok(updated)
    }
}

/// Any sonar variant.
#[derive(Debug)]
pub enum Sonar {
    Fls(Fls),
    Msis(Msis),
    Sss(Sss),
}

macro_rules! delegate {
    ($self:ident, $s:ident => $body:expr) => {
        match $self {
            Sonar::Fls($s) => $body,
            Sonar::Msis($s) => $body,
            Sonar::Sss($s) => $body,
        }
    };
}

impl Sonar {
    pub fn from_config(config: &SonarConfig, ctx: Arc<SonarContext>) -> Result<Self, SonarError> {
        Ok(match config {
            SonarConfig::Fls(c) => Sonar::Fls(Fls::new(c, ctx)?),
            SonarConfig::Msis(c) => Sonar::Msis(Msis::new(c, ctx)?),
            SonarConfig::Sss(c) => Sonar::Sss(Sss::new(c, ctx)?),
        })
    }

    #[must_use]
    pub fn kind(&self) -> SonarKind {
        self.base().kind()
    }

    #[must_use]
    pub fn as_msis_mut(&mut self) -> Option<&mut Msis> {
        match self {
            Sonar::Msis(msis) => Some(msis),
            _ => None,
        }
    }
}

impl SonarPipeline for Sonar {
    fn base(&self) -> &SonarView {
        delegate!(self, s => s.base())
    }

    fn base_mut(&mut self) -> &mut SonarView {
        delegate!(self, s => s.base_mut())
    }

    fn commit_transform(&mut self) -> CommitOutcome {
        delegate!(self, s => s.commit_transform())
    }

    fn compute_output(&mut self, renderer: &dyn SceneRenderer) -> Result<(), SonarError> {
        delegate!(self, s => s.compute_output(renderer))
    }

    fn draw_display(&mut self, updated: bool) -> Result<(), SonarError> {
        delegate!(self, s => s.draw_display(updated))
    }

    fn output_image(&self) -> &BufferView {
        delegate!(self, s => s.output_image())
    }

    fn output_size(&self) -> (u32, u32) {
        delegate!(self, s => s.output_size())
    }

    fn display_image(&self) -> &BufferView {
        delegate!(self, s => s.display_image())
    }

    fn display_size(&self) -> (u32, u32) {
        delegate!(self, s => s.display_size())
    }

    fn display_mesh(&self) -> &DisplayMesh {
        delegate!(self, s => s.display_mesh())
    }
}

impl From<Fls> for Sonar {
    fn from(fls: Fls) -> Self {
        Sonar::Fls(fls)
    }
}

impl From<Msis> for Sonar {
    fn from(msis: Msis) -> Self {
        Sonar::Msis(msis)
    }
}

impl From<Sss> for Sonar {
    fn from(sss: Sss) -> Self {
        Sonar::Sss(sss)
    }
}
