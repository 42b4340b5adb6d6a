//! Raster capture of range and echo intensity.

use compute::{BufferView, RangeIntensity};
use glam::{Mat4, Vec3};
use scene::Scene;

use crate::error::SonarError;

/// Largest raster edge a capture target accepts.
pub const MAX_TARGET_DIMENSION: u32 = 16384;

/// One pinhole raster pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapturePass {
    pub view: Mat4,
    pub projection: Mat4,
    pub eye: Vec3,
    pub width: u32,
    pub height: u32,
}

/// Renders the scene as seen by a capture pass.
///
/// `target` is row-major with `pass.height` rows of `pass.width` texels,
/// row 0 being the top of the image. Texels without a surface are left as
/// [`RangeIntensity::NONE`].
pub trait SceneRenderer {
    fn render(&self, pass: &CapturePass, target: &mut [RangeIntensity]);
}

/// Layered capture buffer allocated once per sonar.
#[derive(Debug, Clone)]
pub struct CaptureTarget {
    width: u32,
    height: u32,
    layers: u32,
    texels: Vec<RangeIntensity>,
}

impl CaptureTarget {
    pub fn new(width: u32, height: u32, layers: u32) -> Result<Self, SonarError> {
        if width == 0 || height == 0 || layers == 0 {
            tracing::error!(width, height, layers, "capture target has an empty dimension");
            return Err(SonarError::TargetSetup(format!(
                "capture target {width}x{height}x{layers} has an empty dimension"
            )));
        }
        if width > MAX_TARGET_DIMENSION || height > MAX_TARGET_DIMENSION {
            tracing::error!(width, height, "capture target exceeds the maximum raster size");
            return Err(SonarError::TargetSetup(format!(
                "capture target {width}x{height} exceeds {MAX_TARGET_DIMENSION}"
            )));
        }
        let len = width as usize * height as usize * layers as usize;
        Ok(Self {
            width,
            height,
            layers,
            texels: vec![RangeIntensity::NONE; len],
        })
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn layers(&self) -> u32 {
        self.layers
    }

    fn layer_len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    #[must_use]
    pub fn layer(&self, index: usize) -> &[RangeIntensity] {
        let len = self.layer_len();
        &self.texels[index * len..(index + 1) * len]
    }

    /// Clears the target and renders one pass per layer.
    pub fn capture(&mut self, renderer: &dyn SceneRenderer, passes: &[CapturePass]) -> Result<(), SonarError> {
        if passes.len() != self.layers as usize {
            return Err(SonarError::TargetSetup(format!(
                "{} capture passes for {} layers",
                passes.len(),
                self.layers
            )));
        }
        self.texels.fill(RangeIntensity::NONE);
        let len = self.layer_len();
        for (pass, layer) in passes.iter().zip(self.texels.chunks_exact_mut(len)) {
            if pass.width != self.width || pass.height != self.height {
                return Err(SonarError::TargetSetup(format!(
                    "pass raster {}x{} does not match target {}x{}",
                    pass.width, pass.height, self.width, self.height
                )));
            }
            renderer.render(pass, layer);
        }
        Ok(())
    }

    /// Kernel binding of shape `[layers, height, width]`.
    #[must_use]
    pub fn as_view(&self) -> BufferView {
        BufferView::from_slice(
            &self.texels,
            vec![self.layers as usize, self.height as usize, self.width as usize],
        )
    }
}

impl SceneRenderer for Scene {
    fn render(&self, pass: &CapturePass, target: &mut [RangeIntensity]) {
        if self.is_empty() {
            return;
        }
        let inv = (pass.projection * pass.view).inverse();
        let (w, h) = (pass.width as f32, pass.height as f32);
        for (i, texel) in target.iter_mut().enumerate() {
            let col = (i % pass.width as usize) as f32;
            let row = (i / pass.width as usize) as f32;
            let ndc_x = (col + 0.5) / w * 2.0 - 1.0;
            let ndc_y = 1.0 - (row + 0.5) / h * 2.0;
            let near = inv.project_point3(Vec3::new(ndc_x, ndc_y, 0.0));
            let far = inv.project_point3(Vec3::new(ndc_x, ndc_y, 1.0));
            let Some(dir) = (far - near).try_normalize() else {
                continue;
            };
            let Some(hit) = self.cast(pass.eye, dir) else {
                continue;
            };
            // far clip along this ray
            if hit.distance > far.distance(pass.eye) {
                continue;
            }
            let intensity = hit.reflectivity * hit.normal.dot(-dir).max(0.0);
            *texel = RangeIntensity::new(hit.distance, intensity);
        }
    }
}
