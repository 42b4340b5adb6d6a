//! Display meshes.
//!
//! Each sonar draws its output image through a triangle strip in normalised
//! device coordinates. `u` runs along output columns (beams or rotation
//! steps) and `v` along output rows, with `v = 0` at the near range.

use compute::params::VisualizeParams;
use compute::{layout, BufferView, ColorMap, DisplayVertex, SampleFormat};
use std::f32::consts::{PI, TAU};

use crate::config::RangeWindow;
use crate::context::SonarContext;
use crate::error::SonarError;

/// Color-maps `image` (`image_size` as width, height) through `mesh` into a
/// fresh RGB8 display image.
pub(crate) fn visualize(
    ctx: &SonarContext,
    format: SampleFormat,
    color_map: ColorMap,
    image: &BufferView,
    image_size: (u32, u32),
    mesh: &DisplayMesh,
    display_size: (u32, u32),
) -> Result<BufferView, SonarError> {
    let (dw, dh) = display_size;
    let params = VisualizeParams {
        image_width: image_size.0,
        image_height: image_size.1,
        display_width: dw,
        display_height: dh,
        vertex_count: mesh.vertices().len() as u32,
        color_map: color_map.index(),
    };
    let shape = vec![dh as usize, dw as usize];
    ctx.run(
        ctx.kernels(format).visualize,
        &[
            image.clone(),
            mesh.as_view(),
            BufferView::zeroed(shape.clone(), 3),
            BufferView::uniform(&params),
        ],
        layout::linear((dw * dh * 3).div_ceil(4)),
        shape,
        3,
    )
}

/// Display mesh plus a counter of how often it was rebuilt.
#[derive(Debug, Clone)]
pub struct DisplayMesh {
    vertices: Vec<DisplayVertex>,
    generation: u64,
}

impl DisplayMesh {
    #[must_use]
    pub fn new(vertices: Vec<DisplayVertex>) -> Self {
        Self {
            vertices,
            generation: 0,
        }
    }

    pub fn rebuild(&mut self, vertices: Vec<DisplayVertex>) {
        self.vertices = vertices;
        self.generation += 1;
        tracing::debug!(generation = self.generation, vertices = self.vertices.len(), "display mesh rebuilt");
    }

    #[must_use]
    pub fn vertices(&self) -> &[DisplayVertex] {
        &self.vertices
    }

    /// Number of rebuilds since construction.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn as_view(&self) -> BufferView {
        BufferView::from_slice(&self.vertices, vec![self.vertices.len()])
    }
}

/// Display viewport of a forward-looking sonar: the fan's bounding box.
#[must_use]
pub fn fls_display_size(horizontal_fov: f32, bins: u32) -> (u32, u32) {
    let width = (2.0 * (horizontal_fov / 2.0).sin() * bins as f32).ceil() as u32;
    (width.max(1), bins)
}

#[must_use]
pub fn fls_fan_divisions(horizontal_fov_deg: f32, beams: u32) -> u32 {
    (horizontal_fov_deg.ceil() as u32).clamp(1, beams.max(1))
}

/// Fan with its apex at the bottom centre of the viewport and the far arc
/// touching the top edge.
#[must_use]
pub fn fls_fan(horizontal_fov: f32, range: RangeWindow, divisions: u32) -> Vec<DisplayVertex> {
    let half = horizontal_fov / 2.0;
    let h_factor = half.sin();
    let r_min = range.near / range.far;
    (0..=divisions)
        .flat_map(|i| {
            let u = i as f32 / divisions as f32;
            let alpha = -half + u * horizontal_fov;
            let (s, c) = alpha.sin_cos();
            [
                DisplayVertex::new(r_min * s / h_factor, 2.0 * r_min * c - 1.0, u, 0.0),
                DisplayVertex::new(s / h_factor, 2.0 * c - 1.0, u, 1.0),
            ]
        })
        .collect()
}

/// Strip segments of an MSIS sector: one per started degree of the sector,
/// at most one per rotation step. A full circle gets `min(360, steps)`.
/// Narrower sectors get fewer segments than a fixed `min(360, steps)` would
/// give them, yet no segment grows wider than a degree or a rotation step,
/// so the drawn fan looks the same.
#[must_use]
pub fn msis_fan_divisions(span_deg: f32, steps: u32) -> u32 {
    (span_deg.ceil() as u32).clamp(1, steps.max(1))
}

/// Circular sector centred in a square viewport, straight ahead pointing up.
///
/// `u = (alpha + pi) / 2pi`, so the column of rotation step `s` of `n` is
/// `(s + n/2) mod n`.
#[must_use]
pub fn msis_fan(limits: (f32, f32), range: RangeWindow, divisions: u32) -> Vec<DisplayVertex> {
    let r_min = range.near / range.far;
    let span = limits.1 - limits.0;
    (0..=divisions)
        .flat_map(|i| {
            let alpha = limits.0 + span * i as f32 / divisions as f32;
            let u = ((alpha + PI) / TAU).clamp(0.0, 1.0);
            let (s, c) = alpha.sin_cos();
            [
                DisplayVertex::new(r_min * s, r_min * c, u, 0.0),
                DisplayVertex::new(s, c, u, 1.0),
            ]
        })
        .collect()
}

/// Whole-viewport quad, newest waterfall line at the top.
#[must_use]
pub fn full_quad() -> Vec<DisplayVertex> {
    vec![
        DisplayVertex::new(-1.0, 1.0, 0.0, 0.0),
        DisplayVertex::new(-1.0, -1.0, 0.0, 1.0),
        DisplayVertex::new(1.0, 1.0, 1.0, 0.0),
        DisplayVertex::new(1.0, -1.0, 1.0, 1.0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fls_viewport_fits_the_fan() {
        let (w, h) = fls_display_size(120f32.to_radians(), 100);
        assert_eq!((w, h), (174, 100));
        let (w, _) = fls_display_size(30f32.to_radians(), 100);
        assert_eq!(w, 52);
    }

    #[test]
    fn fls_fan_spans_viewport() {
        let fov = 90f32.to_radians();
        let verts = fls_fan(fov, RangeWindow::new(1.0, 10.0), 4);
        assert_eq!(verts.len(), 10);
        // far edge at the fan borders touches the side of the viewport
        assert!((verts[1].position[0] + 1.0).abs() < 1e-5);
        assert!((verts[9].position[0] - 1.0).abs() < 1e-5);
        // centre far vertex touches the top
        assert!((verts[5].position[1] - 1.0).abs() < 1e-5);
        // apex side sits near the bottom
        assert!((verts[4].position[1] - (2.0 * 0.1 - 1.0)).abs() < 1e-5);
        assert!(verts.iter().step_by(2).all(|v| v.uv[1] == 0.0));
    }

    #[test]
    fn fan_divisions_are_bounded_by_beams() {
        assert_eq!(fls_fan_divisions(60.0, 512), 60);
        assert_eq!(fls_fan_divisions(60.0, 16), 16);
        assert_eq!(msis_fan_divisions(360.0, 200), 200);
        assert_eq!(msis_fan_divisions(360.0, 720), 360);
        assert_eq!(msis_fan_divisions(90.0, 720), 90);
        assert_eq!(msis_fan_divisions(0.5, 720), 1);
    }

    #[test]
    fn msis_forward_maps_to_centre_column() {
        let verts = msis_fan((-PI, PI), RangeWindow::new(1.0, 10.0), 4);
        // i = 2 is straight ahead
        let ahead = verts[5];
        assert!((ahead.uv[0] - 0.5).abs() < 1e-6);
        assert!((ahead.position[1] - 1.0).abs() < 1e-6);
        assert!(ahead.position[0].abs() < 1e-6);
        assert!(verts[1].uv[0].abs() < 1e-6);
        assert!((verts[9].uv[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn rebuild_bumps_generation() {
        let mut mesh = DisplayMesh::new(full_quad());
        assert_eq!(mesh.generation(), 0);
        mesh.rebuild(full_quad());
        assert_eq!(mesh.generation(), 1);
        assert_eq!(mesh.as_view().shape, vec![4]);
    }
}
