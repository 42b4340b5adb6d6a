//! Parameter blocks uploaded as the last binding of every dispatch.
//!
//! All blocks are `#[repr(C)]` with 4-byte fields only, so they can be read
//! back with `bytemuck::pod_read_unaligned` from any byte buffer.

use bytemuck::{Pod, Zeroable};

/// Multi-view capture to beam/bin histogram.
///
/// Capture layout is `[view][beam sample][view beam]`; every view but the last
/// carries `beams_first` beams, the last one the remainder.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct FlsAccumulateParams {
    pub n_views: u32,
    pub beams_first: u32,
    pub beams_total: u32,
    pub view_beams: u32,
    pub beam_samples: u32,
    pub n_bins: u32,
    pub range_min: f32,
    pub range_max: f32,
    pub gain: f32,
}

/// Float histogram to output encoding, used by the FLS postprocess.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct EncodeParams {
    pub width: u32,
    pub height: u32,
    pub noise_seed: u32,
    pub noise_multiplicative: f32,
    pub noise_additive: f32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct MsisAccumulateParams {
    pub samples_x: u32,
    pub samples_y: u32,
    pub n_bins: u32,
    pub range_min: f32,
    pub range_max: f32,
}

/// Merges one beam histogram into a column of the persistent rotation image.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct MsisUpdateParams {
    pub samples_y: u32,
    pub n_bins: u32,
    pub n_steps: u32,
    pub column: u32,
    pub noise_seed: u32,
    pub gain: f32,
    pub noise_multiplicative: f32,
    pub noise_additive: f32,
}

/// Two-layer capture (port, starboard) to per-view histograms.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct SssAccumulateParams {
    pub samples_x: u32,
    pub samples_y: u32,
    pub half_bins: u32,
    pub range_min: f32,
    pub range_max: f32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ShiftParams {
    pub width: u32,
    pub height: u32,
}

/// Writes the newest waterfall line into row 0.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct SssLineParams {
    pub samples_x: u32,
    pub half_bins: u32,
    pub width: u32,
    pub height: u32,
    pub noise_seed: u32,
    pub gain: f32,
    pub vertical_fov: f32,
    pub noise_multiplicative: f32,
    pub noise_additive: f32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct VisualizeParams {
    pub image_width: u32,
    pub image_height: u32,
    pub display_width: u32,
    pub display_height: u32,
    pub vertex_count: u32,
    pub color_map: u32,
}

/// Display mesh vertex: normalised device position and image coordinates.
///
/// Vertices form a triangle strip. `uv` addresses the output image with
/// `u` along columns and `v` along rows.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct DisplayVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

impl DisplayVertex {
    #[must_use]
    pub const fn new(x: f32, y: f32, u: f32, v: f32) -> Self {
        Self {
            position: [x, y],
            uv: [u, v],
        }
    }
}
