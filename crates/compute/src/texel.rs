//! Texel types shared by the capture, accumulation and encoding kernels.

use bytemuck::{Pod, Zeroable};
use std::borrow::Cow;

/// One capture texel: radial range to the sampled surface and the echo
/// intensity derived from its material. `(0, 0)` means no return.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct RangeIntensity {
    pub range: f32,
    pub intensity: f32,
}

impl RangeIntensity {
    pub const NONE: Self = Self { range: 0.0, intensity: 0.0 };

    #[must_use]
    pub const fn new(range: f32, intensity: f32) -> Self {
        Self { range, intensity }
    }
}

/// Numeric encoding of a sonar output image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SampleFormat {
    #[default]
    U8,
    U16,
    U32,
    F32,
}

impl SampleFormat {
    pub const ALL: [SampleFormat; 4] = [
        SampleFormat::U8,
        SampleFormat::U16,
        SampleFormat::U32,
        SampleFormat::F32,
    ];

    #[must_use]
    pub const fn bytes_per_texel(self) -> usize {
        match self {
            SampleFormat::U8 => 1,
            SampleFormat::U16 => 2,
            SampleFormat::U32 | SampleFormat::F32 => 4,
        }
    }

    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            SampleFormat::U8 => 0,
            SampleFormat::U16 => 1,
            SampleFormat::U32 => 2,
            SampleFormat::F32 => 3,
        }
    }
}

/// A storage type for one output texel.
///
/// Accumulated echo strength is a non-negative float where `1.0` is a full
/// return; integer encodings saturate at their maximum value.
pub trait Texel: Pod + Default + Send + Sync {
    const FORMAT: SampleFormat;

    fn encode(value: f32) -> Self;

    /// Normalised `[0, 1]` strength used by the color kernels.
    fn strength(self) -> f32;
}

impl Texel for u8 {
    const FORMAT: SampleFormat = SampleFormat::U8;

    fn encode(value: f32) -> Self {
        (value.clamp(0.0, 1.0) * f32::from(u8::MAX)).round() as u8
    }

    fn strength(self) -> f32 {
        f32::from(self) / f32::from(u8::MAX)
    }
}

impl Texel for u16 {
    const FORMAT: SampleFormat = SampleFormat::U16;

    fn encode(value: f32) -> Self {
        (value.clamp(0.0, 1.0) * f32::from(u16::MAX)).round() as u16
    }

    fn strength(self) -> f32 {
        f32::from(self) / f32::from(u16::MAX)
    }
}

impl Texel for u32 {
    const FORMAT: SampleFormat = SampleFormat::U32;

    fn encode(value: f32) -> Self {
        (f64::from(value.clamp(0.0, 1.0)) * f64::from(u32::MAX)).round() as u32
    }

    fn strength(self) -> f32 {
        (f64::from(self) / f64::from(u32::MAX)) as f32
    }
}

impl Texel for f32 {
    const FORMAT: SampleFormat = SampleFormat::F32;

    fn encode(value: f32) -> Self {
        value.max(0.0)
    }

    fn strength(self) -> f32 {
        self.clamp(0.0, 1.0)
    }
}

/// Reinterprets kernel bytes as texels, copying only when the buffer is not
/// suitably aligned.
#[must_use]
pub fn cast_texels<T: Pod>(bytes: &[u8]) -> Cow<'_, [T]> {
    match bytemuck::try_cast_slice(bytes) {
        Ok(texels) => Cow::Borrowed(texels),
        Err(_) => Cow::Owned(
            bytes
                .chunks_exact(std::mem::size_of::<T>())
                .map(bytemuck::pod_read_unaligned)
                .collect(),
        ),
    }
}
