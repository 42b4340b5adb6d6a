#![deny(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::missing_errors_doc
)]
//! # Sonar Compute Kernels
//!
//! Kernel catalogue and backends for the sonar imaging pipeline.
//!
//! Every pipeline stage is expressed as a [`Kernel`] dispatched through a
//! [`ComputeBackend`] with a list of [`BufferView`] bindings, in the order
//! described by [`layout`]. Kernels whose output depends on the numeric
//! encoding of the sonar image carry a [`SampleFormat`]; the CPU backend
//! monomorphizes one handler per texel type, so selecting a format picks one
//! of four precompiled variants rather than assembling anything at runtime.
//!
//! Parameter blocks live in [`params`] and are plain `Pod` structs that are
//! uploaded as the last binding of each dispatch.
//!
//! With the `gpu` feature the same kernels also exist as WGSL (see
//! [`shaders`]) and run on `WgpuBackend`; there the format is a constant
//! prepended to the kernel source.

use std::sync::Arc;
use thiserror::Error;

pub mod backend;
pub mod colormap;
pub mod cpu_backend;
pub mod kernels;
pub mod layout;
pub mod noise;
pub mod params;
pub mod shaders;
pub mod texel;
#[cfg(feature = "gpu")]
pub mod wgpu_backend;

pub use backend::ComputeBackend;
pub use colormap::ColorMap;
pub use cpu_backend::CpuBackend;
pub use params::DisplayVertex;
pub use texel::{RangeIntensity, SampleFormat, Texel};
#[cfg(feature = "gpu")]
pub use wgpu_backend::WgpuBackend;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComputeError {
    #[error("buffer shape mismatch: {0}")]
    ShapeMismatch(&'static str),
    #[error("backend not available")]
    BackendUnavailable,
    #[error("staging buffer could not be mapped: {0}")]
    MapFailed(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kernel {
    // Accumulation into (beam sample, range bin) space
    FlsAccumulate,
    MsisAccumulate,
    SssAccumulate,

    // Encoding and history
    FlsEncode(SampleFormat),
    MsisUpdate(SampleFormat),
    SssShift(SampleFormat),
    SssLine(SampleFormat),

    // Display
    Visualize(SampleFormat),
}

impl Kernel {
    #[must_use]
    pub const fn binding_count(&self) -> u32 {
        layout::binding_count(self)
    }

    /// Output encoding the kernel was specialised for, if any.
    #[must_use]
    pub const fn format(&self) -> Option<SampleFormat> {
        match self {
            Kernel::FlsAccumulate | Kernel::MsisAccumulate | Kernel::SssAccumulate => None,
            Kernel::FlsEncode(f)
            | Kernel::MsisUpdate(f)
            | Kernel::SssShift(f)
            | Kernel::SssLine(f)
            | Kernel::Visualize(f) => Some(*f),
        }
    }
}

#[derive(Clone, Debug)]
pub struct BufferView {
    pub data: Arc<[u8]>,
    pub shape: Vec<usize>, // Number of elements per dimension
    pub element_size_in_bytes: usize, // Size of a single element described by the innermost dimension of shape
}

impl BufferView {
    #[must_use]
    pub fn new(data: Arc<[u8]>, shape: Vec<usize>, element_size_in_bytes: usize) -> Self {
        Self { data, shape, element_size_in_bytes }
    }

    /// Builds a view over a copy of `values`.
    #[must_use]
    pub fn from_slice<T: bytemuck::Pod>(values: &[T], shape: Vec<usize>) -> Self {
        Self::new(
            Arc::from(bytemuck::cast_slice::<T, u8>(values)),
            shape,
            std::mem::size_of::<T>(),
        )
    }

    /// Builds a single-element view holding a parameter block.
    #[must_use]
    pub fn uniform<T: bytemuck::Pod>(value: &T) -> Self {
        Self::new(
            Arc::from(bytemuck::bytes_of(value)),
            vec![1],
            std::mem::size_of::<T>(),
        )
    }

    /// Zero-filled view, used for output bindings.
    #[must_use]
    pub fn zeroed(shape: Vec<usize>, element_size_in_bytes: usize) -> Self {
        let len = shape.iter().product::<usize>() * element_size_in_bytes;
        Self::new(vec![0u8; len].into(), shape, element_size_in_bytes)
    }

    #[must_use]
    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }

    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.element_count() * self.element_size_in_bytes
    }
}

/// Returns the compute backend used by the sonar pipeline.
///
/// With the `gpu` feature a wgpu device is preferred; hosts without a
/// usable adapter fall back to the CPU backend.
#[must_use]
pub fn default_backend() -> Arc<dyn ComputeBackend> {
    #[cfg(feature = "gpu")]
    {
        match WgpuBackend::try_new() {
            Ok(gpu) => {
                tracing::info!(adapter = gpu.adapter_name(), "Using WgpuBackend for sonar kernels.");
                return Arc::new(gpu);
            }
            Err(err) => tracing::warn!(%err, "no wgpu adapter, falling back to CpuBackend"),
        }
    }
    tracing::info!("Using CpuBackend for sonar kernels.");
    Arc::new(CpuBackend::new())
}
