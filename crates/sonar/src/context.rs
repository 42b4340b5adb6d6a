use std::sync::Arc;

use compute::{BufferView, ComputeBackend, ComputeError, Kernel, SampleFormat};

use crate::error::SonarError;

/// Format-specialised kernels for one output encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelSet {
    pub fls_encode: Kernel,
    pub msis_update: Kernel,
    pub sss_shift: Kernel,
    pub sss_line: Kernel,
    pub visualize: Kernel,
}

impl KernelSet {
    #[must_use]
    pub const fn for_format(format: SampleFormat) -> Self {
        Self {
            fls_encode: Kernel::FlsEncode(format),
            msis_update: Kernel::MsisUpdate(format),
            sss_shift: Kernel::SssShift(format),
            sss_line: Kernel::SssLine(format),
            visualize: Kernel::Visualize(format),
        }
    }
}

/// Read-only state shared by every sonar: the compute backend and one kernel
/// set per output format.
///
/// Sonars receive the context at construction, so several instances (and
/// tests) can run against different backends in one process.
pub struct SonarContext {
    backend: Arc<dyn ComputeBackend>,
    kernel_sets: [KernelSet; 4],
}

impl SonarContext {
    #[must_use]
    pub fn new(backend: Arc<dyn ComputeBackend>) -> Arc<Self> {
        let kernel_sets = SampleFormat::ALL.map(KernelSet::for_format);
        tracing::info!(formats = kernel_sets.len(), "sonar kernel sets ready");
        Arc::new(Self {
            backend,
            kernel_sets,
        })
    }

    /// Context over [`compute::default_backend`].
    #[must_use]
    pub fn with_default_backend() -> Arc<Self> {
        Self::new(compute::default_backend())
    }

    #[must_use]
    pub fn backend(&self) -> &dyn ComputeBackend {
        self.backend.as_ref()
    }

    #[must_use]
    pub fn kernels(&self, format: SampleFormat) -> &KernelSet {
        &self.kernel_sets[format.index()]
    }

    /// Dispatches `kernel` and wraps its single output in a view of `shape`.
    pub(crate) fn run(
        &self,
        kernel: Kernel,
        binds: &[BufferView],
        workgroups: [u32; 3],
        shape: Vec<usize>,
        element_size_in_bytes: usize,
    ) -> Result<BufferView, SonarError> {
        let mut outputs = self.backend.dispatch(&kernel, binds, workgroups)?;
        if outputs.is_empty() {
            return Err(ComputeError::ShapeMismatch("kernel returned no output buffer").into());
        }
        let view = BufferView::new(outputs.swap_remove(0).into(), shape, element_size_in_bytes);
        if view.data.len() != view.byte_len() {
            return Err(ComputeError::ShapeMismatch("kernel output does not match the expected shape").into());
        }
        Ok(view)
    }
}

impl std::fmt::Debug for SonarContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SonarContext")
            .field("kernel_sets", &self.kernel_sets)
            .finish_non_exhaustive()
    }
}
