use crate::{kernels, BufferView, ComputeBackend, ComputeError, Kernel, SampleFormat};

#[derive(Default, Debug, Clone)]
pub struct CpuBackend;

impl CpuBackend {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// Walks the kernel layout slot by slot; every slot must be bound and hold
/// exactly `product(shape) * element_size` bytes.
pub(crate) fn validate_bindings(shader: &Kernel, binds: &[BufferView]) -> Result<(), ComputeError> {
    let slots = shader.binding_count() as usize;
    for slot in 0..slots.max(binds.len()) {
        let Some(buffer_view) = binds.get(slot) else {
            return Err(ComputeError::ShapeMismatch(
                "Kernel layout slot has no binding",
            ));
        };
        if slot >= slots {
            return Err(ComputeError::ShapeMismatch(
                "Binding lies past the last slot of the kernel layout",
            ));
        }
        if buffer_view.data.len() != buffer_view.byte_len() {
            return Err(ComputeError::ShapeMismatch(
                "Binding data length does not match its shape and element size",
            ));
        }
    }
    Ok(())
}

// Picks the handler instance for the texel type of `$format`.
macro_rules! per_format {
    ($handler:ident, $format:expr, $binds:expr) => {
        match $format {
            SampleFormat::U8 => kernels::$handler::<u8>($binds),
            SampleFormat::U16 => kernels::$handler::<u16>($binds),
            SampleFormat::U32 => kernels::$handler::<u32>($binds),
            SampleFormat::F32 => kernels::$handler::<f32>($binds),
        }
    };
}

impl ComputeBackend for CpuBackend {
    fn dispatch(
        &self,
        shader: &Kernel,
        binds: &[BufferView],
        _workgroups: [u32; 3],
    ) -> Result<Vec<Vec<u8>>, ComputeError> {
        validate_bindings(shader, binds)?;
        tracing::trace!(kernel = ?shader, binds = binds.len(), "cpu dispatch");

        match *shader {
            Kernel::FlsAccumulate => kernels::handle_fls_accumulate(binds),
            Kernel::MsisAccumulate => kernels::handle_msis_accumulate(binds),
            Kernel::SssAccumulate => kernels::handle_sss_accumulate(binds),
            Kernel::FlsEncode(format) => per_format!(handle_fls_encode, format, binds),
            Kernel::MsisUpdate(format) => per_format!(handle_msis_update, format, binds),
            Kernel::SssShift(format) => per_format!(handle_sss_shift, format, binds),
            Kernel::SssLine(format) => per_format!(handle_sss_line, format, binds),
            Kernel::Visualize(format) => per_format!(handle_visualize, format, binds),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ShiftParams;

    #[test]
    fn mismatch_shape_fails() {
        let cpu = CpuBackend::new();
        let bad_buf = BufferView::new(vec![0u8; 12].into(), vec![4], 4);
        let out_buf = BufferView::new(vec![0u8; 16].into(), vec![4], 4);
        let cfg = BufferView::uniform(&ShiftParams { width: 2, height: 2 });
        let result = cpu.dispatch(
            &Kernel::SssShift(SampleFormat::F32),
            &[bad_buf, out_buf, cfg],
            [1, 1, 1],
        );
        assert!(
            matches!(result, Err(ComputeError::ShapeMismatch(_))),
            "Expected ShapeMismatch error, got {result:?}"
        );
    }

    #[test]
    fn wrong_binding_count_fails() {
        let cpu = CpuBackend::new();
        let buf = BufferView::zeroed(vec![4], 4);
        let result = cpu.dispatch(
            &Kernel::Visualize(SampleFormat::U8),
            &[buf.clone(), buf.clone(), buf],
            [1, 1, 1],
        );
        assert!(matches!(result, Err(ComputeError::ShapeMismatch(_))));
    }

    #[test]
    fn extra_binding_fails() {
        let cpu = CpuBackend::new();
        let buf = BufferView::zeroed(vec![4], 4);
        let cfg = BufferView::uniform(&ShiftParams { width: 2, height: 2 });
        let result = cpu.dispatch(
            &Kernel::SssShift(SampleFormat::F32),
            &[buf.clone(), buf.clone(), cfg, buf],
            [1, 1, 1],
        );
        assert_eq!(
            result,
            Err(ComputeError::ShapeMismatch(
                "Binding lies past the last slot of the kernel layout"
            ))
        );
    }

    #[test]
    fn missing_binding_fails() {
        let buf = BufferView::zeroed(vec![4], 4);
        assert_eq!(
            validate_bindings(&Kernel::FlsAccumulate, &[buf]),
            Err(ComputeError::ShapeMismatch("Kernel layout slot has no binding"))
        );
    }

    #[test]
    fn map_read_returns_staging_contents() {
        let cpu = CpuBackend::new();
        let staging = BufferView::from_slice(&[1u16, 2, 3], vec![3]);
        let bytes = cpu.map_read(&staging).expect("map");
        assert_eq!(&*crate::texel::cast_texels::<u16>(&bytes), &[1, 2, 3]);
    }
}
