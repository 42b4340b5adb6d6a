use crate::{BufferView, ComputeError, Kernel};

pub trait ComputeBackend: Send + Sync + 'static {
    /// Dispatches a compute kernel with the given bindings and workgroup configuration.
    ///
    /// # Arguments
    /// * `shader`: The kernel to dispatch.
    /// * `binds`: A slice of `BufferView`s for input and output, ordered as
    ///            described in [`crate::layout`]. The parameter block is always
    ///            the last binding.
    /// * `workgroups`: The number of workgroups to dispatch.
    ///
    /// # Returns
    ///
    /// Returns `Ok(Vec<Vec<u8>>)` where each inner `Vec<u8>` contains the byte data
    /// of a buffer written by the kernel. Every sonar kernel writes exactly one
    /// buffer, with the shape of its output binding.
    /// Returns `ComputeError::ShapeMismatch` if any input buffers are invalid.
    fn dispatch(
        &self,
        shader: &Kernel,
        binds: &[BufferView],
        workgroups: [u32; 3],
    ) -> Result<Vec<Vec<u8>>, ComputeError>;

    /// Starts copying `staging` to host-visible memory.
    ///
    /// Backends that map synchronously have nothing to schedule.
    fn begin_copy(&self, staging: &BufferView) -> Result<(), ComputeError> {
        let _ = staging;
        Ok(())
    }

    /// Maps a host-visible staging buffer that was filled by an earlier copy
    /// request and returns its contents.
    ///
    /// Backends whose copies complete asynchronously return
    /// `ComputeError::MapFailed` while the copy is still in flight.
    fn map_read(&self, staging: &BufferView) -> Result<Vec<u8>, ComputeError> {
        if staging.data.len() != staging.byte_len() {
            return Err(ComputeError::ShapeMismatch(
                "Staging buffer length does not match its shape",
            ));
        }
        Ok(staging.data.to_vec())
    }
}
