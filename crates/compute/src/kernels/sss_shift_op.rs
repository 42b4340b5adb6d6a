use super::common::{into_bytes, read_params, typed};
use crate::params::ShiftParams;
use crate::{BufferView, ComputeError, Texel};

/// Copies the waterfall one line down into the other ping-pong slot.
/// Row 0 is cleared for the line kernel.
pub fn handle_sss_shift<T: Texel>(binds: &[BufferView]) -> Result<Vec<Vec<u8>>, ComputeError> {
    if binds.len() < 3 {
        return Err(ComputeError::ShapeMismatch(
            "SssShift kernel expects 3 buffers (source, destination, params)",
        ));
    }
    let p: ShiftParams =
        read_params(&binds[2], "Params buffer for SssShift has incorrect size or shape")?;
    let (width, height) = (p.width as usize, p.height as usize);
    let src = typed::<T>(&binds[0], width * height, "SssShift source must be height x width")?;
    if binds[1].element_size_in_bytes != T::FORMAT.bytes_per_texel()
        || binds[1].element_count() != width * height
    {
        return Err(ComputeError::ShapeMismatch(
            "SssShift destination must match the source image",
        ));
    }

    let mut dst = vec![T::default(); width * height];
    if height > 1 {
        dst[width..].copy_from_slice(&src[..width * (height - 1)]);
    }
    Ok(into_bytes(&dst))
}
