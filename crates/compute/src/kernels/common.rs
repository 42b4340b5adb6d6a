use crate::texel::cast_texels;
use crate::{BufferView, ComputeError};
use bytemuck::Pod;
use std::borrow::Cow;

pub(crate) fn read_params<P: Pod>(
    view: &BufferView,
    what: &'static str,
) -> Result<P, ComputeError> {
    if view.data.len() != std::mem::size_of::<P>() || view.shape != [1] {
        return Err(ComputeError::ShapeMismatch(what));
    }
    Ok(bytemuck::pod_read_unaligned(&view.data))
}

/// Views `view` as `len` elements of `T`, rejecting other element sizes.
pub(crate) fn typed<'a, T: Pod>(
    view: &'a BufferView,
    len: usize,
    what: &'static str,
) -> Result<Cow<'a, [T]>, ComputeError> {
    if view.element_size_in_bytes != std::mem::size_of::<T>() || view.element_count() != len {
        return Err(ComputeError::ShapeMismatch(what));
    }
    Ok(cast_texels(&view.data))
}

pub(crate) fn bin_of(range: f32, range_min: f32, bin_width: f32, n_bins: u32) -> Option<usize> {
    if range.is_nan() || range < range_min || bin_width <= 0.0 {
        return None;
    }
    let bin = ((range - range_min) / bin_width).floor() as usize;
    (bin < n_bins as usize).then_some(bin)
}

pub(crate) fn into_bytes<T: Pod>(values: &[T]) -> Vec<Vec<u8>> {
    vec![bytemuck::cast_slice(values).to_vec()]
}
