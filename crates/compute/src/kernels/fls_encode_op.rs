use super::common::{into_bytes, read_params, typed};
use crate::params::EncodeParams;
use crate::{noise, BufferView, ComputeError, Texel};

pub fn handle_fls_encode<T: Texel>(binds: &[BufferView]) -> Result<Vec<Vec<u8>>, ComputeError> {
    if binds.len() < 3 {
        return Err(ComputeError::ShapeMismatch(
            "FlsEncode kernel expects 3 buffers (histogram, output, params)",
        ));
    }
    let p: EncodeParams =
        read_params(&binds[2], "Params buffer for FlsEncode has incorrect size or shape")?;
    let len = p.width as usize * p.height as usize;
    let hist = typed::<f32>(&binds[0], len, "FlsEncode histogram does not match width x height")?;
    if binds[1].element_size_in_bytes != T::FORMAT.bytes_per_texel() || binds[1].element_count() != len {
        return Err(ComputeError::ShapeMismatch(
            "FlsEncode output does not match width x height in the requested format",
        ));
    }

    let width = p.width as usize;
    let out: Vec<T> = hist
        .iter()
        .enumerate()
        .map(|(i, &value)| {
            let noisy = noise::apply(
                value,
                p.noise_seed,
                (i % width) as u32,
                (i / width) as u32,
                p.noise_multiplicative,
                p.noise_additive,
            );
            T::encode(noisy)
        })
        .collect();
    Ok(into_bytes(&out))
}
