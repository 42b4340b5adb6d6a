use super::common::{bin_of, into_bytes, read_params, typed};
use crate::params::MsisAccumulateParams;
use crate::{BufferView, ComputeError, RangeIntensity};

/// Reduces one beam capture to a histogram with a row per vertical sample.
pub fn handle_msis_accumulate(binds: &[BufferView]) -> Result<Vec<Vec<u8>>, ComputeError> {
    if binds.len() < 3 {
        return Err(ComputeError::ShapeMismatch(
            "MsisAccumulate kernel expects 3 buffers (capture, histogram, params)",
        ));
    }
    let p: MsisAccumulateParams =
        read_params(&binds[2], "Params buffer for MsisAccumulate has incorrect size or shape")?;
    if p.samples_x == 0 || p.samples_y == 0 || p.n_bins == 0 {
        return Err(ComputeError::ShapeMismatch("MsisAccumulate requires non-zero sizes"));
    }
    let (sx, sy, bins) = (p.samples_x as usize, p.samples_y as usize, p.n_bins as usize);
    let capture = typed::<RangeIntensity>(
        &binds[0],
        sx * sy,
        "MsisAccumulate capture buffer does not match the beam raster",
    )?;
    if binds[1].element_size_in_bytes != std::mem::size_of::<f32>()
        || binds[1].element_count() != sy * bins
    {
        return Err(ComputeError::ShapeMismatch(
            "MsisAccumulate histogram must be samples_y x n_bins f32",
        ));
    }

    let bin_width = (p.range_max - p.range_min) / p.n_bins as f32;
    let norm = 1.0 / sx as f32;
    let mut hist = vec![0f32; sy * bins];
    for (y, row) in capture.chunks_exact(sx).enumerate() {
        for texel in row.iter().filter(|t| t.intensity > 0.0) {
            if let Some(bin) = bin_of(texel.range, p.range_min, bin_width, p.n_bins) {
                hist[y * bins + bin] += texel.intensity * norm;
            }
        }
    }
    Ok(into_bytes(&hist))
}

#[cfg(test)]
mod tests {
    use crate::params::MsisAccumulateParams;
    use crate::texel::cast_texels;
    use crate::{BufferView, ComputeBackend, CpuBackend, Kernel, RangeIntensity};

    #[test]
    fn rows_are_averaged_across_the_beam() {
        let cpu = CpuBackend::new();
        let p = MsisAccumulateParams {
            samples_x: 4,
            samples_y: 2,
            n_bins: 5,
            range_min: 0.0,
            range_max: 10.0,
        };
        let mut capture = vec![RangeIntensity::NONE; 8];
        capture[0] = RangeIntensity::new(4.5, 1.0);
        capture[3] = RangeIntensity::new(5.0, 1.0);
        capture[6] = RangeIntensity::new(9.9, 0.8);
        let binds = [
            BufferView::from_slice(&capture, vec![2, 4]),
            BufferView::zeroed(vec![2, 5], 4),
            BufferView::uniform(&p),
        ];
        let out = cpu
            .dispatch(&Kernel::MsisAccumulate, &binds, [1, 1, 1])
            .expect("Dispatch for MsisAccumulate failed");
        let hist = cast_texels::<f32>(&out[0]);
        assert!((hist[2] - 0.5).abs() < 1e-6);
        assert!((hist[5 + 4] - 0.2).abs() < 1e-6);
        assert!((hist.iter().sum::<f32>() - 0.7).abs() < 1e-6);
    }
}
