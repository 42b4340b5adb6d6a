use super::common::{bin_of, into_bytes, read_params, typed};
use crate::params::SssAccumulateParams;
use crate::{BufferView, ComputeError, RangeIntensity};

/// Builds one histogram per side view, indexed by across-track sample and
/// half-swath bin. Along-track samples are averaged.
pub fn handle_sss_accumulate(binds: &[BufferView]) -> Result<Vec<Vec<u8>>, ComputeError> {
    if binds.len() < 3 {
        return Err(ComputeError::ShapeMismatch(
            "SssAccumulate kernel expects 3 buffers (capture, histogram, params)",
        ));
    }
    let p: SssAccumulateParams =
        read_params(&binds[2], "Params buffer for SssAccumulate has incorrect size or shape")?;
    if p.samples_x == 0 || p.samples_y == 0 || p.half_bins == 0 {
        return Err(ComputeError::ShapeMismatch("SssAccumulate requires non-zero sizes"));
    }
    let (sx, sy, half) = (p.samples_x as usize, p.samples_y as usize, p.half_bins as usize);
    let capture = typed::<RangeIntensity>(
        &binds[0],
        2 * sy * sx,
        "SssAccumulate capture must hold two layers of samples_y x samples_x",
    )?;
    if binds[1].element_size_in_bytes != std::mem::size_of::<f32>()
        || binds[1].element_count() != 2 * sx * half
    {
        return Err(ComputeError::ShapeMismatch(
            "SssAccumulate histogram must be 2 x samples_x x half_bins f32",
        ));
    }

    let bin_width = (p.range_max - p.range_min) / p.half_bins as f32;
    let norm = 1.0 / sy as f32;
    let mut hist = vec![0f32; 2 * sx * half];
    for (layer, view) in capture.chunks_exact(sx * sy).enumerate() {
        for row in view.chunks_exact(sx) {
            for (x, texel) in row.iter().enumerate() {
                if texel.intensity <= 0.0 {
                    continue;
                }
                if let Some(bin) = bin_of(texel.range, p.range_min, bin_width, p.half_bins) {
                    hist[(layer * sx + x) * half + bin] += texel.intensity * norm;
                }
            }
        }
    }
    Ok(into_bytes(&hist))
}

#[cfg(test)]
mod tests {
    use crate::params::SssAccumulateParams;
    use crate::texel::cast_texels;
    use crate::{BufferView, ComputeBackend, CpuBackend, Kernel, RangeIntensity};

    #[test]
    fn layers_are_kept_apart() {
        let cpu = CpuBackend::new();
        let p = SssAccumulateParams {
            samples_x: 2,
            samples_y: 2,
            half_bins: 4,
            range_min: 2.0,
            range_max: 10.0,
        };
        let mut capture = vec![RangeIntensity::NONE; 8];
        // port, row 1, x 0 at bin 1
        capture[2] = RangeIntensity::new(5.0, 1.0);
        // starboard, row 0, x 1 at bin 3
        capture[4 + 1] = RangeIntensity::new(9.0, 0.5);
        let binds = [
            BufferView::from_slice(&capture, vec![2, 2, 2]),
            BufferView::zeroed(vec![2, 2, 4], 4),
            BufferView::uniform(&p),
        ];
        let out = cpu
            .dispatch(&Kernel::SssAccumulate, &binds, [1, 1, 1])
            .expect("Dispatch for SssAccumulate failed");
        let hist = cast_texels::<f32>(&out[0]);
        assert!((hist[1] - 0.5).abs() < 1e-6);
        assert!((hist[(2 + 1) * 4 + 3] - 0.25).abs() < 1e-6);
        assert!((hist.iter().sum::<f32>() - 0.75).abs() < 1e-6);
    }
}
