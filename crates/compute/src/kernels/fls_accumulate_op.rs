use super::common::{bin_of, into_bytes, read_params, typed};
use crate::params::FlsAccumulateParams;
use crate::{BufferView, ComputeError, RangeIntensity};

/// Sums echo intensity of every beam sample into `(bin, beam)` cells.
///
/// Output is row-major with one row per range bin and one column per beam,
/// normalised by the beam sample count and scaled by gain.
pub fn handle_fls_accumulate(binds: &[BufferView]) -> Result<Vec<Vec<u8>>, ComputeError> {
    if binds.len() < 3 {
        return Err(ComputeError::ShapeMismatch(
            "FlsAccumulate kernel expects 3 buffers (capture, histogram, params)",
        ));
    }
    let p: FlsAccumulateParams =
        read_params(&binds[2], "Params buffer for FlsAccumulate has incorrect size or shape")?;
    if p.n_views == 0 || p.beam_samples == 0 || p.n_bins == 0 {
        return Err(ComputeError::ShapeMismatch("FlsAccumulate requires non-zero sizes"));
    }
    let leading = p.beams_first * (p.n_views - 1);
    if leading >= p.beams_total
        || p.beams_first > p.view_beams
        || p.beams_total - leading > p.view_beams
    {
        return Err(ComputeError::ShapeMismatch(
            "FlsAccumulate beam partition does not fit the view raster",
        ));
    }

    let (n_views, samples, view_beams) =
        (p.n_views as usize, p.beam_samples as usize, p.view_beams as usize);
    let beams_total = p.beams_total as usize;
    let capture = typed::<RangeIntensity>(
        &binds[0],
        n_views * samples * view_beams,
        "FlsAccumulate capture buffer does not match the view raster",
    )?;
    if binds[1].element_size_in_bytes != std::mem::size_of::<f32>()
        || binds[1].element_count() != beams_total * p.n_bins as usize
    {
        return Err(ComputeError::ShapeMismatch(
            "FlsAccumulate histogram must be n_bins x beams_total f32",
        ));
    }

    let bin_width = (p.range_max - p.range_min) / p.n_bins as f32;
    let mut hist = vec![0f32; beams_total * p.n_bins as usize];
    for view in 0..n_views {
        let first_beam = view * p.beams_first as usize;
        let beams = if view + 1 == n_views {
            beams_total - first_beam
        } else {
            p.beams_first as usize
        };
        for row in 0..samples {
            let offset = (view * samples + row) * view_beams;
            for (col, texel) in capture[offset..offset + beams].iter().enumerate() {
                if texel.intensity <= 0.0 {
                    continue;
                }
                if let Some(bin) = bin_of(texel.range, p.range_min, bin_width, p.n_bins) {
                    hist[bin * beams_total + first_beam + col] += texel.intensity;
                }
            }
        }
    }

    let scale = p.gain / samples as f32;
    for value in &mut hist {
        *value *= scale;
    }
    Ok(into_bytes(&hist))
}
