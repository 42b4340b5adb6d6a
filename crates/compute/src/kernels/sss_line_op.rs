use super::common::{into_bytes, read_params, typed};
use crate::params::SssLineParams;
use crate::{noise, BufferView, ComputeError, Texel};
use std::f32::consts::PI;

/// Beam pattern weight of an across-track sample, peaking at the beam axis.
fn beam_weight(x: usize, samples: usize, vertical_fov: f32) -> f32 {
    let phi = ((x as f32 + 0.5) / samples as f32 - 0.5) * vertical_fov;
    (phi * PI / vertical_fov).cos()
}

/// Writes the newest line into row 0 of the waterfall image.
///
/// The port histogram is mirrored into the left half so that range grows
/// outwards from the centre column on both sides.
pub fn handle_sss_line<T: Texel>(binds: &[BufferView]) -> Result<Vec<Vec<u8>>, ComputeError> {
    if binds.len() < 3 {
        return Err(ComputeError::ShapeMismatch(
            "SssLine kernel expects 3 buffers (histogram, image, params)",
        ));
    }
    let p: SssLineParams =
        read_params(&binds[2], "Params buffer for SssLine has incorrect size or shape")?;
    if p.samples_x == 0 || p.height == 0 || p.width != 2 * p.half_bins || p.vertical_fov <= 0.0 {
        return Err(ComputeError::ShapeMismatch(
            "SssLine image width must be twice the half-swath bin count",
        ));
    }
    let (sx, half, width) = (p.samples_x as usize, p.half_bins as usize, p.width as usize);
    let hist = typed::<f32>(&binds[0], 2 * sx * half, "SssLine histogram must be 2 x samples_x x half_bins")?;
    let mut image = typed::<T>(&binds[1], width * p.height as usize, "SssLine image must be height x width")?
        .into_owned();

    let weights: Vec<f32> = (0..sx).map(|x| beam_weight(x, sx, p.vertical_fov)).collect();
    let weight_sum: f32 = weights.iter().sum();
    for view in 0..2 {
        let layer = &hist[view * sx * half..(view + 1) * sx * half];
        for bin in 0..half {
            let weighted: f32 = weights
                .iter()
                .enumerate()
                .map(|(x, w)| w * layer[x * half + bin])
                .sum();
            let column = if view == 0 { half - 1 - bin } else { half + bin };
            let value = noise::apply(
                p.gain * weighted / weight_sum,
                p.noise_seed,
                column as u32,
                0,
                p.noise_multiplicative,
                p.noise_additive,
            );
            image[column] = T::encode(value);
        }
    }
    Ok(into_bytes(&image))
}

#[cfg(test)]
mod tests {
    use super::beam_weight;
    use crate::params::SssLineParams;
    use crate::texel::cast_texels;
    use crate::{BufferView, ComputeBackend, CpuBackend, Kernel, SampleFormat};

    #[test]
    fn beam_weights_are_symmetric_and_positive() {
        let fov = 0.8;
        for x in 0..8 {
            let w = beam_weight(x, 8, fov);
            assert!(w > 0.0);
            assert!((w - beam_weight(7 - x, 8, fov)).abs() < 1e-6);
        }
        assert!(beam_weight(3, 8, fov) > beam_weight(0, 8, fov));
    }

    #[test]
    fn port_is_mirrored_and_lower_rows_survive() {
        let cpu = CpuBackend::new();
        let (sx, half) = (2usize, 3usize);
        let mut hist = vec![0f32; 2 * sx * half];
        // port bin 0 and starboard bin 2, equal across samples
        for x in 0..sx {
            hist[x * half] = 0.5;
            hist[(sx + x) * half + 2] = 1.0;
        }
        let image = vec![0.3f32; 6 * 2];
        let p = SssLineParams {
            samples_x: sx as u32,
            half_bins: half as u32,
            width: 6,
            height: 2,
            noise_seed: 0,
            gain: 1.0,
            vertical_fov: 0.5,
            noise_multiplicative: 0.0,
            noise_additive: 0.0,
        };
        let binds = [
            BufferView::from_slice(&hist, vec![2, sx, half]),
            BufferView::from_slice(&image, vec![2, 6]),
            BufferView::uniform(&p),
        ];
        let out = cpu
            .dispatch(&Kernel::SssLine(SampleFormat::F32), &binds, [1, 1, 1])
            .expect("Dispatch for SssLine failed");
        let img = cast_texels::<f32>(&out[0]);
        let expected = [0.0, 0.0, 0.5, 0.0, 0.0, 1.0];
        for (got, want) in img[..6].iter().zip(expected) {
            assert!((got - want).abs() < 1e-5, "{:?}", &img[..6]);
        }
        assert!(img[6..].iter().all(|v| (v - 0.3).abs() < 1e-6));
    }
}
