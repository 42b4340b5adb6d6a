use super::common::{into_bytes, read_params, typed};
use crate::params::MsisUpdateParams;
use crate::{noise, BufferView, ComputeError, Texel};

/// Collapses the beam histogram into one column of the rotation image.
///
/// Every other column keeps its previous contents.
pub fn handle_msis_update<T: Texel>(binds: &[BufferView]) -> Result<Vec<Vec<u8>>, ComputeError> {
    if binds.len() < 3 {
        return Err(ComputeError::ShapeMismatch(
            "MsisUpdate kernel expects 3 buffers (histogram, image, params)",
        ));
    }
    let p: MsisUpdateParams =
        read_params(&binds[2], "Params buffer for MsisUpdate has incorrect size or shape")?;
    if p.samples_y == 0 || p.column >= p.n_steps {
        return Err(ComputeError::ShapeMismatch(
            "MsisUpdate column must lie inside the rotation image",
        ));
    }
    let (sy, bins, steps) = (p.samples_y as usize, p.n_bins as usize, p.n_steps as usize);
    let hist = typed::<f32>(&binds[0], sy * bins, "MsisUpdate histogram must be samples_y x n_bins")?;
    let mut image = typed::<T>(&binds[1], bins * steps, "MsisUpdate image must be n_bins x n_steps")?
        .into_owned();

    let scale = p.gain / sy as f32;
    for bin in 0..bins {
        let sum: f32 = hist[bin..].iter().step_by(bins).sum();
        let value = noise::apply(
            sum * scale,
            p.noise_seed,
            p.column,
            bin as u32,
            p.noise_multiplicative,
            p.noise_additive,
        );
        image[bin * steps + p.column as usize] = T::encode(value);
    }
    Ok(into_bytes(&image))
}

#[cfg(test)]
mod tests {
    use crate::params::MsisUpdateParams;
    use crate::texel::cast_texels;
    use crate::{BufferView, ComputeBackend, CpuBackend, Kernel, SampleFormat};

    fn params(column: u32) -> MsisUpdateParams {
        MsisUpdateParams {
            samples_y: 2,
            n_bins: 3,
            n_steps: 4,
            column,
            noise_seed: 0,
            gain: 1.0,
            noise_multiplicative: 0.0,
            noise_additive: 0.0,
        }
    }

    #[test]
    fn writes_only_the_selected_column() {
        let cpu = CpuBackend::new();
        let hist = [0.2f32, 0.0, 1.0, 0.6, 0.0, 1.0];
        let image = vec![7u8; 12];
        let binds = [
            BufferView::from_slice(&hist, vec![2, 3]),
            BufferView::from_slice(&image, vec![3, 4]),
            BufferView::uniform(&params(1)),
        ];
        let out = cpu
            .dispatch(&Kernel::MsisUpdate(SampleFormat::U8), &binds, [1, 1, 1])
            .expect("Dispatch for MsisUpdate failed");
        let img = &out[0];
        // bin 0: (0.2 + 0.6) / 2 = 0.4
        assert_eq!(img[1], 102);
        assert_eq!(img[4 + 1], 0);
        assert_eq!(img[8 + 1], 255);
        for (i, v) in img.iter().enumerate() {
            if i % 4 != 1 {
                assert_eq!(*v, 7, "column {} of row {} was touched", i % 4, i / 4);
            }
        }
    }

    #[test]
    fn column_outside_the_image_is_rejected() {
        let cpu = CpuBackend::new();
        let binds = [
            BufferView::zeroed(vec![2, 3], 4),
            BufferView::zeroed(vec![3, 4], 4),
            BufferView::uniform(&params(4)),
        ];
        assert!(cpu
            .dispatch(&Kernel::MsisUpdate(SampleFormat::F32), &binds, [1, 1, 1])
            .is_err());
    }

    #[test]
    fn gain_is_applied_before_encoding() {
        let cpu = CpuBackend::new();
        let hist = [0.25f32, 0.0, 0.0, 0.25, 0.0, 0.0];
        let binds = [
            BufferView::from_slice(&hist, vec![2, 3]),
            BufferView::zeroed(vec![3, 4], 4),
            BufferView::uniform(&MsisUpdateParams { gain: 4.0, ..params(0) }),
        ];
        let out = cpu
            .dispatch(&Kernel::MsisUpdate(SampleFormat::F32), &binds, [1, 1, 1])
            .expect("Dispatch for MsisUpdate failed");
        let img = cast_texels::<f32>(&out[0]);
        assert!((img[0] - 1.0).abs() < 1e-6);
    }
}
