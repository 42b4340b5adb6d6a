//! Stateless per-texel noise.
//!
//! Kernels have no shared RNG state: every texel hashes its own coordinates
//! together with a per-tick seed, so a dispatch is deterministic for a given
//! seed regardless of evaluation order.

/// PCG output permutation over a 32-bit state.
#[must_use]
pub fn pcg_hash(input: u32) -> u32 {
    let state = input.wrapping_mul(747_796_405).wrapping_add(2_891_336_453);
    let word = ((state >> ((state >> 28) + 4)) ^ state).wrapping_mul(277_803_737);
    (word >> 22) ^ word
}

fn hash4(seed: u32, x: u32, y: u32, stream: u32) -> u32 {
    pcg_hash(seed ^ pcg_hash(x ^ pcg_hash(y ^ pcg_hash(stream))))
}

/// Uniform value in the open interval (0, 1].
#[must_use]
pub fn uniform(seed: u32, x: u32, y: u32, stream: u32) -> f32 {
    ((hash4(seed, x, y, stream) >> 8) as f32 + 1.0) / 16_777_216.0
}

/// Standard normal pair from Box-Muller.
#[must_use]
pub fn gaussian_pair(seed: u32, x: u32, y: u32) -> (f32, f32) {
    let u1 = uniform(seed, x, y, 0);
    let u2 = uniform(seed, x, y, 1);
    let radius = (-2.0 * u1.ln()).sqrt();
    let theta = std::f32::consts::TAU * u2;
    (radius * theta.cos(), radius * theta.sin())
}

/// Applies multiplicative and additive gaussian noise to an echo strength.
///
/// The result is clamped at zero; with both sigmas at zero the value is
/// returned untouched.
#[must_use]
pub fn apply(value: f32, seed: u32, x: u32, y: u32, multiplicative: f32, additive: f32) -> f32 {
    if multiplicative <= 0.0 && additive <= 0.0 {
        return value;
    }
    let (g1, g2) = gaussian_pair(seed, x, y);
    (value * (1.0 + multiplicative * g1) + additive * g2).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sigma_is_identity() {
        for value in [0.0f32, 0.3, 1.7] {
            assert!((apply(value, 42, 3, 9, 0.0, 0.0) - value).abs() < f32::EPSILON);
        }
    }

    #[test]
    fn noise_is_deterministic_per_seed() {
        let a = apply(0.5, 7, 10, 20, 0.1, 0.05);
        let b = apply(0.5, 7, 10, 20, 0.1, 0.05);
        let c = apply(0.5, 8, 10, 20, 0.1, 0.05);
        assert!((a - b).abs() < f32::EPSILON);
        assert!((a - c).abs() > 0.0);
    }

    #[test]
    fn uniform_stays_in_range() {
        for x in 0..256 {
            let u = uniform(1, x, x * 3, 0);
            assert!(u > 0.0 && u <= 1.0, "{u}");
        }
    }

    #[test]
    fn additive_noise_has_roughly_zero_mean() {
        let n = 4096u32;
        let mean: f32 = (0..n)
            .map(|i| apply(1.0, 99, i, 0, 0.0, 0.1) - 1.0)
            .sum::<f32>()
            / n as f32;
        assert!(mean.abs() < 0.01, "mean {mean}");
    }

    #[test]
    fn noisy_values_never_go_negative() {
        for i in 0..1024 {
            assert!(apply(0.01, 3, i, i, 2.0, 1.0) >= 0.0);
        }
    }
}
