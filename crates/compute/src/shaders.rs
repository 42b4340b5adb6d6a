//! WGSL sources of the sonar kernels.
//!
//! Every kernel shares `common.wgsl`. Images are bound as packed `u32`
//! words, so the texel type is picked by a `FORMAT` constant prepended to
//! the source rather than by a separate shader per format.

use crate::{Kernel, SampleFormat};

const COMMON: &str = include_str!("../shaders/common.wgsl");

const FLS_ACCUMULATE: &str = include_str!("../shaders/fls_accumulate.wgsl");
const MSIS_ACCUMULATE: &str = include_str!("../shaders/msis_accumulate.wgsl");
const SSS_ACCUMULATE: &str = include_str!("../shaders/sss_accumulate.wgsl");
const FLS_ENCODE: &str = include_str!("../shaders/fls_encode.wgsl");
const MSIS_UPDATE: &str = include_str!("../shaders/msis_update.wgsl");
const SSS_SHIFT: &str = include_str!("../shaders/sss_shift.wgsl");
const SSS_LINE: &str = include_str!("../shaders/sss_line.wgsl");
const VISUALIZE: &str = include_str!("../shaders/visualize.wgsl");

/// Entry point of every kernel module.
pub const ENTRY_POINT: &str = "main";

fn body(kernel: &Kernel) -> &'static str {
    match kernel {
        Kernel::FlsAccumulate => FLS_ACCUMULATE,
        Kernel::MsisAccumulate => MSIS_ACCUMULATE,
        Kernel::SssAccumulate => SSS_ACCUMULATE,
        Kernel::FlsEncode(_) => FLS_ENCODE,
        Kernel::MsisUpdate(_) => MSIS_UPDATE,
        Kernel::SssShift(_) => SSS_SHIFT,
        Kernel::SssLine(_) => SSS_LINE,
        Kernel::Visualize(_) => VISUALIZE,
    }
}

/// Complete WGSL module for `kernel`.
#[must_use]
pub fn source(kernel: &Kernel) -> String {
    // Accumulation kernels never touch packed texels.
    let format = kernel.format().unwrap_or(SampleFormat::F32);
    format!(
        "const FORMAT: u32 = {}u;\n{COMMON}\n{}",
        format.index(),
        body(kernel)
    )
}

/// All kernel variants, one per format where the kernel carries one.
#[must_use]
pub fn all_kernels() -> Vec<Kernel> {
    let mut kernels = vec![
        Kernel::FlsAccumulate,
        Kernel::MsisAccumulate,
        Kernel::SssAccumulate,
    ];
    for format in SampleFormat::ALL {
        kernels.extend([
            Kernel::FlsEncode(format),
            Kernel::MsisUpdate(format),
            Kernel::SssShift(format),
            Kernel::SssLine(format),
            Kernel::Visualize(format),
        ]);
    }
    kernels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_constant_follows_kernel() {
        assert!(source(&Kernel::SssShift(SampleFormat::U16)).starts_with("const FORMAT: u32 = 1u;"));
        assert!(source(&Kernel::FlsAccumulate).starts_with("const FORMAT: u32 = 3u;"));
    }

    #[test]
    fn every_variant_is_listed_once() {
        let kernels = all_kernels();
        assert_eq!(kernels.len(), 3 + 5 * SampleFormat::ALL.len());
        let unique: std::collections::HashSet<_> = kernels.iter().collect();
        assert_eq!(unique.len(), kernels.len());
    }
}
