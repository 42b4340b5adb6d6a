// Binding order: inputs, output, params. Kernels that update an image in
// place bind its current contents as the output slot.
pub const STORAGE_IN: u32 = 0;
pub const STORAGE_OUT: u32 = 1;
pub const UNIFORM_PARAMS: u32 = 2;

// Visualize reads the image and the display mesh.
pub const VISUALIZE_MESH: u32 = 1;
pub const VISUALIZE_OUT: u32 = 2;
pub const VISUALIZE_PARAMS: u32 = 3;

const _: () = assert!(UNIFORM_PARAMS == STORAGE_OUT + 1);
const _: () = assert!(VISUALIZE_PARAMS == VISUALIZE_OUT + 1);

// Workgroup geometry shared by every backend. Tiled kernels run one
// invocation per output cell, linear kernels one per packed 32-bit word.
pub const TILE: u32 = 16;
pub const LINEAR: u32 = 64;
const MAX_GROUPS_PER_DIM: u32 = 65_535;

/// Workgroups covering a `width` x `height` grid of cells.
#[must_use]
pub const fn tiled(width: u32, height: u32) -> [u32; 3] {
    [width.div_ceil(TILE), height.div_ceil(TILE), 1]
}

/// Workgroups covering `invocations` linear invocations. Counts above the
/// per-dimension limit spill into `y`; kernels rebuild the index from
/// `num_workgroups`.
#[must_use]
pub const fn linear(invocations: u32) -> [u32; 3] {
    let groups = invocations.div_ceil(LINEAR);
    if groups <= MAX_GROUPS_PER_DIM {
        [groups, 1, 1]
    } else {
        [MAX_GROUPS_PER_DIM, groups.div_ceil(MAX_GROUPS_PER_DIM), 1]
    }
}

/// Number of 32-bit words holding `texels` texels of `format`.
#[must_use]
pub const fn packed_words(texels: u32, format: crate::SampleFormat) -> u32 {
    (texels * format.bytes_per_texel() as u32).div_ceil(4)
}

/// Return expected number of bindings for each kernel.
#[must_use]
pub const fn binding_count(kernel: &crate::Kernel) -> u32 {
    match kernel {
        crate::Kernel::Visualize(_) => VISUALIZE_PARAMS + 1,
        crate::Kernel::FlsAccumulate
        | crate::Kernel::MsisAccumulate
        | crate::Kernel::SssAccumulate
        | crate::Kernel::FlsEncode(_)
        | crate::Kernel::MsisUpdate(_)
        | crate::Kernel::SssShift(_)
        | crate::Kernel::SssLine(_) => UNIFORM_PARAMS + 1,
    }
}

/// Slot the kernel writes; always the one before the params block.
#[must_use]
pub const fn output_binding(kernel: &crate::Kernel) -> u32 {
    match kernel {
        crate::Kernel::Visualize(_) => VISUALIZE_OUT,
        _ => STORAGE_OUT,
    }
}
