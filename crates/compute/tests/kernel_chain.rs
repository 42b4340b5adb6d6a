// Chains kernels the way the sonar pipelines do and checks the hand-off
// between stages.

use compute::params::{
    DisplayVertex, EncodeParams, FlsAccumulateParams, ShiftParams, SssLineParams, VisualizeParams,
};
use compute::texel::cast_texels;
use compute::{BufferView, ColorMap, ComputeBackend, CpuBackend, Kernel, RangeIntensity, SampleFormat};

fn dispatch_one(cpu: &CpuBackend, kernel: Kernel, binds: &[BufferView]) -> Vec<u8> {
    let mut out = cpu
        .dispatch(&kernel, binds, [1, 1, 1])
        .unwrap_or_else(|e| panic!("{kernel:?} failed: {e}"));
    assert_eq!(out.len(), 1, "{kernel:?} should write a single buffer");
    out.remove(0)
}

#[test]
fn fls_histogram_encodes_and_renders() {
    let cpu = CpuBackend::new();
    let (beams, bins, samples) = (4usize, 8usize, 2usize);
    let mut capture = vec![RangeIntensity::NONE; beams * samples];
    for row in 0..samples {
        capture[row * beams + 1] = RangeIntensity::new(4.5, 1.0);
    }
    let hist = dispatch_one(
        &cpu,
        Kernel::FlsAccumulate,
        &[
            BufferView::from_slice(&capture, vec![1, samples, beams]),
            BufferView::zeroed(vec![bins, beams], 4),
            BufferView::uniform(&FlsAccumulateParams {
                n_views: 1,
                beams_first: beams as u32,
                beams_total: beams as u32,
                view_beams: beams as u32,
                beam_samples: samples as u32,
                n_bins: bins as u32,
                range_min: 1.0,
                range_max: 9.0,
                gain: 1.0,
            }),
        ],
    );

    let encoded = dispatch_one(
        &cpu,
        Kernel::FlsEncode(SampleFormat::U16),
        &[
            BufferView::new(hist.into(), vec![bins, beams], 4),
            BufferView::zeroed(vec![bins, beams], 2),
            BufferView::uniform(&EncodeParams {
                width: beams as u32,
                height: bins as u32,
                ..EncodeParams::default()
            }),
        ],
    );
    let texels = cast_texels::<u16>(&encoded);
    assert_eq!(texels.len(), beams * bins);
    // range 4.5 in a 1..9 window of 8 bins is bin 3
    assert_eq!(texels[3 * beams + 1], u16::MAX);
    assert_eq!(texels.iter().filter(|t| **t > 0).count(), 1);

    let quad = [
        DisplayVertex::new(-1.0, 1.0, 0.0, 0.0),
        DisplayVertex::new(-1.0, -1.0, 0.0, 1.0),
        DisplayVertex::new(1.0, 1.0, 1.0, 0.0),
        DisplayVertex::new(1.0, -1.0, 1.0, 1.0),
    ];
    let display = dispatch_one(
        &cpu,
        Kernel::Visualize(SampleFormat::U16),
        &[
            BufferView::new(encoded.into(), vec![bins, beams], 2),
            BufferView::from_slice(&quad, vec![quad.len()]),
            BufferView::zeroed(vec![bins, beams], 3),
            BufferView::uniform(&VisualizeParams {
                image_width: beams as u32,
                image_height: bins as u32,
                display_width: beams as u32,
                display_height: bins as u32,
                vertex_count: quad.len() as u32,
                color_map: ColorMap::Jet.index(),
            }),
        ],
    );
    let at = (3 * beams + 1) * 3;
    assert_eq!(&display[at..at + 3], &ColorMap::Jet.rgb(1.0));
    assert_eq!(&display[0..3], &ColorMap::Jet.rgb(0.0));
}

#[test]
fn waterfall_ping_pong_keeps_history() {
    let cpu = CpuBackend::new();
    let (half, lines) = (2usize, 3usize);
    let width = 2 * half;
    let line_params = SssLineParams {
        samples_x: 1,
        half_bins: half as u32,
        width: width as u32,
        height: lines as u32,
        noise_seed: 0,
        gain: 1.0,
        vertical_fov: 0.5,
        noise_multiplicative: 0.0,
        noise_additive: 0.0,
    };
    let shift_params = ShiftParams { width: width as u32, height: lines as u32 };
    let mut slots = [
        BufferView::zeroed(vec![lines, width], 1),
        BufferView::zeroed(vec![lines, width], 1),
    ];
    let mut parity = 0usize;

    for tick in 0..2u8 {
        let strength = f32::from(tick + 1) * 0.25;
        let hist = vec![strength; 2 * half];
        let shifted = dispatch_one(
            &cpu,
            Kernel::SssShift(SampleFormat::U8),
            &[
                slots[parity].clone(),
                slots[1 - parity].clone(),
                BufferView::uniform(&shift_params),
            ],
        );
        let written = dispatch_one(
            &cpu,
            Kernel::SssLine(SampleFormat::U8),
            &[
                BufferView::from_slice(&hist, vec![2, 1, half]),
                BufferView::new(shifted.into(), vec![lines, width], 1),
                BufferView::uniform(&line_params),
            ],
        );
        slots[1 - parity] = BufferView::new(written.into(), vec![lines, width], 1);
        parity = 1 - parity;
    }

    // two ticks: newest slot is back at index 0
    assert_eq!(parity, 0);
    let newest = &slots[parity].data;
    assert!(newest[..width].iter().all(|v| *v == 128));
    assert!(newest[width..2 * width].iter().all(|v| *v == 64));
    assert!(newest[2 * width..].iter().all(|v| *v == 0));
}
