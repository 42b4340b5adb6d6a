/// Palette used by the visualization kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ColorMap {
    Hot,
    Jet,
    Perula,
    #[default]
    GreenBlue,
    OrangeCopper,
    ColdBlue,
}

type Stop = (f32, [f32; 3]);

const HOT: &[Stop] = &[
    (0.0, [0.0, 0.0, 0.0]),
    (0.375, [1.0, 0.0, 0.0]),
    (0.75, [1.0, 1.0, 0.0]),
    (1.0, [1.0, 1.0, 1.0]),
];

const JET: &[Stop] = &[
    (0.0, [0.0, 0.0, 0.5]),
    (0.125, [0.0, 0.0, 1.0]),
    (0.375, [0.0, 1.0, 1.0]),
    (0.625, [1.0, 1.0, 0.0]),
    (0.875, [1.0, 0.0, 0.0]),
    (1.0, [0.5, 0.0, 0.0]),
];

const PERULA: &[Stop] = &[
    (0.0, [0.208, 0.166, 0.529]),
    (0.25, [0.013, 0.423, 0.879]),
    (0.5, [0.078, 0.660, 0.718]),
    (0.75, [0.681, 0.749, 0.397]),
    (1.0, [0.976, 0.984, 0.055]),
];

const GREEN_BLUE: &[Stop] = &[
    (0.0, [0.0, 0.0, 0.0]),
    (0.3, [0.0, 0.15, 0.45]),
    (0.7, [0.0, 0.65, 0.55]),
    (1.0, [0.75, 1.0, 0.6]),
];

const ORANGE_COPPER: &[Stop] = &[
    (0.0, [0.0, 0.0, 0.0]),
    (0.4, [0.5, 0.25, 0.1]),
    (0.8, [1.0, 0.6, 0.25]),
    (1.0, [1.0, 0.85, 0.6]),
];

const COLD_BLUE: &[Stop] = &[
    (0.0, [0.0, 0.0, 0.0]),
    (0.5, [0.1, 0.3, 0.7]),
    (1.0, [0.85, 0.95, 1.0]),
];

impl ColorMap {
    pub const ALL: [ColorMap; 6] = [
        ColorMap::Hot,
        ColorMap::Jet,
        ColorMap::Perula,
        ColorMap::GreenBlue,
        ColorMap::OrangeCopper,
        ColorMap::ColdBlue,
    ];

    /// Index as stored in kernel parameter blocks.
    #[must_use]
    pub const fn index(self) -> u32 {
        match self {
            ColorMap::Hot => 0,
            ColorMap::Jet => 1,
            ColorMap::Perula => 2,
            ColorMap::GreenBlue => 3,
            ColorMap::OrangeCopper => 4,
            ColorMap::ColdBlue => 5,
        }
    }

    /// Unknown indices fall back to the default palette.
    #[must_use]
    pub const fn from_index(index: u32) -> Self {
        match index {
            0 => ColorMap::Hot,
            1 => ColorMap::Jet,
            2 => ColorMap::Perula,
            4 => ColorMap::OrangeCopper,
            5 => ColorMap::ColdBlue,
            _ => ColorMap::GreenBlue,
        }
    }

    fn stops(self) -> &'static [Stop] {
        match self {
            ColorMap::Hot => HOT,
            ColorMap::Jet => JET,
            ColorMap::Perula => PERULA,
            ColorMap::GreenBlue => GREEN_BLUE,
            ColorMap::OrangeCopper => ORANGE_COPPER,
            ColorMap::ColdBlue => COLD_BLUE,
        }
    }

    /// Maps a normalised strength to RGB8. Input is clamped to `[0, 1]`.
    #[must_use]
    pub fn rgb(self, t: f32) -> [u8; 3] {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let stops = self.stops();
        let mut color = stops[stops.len() - 1].1;
        for pair in stops.windows(2) {
            let (t0, c0) = pair[0];
            let (t1, c1) = pair[1];
            if t <= t1 {
                let f = if t1 > t0 { (t - t0) / (t1 - t0) } else { 0.0 };
                color = [
                    c0[0] + (c1[0] - c0[0]) * f,
                    c0[1] + (c1[1] - c0[1]) * f,
                    c0[2] + (c1[2] - c0[2]) * f,
                ];
                break;
            }
        }
        color.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
    }
}
