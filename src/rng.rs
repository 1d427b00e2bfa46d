//! Depth jitter for path meshes drawn with random-z on. Overlapping meshes
//! get slightly different depths so the depth test settles them the same
//! way every frame for a given seed.

/// Half-width of the jitter interval.
pub const MAX_JITTER: f32 = 0.125;

const GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

/// A SplitMix64 sequence of z offsets in `[-MAX_JITTER, MAX_JITTER)`.
#[derive(Debug, Clone)]
pub struct DepthJitter {
    state: u64,
}

impl DepthJitter {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn next_offset(&mut self) -> f32 {
        self.state = self.state.wrapping_add(GAMMA);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^= z >> 31;
        // top 24 bits fill an f32 mantissa exactly
        let unit = (z >> 40) as f32 / (1u32 << 24) as f32;
        (unit * 2.0 - 1.0) * MAX_JITTER
    }
}
