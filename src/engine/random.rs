//! Seeded pseudo-random input generation.
//!
//! Benchmarks draw their inputs from a **xorshift64\*** generator owned by the
//! caller. Given the same seed, every run produces the same matrices and the
//! same scalars, so a CPU/GPU mismatch can be reproduced exactly.
//!
//! # Non-goals
//!
//! - This generator is **not cryptographically secure**. MSM scalars drawn
//!   from it are test data, not keys.

/// Seed used when the caller passes zero (xorshift has an all-zero fixed point).
const FALLBACK_SEED: u64 = 0x9E37_79B9_7F4A_7C15;

/// Deterministic xorshift64\* generator.
///
/// ## Example
/// ```
/// use gpu_kernel_bench::engine::random::XorShift64;
///
/// let mut a = XorShift64::new(7);
/// let mut b = XorShift64::new(7);
/// assert_eq!(a.next_u64(), b.next_u64());
/// ```
#[derive(Clone, Debug)]
pub struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    /// Creates a generator from `seed`. A zero seed is replaced by a fixed
    /// non-zero constant.
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 { FALLBACK_SEED } else { seed };
        Self { state }
    }

    /// Derives an independent generator for stream `index`.
    ///
    /// Used to give each parallel worker its own reproducible stream.
    pub fn fork(&self, index: u64) -> Self {
        let mixed = splitmix64(self.state ^ splitmix64(index.wrapping_add(1)));
        Self::new(mixed)
    }

    /// Returns the next pseudo-random `u64`.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    /// Returns a value uniformly distributed in `[0, 1)`.
    #[inline]
    pub fn next_f32(&mut self) -> f32 {
        // Top 24 bits fill the f32 mantissa exactly.
        (self.next_u64() >> 40) as f32 * (1.0 / (1u32 << 24) as f32)
    }

    /// Fills `out` with pseudo-random bytes.
    pub fn fill_bytes(&mut self, out: &mut [u8]) {
        for chunk in out.chunks_mut(8) {
            let word = self.next_u64().to_le_bytes();
            chunk.copy_from_slice(&word[..chunk.len()]);
        }
    }

    /// Returns `len` values uniformly distributed in `[0, 1)`.
    pub fn f32_vec(&mut self, len: usize) -> Vec<f32> {
        (0..len).map(|_| self.next_f32()).collect()
    }
}

#[inline]
fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
