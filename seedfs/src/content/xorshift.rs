//! Four-word xorshift generator that expands a mixed seed into block content.

/// Fixed state words that accompany the mixed seed.
const Y0: u32 = 362_436_069;
const Z0: u32 = 521_288_629;
const W0: u32 = 88_675_123;

/// xorshift128 stream. Purely arithmetic; the same seed always yields the same words.
#[derive(Clone, Debug)]
pub struct Xorshift128 {
    x: u32,
    y: u32,
    z: u32,
    w: u32,
}

impl Xorshift128 {
    pub const fn new(seed: u32) -> Self {
        Self {
            x: seed,
            y: Y0,
            z: Z0,
            w: W0,
        }
    }

    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        let t = self.x ^ (self.x << 11);
        self.x = self.y;
        self.y = self.z;
        self.z = self.w;
        self.w = self.w ^ (self.w >> 19) ^ (t ^ (t >> 8));
        self.w
    }

    /// Fill `buf` with the stream, one little-endian word at a time.
    ///
    /// A trailing piece shorter than a word receives the leading bytes of the next word, so a
    /// shorter buffer is always a prefix of a longer one.
    pub fn fill_bytes(&mut self, buf: &mut [u8]) {
        let mut words = buf.chunks_exact_mut(4);
        for word in &mut words {
            word.copy_from_slice(&self.next_u32().to_le_bytes());
        }
        let tail = words.into_remainder();
        if !tail.is_empty() {
            let last = self.next_u32().to_le_bytes();
            tail.copy_from_slice(&last[..tail.len()]);
        }
    }
}

impl Iterator for Xorshift128 {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        Some(self.next_u32())
    }
}
