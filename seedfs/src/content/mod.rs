//! Content engine
//!
//! Every virtual file is a sequence of fixed-size blocks. A block is a pure function of the
//! file seed and its index:
//! - `mix`: folds (global seed, file seed, block index) into a single 32-bit word.
//! - `xorshift`: expands that word into the block's bytes.
//!
//! Nothing here allocates except [`generate_block`], and nothing keeps state between calls,
//! so blocks can be produced from any number of threads at once.
mod mix;
mod xorshift;

use std::ops::Deref;

pub use mix::{GLOBAL_SEED, mix_seed};
pub use xorshift::Xorshift128;

pub const DEFAULT_BLOCK_SHIFT: u32 = 16;
pub const DEFAULT_BLOCK_SIZE: usize = 1 << DEFAULT_BLOCK_SHIFT;

/// Smallest layout still holding one generator word per block.
pub const MIN_BLOCK_SHIFT: u32 = 2;
pub const MAX_BLOCK_SHIFT: u32 = 24;

/// Block geometry: the block size is `1 << block_shift`.
///
/// Content does not depend on the layout beyond truncation: block `i` of a small layout is the
/// prefix of block `i` of the default one. Small layouts exist to put block boundaries a few
/// bytes apart in tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockLayout {
    block_shift: u32,
}

impl Default for BlockLayout {
    fn default() -> Self {
        Self {
            block_shift: DEFAULT_BLOCK_SHIFT,
        }
    }
}

impl BlockLayout {
    pub fn with_shift(block_shift: u32) -> Option<Self> {
        (MIN_BLOCK_SHIFT..=MAX_BLOCK_SHIFT)
            .contains(&block_shift)
            .then_some(Self { block_shift })
    }

    pub fn block_shift(&self) -> u32 {
        self.block_shift
    }

    pub fn block_size(&self) -> usize {
        1 << self.block_shift
    }

    pub fn offset_mask(&self) -> u64 {
        (1u64 << self.block_shift) - 1
    }

    pub fn block_index_of(&self, offset: u64) -> u64 {
        offset >> self.block_shift
    }

    pub fn within_block_offset(&self, offset: u64) -> usize {
        (offset & self.offset_mask()) as usize
    }

    /// Largest file whose every block index fits in a `u32`.
    pub fn max_file_size(&self) -> u64 {
        (u64::from(u32::MAX) + 1) << self.block_shift
    }
}

/// One generated block. Owned so callers can hold it; the read path avoids it on full blocks.
#[derive(Clone, PartialEq, Eq)]
pub struct Block(Vec<u8>);

impl Block {
    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}

impl Deref for Block {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for Block {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Block").field("len", &self.0.len()).finish()
    }
}

/// Generate a default-sized block.
pub fn generate_block(block_index: u32, file_seed: u32) -> Block {
    generate_block_with(BlockLayout::default(), block_index, file_seed)
}

pub fn generate_block_with(layout: BlockLayout, block_index: u32, file_seed: u32) -> Block {
    let mut buf = vec![0u8; layout.block_size()];
    fill_block(block_index, file_seed, &mut buf);
    Block(buf)
}

/// Write the leading `buf.len()` bytes of block `block_index` straight into `buf`.
#[inline]
pub fn fill_block(block_index: u32, file_seed: u32, buf: &mut [u8]) {
    Xorshift128::new(mix_seed(GLOBAL_SEED, file_seed, block_index)).fill_bytes(buf);
}
