//! CRC-style seed mixing.
//!
//! The global seed, the file seed and the block index form a 96-bit dividend that is divided
//! bit by bit by the CRC-32 polynomial. The remainder is the starting word of the block's
//! generator, so flipping a single input bit changes the whole block.

/// Constant shared by every file, the first word of the dividend.
pub const GLOBAL_SEED: u32 = 123_456_789;

const POLYNOMIAL: u32 = 0x04C1_1DB7;
const MSB_MASK: u32 = 0x8000_0000;

/// Mix the three words into one 32-bit value.
///
/// `input` holds the high 32 bits of the running dividend and `input_next` the bits still to
/// be shifted in. `input_next` starts as `file_seed` and is replaced by `block_index` once the
/// first 32 bits have been consumed. The refill point is part of the content format: moving
/// it changes every generated byte.
pub const fn mix_seed(global_seed: u32, file_seed: u32, block_index: u32) -> u32 {
    let divisor = MSB_MASK | (POLYNOMIAL >> 1);
    let divisor_next = (POLYNOMIAL & 0x01) << 31;

    let mut input = global_seed;
    let mut input_next = file_seed;
    let mut i = 0;
    while i < 3 * u32::BITS {
        if i == u32::BITS {
            input_next = block_index;
        }
        if input & MSB_MASK != 0 {
            input ^= divisor;
            input_next ^= divisor_next;
        }
        input <<= 1;
        if input_next & MSB_MASK != 0 {
            input |= 0x01;
        }
        input_next <<= 1;
        i += 1;
    }
    input
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vectors() {
        assert_eq!(mix_seed(GLOBAL_SEED, 1, 0), 0xD1C8_7C74);
        assert_eq!(mix_seed(GLOBAL_SEED, 1, 1), 0xD509_61C3);
        assert_eq!(mix_seed(GLOBAL_SEED, 2, 0), 0x0ADF_D4E3);
        assert_eq!(mix_seed(GLOBAL_SEED, u32::MAX, u32::MAX), 0x36C5_7DDB);
    }

    #[test]
    fn test_single_bit_changes_spread() {
        let base = mix_seed(GLOBAL_SEED, 1, 0);
        for bit in 0..32 {
            let flipped = mix_seed(GLOBAL_SEED, 1, 1 << bit);
            // a lone differing bit would mean the block index barely reached the remainder
            assert!((base ^ flipped).count_ones() > 1, "bit {bit}");
        }
    }

    #[test]
    fn test_usable_in_const_context() {
        const MIXED: u32 = mix_seed(GLOBAL_SEED, 1, 0);
        assert_eq!(MIXED, 0xD1C8_7C74);
    }
}
