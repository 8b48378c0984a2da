//! Read fulfillment: map a byte range of a virtual file onto generated blocks.

use crate::content::{BlockLayout, fill_block};
use crate::registry::FileSpec;

/// The part of a file range that falls inside one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSpan {
    pub block_index: u32,
    pub offset_in_block: usize,
    pub len: usize,
}

impl BlockSpan {
    /// True when the span covers its whole block.
    pub fn is_full(&self, layout: BlockLayout) -> bool {
        self.offset_in_block == 0 && self.len == layout.block_size()
    }
}

/// Iterator over the block spans of `[offset, offset + len)`.
#[derive(Debug, Clone)]
pub struct BlockSpans {
    layout: BlockLayout,
    offset: u64,
    remaining: usize,
}

impl Iterator for BlockSpans {
    type Item = BlockSpan;

    fn next(&mut self) -> Option<BlockSpan> {
        if self.remaining == 0 {
            return None;
        }
        let offset_in_block = self.layout.within_block_offset(self.offset);
        let take = self
            .remaining
            .min(self.layout.block_size() - offset_in_block);
        let span = BlockSpan {
            // callers clamp ranges to the layout's addressable size
            block_index: self.layout.block_index_of(self.offset) as u32,
            offset_in_block,
            len: take,
        };
        self.offset += take as u64;
        self.remaining -= take;
        Some(span)
    }
}

/// Split `[offset, offset + len)` into per-block spans.
pub fn block_spans(layout: BlockLayout, offset: u64, len: usize) -> BlockSpans {
    BlockSpans {
        layout,
        offset,
        remaining: len,
    }
}

/// Number of bytes a read of `len` bytes at `offset` returns.
///
/// Reads never fail: anything past the end of the file is cut off. Files larger than the
/// layout can index are cut at the layout's limit, which registration already enforces.
pub fn clamp_len(layout: BlockLayout, file: &FileSpec, offset: u64, len: usize) -> usize {
    let end = file.size().min(layout.max_file_size());
    if offset >= end {
        return 0;
    }
    let available = end - offset;
    if (len as u64) > available {
        available as usize
    } else {
        len
    }
}

/// Read `len` bytes at `offset` with the default block layout.
pub fn read(file: &FileSpec, offset: u64, len: usize) -> Vec<u8> {
    read_with(BlockLayout::default(), file, offset, len)
}

pub fn read_with(layout: BlockLayout, file: &FileSpec, offset: u64, len: usize) -> Vec<u8> {
    let len = clamp_len(layout, file, offset, len);
    let mut out = vec![0u8; len];
    let n = read_into_with(layout, file, offset, &mut out);
    debug_assert_eq!(n, len);
    out
}

/// Fill `buf` from `offset` with the default layout. Returns the bytes written.
pub fn read_into(file: &FileSpec, offset: u64, buf: &mut [u8]) -> usize {
    read_into_with(BlockLayout::default(), file, offset, buf)
}

/// Fill the front of `buf` with the file's bytes starting at `offset`.
///
/// Whole aligned blocks are generated straight into `buf`. Partial blocks at either end go
/// through one scratch block and only the requested slice is copied out. The return value is
/// the clamped length; bytes of `buf` beyond it are left untouched.
pub fn read_into_with(layout: BlockLayout, file: &FileSpec, offset: u64, buf: &mut [u8]) -> usize {
    let len = clamp_len(layout, file, offset, buf.len());
    if len == 0 {
        return 0;
    }

    let mut scratch: Option<Vec<u8>> = None;
    let mut cursor = 0usize;
    for span in block_spans(layout, offset, len) {
        let dst = &mut buf[cursor..cursor + span.len];
        if span.is_full(layout) {
            fill_block(span.block_index, file.seed(), dst);
        } else {
            let block = scratch.get_or_insert_with(|| vec![0u8; layout.block_size()]);
            fill_block(span.block_index, file.seed(), block);
            let start = span.offset_in_block;
            dst.copy_from_slice(&block[start..start + span.len]);
        }
        cursor += span.len;
    }
    len
}
