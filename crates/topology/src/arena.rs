//! Bump arena for data whose lifetime is one operator invocation.
//!
//! Memory is handed out from fixed-size chunks and only released all at once
//! by [`Arena::free_all`]. There is no per-allocation free. Allocations return
//! small handles instead of references so the arena can live next to the
//! handles that point into it (the operator slot array) without borrowing
//! itself.
//!
//! Chunks are backed by `u64` words so every allocation starts 8-byte aligned;
//! typed views are produced with `bytemuck`, which checks size and alignment.

use std::marker::PhantomData;
use std::mem::{align_of, size_of};

use bytemuck::Pod;
use tracing::trace;

const WORD: usize = size_of::<u64>();

/// Handle to a zeroed byte block inside an [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaBlock {
    generation: u32,
    chunk: u32,
    /// Offset in words from the chunk start
    offset: usize,
    bytes: usize,
}

impl ArenaBlock {
    /// Size of the block in bytes
    pub fn len(&self) -> usize {
        self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.bytes == 0
    }
}

/// Handle to a typed, zero-initialized slice inside an [`Arena`].
#[derive(Debug, PartialEq, Eq)]
pub struct ArenaSlice<T> {
    block: ArenaBlock,
    len: usize,
    _marker: PhantomData<T>,
}

impl<T> Clone for ArenaSlice<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ArenaSlice<T> {}

impl<T> ArenaSlice<T> {
    /// Number of elements
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Chunked bump allocator.
///
/// Used by exactly one thread for its whole lifetime.
#[derive(Debug)]
pub struct Arena {
    chunk_words: usize,
    chunks: Vec<Vec<u64>>,
    /// Words used in the last chunk
    cursor: usize,
    allocated: usize,
    generation: u32,
}

impl Arena {
    /// Create an arena handing out memory in chunks of `chunk_size` bytes.
    ///
    /// No memory is reserved until the first allocation.
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_words: chunk_size.div_ceil(WORD).max(1),
            chunks: Vec::new(),
            cursor: 0,
            allocated: 0,
            generation: 0,
        }
    }

    /// Allocate `size` zeroed bytes.
    ///
    /// Requests larger than the chunk size get a dedicated chunk. Running out of
    /// backing memory aborts through the global allocator's error handler.
    pub fn alloc(&mut self, size: usize) -> ArenaBlock {
        let words = size.div_ceil(WORD);
        let fits = self
            .chunks
            .last()
            .is_some_and(|chunk| chunk.len() - self.cursor >= words);

        if !fits {
            let chunk_len = self.chunk_words.max(words);
            trace!("arena: new chunk of {} bytes", chunk_len * WORD);
            self.chunks.push(vec![0u64; chunk_len]);
            self.cursor = 0;
        }

        let block = ArenaBlock {
            generation: self.generation,
            chunk: (self.chunks.len() - 1) as u32,
            offset: self.cursor,
            bytes: size,
        };
        self.cursor += words;
        self.allocated += size;
        block
    }

    /// Allocate a zeroed slice of `len` elements of `T`.
    ///
    /// # Panics
    /// When the byte size of the slice does not fit in `usize`.
    pub fn alloc_slice<T: Pod>(&mut self, len: usize) -> ArenaSlice<T> {
        assert!(
            align_of::<T>() <= WORD,
            "arena: alignment of {} exceeds 8 bytes",
            std::any::type_name::<T>()
        );
        let Some(size) = len.checked_mul(size_of::<T>()) else {
            panic!(
                "arena: allocation of {} x {} overflows usize",
                len,
                std::any::type_name::<T>()
            );
        };
        let block = self.alloc(size);
        ArenaSlice {
            block,
            len,
            _marker: PhantomData,
        }
    }

    /// Copy `values` into a fresh arena slice.
    pub fn alloc_copy<T: Pod>(&mut self, values: &[T]) -> ArenaSlice<T> {
        let slice = self.alloc_slice::<T>(values.len());
        self.slice_mut(&slice).copy_from_slice(values);
        slice
    }

    /// Bytes of a block.
    pub fn bytes(&self, block: &ArenaBlock) -> &[u8] {
        let words = self.words(block);
        &bytemuck::cast_slice::<u64, u8>(words)[..block.bytes]
    }

    /// Mutable bytes of a block.
    pub fn bytes_mut(&mut self, block: &ArenaBlock) -> &mut [u8] {
        let words = self.words_mut(block);
        &mut bytemuck::cast_slice_mut::<u64, u8>(words)[..block.bytes]
    }

    /// Typed view of a slice.
    pub fn slice<T: Pod>(&self, slice: &ArenaSlice<T>) -> &[T] {
        bytemuck::cast_slice(self.bytes(&slice.block))
    }

    /// Mutable typed view of a slice.
    pub fn slice_mut<T: Pod>(&mut self, slice: &ArenaSlice<T>) -> &mut [T] {
        bytemuck::cast_slice_mut(self.bytes_mut(&slice.block))
    }

    /// Release every chunk. All outstanding handles become invalid.
    pub fn free_all(&mut self) {
        trace!(
            "arena: free_all ({} chunks, {} bytes)",
            self.chunks.len(),
            self.allocated
        );
        self.chunks = Vec::new();
        self.cursor = 0;
        self.allocated = 0;
        self.generation = self.generation.wrapping_add(1);
    }

    /// Bytes handed out since creation or the last `free_all`
    pub fn allocated_bytes(&self) -> usize {
        self.allocated
    }

    /// Number of live chunks
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    fn check(&self, block: &ArenaBlock) {
        if block.generation != self.generation {
            panic!("arena: block used after free_all");
        }
    }

    fn words(&self, block: &ArenaBlock) -> &[u64] {
        self.check(block);
        let words = block.bytes.div_ceil(WORD);
        &self.chunks[block.chunk as usize][block.offset..block.offset + words]
    }

    fn words_mut(&mut self, block: &ArenaBlock) -> &mut [u64] {
        self.check(block);
        let words = block.bytes.div_ceil(WORD);
        &mut self.chunks[block.chunk as usize][block.offset..block.offset + words]
    }
}
