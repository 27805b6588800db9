/// Split `items` into contiguous batches of at most `size`, in order.
///
/// `size` must be greater than zero.
pub fn chunks<T>(items: &[T], size: usize) -> std::slice::Chunks<'_, T> {
    debug_assert!(size > 0, "chunk size must be positive");
    items.chunks(size)
}

/// Number of batches `chunks(items, size)` yields for `len` items.
pub fn chunk_count(len: usize, size: usize) -> usize {
    len.div_ceil(size)
}
