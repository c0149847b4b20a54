//! Batch-axis partitioning across worker threads.

/// Contiguous range of batch positions assigned to one worker thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BatchSlice {
    pub thread: usize,
    pub start: usize,
    pub len: usize,
}

impl BatchSlice {
    pub const fn end(&self) -> usize {
        self.start + self.len
    }
}

/// Thread count actually used for a batch of `batch` positions.
///
/// Never zero and never more than there are positions to hand out.
pub fn effective_threads(requested: usize, batch: usize) -> usize {
    requested.max(1).min(batch.max(1))
}

/// Split `0..batch` into `nthr` contiguous slices whose lengths differ by at
/// most one; the first `batch % nthr` slices get the extra element.
pub fn partition(batch: usize, nthr: usize) -> Vec<BatchSlice> {
    let nthr = nthr.max(1);
    let base = batch / nthr;
    let rem = batch % nthr;
    (0..nthr)
        .map(|thread| BatchSlice {
            thread,
            start: thread * base + thread.min(rem),
            len: base + usize::from(thread < rem),
        })
        .collect()
}
