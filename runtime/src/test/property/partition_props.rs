use proptest::prelude::*;

use crate::partition::{effective_threads, partition};

proptest! {
    #[test]
    fn slices_cover_batch_exactly(batch in 1usize..2048, requested in 0usize..96) {
        let nthr = effective_threads(requested, batch);
        prop_assert!(nthr >= 1 && nthr <= batch);

        let slices = partition(batch, nthr);
        prop_assert_eq!(slices.len(), nthr);

        let mut next = 0;
        for (t, slice) in slices.iter().enumerate() {
            prop_assert_eq!(slice.thread, t);
            prop_assert_eq!(slice.start, next, "slices must be contiguous and disjoint");
            prop_assert!(slice.len > 0);
            next = slice.end();
        }
        prop_assert_eq!(next, batch);

        let min = slices.iter().map(|s| s.len).min().unwrap_or(0);
        let max = slices.iter().map(|s| s.len).max().unwrap_or(0);
        prop_assert!(max - min <= 1);
    }
}
