use proptest::prelude::*;

use concord_collections::{ConcurrentDeque, SlidingSet};

proptest! {
    /// Inserted values are always contained afterwards.
    #[test]
    fn sliding_insert_then_contains(values in prop::collection::vec(1u32..500, 1..100)) {
        let mut set = SlidingSet::new(0);
        for &v in &values {
            set.insert(v);
            prop_assert!(set.contains(v));
        }
        for &v in &values {
            prop_assert!(set.contains(v));
        }
    }

    /// A value is reported as a first sighting exactly once over any
    /// insertion sequence.
    #[test]
    fn sliding_first_sighting_unique(values in prop::collection::vec(1u32..200, 1..200)) {
        let mut set = SlidingSet::new(0);
        let mut seen = std::collections::HashSet::new();
        for &v in &values {
            let fresh = set.insert(v);
            prop_assert_eq!(fresh, seen.insert(v));
        }
    }

    /// Explicit member count stays bounded by the reorder fringe: after
    /// inserting any permutation prefix of 1..=n, the set never holds
    /// more members than the number of gaps plus one marker.
    #[test]
    fn sliding_memory_bounded_by_gaps(values in prop::collection::vec(1u32..300, 1..300)) {
        let mut set = SlidingSet::new(0);
        let mut delivered = std::collections::BTreeSet::new();
        delivered.insert(0u32);
        for &v in &values {
            set.insert(v);
            delivered.insert(v);

            // count members above the contiguous prefix of `delivered`
            let mut prefix_end = 0u32;
            while delivered.contains(&(prefix_end + 1)) {
                prefix_end += 1;
            }
            let fringe = delivered.iter().filter(|&&d| d > prefix_end).count();
            prop_assert!(set.len() <= fringe + 1);
        }
    }

    /// Bulk insertion returns flags identical to element-wise insertion.
    #[test]
    fn sliding_bulk_matches_scalar(values in prop::collection::vec(1u32..100, 1..64)) {
        let mut bulk = SlidingSet::new(0);
        let mut scalar = SlidingSet::new(0);
        let flags = bulk.insert_bulk(&values);
        for (i, &v) in values.iter().enumerate() {
            prop_assert_eq!(flags[i], scalar.insert(v));
        }
    }

    /// The deque preserves FIFO order under any push/pop_k interleaving.
    #[test]
    fn deque_fifo_under_batched_pops(
        values in prop::collection::vec(0u32..1000, 1..100),
        chunk in 1usize..10,
    ) {
        let deque = ConcurrentDeque::new();
        for &v in &values {
            deque.push_back(v);
        }
        let mut drained = Vec::new();
        loop {
            let batch = deque.pop_front_k(chunk);
            if batch.is_empty() {
                break;
            }
            drained.extend(batch);
        }
        prop_assert_eq!(drained, values);
    }
}
