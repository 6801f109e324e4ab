//! Hyperslab planning over the K dimension.
//!
//! [`plan_range`] shards K-cell layers by ceiling division, the last worker absorbing the
//! remainder. [`plan_interface_range`] turns an owned cell range into the closed
//! K-interface range to read, accounting for the extra interfaces K-gaps introduce.
use std::ops::RangeInclusive;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Half-open range `[init_k_index, max_k_index)` of K-cell layers owned by one worker.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct HyperslabRange {
    pub init_k_index: u32,
    pub max_k_index: u32,
}

impl HyperslabRange {
    /// The range owned by a worker that has nothing to load.
    pub const EMPTY: HyperslabRange = HyperslabRange {
        init_k_index: 0,
        max_k_index: 0,
    };

    pub fn new(init_k_index: u32, max_k_index: u32) -> Self {
        debug_assert!(init_k_index <= max_k_index, "inverted hyperslab range");
        Self {
            init_k_index,
            max_k_index,
        }
    }

    /// The range covering every layer of a grid.
    pub fn whole(k_cell_count: u32) -> Self {
        Self::new(0, k_cell_count)
    }

    /// Number of K-cell layers in the range.
    pub fn len(&self) -> u32 {
        self.max_k_index - self.init_k_index
    }

    pub fn is_empty(&self) -> bool {
        self.max_k_index == self.init_k_index
    }

    /// Returns `true` if the range spans all `k_cell_count` layers.
    pub fn covers(&self, k_cell_count: u32) -> bool {
        self.init_k_index == 0 && self.max_k_index == k_cell_count
    }

    pub fn layers(&self) -> std::ops::Range<u32> {
        self.init_k_index..self.max_k_index
    }
}

/// Closed range `[init_interface_index, max_interface_index]` of K-interfaces.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct InterfaceRange {
    pub init_interface_index: u32,
    pub max_interface_index: u32,
}

impl InterfaceRange {
    pub fn new(init_interface_index: u32, max_interface_index: u32) -> Self {
        debug_assert!(
            init_interface_index <= max_interface_index,
            "inverted interface range"
        );
        Self {
            init_interface_index,
            max_interface_index,
        }
    }

    /// Number of interfaces in the range (both ends included).
    pub fn len(&self) -> u32 {
        self.max_interface_index - self.init_interface_index + 1
    }

    pub fn iter(&self) -> RangeInclusive<u32> {
        self.init_interface_index..=self.max_interface_index
    }
}

/// Computes the K-cell layers owned by `worker_index` among `max_proc` workers.
///
/// Workers whose first layer would lie beyond the grid get [`HyperslabRange::EMPTY`].
pub fn plan_range(k_cell_count: u32, worker_index: u32, max_proc: u32) -> HyperslabRange {
    debug_assert!(max_proc > 0, "max_proc must be > 0");
    let max_proc = max_proc.max(1);
    let quota = k_cell_count.div_ceil(max_proc);
    let init_k_index = worker_index.saturating_mul(quota);
    if init_k_index >= k_cell_count {
        return HyperslabRange::EMPTY;
    }
    let max_k_index = if worker_index == max_proc - 1 {
        k_cell_count
    } else {
        (init_k_index + quota).min(k_cell_count)
    };
    HyperslabRange::new(init_k_index, max_k_index)
}

/// Maps an owned K-cell range to the closed K-interface range holding its nodes.
///
/// `k_gap_after_layer[l]` is `true` when a gap interface follows layer `l`. Gaps after
/// layers below the range shift both bounds; gaps between two owned layers widen the
/// upper bound. A gap after the last owned layer belongs to the next slab.
pub fn plan_interface_range(
    k_gap_after_layer: Option<&[bool]>,
    range: HyperslabRange,
) -> InterfaceRange {
    let mut init_interface_index = range.init_k_index;
    let mut max_interface_index = range.max_k_index;

    if let Some(gaps) = k_gap_after_layer {
        let gap_after = |layer: u32| gaps.get(layer as usize).copied().unwrap_or(false);

        for layer in 0..range.init_k_index {
            if gap_after(layer) {
                init_interface_index += 1;
                max_interface_index += 1;
            }
        }
        if !range.is_empty() {
            // The gap after layer max_k_index - 1 lies above the slab's top interface.
            for layer in range.init_k_index..range.max_k_index - 1 {
                if gap_after(layer) {
                    max_interface_index += 1;
                }
            }
        }
    }

    InterfaceRange::new(init_interface_index, max_interface_index)
}

/// Total number of K-interfaces of a grid: `k_cell_count + 1` plus one per gap.
pub fn k_interface_count(k_cell_count: u32, k_gap_after_layer: Option<&[bool]>) -> u32 {
    let gaps = k_gap_after_layer
        .map(|g| {
            g.iter()
                .take(k_cell_count.saturating_sub(1) as usize)
                .filter(|&&gap| gap)
                .count() as u32
        })
        .unwrap_or(0);
    k_cell_count + 1 + gaps
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_ranges(k_cell_count: u32, max_proc: u32) -> Vec<HyperslabRange> {
        (0..max_proc)
            .map(|w| plan_range(k_cell_count, w, max_proc))
            .collect()
    }

    #[test]
    fn ten_layers_over_three_workers() {
        assert_eq!(
            all_ranges(10, 3),
            vec![
                HyperslabRange::new(0, 4),
                HyperslabRange::new(4, 8),
                HyperslabRange::new(8, 10),
            ]
        );
    }

    #[test]
    fn single_worker_owns_everything() {
        let range = plan_range(7, 0, 1);
        assert!(range.covers(7));
        assert_eq!(range.len(), 7);
    }

    #[test]
    fn partition_is_complete_and_disjoint() {
        for k_cell_count in 1..=40u32 {
            for max_proc in 1..=k_cell_count {
                let mut owner = vec![0u32; k_cell_count as usize];
                for range in all_ranges(k_cell_count, max_proc) {
                    for k in range.layers() {
                        owner[k as usize] += 1;
                    }
                }
                assert!(
                    owner.iter().all(|&n| n == 1),
                    "k={k_cell_count} procs={max_proc}: {owner:?}"
                );
            }
        }
    }

    #[test]
    fn surplus_workers_get_empty_ranges() {
        // quota = ceil(3/5) = 1: workers 3 and 4 start beyond the grid.
        let ranges = all_ranges(3, 5);
        assert_eq!(ranges[3], HyperslabRange::EMPTY);
        assert_eq!(ranges[4], HyperslabRange::EMPTY);
        let owned: u32 = ranges.iter().map(|r| r.len()).sum();
        assert_eq!(owned, 3);

        // quota = ceil(5/4) = 2: worker 3 starts at 6 >= 5.
        let ranges = all_ranges(5, 4);
        assert_eq!(ranges[2], HyperslabRange::new(4, 5));
        assert_eq!(ranges[3], HyperslabRange::EMPTY);
    }

    #[test]
    fn non_last_worker_is_clamped_to_grid() {
        // quota = ceil(5/4) = 2, worker 2 owns [4, 6) before clamping.
        assert_eq!(plan_range(5, 2, 4), HyperslabRange::new(4, 5));
    }

    #[test]
    fn no_gaps_is_identity() {
        let range = HyperslabRange::new(3, 7);
        assert_eq!(plan_interface_range(None, range), InterfaceRange::new(3, 7));
        let gaps = [false; 9];
        assert_eq!(
            plan_interface_range(Some(&gaps), range),
            InterfaceRange::new(3, 7)
        );
    }

    #[test]
    fn gap_below_range_shifts_both_bounds() {
        // Interfaces: layer0 [0,1], layer1 [1,2], gap, layer2 [3,4], layer3 [4,5].
        let gaps = [false, true, false];
        let interfaces = plan_interface_range(Some(&gaps), HyperslabRange::new(2, 4));
        assert_eq!(interfaces, InterfaceRange::new(3, 5));
        assert_eq!(interfaces.len(), 3);
    }

    #[test]
    fn gap_inside_range_widens_upper_bound() {
        let gaps = [false, true, false];
        assert_eq!(
            plan_interface_range(Some(&gaps), HyperslabRange::new(0, 4)),
            InterfaceRange::new(0, 5)
        );
    }

    #[test]
    fn trailing_gap_is_left_to_next_slab() {
        let gaps = [false, true, false];
        let owned = HyperslabRange::new(0, 2);
        let interfaces = plan_interface_range(Some(&gaps), owned);
        assert_eq!(interfaces, InterfaceRange::new(0, 2));
        assert_eq!(interfaces.len(), owned.len() + 1);
        // The next slab starts on the interface after the gap.
        assert_eq!(
            plan_interface_range(Some(&gaps), HyperslabRange::new(2, 4)).init_interface_index,
            3
        );
    }

    #[test]
    fn whole_grid_interface_range_matches_interface_count() {
        let gaps = [true, false, true, true];
        let interfaces = plan_interface_range(Some(&gaps), HyperslabRange::whole(5));
        assert_eq!(interfaces.max_interface_index + 1, k_interface_count(5, Some(&gaps)));
    }

    #[test]
    fn adjacent_slabs_share_exactly_one_interface() {
        let gaps = [false, true, false, false, true, false, false];
        let ranges = all_ranges(8, 3);
        for pair in ranges.windows(2) {
            let lower = plan_interface_range(Some(&gaps), pair[0]);
            let upper = plan_interface_range(Some(&gaps), pair[1]);
            let gap_at_boundary = gaps[(pair[0].max_k_index - 1) as usize];
            let expected = lower.max_interface_index + u32::from(gap_at_boundary);
            assert_eq!(upper.init_interface_index, expected);
        }
    }
}
