//! Per-property change ticks.

use log::debug;

use crate::types::SnapshotTick;

/// The tick at which each flat property last changed.
///
/// One list belongs to one packed entity and moves forward with it from
/// snapshot to snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeFrameList {
    ticks: Vec<SnapshotTick>,
}

impl ChangeFrameList {
    /// Creates a list of `len` properties, all changed at `tick`.
    #[must_use]
    pub fn new(len: usize, tick: SnapshotTick) -> Self {
        Self {
            ticks: vec![tick; len],
        }
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    pub fn ticks(&self) -> &[SnapshotTick] {
        &self.ticks
    }

    /// Stamps each index in `indices` with `tick`. Indices past the end are ignored.
    pub fn set_changed_at(&mut self, indices: &[usize], tick: SnapshotTick) {
        for &index in indices {
            let Some(slot) = self.ticks.get_mut(index) else {
                debug!("change frame index {index} past {} properties", self.ticks.len());
                continue;
            };
            if tick < *slot {
                debug!(
                    "property {index} moved back from tick {} to {}",
                    slot.raw(),
                    tick.raw()
                );
            }
            *slot = tick;
        }
    }

    /// Writes the indices changed strictly after `tick` into `out`, in
    /// increasing order, and returns how many were written.
    ///
    /// # Panics
    ///
    /// Panics if `out` is shorter than the list.
    pub fn query_changed_after(&self, tick: SnapshotTick, out: &mut [usize]) -> usize {
        assert!(
            out.len() >= self.ticks.len(),
            "output holds {} indices, list has {}",
            out.len(),
            self.ticks.len()
        );
        let mut count = 0;
        for (index, changed) in self.ticks.iter().enumerate() {
            if *changed > tick {
                out[count] = index;
                count += 1;
            }
        }
        count
    }

    /// Allocating form of [`query_changed_after`](Self::query_changed_after).
    #[must_use]
    pub fn props_changed_after(&self, tick: SnapshotTick) -> Vec<usize> {
        self.ticks
            .iter()
            .enumerate()
            .filter(|(_, changed)| **changed > tick)
            .map(|(index, _)| index)
            .collect()
    }
}
