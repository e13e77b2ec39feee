//! Node-slot bookkeeping for the active cluster.

use crate::topology::NODE_LIMIT;

/// Lifecycle of one slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlotState {
    #[default]
    Free,
    Added,
    Started,
    Stopped,
    Decommissioned,
}

impl SlotState {
    pub fn is_occupied(self) -> bool {
        self != SlotState::Free
    }
}

/// Slots `1..=NODE_LIMIT`. A slot stays occupied through stop and
/// decommission; only [`NodeSlots::release`] or [`NodeSlots::reset`] frees it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeSlots {
    states: [SlotState; NODE_LIMIT as usize],
}

impl NodeSlots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.states = Default::default();
    }

    pub fn contains(slot: u32) -> bool {
        (1..=NODE_LIMIT).contains(&slot)
    }

    /// Lowest free slot, without claiming it.
    pub fn next_free(&self) -> Option<u32> {
        self.states
            .iter()
            .position(|s| !s.is_occupied())
            .map(|index| index as u32 + 1)
    }

    pub fn state(&self, slot: u32) -> SlotState {
        if Self::contains(slot) {
            self.states[slot as usize - 1]
        } else {
            SlotState::Free
        }
    }

    /// Out-of-range slots are ignored; callers validate first.
    pub fn set(&mut self, slot: u32, state: SlotState) {
        if Self::contains(slot) {
            self.states[slot as usize - 1] = state;
        }
    }

    pub fn release(&mut self, slot: u32) {
        self.set(slot, SlotState::Free);
    }

    /// Apply `state` to every occupied slot that is not decommissioned.
    pub fn set_members(&mut self, state: SlotState) {
        for s in self
            .states
            .iter_mut()
            .filter(|s| s.is_occupied() && **s != SlotState::Decommissioned)
        {
            *s = state;
        }
    }

    pub fn occupied(&self) -> impl Iterator<Item = u32> + '_ {
        (1..=NODE_LIMIT).filter(|slot| self.state(*slot).is_occupied())
    }

    pub fn occupied_count(&self) -> usize {
        self.occupied().count()
    }
}
