use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::Slot;

/// Slot values gathered so far in one session.
///
/// Values only ever get added or overwritten; the single way to drop them is
/// [`DialogueState::reset`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueState {
    slots: BTreeMap<Slot, String>,
}

impl DialogueState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, slot: Slot) -> Option<&str> {
        self.slots.get(&slot).map(String::as_str)
    }

    pub fn contains(&self, slot: Slot) -> bool {
        self.slots.contains_key(&slot)
    }

    /// Stores `value` unless it is blank. Returns whether the state changed.
    pub fn set(&mut self, slot: Slot, value: impl Into<String>) -> bool {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return false;
        }
        if self.get(slot) == Some(trimmed) {
            return false;
        }
        self.slots.insert(slot, trimmed.to_string());
        true
    }

    /// Later non-empty values win; slots absent from `other` are left alone.
    pub fn merge(&mut self, other: DialogueState) -> Vec<Slot> {
        other
            .slots
            .into_iter()
            .filter_map(|(slot, value)| self.set(slot, value).then_some(slot))
            .collect()
    }

    /// Owned copy for the interaction log.
    pub fn snapshot(&self) -> Self {
        self.clone()
    }

    pub fn reset(&mut self) {
        self.slots.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Slot, &str)> {
        self.slots.iter().map(|(slot, value)| (*slot, value.as_str()))
    }

    /// Wire-named copy for logs and display.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.slots.iter().map(|(slot, value)| (slot.as_str().to_string(), value.clone())).collect()
    }
}
