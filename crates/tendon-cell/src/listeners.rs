//! Ordered listener storage shared by cells and sequences.

use indexmap::IndexMap;
use smallvec::SmallVec;
use tendon_core::BindingId;

/// Listeners keyed by binding, in registration order.
///
/// Removal uses `shift_remove` so the surviving listeners keep their
/// relative order.
pub(crate) struct ListenerList<W> {
    entries: IndexMap<BindingId, W>,
}

pub(crate) type ListenerSnapshot<W> = SmallVec<[(BindingId, W); 4]>;

impl<W: Clone> ListenerList<W> {
    pub(crate) fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Register `listener`, keeping the original position if `id` is
    /// already present.
    pub(crate) fn insert(&mut self, id: BindingId, listener: W) {
        match self.entries.get_mut(&id) {
            Some(slot) => *slot = listener,
            None => {
                self.entries.insert(id, listener);
            }
        }
    }

    pub(crate) fn remove(&mut self, id: BindingId) -> bool {
        self.entries.shift_remove(&id).is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Copy of the current listeners, taken before a fan-out so the list
    /// can change while listeners run.
    pub(crate) fn snapshot(&self) -> ListenerSnapshot<W> {
        self.entries
            .iter()
            .map(|(&id, listener)| (id, listener.clone()))
            .collect()
    }
}
