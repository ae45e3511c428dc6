//! Owned source handles shared by the scalar binding kinds.

use std::rc::Weak;

use smallvec::SmallVec;
use tendon_core::{BindingId, CellId, CellListener, Source};

/// The cells a binding subscribes to, without duplicates, in the order
/// they were given.
pub(crate) struct SourceSet {
    sources: SmallVec<[Box<dyn Source>; 2]>,
}

impl SourceSet {
    pub(crate) fn new(sources: &[&dyn Source]) -> Self {
        let mut set = Self {
            sources: SmallVec::new(),
        };
        for source in sources {
            set.push(*source);
        }
        set
    }

    /// Add `source` unless a handle to the same cell is already present.
    pub(crate) fn push(&mut self, source: &dyn Source) {
        if !self.contains(source.cell_id()) {
            self.sources.push(source.to_source());
        }
    }

    pub(crate) fn contains(&self, cell: CellId) -> bool {
        self.sources.iter().any(|s| s.cell_id() == cell)
    }

    pub(crate) fn len(&self) -> usize {
        self.sources.len()
    }

    pub(crate) fn attach_all(&self, binding: BindingId, listener: &Weak<dyn CellListener>) {
        for source in &self.sources {
            source.attach(binding, Weak::clone(listener));
        }
    }

    pub(crate) fn detach_all(&self, binding: BindingId) {
        for source in &self.sources {
            source.detach(binding);
        }
    }
}
