//! Strongly-typed identifiers for cells, bindings, and sequence elements.
//!
//! All identifiers are allocated from process-wide monotonic counters, so
//! two distinct objects never share an ID even after one of them is dropped.
//! This rules out ABA confusion when a listener list is keyed by a binding
//! that was deleted and a new binding happens to reuse its allocation.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static CELL_COUNTER: AtomicU64 = AtomicU64::new(1);
static BINDING_COUNTER: AtomicU64 = AtomicU64::new(1);
static ELEMENT_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Identifies an observable cell or sequence.
///
/// Passed to [`CellListener::on_changed`](crate::CellListener::on_changed)
/// so a binding with several sources can tell which one fired.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(u64);

impl CellId {
    /// Allocate a fresh, unique cell ID.
    pub fn next() -> Self {
        Self(CELL_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw counter value.
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cell#{}", self.0)
    }
}

/// Identifies a binding.
///
/// Cells key their listener lists by `BindingId`, which is also how a write
/// is attributed to its origin so the writing binding is not notified of
/// its own change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(u64);

impl BindingId {
    /// Allocate a fresh, unique binding ID.
    pub fn next() -> Self {
        Self(BINDING_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw counter value.
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "binding#{}", self.0)
    }
}

/// Stable identity of one element within an observable sequence.
///
/// Assigned when the element is inserted and kept when its value is
/// replaced in place. List bindings key their range tables by this handle
/// rather than by element value, so two equal elements never collide.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementKey(u64);

impl ElementKey {
    /// Allocate a fresh, unique element key.
    pub fn next() -> Self {
        Self(ELEMENT_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw counter value.
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ElementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "element#{}", self.0)
    }
}
