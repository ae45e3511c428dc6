//! Capability traits connecting observable cells to bindings.
//!
//! Cells hold their listeners weakly, as `Weak<dyn CellListener>` or
//! `Weak<dyn SeqListener<T>>`, keyed by [`BindingId`]. A binding owns
//! strong handles to its sources through [`Source`] so it can detach
//! itself on delete. Nothing in the graph owns a binding except the
//! game code holding its [`Link`].

use std::rc::Weak;

use crate::error::BindError;
use crate::id::{BindingId, CellId, ElementKey};

/// A type-erased observable that bindings can subscribe to.
///
/// Implemented by scalar cells and by sequences. A sequence attached
/// through this trait delivers one plain change notification after every
/// mutation.
pub trait Source {
    /// Identity of the underlying cell.
    fn cell_id(&self) -> CellId;

    /// Register `listener` under `binding`.
    ///
    /// Registration order is notification order. Attaching a binding that
    /// is already registered keeps its original position.
    fn attach(&self, binding: BindingId, listener: Weak<dyn CellListener>);

    /// Remove the listener registered under `binding`, if any.
    fn detach(&self, binding: BindingId);

    /// An owned handle to the same cell.
    fn to_source(&self) -> Box<dyn Source>;
}

/// Receives change notifications from scalar cells.
pub trait CellListener {
    /// Called after the cell `changed` took a new value.
    fn on_changed(&self, changed: CellId) -> Result<(), BindError>;
}

/// Receives granular change events from an observable sequence.
///
/// Every event carries the position and [`ElementKey`] of the element it
/// concerns; the listener is called after the sequence has been updated.
pub trait SeqListener<T> {
    /// `item` was inserted at `index`.
    fn on_inserted(
        &self,
        list: CellId,
        index: usize,
        key: ElementKey,
        item: &T,
    ) -> Result<(), BindError>;

    /// `item`, previously at `index`, was removed.
    fn on_removed(
        &self,
        list: CellId,
        index: usize,
        key: ElementKey,
        item: &T,
    ) -> Result<(), BindError>;

    /// The element at `index` changed from `from` to `to`, keeping `key`.
    fn on_replaced(
        &self,
        list: CellId,
        index: usize,
        key: ElementKey,
        from: &T,
        to: &T,
    ) -> Result<(), BindError>;

    /// The sequence was emptied.
    fn on_cleared(&self, list: CellId) -> Result<(), BindError>;

    /// The sequence was rebuilt wholesale; listeners must resync.
    fn on_rebuilt(&self, list: CellId) -> Result<(), BindError>;
}

/// The game-facing handle every binding kind exposes.
pub trait Link {
    /// Identity of the binding.
    fn id(&self) -> BindingId;

    /// Whether the binding currently propagates.
    fn enabled(&self) -> bool;

    /// Enable or disable propagation.
    ///
    /// A false-to-true transition refreshes the binding's outputs
    /// immediately, which may cascade and therefore may fail.
    fn set_enabled(&self, enabled: bool) -> Result<(), BindError>;

    /// Unsubscribe from every source and release all captured state.
    ///
    /// Idempotent. Notifications that still reach a deleted binding are
    /// no-ops.
    fn delete(&self);
}
