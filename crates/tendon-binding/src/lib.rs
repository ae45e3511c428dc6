//! Bindings for the Tendon propagation engine.
//!
//! A binding subscribes to one or more observable cells and reacts when
//! they change:
//!
//! - [`Binding`]: recomputes a destination cell from its sources.
//! - [`NotifyBinding`]: runs a side effect.
//! - [`TwoWayBinding`]: keeps two cells consistent in both directions.
//! - [`ListBinding`]: incrementally derives one sequence from another.
//! - [`ListNotifyBinding`]: runs a side effect on sequence events.
//!
//! Every binding kind implements [`Link`](tendon_core::Link), the handle
//! game code enables, disables and deletes. [`BindingScope`] owns a group
//! of links and deletes them together.
//!
//! # Invariants
//!
//! - Sources hold bindings weakly. A binding lives as long as a handle to
//!   it does; dropping the last handle unsubscribes it.
//! - A write made by a binding is attributed to it, so it is never
//!   notified of its own change.
//! - While enabled (and while its predicate holds) a [`Binding`]'s
//!   destination equals its function of the sources after every change.
//! - A [`ListBinding`] owns its destination's writer; its recorded ranges
//!   always sum to the destination length when idle.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod binding;
pub mod list;
pub mod list_notify;
pub mod notify;
pub mod scope;
mod sources;
pub mod two_way;

pub use binding::Binding;
pub use list::{ListBinding, Outputs};
pub use list_notify::ListNotifyBinding;
pub use notify::NotifyBinding;
pub use scope::BindingScope;
pub use two_way::{SyncState, TwoWayBinding};
