//! Observable cells and sequences for the Tendon binding engine.
//!
//! This crate implements the cell contract the bindings rely on:
//!
//! - [`Property`]: a shared scalar cell. Writes that compare equal to the
//!   current value are suppressed and notify nobody, which is what
//!   terminates two-way feedback loops.
//! - [`PropertyList`] / [`ListWriter`]: an ordered sequence with stable
//!   per-element keys. The read/subscribe handle is `Clone`; the writer is
//!   not, so exactly one owner can mutate a sequence.
//! - [`propagation`]: the per-thread cascade tracker (depth limit and
//!   counters) every notification fan-out passes through.
//!
//! # Invariants
//!
//! 1. Listeners are notified in registration order.
//! 2. A write attributed to an origin binding never notifies that binding.
//! 3. Listener lists are snapshotted before fan-out, so listeners may
//!    attach or detach during a notification.
//! 4. Listeners are held weakly; a dropped binding is pruned on the next
//!    fan-out instead of leaking.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod list;
mod listeners;
pub mod propagation;
pub mod property;

pub use config::{ConfigError, PropagationConfig};
pub use list::{ListWriter, PropertyList};
pub use propagation::PropagationStats;
pub use property::Property;
