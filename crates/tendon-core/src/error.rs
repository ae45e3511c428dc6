//! Error types for the Tendon binding engine.
//!
//! There is no transient error class: the engine is an in-memory structural
//! system, so every error below reports a wiring or bookkeeping bug and
//! aborts the cascade that hit it.

use std::error::Error;
use std::fmt;

use crate::id::{BindingId, CellId, ElementKey};

/// Errors raised while propagating a change through the binding graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BindError {
    /// A binding was notified about, or asked to reevaluate, a cell it
    /// never subscribed to.
    UnknownSource {
        /// The binding that received the notification.
        binding: BindingId,
        /// The cell named in the notification.
        cell: CellId,
    },
    /// A list binding was asked to remove or replace an element it holds
    /// no range for.
    MissingMapping {
        /// The list binding.
        binding: BindingId,
        /// The element the event referred to.
        key: ElementKey,
    },
    /// A list event named a position outside the binding's entry table.
    Desynchronized {
        /// The list binding.
        binding: BindingId,
        /// Position carried by the event.
        index: usize,
        /// Number of entries the binding tracks.
        len: usize,
    },
    /// A list binding received an event while it was still applying a
    /// previous one.
    Reentrant {
        /// The list binding.
        binding: BindingId,
    },
    /// A cascade nested deeper than the configured propagation limit.
    CascadeTooDeep {
        /// Depth at which the cascade was aborted.
        depth: usize,
        /// The configured limit.
        limit: usize,
    },
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSource { binding, cell } => {
                write!(f, "{binding} received improper change notification from {cell}")
            }
            Self::MissingMapping { binding, key } => {
                write!(f, "{binding} has no range recorded for {key}")
            }
            Self::Desynchronized {
                binding,
                index,
                len,
            } => {
                write!(
                    f,
                    "{binding} received event at index {index} but tracks {len} entries"
                )
            }
            Self::Reentrant { binding } => {
                write!(f, "{binding} re-entered while applying a list event")
            }
            Self::CascadeTooDeep { depth, limit } => {
                write!(f, "propagation depth {depth} exceeds limit {limit}")
            }
        }
    }
}

impl Error for BindError {}

/// Errors from writing an observable sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListError {
    /// The index does not address an element (or, for inserts, the tail).
    IndexOutOfRange {
        /// The requested index.
        index: usize,
        /// Length of the sequence at the time of the call.
        len: usize,
    },
    /// The write succeeded but a listener failed while propagating it.
    Propagation(BindError),
}

impl fmt::Display for ListError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IndexOutOfRange { index, len } => {
                write!(f, "index {index} out of range for sequence of length {len}")
            }
            Self::Propagation(reason) => write!(f, "propagation failed: {reason}"),
        }
    }
}

impl Error for ListError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Propagation(reason) => Some(reason),
            Self::IndexOutOfRange { .. } => None,
        }
    }
}

impl From<BindError> for ListError {
    fn from(reason: BindError) -> Self {
        Self::Propagation(reason)
    }
}
