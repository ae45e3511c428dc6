//! Core types and traits for the Tendon binding engine.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by the cell layer and the binding layer:
//! identifiers, error types, and the listener capability traits that
//! connect observable cells to the bindings subscribed to them.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;
pub mod traits;

pub use error::{BindError, ListError};
pub use id::{BindingId, CellId, ElementKey};
pub use traits::{CellListener, Link, SeqListener, Source};
