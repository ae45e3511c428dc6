//! Tendon: a synchronous reactive property and binding propagation engine.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! Tendon sub-crates. For most users, adding `tendon` as a single dependency is
//! sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use tendon::prelude::*;
//!
//! // Two views of one temperature, kept in sync both ways.
//! let celsius = Property::new(0.0_f64);
//! let fahrenheit = Property::new(0.0_f64);
//! let _sync = TwoWayBinding::new(
//!     &celsius,
//!     |f: &f64| (f - 32.0) * 5.0 / 9.0,
//!     &fahrenheit,
//!     |c: &f64| c * 9.0 / 5.0 + 32.0,
//! )
//! .unwrap();
//! assert_eq!(fahrenheit.get(), 32.0);
//!
//! // A label derived one way, paused while the HUD is hidden.
//! let label = Property::new(String::new());
//! let hud = Binding::map(&label, &celsius, |c| format!("{c:.0} C")).unwrap();
//!
//! fahrenheit.set(212.0).unwrap();
//! assert_eq!(celsius.get(), 100.0);
//! assert_eq!(label.get(), "100 C");
//!
//! hud.set_enabled(false).unwrap();
//! celsius.set(20.0).unwrap();
//! assert_eq!(label.get(), "100 C");
//! hud.set_enabled(true).unwrap();
//! assert_eq!(label.get(), "20 C");
//!
//! // A sequence expanded element by element.
//! let (waypoints, edit) = PropertyList::from_vec(vec![1, 2, 3]);
//! let (markers, markers_writer) = PropertyList::new();
//! let _list = ListBinding::map(markers_writer, &waypoints, |x: &i32| [*x, x * 10]).unwrap();
//! edit.remove(1).unwrap();
//! assert_eq!(markers.to_vec(), vec![1, 10, 3, 30]);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `tendon-core` | IDs, errors, listener traits |
//! | [`cell`] | `tendon-cell` | Observable cells and sequences, propagation tracker |
//! | [`binding`] | `tendon-binding` | One-way, two-way and list bindings, scopes |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, traits, and IDs (`tendon-core`).
///
/// Contains the identifiers, the error enums, and the capability traits
/// ([`types::Source`], [`types::CellListener`], [`types::SeqListener`],
/// [`types::Link`]).
pub use tendon_core as types;

/// Observable cells and sequences (`tendon-cell`).
///
/// Provides [`cell::Property`], [`cell::PropertyList`] with its
/// [`cell::ListWriter`], and the per-thread [`cell::propagation`] tracker.
pub use tendon_cell as cell;

/// Bindings (`tendon-binding`).
///
/// [`binding::Binding`], [`binding::NotifyBinding`],
/// [`binding::TwoWayBinding`], [`binding::ListBinding`],
/// [`binding::ListNotifyBinding`] and [`binding::BindingScope`].
pub use tendon_binding as binding;

/// Common imports for typical Tendon usage.
///
/// ```rust
/// use tendon::prelude::*;
/// ```
///
/// This imports the cell types, every binding kind, the [`Link`](crate::types::Link)
/// trait needed to enable, disable and delete bindings, and the error types.
pub mod prelude {
    // Cells
    pub use tendon_cell::{ListWriter, Property, PropertyList};

    // Bindings
    pub use tendon_binding::{
        Binding, BindingScope, ListBinding, ListNotifyBinding, NotifyBinding, TwoWayBinding,
    };

    // Traits
    pub use tendon_core::{Link, Source};

    // Errors
    pub use tendon_core::{BindError, ListError};
}
