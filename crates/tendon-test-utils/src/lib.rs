//! Test utilities and fixtures for Tendon development.
//!
//! Provides call counters for callback-style bindings, a [`ListOp`]
//! script for driving sequences from property tests, and
//! [`expected_transduction`], the from-scratch oracle list bindings are
//! checked against. Listener fixtures live in [`fixtures`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::cell::Cell;
use std::rc::Rc;

use tendon_cell::ListWriter;
use tendon_core::{BindError, ListError};

/// Shared invocation counter.
///
/// Hand [`callback`](CallCounter::callback) to a notify binding and read
/// [`count`](CallCounter::count) afterwards.
#[derive(Clone, Default)]
pub struct CallCounter {
    calls: Rc<Cell<usize>>,
}

impl CallCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A callback that increments this counter and succeeds.
    pub fn callback(&self) -> impl Fn() -> Result<(), BindError> + 'static {
        let calls = Rc::clone(&self.calls);
        move || {
            calls.set(calls.get() + 1);
            Ok(())
        }
    }

    pub fn count(&self) -> usize {
        self.calls.get()
    }

    pub fn reset(&self) {
        self.calls.set(0);
    }
}

/// One scripted sequence mutation.
///
/// Indices are taken modulo the current length when the op is applied, so
/// any generated script is valid against any sequence.
#[derive(Clone, Debug)]
pub enum ListOp<T> {
    Insert(usize, T),
    Push(T),
    Remove(usize),
    Replace(usize, T),
    Clear,
    Assign(Vec<T>),
}

impl<T: Clone + 'static> ListOp<T> {
    /// Apply this op through `writer`.
    ///
    /// Returns `Ok(false)` when the op does not apply (removing or
    /// replacing in an empty sequence).
    pub fn apply(&self, writer: &ListWriter<T>) -> Result<bool, ListError> {
        let len = writer.list().len();
        match self {
            Self::Insert(index, item) => {
                writer.insert(index % (len + 1), item.clone())?;
            }
            Self::Push(item) => {
                writer.push(item.clone())?;
            }
            Self::Remove(_) | Self::Replace(..) if len == 0 => return Ok(false),
            Self::Remove(index) => {
                writer.remove(index % len)?;
            }
            Self::Replace(index, item) => {
                writer.replace(index % len, item.clone())?;
            }
            Self::Clear => writer.clear()?,
            Self::Assign(items) => writer.assign(items.iter().cloned())?,
        }
        Ok(true)
    }

    /// Apply this op to a plain vector, mirroring [`apply`](Self::apply).
    pub fn apply_to_vec(&self, items: &mut Vec<T>) {
        let len = items.len();
        match self {
            Self::Insert(index, item) => items.insert(index % (len + 1), item.clone()),
            Self::Push(item) => items.push(item.clone()),
            Self::Remove(_) | Self::Replace(..) if len == 0 => {}
            Self::Remove(index) => {
                items.remove(index % len);
            }
            Self::Replace(index, item) => items[index % len] = item.clone(),
            Self::Clear => items.clear(),
            Self::Assign(new_items) => *items = new_items.clone(),
        }
    }
}

/// What a list binding's destination must equal: every element of
/// `source` passing `filter`, expanded by `transform`, concatenated.
pub fn expected_transduction<S, D, I>(
    source: &[S],
    transform: impl Fn(&S) -> I,
    filter: impl Fn(&S) -> bool,
) -> Vec<D>
where
    I: IntoIterator<Item = D>,
{
    source
        .iter()
        .filter(|s| filter(s))
        .flat_map(transform)
        .collect()
}
