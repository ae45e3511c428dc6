//! Group ownership of bindings.

use std::fmt;

use tendon_core::{BindError, BindingId, Link};

/// Owns a set of bindings and deletes them together.
///
/// A game component typically creates its bindings into a scope, toggles
/// them with the component's own enabled state, and lets the scope delete
/// them when the component goes away. Deletion runs in reverse
/// registration order.
///
/// ```
/// use tendon_binding::{Binding, BindingScope};
/// use tendon_cell::Property;
///
/// let src = Property::new(1);
/// let dst = Property::new(0);
/// let mut scope = BindingScope::new();
/// scope.hold(Binding::mirror(&dst, &src).unwrap());
/// assert_eq!(src.listener_count(), 1);
///
/// drop(scope);
/// assert_eq!(src.listener_count(), 0);
/// ```
#[derive(Default)]
pub struct BindingScope {
    links: Vec<Box<dyn Link>>,
}

impl BindingScope {
    /// Create an empty scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of `link`, returning its ID.
    pub fn hold(&mut self, link: impl Link + 'static) -> BindingId {
        let id = link.id();
        self.links.push(Box::new(link));
        id
    }

    /// Number of held bindings.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Whether the scope holds nothing.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Enable or disable every held binding, in registration order.
    ///
    /// Stops at the first binding whose refresh fails; the bindings before
    /// it keep the new state.
    pub fn set_enabled(&self, enabled: bool) -> Result<(), BindError> {
        for link in &self.links {
            link.set_enabled(enabled)?;
        }
        Ok(())
    }

    /// Delete every held binding, most recent first.
    pub fn clear(&mut self) {
        while let Some(link) = self.links.pop() {
            link.delete();
        }
    }
}

impl Drop for BindingScope {
    fn drop(&mut self) {
        self.clear();
    }
}

impl fmt::Debug for BindingScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingScope")
            .field("bindings", &self.links.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Binding, NotifyBinding};
    use std::cell::RefCell;
    use std::rc::Rc;
    use tendon_cell::Property;

    #[test]
    fn clear_deletes_in_reverse_order() {
        struct Tracked {
            id: BindingId,
            log: Rc<RefCell<Vec<BindingId>>>,
        }
        impl Link for Tracked {
            fn id(&self) -> BindingId {
                self.id
            }
            fn enabled(&self) -> bool {
                true
            }
            fn set_enabled(&self, _: bool) -> Result<(), BindError> {
                Ok(())
            }
            fn delete(&self) {
                self.log.borrow_mut().push(self.id);
            }
        }

        let log = Rc::new(RefCell::new(Vec::new()));
        let mut scope = BindingScope::new();
        let ids: Vec<BindingId> = (0..3)
            .map(|_| {
                scope.hold(Tracked {
                    id: BindingId::next(),
                    log: Rc::clone(&log),
                })
            })
            .collect();
        scope.clear();
        let expected: Vec<BindingId> = ids.into_iter().rev().collect();
        assert_eq!(*log.borrow(), expected);
        assert!(scope.is_empty());
    }

    #[test]
    fn set_enabled_reaches_every_binding() {
        let src = Property::new(1);
        let a = Property::new(0);
        let b = Property::new(0);
        let mut scope = BindingScope::new();
        scope.hold(Binding::mirror(&a, &src).unwrap());
        scope.hold(Binding::map(&b, &src, |v| v * 2).unwrap());
        assert_eq!(scope.len(), 2);

        scope.set_enabled(false).unwrap();
        src.set(5).unwrap();
        assert_eq!((a.get(), b.get()), (1, 2));

        scope.set_enabled(true).unwrap();
        assert_eq!((a.get(), b.get()), (5, 10));
    }

    #[test]
    fn kept_handle_is_deleted_by_scope() {
        let src = Property::new(0);
        let mut scope = BindingScope::new();
        let notify = NotifyBinding::new(|| Ok(()), &[&src]);
        scope.hold(notify.clone());
        scope.clear();
        assert_eq!(src.listener_count(), 0);
    }
}
