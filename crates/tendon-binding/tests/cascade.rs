//! Cascade limits and error propagation.

use std::cell::Cell;
use std::rc::Rc;

use tendon_binding::{Binding, ListBinding, NotifyBinding};
use tendon_cell::{propagation, Property, PropagationConfig, PropertyList};
use tendon_core::{BindError, BindingId, Link, ListError};
use tendon_test_utils::fixtures::FailingListener;

#[test]
fn unsuppressed_cycle_hits_depth_limit() {
    propagation::configure(PropagationConfig::new(16)).unwrap();
    let a = Property::new(0);
    let b = Property::new(0);
    let _forward = Binding::map(&b, &a, |v| v + 1).unwrap();
    let backward = Binding::map(&a, &b, |v| v + 1);
    assert_eq!(
        backward.err(),
        Some(BindError::CascadeTooDeep {
            depth: 17,
            limit: 16
        })
    );
    assert_eq!(propagation::depth(), 0);

    // The failed binding was dropped and detached.
    assert_eq!(b.listener_count(), 0);
    a.set(100).unwrap();
    assert_eq!(b.get(), 101);
}

#[test]
fn first_error_aborts_remaining_listeners() {
    let src = Property::new(0);
    let dst = Property::new(0);
    let failing = FailingListener::attach(&src, 0);
    let _late = Binding::mirror(&dst, &src).unwrap();

    let err = src.set(9).unwrap_err();
    assert!(matches!(err, BindError::UnknownSource { .. }));
    assert_eq!(failing.calls(), 1);
    // The write itself stands; the binding after the failing listener
    // never ran.
    assert_eq!(src.get(), 9);
    assert_eq!(dst.get(), 0);
}

#[test]
fn list_binding_rejects_reentrant_edit() {
    let (source, edit) = PropertyList::from_vec(vec![1]);
    let edit = Rc::new(edit);
    let (dest, writer) = PropertyList::new();
    let _binding = ListBinding::mirror(writer, &source).unwrap();

    let armed = Rc::new(Cell::new(false));
    let (armed_cb, edit_cb) = (Rc::clone(&armed), Rc::clone(&edit));
    let _echo = NotifyBinding::new(
        move || {
            if armed_cb.replace(false) {
                edit_cb.push(0).map_err(|e| match e {
                    ListError::Propagation(inner) => inner,
                    ListError::IndexOutOfRange { .. } => unreachable!(),
                })?;
            }
            Ok(())
        },
        &[&dest],
    );

    armed.set(true);
    let err = edit.push(2).unwrap_err();
    assert!(matches!(
        err,
        ListError::Propagation(BindError::Reentrant { .. })
    ));
    assert_eq!(propagation::depth(), 0);
}

#[test]
fn stats_count_suppressed_writes() {
    let src = Property::new(1);
    let a = Property::new(0);
    let b = Property::new(0);
    let _ba = Binding::map(&a, &src, |v| v % 2).unwrap();
    let _bb = Binding::map(&b, &src, |v| v * 2).unwrap();

    propagation::reset_stats();
    src.set(3).unwrap();
    let stats = propagation::stats();
    // src and b change; a stays 1.
    assert_eq!(stats.writes, 2);
    assert_eq!(stats.suppressed_writes, 1);
    assert_eq!(stats.notifications, 2);
}

#[test]
fn failed_destination_write_rebuilds_on_next_event() {
    let (source, edit) = PropertyList::from_vec(vec![1]);
    let (dest, writer) = PropertyList::new();
    let binding = ListBinding::map(writer, &source, |x: &i32| [*x, x * 10]).unwrap();

    let armed = Rc::new(Cell::new(false));
    let (armed_cb, dest_id) = (Rc::clone(&armed), dest.id());
    let _tripwire = NotifyBinding::new(
        move || {
            if armed_cb.replace(false) {
                return Err(BindError::UnknownSource {
                    binding: BindingId::next(),
                    cell: dest_id,
                });
            }
            Ok(())
        },
        &[&dest],
    );

    armed.set(true);
    let err = edit.push(2).unwrap_err();
    assert!(matches!(
        err,
        ListError::Propagation(BindError::UnknownSource { .. })
    ));
    // The first output landed before the listener failed.
    assert_eq!(dest.to_vec(), vec![1, 10, 2]);

    edit.insert(0, 0).unwrap();
    assert_eq!(dest.to_vec(), vec![0, 0, 1, 10, 2, 20]);
    assert_eq!(binding.mapped_len(), dest.len());
    let mut next = 0;
    for (_, range) in binding.ranges() {
        assert_eq!(range.start, next);
        next = range.end;
    }
    assert_eq!(next, dest.len());

    // Back to incremental updates.
    edit.remove(1).unwrap();
    assert_eq!(dest.to_vec(), vec![0, 0, 2, 20]);
}

#[test]
fn delete_during_event_releases_transducer() {
    let token = Rc::new(0);
    let (source, edit) = PropertyList::from_vec(vec![1]);
    let (dest, writer) = PropertyList::new();
    let held = Rc::clone(&token);
    let binding = ListBinding::map(writer, &source, move |x: &i32| [*x + *held]).unwrap();
    assert_eq!(Rc::strong_count(&token), 2);

    let victim = binding.clone();
    let _killer = NotifyBinding::new(
        move || {
            victim.delete();
            Ok(())
        },
        &[&dest],
    );

    edit.push(2).unwrap();
    assert!(binding.is_deleted());
    assert_eq!(Rc::strong_count(&token), 1);
    assert!(binding.ranges().is_empty());
    assert_eq!(source.listener_count(), 0);

    edit.push(3).unwrap();
    assert_eq!(dest.to_vec(), vec![1, 2]);
}
