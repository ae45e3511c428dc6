//! Benchmark profiles and utilities for the Tendon binding engine.
//!
//! Provides pre-wired binding graphs for benchmarks:
//!
//! - [`chain`]: a linear run of one-way bindings, measuring cascade depth cost
//! - [`fan_out`]: one source feeding many destinations
//! - [`instance_pipeline`]: a list binding expanding positions into render
//!   instances, the shape used for instanced props
//! - [`scatter_positions`]: deterministic position data via seed

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use tendon_binding::{Binding, ListBinding};
use tendon_cell::{ListWriter, Property, PropertyList};
use tendon_core::BindError;

/// A linear chain `head -> c1 -> ... -> tail`, each link adding one.
pub struct Chain {
    pub head: Property<u64>,
    pub tail: Property<u64>,
    pub links: Vec<Binding<u64>>,
}

/// Build a chain of `len` bindings.
///
/// A write to `head` cascades through `len` nested notifications, so keep
/// `len` below the configured propagation depth limit.
pub fn chain(len: usize) -> Result<Chain, BindError> {
    let head = Property::new(0);
    let mut prev = head.clone();
    let mut links = Vec::with_capacity(len);
    for _ in 0..len {
        let next = Property::new(0);
        links.push(Binding::map(&next, &prev, |v| v + 1)?);
        prev = next;
    }
    Ok(Chain {
        head,
        tail: prev,
        links,
    })
}

/// One source cell mirrored into `width` destinations.
pub struct FanOut {
    pub source: Property<u64>,
    pub sinks: Vec<Property<u64>>,
    pub links: Vec<Binding<u64>>,
}

/// Build a fan-out of `width` bindings.
pub fn fan_out(width: usize) -> Result<FanOut, BindError> {
    let source = Property::new(0);
    let mut sinks = Vec::with_capacity(width);
    let mut links = Vec::with_capacity(width);
    for _ in 0..width {
        let sink = Property::new(0);
        links.push(Binding::mirror(&sink, &source)?);
        sinks.push(sink);
    }
    Ok(FanOut {
        source,
        sinks,
        links,
    })
}

/// One rendered copy of a prop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Instance {
    pub translation: [f32; 3],
    pub scale: f32,
}

/// Positions expanded into a body instance plus a flattened shadow
/// instance, skipping anything below the kill plane.
pub struct InstancePipeline {
    pub positions: ListWriter<[f32; 3]>,
    pub instances: PropertyList<Instance>,
    pub binding: ListBinding<[f32; 3], Instance>,
}

/// Height below which positions produce no instances.
pub const KILL_PLANE: f32 = -10.0;

/// Build an [`InstancePipeline`] seeded with `initial`.
pub fn instance_pipeline(initial: Vec<[f32; 3]>) -> Result<InstancePipeline, BindError> {
    let (source, positions) = PropertyList::from_vec(initial);
    let (instances, writer) = PropertyList::new();
    let binding = ListBinding::new(
        writer,
        &source,
        |p: &[f32; 3]| {
            [
                Instance {
                    translation: *p,
                    scale: 1.0,
                },
                Instance {
                    translation: [p[0], 0.0, p[2]],
                    scale: 0.0,
                },
            ]
        },
        |p: &[f32; 3]| p[1] > KILL_PLANE,
    )?;
    Ok(InstancePipeline {
        positions,
        instances,
        binding,
    })
}

/// Generate `n` deterministic positions in a 100-unit cube around the
/// origin. Roughly one in eight lands below the kill plane.
pub fn scatter_positions(n: usize, seed: u64) -> Vec<[f32; 3]> {
    let mut state = seed;
    let mut next = move || {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((state >> 33) % 1000) as f32 / 10.0 - 50.0
    };
    (0..n).map(|_| [next(), next(), next()]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_propagates_end_to_end() {
        let c = chain(10).unwrap();
        assert_eq!(c.tail.get(), 10);
        c.head.set(5).unwrap();
        assert_eq!(c.tail.get(), 15);
    }

    #[test]
    fn fan_out_reaches_every_sink() {
        let f = fan_out(8).unwrap();
        f.source.set(3).unwrap();
        assert!(f.sinks.iter().all(|s| s.get() == 3));
        assert_eq!(f.source.listener_count(), 8);
    }

    #[test]
    fn pipeline_skips_killed_positions() {
        let p = instance_pipeline(vec![[0.0, 1.0, 0.0], [0.0, -20.0, 0.0]]).unwrap();
        assert_eq!(p.instances.len(), 2);
        p.positions.replace(1, [1.0, 2.0, 3.0]).unwrap();
        assert_eq!(p.instances.len(), 4);
        assert_eq!(p.binding.mapped_len(), 4);
    }

    #[test]
    fn scatter_is_deterministic() {
        assert_eq!(scatter_positions(16, 7), scatter_positions(16, 7));
        assert_ne!(scatter_positions(16, 7), scatter_positions(16, 8));
        assert!(scatter_positions(64, 1)
            .iter()
            .flatten()
            .all(|v| (-50.0..50.0).contains(v)));
    }
}
