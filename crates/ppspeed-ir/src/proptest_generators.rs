//! Proptest strategies for generating well-formed `Protocol` instances.

use proptest::prelude::*;

use crate::protocol::Protocol;

/// Strategy for a small protocol suitable for property testing.
///
/// Generated protocols have 2-5 states named `q0..`, up to 8 transitions
/// between declared states and at least one initial state. Outputs are
/// optional per state, so either output set may be empty.
pub fn arb_protocol() -> impl Strategy<Value = Protocol> {
    (2..=5usize)
        .prop_flat_map(|nstates| {
            let pair = (0..nstates, 0..nstates);
            let transitions = proptest::collection::vec((pair.clone(), pair), 0..=8);
            let initial = proptest::collection::btree_set(0..nstates, 1..=nstates);
            let outputs =
                proptest::collection::vec(proptest::option::of(any::<bool>()), nstates..=nstates);
            (Just(nstates), transitions, initial, outputs)
        })
        .prop_map(|(nstates, transitions, initial, outputs)| {
            let name = |i: usize| format!("q{i}");
            let mut protocol = Protocol::with_title(format!("random-{nstates}"));
            for i in 0..nstates {
                // Names are distinct by construction.
                let _ = protocol.add_state(name(i));
            }
            for ((a, b), (c, d)) in transitions {
                let (a, b, c, d) = (name(a), name(b), name(c), name(d));
                let _ = protocol.add_transition((a.as_str(), b.as_str()), (c.as_str(), d.as_str()));
            }
            for q in initial {
                let _ = protocol.add_input(name(q), &name(q));
            }
            for (q, out) in outputs.into_iter().enumerate() {
                if let Some(out) = out {
                    let _ = protocol.set_output(&name(q), out);
                }
            }
            protocol
        })
}
