//! The mutator contract.

use std::collections::HashSet;
use std::fmt;

use crate::random::PseudoRandom;
use crate::support::codec::ByteReader;
use crate::value::Value;

/// A typed mutation capability over one value shape.
///
/// Mutators are built once per fuzz run from a static `TypeRef`, then invoked across millions
/// of calls. They hold no mutable state of their own; all randomness comes from the
/// driver-owned [`PseudoRandom`] threaded through each call, so runs replay exactly under a
/// fixed seed. The engine guarantees at most one call in flight per mutator.
pub trait Mutator {
    /// Produces a fresh in-domain value.
    fn init(&self, prng: &mut dyn PseudoRandom) -> Value;

    /// Replaces `value` with a neighboring value. Must actually change it whenever the domain
    /// has more than one element; calling this on a single-value domain is an engine bug.
    fn mutate(&self, value: &mut Value, prng: &mut dyn PseudoRandom);

    /// Decodes a value from driver bytes. Total: any input yields some in-domain value, short
    /// reads are zero-padded and unconsumed bytes stay for the parent.
    fn read(&self, input: &mut ByteReader<'_>) -> Value;

    /// Encodes `value` in the same framing `read` expects.
    fn write(&self, value: &Value, out: &mut Vec<u8>);

    /// Returns a copy of `value` sharing no mutable state with it.
    fn detach(&self, value: &Value) -> Value;

    /// Byte width of the wire form when it is the same for every value.
    fn fixed_size(&self) -> Option<usize> {
        None
    }

    fn has_fixed_size(&self) -> bool {
        self.fixed_size().is_some()
    }

    /// True when the value domain has exactly one element. Combinators skip constant children
    /// when choosing what to mutate.
    fn is_constant(&self) -> bool {
        false
    }

    /// Human description of this mutator. `guard` tracks the mutators currently being
    /// described; a node that is already on the walk prints as its declared name only.
    fn debug_string(&self, guard: &mut CycleGuard) -> String;
}

impl dyn Mutator {
    /// Entry point for debug descriptions, seeding an empty cycle guard.
    pub fn to_debug_string(&self) -> String {
        self.debug_string(&mut CycleGuard::default())
    }
}

impl fmt::Debug for dyn Mutator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_debug_string())
    }
}

/// Identity of a mutator for cycle detection: the address of its allocation.
pub fn mutator_id<M: Mutator + ?Sized>(mutator: &M) -> usize {
    mutator as *const M as *const () as usize
}

/// The set of mutator identities currently being visited by a recursive walk. Threaded by the
/// caller instead of living in the mutators, so reentrant walks stay correct.
#[derive(Default)]
pub struct CycleGuard {
    visiting: HashSet<usize>,
}

impl CycleGuard {
    /// Marks `id` as being visited. Returns false when it already was, i.e. the walk would
    /// recurse forever.
    pub fn enter(&mut self, id: usize) -> bool {
        self.visiting.insert(id)
    }

    pub fn leave(&mut self, id: usize) {
        self.visiting.remove(&id);
    }
}
