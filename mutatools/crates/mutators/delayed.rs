//! Recursion placeholder.
//!
//! When the factory chain meets a type that is still under construction higher up the stack,
//! it hands out one of these instead of recursing forever. The slot is patched with a weak
//! reference to the finished ancestor, so mutator trees never hold ownership cycles.

use std::cell::OnceCell;
use std::rc::{Rc, Weak};

use crate::api::{CycleGuard, Mutator};
use crate::engine_bug;
use crate::random::PseudoRandom;
use crate::support::codec::ByteReader;
use crate::value::Value;

pub struct DelayedMutator {
    name: String,
    slot: OnceCell<Weak<dyn Mutator>>,
}

impl DelayedMutator {
    pub(crate) fn unresolved(name: &str) -> Self {
        Self { name: name.to_owned(), slot: OnceCell::new() }
    }

    /// Fills the slot. Errs when it was already filled.
    pub(crate) fn resolve(&self, target: Weak<dyn Mutator>) -> Result<(), ()> {
        self.slot.set(target).map_err(|_| ())
    }

    fn target(&self) -> Rc<dyn Mutator> {
        let Some(weak) = self.slot.get() else {
            engine_bug!("delayed mutator `{}` used before resolution", self.name);
        };
        let Some(target) = weak.upgrade() else {
            engine_bug!("delayed mutator `{}` outlived its target", self.name);
        };
        target
    }
}

impl Mutator for DelayedMutator {
    fn init(&self, prng: &mut dyn PseudoRandom) -> Value {
        self.target().init(prng)
    }

    fn mutate(&self, value: &mut Value, prng: &mut dyn PseudoRandom) {
        self.target().mutate(value, prng);
    }

    fn read(&self, input: &mut ByteReader<'_>) -> Value {
        self.target().read(input)
    }

    fn write(&self, value: &Value, out: &mut Vec<u8>) {
        self.target().write(value, out);
    }

    fn detach(&self, value: &Value) -> Value {
        self.target().detach(value)
    }

    fn fixed_size(&self) -> Option<usize> {
        // Conservative: asking the target would recurse through the cycle this placeholder
        // breaks.
        None
    }

    fn is_constant(&self) -> bool {
        // A cycle necessarily passes through an optional, variant or sequence, none of which
        // is constant.
        false
    }

    fn debug_string(&self, guard: &mut CycleGuard) -> String {
        match self.slot.get().and_then(Weak::upgrade) {
            // The target prints its declared name only when the guard says we are already
            // inside it.
            Some(target) => target.debug_string(guard),
            None => format!("<unresolved {}>", self.name),
        }
    }
}
