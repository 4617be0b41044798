//! Constant mutator.

use std::rc::Rc;

use crate::api::{BuildContext, BuildResult, CycleGuard, FactoryChain, Mutator, MutatorFactory};
use crate::engine_bug;
use crate::random::PseudoRandom;
use crate::support::codec::ByteReader;
use crate::support::typeref::{TypeKind, TypeRef};
use crate::value::Value;

/// Always produces the same value and occupies zero bytes on the wire. Used for absent
/// `oneof` arms and empty records.
pub struct FixedMutator {
    value: Value,
    name: String,
}

impl FixedMutator {
    pub fn new(value: Value, name: impl Into<String>) -> Self {
        Self { value, name: name.into() }
    }
}

impl Mutator for FixedMutator {
    fn init(&self, _prng: &mut dyn PseudoRandom) -> Value {
        self.value.clone()
    }

    fn mutate(&self, _value: &mut Value, _prng: &mut dyn PseudoRandom) {
        // A domain of size one has no neighbors; a caller reaching this skipped is_constant.
        engine_bug!("mutate called on constant mutator `{}`", self.name);
    }

    fn read(&self, _input: &mut ByteReader<'_>) -> Value {
        self.value.clone()
    }

    fn write(&self, _value: &Value, _out: &mut Vec<u8>) {}

    fn detach(&self, _value: &Value) -> Value {
        self.value.clone()
    }

    fn fixed_size(&self) -> Option<usize> {
        Some(0)
    }

    fn is_constant(&self) -> bool {
        true
    }

    fn debug_string(&self, _guard: &mut CycleGuard) -> String {
        format!("const {}", self.name)
    }
}

pub(crate) struct UnitFactory;

impl MutatorFactory for UnitFactory {
    fn try_create(
        &self,
        ty: &TypeRef,
        _chain: &FactoryChain,
        _ctx: &mut BuildContext,
    ) -> Option<BuildResult<Rc<dyn Mutator>>> {
        matches!(ty.kind, TypeKind::Unit)
            .then(|| Ok(Rc::new(FixedMutator::new(Value::Unit, "unit")) as Rc<dyn Mutator>))
    }
}
