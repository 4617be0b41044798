//! Boolean mutation.

use std::rc::Rc;

use crate::api::{BuildContext, BuildResult, CycleGuard, FactoryChain, Mutator, MutatorFactory};
use crate::engine_bug;
use crate::random::PseudoRandom;
use crate::support::codec::ByteReader;
use crate::support::typeref::{TypeKind, TypeRef};
use crate::value::Value;

pub struct BoolMutator;

impl BoolMutator {
    fn expect_bool(&self, value: &Value) -> bool {
        match value {
            Value::Bool(v) => *v,
            other => engine_bug!("bool mutator got a {} value", other.kind_name()),
        }
    }
}

impl Mutator for BoolMutator {
    fn init(&self, prng: &mut dyn PseudoRandom) -> Value {
        Value::Bool(prng.choice())
    }

    fn mutate(&self, value: &mut Value, _prng: &mut dyn PseudoRandom) {
        // The domain has exactly two values, flipping is the only mutation.
        *value = Value::Bool(!self.expect_bool(value));
    }

    fn read(&self, input: &mut ByteReader<'_>) -> Value {
        Value::Bool(input.read_u8() & 1 == 1)
    }

    fn write(&self, value: &Value, out: &mut Vec<u8>) {
        out.push(self.expect_bool(value) as u8);
    }

    fn detach(&self, value: &Value) -> Value {
        value.clone()
    }

    fn fixed_size(&self) -> Option<usize> {
        Some(1)
    }

    fn debug_string(&self, _guard: &mut CycleGuard) -> String {
        "bool".to_owned()
    }
}

pub(crate) struct BoolFactory;

impl MutatorFactory for BoolFactory {
    fn try_create(
        &self,
        ty: &TypeRef,
        _chain: &FactoryChain,
        _ctx: &mut BuildContext,
    ) -> Option<BuildResult<Rc<dyn Mutator>>> {
        matches!(ty.kind, TypeKind::Bool).then(|| Ok(Rc::new(BoolMutator) as Rc<dyn Mutator>))
    }
}
