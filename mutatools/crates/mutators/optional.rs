//! Presence combinator.

use std::rc::Rc;

use crate::api::{BuildContext, BuildResult, CycleGuard, FactoryChain, Mutator, MutatorFactory};
use crate::engine_bug;
use crate::random::PseudoRandom;
use crate::support::codec::ByteReader;
use crate::support::typeref::{TypeKind, TypeRef};
use crate::value::Value;

pub struct OptionalMutator {
    inner: Rc<dyn Mutator>,
}

impl OptionalMutator {
    pub fn new(inner: Rc<dyn Mutator>) -> Self {
        Self { inner }
    }
}

impl Mutator for OptionalMutator {
    fn init(&self, prng: &mut dyn PseudoRandom) -> Value {
        if prng.choice() {
            Value::Optional(Some(Box::new(self.inner.init(prng))))
        } else {
            Value::Optional(None)
        }
    }

    fn mutate(&self, value: &mut Value, prng: &mut dyn PseudoRandom) {
        let Value::Optional(slot) = value else {
            engine_bug!("optional mutator got a {} value", value.kind_name());
        };
        match slot {
            None => *slot = Some(Box::new(self.inner.init(prng))),
            Some(inner) => {
                // Either drop the value or move it; a constant inner can only be dropped.
                if prng.choice() || self.inner.is_constant() {
                    *slot = None;
                } else {
                    self.inner.mutate(inner, prng);
                }
            }
        }
    }

    fn read(&self, input: &mut ByteReader<'_>) -> Value {
        if input.read_u8() & 1 == 1 {
            Value::Optional(Some(Box::new(self.inner.read(input))))
        } else {
            Value::Optional(None)
        }
    }

    fn write(&self, value: &Value, out: &mut Vec<u8>) {
        let Value::Optional(slot) = value else {
            engine_bug!("optional mutator got a {} value", value.kind_name());
        };
        match slot {
            Some(inner) => {
                out.push(1);
                self.inner.write(inner, out);
            }
            None => out.push(0),
        }
    }

    fn detach(&self, value: &Value) -> Value {
        let Value::Optional(slot) = value else {
            engine_bug!("optional mutator got a {} value", value.kind_name());
        };
        Value::Optional(slot.as_ref().map(|inner| Box::new(self.inner.detach(inner))))
    }

    fn debug_string(&self, guard: &mut CycleGuard) -> String {
        format!("optional<{}>", self.inner.debug_string(guard))
    }
}

pub(crate) struct OptionalFactory;

impl MutatorFactory for OptionalFactory {
    fn try_create(
        &self,
        ty: &TypeRef,
        chain: &FactoryChain,
        ctx: &mut BuildContext,
    ) -> Option<BuildResult<Rc<dyn Mutator>>> {
        let TypeKind::Optional(inner) = &ty.kind else {
            return None;
        };
        // NotNull drops the presence wrapper entirely: the value is always there and the
        // framing is the inner framing.
        if ty.annotations.not_null() {
            return Some(chain.build_child(inner, ctx, "?"));
        }
        Some(
            chain
                .build_child(inner, ctx, "?")
                .map(|child| Rc::new(OptionalMutator::new(child)) as Rc<dyn Mutator>),
        )
    }
}
