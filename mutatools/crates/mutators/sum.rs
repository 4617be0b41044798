//! Tagged-variant combinator.

use std::rc::Rc;

use crate::api::mutator::mutator_id;
use crate::api::{BuildContext, BuildResult, CycleGuard, FactoryChain, Mutator, MutatorFactory};
use crate::engine_bug;
use crate::random::PseudoRandom;
use crate::support::codec::ByteReader;
use crate::support::preconditions::require;
use crate::support::typeref::{TypeKind, TypeRef};
use crate::value::Value;

pub struct SumMutator {
    name: String,
    arms: Vec<(String, Rc<dyn Mutator>)>,
}

impl SumMutator {
    pub fn new(name: impl Into<String>, arms: Vec<(String, Rc<dyn Mutator>)>) -> Self {
        Self { name: name.into(), arms }
    }

    fn expect_variant<'v>(&self, value: &'v mut Value) -> (&'v mut usize, &'v mut Value) {
        match value {
            Value::Variant(tag, inner) => {
                if *tag < self.arms.len() {
                    (tag, &mut **inner)
                } else {
                    engine_bug!(
                        "variant mutator `{}` got tag {} out of {} arms",
                        self.name,
                        tag,
                        self.arms.len()
                    )
                }
            }
            other => engine_bug!(
                "variant mutator `{}` got a {} value",
                self.name,
                other.kind_name()
            ),
        }
    }
}

impl Mutator for SumMutator {
    fn init(&self, prng: &mut dyn PseudoRandom) -> Value {
        let tag = prng.index_in(self.arms.len());
        Value::Variant(tag, Box::new(self.arms[tag].1.init(prng)))
    }

    fn mutate(&self, value: &mut Value, prng: &mut dyn PseudoRandom) {
        let k = self.arms.len();
        let (tag, inner) = self.expect_variant(value);
        // Switching always changes the value (different tag); a constant current arm forces
        // the switch since its inner value can not move.
        let switch =
            k > 1 && (prng.true_in_one_out_of(k + 1) || self.arms[*tag].1.is_constant());
        if switch {
            let mut next = prng.index_in(k - 1);
            if next >= *tag {
                next += 1;
            }
            *tag = next;
            *inner = self.arms[next].1.init(prng);
        } else {
            if self.arms[*tag].1.is_constant() {
                engine_bug!("variant mutator `{}` has a single constant arm", self.name);
            }
            self.arms[*tag].1.mutate(inner, prng);
        }
    }

    fn read(&self, input: &mut ByteReader<'_>) -> Value {
        let tag = input.read_u8() as usize % self.arms.len();
        Value::Variant(tag, Box::new(self.arms[tag].1.read(input)))
    }

    fn write(&self, value: &Value, out: &mut Vec<u8>) {
        let Value::Variant(tag, inner) = value else {
            engine_bug!("variant mutator `{}` got a {} value", self.name, value.kind_name());
        };
        out.push(*tag as u8);
        self.arms[*tag].1.write(inner, out);
    }

    fn detach(&self, value: &Value) -> Value {
        let Value::Variant(tag, inner) = value else {
            engine_bug!("variant mutator `{}` got a {} value", self.name, value.kind_name());
        };
        Value::Variant(*tag, Box::new(self.arms[*tag].1.detach(inner)))
    }

    fn fixed_size(&self) -> Option<usize> {
        // Fixed only when every arm has the same fixed inner width.
        let first = self.arms.first().and_then(|(_, m)| m.fixed_size())?;
        self.arms
            .iter()
            .all(|(_, m)| m.fixed_size() == Some(first))
            .then_some(1 + first)
    }

    fn is_constant(&self) -> bool {
        self.arms.len() == 1 && self.arms[0].1.is_constant()
    }

    fn debug_string(&self, guard: &mut CycleGuard) -> String {
        let id = mutator_id(self);
        if !guard.enter(id) {
            return self.name.clone();
        }
        let body = self
            .arms
            .iter()
            .map(|(name, m)| format!("{}: {}", name, m.debug_string(guard)))
            .collect::<Vec<_>>()
            .join(" | ");
        guard.leave(id);
        format!("{} {{{}}}", self.name, body)
    }
}

pub(crate) struct VariantFactory;

impl MutatorFactory for VariantFactory {
    fn try_create(
        &self,
        ty: &TypeRef,
        chain: &FactoryChain,
        ctx: &mut BuildContext,
    ) -> Option<BuildResult<Rc<dyn Mutator>>> {
        let TypeKind::Variant { name, arms } = &ty.kind else {
            return None;
        };
        let checks = require(!arms.is_empty(), ctx.path(), || {
            format!("variant `{name}` has no arms")
        })
        .and_then(|()| {
            require(arms.len() <= 256, ctx.path(), || {
                format!("variant `{name}` has {} arms, the tag byte admits 256", arms.len())
            })
        });
        if let Err(err) = checks {
            return Some(Err(err));
        }
        let mut children = Vec::with_capacity(arms.len());
        for (arm_name, arm_ty) in arms {
            match chain.build_child(arm_ty, ctx, format!("oneof:{arm_name}")) {
                Ok(child) => children.push((arm_name.clone(), child)),
                Err(err) => return Some(Err(err)),
            }
        }
        Some(Ok(Rc::new(SumMutator::new(name.clone(), children)) as Rc<dyn Mutator>))
    }
}
