//! Fixed-arity record combinator.

use std::rc::Rc;

use crate::api::mutator::mutator_id;
use crate::api::{BuildContext, BuildResult, CycleGuard, FactoryChain, Mutator, MutatorFactory};
use crate::engine_bug;
use crate::mutators::fixed::FixedMutator;
use crate::random::{PickOne, PseudoRandom};
use crate::support::codec::ByteReader;
use crate::support::typeref::{TypeKind, TypeRef};
use crate::value::Value;

pub struct ProductMutator {
    name: String,
    fields: Vec<(String, Rc<dyn Mutator>)>,
}

impl ProductMutator {
    pub fn new(name: impl Into<String>, fields: Vec<(String, Rc<dyn Mutator>)>) -> Self {
        Self { name: name.into(), fields }
    }

    fn expect_record<'v>(&self, value: &'v mut Value) -> &'v mut Vec<Value> {
        match value {
            Value::Record(items) => {
                if items.len() == self.fields.len() {
                    items
                } else {
                    engine_bug!(
                        "record mutator `{}` got {} fields, expected {}",
                        self.name,
                        items.len(),
                        self.fields.len()
                    )
                }
            }
            other => engine_bug!(
                "record mutator `{}` got a {} value",
                self.name,
                other.kind_name()
            ),
        }
    }
}

impl Mutator for ProductMutator {
    fn init(&self, prng: &mut dyn PseudoRandom) -> Value {
        Value::Record(self.fields.iter().map(|(_, m)| m.init(prng)).collect())
    }

    fn mutate(&self, value: &mut Value, prng: &mut dyn PseudoRandom) {
        let items = self.expect_record(value);
        // One uniform pick among the fields that can actually change.
        let mutable: Vec<usize> = (0..self.fields.len())
            .filter(|&i| !self.fields[i].1.is_constant())
            .collect();
        if mutable.is_empty() {
            engine_bug!("record mutator `{}` has no mutable field", self.name);
        }
        let field = *prng.pick_in(&mutable);
        self.fields[field].1.mutate(&mut items[field], prng);
    }

    fn read(&self, input: &mut ByteReader<'_>) -> Value {
        Value::Record(self.fields.iter().map(|(_, m)| m.read(input)).collect())
    }

    fn write(&self, value: &Value, out: &mut Vec<u8>) {
        let Value::Record(items) = value else {
            engine_bug!("record mutator `{}` got a {} value", self.name, value.kind_name());
        };
        for ((_, mutator), item) in self.fields.iter().zip(items) {
            mutator.write(item, out);
        }
    }

    fn detach(&self, value: &Value) -> Value {
        let Value::Record(items) = value else {
            engine_bug!("record mutator `{}` got a {} value", self.name, value.kind_name());
        };
        Value::Record(
            self.fields.iter().zip(items).map(|((_, m), item)| m.detach(item)).collect(),
        )
    }

    fn fixed_size(&self) -> Option<usize> {
        self.fields.iter().map(|(_, m)| m.fixed_size()).sum()
    }

    fn is_constant(&self) -> bool {
        self.fields.iter().all(|(_, m)| m.is_constant())
    }

    fn debug_string(&self, guard: &mut CycleGuard) -> String {
        let id = mutator_id(self);
        if !guard.enter(id) {
            return self.name.clone();
        }
        let body = self
            .fields
            .iter()
            .map(|(name, m)| format!("{}: {}", name, m.debug_string(guard)))
            .collect::<Vec<_>>()
            .join(", ");
        guard.leave(id);
        format!("{} {{{}}}", self.name, body)
    }
}

pub(crate) struct RecordFactory;

impl MutatorFactory for RecordFactory {
    fn try_create(
        &self,
        ty: &TypeRef,
        chain: &FactoryChain,
        ctx: &mut BuildContext,
    ) -> Option<BuildResult<Rc<dyn Mutator>>> {
        let TypeKind::Record { name, fields } = &ty.kind else {
            return None;
        };
        if fields.is_empty() {
            // An empty record has a single inhabitant; treat it like a constant.
            return Some(Ok(
                Rc::new(FixedMutator::new(Value::Record(Vec::new()), name)) as Rc<dyn Mutator>
            ));
        }
        let mut children = Vec::with_capacity(fields.len());
        for (field_name, field_ty) in fields {
            match chain.build_child(field_ty, ctx, field_name.clone()) {
                Ok(child) => children.push((field_name.clone(), child)),
                Err(err) => return Some(Err(err)),
            }
        }
        Some(Ok(Rc::new(ProductMutator::new(name.clone(), children)) as Rc<dyn Mutator>))
    }
}
