//! Map mutation.
//!
//! A map is a repeated list of `(key, value)` records canonicalized by key: the first entry
//! with a given key wins, later ones are dropped. Canonicalization runs on `read`, `init`
//! and `mutate` alike, so fresh values always round-trip.

use std::rc::Rc;

use crate::api::{BuildContext, BuildResult, CycleGuard, FactoryChain, Mutator, MutatorFactory};
use crate::engine_bug;
use crate::mutators::product::ProductMutator;
use crate::mutators::repeated::{RepeatedMutator, DEFAULT_MAX_ELEMENTS};
use crate::random::PseudoRandom;
use crate::support::codec::ByteReader;
use crate::support::preconditions::require;
use crate::support::typeref::{TypeKind, TypeRef};
use crate::value::Value;

pub struct MapMutator {
    entries: RepeatedMutator,
}

impl MapMutator {
    pub fn new(entries: RepeatedMutator) -> Self {
        Self { entries }
    }

    /// Keeps the first occurrence of each key, preserving entry order.
    fn canonicalize(value: &mut Value) {
        let Value::List(entries) = value else {
            engine_bug!("map mutator got a {} value", value.kind_name());
        };
        let mut seen: Vec<Value> = Vec::with_capacity(entries.len());
        entries.retain(|entry| {
            let Value::Record(kv) = entry else {
                engine_bug!("map entry is a {} value", entry.kind_name());
            };
            let key = &kv[0];
            if seen.contains(key) {
                false
            } else {
                seen.push(key.clone());
                true
            }
        });
    }
}

impl Mutator for MapMutator {
    fn init(&self, prng: &mut dyn PseudoRandom) -> Value {
        let mut value = self.entries.init(prng);
        Self::canonicalize(&mut value);
        value
    }

    fn mutate(&self, value: &mut Value, prng: &mut dyn PseudoRandom) {
        let previous = value.clone();
        loop {
            self.entries.mutate(value, prng);
            Self::canonicalize(value);
            if *value != previous {
                return;
            }
        }
    }

    fn read(&self, input: &mut ByteReader<'_>) -> Value {
        let mut value = self.entries.read(input);
        Self::canonicalize(&mut value);
        value
    }

    fn write(&self, value: &Value, out: &mut Vec<u8>) {
        self.entries.write(value, out);
    }

    fn detach(&self, value: &Value) -> Value {
        self.entries.detach(value)
    }

    fn is_constant(&self) -> bool {
        self.entries.is_constant()
    }

    fn debug_string(&self, guard: &mut CycleGuard) -> String {
        format!("map<{}>", self.entries.debug_string(guard))
    }
}

pub(crate) struct MapFactory;

impl MutatorFactory for MapFactory {
    fn try_create(
        &self,
        ty: &TypeRef,
        chain: &FactoryChain,
        ctx: &mut BuildContext,
    ) -> Option<BuildResult<Rc<dyn Mutator>>> {
        let TypeKind::Map(key, value) = &ty.kind else {
            return None;
        };
        if let Err(err) = require(
            matches!(key.kind, TypeKind::Bool | TypeKind::Int(_) | TypeKind::Str),
            ctx.path(),
            || "map keys must be bool, integral or string".into(),
        ) {
            return Some(Err(err));
        }
        let key_mutator = match chain.build_child(key, ctx, "[key]") {
            Ok(m) => m,
            Err(err) => return Some(Err(err)),
        };
        let value_mutator = match chain.build_child(value, ctx, "[value]") {
            Ok(m) => m,
            Err(err) => return Some(Err(err)),
        };
        let entry = Rc::new(ProductMutator::new(
            "entry",
            vec![("key".to_owned(), key_mutator), ("value".to_owned(), value_mutator)],
        ));
        let (size_min, size_max) =
            ty.annotations.size_range().unwrap_or((0, DEFAULT_MAX_ELEMENTS));
        Some(
            RepeatedMutator::new(entry, size_min, size_max, ctx.path())
                .map(|entries| Rc::new(MapMutator::new(entries)) as Rc<dyn Mutator>),
        )
    }
}
