//! Variable-length sequence combinator.

use std::rc::Rc;

use strum::{EnumIter, IntoEnumIterator};

use crate::api::{BuildContext, BuildResult, CycleGuard, FactoryChain, Mutator, MutatorFactory};
use crate::engine_bug;
use crate::random::{PickOne, PseudoRandom};
use crate::support::codec::{write_varint, ByteReader};
use crate::support::preconditions::require;
use crate::support::typeref::{TypeKind, TypePath, TypeRef};
use crate::value::Value;

/// Default element-count cap when no `SizeRange` annotation is given.
pub const DEFAULT_MAX_ELEMENTS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
enum ListOp {
    Append,
    Drop,
    Duplicate,
    SwapAdjacent,
    MutateOne,
}

impl ListOp {
    /// In-place element mutation is where most of the coverage comes from, so it gets the
    /// heaviest weight.
    fn weight(self) -> u32 {
        match self {
            ListOp::MutateOne => 3,
            _ => 1,
        }
    }
}

pub struct RepeatedMutator {
    inner: Rc<dyn Mutator>,
    size_min: usize,
    size_max: usize,
}

impl RepeatedMutator {
    pub fn new(
        inner: Rc<dyn Mutator>,
        size_min: usize,
        size_max: usize,
        path: &TypePath,
    ) -> BuildResult<Self> {
        require(size_min <= size_max, path, || {
            format!("size bounds [{size_min}, {size_max}] are not a valid interval")
        })?;
        require(size_max > 0, path, || {
            "a size bound of [0, 0] only admits the empty list, use a constant instead".into()
        })?;
        Ok(Self { inner, size_min, size_max })
    }

    fn applicable_ops(&self, len: usize) -> Vec<(u32, ListOp)> {
        ListOp::iter()
            .filter(|op| match op {
                ListOp::Append => len < self.size_max,
                ListOp::Drop => len > self.size_min && len > 0,
                ListOp::Duplicate => len > 0 && len < self.size_max,
                ListOp::SwapAdjacent => len >= 2,
                ListOp::MutateOne => len > 0 && !self.inner.is_constant(),
            })
            .map(|op| (op.weight(), op))
            .collect()
    }

    fn apply_op(&self, items: &mut Vec<Value>, prng: &mut dyn PseudoRandom) {
        let ops = self.applicable_ops(items.len());
        if ops.is_empty() {
            engine_bug!("list mutator over a single-value domain");
        }
        match *prng.pick_weighted(&ops) {
            ListOp::Append => items.push(self.inner.init(prng)),
            ListOp::Drop => {
                let at = prng.index_in(items.len());
                items.remove(at);
            }
            ListOp::Duplicate => {
                let at = prng.index_in(items.len());
                let copy = items[at].clone();
                items.push(copy);
            }
            ListOp::SwapAdjacent => {
                let at = prng.index_in(items.len() - 1);
                items.swap(at, at + 1);
            }
            ListOp::MutateOne => {
                let at = prng.index_in(items.len());
                self.inner.mutate(&mut items[at], prng);
            }
        }
    }

    fn expect_list<'v>(&self, value: &'v mut Value) -> &'v mut Vec<Value> {
        match value {
            Value::List(items) => items,
            other => engine_bug!("list mutator got a {} value", other.kind_name()),
        }
    }
}

impl Mutator for RepeatedMutator {
    fn init(&self, prng: &mut dyn PseudoRandom) -> Value {
        let len = prng.closed_range(self.size_min as i64, self.size_max as i64) as usize;
        Value::List((0..len).map(|_| self.inner.init(prng)).collect())
    }

    fn mutate(&self, value: &mut Value, prng: &mut dyn PseudoRandom) {
        if self.is_constant() {
            engine_bug!("list mutator over a single-value domain");
        }
        let items = self.expect_list(value);
        let previous = items.clone();
        loop {
            self.apply_op(items, prng);
            if *items != previous {
                return;
            }
        }
    }

    fn read(&self, input: &mut ByteReader<'_>) -> Value {
        let raw = usize::try_from(input.read_varint()).unwrap_or(usize::MAX);
        let len = raw.clamp(self.size_min, self.size_max);
        let mut items = Vec::with_capacity(len);
        if len > 0 && input.remaining() == 0 && self.inner.has_fixed_size() {
            // Exhausted input with a fixed-size element: every further read yields the same
            // zero-padded value, so decode it once and replicate.
            let element = self.inner.read(input);
            items.resize(len, element);
        } else {
            for _ in 0..len {
                items.push(self.inner.read(input));
            }
        }
        Value::List(items)
    }

    fn write(&self, value: &Value, out: &mut Vec<u8>) {
        let Value::List(items) = value else {
            engine_bug!("list mutator got a {} value", value.kind_name());
        };
        write_varint(out, items.len() as u64);
        for item in items {
            self.inner.write(item, out);
        }
    }

    fn detach(&self, value: &Value) -> Value {
        let Value::List(items) = value else {
            engine_bug!("list mutator got a {} value", value.kind_name());
        };
        Value::List(items.iter().map(|item| self.inner.detach(item)).collect())
    }

    fn is_constant(&self) -> bool {
        self.size_min == self.size_max && self.inner.is_constant()
    }

    fn debug_string(&self, guard: &mut CycleGuard) -> String {
        format!(
            "list<{}>[{}, {}]",
            self.inner.debug_string(guard),
            self.size_min,
            self.size_max
        )
    }
}

pub(crate) struct SequenceFactory;

impl MutatorFactory for SequenceFactory {
    fn try_create(
        &self,
        ty: &TypeRef,
        chain: &FactoryChain,
        ctx: &mut BuildContext,
    ) -> Option<BuildResult<Rc<dyn Mutator>>> {
        let TypeKind::Sequence(element) = &ty.kind else {
            return None;
        };
        let (size_min, size_max) =
            ty.annotations.size_range().unwrap_or((0, DEFAULT_MAX_ELEMENTS));
        Some(chain.build_child(element, ctx, "[*]").and_then(|child| {
            RepeatedMutator::new(child, size_min, size_max, ctx.path())
                .map(|m| Rc::new(m) as Rc<dyn Mutator>)
        }))
    }
}
