//! Byte-string mutation with size bounds.

use std::rc::Rc;

use strum::{EnumIter, IntoEnumIterator};

use crate::api::{BuildContext, BuildResult, CycleGuard, FactoryChain, Mutator, MutatorFactory};
use crate::engine_bug;
use crate::random::PseudoRandom;
use crate::support::codec::{write_varint, ByteReader};
use crate::support::preconditions::require;
use crate::support::typeref::{Annotations, TypeKind, TypePath, TypeRef};
use crate::value::Value;

/// Default byte-length cap when no `SizeRange` annotation is given.
pub const DEFAULT_MAX_BYTES: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
enum SpanOp {
    /// Splice random bytes in at a random position.
    Insert,
    /// Drain a random span.
    Delete,
    /// Fill a random span with fresh bytes.
    Overwrite,
    /// Redraw the whole string.
    Replace,
}

pub struct ByteStringMutator {
    size_min: usize,
    size_max: usize,
}

impl ByteStringMutator {
    pub fn new(annotations: &Annotations, path: &TypePath) -> BuildResult<Self> {
        let (size_min, size_max) = annotations.size_range().unwrap_or((0, DEFAULT_MAX_BYTES));
        Self::with_bounds(size_min, size_max, path)
    }

    pub fn with_bounds(size_min: usize, size_max: usize, path: &TypePath) -> BuildResult<Self> {
        require(size_min <= size_max, path, || {
            format!("size bounds [{size_min}, {size_max}] are not a valid interval")
        })?;
        require(size_max > 0, path, || {
            "a size bound of [0, 0] only admits the empty string, use a constant instead".into()
        })?;
        Ok(Self { size_min, size_max })
    }

    fn random_len(&self, prng: &mut dyn PseudoRandom) -> usize {
        prng.closed_range(self.size_min as i64, self.size_max as i64) as usize
    }

    fn random_bytes(&self, n: usize, prng: &mut dyn PseudoRandom) -> Vec<u8> {
        let mut buf = vec![0u8; n];
        prng.fill_bytes(&mut buf);
        buf
    }

    pub(crate) fn init_bytes(&self, prng: &mut dyn PseudoRandom) -> Vec<u8> {
        let len = self.random_len(prng);
        self.random_bytes(len, prng)
    }

    /// Applies one span operation, keeping the length inside the bounds. May be a no-op when
    /// the picked operation does not apply to the current length; callers loop until the
    /// value actually changed.
    pub(crate) fn apply_span_op(&self, bytes: &mut Vec<u8>, prng: &mut dyn PseudoRandom) {
        let ops: Vec<SpanOp> = SpanOp::iter().collect();
        match ops[prng.index_in(ops.len())] {
            SpanOp::Insert => {
                if bytes.len() < self.size_max {
                    let count =
                        prng.closed_range(1, (self.size_max - bytes.len()) as i64) as usize;
                    let at = prng.index_in(bytes.len() + 1);
                    let fresh = self.random_bytes(count, prng);
                    bytes.splice(at..at, fresh);
                }
            }
            SpanOp::Delete => {
                let deletable = bytes.len().saturating_sub(self.size_min);
                if deletable > 0 {
                    let at = prng.index_in(bytes.len());
                    let limit = deletable.min(bytes.len() - at);
                    let count = prng.closed_range(1, limit as i64) as usize;
                    bytes.drain(at..at + count);
                }
            }
            SpanOp::Overwrite => {
                if !bytes.is_empty() {
                    let at = prng.index_in(bytes.len());
                    let count = prng.closed_range(1, (bytes.len() - at) as i64) as usize;
                    let fresh = self.random_bytes(count, prng);
                    bytes[at..at + count].copy_from_slice(&fresh);
                }
            }
            SpanOp::Replace => {
                *bytes = self.init_bytes(prng);
            }
        }
    }

    pub(crate) fn clamp_len(&self, len: usize) -> usize {
        len.clamp(self.size_min, self.size_max)
    }

    pub(crate) fn size_min(&self) -> usize {
        self.size_min
    }

    pub(crate) fn size_max(&self) -> usize {
        self.size_max
    }

    fn expect_bytes<'v>(&self, value: &'v Value) -> &'v Vec<u8> {
        match value {
            Value::Bytes(v) => v,
            other => engine_bug!("byte string mutator got a {} value", other.kind_name()),
        }
    }
}

impl Mutator for ByteStringMutator {
    fn init(&self, prng: &mut dyn PseudoRandom) -> Value {
        Value::Bytes(self.init_bytes(prng))
    }

    fn mutate(&self, value: &mut Value, prng: &mut dyn PseudoRandom) {
        let previous = self.expect_bytes(value).clone();
        let Value::Bytes(bytes) = value else { unreachable!() };
        loop {
            self.apply_span_op(bytes, prng);
            if *bytes != previous {
                return;
            }
        }
    }

    fn read(&self, input: &mut ByteReader<'_>) -> Value {
        let len = usize::try_from(input.read_varint()).unwrap_or(usize::MAX);
        Value::Bytes(input.read_bytes(self.clamp_len(len)))
    }

    fn write(&self, value: &Value, out: &mut Vec<u8>) {
        let bytes = self.expect_bytes(value);
        write_varint(out, bytes.len() as u64);
        out.extend_from_slice(bytes);
    }

    fn detach(&self, value: &Value) -> Value {
        value.clone()
    }

    fn debug_string(&self, _guard: &mut CycleGuard) -> String {
        format!("bytes[{}, {}]", self.size_min, self.size_max)
    }
}

pub(crate) struct ByteStringFactory;

impl MutatorFactory for ByteStringFactory {
    fn try_create(
        &self,
        ty: &TypeRef,
        _chain: &FactoryChain,
        ctx: &mut BuildContext,
    ) -> Option<BuildResult<Rc<dyn Mutator>>> {
        matches!(ty.kind, TypeKind::Bytes).then(|| {
            ByteStringMutator::new(&ty.annotations, ctx.path())
                .map(|m| Rc::new(m) as Rc<dyn Mutator>)
        })
    }
}
