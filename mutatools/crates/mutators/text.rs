//! UTF-8 string mutation.
//!
//! Runs the byte-string engine underneath and repairs the result into valid UTF-8, so the
//! harness always sees a well-formed string while the corpus still explores invalid
//! encodings at the byte level. Bounds are UTF-8 byte lengths.

use std::rc::Rc;

use crate::api::{BuildContext, BuildResult, CycleGuard, FactoryChain, Mutator, MutatorFactory};
use crate::engine_bug;
use crate::mutators::bytes::ByteStringMutator;
use crate::random::PseudoRandom;
use crate::support::codec::{write_varint, ByteReader};
use crate::support::typeref::{Annotations, TypeKind, TypePath, TypeRef};
use crate::value::Value;

/// Default UTF-8 byte-length cap when no `Utf8Length` annotation is given.
pub const DEFAULT_MAX_UTF8_BYTES: usize = 4096;

pub struct TextMutator {
    bytes: ByteStringMutator,
}

impl TextMutator {
    pub fn new(annotations: &Annotations, path: &TypePath) -> BuildResult<Self> {
        let (min, max) = annotations.utf8_length().unwrap_or((0, DEFAULT_MAX_UTF8_BYTES));
        Ok(Self { bytes: ByteStringMutator::with_bounds(min, max, path)? })
    }

    /// Turns raw bytes into a valid string inside the byte-length bounds. Lossy decoding can
    /// only grow the byte length (invalid sequences become U+FFFD), so the result is trimmed
    /// at char boundaries and padded back up if trimming undershot the minimum.
    fn repair(&self, raw: &[u8]) -> String {
        let mut text = String::from_utf8_lossy(raw).into_owned();
        while text.len() > self.bytes.size_max() {
            text.pop();
        }
        while text.len() < self.bytes.size_min() {
            text.push('a');
        }
        text
    }

    fn expect_str<'v>(&self, value: &'v Value) -> &'v String {
        match value {
            Value::Str(v) => v,
            other => engine_bug!("text mutator got a {} value", other.kind_name()),
        }
    }
}

impl Mutator for TextMutator {
    fn init(&self, prng: &mut dyn PseudoRandom) -> Value {
        Value::Str(self.repair(&self.bytes.init_bytes(prng)))
    }

    fn mutate(&self, value: &mut Value, prng: &mut dyn PseudoRandom) {
        let previous = self.expect_str(value).clone();
        let mut raw = previous.clone().into_bytes();
        loop {
            self.bytes.apply_span_op(&mut raw, prng);
            let candidate = self.repair(&raw);
            if candidate != previous {
                *value = Value::Str(candidate);
                return;
            }
            raw = candidate.into_bytes();
        }
    }

    fn read(&self, input: &mut ByteReader<'_>) -> Value {
        let len = usize::try_from(input.read_varint()).unwrap_or(usize::MAX);
        let raw = input.read_bytes(self.bytes.clamp_len(len));
        Value::Str(self.repair(&raw))
    }

    fn write(&self, value: &Value, out: &mut Vec<u8>) {
        let text = self.expect_str(value);
        write_varint(out, text.len() as u64);
        out.extend_from_slice(text.as_bytes());
    }

    fn detach(&self, value: &Value) -> Value {
        value.clone()
    }

    fn debug_string(&self, _guard: &mut CycleGuard) -> String {
        format!("str[{}, {}]", self.bytes.size_min(), self.bytes.size_max())
    }
}

pub(crate) struct TextFactory;

impl MutatorFactory for TextFactory {
    fn try_create(
        &self,
        ty: &TypeRef,
        _chain: &FactoryChain,
        ctx: &mut BuildContext,
    ) -> Option<BuildResult<Rc<dyn Mutator>>> {
        matches!(ty.kind, TypeKind::Str).then(|| {
            TextMutator::new(&ty.annotations, ctx.path()).map(|m| Rc::new(m) as Rc<dyn Mutator>)
        })
    }
}
