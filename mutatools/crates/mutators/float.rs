//! Floating-point mutation.
//!
//! Same strategy as the integral mutator, transplanted onto IEEE-754 representations:
//! special-value jumps, single-bit flips of the raw representation, and fresh draws from
//! random bits. Values produced at `f32` width are always exactly representable in 32 bits.

use std::rc::Rc;

use crate::api::{BuildContext, BuildResult, CycleGuard, FactoryChain, Mutator, MutatorFactory};
use crate::engine_bug;
use crate::random::{PickOne, PseudoRandom};
use crate::support::codec::ByteReader;
use crate::support::typeref::{FloatWidth, TypeKind, TypeRef};
use crate::value::Value;

pub struct FloatMutator {
    width: FloatWidth,
    special_values: Vec<f64>,
}

impl FloatMutator {
    pub fn new(width: FloatWidth) -> Self {
        let special_values = match width {
            FloatWidth::F32 => vec![
                0.0,
                -0.0f32 as f64,
                1.0,
                -1.0,
                f32::NAN as f64,
                f32::INFINITY as f64,
                f32::NEG_INFINITY as f64,
                f32::MIN as f64,
                f32::MAX as f64,
            ],
            FloatWidth::F64 => vec![
                0.0,
                -0.0,
                1.0,
                -1.0,
                f64::NAN,
                f64::INFINITY,
                f64::NEG_INFINITY,
                f64::MIN,
                f64::MAX,
            ],
        };
        Self { width, special_values }
    }

    /// Representation of `value` at this mutator's width.
    fn to_bits(&self, value: f64) -> u64 {
        match self.width {
            FloatWidth::F32 => (value as f32).to_bits() as u64,
            FloatWidth::F64 => value.to_bits(),
        }
    }

    fn from_bits(&self, bits: u64) -> f64 {
        match self.width {
            FloatWidth::F32 => f32::from_bits(bits as u32) as f64,
            FloatWidth::F64 => f64::from_bits(bits),
        }
    }

    /// Uniform draw over all representations of this width.
    fn random_draw(&self, prng: &mut dyn PseudoRandom) -> f64 {
        let mut buf = [0u8; 8];
        let n = self.width.bytes();
        prng.fill_bytes(&mut buf[..n]);
        let mut bits: u64 = 0;
        for &byte in &buf[..n] {
            bits = (bits << 8) | byte as u64;
        }
        self.from_bits(bits)
    }

    fn init_value(&self, prng: &mut dyn PseudoRandom) -> f64 {
        let sentinel = self.special_values.len();
        let choice = prng.closed_range(0, sentinel as i64) as usize;
        if choice < sentinel {
            self.special_values[choice]
        } else {
            self.random_draw(prng)
        }
    }

    fn mutate_value(&self, value: f64, prng: &mut dyn PseudoRandom) -> f64 {
        let previous = self.to_bits(value);
        let mut value = value;
        loop {
            value = if prng.true_in_one_out_of(4) {
                *prng.pick_in(&self.special_values)
            } else if prng.choice() {
                // Flip one bit of the representation: sign, exponent or mantissa.
                let bit = prng.index_in(8 * self.width.bytes());
                self.from_bits(self.to_bits(value) ^ (1u64 << bit))
            } else {
                self.random_draw(prng)
            };
            if self.to_bits(value) != previous {
                return value;
            }
        }
    }

    fn expect_float(&self, value: &Value) -> f64 {
        match value {
            Value::Float(v) => *v,
            other => engine_bug!("float mutator got a {} value", other.kind_name()),
        }
    }
}

impl Mutator for FloatMutator {
    fn init(&self, prng: &mut dyn PseudoRandom) -> Value {
        Value::Float(self.init_value(prng))
    }

    fn mutate(&self, value: &mut Value, prng: &mut dyn PseudoRandom) {
        let current = self.expect_float(value);
        *value = Value::Float(self.mutate_value(current, prng));
    }

    fn read(&self, input: &mut ByteReader<'_>) -> Value {
        let n = self.width.bytes();
        let mut bits: u64 = 0;
        for byte in input.read_bytes(n) {
            bits = (bits << 8) | byte as u64;
        }
        Value::Float(self.from_bits(bits))
    }

    fn write(&self, value: &Value, out: &mut Vec<u8>) {
        let bits = self.to_bits(self.expect_float(value));
        let bytes = bits.to_be_bytes();
        out.extend_from_slice(&bytes[8 - self.width.bytes()..]);
    }

    fn detach(&self, value: &Value) -> Value {
        value.clone()
    }

    fn fixed_size(&self) -> Option<usize> {
        Some(self.width.bytes())
    }

    fn debug_string(&self, _guard: &mut CycleGuard) -> String {
        self.width.name().to_owned()
    }
}

pub(crate) struct FloatFactory;

impl MutatorFactory for FloatFactory {
    fn try_create(
        &self,
        ty: &TypeRef,
        _chain: &FactoryChain,
        _ctx: &mut BuildContext,
    ) -> Option<BuildResult<Rc<dyn Mutator>>> {
        let TypeKind::Float(width) = ty.kind else {
            return None;
        };
        Some(Ok(Rc::new(FloatMutator::new(width)) as Rc<dyn Mutator>))
    }
}
