//! Bounded-range integral mutation.
//!
//! Bounds come from the width's natural limits narrowed by a `Range` annotation. Mutation
//! mixes bit flips, short random walks and full-range draws; decoding folds out-of-range raw
//! integers back into range while preserving as many raw bits as possible, so byte-level
//! corpus mutations stay productive under narrow ranges (clamping would not).

use std::rc::Rc;

use crate::api::{BuildContext, BuildResult, CycleGuard, FactoryChain, Mutator, MutatorFactory};
use crate::engine_bug;
use crate::random::PseudoRandom;
use crate::support::codec::ByteReader;
use crate::support::preconditions::require;
use crate::support::typeref::{Annotations, IntWidth, TypeKind, TypePath, TypeRef};
use crate::value::Value;

const RANDOM_WALK_RANGE: i64 = 5;

pub struct IntegralMutator {
    width: IntWidth,
    min: i64,
    max: i64,
    largest_mutable_bit_positive: u32,
    largest_mutable_bit_negative: u32,
    /// Sorted, deduplicated intersection of `{0, 1, min, max}` with `[min, max]`.
    special_values: Vec<i64>,
}

impl IntegralMutator {
    pub fn new(width: IntWidth, annotations: &Annotations, path: &TypePath) -> BuildResult<Self> {
        let mut min = width.natural_min();
        let mut max = width.natural_max();
        if let Some((lo, hi)) = annotations.range() {
            if let Some(lo) = lo {
                require(lo >= width.natural_min(), path, || {
                    format!("Range.min={lo} is out of range for {}", width.name())
                })?;
                min = lo;
            }
            if let Some(hi) = hi {
                require(hi <= width.natural_max(), path, || {
                    format!("Range.max={hi} is out of range for {}", width.name())
                })?;
                max = hi;
            }
        }
        require(min <= max, path, || format!("[{min}, {max}] is not a valid interval"))?;
        require(min != max, path, || {
            format!("[{min}, {max}] can not be mutated, use a constant instead")
        })?;

        let (largest_mutable_bit_negative, largest_mutable_bit_positive) = if min >= 0 {
            (0, bit_width(min ^ max))
        } else if max < 0 {
            (bit_width(min ^ max), 0)
        } else {
            (bit_width(!min), bit_width(max))
        };

        let mut special_values: Vec<i64> = [0, 1, min, max]
            .into_iter()
            .filter(|&v| v >= min && v <= max)
            .collect();
        special_values.sort_unstable();
        special_values.dedup();

        Ok(Self {
            width,
            min,
            max,
            largest_mutable_bit_positive,
            largest_mutable_bit_negative,
            special_values,
        })
    }

    fn init_value(&self, prng: &mut dyn PseudoRandom) -> i64 {
        // Each special value gets one slot, the last slot is a uniform draw.
        let sentinel = self.special_values.len();
        let choice = prng.closed_range(0, sentinel as i64) as usize;
        if choice < sentinel {
            self.special_values[choice]
        } else {
            prng.closed_range(self.min, self.max)
        }
    }

    fn mutate_value(&self, value: i64, prng: &mut dyn PseudoRandom) -> i64 {
        let previous = value;
        let mut value = value;
        // Mutate in a loop to verify that we really mutated.
        loop {
            value = if prng.true_in_one_out_of(4) {
                self.bit_flip(value, prng)
            } else if prng.choice() {
                self.random_walk(value, prng)
            } else {
                prng.closed_range(self.min, self.max)
            };
            if value != previous {
                return value;
            }
        }
    }

    fn bit_flip(&self, value: i64, prng: &mut dyn PseudoRandom) -> i64 {
        let bits = if value >= 0 {
            self.largest_mutable_bit_positive
        } else {
            self.largest_mutable_bit_negative
        };
        if bits == 0 {
            // No flippable bit on this side of zero (e.g. [-5, 0] with value 0).
            return prng.closed_range(self.min, self.max);
        }
        let flipped = value ^ (1i64 << prng.index_in(bits as usize));
        if flipped > self.max || flipped < self.min {
            prng.closed_range(self.min, self.max)
        } else {
            flipped
        }
    }

    fn random_walk(&self, value: i64, prng: &mut dyn PseudoRandom) -> i64 {
        // Halving both bounds before comparing prevents overflow in `max - min`.
        if self.max / 2 - self.min / 2 <= RANDOM_WALK_RANGE {
            prng.closed_range(self.min, self.max)
        } else {
            // Here `min + RANDOM_WALK_RANGE` and `max - RANDOM_WALK_RANGE` can not overflow.
            let mut lower = self.min;
            if value > lower + RANDOM_WALK_RANGE {
                lower = value - RANDOM_WALK_RANGE;
            }
            let mut upper = self.max;
            if value < upper - RANDOM_WALK_RANGE {
                upper = value + RANDOM_WALK_RANGE;
            }
            prng.closed_range(lower, upper)
        }
    }

    fn force(&self, value: i64) -> i64 {
        // Fast path for the common case.
        if value >= self.min && value <= self.max {
            return value;
        }
        force_in_range(value, self.min, self.max)
    }

    fn expect_int(&self, value: &Value) -> i64 {
        match value {
            Value::Int(v) => *v,
            other => engine_bug!("integral mutator got a {} value", other.kind_name()),
        }
    }
}

/// Folds `value` into `[min, max]` while preserving as many of its bits as possible.
pub(crate) fn force_in_range(value: i64, min: i64, max: i64) -> i64 {
    let range = max.wrapping_sub(min);
    if range > 0 {
        min + (value.wrapping_sub(min) % range).abs()
    } else if value >= min && value <= max {
        value
    } else {
        // [min, max] covers at least half of the signed domain, so one shift by the wrapped
        // range lands inside it.
        value.wrapping_add(range)
    }
}

fn bit_width(value: i64) -> u32 {
    64 - value.leading_zeros()
}

impl Mutator for IntegralMutator {
    fn init(&self, prng: &mut dyn PseudoRandom) -> Value {
        Value::Int(self.init_value(prng))
    }

    fn mutate(&self, value: &mut Value, prng: &mut dyn PseudoRandom) {
        let current = self.expect_int(value);
        *value = Value::Int(self.mutate_value(current, prng));
    }

    fn read(&self, input: &mut ByteReader<'_>) -> Value {
        Value::Int(self.force(input.read_be(self.width.bytes())))
    }

    fn write(&self, value: &Value, out: &mut Vec<u8>) {
        let bytes = self.expect_int(value).to_be_bytes();
        out.extend_from_slice(&bytes[8 - self.width.bytes()..]);
    }

    fn detach(&self, value: &Value) -> Value {
        value.clone()
    }

    fn fixed_size(&self) -> Option<usize> {
        Some(self.width.bytes())
    }

    fn debug_string(&self, _guard: &mut CycleGuard) -> String {
        if self.min == self.width.natural_min() && self.max == self.width.natural_max() {
            self.width.name().to_owned()
        } else {
            format!("{} in [{}, {}]", self.width.name(), self.min, self.max)
        }
    }
}

pub(crate) struct IntegralFactory;

impl MutatorFactory for IntegralFactory {
    fn try_create(
        &self,
        ty: &TypeRef,
        _chain: &FactoryChain,
        ctx: &mut BuildContext,
    ) -> Option<BuildResult<Rc<dyn Mutator>>> {
        let TypeKind::Int(width) = ty.kind else {
            return None;
        };
        Some(
            IntegralMutator::new(width, &ty.annotations, ctx.path())
                .map(|m| Rc::new(m) as Rc<dyn Mutator>),
        )
    }
}
