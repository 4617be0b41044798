//! # Mutators
//!
//! The built-in mutators, leaves first:
//!
//! - [`boolean`], [`integral`], [`float`], [`bytes`], [`text`] - Primitive domains.
//! - [`product`], [`sum`], [`optional`], [`repeated`] - Combinators over sub-mutators.
//! - [`fixed`] - The constant mutator backing unit types and empty records.
//! - [`delayed`] - The placeholder that breaks construction-time recursion.
//!
//! Every file also hosts the factory that builds its mutator from a `TypeRef`;
//! [`standard_factories`] wires them up in priority order.

pub mod boolean;
pub mod bytes;
pub mod delayed;
pub mod fixed;
pub mod float;
pub mod integral;
pub mod optional;
pub mod product;
pub mod repeated;
pub mod sum;
pub mod text;

pub mod tests;

use crate::api::MutatorFactory;
use crate::proto::map::MapFactory;

/// The built-in factory chain contents, covering every `TypeKind`. Order matters only for
/// user factories prepended in front; the built-ins match disjoint kinds.
pub(crate) fn standard_factories() -> Vec<Box<dyn MutatorFactory>> {
    vec![
        Box::new(fixed::UnitFactory),
        Box::new(boolean::BoolFactory),
        Box::new(integral::IntegralFactory),
        Box::new(float::FloatFactory),
        Box::new(bytes::ByteStringFactory),
        Box::new(text::TextFactory),
        Box::new(optional::OptionalFactory),
        Box::new(repeated::SequenceFactory),
        Box::new(MapFactory),
        Box::new(product::RecordFactory),
        Box::new(sum::VariantFactory),
    ]
}
