//! # Mutatools
//!
//! Structure-aware mutation engine for coverage-guided fuzzers. You describe the input shape
//! once (a [`TypeRef`], built by hand, with `#[derive(Shaped)]`, or from a message
//! descriptor) and get back a mutator that generates initial values, mutates values into
//! neighbors, and moves values to and from a stable byte form usable as a fuzz corpus entry.
//!
//! ## Modules
//!
//! - [`api`] - The `Mutator` contract and the factory chain assembling mutator trees.
//! - [`mutators`] - Built-in primitive mutators and combinators.
//! - [`proto`] - Descriptor-driven construction for protobuf-shaped messages.
//! - [`random`] - The deterministic `PseudoRandom` source threaded through every call.
//! - [`support`] - Type descriptions, validation, byte framing.
//! - [`value`] - The dynamic value representation handed to the harness.
//!
//! ## Example
//!
//! ```
//! use mutatools::{Annotation, FactoryChain, IntWidth, SeededRandom, TypeRef};
//!
//! let ty = TypeRef::record(
//!     "Input",
//!     vec![
//!         ("flag".to_owned(), TypeRef::boolean()),
//!         (
//!             "level".to_owned(),
//!             TypeRef::int(IntWidth::I32)
//!                 .with(Annotation::Range { min: Some(0), max: Some(100) }),
//!         ),
//!     ],
//! );
//! let mutator = FactoryChain::standard().build_root(&ty).unwrap();
//!
//! let mut prng = SeededRandom::new(0);
//! let mut value = mutator.init(&mut prng);
//! mutator.mutate(&mut value, &mut prng);
//!
//! let mut corpus_entry = Vec::new();
//! mutator.write(&value, &mut corpus_entry);
//! let decoded = mutator.read(&mut mutatools::ByteReader::new(&corpus_entry));
//! assert_eq!(decoded, value);
//! ```

pub mod api;
pub mod mutators;
pub mod proto;
pub mod random;
pub mod support;
pub mod value;

pub use api::{
    BuildContext, BuildError, BuildResult, CycleGuard, FactoryChain, Mutator, MutatorFactory,
};
pub use random::{PickOne, PseudoRandom, SeededRandom};
pub use support::codec::ByteReader;
pub use support::typeref::{
    Annotation, Annotations, FloatWidth, IntWidth, TypeKind, TypePath, TypeRef,
};
pub use value::Value;

/// Types with a compile-time [`TypeRef`]. Usually implemented with `#[derive(Shaped)]` from
/// the `shaped` crate; field types that are themselves structs/enums need to be `Shaped` too.
pub trait Shaped {
    fn type_ref() -> TypeRef;
}
