//! # Api
//!
//! The two contracts everything else plugs into:
//!
//! - [`mutator`] - The capability set every mutator satisfies (`init`, `mutate`, `read`,
//!   `write`, `detach`, `debug_string`) plus the cycle guard threaded through recursive
//!   debug walks.
//! - [`factory`] - Partial mutator factories, the priority-ordered chain that composes them,
//!   and construction errors carrying the offending type path.

pub mod factory;
pub mod mutator;

pub use factory::{BuildContext, BuildError, BuildResult, FactoryChain, MutatorFactory};
pub use mutator::{CycleGuard, Mutator};
