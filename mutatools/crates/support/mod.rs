//! # Support
//!
//! Shared plumbing used throughout the engine:
//!
//! - [`preconditions`] - Construction-time validation helpers and the `engine_bug!` macro for
//!   states that can only be reached through an engine defect.
//! - [`typeref`] - The static description of an input type (`TypeRef`) that the factory chain
//!   is keyed on, together with its annotation set and the dotted error path.
//! - [`codec`] - Byte-level framing helpers: a total reader over a byte slice and unsigned
//!   LEB128 varints.

pub mod codec;
pub mod preconditions;
pub mod typeref;
