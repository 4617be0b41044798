//! # Proto
//!
//! Descriptor-driven construction in the shape of protobuf messages:
//!
//! - [`descriptor`] - A serde-friendly pool of message descriptors (fields, labels, oneofs,
//!   maps) that can be embedded in code or loaded from JSON.
//! - [`adapter`] - Translation from descriptors to the engine's `TypeRef` language, plus a
//!   read-only [`adapter::MessageView`] for harnesses.
//! - [`map`] - The map mutator: repeated key/value records canonicalized by key.

pub mod adapter;
pub mod descriptor;
pub mod map;

pub use adapter::{build_message_mutator, message_type_ref, MessageView, DEFAULT_REPEATED_LIMIT};
pub use descriptor::{
    DescriptorPool, FieldDescriptor, FieldKind, FieldLabel, MessageDescriptor, MessageEntry,
    OneofDescriptor,
};
