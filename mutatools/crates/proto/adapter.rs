//! Descriptor-driven mutator construction.
//!
//! Translates a message descriptor into the engine's `TypeRef` language and hands it to the
//! regular factory chain. Messages already being expanded translate to back-references, so
//! recursive message graphs come out as `delayed` placeholders instead of infinite trees.

use std::rc::Rc;

use crate::api::{BuildError, BuildResult, FactoryChain, Mutator};
use crate::support::typeref::{
    Annotation, FloatWidth, IntWidth, TypePath, TypeRef,
};
use crate::value::Value;

use super::descriptor::{
    DescriptorPool, FieldDescriptor, FieldKind, FieldLabel, MessageDescriptor, MessageEntry,
    OneofDescriptor,
};

/// Default cap on repeated field lengths, the knob `repeated` fields are bounded by.
pub const DEFAULT_REPEATED_LIMIT: usize = 1000;

/// Builds the `TypeRef` tree for `message` out of `pool`.
pub fn message_type_ref(pool: &DescriptorPool, message: &str) -> BuildResult<TypeRef> {
    let mut expanding = Vec::new();
    let mut path = TypePath::root("Root");
    expand_message(pool, message, &mut expanding, &mut path)
}

/// Convenience entry point: descriptor straight to a root mutator on the standard chain.
pub fn build_message_mutator(
    pool: &DescriptorPool,
    message: &str,
) -> BuildResult<Rc<dyn Mutator>> {
    let ty = message_type_ref(pool, message)?;
    FactoryChain::standard().build_root(&ty)
}

fn expand_message(
    pool: &DescriptorPool,
    name: &str,
    expanding: &mut Vec<String>,
    path: &mut TypePath,
) -> BuildResult<TypeRef> {
    if expanding.iter().any(|n| n == name) {
        return Ok(TypeRef::recurse(name));
    }
    let Some(message) = pool.get(name) else {
        return Err(BuildError::UnknownMessage { path: path.render(), name: name.to_owned() });
    };
    expanding.push(name.to_owned());
    let result = expand_entries(pool, message, expanding, path);
    expanding.pop();
    result
}

fn expand_entries(
    pool: &DescriptorPool,
    message: &MessageDescriptor,
    expanding: &mut Vec<String>,
    path: &mut TypePath,
) -> BuildResult<TypeRef> {
    let mut fields = Vec::with_capacity(message.entries.len());
    for entry in &message.entries {
        match entry {
            MessageEntry::Field(field) => {
                path.push(field.name.clone());
                let ty = expand_field(pool, field, expanding, path);
                path.pop();
                fields.push((field.name.clone(), ty?));
            }
            MessageEntry::Oneof(oneof) => {
                path.push(format!("oneof:{}", oneof.name));
                let ty = expand_oneof(pool, &message.name, oneof, expanding, path);
                path.pop();
                fields.push((oneof.name.clone(), ty?));
            }
        }
    }
    Ok(TypeRef::record(message.name.clone(), fields))
}

fn expand_field(
    pool: &DescriptorPool,
    field: &FieldDescriptor,
    expanding: &mut Vec<String>,
    path: &mut TypePath,
) -> BuildResult<TypeRef> {
    let base = expand_kind(pool, &field.kind, expanding, path)?;
    Ok(match field.label {
        // Singular message fields carry presence in proto3, which also gives recursive
        // message chains their base case.
        FieldLabel::Singular if matches!(field.kind, FieldKind::Message(_)) => {
            TypeRef::optional(base)
        }
        FieldLabel::Singular => base,
        FieldLabel::Optional => TypeRef::optional(base),
        FieldLabel::Repeated => TypeRef::sequence(base)
            .with(Annotation::SizeRange { min: 0, max: DEFAULT_REPEATED_LIMIT }),
    })
}

fn expand_oneof(
    pool: &DescriptorPool,
    message_name: &str,
    oneof: &OneofDescriptor,
    expanding: &mut Vec<String>,
    path: &mut TypePath,
) -> BuildResult<TypeRef> {
    let mut arms = Vec::with_capacity(oneof.members.len() + 1);
    for member in &oneof.members {
        if member.label != FieldLabel::Singular {
            return Err(BuildError::Invalid {
                path: path.render(),
                message: format!("oneof member `{}` must be singular", member.name),
            });
        }
        path.push(member.name.clone());
        let ty = expand_kind(pool, &member.kind, expanding, path);
        path.pop();
        arms.push((member.name.clone(), ty?));
    }
    // Not setting any member is a state of its own.
    arms.push(("absent".to_owned(), TypeRef::unit()));
    Ok(TypeRef::variant(format!("{message_name}.{}", oneof.name), arms))
}

fn expand_kind(
    pool: &DescriptorPool,
    kind: &FieldKind,
    expanding: &mut Vec<String>,
    path: &mut TypePath,
) -> BuildResult<TypeRef> {
    Ok(match kind {
        FieldKind::Bool => TypeRef::boolean(),
        FieldKind::Int32 => TypeRef::int(IntWidth::I32),
        FieldKind::Int64 => TypeRef::int(IntWidth::I64),
        FieldKind::Float => TypeRef::float(FloatWidth::F32),
        FieldKind::Double => TypeRef::float(FloatWidth::F64),
        FieldKind::Bytes => TypeRef::bytes(),
        FieldKind::String => TypeRef::text(),
        FieldKind::Message(name) => expand_message(pool, name, expanding, path)?,
        FieldKind::Map { key, value } => {
            let key_ty = expand_kind(pool, key, expanding, path)?;
            let value_ty = expand_kind(pool, value, expanding, path)?;
            TypeRef::map(key_ty, value_ty)
                .with(Annotation::SizeRange { min: 0, max: DEFAULT_REPEATED_LIMIT })
        }
    })
}

/// Read-only view pairing a decoded message value with its descriptor, the shape the harness
/// consumes. Field lookup is by name over the declaration order the mutator tree used.
pub struct MessageView<'a> {
    descriptor: &'a MessageDescriptor,
    value: &'a Value,
}

impl<'a> MessageView<'a> {
    pub fn new(descriptor: &'a MessageDescriptor, value: &'a Value) -> Self {
        Self { descriptor, value }
    }

    /// The value of the named field or oneof group, if the message declares it.
    pub fn field(&self, name: &str) -> Option<&'a Value> {
        let Value::Record(items) = self.value else {
            return None;
        };
        self.descriptor
            .entries
            .iter()
            .position(|entry| match entry {
                MessageEntry::Field(field) => field.name == name,
                MessageEntry::Oneof(oneof) => oneof.name == name,
            })
            .and_then(|index| items.get(index))
    }
}
