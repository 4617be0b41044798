//! Message descriptors.
//!
//! A minimal, serde-friendly descriptor model in the shape of protobuf message definitions.
//! Pools are plain data, so fuzzers can embed them in code or load them from JSON files the
//! same way config-driven fuzzers load their grammar configs.

use serde::{Deserialize, Serialize};

/// A set of message descriptors addressable by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DescriptorPool {
    pub messages: Vec<MessageDescriptor>,
}

impl DescriptorPool {
    pub fn new(messages: Vec<MessageDescriptor>) -> Self {
        Self { messages }
    }

    pub fn get(&self, name: &str) -> Option<&MessageDescriptor> {
        self.messages.iter().find(|m| m.name == name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDescriptor {
    pub name: String,
    /// Fields and oneof groups in declaration order.
    pub entries: Vec<MessageEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageEntry {
    Field(FieldDescriptor),
    Oneof(OneofDescriptor),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(default)]
    pub label: FieldLabel,
    pub kind: FieldKind,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldLabel {
    #[default]
    Singular,
    Optional,
    Repeated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Bool,
    Int32,
    Int64,
    Float,
    Double,
    Bytes,
    String,
    /// Reference to another message in the pool.
    Message(String),
    /// `map<key, value>`; keys must be bool, integral or string.
    Map { key: Box<FieldKind>, value: Box<FieldKind> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneofDescriptor {
    pub name: String,
    /// Members must be singular.
    pub members: Vec<FieldDescriptor>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_lookup_by_name() {
        let pool = DescriptorPool::new(vec![MessageDescriptor {
            name: "Ping".into(),
            entries: vec![MessageEntry::Field(FieldDescriptor {
                name: "seq".into(),
                label: FieldLabel::Singular,
                kind: FieldKind::Int64,
            })],
        }]);
        assert!(pool.get("Ping").is_some());
        assert!(pool.get("Pong").is_none());
    }
}
