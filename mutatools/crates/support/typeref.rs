//! Static type descriptions.
//!
//! A [`TypeRef`] is what the factory chain dispatches on: a base kind plus a key-unique set of
//! annotations. It replaces the reflective type walking of instrumented runtimes with plain
//! values that can be built by hand, by the `shaped` derive, or by the protobuf-style adapter.

use std::fmt;

/// Natural width of an integral target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntWidth {
    I8,
    I16,
    I32,
    I64,
}

impl IntWidth {
    /// Number of bytes in the wire representation.
    #[inline]
    pub fn bytes(self) -> usize {
        match self {
            IntWidth::I8 => 1,
            IntWidth::I16 => 2,
            IntWidth::I32 => 4,
            IntWidth::I64 => 8,
        }
    }

    /// Smallest representable value.
    #[inline]
    pub fn natural_min(self) -> i64 {
        match self {
            IntWidth::I8 => i8::MIN as i64,
            IntWidth::I16 => i16::MIN as i64,
            IntWidth::I32 => i32::MIN as i64,
            IntWidth::I64 => i64::MIN,
        }
    }

    /// Largest representable value.
    #[inline]
    pub fn natural_max(self) -> i64 {
        match self {
            IntWidth::I8 => i8::MAX as i64,
            IntWidth::I16 => i16::MAX as i64,
            IntWidth::I32 => i32::MAX as i64,
            IntWidth::I64 => i64::MAX,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            IntWidth::I8 => "i8",
            IntWidth::I16 => "i16",
            IntWidth::I32 => "i32",
            IntWidth::I64 => "i64",
        }
    }
}

/// Width of a floating-point target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatWidth {
    F32,
    F64,
}

impl FloatWidth {
    #[inline]
    pub fn bytes(self) -> usize {
        match self {
            FloatWidth::F32 => 4,
            FloatWidth::F64 => 8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FloatWidth::F32 => "f32",
            FloatWidth::F64 => "f64",
        }
    }
}

/// Base kind of a [`TypeRef`].
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    Bool,
    Int(IntWidth),
    Float(FloatWidth),
    Bytes,
    Str,
    /// The single-value type. Builds a constant mutator; used for absent `oneof` arms.
    Unit,
    /// Fixed-arity record of named heterogeneous fields.
    Record { name: String, fields: Vec<(String, TypeRef)> },
    /// Tagged variant over named arms.
    Variant { name: String, arms: Vec<(String, TypeRef)> },
    /// Variable-length homogeneous sequence.
    Sequence(Box<TypeRef>),
    /// Presence-wrapped inner type.
    Optional(Box<TypeRef>),
    /// Key/value mapping, canonicalized by key.
    Map(Box<TypeRef>, Box<TypeRef>),
    /// Back-reference to an enclosing `Record`/`Variant` with the given name.
    Recurse(String),
}

/// Per-type metadata attached to a [`TypeRef`]. Keys are unique within one annotation set;
/// keys the engine does not recognize travel as [`Annotation::Custom`] and stay visible to
/// user-supplied factories.
#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    /// Narrows an integral domain. Absent sides fall back to the width's natural limits.
    Range { min: Option<i64>, max: Option<i64> },
    /// Forces an `Optional` to be always present.
    NotNull,
    /// Bounds the element count of sequences and the byte count of byte strings.
    SizeRange { min: usize, max: usize },
    /// Bounds the UTF-8 byte length of strings.
    Utf8Length { min: usize, max: usize },
    /// Opaque metadata for user factories.
    Custom { key: String, value: String },
}

impl Annotation {
    fn key(&self) -> &str {
        match self {
            Annotation::Range { .. } => "range",
            Annotation::NotNull => "not_null",
            Annotation::SizeRange { .. } => "size_range",
            Annotation::Utf8Length { .. } => "utf8_length",
            Annotation::Custom { key, .. } => key,
        }
    }
}

/// Key-unique annotation set. Inserting an annotation with an already-present key replaces the
/// previous one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotations(Vec<Annotation>);

impl Annotations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, annotation: Annotation) {
        self.0.retain(|a| a.key() != annotation.key());
        self.0.push(annotation);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.0.iter()
    }

    pub fn range(&self) -> Option<(Option<i64>, Option<i64>)> {
        self.0.iter().find_map(|a| match a {
            Annotation::Range { min, max } => Some((*min, *max)),
            _ => None,
        })
    }

    pub fn not_null(&self) -> bool {
        self.0.iter().any(|a| matches!(a, Annotation::NotNull))
    }

    pub fn size_range(&self) -> Option<(usize, usize)> {
        self.0.iter().find_map(|a| match a {
            Annotation::SizeRange { min, max } => Some((*min, *max)),
            _ => None,
        })
    }

    pub fn utf8_length(&self) -> Option<(usize, usize)> {
        self.0.iter().find_map(|a| match a {
            Annotation::Utf8Length { min, max } => Some((*min, *max)),
            _ => None,
        })
    }

    pub fn custom(&self, key: &str) -> Option<&str> {
        self.0.iter().find_map(|a| match a {
            Annotation::Custom { key: k, value } if k == key => Some(value.as_str()),
            _ => None,
        })
    }
}

/// An annotated type, the unit the factory chain is keyed on.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeRef {
    pub kind: TypeKind,
    pub annotations: Annotations,
}

impl TypeRef {
    pub fn new(kind: TypeKind) -> Self {
        Self { kind, annotations: Annotations::new() }
    }

    /// Attaches an annotation, replacing any previous one with the same key.
    pub fn with(mut self, annotation: Annotation) -> Self {
        self.annotations.insert(annotation);
        self
    }

    pub fn boolean() -> Self {
        Self::new(TypeKind::Bool)
    }

    pub fn int(width: IntWidth) -> Self {
        Self::new(TypeKind::Int(width))
    }

    pub fn float(width: FloatWidth) -> Self {
        Self::new(TypeKind::Float(width))
    }

    pub fn bytes() -> Self {
        Self::new(TypeKind::Bytes)
    }

    pub fn text() -> Self {
        Self::new(TypeKind::Str)
    }

    pub fn unit() -> Self {
        Self::new(TypeKind::Unit)
    }

    pub fn record(name: impl Into<String>, fields: Vec<(String, TypeRef)>) -> Self {
        Self::new(TypeKind::Record { name: name.into(), fields })
    }

    pub fn variant(name: impl Into<String>, arms: Vec<(String, TypeRef)>) -> Self {
        Self::new(TypeKind::Variant { name: name.into(), arms })
    }

    pub fn sequence(element: TypeRef) -> Self {
        Self::new(TypeKind::Sequence(Box::new(element)))
    }

    pub fn optional(inner: TypeRef) -> Self {
        Self::new(TypeKind::Optional(Box::new(inner)))
    }

    pub fn map(key: TypeRef, value: TypeRef) -> Self {
        Self::new(TypeKind::Map(Box::new(key), Box::new(value)))
    }

    pub fn recurse(name: impl Into<String>) -> Self {
        Self::new(TypeKind::Recurse(name.into()))
    }
}

/// Dotted construction path carried by build errors, e.g.
/// `Root.field_a[*].oneof:x`. Segments starting with `[` or `?` attach without a
/// separating dot.
#[derive(Debug, Clone, Default)]
pub struct TypePath(Vec<String>);

impl TypePath {
    pub fn root(name: impl Into<String>) -> Self {
        Self(vec![name.into()])
    }

    pub fn push(&mut self, segment: impl Into<String>) {
        self.0.push(segment.into());
    }

    pub fn pop(&mut self) {
        self.0.pop();
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, seg) in self.0.iter().enumerate() {
            if i > 0 && !seg.starts_with('[') && !seg.starts_with('?') {
                out.push('.');
            }
            out.push_str(seg);
        }
        out
    }
}

impl fmt::Display for TypePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
