//! Packet layout model: what the code generator consumes.
//!
//! Layouts are built once by [`crate::builder`] and are read-only afterwards.
//! Field order is wire order.

use std::fmt;

/// Classification of a declaration by its annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    /// Plain nested type: no header, never dispatched.
    Struct,
    /// Header only.
    SimplePacket,
    /// Header followed by arbitrary fields.
    GenericPacket,
    /// Header followed by exactly one slice field.
    VlfPacket,
}

impl PacketKind {
    pub fn has_header(self) -> bool {
        self != PacketKind::Struct
    }
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PacketKind::Struct => "Struct",
            PacketKind::SimplePacket => "SimplePacket",
            PacketKind::GenericPacket => "Packet",
            PacketKind::VlfPacket => "VLFPacket",
        };
        f.write_str(name)
    }
}

/// The ten primitive keywords a field may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Byte,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    String,
}

impl Primitive {
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s {
            "byte" => Some(Primitive::Byte),
            "int8" => Some(Primitive::Int8),
            "int16" => Some(Primitive::Int16),
            "int32" => Some(Primitive::Int32),
            "int64" => Some(Primitive::Int64),
            "uint8" => Some(Primitive::Uint8),
            "uint16" => Some(Primitive::Uint16),
            "uint32" => Some(Primitive::Uint32),
            "uint64" => Some(Primitive::Uint64),
            "string" => Some(Primitive::String),
            _ => None,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Primitive::Byte => "byte",
            Primitive::Int8 => "int8",
            Primitive::Int16 => "int16",
            Primitive::Int32 => "int32",
            Primitive::Int64 => "int64",
            Primitive::Uint8 => "uint8",
            Primitive::Uint16 => "uint16",
            Primitive::Uint32 => "uint32",
            Primitive::Uint64 => "uint64",
            Primitive::String => "string",
        }
    }

    /// Encoded width in bytes; `None` for strings (length-prefixed).
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            Primitive::Byte | Primitive::Int8 | Primitive::Uint8 => Some(1),
            Primitive::Int16 | Primitive::Uint16 => Some(2),
            Primitive::Int32 | Primitive::Uint32 => Some(4),
            Primitive::Int64 | Primitive::Uint64 => Some(8),
            Primitive::String => None,
        }
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            Primitive::Int8 | Primitive::Int16 | Primitive::Int32 | Primitive::Int64
        )
    }

    pub fn rust_type(self) -> &'static str {
        match self {
            Primitive::Byte | Primitive::Uint8 => "u8",
            Primitive::Int8 => "i8",
            Primitive::Int16 => "i16",
            Primitive::Int32 => "i32",
            Primitive::Int64 => "i64",
            Primitive::Uint16 => "u16",
            Primitive::Uint32 => "u32",
            Primitive::Uint64 => "u64",
            Primitive::String => "String",
        }
    }
}

/// Element of an array or slice. Carries no container variant, so nesting
/// stops at one level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementKind {
    Primitive(Primitive),
    Struct(String),
}

impl ElementKind {
    pub fn type_name(&self) -> &str {
        match self {
            ElementKind::Primitive(p) => p.keyword(),
            ElementKind::Struct(name) => name.as_str(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Primitive(Primitive),
    /// Reference to a declared (or hoisted inline) struct.
    Struct(String),
    /// `[N]T`: `bound` is never put on the wire.
    Array { bound: usize, element: ElementKind },
    /// `[]T`: u32 element count, then the elements.
    Slice(ElementKind),
}

impl FieldKind {
    pub fn is_slice(&self) -> bool {
        matches!(self, FieldKind::Slice(_))
    }

    /// The struct this field embeds by value, directly or through an array.
    pub fn embedded_struct(&self) -> Option<&str> {
        match self {
            FieldKind::Struct(name)
            | FieldKind::Array {
                element: ElementKind::Struct(name),
                ..
            } => Some(name.as_str()),
            _ => None,
        }
    }

    /// Every struct this field refers to.
    pub fn referenced_struct(&self) -> Option<&str> {
        match self {
            FieldKind::Slice(ElementKind::Struct(name)) => Some(name.as_str()),
            other => other.embedded_struct(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLayout {
    name: String,
    kind: FieldKind,
    element_type_name: String,
}

impl FieldLayout {
    pub(crate) fn new(name: String, kind: FieldKind) -> Self {
        let element_type_name = match &kind {
            FieldKind::Primitive(p) => p.keyword().to_string(),
            FieldKind::Struct(name) => name.clone(),
            FieldKind::Array { element, .. } | FieldKind::Slice(element) => {
                element.type_name().to_string()
            }
        };
        FieldLayout {
            name,
            kind,
            element_type_name,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// Source-level type of the field, or of its elements for containers.
    pub fn element_type_name(&self) -> &str {
        &self.element_type_name
    }

    pub fn bound(&self) -> Option<usize> {
        match self.kind {
            FieldKind::Array { bound, .. } => Some(bound),
            _ => None,
        }
    }
}

/// Identifier from a packet annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketId {
    /// Case-folded identifier name as written in the annotation.
    pub name: String,
    pub value: u32,
}

impl PacketId {
    /// Name of the generated constant.
    pub fn const_name(&self) -> String {
        self.name.to_uppercase()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketLayout {
    name: String,
    kind: PacketKind,
    id: Option<PacketId>,
    fields: Vec<FieldLayout>,
}

impl PacketLayout {
    /// `id` must be `None` exactly when `kind` is [`PacketKind::Struct`].
    pub(crate) fn new(
        name: String,
        kind: PacketKind,
        id: Option<PacketId>,
        fields: Vec<FieldLayout>,
    ) -> Self {
        debug_assert_eq!(kind.has_header(), id.is_some());
        PacketLayout {
            name,
            kind,
            id,
            fields,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> PacketKind {
        self.kind
    }

    pub fn id(&self) -> Option<&PacketId> {
        self.id.as_ref()
    }

    pub fn numeric_id(&self) -> Option<u32> {
        self.id.as_ref().map(|id| id.value)
    }

    pub fn id_name(&self) -> Option<&str> {
        self.id.as_ref().map(|id| id.name.as_str())
    }

    pub fn fields(&self) -> &[FieldLayout] {
        &self.fields
    }

    pub fn is_packet(&self) -> bool {
        self.kind.has_header()
    }
}
