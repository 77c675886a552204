//! Errors raised while turning declarations into generated code.

use crate::ast::{Position, UnsupportedShape};

/// First error wins: no output is produced once any of these is returned.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Parse(String),
    #[error("{declaration}: invalid packet annotation: {message}")]
    Annotation {
        declaration: String,
        message: String,
    },
    #[error("field `{field}` at {position}: unsupported {shape} type")]
    UnsupportedFieldType {
        field: String,
        position: Position,
        shape: UnsupportedShape,
    },
    #[error("{declaration}: anonymous field at {position} (only named fields are allowed)")]
    AnonymousField {
        declaration: String,
        position: Position,
    },
    #[error("{declaration}: invalid VLFPacket layout: {reason}")]
    InvalidVlfPacketLayout { declaration: String, reason: String },
    #[error("Duplicate type name: {0}")]
    DuplicateType(String),
    #[error("{declaration}.{field}: `{type_name}` is not a declared struct")]
    UnknownType {
        declaration: String,
        field: String,
        type_name: String,
    },
    #[error("{0} contains itself without a slice in between")]
    RecursiveType(String),
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
}
