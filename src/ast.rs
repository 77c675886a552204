//! Declarations as read from a packet description file.
//!
//! This is the contract between the front-end and the rest of the compiler: a
//! sequence of named declarations, each with the comment lines attached above it
//! and an ordered list of `(name, type expression)` fields. Any parser that can
//! produce it through [`DeclarationSource`] can drive layout building.

use std::fmt;

/// 1-based location in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Root of a parsed description file.
#[derive(Debug, Clone, Default)]
pub struct SourceFile {
    pub package: Option<String>,
    pub declarations: Vec<Declaration>,
}

/// One `type Name struct { ... }` declaration.
#[derive(Debug, Clone)]
pub struct Declaration {
    pub name: String,
    /// Raw comment lines directly above the declaration, markers included.
    pub doc: Vec<String>,
    pub fields: Vec<FieldDecl>,
    pub position: Position,
}

#[derive(Debug, Clone)]
pub struct FieldDecl {
    /// `None` for an embedded (anonymous) field.
    pub name: Option<String>,
    pub type_expr: TypeExpr,
    pub position: Position,
}

/// Field type expression, before classification.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    Named(String),
    Array { len: usize, element: Box<TypeExpr> },
    Slice(Box<TypeExpr>),
    /// Inline anonymous `struct { ... }` body.
    Struct(Vec<FieldDecl>),
    Unsupported(UnsupportedShape),
}

// Positions are ignored.
impl PartialEq for FieldDecl {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.type_expr == other.type_expr
    }
}

/// Type shapes the front-end recognises but no packet field may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsupportedShape {
    Map,
    Pointer,
    Function,
    Channel,
    Interface,
}

impl fmt::Display for UnsupportedShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UnsupportedShape::Map => "map",
            UnsupportedShape::Pointer => "pointer",
            UnsupportedShape::Function => "function",
            UnsupportedShape::Channel => "channel",
            UnsupportedShape::Interface => "interface",
        };
        f.write_str(name)
    }
}

/// Minimal declaration stream consumed by [`crate::Protocol::build`].
pub trait DeclarationSource {
    fn package(&self) -> Option<&str>;
    fn declarations(&self) -> &[Declaration];
}

impl DeclarationSource for SourceFile {
    fn package(&self) -> Option<&str> {
        self.package.as_deref()
    }

    fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }
}

impl DeclarationSource for [Declaration] {
    fn package(&self) -> Option<&str> {
        None
    }

    fn declarations(&self) -> &[Declaration] {
        self
    }
}
