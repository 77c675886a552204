//! Rust code generation from a resolved [`Protocol`].
//!
//! Output is a flat item list (no inner attributes), so it can be written to a
//! module file or pulled in with `include!`. It depends only on `std` and on the
//! stream runtime named by [`GenerateOptions::runtime_path`].

use std::collections::HashSet;

use crate::error::Error;
use crate::factory;
use crate::layout::{ElementKind, FieldKind, FieldLayout, PacketKind, PacketLayout, Primitive};
use crate::protocol::Protocol;
use crate::writer::CodeWriter;

/// Names generated code defines or relies on unqualified.
const RESERVED_TYPE_NAMES: &[&str] = &[
    "Packet",
    "PacketHeader",
    "PacketCache",
    "PacketFactory",
    "FactoryError",
    "ReadStream",
    "WriteStream",
    "StreamError",
    "Box",
    "Default",
    "Option",
    "Result",
    "Send",
    "String",
    "Sync",
    "Vec",
];

/// Identifiers that cannot name a generated type: path roots, `Self`, the
/// blank identifier and the primitive types generated signatures spell unqualified.
const RESERVED_IDENTS: &[&str] = &[
    "Self", "self", "super", "crate", "std", "core", "_", "bool", "char", "str", "u8", "u16",
    "u32", "u64", "u128", "usize", "i8", "i16", "i32", "i64", "i128", "isize", "f32", "f64",
];

const RUST_KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do",
    "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in",
    "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "static", "struct", "trait", "true", "try", "type", "typeof", "unsafe", "unsized",
    "use", "virtual", "where", "while", "yield",
];

/// Options for a generation run.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Path generated code imports `ReadStream`, `WriteStream`, `StreamError`
    /// and `wire_len` from.
    pub runtime_path: String,
    /// Shown in the banner of the generated file.
    pub source_name: Option<String>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        GenerateOptions {
            runtime_path: "packetgen::stream".to_string(),
            source_name: None,
        }
    }
}

pub struct Generator<'a> {
    protocol: &'a Protocol,
    options: &'a GenerateOptions,
}

impl<'a> Generator<'a> {
    pub fn new(protocol: &'a Protocol, options: &'a GenerateOptions) -> Self {
        Generator { protocol, options }
    }

    pub fn generate(&self) -> Result<String, Error> {
        for layout in self.protocol.layouts() {
            let name = layout.name();
            if RESERVED_TYPE_NAMES.contains(&name)
                || RESERVED_IDENTS.contains(&name)
                || RUST_KEYWORDS.contains(&name)
            {
                return Err(Error::DuplicateType(layout.name().to_string()));
            }
        }

        let mut w = CodeWriter::new();
        self.emit_prelude(&mut w);
        self.emit_id_constants(&mut w);
        emit_packet_trait(&mut w);
        emit_header(&mut w);
        for layout in self.protocol.layouts() {
            tracing::debug!(layout = layout.name(), kind = %layout.kind(), "emitting");
            emit_layout(&mut w, layout);
        }
        factory::emit(&mut w, self.protocol.id_table());

        let output = w.finish();
        tracing::info!(
            layouts = self.protocol.layouts().len(),
            packets = self.protocol.id_table().len(),
            bytes = output.len(),
            "generation complete"
        );
        Ok(output)
    }

    fn emit_prelude(&self, w: &mut CodeWriter) {
        match &self.options.source_name {
            Some(name) => w.line(format!("// Code generated by packetgen from {}. DO NOT EDIT.", name)),
            None => w.line("// Code generated by packetgen. DO NOT EDIT."),
        };
        if let Some(package) = self.protocol.package() {
            w.line(format!("// Package: {}", package));
        }
        w.blank();
        w.line(format!(
            "use {}::{{wire_len, ReadStream, StreamError, WriteStream}};",
            self.options.runtime_path
        ));
        w.blank();

        w.lines(FACTORY_ERROR);
        w.blank();
        w.lines(STRING_HELPERS);
        w.blank();
    }

    fn emit_id_constants(&self, w: &mut CodeWriter) {
        let table = self.protocol.id_table();
        if table.is_empty() {
            return;
        }
        for entry in table {
            w.line(format!("pub const {}: u32 = {:#010x};", entry.const_name, entry.value));
        }
        w.blank();
    }
}

const FACTORY_ERROR: &str = r#"#[derive(Debug)]
pub enum FactoryError {
    Stream(StreamError),
    UnknownPacketKind(u32),
}

impl std::fmt::Display for FactoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FactoryError::Stream(e) => write!(f, "stream error: {}", e),
            FactoryError::UnknownPacketKind(kind) => write!(f, "unknown packet kind {:#010x}", kind),
        }
    }
}

impl std::error::Error for FactoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FactoryError::Stream(e) => Some(e),
            FactoryError::UnknownPacketKind(_) => None,
        }
    }
}

impl From<StreamError> for FactoryError {
    fn from(e: StreamError) -> Self {
        FactoryError::Stream(e)
    }
}"#;

const STRING_HELPERS: &str = r#"#[allow(dead_code)]
fn read_string(stream: &mut dyn ReadStream) -> Result<String, StreamError> {
    let len = stream.read_u32()? as usize;
    Ok(String::from_utf8(stream.read_buf(len)?)?)
}

#[allow(dead_code)]
fn write_string(stream: &mut dyn WriteStream, value: &str) -> Result<(), StreamError> {
    stream.write_u32(wire_len(value.len())?)?;
    stream.write_buf(value.as_bytes())
}"#;

fn emit_packet_trait(w: &mut CodeWriter) {
    w.lines(
        r#"/// Behaviour shared by every message that travels with a [`PacketHeader`].
pub trait Packet: std::fmt::Debug + Send {
    fn header(&self) -> &PacketHeader;
    fn header_mut(&mut self) -> &mut PacketHeader;
    /// Encoded size in bytes, header included.
    fn length(&self) -> usize;
    /// Decode the body. The header has already been consumed by the caller.
    fn read(&mut self, stream: &mut dyn ReadStream) -> Result<(), StreamError>;
    /// Encode the header, then the body.
    fn write(&self, stream: &mut dyn WriteStream) -> Result<(), StreamError>;
    fn as_any(&self) -> &dyn std::any::Any;
    fn into_any(self: Box<Self>) -> Box<dyn std::any::Any + Send>;

    fn id(&self) -> u32 {
        self.header().id
    }

    fn set_id(&mut self, id: u32) {
        self.header_mut().id = id;
    }

    fn ack(&self) -> u32 {
        self.header().ack
    }

    fn set_ack(&mut self, ack: u32) {
        self.header_mut().ack = ack;
    }

    fn token(&self) -> u32 {
        self.header().token
    }

    fn set_token(&mut self, token: u32) {
        self.header_mut().token = token;
    }

    fn packet_type(&self) -> u32 {
        self.header().packet_type
    }

    /// Store [`Packet::length`] into the header. Fails if it does not fit the
    /// 32-bit `len` field.
    fn adjust_length(&mut self) -> Result<(), StreamError> {
        let len = wire_len(self.length())?;
        self.header_mut().len = len;
        Ok(())
    }
}"#,
    );
    w.blank();
}

fn emit_header(w: &mut CodeWriter) {
    const FIELDS: [&str; 6] = ["id", "packet_type", "len", "version", "ack", "token"];

    w.line("#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]");
    w.block("pub struct PacketHeader", |w| {
        for f in FIELDS {
            w.line(format!("pub {}: u32,", f));
        }
    });
    w.blank();
    w.block("impl PacketHeader", |w| {
        w.line("/// Reported header size. The six fields themselves encode to 24 bytes.");
        w.line("pub const LENGTH: usize = 36;");
        w.blank();
        w.block("pub fn length(&self) -> usize", |w| {
            w.line("Self::LENGTH");
        });
        w.blank();
        w.block(
            "pub fn read(&mut self, stream: &mut dyn ReadStream) -> Result<(), StreamError>",
            |w| {
                for f in FIELDS {
                    w.line(format!("self.{} = stream.read_u32()?;", f));
                }
                w.line("Ok(())");
            },
        );
        w.blank();
        w.block(
            "pub fn write(&self, stream: &mut dyn WriteStream) -> Result<(), StreamError>",
            |w| {
                for f in FIELDS {
                    w.line(format!("stream.write_u32(self.{})?;", f));
                }
                w.line("Ok(())");
            },
        );
    });
    w.blank();
}

fn emit_layout(w: &mut CodeWriter, layout: &PacketLayout) {
    let idents = field_idents(layout);
    let fields: Vec<(&FieldLayout, &str)> = layout
        .fields()
        .iter()
        .zip(idents.iter().map(String::as_str))
        .collect();
    let name = layout.name();

    if let Some(id) = layout.id() {
        w.line(format!("/// {} `{}`.", layout.kind(), id.const_name()));
    }
    w.line("#[derive(Debug, Clone, PartialEq, Eq)]");
    w.block(format!("pub struct {}", name), |w| {
        if layout.is_packet() {
            w.line("pub header: PacketHeader,");
        }
        for (field, ident) in &fields {
            w.line(format!("pub {}: {},", ident, rust_type(field.kind())));
        }
    });
    w.blank();

    w.block(format!("impl Default for {}", name), |w| {
        w.block("fn default() -> Self", |w| {
            w.block(name, |w| {
                if layout.is_packet() {
                    w.line("header: PacketHeader::default(),");
                }
                for (field, ident) in &fields {
                    w.line(format!("{}: {},", ident, default_value(field.kind())));
                }
            });
        });
    });
    w.blank();

    match layout.id() {
        Some(id) => {
            let const_name = id.const_name();
            w.block(format!("impl {}", name), |w| {
                w.block("pub fn new() -> Self", |w| {
                    w.line("let mut packet = Self::default();");
                    w.line(format!("packet.header.packet_type = {};", const_name));
                    w.line("packet");
                });
            });
            w.blank();
            w.block(format!("impl Packet for {}", name), |w| {
                w.block("fn header(&self) -> &PacketHeader", |w| {
                    w.line("&self.header");
                });
                w.blank();
                w.block("fn header_mut(&mut self) -> &mut PacketHeader", |w| {
                    w.line("&mut self.header");
                });
                w.blank();
                emit_codec_fns(w, layout.kind(), &fields, "");
                w.blank();
                w.block("fn as_any(&self) -> &dyn std::any::Any", |w| {
                    w.line("self");
                });
                w.blank();
                w.block("fn into_any(self: Box<Self>) -> Box<dyn std::any::Any + Send>", |w| {
                    w.line("self");
                });
            });
        }
        None => {
            w.block(format!("impl {}", name), |w| {
                emit_codec_fns(w, layout.kind(), &fields, "pub ");
                w.blank();
                w.line("/// No header to update.");
                w.block("pub fn adjust_length(&mut self) -> Result<(), StreamError>", |w| {
                    w.line("Ok(())");
                });
            });
        }
    }
    w.blank();
}

/// `length`, `read` and `write`, in that order.
fn emit_codec_fns(w: &mut CodeWriter, kind: PacketKind, fields: &[(&FieldLayout, &str)], vis: &str) {
    let has_header = kind.has_header();

    w.block(format!("{}fn length(&self) -> usize", vis), |w| {
        let base = if has_header { "PacketHeader::LENGTH" } else { "0" };
        let terms: Vec<String> = fields
            .iter()
            .filter_map(|(field, ident)| length_term(field.kind(), ident))
            .collect();
        if kind == PacketKind::SimplePacket {
            w.line("self.header.length()");
        } else if terms.is_empty() {
            w.line(base);
        } else {
            w.line(format!("let mut len = {};", base));
            for term in terms {
                w.line(format!("len += {};", term));
            }
            w.line("len");
        }
    });
    w.blank();

    let stream = if fields.is_empty() { "_stream" } else { "stream" };
    w.block(
        format!(
            "{}fn read(&mut self, {}: &mut dyn ReadStream) -> Result<(), StreamError>",
            vis, stream
        ),
        |w| {
            for (field, ident) in fields {
                emit_read_field(w, field.kind(), ident);
            }
            w.line("Ok(())");
        },
    );
    w.blank();

    let stream = if fields.is_empty() && !has_header { "_stream" } else { "stream" };
    w.block(
        format!(
            "{}fn write(&self, {}: &mut dyn WriteStream) -> Result<(), StreamError>",
            vis, stream
        ),
        |w| {
            if has_header {
                w.line("self.header.write(stream)?;");
            }
            for (field, ident) in fields {
                emit_write_field(w, field.kind(), ident);
            }
            w.line("Ok(())");
        },
    );
}

fn length_term(kind: &FieldKind, ident: &str) -> Option<String> {
    let term = match kind {
        FieldKind::Primitive(Primitive::String) => format!("4 + self.{}.len()", ident),
        FieldKind::Primitive(p) => p.fixed_width().unwrap_or_default().to_string(),
        FieldKind::Struct(_) => format!("self.{}.length()", ident),
        FieldKind::Slice(element) => format!("4 + {}", elements_length(element, ident, None)),
        FieldKind::Array { bound, element } => {
            let term = elements_length(element, ident, Some(*bound));
            if term == "0" {
                return None;
            }
            term
        }
    };
    Some(term)
}

/// Encoded size of a container's elements. Fixed-width arrays fold to a literal.
fn elements_length(element: &ElementKind, ident: &str, bound: Option<usize>) -> String {
    match element {
        ElementKind::Primitive(Primitive::String) => format!(
            "self.{}.iter().map(|element| 4 + element.len()).sum::<usize>()",
            ident
        ),
        ElementKind::Primitive(p) => {
            let width = p.fixed_width().unwrap_or_default();
            match (bound, width) {
                (Some(bound), _) => match bound.checked_mul(width) {
                    Some(total) => total.to_string(),
                    None => format!("{} * {}", bound, width),
                },
                (None, 1) => format!("self.{}.len()", ident),
                (None, _) => format!("self.{}.len() * {}", ident, width),
            }
        }
        ElementKind::Struct(_) => format!(
            "self.{}.iter().map(|element| element.length()).sum::<usize>()",
            ident
        ),
    }
}

fn emit_read_field(w: &mut CodeWriter, kind: &FieldKind, ident: &str) {
    match kind {
        FieldKind::Primitive(p) => {
            w.line(format!("self.{} = {};", ident, read_scalar(*p)));
        }
        FieldKind::Struct(_) => {
            w.line(format!("self.{}.read(stream)?;", ident));
        }
        FieldKind::Slice(element) => {
            w.line("let count = stream.read_u32()? as usize;");
            if is_raw_bytes(element) {
                w.line(format!("self.{} = stream.read_buf(count)?;", ident));
                return;
            }
            w.line(format!("self.{}.clear();", ident));
            w.block("for _ in 0..count", |w| match element {
                ElementKind::Primitive(p) => {
                    w.line(format!("self.{}.push({});", ident, read_scalar(*p)));
                }
                ElementKind::Struct(name) => {
                    w.line(format!("let mut element = {}::default();", name));
                    w.line("element.read(stream)?;");
                    w.line(format!("self.{}.push(element);", ident));
                }
            });
        }
        FieldKind::Array { element, .. } => {
            if is_raw_bytes(element) {
                w.line(format!("stream.read_into(&mut self.{})?;", ident));
                return;
            }
            w.block(format!("for element in self.{}.iter_mut()", ident), |w| match element {
                ElementKind::Primitive(p) => {
                    w.line(format!("*element = {};", read_scalar(*p)));
                }
                ElementKind::Struct(_) => {
                    w.line("element.read(stream)?;");
                }
            });
        }
    }
}

fn emit_write_field(w: &mut CodeWriter, kind: &FieldKind, ident: &str) {
    let element = match kind {
        FieldKind::Primitive(p) => {
            let place = format!("self.{}", ident);
            w.line(write_scalar(*p, &place, &format!("&{}", place)));
            return;
        }
        FieldKind::Struct(_) => {
            w.line(format!("self.{}.write(stream)?;", ident));
            return;
        }
        FieldKind::Slice(element) => {
            w.line(format!("stream.write_u32(wire_len(self.{}.len())?)?;", ident));
            element
        }
        FieldKind::Array { element, .. } => element,
    };

    if is_raw_bytes(element) {
        w.line(format!("stream.write_buf(&self.{})?;", ident));
        return;
    }
    w.block(format!("for element in &self.{}", ident), |w| match element {
        ElementKind::Primitive(p) => {
            w.line(write_scalar(*p, "*element", "element"));
        }
        ElementKind::Struct(_) => {
            w.line("element.write(stream)?;");
        }
    });
}

/// `u8` elements travel as one contiguous run.
fn is_raw_bytes(element: &ElementKind) -> bool {
    matches!(
        element,
        ElementKind::Primitive(Primitive::Byte | Primitive::Uint8)
    )
}

/// Stream primitive and its unsigned Rust type for a fixed-width scalar.
fn stream_primitive(p: Primitive) -> (&'static str, &'static str) {
    match p.fixed_width() {
        Some(1) => ("byte", "u8"),
        Some(2) => ("u16", "u16"),
        Some(4) => ("u32", "u32"),
        _ => ("u64", "u64"),
    }
}

fn read_scalar(p: Primitive) -> String {
    if p == Primitive::String {
        return "read_string(stream)?".to_string();
    }
    let (method, _) = stream_primitive(p);
    if p.is_signed() {
        format!("stream.read_{}()? as {}", method, p.rust_type())
    } else {
        format!("stream.read_{}()?", method)
    }
}

/// `value` is a copyable place expression, `reference` a `&String` for strings.
fn write_scalar(p: Primitive, value: &str, reference: &str) -> String {
    if p == Primitive::String {
        return format!("write_string(stream, {})?;", reference);
    }
    let (method, unsigned) = stream_primitive(p);
    if p.is_signed() {
        format!("stream.write_{}({} as {})?;", method, value, unsigned)
    } else {
        format!("stream.write_{}({})?;", method, value)
    }
}

fn rust_type(kind: &FieldKind) -> String {
    match kind {
        FieldKind::Primitive(p) => p.rust_type().to_string(),
        FieldKind::Struct(name) => name.clone(),
        FieldKind::Array { bound, element } => format!("[{}; {}]", element_type(element), bound),
        FieldKind::Slice(element) => format!("Vec<{}>", element_type(element)),
    }
}

fn element_type(element: &ElementKind) -> &str {
    match element {
        ElementKind::Primitive(p) => p.rust_type(),
        ElementKind::Struct(name) => name,
    }
}

fn default_value(kind: &FieldKind) -> String {
    match kind {
        FieldKind::Primitive(Primitive::String) => "String::new()".to_string(),
        FieldKind::Primitive(_) => "0".to_string(),
        FieldKind::Struct(name) => format!("{}::default()", name),
        FieldKind::Slice(_) => "Vec::new()".to_string(),
        FieldKind::Array { bound, element } => match element {
            ElementKind::Primitive(Primitive::String) => {
                "std::array::from_fn(|_| String::new())".to_string()
            }
            ElementKind::Primitive(_) => format!("[0; {}]", bound),
            ElementKind::Struct(name) => format!("std::array::from_fn(|_| {}::default())", name),
        },
    }
}

/// Rust field names for `layout`, unique within it. Packets reserve `header`.
/// Blank `_` fields are kept on the wire and named after their position.
fn field_idents(layout: &PacketLayout) -> Vec<String> {
    let mut taken = HashSet::new();
    if layout.is_packet() {
        taken.insert("header".to_string());
    }
    layout
        .fields()
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let base = if field.name() == "_" {
                format!("_{}", i)
            } else {
                field_ident(field.name())
            };
            let mut ident = base.clone();
            while taken.contains(&ident) {
                ident.push('_');
            }
            if ident != base {
                tracing::warn!(
                    layout = layout.name(),
                    field = field.name(),
                    renamed = %ident,
                    "field name collides after case conversion"
                );
            }
            taken.insert(ident.clone());
            ident
        })
        .collect()
}

/// `snake_case` form of a field name, escaped if it is a Rust keyword.
pub fn field_ident(name: &str) -> String {
    let ident = snake_case(name);
    match ident.as_str() {
        "self" | "super" | "crate" => format!("{}_", ident),
        s if RUST_KEYWORDS.contains(&s) => format!("r#{}", ident),
        _ => ident,
    }
}

/// `ImageName` -> `image_name`, `HTTPServer` -> `http_server`, `Ipv4Addr` -> `ipv4_addr`.
pub fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|j| chars[j]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                None | Some('_') => false,
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) => p.is_uppercase() && next.is_some_and(|n| n.is_lowercase()),
            };
            if boundary {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
