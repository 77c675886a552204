//! # packetgen: packet declarations to Rust wire codecs
//!
//! Compiles Go-flavoured struct declarations, annotated with packet comments,
//! into Rust source for a binary protocol: per-message length, read and write,
//! a shared header, a `Packet` trait, identifier constants and a factory that
//! dispatches on the header's packet type.
//!
//! ## Annotations
//!
//! - `// @SimplePacket: <IdName>, <IdValue>`: header only
//! - `// @Packet: <IdName>, <IdValue>`: header followed by the declared fields
//! - `// @VLFPacket: <IdName>, <IdValue>`: header followed by one slice field
//! - no annotation: plain struct, usable as a field type
//!
//! ## Field types
//!
//! - `byte`, `int8`..`int64`, `uint8`..`uint64`, `string` (u32 length prefix)
//! - references to other declared structs, inline `struct { ... }`
//! - `[N]T` fixed arrays (N is not on the wire), `[]T` slices (u32 count prefix)
//!
//! ## Example
//!
//! ```text
//! type ImageInfo struct {
//!     ImageName   string
//!     ImageSize   uint32
//!     NumSnapshot uint32
//! }
//!
//! // @VLFPacket: PKTTYPE_QUERY_ALL_IMAGE_INFOS_ACK, 0x80000002
//! type QueryAllImageInfosAck struct {
//!     Infos []ImageInfo
//! }
//! ```
//!
//! ## Usage
//!
//! Call [`generate_file`] from a build script and `include!` the output, or run
//! the `packetgen` binary. Generated code reads and writes through the traits in
//! [`stream`].

pub mod annotation;
pub mod ast;
pub mod builder;
pub mod codegen;
pub mod error;
pub mod factory;
pub mod field;
pub mod layout;
pub mod parser;
pub mod protocol;
pub mod stream;
pub mod writer;

use std::path::Path;

pub use ast::{Declaration, DeclarationSource, SourceFile};
pub use codegen::{GenerateOptions, Generator};
pub use error::Error;
pub use layout::{ElementKind, FieldKind, FieldLayout, PacketId, PacketKind, PacketLayout, Primitive};
pub use parser::parse;
pub use protocol::{IdEntry, IdTable, Protocol};
pub use stream::{Endianness, ReadStream, StreamError, StreamReader, StreamWriter, WriteStream};

/// Parse, resolve and generate in one step.
pub fn generate(source: &str, options: &GenerateOptions) -> Result<String, Error> {
    let file = parse(source).map_err(Error::Parse)?;
    let protocol = Protocol::build(&file)?;
    Generator::new(&protocol, options).generate()
}

/// Generate from the file at `src` into `dest`. Nothing is written on error.
pub fn generate_file(src: &Path, dest: &Path, options: &GenerateOptions) -> Result<(), Error> {
    let source = std::fs::read_to_string(src)?;
    let mut options = options.clone();
    if options.source_name.is_none() {
        options.source_name = src.file_name().map(|n| n.to_string_lossy().into_owned());
    }
    let output = generate(&source, &options)?;
    std::fs::write(dest, output)?;
    tracing::info!(src = %src.display(), dest = %dest.display(), "wrote generated code");
    Ok(())
}
