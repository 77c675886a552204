//! Emission of the packet factory: header-first decoding with dispatch on
//! `PacketHeader::packet_type`.

use crate::protocol::IdTable;
use crate::writer::CodeWriter;

const FACTORY: &str = r#"/// Instance pool consulted before dispatch. Implementations own their locking.
pub trait PacketCache: Send + Sync {
    /// A ready instance for `packet_type`, with `header` already in place.
    fn get(&self, packet_type: u32, header: &PacketHeader) -> Option<Box<dyn Packet>>;
    /// Take back an instance the caller has finished with.
    fn put(&self, packet: Box<dyn Packet>);
}

/// Reads a header, then decodes the body of the packet type it names.
#[derive(Clone, Default)]
pub struct PacketFactory {
    cache: Option<std::sync::Arc<dyn PacketCache>>,
}

impl std::fmt::Debug for PacketFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketFactory")
            .field("cache", &self.cache.is_some())
            .finish()
    }
}

impl PacketFactory {
    pub fn new(cache: std::sync::Arc<dyn PacketCache>) -> Self {
        PacketFactory { cache: Some(cache) }
    }

    pub fn without_cache() -> Self {
        PacketFactory { cache: None }
    }

    pub fn create_packet(&self, stream: &mut dyn ReadStream) -> Result<Box<dyn Packet>, FactoryError> {
        let mut header = PacketHeader::default();
        header.read(stream)?;
        let cached = self
            .cache
            .as_ref()
            .and_then(|cache| cache.get(header.packet_type, &header));
        let mut packet = match cached {
            Some(packet) => packet,
            None => new_packet(header)?,
        };
        packet.read(stream)?;
        Ok(packet)
    }

    /// Hand `packet` back to the cache, if there is one.
    pub fn recycle(&self, packet: Box<dyn Packet>) {
        if let Some(cache) = &self.cache {
            cache.put(packet);
        }
    }
}"#;

/// Emit `PacketCache`, `PacketFactory` and the dispatch function for `table`.
/// Duplicate ids produce unreachable arms; the first declared type wins.
pub fn emit(w: &mut CodeWriter, table: &IdTable) {
    w.lines(FACTORY);
    w.blank();

    w.line("#[allow(unreachable_patterns, unreachable_code)]");
    w.block(
        "fn new_packet(header: PacketHeader) -> Result<Box<dyn Packet>, FactoryError>",
        |w| {
            w.block_with("let packet: Box<dyn Packet> = match header.packet_type", ";", |w| {
                for entry in table {
                    w.line(format!(
                        "{} => Box::new({} {{ header, ..{}::default() }}),",
                        entry.const_name, entry.type_name, entry.type_name
                    ));
                }
                w.line("other => return Err(FactoryError::UnknownPacketKind(other)),");
            });
            w.line("Ok(packet)");
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::protocol::Protocol;

    fn emitted(src: &str) -> String {
        let protocol = Protocol::build(&parse(src).expect("parse")).expect("build");
        let mut w = CodeWriter::new();
        emit(&mut w, protocol.id_table());
        w.finish()
    }

    #[test]
    fn dispatch_arms_in_declaration_order() {
        let out = emitted(
            "type Info struct {\n\tX uint8\n}\n\
             // @SimplePacket: PKT_B, 2\ntype B struct {}\n\
             // @Packet: PKT_A, 1\ntype A struct {\n\tI Info\n}\n",
        );
        let b = out.find("PKT_B => Box::new(B { header, ..B::default() }),").expect("B arm");
        let a = out.find("PKT_A => Box::new(A { header, ..A::default() }),").expect("A arm");
        assert!(b < a);
        assert!(!out.contains("Info {"));
    }

    #[test]
    fn empty_table_only_rejects() {
        let out = emitted("type Info struct {}\n");
        assert!(out.contains(
            "let packet: Box<dyn Packet> = match header.packet_type {\n        other => return Err(FactoryError::UnknownPacketKind(other)),\n    };"
        ));
    }
}
