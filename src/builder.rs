//! Declaration -> packet layouts.
//!
//! Inline struct fields are hoisted into their own [`PacketKind::Struct`]
//! layouts, emitted before the layout that refers to them.

use crate::annotation;
use crate::ast::{Declaration, FieldDecl, Position};
use crate::error::Error;
use crate::field::{self, InlineStruct};
use crate::layout::{FieldLayout, PacketKind, PacketLayout};

/// Build the layouts for one declaration. The declaration's own layout is last.
pub fn build_layouts(decl: &Declaration) -> Result<Vec<PacketLayout>, Error> {
    let annotation = annotation::classify(&decl.name, &decl.doc)?;
    let mut hoisted = Vec::new();

    let fields = match annotation.kind {
        PacketKind::SimplePacket => {
            if !decl.fields.is_empty() {
                tracing::debug!(
                    declaration = %decl.name,
                    count = decl.fields.len(),
                    "SimplePacket fields ignored"
                );
            }
            Vec::new()
        }
        PacketKind::Struct | PacketKind::GenericPacket => {
            build_fields(&decl.name, &decl.fields, &mut hoisted)?
        }
        PacketKind::VlfPacket => vlf_fields(decl, &mut hoisted)?,
    };

    tracing::debug!(
        declaration = %decl.name,
        kind = %annotation.kind,
        fields = fields.len(),
        hoisted = hoisted.len(),
        "built layout"
    );

    hoisted.push(PacketLayout::new(
        decl.name.clone(),
        annotation.kind,
        annotation.id,
        fields,
    ));
    Ok(hoisted)
}

/// A VLF packet carries exactly one named slice field; anything after it is
/// dropped.
fn vlf_fields(decl: &Declaration, hoisted: &mut Vec<PacketLayout>) -> Result<Vec<FieldLayout>, Error> {
    let first = decl
        .fields
        .first()
        .ok_or_else(|| Error::InvalidVlfPacketLayout {
            declaration: decl.name.clone(),
            reason: "no fields".to_string(),
        })?;
    if first.name.is_none() {
        return Err(Error::InvalidVlfPacketLayout {
            declaration: decl.name.clone(),
            reason: format!("first field at {} is anonymous", first.position),
        });
    }

    let fields = build_fields(&decl.name, std::slice::from_ref(first), hoisted)?;
    if !fields[0].kind().is_slice() {
        return Err(Error::InvalidVlfPacketLayout {
            declaration: decl.name.clone(),
            reason: format!("first field `{}` is not a slice", fields[0].name()),
        });
    }
    if decl.fields.len() > 1 {
        tracing::warn!(
            declaration = %decl.name,
            dropped = decl.fields.len() - 1,
            "VLFPacket fields after the first are ignored"
        );
    }
    Ok(fields)
}

fn build_fields(
    owner: &str,
    fields: &[FieldDecl],
    hoisted: &mut Vec<PacketLayout>,
) -> Result<Vec<FieldLayout>, Error> {
    let mut out = Vec::with_capacity(fields.len());
    for decl in fields {
        let name = decl
            .name
            .as_deref()
            .ok_or_else(|| anonymous(owner, decl.position))?;
        let classified = field::classify(owner, name, &decl.type_expr, decl.position)?;
        if let Some(InlineStruct { name, fields }) = classified.inline {
            let inner = build_fields(&name, &fields, hoisted)?;
            hoisted.push(PacketLayout::new(name, PacketKind::Struct, None, inner));
        }
        out.push(classified.layout);
    }
    Ok(out)
}

fn anonymous(declaration: &str, position: Position) -> Error {
    Error::AnonymousField {
        declaration: declaration.to_string(),
        position,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{ElementKind, FieldKind, Primitive};
    use crate::parser::parse;

    fn layouts(src: &str) -> Result<Vec<PacketLayout>, Error> {
        let file = parse(src).expect("parse");
        build_layouts(&file.declarations[0])
    }

    #[test]
    fn plain_struct() {
        let out = layouts("type ImageInfo struct {\n\tName string\n\tSize uint64\n}\n").expect("build");
        assert_eq!(out.len(), 1);
        let l = &out[0];
        assert_eq!(l.kind(), PacketKind::Struct);
        assert!(l.id().is_none());
        assert_eq!(l.fields().len(), 2);
        assert_eq!(l.fields()[1].kind(), &FieldKind::Primitive(Primitive::Uint64));
    }

    #[test]
    fn simple_packet_drops_fields() {
        let src = "// @SimplePacket: PKTTYPE_PING, 0x1\ntype Ping struct {\n\tIgnored uint32\n}\n";
        let out = layouts(src).expect("build");
        assert_eq!(out[0].kind(), PacketKind::SimplePacket);
        assert!(out[0].fields().is_empty());
        assert_eq!(out[0].numeric_id(), Some(1));
    }

    #[test]
    fn vlf_keeps_only_first_field() {
        let src = "// @VLFPacket: PKTTYPE_LIST, 0x80000002\ntype List struct {\n\tInfos []ImageInfo\n\tExtra uint32\n}\n";
        let out = layouts(src).expect("build");
        let l = &out[0];
        assert_eq!(l.kind(), PacketKind::VlfPacket);
        assert_eq!(l.fields().len(), 1);
        assert_eq!(
            l.fields()[0].kind(),
            &FieldKind::Slice(ElementKind::Struct("ImageInfo".to_string()))
        );
    }

    #[test]
    fn vlf_rejects_bad_first_field() {
        for body in ["", "\tCount uint32\n", "\tImageInfo\n"] {
            let src = format!("// @VLFPacket: PKT_X, 2\ntype X struct {{\n{}}}\n", body);
            match layouts(&src) {
                Err(Error::InvalidVlfPacketLayout { declaration, .. }) => assert_eq!(declaration, "X"),
                other => panic!("unexpected result for {:?}: {:?}", body, other),
            }
        }
    }

    #[test]
    fn anonymous_field_rejected_in_packet() {
        let src = "// @Packet: PKT_X, 3\ntype X struct {\n\tImageInfo\n}\n";
        match layouts(src) {
            Err(Error::AnonymousField { declaration, position }) => {
                assert_eq!(declaration, "X");
                assert_eq!(position.line, 3);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn inline_struct_hoisted_before_owner() {
        let src = "type Outer struct {\n\tOptions struct {\n\t\tLevel uint8\n\t\tTag struct {\n\t\t\tV byte\n\t\t}\n\t}\n}\n";
        let out = layouts(src).expect("build");
        let names: Vec<_> = out.iter().map(|l| l.name()).collect();
        assert_eq!(names, ["OuterOptionsTag", "OuterOptions", "Outer"]);
        assert!(out[..2].iter().all(|l| l.kind() == PacketKind::Struct));
        assert_eq!(
            out[2].fields()[0].kind(),
            &FieldKind::Struct("OuterOptions".to_string())
        );
    }
}
