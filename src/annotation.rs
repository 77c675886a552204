//! Packet annotations: `@<Kind>:<IdName>,<IdValue>` comment lines.
//!
//! Each comment line is case-folded and stripped of `/` markers and whitespace
//! before matching, so `// @VLFPacket: PKTTYPE_X, 0x80000002` and
//! `//@vlfpacket:pkttype_x,0x80000002` are the same annotation. Lines that do not
//! name a known kind, or lack the `,<IdValue>` part, are ignored. When several
//! lines match, the last one wins.

use crate::error::Error;
use crate::layout::{PacketId, PacketKind};

/// Result of classifying one declaration's comments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub kind: PacketKind,
    /// `None` exactly for [`PacketKind::Struct`].
    pub id: Option<PacketId>,
}

impl Annotation {
    fn plain() -> Self {
        Annotation {
            kind: PacketKind::Struct,
            id: None,
        }
    }
}

/// Classify the comment lines attached to `declaration`.
///
/// Only the last matching line is validated: a malformed line followed by a
/// well-formed one is not an error.
pub fn classify<S: AsRef<str>>(declaration: &str, comments: &[S]) -> Result<Annotation, Error> {
    let mut last = None;

    for line in comments {
        let text: String = line
            .as_ref()
            .to_lowercase()
            .chars()
            .filter(|c| *c != '/' && !c.is_whitespace())
            .collect();
        let Some((head, params)) = text.split_once(':') else {
            continue;
        };
        let kind = match head {
            "@simplepacket" => PacketKind::SimplePacket,
            "@packet" => PacketKind::GenericPacket,
            "@vlfpacket" => PacketKind::VlfPacket,
            _ => continue,
        };
        let mut params = params.split(',');
        let (Some(name), Some(value)) = (params.next(), params.next()) else {
            continue;
        };
        last = Some(annotation(declaration, kind, name, value));
    }

    last.unwrap_or_else(|| Ok(Annotation::plain()))
}

fn annotation(declaration: &str, kind: PacketKind, name: &str, value: &str) -> Result<Annotation, Error> {
    if !is_id_name(name) {
        return Err(Error::Annotation {
            declaration: declaration.to_string(),
            message: format!("`{}` is not a valid identifier name", name),
        });
    }
    let value = parse_int_literal(value)
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| Error::Annotation {
            declaration: declaration.to_string(),
            message: format!("`{}` is not a 32-bit integer literal", value),
        })?;

    Ok(Annotation {
        kind,
        id: Some(PacketId {
            name: name.to_string(),
            value,
        }),
    })
}

fn is_id_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Integer literal with optional base prefix: `0x`, `0o`, `0b`, or a leading
/// `0` for octal. Underscores between digits are allowed.
fn parse_int_literal(s: &str) -> Option<u64> {
    let s = s.replace('_', "");
    let (digits, radix) = if let Some(hex) = s.strip_prefix("0x") {
        (hex, 16)
    } else if let Some(oct) = s.strip_prefix("0o") {
        (oct, 8)
    } else if let Some(bin) = s.strip_prefix("0b") {
        (bin, 2)
    } else if s.len() > 1 && s.starts_with('0') {
        (&s[1..], 8)
    } else {
        (s.as_str(), 10)
    };
    if digits.is_empty() {
        return None;
    }
    u64::from_str_radix(digits, radix).ok()
}
