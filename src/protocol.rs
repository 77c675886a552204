//! Resolved protocol: every layout of a description file, indexed by name,
//! plus the table of packet identifiers.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::ast::DeclarationSource;
use crate::builder;
use crate::error::Error;
use crate::layout::{PacketKind, PacketLayout};

#[derive(Debug, Clone)]
pub struct Protocol {
    package: Option<String>,
    layouts: Vec<PacketLayout>,
    by_name: HashMap<String, usize>,
    id_table: IdTable,
}

impl Protocol {
    /// Build and check the layouts of every declaration in `source`.
    ///
    /// Type names must be unique, and every struct a field refers to must be a
    /// plain struct declared in the same source. A struct may only contain
    /// itself through a slice.
    pub fn build<S: DeclarationSource + ?Sized>(source: &S) -> Result<Self, Error> {
        let mut layouts = Vec::new();
        for decl in source.declarations() {
            layouts.extend(builder::build_layouts(decl)?);
        }

        let mut by_name = HashMap::new();
        for (i, layout) in layouts.iter().enumerate() {
            if by_name.insert(layout.name().to_string(), i).is_some() {
                return Err(Error::DuplicateType(layout.name().to_string()));
            }
        }

        let protocol = Protocol {
            package: source.package().map(str::to_string),
            id_table: IdTable::from_layouts(&layouts),
            layouts,
            by_name,
        };
        protocol.check_id_names()?;
        protocol.check_references()?;
        protocol.check_recursion()?;
        protocol.warn_duplicate_ids();

        tracing::info!(
            layouts = protocol.layouts.len(),
            packets = protocol.id_table.len(),
            "protocol resolved"
        );
        Ok(protocol)
    }

    pub fn package(&self) -> Option<&str> {
        self.package.as_deref()
    }

    /// All layouts, in declaration order (hoisted inline structs precede their owner).
    pub fn layouts(&self) -> &[PacketLayout] {
        &self.layouts
    }

    pub fn get(&self, name: &str) -> Option<&PacketLayout> {
        self.by_name.get(name).map(|&i| &self.layouts[i])
    }

    /// Layouts that carry a header.
    pub fn packets(&self) -> impl Iterator<Item = &PacketLayout> {
        self.layouts.iter().filter(|l| l.is_packet())
    }

    pub fn id_table(&self) -> &IdTable {
        &self.id_table
    }

    fn check_references(&self) -> Result<(), Error> {
        for layout in &self.layouts {
            for field in layout.fields() {
                let Some(target) = field.kind().referenced_struct() else {
                    continue;
                };
                match self.get(target) {
                    Some(t) if t.kind() == PacketKind::Struct => {}
                    _ => {
                        return Err(Error::UnknownType {
                            declaration: layout.name().to_string(),
                            field: field.name().to_string(),
                            type_name: target.to_string(),
                        })
                    }
                }
            }
        }
        Ok(())
    }

    /// Depth-first search over by-value edges (struct fields and arrays of
    /// structs). Slices are heap-allocated and may point back.
    fn check_recursion(&self) -> Result<(), Error> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            InProgress,
            Done,
        }

        fn visit(protocol: &Protocol, i: usize, marks: &mut [Mark]) -> Result<(), Error> {
            match marks[i] {
                Mark::Done => return Ok(()),
                Mark::InProgress => {
                    return Err(Error::RecursiveType(protocol.layouts[i].name().to_string()))
                }
                Mark::Unvisited => {}
            }
            marks[i] = Mark::InProgress;
            for field in protocol.layouts[i].fields() {
                if let Some(&next) = field
                    .kind()
                    .embedded_struct()
                    .and_then(|name| protocol.by_name.get(name))
                {
                    visit(protocol, next, marks)?;
                }
            }
            marks[i] = Mark::Done;
            Ok(())
        }

        let mut marks = vec![Mark::Unvisited; self.layouts.len()];
        for i in 0..self.layouts.len() {
            visit(self, i, &mut marks)?;
        }
        Ok(())
    }

    /// Two packets may share a numeric id, but not the constant naming it.
    fn check_id_names(&self) -> Result<(), Error> {
        let mut seen: HashMap<&str, &str> = HashMap::new();
        for entry in self.id_table.iter() {
            if let Some(first) = seen.insert(entry.const_name.as_str(), entry.type_name.as_str()) {
                return Err(Error::Annotation {
                    declaration: entry.type_name.clone(),
                    message: format!("id name {} is already used by {}", entry.const_name, first),
                });
            }
        }
        Ok(())
    }

    fn warn_duplicate_ids(&self) {
        let mut seen: HashMap<u32, &str> = HashMap::new();
        for entry in self.id_table.iter() {
            match seen.entry(entry.value) {
                Entry::Vacant(slot) => {
                    slot.insert(entry.type_name.as_str());
                }
                Entry::Occupied(first) => tracing::warn!(
                    id = %format!("{:#010x}", entry.value),
                    first = *first.get(),
                    duplicate = %entry.type_name,
                    "duplicate packet id; the factory only creates the first"
                ),
            }
        }
    }
}

/// One row of the identifier table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdEntry {
    /// Upper-cased constant name, e.g. `PKTTYPE_DISCOVER_BAR_SERVER`.
    pub const_name: String,
    pub value: u32,
    /// The packet type created for this identifier.
    pub type_name: String,
}

/// Packet identifiers in declaration order. Plain structs never appear.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdTable {
    entries: Vec<IdEntry>,
}

impl IdTable {
    pub fn from_layouts(layouts: &[PacketLayout]) -> Self {
        let entries = layouts
            .iter()
            .filter_map(|l| {
                l.id().map(|id| IdEntry {
                    const_name: id.const_name(),
                    value: id.value,
                    type_name: l.name().to_string(),
                })
            })
            .collect();
        IdTable { entries }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, IdEntry> {
        self.entries.iter()
    }

    /// First entry with this value.
    pub fn lookup(&self, value: u32) -> Option<&IdEntry> {
        self.entries.iter().find(|e| e.value == value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a IdTable {
    type Item = &'a IdEntry;
    type IntoIter = std::slice::Iter<'a, IdEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
