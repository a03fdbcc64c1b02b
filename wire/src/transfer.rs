//! Send-table transfer messages.
//!
//! A peer describes its tables structurally (names, kinds, flags, ranges and
//! nesting, never accessors) so the receiver can flatten the same tree and
//! bind it to its own receive tables.
//!
//! ```text
//! table set:  version(16) table_count(12) table*
//! table:      name(cstring) prop_count(10) prop*
//! prop:       kind(5) name(cstring) flags(11 | 17)
//!             DataTable -> child_table(cstring)
//!             EXCLUDE   -> excluded_table(cstring)
//!             Array     -> num_elements(10)
//!             otherwise -> low(f32) high(f32) bits(7)
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use bitstream::{BitReader, BitWriter};
use schema::{
    PropDescriptor, PropFlags, PropKind, SendProp, SendTable, Unbound, FLAG_BITS,
    LEGACY_FLAG_BITS,
};

use crate::error::{LimitKind, WireError, WireResult};
use crate::limits::Limits;

/// Current protocol version; flags are sent in full.
pub const PROTOCOL_VERSION: u16 = 2;
/// Older protocol; only the low 11 flag bits are sent.
pub const LEGACY_PROTOCOL_VERSION: u16 = 1;

const KIND_BITS: u8 = 5;
const PROP_COUNT_BITS: u8 = 10;
const TABLE_COUNT_BITS: u8 = 12;
const NUM_ELEMENTS_BITS: u8 = 10;
const NUM_BITS_BITS: u8 = 7;

/// Width of the flags field for a protocol version.
pub fn flag_bits(version: u16) -> WireResult<u8> {
    match version {
        PROTOCOL_VERSION => Ok(FLAG_BITS),
        LEGACY_PROTOCOL_VERSION => Ok(LEGACY_FLAG_BITS),
        found => Err(WireError::UnsupportedVersion { found }),
    }
}

/// One decoded table message, before nested tables are linked.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TableMessage {
    pub name: String,
    pub props: Vec<PropDescriptor>,
}

impl TableMessage {
    /// Captures the structure of `table` without descending into nested tables.
    pub fn from_table<T>(table: &SendTable<T>) -> Self {
        Self {
            name: table.name().to_owned(),
            props: table
                .props()
                .iter()
                .map(|prop| prop.descriptor().clone())
                .collect(),
        }
    }
}

/// A decoded table set: the raw messages plus the linked tables.
#[derive(Debug)]
pub struct TableSet {
    pub version: u16,
    pub messages: Vec<TableMessage>,
    pub tables: Vec<Arc<SendTable<Unbound>>>,
}

impl TableSet {
    /// Finds a linked table by exact name.
    pub fn table(&self, name: &str) -> Option<&Arc<SendTable<Unbound>>> {
        self.tables.iter().find(|table| table.name() == name)
    }
}

/// Writes one table message.
pub fn encode_table(message: &TableMessage, version: u16, out: &mut BitWriter) -> WireResult<()> {
    let flag_bits = flag_bits(version)?;
    let max_props = (1usize << PROP_COUNT_BITS) - 1;
    if message.props.len() > max_props {
        return Err(WireError::LimitsExceeded {
            kind: LimitKind::PropCount,
            limit: max_props,
            actual: message.props.len(),
        });
    }

    out.write_cstring(message.name.as_bytes());
    out.write_bits(message.props.len() as u64, PROP_COUNT_BITS)?;
    for prop in &message.props {
        out.write_bits(u64::from(prop.kind.raw()), KIND_BITS)?;
        out.write_cstring(prop.name.as_bytes());
        out.write_bits(u64::from(prop.flags.truncated(flag_bits).raw()), flag_bits)?;
        if prop.kind == PropKind::DataTable || prop.flags.contains(PropFlags::EXCLUDE) {
            out.write_cstring(prop.table_name.as_deref().unwrap_or_default().as_bytes());
        } else if prop.kind == PropKind::Array {
            out.write_bits(u64::from(prop.num_elements), NUM_ELEMENTS_BITS)?;
        } else {
            out.write_f32(prop.low);
            out.write_f32(prop.high);
            out.write_bits(u64::from(prop.bits), NUM_BITS_BITS)?;
        }
    }
    Ok(())
}

/// Reads one table message.
pub fn decode_table(input: &mut BitReader<'_>, version: u16, limits: &Limits) -> WireResult<TableMessage> {
    let flag_bits = flag_bits(version)?;
    let name = read_name(input, limits, "table")?;
    let count = input.read_bits(PROP_COUNT_BITS)? as usize;
    if count > limits.max_props_per_table {
        return Err(WireError::LimitsExceeded {
            kind: LimitKind::PropCount,
            limit: limits.max_props_per_table,
            actual: count,
        });
    }

    let mut props = Vec::with_capacity(count);
    for _ in 0..count {
        let raw_kind = input.read_bits(KIND_BITS)? as u8;
        let kind = PropKind::from_raw(raw_kind).ok_or(WireError::UnknownKind { raw: raw_kind })?;
        let mut desc = PropDescriptor {
            name: read_name(input, limits, "property")?,
            kind,
            flags: PropFlags::from_raw(input.read_bits(flag_bits)? as u32),
            bits: 0,
            low: 0.0,
            high: 0.0,
            num_elements: 0,
            table_name: None,
        };
        if kind == PropKind::DataTable || desc.flags.contains(PropFlags::EXCLUDE) {
            desc.table_name = Some(read_name(input, limits, "table")?);
        } else if kind == PropKind::Array {
            desc.num_elements = input.read_bits(NUM_ELEMENTS_BITS)? as u16;
        } else {
            desc.low = input.read_f32()?;
            desc.high = input.read_f32()?;
            desc.bits = input.read_bits(NUM_BITS_BITS)? as u8;
        }
        props.push(desc);
    }
    Ok(TableMessage { name, props })
}

/// Encodes every distinct table reachable from `roots`, children before parents.
pub fn encode_table_set<T>(roots: &[Arc<SendTable<T>>], version: u16) -> WireResult<Vec<u8>> {
    let mut ordered: Vec<Arc<SendTable<T>>> = Vec::new();
    for root in roots {
        collect_post_order(root, &mut ordered);
    }
    let max_tables = (1usize << TABLE_COUNT_BITS) - 1;
    if ordered.len() > max_tables {
        return Err(WireError::LimitsExceeded {
            kind: LimitKind::TableCount,
            limit: max_tables,
            actual: ordered.len(),
        });
    }

    let mut out = BitWriter::new();
    out.write_bits(u64::from(version), 16)?;
    out.write_bits(ordered.len() as u64, TABLE_COUNT_BITS)?;
    for table in &ordered {
        encode_table(&TableMessage::from_table(table), version, &mut out)?;
    }
    Ok(out.finish())
}

/// Decodes a table set and links its nested-table references.
pub fn decode_table_set(bytes: &[u8], limits: &Limits) -> WireResult<TableSet> {
    let mut input = BitReader::new(bytes);
    let version = input.read_bits(16)? as u16;
    flag_bits(version)?;
    let count = input.read_bits(TABLE_COUNT_BITS)? as usize;
    if count > limits.max_tables {
        return Err(WireError::LimitsExceeded {
            kind: LimitKind::TableCount,
            limit: limits.max_tables,
            actual: count,
        });
    }
    let mut messages = Vec::with_capacity(count);
    for _ in 0..count {
        messages.push(decode_table(&mut input, version, limits)?);
    }
    let tables = link_tables(&messages)?;
    Ok(TableSet {
        version,
        messages,
        tables,
    })
}

/// Builds structural tables from messages, resolving nested tables by name.
///
/// Returned tables follow message order; shared children are shared `Arc`s.
pub fn link_tables(messages: &[TableMessage]) -> WireResult<Vec<Arc<SendTable<Unbound>>>> {
    let mut by_name: HashMap<&str, &TableMessage> = HashMap::with_capacity(messages.len());
    for message in messages {
        if by_name.insert(message.name.as_str(), message).is_some() {
            return Err(WireError::DuplicateTable {
                table: message.name.clone(),
            });
        }
    }

    let mut linker = Linker {
        by_name,
        built: HashMap::new(),
        in_progress: Vec::new(),
    };
    messages
        .iter()
        .map(|message| linker.build(message))
        .collect()
}

struct Linker<'m> {
    by_name: HashMap<&'m str, &'m TableMessage>,
    built: HashMap<&'m str, Arc<SendTable<Unbound>>>,
    in_progress: Vec<&'m str>,
}

impl<'m> Linker<'m> {
    fn build(&mut self, message: &'m TableMessage) -> WireResult<Arc<SendTable<Unbound>>> {
        if let Some(done) = self.built.get(message.name.as_str()) {
            return Ok(Arc::clone(done));
        }
        if self.in_progress.contains(&message.name.as_str()) {
            return Err(WireError::CyclicTable {
                table: message.name.clone(),
            });
        }
        self.in_progress.push(&message.name);

        let mut props = Vec::with_capacity(message.props.len());
        for desc in &message.props {
            let child = if desc.kind == PropKind::DataTable {
                let child_name = desc.table_name.as_deref().unwrap_or_default();
                let child_message =
                    self.by_name
                        .get(child_name)
                        .copied()
                        .ok_or_else(|| WireError::UnknownTable {
                            table: child_name.to_owned(),
                            referenced_by: message.name.clone(),
                        })?;
                Some(self.build(child_message)?)
            } else {
                None
            };
            props.push(SendProp::from_descriptor(desc.clone(), child));
        }

        self.in_progress.pop();
        let table = SendTable::from_props(message.name.clone(), props)?;
        self.built.insert(&message.name, Arc::clone(&table));
        Ok(table)
    }
}

fn collect_post_order<T>(table: &Arc<SendTable<T>>, ordered: &mut Vec<Arc<SendTable<T>>>) {
    if ordered.iter().any(|seen| Arc::ptr_eq(seen, table)) {
        return;
    }
    for prop in table.props() {
        if let Some(child) = prop.table() {
            collect_post_order(child, ordered);
        }
    }
    ordered.push(Arc::clone(table));
}

fn read_name(input: &mut BitReader<'_>, limits: &Limits, field: &'static str) -> WireResult<String> {
    let max_len = limits.max_name_len;
    let bytes = input.read_cstring(max_len).map_err(|err| match err {
        bitstream::BitError::StringTooLong { .. } => WireError::LimitsExceeded {
            kind: LimitKind::NameLength,
            limit: max_len,
            actual: max_len.saturating_add(1),
        },
        other => WireError::Bitstream(other),
    })?;
    String::from_utf8(bytes).map_err(|_| WireError::InvalidName { field })
}

#[cfg(test)]
mod tests {
    use super::*;
    use schema::{table_hash, PropTemplate, PropValue};

    struct Npc {
        health: i32,
        origin: [f32; 3],
        weapons: [i32; 4],
    }

    fn npc_tables() -> Arc<SendTable<Npc>> {
        let base = SendTable::builder("DT_BaseEntity")
            .vector("m_vecOrigin", 0, 0.0, 0.0, PropFlags::COORD, |n: &Npc| n.origin)
            .build()
            .unwrap();
        SendTable::builder("DT_Npc")
            .exclude("DT_BaseEntity", "m_flSimulationTime")
            .table("baseclass", base)
            .int("m_iHealth", 10, PropFlags::NONE, |n: &Npc| n.health)
            .array(
                "m_hWeapons",
                4,
                PropTemplate::int(21, PropFlags::UNSIGNED),
                |n: &Npc, i| PropValue::Int(n.weapons[i]),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn table_set_roundtrip_preserves_structure() {
        let root = npc_tables();
        let bytes = encode_table_set(&[Arc::clone(&root)], PROTOCOL_VERSION).unwrap();
        let set = decode_table_set(&bytes, &Limits::default()).unwrap();

        assert_eq!(set.version, PROTOCOL_VERSION);
        assert_eq!(set.messages.len(), 2);
        assert_eq!(set.messages[0].name, "DT_BaseEntity");
        assert_eq!(set.messages[1].name, "DT_Npc");

        let remote = set.table("DT_Npc").unwrap();
        assert_eq!(table_hash(remote.as_ref()), table_hash(root.as_ref()));
        assert!(remote.props()[4].element().is_some());
        assert_eq!(
            remote.props()[1].table().unwrap().name(),
            "DT_BaseEntity"
        );
    }

    #[test]
    fn legacy_version_truncates_flags() {
        let table = SendTable::builder("DT_Counter")
            .int("count", 0, PropFlags::VARINT, |n: &Npc| n.health)
            .build()
            .unwrap();
        let message = TableMessage::from_table(&table);

        let mut out = BitWriter::new();
        encode_table(&message, LEGACY_PROTOCOL_VERSION, &mut out).unwrap();
        let bytes = out.finish();
        let decoded = decode_table(
            &mut BitReader::new(&bytes),
            LEGACY_PROTOCOL_VERSION,
            &Limits::default(),
        )
        .unwrap();
        assert!(!decoded.props[0].flags.contains(PropFlags::VARINT));

        let mut out = BitWriter::new();
        encode_table(&message, PROTOCOL_VERSION, &mut out).unwrap();
        let bytes = out.finish();
        let decoded =
            decode_table(&mut BitReader::new(&bytes), PROTOCOL_VERSION, &Limits::default()).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let mut out = BitWriter::new();
        out.write_bits(99, 16).unwrap();
        out.write_bits(0, 12).unwrap();
        let err = decode_table_set(&out.finish(), &Limits::default()).unwrap_err();
        assert!(matches!(err, WireError::UnsupportedVersion { found: 99 }));
    }

    #[test]
    fn unknown_child_is_reported() {
        let message = TableMessage {
            name: "DT_Parent".into(),
            props: vec![PropDescriptor {
                name: "child".into(),
                kind: PropKind::DataTable,
                flags: PropFlags::PROXY_ALWAYS_YES,
                bits: 0,
                low: 0.0,
                high: 0.0,
                num_elements: 0,
                table_name: Some("DT_Missing".into()),
            }],
        };
        let err = link_tables(&[message]).unwrap_err();
        assert!(matches!(err, WireError::UnknownTable { ref table, .. } if table == "DT_Missing"));
    }

    #[test]
    fn cyclic_tables_are_reported() {
        let child = |name: &str, target: &str| TableMessage {
            name: name.into(),
            props: vec![PropDescriptor {
                name: "next".into(),
                kind: PropKind::DataTable,
                flags: PropFlags::PROXY_ALWAYS_YES,
                bits: 0,
                low: 0.0,
                high: 0.0,
                num_elements: 0,
                table_name: Some(target.into()),
            }],
        };
        let err = link_tables(&[child("DT_A", "DT_B"), child("DT_B", "DT_A")]).unwrap_err();
        assert!(matches!(err, WireError::CyclicTable { .. }));
    }

    #[test]
    fn shared_child_chain_fails_to_flatten_quickly() {
        let nested = |name: &str, target: String| PropDescriptor {
            name: name.into(),
            kind: PropKind::DataTable,
            flags: PropFlags::NONE,
            bits: 0,
            low: 0.0,
            high: 0.0,
            num_elements: 0,
            table_name: Some(target),
        };
        let depth = 30;
        let mut messages: Vec<TableMessage> = (0..depth)
            .map(|level| TableMessage {
                name: format!("DT_Level{level}"),
                props: vec![
                    nested("a", format!("DT_Level{}", level + 1)),
                    nested("b", format!("DT_Level{}", level + 1)),
                ],
            })
            .collect();
        messages.push(TableMessage {
            name: format!("DT_Level{depth}"),
            props: Vec::new(),
        });

        let tables = link_tables(&messages).unwrap();
        let err = schema::FlatTable::build(&tables[0]).unwrap_err();
        assert!(matches!(err, schema::SchemaError::TooManyNodes { .. }));
    }

    #[test]
    fn duplicate_tables_are_reported() {
        let message = TableMessage {
            name: "DT_Twice".into(),
            props: Vec::new(),
        };
        let err = link_tables(&[message.clone(), message]).unwrap_err();
        assert!(matches!(err, WireError::DuplicateTable { .. }));
    }

    #[test]
    fn name_length_limit_is_enforced() {
        let table = SendTable::builder("DT_AVeryLongTableNameIndeed_ExceedingTestLimits")
            .int("x", 8, PropFlags::NONE, |n: &Npc| n.health)
            .build()
            .unwrap();
        let bytes = encode_table_set(&[table], PROTOCOL_VERSION).unwrap();
        let err = decode_table_set(&bytes, &Limits::for_testing()).unwrap_err();
        assert!(matches!(
            err,
            WireError::LimitsExceeded {
                kind: LimitKind::NameLength,
                ..
            }
        ));
    }

    #[test]
    fn invalid_remote_table_fails_validation() {
        let message = TableMessage {
            name: "DT_Bad".into(),
            props: vec![PropDescriptor {
                name: "arr".into(),
                kind: PropKind::Array,
                flags: PropFlags::NONE,
                bits: 0,
                low: 0.0,
                high: 0.0,
                num_elements: 3,
                table_name: None,
            }],
        };
        let err = link_tables(&[message]).unwrap_err();
        assert!(matches!(err, WireError::Schema(_)));
    }
}
