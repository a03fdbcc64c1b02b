//! Binding a remote table layout to local receive tables.
//!
//! A [`RecvDecoder`] pairs every flat index of a remote send table with the
//! local receive property of the same owner table and name. Decoding then
//! needs no name lookups.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use log::{debug, warn};
use schema::{FlatTable, ObjectId, PropKind, RecvProp, RecvTable, SendProp, SendTable, Unbound};

use crate::error::{CodecError, CodecResult};
use crate::limits::CodecLimits;
use crate::props;

/// A remote flat layout bound to local receive properties.
pub struct RecvDecoder<R> {
    flat: FlatTable<Unbound>,
    recv_table: Arc<RecvTable<R>>,
    recv: Vec<Option<Arc<RecvProp<R>>>>,
    limits: CodecLimits,
}

impl<R> RecvDecoder<R> {
    /// Flattens `remote` and matches each property to `local`.
    ///
    /// Properties are matched by owner table and name, case-insensitively.
    /// With `allow_mismatch` unset, a remote property without a compatible
    /// local counterpart is an error. With it set, the property is left
    /// unbound and its values are decoded and dropped.
    pub fn bind(
        remote: &Arc<SendTable<Unbound>>,
        local: &Arc<RecvTable<R>>,
        allow_mismatch: bool,
        limits: &CodecLimits,
    ) -> CodecResult<Self> {
        let flat = FlatTable::build(remote)?;
        if flat.len() > limits.max_properties {
            return Err(CodecError::TooManyProps {
                table: flat.name().to_owned(),
                count: flat.len(),
                max: limits.max_properties,
            });
        }

        let mut tables = HashMap::new();
        map_tables(remote, local, &mut tables);

        let mut recv = Vec::with_capacity(flat.len());
        for (index, prop) in flat.props().iter().enumerate() {
            let owner = flat.owner(index).map_or("", |table| table.name());
            let local_prop = tables
                .get(&owner.to_ascii_lowercase())
                .and_then(|table: &Arc<RecvTable<R>>| table.find_prop(prop.name()));

            let Some(local_prop) = local_prop else {
                if !allow_mismatch {
                    return Err(CodecError::MissingRecvProp {
                        table: owner.to_owned(),
                        prop: prop.name().to_owned(),
                    });
                }
                debug!("{owner}.{} has no receive property, values will be dropped", prop.name());
                recv.push(None);
                continue;
            };

            if let Some((remote_desc, local_desc)) = mismatch(prop, local_prop) {
                if !allow_mismatch {
                    return Err(CodecError::SchemaMismatch {
                        table: owner.to_owned(),
                        prop: prop.name().to_owned(),
                        remote: remote_desc,
                        local: local_desc,
                    });
                }
                warn!(
                    "{owner}.{}: remote sends {remote_desc}, local expects {local_desc}; ignoring",
                    prop.name()
                );
                recv.push(None);
                continue;
            }
            recv.push(Some(Arc::clone(local_prop)));
        }

        Ok(Self {
            flat,
            recv_table: Arc::clone(local),
            recv,
            limits: limits.clone(),
        })
    }

    pub fn name(&self) -> &str {
        self.flat.name()
    }

    pub fn flat(&self) -> &FlatTable<Unbound> {
        &self.flat
    }

    pub fn recv_table(&self) -> &Arc<RecvTable<R>> {
        &self.recv_table
    }

    pub fn len(&self) -> usize {
        self.flat.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flat.is_empty()
    }

    pub fn limits(&self) -> &CodecLimits {
        &self.limits
    }

    /// Remote property at flat index `index`.
    pub fn prop(&self, index: usize) -> Option<&SendProp<Unbound>> {
        self.flat.prop(index).map(|prop| &**prop)
    }

    /// Local receive property bound to flat index `index`, if any.
    pub fn recv_prop(&self, index: usize) -> Option<&RecvProp<R>> {
        self.recv.get(index).and_then(Option::as_deref)
    }

    /// Number of flat indices with a bound receive property.
    pub fn bound_count(&self) -> usize {
        self.recv.iter().filter(|prop| prop.is_some()).count()
    }

    /// Fingerprint of the remote table tree.
    pub const fn hash(&self) -> u64 {
        self.flat.hash()
    }

    /// Copies `src` into `dst` property by property, skipping the bit encoding.
    ///
    /// `flat` must describe the same layout the decoder was bound to.
    pub fn fast_copy<T>(
        &self,
        flat: &FlatTable<T>,
        src: &T,
        dst: &mut R,
        object_id: ObjectId,
    ) -> CodecResult<()> {
        if flat.hash() != self.hash() || flat.len() != self.len() {
            return Err(CodecError::DecoderMismatch {
                expected: self.hash(),
                found: flat.hash(),
            });
        }
        for (index, prop) in flat.props().iter().enumerate() {
            if let Some(recv) = self.recv_prop(index) {
                props::fast_copy(prop, recv, src, dst, object_id)?;
            }
        }
        Ok(())
    }
}

impl<R> fmt::Debug for RecvDecoder<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecvDecoder")
            .field("name", &self.name())
            .field("props", &self.len())
            .field("bound", &self.bound_count())
            .field("hash", &format_args!("{:016x}", self.hash()))
            .finish_non_exhaustive()
    }
}

/// Pairs each remote table with the local table reached through the same
/// nested-table property names.
fn map_tables<R>(
    remote: &SendTable<Unbound>,
    local: &Arc<RecvTable<R>>,
    tables: &mut HashMap<String, Arc<RecvTable<R>>>,
) {
    let key = remote.name().to_ascii_lowercase();
    if tables.contains_key(&key) {
        return;
    }
    tables.insert(key, Arc::clone(local));

    for prop in remote.props() {
        if prop.kind() != PropKind::DataTable {
            continue;
        }
        let (Some(child), Some(local_child)) = (
            prop.table(),
            local.find_prop(prop.name()).and_then(|p| p.table()),
        ) else {
            continue;
        };
        map_tables(child, local_child, tables);
    }
}

/// Describes the first incompatibility between a remote and a local property.
fn mismatch<R>(remote: &SendProp<Unbound>, local: &RecvProp<R>) -> Option<(String, String)> {
    if remote.kind() != local.kind() {
        return Some((remote.kind().to_string(), local.kind().to_string()));
    }
    if remote.kind() != PropKind::Array {
        return None;
    }
    let remote_element = remote.element().map(SendProp::kind);
    let local_element = local.element().map(RecvProp::kind);
    if remote.num_elements() != local.num_elements() || remote_element != local_element {
        let describe = |element: Option<PropKind>, count: usize| {
            format!("array[{count}] of {}", element.map_or("?", PropKind::type_name))
        };
        return Some((
            describe(remote_element, remote.num_elements()),
            describe(local_element, local.num_elements()),
        ));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use schema::{PropFlags, PropTemplate, PropValue};

    struct Hero;

    #[derive(Default)]
    struct HeroView {
        mana: i32,
        x: f32,
        items: Vec<i32>,
    }

    fn remote() -> Arc<SendTable<Unbound>> {
        let pos: Arc<SendTable<Hero>> = SendTable::builder("DT_Pos")
            .float("x", 10, 0.0, 100.0, PropFlags::NONE, |_| 0.0)
            .build()
            .unwrap();
        SendTable::builder("DT_Hero")
            .int("mana", 8, PropFlags::UNSIGNED, |_: &Hero| 0)
            .array("items", 4, PropTemplate::int(8, PropFlags::NONE), |_, _| {
                PropValue::Int(0)
            })
            .table("pos", pos)
            .build()
            .unwrap()
            .describe()
    }

    fn local(items: usize) -> Arc<RecvTable<HeroView>> {
        let pos = RecvTable::builder("DT_Pos")
            .float("x", |v: &mut HeroView, x| v.x = x)
            .build()
            .unwrap();
        RecvTable::builder("DT_Hero")
            .int("MANA", |v: &mut HeroView, m| v.mana = m)
            .array(
                "items",
                PropKind::Int,
                items,
                |v, i, value| {
                    if let PropValue::Int(n) = value {
                        v.items[i] = n;
                    }
                },
                |v, _, len| v.items.resize(len, 0),
            )
            .table("pos", pos)
            .build()
            .unwrap()
    }

    #[test]
    fn binds_nested_tables_case_insensitively() {
        let decoder = RecvDecoder::bind(&remote(), &local(4), false, &CodecLimits::default()).unwrap();
        assert_eq!(decoder.len(), 3);
        assert_eq!(decoder.bound_count(), 3);
        assert_eq!(decoder.recv_prop(0).unwrap().name(), "MANA");
        assert_eq!(decoder.recv_prop(2).unwrap().name(), "x");
    }

    #[test]
    fn element_count_mismatch_is_fatal() {
        let err = RecvDecoder::bind(&remote(), &local(5), false, &CodecLimits::default()).unwrap_err();
        assert!(matches!(err, CodecError::SchemaMismatch { ref prop, .. } if prop == "items"));
    }

    #[test]
    fn mismatch_tolerated_when_allowed() {
        let decoder = RecvDecoder::bind(&remote(), &local(5), true, &CodecLimits::default()).unwrap();
        assert!(decoder.recv_prop(1).is_none());
        assert_eq!(decoder.bound_count(), 2);
    }

    #[test]
    fn missing_prop() {
        let sparse = RecvTable::builder("DT_Hero")
            .int("mana", |v: &mut HeroView, m| v.mana = m)
            .build()
            .unwrap();
        let err = RecvDecoder::bind(&remote(), &sparse, false, &CodecLimits::default()).unwrap_err();
        assert!(matches!(err, CodecError::MissingRecvProp { .. }));

        let decoder = RecvDecoder::bind(&remote(), &sparse, true, &CodecLimits::default()).unwrap();
        assert_eq!(decoder.bound_count(), 1);
    }

    #[test]
    fn property_limit() {
        let limits = CodecLimits {
            max_properties: 2,
            ..CodecLimits::default()
        };
        let err = RecvDecoder::bind(&remote(), &local(4), false, &limits).unwrap_err();
        assert!(matches!(err, CodecError::TooManyProps { count: 3, max: 2, .. }));
    }

    #[test]
    fn debug_lists_binding() {
        let decoder = RecvDecoder::bind(&remote(), &local(4), false, &CodecLimits::default()).unwrap();
        let text = format!("{decoder:?}");
        assert!(text.contains("DT_Hero"));
        assert!(text.contains("bound: 3"));
    }
}
