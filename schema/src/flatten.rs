//! Flattening of nested send tables into an index-addressable property list.
//!
//! The flat order is the wire order: both peers must flatten the same tree
//! the same way. Within a node the table's own leaf properties come first in
//! declaration order, then each nested table in declaration order. Collapsible
//! nested tables are inlined at the position of their property.

use std::sync::Arc;

use crate::error::{SchemaError, SchemaResult};
use crate::hash::table_hash;
use crate::send::{SendProp, SendTable};
use crate::{PropFlags, PropKind};

/// Maximum number of properties in one flattened table.
pub const MAX_PROPERTIES: usize = 4096;

/// Maximum number of table expansions while flattening, collapsed tables included.
pub const MAX_NODES: usize = 4096;

/// Proxy index of nodes that are visible unconditionally.
pub const NO_PROXY: u16 = u16::MAX;

/// One step of a proxy path: the nested-table property to evaluate and its proxy slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProxyPathEntry {
    /// Index into [`FlatTable::datatable_props`].
    pub datatable_prop: usize,
    /// Data-table proxy index produced by that property.
    pub proxy: u16,
}

/// A node of the proxy tree; one per non-collapsed table instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendNode {
    table: String,
    datatable_prop: Option<usize>,
    first_prop: usize,
    own_props: usize,
    recursive_props: usize,
    data_table_proxy: u16,
    recursive_proxy: u16,
    children: Vec<SendNode>,
}

impl SendNode {
    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Index into [`FlatTable::datatable_props`] of the property that leads here.
    pub const fn datatable_prop(&self) -> Option<usize> {
        self.datatable_prop
    }

    /// First flat index owned by this node.
    pub const fn first_prop(&self) -> usize {
        self.first_prop
    }

    /// Number of flat properties owned directly by this node.
    pub const fn own_props(&self) -> usize {
        self.own_props
    }

    /// Number of flat properties in this node's subtree (contiguous from `first_prop`).
    pub const fn recursive_props(&self) -> usize {
        self.recursive_props
    }

    /// Proxy slot gating this subtree, or [`NO_PROXY`].
    pub const fn data_table_proxy(&self) -> u16 {
        self.data_table_proxy
    }

    /// Dense pre-order index of this node.
    pub const fn recursive_proxy(&self) -> u16 {
        self.recursive_proxy
    }

    pub fn children(&self) -> &[SendNode] {
        &self.children
    }
}

/// The flattened, precomputed form of a send table tree.
pub struct FlatTable<T> {
    root: Arc<SendTable<T>>,
    props: Vec<Arc<SendProp<T>>>,
    owners: Vec<Arc<SendTable<T>>>,
    prop_proxy: Vec<u16>,
    prop_node: Vec<u16>,
    datatable_props: Vec<Arc<SendProp<T>>>,
    proxy_paths: Vec<Vec<ProxyPathEntry>>,
    root_node: SendNode,
    node_count: usize,
    hash: u64,
}

impl<T> FlatTable<T> {
    /// Flattens `root`.
    ///
    /// # Panics
    ///
    /// Panics if an array property has no element template. Tables assembled
    /// through [`SendTable::from_props`] never trigger this.
    pub fn build(root: &Arc<SendTable<T>>) -> SchemaResult<Self> {
        let mut excludes = Vec::new();
        visit_tables(
            root,
            &mut |_| {},
            &mut |_, prop| {
                if prop.flags().contains(PropFlags::EXCLUDE) {
                    excludes.push((
                        prop.table_name().unwrap_or_default().to_ascii_lowercase(),
                        prop.name().to_ascii_lowercase(),
                    ));
                }
            },
        );

        let mut flattener = Flattener {
            root: root.name().to_owned(),
            excludes,
            props: Vec::new(),
            owners: Vec::new(),
            prop_proxy: Vec::new(),
            prop_node: Vec::new(),
            datatable_props: Vec::new(),
            proxy_paths: Vec::new(),
            next_node: 0,
            expanded: 0,
        };
        let root_node = flattener.node(root, None, false, &[], NO_PROXY)?;

        Ok(Self {
            root: Arc::clone(root),
            props: flattener.props,
            owners: flattener.owners,
            prop_proxy: flattener.prop_proxy,
            prop_node: flattener.prop_node,
            datatable_props: flattener.datatable_props,
            proxy_paths: flattener.proxy_paths,
            root_node,
            node_count: usize::from(flattener.next_node),
            hash: table_hash(root),
        })
    }

    pub fn root(&self) -> &Arc<SendTable<T>> {
        &self.root
    }

    pub fn name(&self) -> &str {
        self.root.name()
    }

    pub fn len(&self) -> usize {
        self.props.len()
    }

    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }

    pub fn props(&self) -> &[Arc<SendProp<T>>] {
        &self.props
    }

    pub fn prop(&self, index: usize) -> Option<&Arc<SendProp<T>>> {
        self.props.get(index)
    }

    /// Table that declares the flat property at `index`.
    pub fn owner(&self, index: usize) -> Option<&Arc<SendTable<T>>> {
        self.owners.get(index)
    }

    /// Nearest gating proxy slot of the flat property at `index`.
    pub fn prop_proxy(&self, index: usize) -> u16 {
        self.prop_proxy.get(index).copied().unwrap_or(NO_PROXY)
    }

    /// Recursive proxy index of the node owning the flat property at `index`.
    pub fn prop_node(&self, index: usize) -> Option<u16> {
        self.prop_node.get(index).copied()
    }

    /// Nested-table properties in node creation order.
    pub fn datatable_props(&self) -> &[Arc<SendProp<T>>] {
        &self.datatable_props
    }

    /// Chain of gating proxies from the root down to `proxy`, inclusive.
    pub fn proxy_path(&self, proxy: u16) -> &[ProxyPathEntry] {
        self.proxy_paths
            .get(proxy as usize)
            .map_or(&[], Vec::as_slice)
    }

    /// Number of data-table proxy slots.
    pub fn data_table_proxy_count(&self) -> usize {
        self.proxy_paths.len()
    }

    /// Number of proxy tree nodes.
    pub const fn node_count(&self) -> usize {
        self.node_count
    }

    pub const fn root_node(&self) -> &SendNode {
        &self.root_node
    }

    /// Fingerprint of the underlying table tree.
    pub const fn hash(&self) -> u64 {
        self.hash
    }

    /// Flat index of the first property named `name` (case-insensitive).
    pub fn find(&self, name: &str) -> Option<usize> {
        self.props
            .iter()
            .position(|prop| prop.name().eq_ignore_ascii_case(name))
    }
}

impl<T> std::fmt::Debug for FlatTable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlatTable")
            .field("name", &self.root.name())
            .field("props", &self.props.iter().map(|p| p.name()).collect::<Vec<_>>())
            .field("root_node", &self.root_node)
            .field("hash", &format_args!("{:016x}", self.hash))
            .finish_non_exhaustive()
    }
}

struct Flattener<T> {
    root: String,
    excludes: Vec<(String, String)>,
    props: Vec<Arc<SendProp<T>>>,
    owners: Vec<Arc<SendTable<T>>>,
    prop_proxy: Vec<u16>,
    prop_node: Vec<u16>,
    datatable_props: Vec<Arc<SendProp<T>>>,
    proxy_paths: Vec<Vec<ProxyPathEntry>>,
    next_node: u16,
    expanded: usize,
}

type Leaf<T> = (Arc<SendTable<T>>, Arc<SendProp<T>>);

impl<T> Flattener<T> {
    fn node(
        &mut self,
        table: &Arc<SendTable<T>>,
        datatable_prop: Option<usize>,
        gated: bool,
        parent_path: &[ProxyPathEntry],
        parent_proxy: u16,
    ) -> SchemaResult<SendNode> {
        self.expand()?;
        let recursive_proxy = self.next_node;
        let next_node = self.next_node.checked_add(1).ok_or_else(|| self.too_many_nodes())?;
        self.next_node = next_node;

        let mut path = parent_path.to_vec();
        let data_table_proxy = match datatable_prop {
            Some(datatable_prop) if gated => {
                let proxy = u16::try_from(self.proxy_paths.len())
                    .ok()
                    .filter(|&proxy| proxy != NO_PROXY)
                    .ok_or_else(|| self.too_many_nodes())?;
                path.push(ProxyPathEntry {
                    datatable_prop,
                    proxy,
                });
                self.proxy_paths.push(path.clone());
                proxy
            }
            _ => NO_PROXY,
        };
        let effective_proxy = if data_table_proxy == NO_PROXY {
            parent_proxy
        } else {
            data_table_proxy
        };

        let mut leaves = Vec::new();
        let mut nested = Vec::new();
        self.gather(table, &mut leaves, &mut nested)?;
        self.check_props(leaves.len())?;

        let first_prop = self.props.len();
        for (owner, prop) in leaves {
            self.props.push(prop);
            self.owners.push(owner);
            self.prop_proxy.push(effective_proxy);
            self.prop_node.push(recursive_proxy);
        }
        let own_props = self.props.len() - first_prop;

        let mut children = Vec::with_capacity(nested.len());
        for prop in nested {
            let Some(child) = prop.table().cloned() else {
                continue;
            };
            let index = self.datatable_props.len();
            let gated = !prop.flags().contains(PropFlags::PROXY_ALWAYS_YES);
            self.datatable_props.push(prop);
            children.push(self.node(&child, Some(index), gated, &path, effective_proxy)?);
        }

        Ok(SendNode {
            table: table.name().to_owned(),
            datatable_prop,
            first_prop,
            own_props,
            recursive_props: self.props.len() - first_prop,
            data_table_proxy,
            recursive_proxy,
            children,
        })
    }

    fn gather(
        &mut self,
        table: &Arc<SendTable<T>>,
        leaves: &mut Vec<Leaf<T>>,
        nested: &mut Vec<Arc<SendProp<T>>>,
    ) -> SchemaResult<()> {
        for prop in table.props() {
            if prop
                .flags()
                .intersects(PropFlags::EXCLUDE | PropFlags::INSIDE_ARRAY)
                || self.is_excluded(table.name(), prop.name())
            {
                continue;
            }
            match prop.kind() {
                PropKind::DataTable => {
                    if prop.flags().contains(PropFlags::COLLAPSIBLE) {
                        if let Some(child) = prop.table() {
                            self.expand()?;
                            self.gather(child, leaves, nested)?;
                            self.check_props(leaves.len())?;
                        }
                    } else {
                        nested.push(Arc::clone(prop));
                    }
                }
                kind => {
                    assert!(
                        kind != PropKind::Array || prop.element().is_some(),
                        "array {}.{} has no preceding element template",
                        table.name(),
                        prop.name()
                    );
                    leaves.push((Arc::clone(table), Arc::clone(prop)));
                }
            }
        }
        Ok(())
    }

    fn expand(&mut self) -> SchemaResult<()> {
        self.expanded += 1;
        if self.expanded > MAX_NODES {
            return Err(self.too_many_nodes());
        }
        Ok(())
    }

    fn check_props(&self, pending: usize) -> SchemaResult<()> {
        let count = self.props.len() + pending;
        if count > MAX_PROPERTIES {
            return Err(SchemaError::TooManyProps {
                table: self.root.clone(),
                count,
                max: MAX_PROPERTIES,
            });
        }
        Ok(())
    }

    fn too_many_nodes(&self) -> SchemaError {
        SchemaError::TooManyNodes {
            table: self.root.clone(),
            max: MAX_NODES,
        }
    }

    fn is_excluded(&self, table: &str, prop: &str) -> bool {
        self.excludes.iter().any(|(excluded_table, excluded_prop)| {
            excluded_table.eq_ignore_ascii_case(table) && excluded_prop.eq_ignore_ascii_case(prop)
        })
    }
}

/// Visits every distinct table reachable from `root`, depth-first.
///
/// `on_table` runs once per table before its properties; `on_prop` runs for
/// every property of that table, including excludes and element templates.
/// A table reachable through several paths is visited once.
pub fn visit_tables<T>(
    root: &Arc<SendTable<T>>,
    on_table: &mut impl FnMut(&Arc<SendTable<T>>),
    on_prop: &mut impl FnMut(&Arc<SendTable<T>>, &Arc<SendProp<T>>),
) {
    let mut visited: Vec<Arc<SendTable<T>>> = Vec::new();
    visit_inner(root, on_table, on_prop, &mut visited);
}

fn visit_inner<T>(
    table: &Arc<SendTable<T>>,
    on_table: &mut impl FnMut(&Arc<SendTable<T>>),
    on_prop: &mut impl FnMut(&Arc<SendTable<T>>, &Arc<SendProp<T>>),
    visited: &mut Vec<Arc<SendTable<T>>>,
) {
    if visited.iter().any(|seen| Arc::ptr_eq(seen, table)) {
        return;
    }
    visited.push(Arc::clone(table));
    on_table(table);
    for prop in table.props() {
        on_prop(table, prop);
        if let Some(child) = prop.table() {
            visit_inner(child, on_table, on_prop, visited);
        }
    }
}
