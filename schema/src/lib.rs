//! Networked property tables for netprop.
//!
//! This crate defines how object state is described for replication:
//! - Send tables: typed properties bound to accessor closures
//! - Receive tables: where decoded values are stored on the other side
//! - Property flags, kinds and values
//! - Flattening of nested tables into a wire-ordered property list
//! - Deterministic table hashing
//!
//! # Design Principles
//!
//! - **Immutable after build** - tables are validated once and shared behind `Arc`.
//! - **No layout tricks** - field access goes through closures, never offsets.
//! - **Deterministic flattening** - both peers derive the same property order
//!   from the same tree.

mod error;
mod flags;
mod flatten;
mod hash;
mod kind;
mod recipients;
mod recv;
mod send;
mod value;

pub use error::{SchemaError, SchemaResult};
pub use flags::{PropFlags, FLAG_BITS, LEGACY_FLAG_BITS};
pub use flatten::{
    visit_tables, FlatTable, ProxyPathEntry, SendNode, MAX_NODES, MAX_PROPERTIES, NO_PROXY,
};
pub use hash::table_hash;
pub use kind::PropKind;
pub use recipients::{Recipients, MAX_RECIPIENTS};
pub use recv::{
    ApplyFn, RecvLengthFn, RecvProp, RecvProxyData, RecvTable, RecvTableBuilder,
    DEFAULT_STRING_BUFFER,
};
pub use send::{
    range_multiplier, LengthFn, PropDescriptor, PropTemplate, SendProp, SendTable,
    SendTableBuilder, TableProxyFn, Unbound, ValueFn, MAX_ARRAY_ELEMENTS,
};
pub use value::PropValue;

/// Identifies a networked object (entity index).
pub type ObjectId = u32;
