//! Introspection and debugging tools for netprop.
//!
//! This crate provides utilities for inspecting what a peer sends:
//!
//! - Decode a schema transfer file and list its tables
//! - Dump an entity property stream as named values
//!
//! # Design Principles
//!
//! - **First-class tooling** - These tools are part of the product, not afterthoughts.
//! - **Human-readable output** - Make it easy to understand what the codec is doing.

use std::fmt::Write as _;

use anyhow::{anyhow, Context, Result};
use codec::{read_props, CodecLimits, DecodedProp, DecodedValue, EncodedProps};
use schema::{FlatTable, PropDescriptor, PropFlags, PropKind, PropValue};
use serde::Serialize;
use wire::TableSet;

/// Summary of a decoded table set.
#[derive(Debug, Clone, Serialize)]
pub struct TableSetReport {
    pub version: u16,
    pub tables: Vec<TableReport>,
}

/// One table of a set, with its flattened size.
#[derive(Debug, Clone, Serialize)]
pub struct TableReport {
    pub name: String,
    pub hash: String,
    pub flat_props: usize,
    pub props: Vec<PropDescriptor>,
}

/// Properties read back from one entity stream.
#[derive(Debug, Clone, Serialize)]
pub struct StreamReport {
    pub table: String,
    pub hash: String,
    pub bits: usize,
    pub props: Vec<DecodedProp>,
}

/// Decodes a schema transfer file.
pub fn load_table_set(bytes: &[u8], limits: &wire::Limits) -> Result<TableSet> {
    wire::decode_table_set(bytes, limits).context("decode table set")
}

/// Lists every table of `set` with its structure and fingerprint.
pub fn inspect_table_set(set: &TableSet) -> Result<TableSetReport> {
    let mut tables = Vec::with_capacity(set.tables.len());
    for (table, message) in set.tables.iter().zip(&set.messages) {
        let flat = FlatTable::build(table)
            .with_context(|| format!("flatten table {}", table.name()))?;
        tables.push(TableReport {
            name: table.name().to_owned(),
            hash: format!("{:016x}", flat.hash()),
            flat_props: flat.len(),
            props: message.props.clone(),
        });
    }
    Ok(TableSetReport {
        version: set.version,
        tables,
    })
}

/// Reads an entity stream encoded against the table `root` of `set`.
///
/// `bits` defaults to every bit of `stream`; the terminator ends the read.
pub fn dump_stream(
    set: &TableSet,
    root: &str,
    stream: &[u8],
    bits: Option<usize>,
    limits: &CodecLimits,
) -> Result<StreamReport> {
    let table = set
        .table(root)
        .ok_or_else(|| anyhow!("table {root} is not in the table set"))?;
    let flat = FlatTable::build(table).with_context(|| format!("flatten table {root}"))?;
    let encoded = EncodedProps::new(stream.to_vec(), bits.unwrap_or(stream.len() * 8));
    let props = read_props(&flat, &encoded, limits).context("read entity stream")?;
    Ok(StreamReport {
        table: flat.name().to_owned(),
        hash: format!("{:016x}", flat.hash()),
        bits: encoded.bit_len(),
        props,
    })
}

pub fn format_tables_pretty(report: &TableSetReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "protocol version: {}", report.version);
    for table in &report.tables {
        let _ = writeln!(
            out,
            "{} ({} flat props, hash {})",
            table.name, table.flat_props, table.hash
        );
        for prop in &table.props {
            let _ = writeln!(out, "  {}", describe_prop(prop));
        }
    }
    out
}

pub fn format_stream_pretty(report: &StreamReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} (hash {}, {} bits, {} props)",
        report.table,
        report.hash,
        report.bits,
        report.props.len()
    );
    for prop in &report.props {
        let value = match &prop.value {
            DecodedValue::Scalar(value) => format_value(value),
            DecodedValue::Array(values) => {
                let items: Vec<_> = values.iter().map(format_value).collect();
                format!("[{}]", items.join(", "))
            }
        };
        let _ = writeln!(out, "  [{:4}] {} = {value}", prop.index, prop.name);
    }
    out
}

fn describe_prop(prop: &PropDescriptor) -> String {
    let mut line = format!("{:<8} {}", prop.kind.type_name(), prop.name);
    match prop.kind {
        PropKind::DataTable => {
            let _ = write!(line, " -> {}", prop.table_name.as_deref().unwrap_or("?"));
        }
        PropKind::Array => {
            let _ = write!(line, " [{}]", prop.num_elements);
        }
        PropKind::String => {}
        _ => {
            let _ = write!(line, " bits={} range=[{}, {}]", prop.bits, prop.low, prop.high);
        }
    }
    if prop.flags != PropFlags::NONE {
        let _ = write!(line, " flags={}", prop.flags);
    }
    line
}

fn format_value(value: &PropValue) -> String {
    match value {
        PropValue::Int(v) => v.to_string(),
        PropValue::Int64(v) => v.to_string(),
        PropValue::Float(v) => v.to_string(),
        PropValue::Vector([x, y, z]) => format!("({x}, {y}, {z})"),
        PropValue::VectorXY([x, y]) => format!("({x}, {y})"),
        PropValue::String(v) => format!("{v:?}"),
    }
}
