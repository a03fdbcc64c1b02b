//! Deterministic table hashing.

use std::collections::HashMap;
use std::sync::Arc;

use blake3::Hasher;

use crate::send::{PropDescriptor, SendTable};

/// Computes a deterministic fingerprint of a table tree.
///
/// Only structure is hashed: names, kinds, flags, widths, ranges and nesting.
/// A locally built table and its [`describe`](SendTable::describe)d copy hash
/// identically.
///
/// Nested tables contribute their own digest, computed once per distinct
/// table, so shared children cost nothing extra.
#[must_use]
pub fn table_hash<T>(table: &SendTable<T>) -> u64 {
    let mut digests = HashMap::new();
    let digest = table_digest(table, &mut digests);
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

type Digests<T> = HashMap<*const SendTable<T>, [u8; 32]>;

fn table_digest<T>(table: &SendTable<T>, digests: &mut Digests<T>) -> [u8; 32] {
    let mut hasher = Hasher::new();
    write_str(&mut hasher, table.name());
    write_u32(&mut hasher, table.len() as u32);
    for prop in table.props() {
        write_descriptor(&mut hasher, prop.descriptor());
        match prop.table() {
            Some(child) => {
                write_u8(&mut hasher, 1);
                let digest = match digests.get(&Arc::as_ptr(child)) {
                    Some(digest) => *digest,
                    None => {
                        let digest = table_digest(child, digests);
                        digests.insert(Arc::as_ptr(child), digest);
                        digest
                    }
                };
                hasher.update(&digest);
            }
            None => write_u8(&mut hasher, 0),
        }
    }
    *hasher.finalize().as_bytes()
}

fn write_descriptor(hasher: &mut Hasher, desc: &PropDescriptor) {
    write_u8(hasher, desc.kind.raw());
    write_str(hasher, &desc.name);
    write_u32(hasher, desc.flags.raw());
    write_u8(hasher, desc.bits);
    write_u32(hasher, desc.low.to_bits());
    write_u32(hasher, desc.high.to_bits());
    write_u16(hasher, desc.num_elements);
    write_str(hasher, desc.table_name.as_deref().unwrap_or_default());
}

fn write_str(hasher: &mut Hasher, value: &str) {
    write_u32(hasher, value.len() as u32);
    hasher.update(value.as_bytes());
}

fn write_u8(hasher: &mut Hasher, value: u8) {
    hasher.update(&[value]);
}

fn write_u16(hasher: &mut Hasher, value: u16) {
    hasher.update(&value.to_le_bytes());
}

fn write_u32(hasher: &mut Hasher, value: u32) {
    hasher.update(&value.to_le_bytes());
}
