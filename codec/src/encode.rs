//! Entity encoding.

use bitstream::BitWriter;
use schema::{FlatTable, ObjectId};
use wire::DeltaBitsWriter;

use crate::error::CodecResult;
use crate::props::{encode_prop, is_zero};
use crate::proxy::ProxyResults;
use crate::types::EncodedProps;

/// Which properties an encode emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EncodeMode {
    /// Every property of every sent table.
    #[default]
    Full,
    /// Skips properties that hold their zero value. Used for baselines the
    /// receiver starts from a zeroed object.
    SkipZero,
}

/// Encodes `object` in flat order, skipping tables its proxies did not send.
pub fn encode_props<T>(
    flat: &FlatTable<T>,
    object: &T,
    object_id: ObjectId,
    proxies: &ProxyResults,
    mode: EncodeMode,
) -> CodecResult<EncodedProps> {
    let mut out = BitWriter::new();
    let mut writer = DeltaBitsWriter::new(&mut out);
    for (index, prop) in flat.props().iter().enumerate() {
        if !proxies.is_prop_sent(flat, index) {
            continue;
        }
        if mode == EncodeMode::SkipZero && is_zero(prop, object, object_id)? {
            continue;
        }
        writer.write_index(index)?;
        encode_prop(prop, object, object_id, writer.out())?;
    }
    writer.finish();
    Ok(EncodedProps::from_writer(out))
}

/// Runs the proxies of `object` and encodes every sent property.
pub fn encode<T>(flat: &FlatTable<T>, object: &T, object_id: ObjectId) -> CodecResult<EncodedProps> {
    let proxies = ProxyResults::evaluate(flat, object, object_id);
    encode_props(flat, object, object_id, &proxies, EncodeMode::Full)
}
