//! Entity property encoding and delta compression for netprop.
//!
//! This is the main codec crate that ties together bitstream, wire, and schema
//! to replicate object state from a server to its clients.
//!
//! # Features
//!
//! - Per-kind property codecs (`props`): ints, 64-bit ints, quantized floats,
//!   vectors, strings and arrays
//! - Entity encoding with visibility proxies and per-recipient culling
//! - Decoding through a [`RecvDecoder`] bound to local receive tables
//! - Stream-level merging, diffing and filtering without decoding values
//! - Change-frame lists and packed entity states for per-client deltas
//! - A [`DecoderRegistry`] with a build-then-traffic lifecycle
//!
//! # Design Principles
//!
//! - **Bit-exact** - Skipping, copying and comparing consume exactly the bits
//!   the encoder wrote.
//! - **Fail whole** - A corrupt stream fails the entire call; the caller drops
//!   the result.
//! - **Deterministic** - Same inputs produce same outputs.

mod binding;
mod change_frames;
mod decode;
mod delta;
mod encode;
mod error;
mod limits;
mod packed;
pub mod props;
mod proxy;
mod registry;
mod types;

pub use binding::RecvDecoder;
pub use change_frames::ChangeFrameList;
pub use decode::{decode, decode_zero};
pub use delta::{
    calc_delta, merge_deltas, prop_indices, read_props, write_prop_list, DecodedProp,
    DecodedValue,
};
pub use encode::{encode, encode_props, EncodeMode};
pub use error::{CodecError, CodecResult};
pub use limits::CodecLimits;
pub use packed::{pack_entity, write_delta_for_recipient, PackOutcome, PackedEntity};
pub use proxy::{cull_props_for_recipient, is_visible_to, ProxyResults};
pub use registry::{DecoderRegistry, RegistryPhase};
pub use types::{EncodedProps, SnapshotTick};
pub use wire::Limits as WireLimits;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_api_exports() {
        let _ = SnapshotTick::new(0);
        let _ = EncodedProps::default();
        let _ = EncodeMode::default();
        let _ = WireLimits::default();
        let _ = CodecLimits::default();
        let _ = ChangeFrameList::new(0, SnapshotTick::new(0));

        let _: CodecResult<()> = Ok(());
    }

    #[test]
    fn snapshot_tick_usage() {
        let tick = SnapshotTick::new(100);
        assert_eq!(tick.raw(), 100);
        assert!(!tick.is_zero());
    }
}
