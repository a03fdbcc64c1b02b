//! Wire framing for the netprop property codec.
//!
//! This crate handles the parts of the wire format that are independent of
//! property values: the changed-index framing that precedes every payload in
//! an entity stream, and the messages that transfer send-table structure to a
//! peer. Payload encoding lives in the codec crate.
//!
//! # Design Principles
//!
//! - **Bit-exact** - Every reader consumes exactly the bits its writer produced.
//! - **Bounded decoding** - Counts and names are validated against [`Limits`] before use.
//! - **Explicit versions** - The protocol version is an argument, never global state.

mod delta_bits;
mod error;
mod limits;
mod transfer;

pub use delta_bits::{DeltaBitsReader, DeltaBitsWriter};
pub use error::{LimitKind, WireError, WireResult};
pub use limits::Limits;
pub use transfer::{
    decode_table, decode_table_set, encode_table, encode_table_set, flag_bits, link_tables,
    TableMessage, TableSet, LEGACY_PROTOCOL_VERSION, PROTOCOL_VERSION,
};

#[cfg(test)]
mod tests {
    use super::*;
    use bitstream::{BitReader, BitWriter};

    #[test]
    fn public_api_exports() {
        let _ = Limits::default();
        let _ = LimitKind::TableCount;
        let _ = PROTOCOL_VERSION;
        let _ = LEGACY_PROTOCOL_VERSION;
        let _: WireResult<()> = Ok(());
    }

    #[test]
    fn versions_select_flag_width() {
        assert_eq!(flag_bits(PROTOCOL_VERSION).unwrap(), 17);
        assert_eq!(flag_bits(LEGACY_PROTOCOL_VERSION).unwrap(), 11);
        assert!(flag_bits(0).is_err());
    }

    #[test]
    fn writer_and_reader_integration() {
        let mut out = BitWriter::new();
        let mut writer = DeltaBitsWriter::new(&mut out);
        writer.write_index(7).unwrap();
        writer.finish();
        let (bytes, bits) = out.into_parts();

        let mut input = BitReader::with_bit_len(&bytes, bits);
        let mut reader = DeltaBitsReader::new(&mut input);
        assert_eq!(reader.next_index().unwrap(), Some(7));
        assert_eq!(reader.next_index().unwrap(), None);
    }
}
