//! Recursive Length Prefix encoding, the narrow slice of it the execution
//! core needs: receipts, the `[sender, nonce]` pair used for CREATE address
//! derivation, and log entries. Full trie-node RLP (branch/extension/leaf
//! encodings) lives in `evm_core-trie`, not here.

mod decode;
mod encode;
mod error;
mod structs;

pub use decode::{decode_list, decode_raw, RLPDecode};
pub use encode::{encode_list, encode_list_raw, encode_to_vec, RLPEncode};
pub use error::RLPDecodeError;
pub use structs::{Decoder, Encoder};

pub(crate) const LIST_SHORT_START: u8 = 0xc0;
pub(crate) const LIST_LONG_START: u8 = 0xf7;
pub(crate) const STRING_SHORT_START: u8 = 0x80;
pub(crate) const STRING_LONG_START: u8 = 0xb7;

/// Encodes the length of an RLP payload per the yellow-paper prefix rules,
/// writing either a short-form length byte or a long-form length-of-length
/// prefix, then the payload itself.
pub(crate) fn encode_length(len: usize, offset: u8, buf: &mut Vec<u8>) {
    if len < 56 {
        buf.push(offset + len as u8);
    } else {
        let len_bytes = len.to_be_bytes();
        let first_nonzero = len_bytes.iter().position(|b| *b != 0).unwrap_or(len_bytes.len() - 1);
        let len_bytes = &len_bytes[first_nonzero..];
        buf.push(offset + 55 + len_bytes.len() as u8);
        buf.extend_from_slice(len_bytes);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use ethereum_types::U256;

    #[test]
    fn encode_decode_u64_roundtrip() {
        let mut buf = Vec::new();
        1234u64.encode(&mut buf);
        assert_eq!(u64::decode(&buf).unwrap(), 1234);
    }

    #[test]
    fn encode_empty_string_is_0x80() {
        let mut buf = Vec::new();
        Vec::<u8>::new().encode(&mut buf);
        assert_eq!(buf, vec![0x80]);
    }

    #[test]
    fn encode_u256_matches_known_vector() {
        let mut buf = Vec::new();
        U256::from(1024u64).encode(&mut buf);
        // 1024 = 0x0400, two significant bytes, short string prefix 0x82
        assert_eq!(buf, vec![0x82, 0x04, 0x00]);
    }

    #[test]
    fn encode_list_of_strings() {
        let mut buf = Vec::new();
        let items: Vec<Vec<u8>> = vec![b"dog".to_vec()];
        encode_list(&items, &mut buf);
        assert_eq!(buf, vec![0xc4, 0x83, b'd', b'o', b'g']);
    }

    #[test]
    fn decode_list_of_strings_roundtrip() {
        let mut buf = Vec::new();
        let items: Vec<Vec<u8>> = vec![b"dog".to_vec(), b"cat".to_vec()];
        encode_list(&items, &mut buf);
        let (decoded, rest): (Vec<Vec<u8>>, &[u8]) = decode_list(&buf).unwrap();
        assert!(rest.is_empty());
        assert_eq!(decoded, items);
    }
}
