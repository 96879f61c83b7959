use crate::{encode_length, LIST_SHORT_START, STRING_SHORT_START};
use bytes::Bytes;
use ethereum_types::{Address, H256, U256};

pub trait RLPEncode {
    fn encode(&self, buf: &mut Vec<u8>);

    fn length(&self) -> usize {
        let mut buf = Vec::new();
        self.encode(&mut buf);
        buf.len()
    }
}

fn encode_bytes(bytes: &[u8], buf: &mut Vec<u8>) {
    if bytes.len() == 1 && bytes[0] < STRING_SHORT_START {
        buf.push(bytes[0]);
    } else {
        encode_length(bytes.len(), STRING_SHORT_START, buf);
        buf.extend_from_slice(bytes);
    }
}

impl RLPEncode for Vec<u8> {
    fn encode(&self, buf: &mut Vec<u8>) {
        encode_bytes(self, buf)
    }
}

impl RLPEncode for Bytes {
    fn encode(&self, buf: &mut Vec<u8>) {
        encode_bytes(self, buf)
    }
}

impl RLPEncode for String {
    fn encode(&self, buf: &mut Vec<u8>) {
        encode_bytes(self.as_bytes(), buf)
    }
}

impl RLPEncode for bool {
    fn encode(&self, buf: &mut Vec<u8>) {
        if *self {
            buf.push(0x01);
        } else {
            buf.push(STRING_SHORT_START);
        }
    }
}

macro_rules! impl_uint_encode {
    ($t:ty) => {
        impl RLPEncode for $t {
            fn encode(&self, buf: &mut Vec<u8>) {
                let be = self.to_be_bytes();
                let first_nonzero = be.iter().position(|b| *b != 0);
                match first_nonzero {
                    None => buf.push(STRING_SHORT_START),
                    Some(i) => encode_bytes(&be[i..], buf),
                }
            }
        }
    };
}

impl_uint_encode!(u8);
impl_uint_encode!(u16);
impl_uint_encode!(u32);
impl_uint_encode!(u64);
impl_uint_encode!(u128);
impl_uint_encode!(usize);

impl RLPEncode for U256 {
    fn encode(&self, buf: &mut Vec<u8>) {
        let mut be = [0u8; 32];
        self.to_big_endian(&mut be);
        let first_nonzero = be.iter().position(|b| *b != 0);
        match first_nonzero {
            None => buf.push(STRING_SHORT_START),
            Some(i) => encode_bytes(&be[i..], buf),
        }
    }
}

impl RLPEncode for Address {
    fn encode(&self, buf: &mut Vec<u8>) {
        encode_bytes(self.as_bytes(), buf)
    }
}

impl RLPEncode for H256 {
    fn encode(&self, buf: &mut Vec<u8>) {
        encode_bytes(self.as_bytes(), buf)
    }
}

impl<T: RLPEncode> RLPEncode for Option<T> {
    fn encode(&self, buf: &mut Vec<u8>) {
        match self {
            Some(v) => v.encode(buf),
            None => buf.push(STRING_SHORT_START),
        }
    }
}

/// Encodes a homogeneous RLP list. `Vec<u8>` itself is a *string*, not a
/// list (see `RLPEncode for Vec<u8>` above), so this is a free function
/// rather than a blanket `impl RLPEncode for Vec<T>` — that blanket would
/// collide with the `Vec<u8>` byte-string impl.
pub fn encode_list<T: RLPEncode>(items: &[T], buf: &mut Vec<u8>) {
    let mut payload = Vec::new();
    for item in items {
        item.encode(&mut payload);
    }
    encode_length(payload.len(), LIST_SHORT_START, buf);
    buf.extend_from_slice(&payload);
}

/// Encodes an explicit RLP list from already-encoded item buffers; used by
/// callers (receipts, logs) that build a heterogeneous list.
pub fn encode_list_raw(items: &[Vec<u8>], buf: &mut Vec<u8>) {
    let payload_len: usize = items.iter().map(|i| i.len()).sum();
    encode_length(payload_len, LIST_SHORT_START, buf);
    for item in items {
        buf.extend_from_slice(item);
    }
}

/// Convenience: encode a single value into a fresh buffer.
pub fn encode_to_vec<T: RLPEncode>(value: &T) -> Vec<u8> {
    let mut buf = Vec::new();
    value.encode(&mut buf);
    buf
}
