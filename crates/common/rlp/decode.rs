use crate::{RLPDecodeError, LIST_LONG_START, LIST_SHORT_START, STRING_SHORT_START};
use bytes::Bytes;
use ethereum_types::{Address, H256, U256};

pub trait RLPDecode: Sized {
    fn decode(rlp: &[u8]) -> Result<Self, RLPDecodeError> {
        let (value, rest) = Self::decode_unfinished(rlp)?;
        if !rest.is_empty() {
            return Err(RLPDecodeError::TrailingBytes);
        }
        Ok(value)
    }

    /// Decodes one value and returns the unconsumed remainder, for list
    /// items decoded in sequence.
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError>;
}

/// A parsed RLP item header: whether it is a list, where its payload
/// starts, and how long the payload is.
struct Header {
    is_list: bool,
    payload_start: usize,
    payload_len: usize,
}

fn decode_header(data: &[u8]) -> Result<Header, RLPDecodeError> {
    let first = *data.first().ok_or(RLPDecodeError::InvalidLength)?;
    match first {
        0..=0x7f => Ok(Header {
            is_list: false,
            payload_start: 0,
            payload_len: 1,
        }),
        STRING_SHORT_START..=STRING_LONG_START_INCLUSIVE => {
            let len = (first - STRING_SHORT_START) as usize;
            check_len(data, 1 + len)?;
            Ok(Header {
                is_list: false,
                payload_start: 1,
                payload_len: len,
            })
        }
        b if b < LIST_SHORT_START => {
            // long string: b in (STRING_LONG_START, LIST_SHORT_START)
            let len_of_len = (b - STRING_LONG_START) as usize;
            check_len(data, 1 + len_of_len)?;
            let len = be_bytes_to_usize(&data[1..1 + len_of_len])?;
            check_len(data, 1 + len_of_len + len)?;
            Ok(Header {
                is_list: false,
                payload_start: 1 + len_of_len,
                payload_len: len,
            })
        }
        LIST_SHORT_START..=LIST_LONG_START => {
            let len = (first - LIST_SHORT_START) as usize;
            check_len(data, 1 + len)?;
            Ok(Header {
                is_list: true,
                payload_start: 1,
                payload_len: len,
            })
        }
        _ => {
            let len_of_len = (first - LIST_LONG_START) as usize;
            check_len(data, 1 + len_of_len)?;
            let len = be_bytes_to_usize(&data[1..1 + len_of_len])?;
            check_len(data, 1 + len_of_len + len)?;
            Ok(Header {
                is_list: true,
                payload_start: 1 + len_of_len,
                payload_len: len,
            })
        }
    }
}

const STRING_LONG_START_INCLUSIVE: u8 = STRING_SHORT_START + 55;

fn check_len(data: &[u8], needed: usize) -> Result<(), RLPDecodeError> {
    if data.len() < needed {
        Err(RLPDecodeError::InvalidLength)
    } else {
        Ok(())
    }
}

fn be_bytes_to_usize(bytes: &[u8]) -> Result<usize, RLPDecodeError> {
    if bytes.first() == Some(&0) {
        return Err(RLPDecodeError::MalformedLength);
    }
    if bytes.len() > std::mem::size_of::<usize>() {
        return Err(RLPDecodeError::IntegerOverflow);
    }
    let mut buf = [0u8; std::mem::size_of::<usize>()];
    buf[std::mem::size_of::<usize>() - bytes.len()..].copy_from_slice(bytes);
    Ok(usize::from_be_bytes(buf))
}

/// Splits off one RLP item's raw bytes (header + payload) from the front.
pub fn decode_raw(data: &[u8]) -> Result<(&[u8], &[u8]), RLPDecodeError> {
    let header = decode_header(data)?;
    let total = header.payload_start + header.payload_len;
    Ok((&data[..total], &data[total..]))
}

impl RLPDecode for Vec<u8> {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let header = decode_header(rlp)?;
        if header.is_list {
            return Err(RLPDecodeError::UnexpectedShape);
        }
        let start = header.payload_start;
        let end = start + header.payload_len;
        Ok((rlp[start..end].to_vec(), &rlp[end..]))
    }
}

impl RLPDecode for Bytes {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (v, rest) = Vec::<u8>::decode_unfinished(rlp)?;
        Ok((Bytes::from(v), rest))
    }
}

impl RLPDecode for String {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (v, rest) = Vec::<u8>::decode_unfinished(rlp)?;
        String::from_utf8(v).map(|s| (s, rest)).map_err(|_| RLPDecodeError::UnexpectedShape)
    }
}

impl RLPDecode for bool {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (v, rest) = Vec::<u8>::decode_unfinished(rlp)?;
        match v.as_slice() {
            [] => Ok((false, rest)),
            [1] => Ok((true, rest)),
            _ => Err(RLPDecodeError::UnexpectedShape),
        }
    }
}

macro_rules! impl_uint_decode {
    ($t:ty) => {
        impl RLPDecode for $t {
            fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
                let (bytes, rest) = Vec::<u8>::decode_unfinished(rlp)?;
                if bytes.len() > std::mem::size_of::<$t>() {
                    return Err(RLPDecodeError::IntegerOverflow);
                }
                if bytes.first() == Some(&0) {
                    return Err(RLPDecodeError::NonCanonicalInteger);
                }
                let mut buf = [0u8; std::mem::size_of::<$t>()];
                buf[std::mem::size_of::<$t>() - bytes.len()..].copy_from_slice(&bytes);
                Ok((<$t>::from_be_bytes(buf), rest))
            }
        }
    };
}

impl_uint_decode!(u8);
impl_uint_decode!(u16);
impl_uint_decode!(u32);
impl_uint_decode!(u64);
impl_uint_decode!(u128);

impl RLPDecode for usize {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (v, rest) = u64::decode_unfinished(rlp)?;
        Ok((v as usize, rest))
    }
}

impl RLPDecode for U256 {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (bytes, rest) = Vec::<u8>::decode_unfinished(rlp)?;
        if bytes.len() > 32 {
            return Err(RLPDecodeError::IntegerOverflow);
        }
        if bytes.first() == Some(&0) {
            return Err(RLPDecodeError::NonCanonicalInteger);
        }
        Ok((U256::from_big_endian(&bytes), rest))
    }
}

impl RLPDecode for Address {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (bytes, rest) = Vec::<u8>::decode_unfinished(rlp)?;
        if bytes.len() != 20 {
            return Err(RLPDecodeError::UnexpectedShape);
        }
        Ok((Address::from_slice(&bytes), rest))
    }
}

impl RLPDecode for H256 {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (bytes, rest) = Vec::<u8>::decode_unfinished(rlp)?;
        if bytes.len() != 32 {
            return Err(RLPDecodeError::UnexpectedShape);
        }
        Ok((H256::from_slice(&bytes), rest))
    }
}

/// Decodes a homogeneous RLP list, returning the decoded items and the
/// unconsumed remainder. `Vec<u8>` itself decodes as an RLP *string* (see
/// the impl above), so this lives as a free function rather than a
/// blanket `impl RLPDecode for Vec<T>`, which would collide with it.
pub fn decode_list<T: RLPDecode>(rlp: &[u8]) -> Result<(Vec<T>, &[u8]), RLPDecodeError> {
    let header = decode_header(rlp)?;
    if !header.is_list {
        return Err(RLPDecodeError::UnexpectedShape);
    }
    let end = header.payload_start + header.payload_len;
    let mut payload = &rlp[header.payload_start..end];
    let mut items = Vec::new();
    while !payload.is_empty() {
        let (item, rest) = T::decode_unfinished(payload)?;
        items.push(item);
        payload = rest;
    }
    Ok((items, &rlp[end..]))
}
