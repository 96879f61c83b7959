//! Small helpers for encoding/decoding fixed-shape structs (receipts, log
//! entries) as RLP lists without hand-rolling the list framing each time.

use crate::{encode::RLPEncode, encode_length, error::RLPDecodeError, LIST_SHORT_START};

#[derive(Default)]
pub struct Encoder {
    fields: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn field<T: RLPEncode>(mut self, value: &T) -> Self {
        value.encode(&mut self.fields);
        self
    }

    /// Appends an already-RLP-encoded sub-item (e.g. a nested list) verbatim.
    pub fn raw_field(mut self, encoded: &[u8]) -> Self {
        self.fields.extend_from_slice(encoded);
        self
    }

    pub fn finish(self, buf: &mut Vec<u8>) {
        encode_length(self.fields.len(), LIST_SHORT_START, buf);
        buf.extend_from_slice(&self.fields);
    }
}

/// Sequentially consumes fields out of the payload of an RLP list.
pub struct Decoder<'a> {
    remaining: &'a [u8],
}

impl<'a> Decoder<'a> {
    /// Opens `rlp` as a list and returns a decoder over its payload plus
    /// whatever followed the list in the original buffer.
    pub fn new(rlp: &'a [u8]) -> Result<(Self, &'a [u8]), RLPDecodeError> {
        let (list_bytes, rest) = crate::decode::decode_raw(rlp)?;
        let first = *list_bytes.first().ok_or(RLPDecodeError::InvalidLength)?;
        if first < LIST_SHORT_START {
            return Err(RLPDecodeError::UnexpectedShape);
        }
        // Re-derive the payload slice (strip the list header we just validated).
        let (_, payload_and_nothing) = split_list_header(list_bytes)?;
        Ok((
            Decoder {
                remaining: payload_and_nothing,
            },
            rest,
        ))
    }

    pub fn field<T: crate::decode::RLPDecode>(mut self) -> Result<(T, Self), RLPDecodeError> {
        let (value, rest) = T::decode_unfinished(self.remaining)?;
        self.remaining = rest;
        Ok((value, self))
    }

    pub fn finish(self) -> Result<(), RLPDecodeError> {
        if self.remaining.is_empty() {
            Ok(())
        } else {
            Err(RLPDecodeError::TrailingBytes)
        }
    }
}

fn split_list_header(list_bytes: &[u8]) -> Result<(usize, &[u8]), RLPDecodeError> {
    let first = *list_bytes.first().ok_or(RLPDecodeError::InvalidLength)?;
    let header_len = if first <= crate::LIST_LONG_START {
        1
    } else {
        1 + (first - crate::LIST_LONG_START) as usize
    };
    Ok((header_len, &list_bytes[header_len..]))
}
