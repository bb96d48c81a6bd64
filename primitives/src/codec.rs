//! SCALE envelope helpers for the Wasm marshalling ABI.
//!
//! The host ABI passes variable-length data as SCALE-encoded envelopes:
//! `Option<bytes>` for fallible getters, fixed-size options for signatures,
//! tagged `Result` payloads for the offchain and ECDSA imports, and
//! compact-length-prefixed sequences for `ext_storage_append`.
//!
//! All compact integers come from `parity-scale-codec`, so the byte-level
//! encoding is identical with every other node implementation.

use codec::{Compact, Decode, Encode};

/// Encode `Option<bytes>`: `None → [0x00]`, `Some(v) → [0x01] ‖ compact(len) ‖ v`.
pub fn encode_option_bytes(value: Option<&[u8]>) -> Vec<u8> {
    match value {
        Some(v) => {
            let mut out = Vec::with_capacity(1 + 4 + v.len());
            out.push(0x01);
            Compact(v.len() as u32).encode_to(&mut out);
            out.extend_from_slice(v);
            out
        }
        None => vec![0x00],
    }
}

/// Decode an `Option<bytes>` envelope as produced by [`encode_option_bytes`].
pub fn decode_option_bytes(mut input: &[u8]) -> Result<Option<Vec<u8>>, codec::Error> {
    Option::<Vec<u8>>::decode(&mut input)
}

/// Encode a fixed-size option: `None → [0x00]`, `Some(v) → [0x01] ‖ v` with no
/// length prefix. Used for signature returns whose width is implied by the
/// algorithm.
pub fn encode_option_fixed(value: Option<&[u8]>) -> Vec<u8> {
    match value {
        Some(v) => {
            let mut out = Vec::with_capacity(1 + v.len());
            out.push(0x01);
            out.extend_from_slice(v);
            out
        }
        None => vec![0x00],
    }
}

/// Encode `Option<u32>` with a little-endian payload: `[0x01] ‖ u32 LE` or `[0x00]`.
pub fn encode_option_u32(value: Option<u32>) -> Vec<u8> {
    match value {
        Some(v) => {
            let mut out = Vec::with_capacity(5);
            out.push(0x01);
            out.extend_from_slice(&v.to_le_bytes());
            out
        }
        None => vec![0x00],
    }
}

/// Encode a `Result` envelope: `Ok → [0x00] ‖ payload`, `Err → [0x01] ‖ payload`.
///
/// The payload must already be encoded by the caller; empty results carry no
/// payload at all.
pub fn encode_result(result: Result<&[u8], &[u8]>) -> Vec<u8> {
    let (tag, payload) = match result {
        Ok(p) => (0x00, p),
        Err(p) => (0x01, p),
    };
    let mut out = Vec::with_capacity(1 + payload.len());
    out.push(tag);
    out.extend_from_slice(payload);
    out
}

/// Append one already-encoded element to a compact-length-prefixed sequence.
///
/// `stored` is the current storage value: `compact(n) ‖ item₀ ‖ … ‖ itemₙ₋₁`.
/// The result re-encodes the prefix as `compact(n + 1)` and concatenates
/// `element`. A missing or malformed `stored` value degrades to a fresh
/// one-element sequence.
pub fn append_compact_sequence(stored: Option<&[u8]>, element: &[u8]) -> Vec<u8> {
    let fresh = |element: &[u8]| {
        let mut out = Compact(1u32).encode();
        out.extend_from_slice(element);
        out
    };

    let stored = match stored {
        Some(s) if !s.is_empty() => s,
        _ => return fresh(element),
    };

    let mut input = stored;
    let count = match Compact::<u32>::decode(&mut input) {
        Ok(Compact(n)) => n,
        Err(_) => return fresh(element),
    };

    let body = input;
    let mut out = Compact(count.saturating_add(1)).encode();
    out.extend_from_slice(body);
    out.extend_from_slice(element);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_bytes_none_is_single_zero() {
        assert_eq!(encode_option_bytes(None), vec![0x00]);
    }

    #[test]
    fn test_option_bytes_some_has_compact_length() {
        let enc = encode_option_bytes(Some(b"abc"));
        // 0x01 tag, compact(3) = 3 << 2 = 0x0c, then the bytes.
        assert_eq!(enc, vec![0x01, 0x0c, b'a', b'b', b'c']);
    }

    #[test]
    fn test_option_bytes_roundtrip() {
        for value in [None, Some(&b""[..]), Some(&b"hello world"[..])] {
            let enc = encode_option_bytes(value);
            let dec = decode_option_bytes(&enc).unwrap();
            assert_eq!(dec.as_deref(), value);
        }
    }

    #[test]
    fn test_option_fixed_has_no_length_prefix() {
        let sig = [0xAB; 64];
        let enc = encode_option_fixed(Some(&sig));
        assert_eq!(enc.len(), 65);
        assert_eq!(enc[0], 0x01);
        assert_eq!(&enc[1..], &sig[..]);
    }

    #[test]
    fn test_option_u32() {
        assert_eq!(encode_option_u32(None), vec![0x00]);
        assert_eq!(encode_option_u32(Some(7)), vec![0x01, 7, 0, 0, 0]);
    }

    #[test]
    fn test_result_envelope_tags() {
        assert_eq!(encode_result(Ok(&[])), vec![0x00]);
        assert_eq!(encode_result(Err(&[])), vec![0x01]);
        assert_eq!(encode_result(Ok(&[0xAA, 0xBB])), vec![0x00, 0xAA, 0xBB]);
    }

    #[test]
    fn test_append_to_missing_value_starts_sequence() {
        let out = append_compact_sequence(None, &[1, 2, 3]);
        assert_eq!(out, vec![0x04, 1, 2, 3]); // compact(1) = 0x04
    }

    #[test]
    fn test_append_increments_count() {
        let first = append_compact_sequence(None, &[0xAA]);
        let second = append_compact_sequence(Some(&first), &[0xBB]);
        assert_eq!(second, vec![0x08, 0xAA, 0xBB]); // compact(2) = 0x08

        let mut input = &second[..];
        let Compact(n) = Compact::<u32>::decode(&mut input).unwrap();
        assert_eq!(n, 2);
    }

    #[test]
    fn test_append_crossing_compact_width_boundary() {
        // 63 single-byte elements, then one more: the prefix widens from
        // one byte (compact < 64) to two bytes.
        let mut stored = Compact(63u32).encode();
        stored.extend_from_slice(&vec![0u8; 63]);
        let out = append_compact_sequence(Some(&stored), &[9]);

        let mut input = &out[..];
        let Compact(n) = Compact::<u32>::decode(&mut input).unwrap();
        assert_eq!(n, 64);
        assert_eq!(input.len(), 64);
        assert_eq!(input[63], 9);
    }

    #[test]
    fn test_append_malformed_value_degrades_to_fresh() {
        // 0x03 low bits announce a big-integer compact, but the bytes are cut short.
        let out = append_compact_sequence(Some(&[0x03]), &[5]);
        assert_eq!(out, vec![0x04, 5]);
    }

    #[test]
    fn test_compact_prefix_widths() {
        for (value, width) in [(0u32, 1), (63, 1), (64, 2), (16383, 2), (16384, 4), (1 << 30, 5)] {
            assert_eq!(Compact(value).encode().len(), width, "compact({value})");
        }
    }
}
