// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Compile-time constant encodings.
//!
//! EISAID and UUID are textual macro forms replaced with integer and buffer
//! literals during code generation. Both encodings have exact inverses,
//! which the disassembly side of the toolchain and the tests rely on.

use crate::core::diagnostics::{CompilerError, ErrorKind};

/// Smallest unsigned byte width (1, 2, 4, or 8) that holds `v`.
pub fn minimized_width(v: u64) -> u8 {
    if v <= u64::from(u8::MAX) {
        1
    } else if v <= u64::from(u16::MAX) {
        2
    } else if v <= u64::from(u32::MAX) {
        4
    } else {
        8
    }
}

/// Pack a 7-character EISA id (`"PNP0501"`: three uppercase letters and
/// four hex digits) into its 32-bit swapped form.
pub fn encode_eisaid(id: &str) -> Result<u32, CompilerError> {
    let bytes = id.as_bytes();
    if bytes.len() != 7 {
        return Err(CompilerError::new(
            ErrorKind::Codegen,
            "EISA id must be exactly 7 characters",
            Some(id),
        ));
    }
    for &c in &bytes[..3] {
        if !c.is_ascii_uppercase() {
            return Err(CompilerError::new(
                ErrorKind::Codegen,
                "EISA id must start with 3 uppercase letters",
                Some(id),
            ));
        }
    }
    let mut hex = 0u32;
    for &c in &bytes[3..] {
        let digit = (c as char).to_digit(16).ok_or_else(|| {
            CompilerError::new(
                ErrorKind::Codegen,
                "EISA id must end with 4 hex digits",
                Some(id),
            )
        })?;
        hex = hex << 4 | digit;
    }
    let packed = (u32::from(bytes[0] - 0x40) << 26)
        | (u32::from(bytes[1] - 0x40) << 21)
        | (u32::from(bytes[2] - 0x40) << 16)
        | hex;
    Ok(packed.swap_bytes())
}

/// Inverse of [`encode_eisaid`].
pub fn decode_eisaid(value: u32) -> String {
    let packed = value.swap_bytes();
    let mut out = String::with_capacity(7);
    out.push((((packed >> 26) & 0x1F) as u8 + 0x40) as char);
    out.push((((packed >> 21) & 0x1F) as u8 + 0x40) as char);
    out.push((((packed >> 16) & 0x1F) as u8 + 0x40) as char);
    for shift in [12u32, 8, 4, 0] {
        let digit = (packed >> shift) & 0xF;
        out.push(char::from_digit(digit, 16).unwrap().to_ascii_uppercase());
    }
    out
}

/// String offset of the hex pair feeding each of the 16 UUID bytes. The
/// first three groups are little-endian, the last two big-endian.
const UUID_BYTE_OFFSET: [usize; 16] = [
    6, 4, 2, 0, 11, 9, 16, 14, 19, 21, 24, 26, 28, 30, 32, 34,
];

fn hex_pair(bytes: &[u8], at: usize) -> Option<u8> {
    let hi = (bytes[at] as char).to_digit(16)?;
    let lo = (bytes[at + 1] as char).to_digit(16)?;
    Some((hi << 4 | lo) as u8)
}

/// Encode a canonical 36-character hyphenated UUID string into its 16-byte
/// wire form.
pub fn encode_uuid(text: &str) -> Result<[u8; 16], CompilerError> {
    let bytes = text.as_bytes();
    let well_formed = bytes.len() == 36
        && bytes
            .iter()
            .enumerate()
            .all(|(i, &c)| match i {
                8 | 13 | 18 | 23 => c == b'-',
                _ => c.is_ascii_hexdigit(),
            });
    if !well_formed {
        return Err(CompilerError::new(
            ErrorKind::Codegen,
            "UUID must use the aabbccdd-eeff-0011-2233-445566778899 form",
            Some(text),
        ));
    }
    let mut out = [0u8; 16];
    for (i, &offset) in UUID_BYTE_OFFSET.iter().enumerate() {
        out[i] = hex_pair(bytes, offset)
            .ok_or_else(|| CompilerError::internal("UUID offset table out of range"))?;
    }
    Ok(out)
}

/// Inverse of [`encode_uuid`], producing the lowercase hyphenated form.
pub fn decode_uuid(bytes: [u8; 16]) -> String {
    let mut out = [b'-'; 36];
    for (i, &offset) in UUID_BYTE_OFFSET.iter().enumerate() {
        let hex = format!("{:02x}", bytes[i]);
        out[offset] = hex.as_bytes()[0];
        out[offset + 1] = hex.as_bytes()[1];
    }
    String::from_utf8(out.to_vec()).unwrap_or_default()
}

/// Re-encode a string as 16-bit little-endian code units with a 16-bit NUL
/// terminator, the payload of the Unicode buffer macro.
pub fn encode_unicode(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() * 2 + 2);
    for unit in text.encode_utf16() {
        out.extend_from_slice(&unit.to_le_bytes());
    }
    out.extend_from_slice(&[0, 0]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn eisaid_round_trip_pnp0501() {
        let encoded = encode_eisaid("PNP0501").unwrap();
        assert_eq!(decode_eisaid(encoded), "PNP0501");
    }

    #[test]
    fn eisaid_rejects_malformed_ids() {
        assert!(encode_eisaid("PNP050").is_err());
        assert!(encode_eisaid("pnp0501").is_err());
        assert!(encode_eisaid("PNP05G1").is_err());
    }

    #[test]
    fn uuid_round_trip() {
        let text = "aabbccdd-eeff-0011-2233-445566778899";
        let bytes = encode_uuid(text).unwrap();
        assert_eq!(decode_uuid(bytes), text);
        // First group is stored little-endian.
        assert_eq!(&bytes[..4], &[0xDD, 0xCC, 0xBB, 0xAA]);
    }

    #[test]
    fn uuid_rejects_misplaced_hyphens() {
        assert!(encode_uuid("aabbccdd0eeff-0011-2233-445566778899").is_err());
        assert!(encode_uuid("aabbccdd-eeff-0011-2233-44556677889").is_err());
    }

    #[test]
    fn unicode_payload_is_utf16le_with_terminator() {
        assert_eq!(
            encode_unicode("AB"),
            vec![0x41, 0x00, 0x42, 0x00, 0x00, 0x00]
        );
    }

    proptest! {
        #[test]
        fn width_is_minimal(v in any::<u64>()) {
            let w = minimized_width(v);
            prop_assert!(matches!(w, 1 | 2 | 4 | 8));
            // Fits in the chosen width.
            if w < 8 {
                prop_assert!(v < 1u64 << (8 * w));
            }
            // Does not fit in the next width down.
            match w {
                2 => prop_assert!(v > u64::from(u8::MAX)),
                4 => prop_assert!(v > u64::from(u16::MAX)),
                8 => prop_assert!(v > u64::from(u32::MAX)),
                _ => {}
            }
        }

        #[test]
        fn eisaid_round_trips_for_all_valid_ids(
            letters in "[A-Z]{3}",
            digits in "[0-9A-F]{4}",
        ) {
            let id = format!("{letters}{digits}");
            let encoded = encode_eisaid(&id).unwrap();
            prop_assert_eq!(decode_eisaid(encoded), id);
        }

        #[test]
        fn uuid_round_trips_for_all_byte_patterns(bytes in any::<[u8; 16]>()) {
            let text = decode_uuid(bytes);
            prop_assert_eq!(encode_uuid(&text).unwrap(), bytes);
        }
    }
}
