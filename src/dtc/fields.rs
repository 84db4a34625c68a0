// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Per-type encoders for data-table field values.
//!
//! Each encoder range-checks its input against the declared field width,
//! reports through the session, and degrades to a well-defined truncated
//! or zeroed encoding so table compilation can continue past bad values.

use crate::codegen::constants;
use crate::core::diagnostics::{CompilerError, ErrorKind};
use crate::core::session::Session;
use crate::dtc::expr::{resolve_integer, LabelMap};
use crate::dtc::scan::TableField;

/// Compile an integer-valued field to `width` bytes, little endian.
///
/// Fields named `Reserved` are forced to zero with a warning when the
/// source says otherwise.
pub fn compile_integer(
    session: &mut Session,
    labels: &LabelMap,
    field: &TableField,
    width: usize,
) -> Result<u64, CompilerError> {
    let mut v = match resolve_integer(labels, field) {
        Ok(v) => v,
        Err(e) => {
            session.error(e.kind(), e.message(), None, field.loc.clone())?;
            0
        }
    };
    let max = if width >= 8 { u64::MAX } else { (1u64 << (width * 8)) - 1 };
    if v > max {
        let param = format!("0x{v:X} does not fit in {width} bytes");
        session.error(
            ErrorKind::Table,
            "Integer is too large for its field",
            Some(&param),
            field.loc.clone(),
        )?;
        v &= max;
    }
    if field.name == "Reserved" && v != 0 {
        session.warning(
            ErrorKind::Table,
            "Reserved field must be zero",
            Some(&field.name),
            field.loc.clone(),
        )?;
        v = 0;
    }
    Ok(v)
}

pub fn write_le(out: &mut Vec<u8>, v: u64, width: usize) {
    out.extend_from_slice(&v.to_le_bytes()[..width]);
}

/// Fixed-width character field, zero padded, truncated with an error when
/// the source text is longer than the field.
pub fn compile_name(
    session: &mut Session,
    field: &TableField,
    width: usize,
) -> Result<Vec<u8>, CompilerError> {
    let mut bytes = field.value.as_bytes().to_vec();
    if bytes.len() > width {
        let param = format!("\"{}\" exceeds {} bytes", field.value, width);
        session.error(
            ErrorKind::Table,
            "String is too long for its field",
            Some(&param),
            field.loc.clone(),
        )?;
        bytes.truncate(width);
    }
    bytes.resize(width, 0);
    Ok(bytes)
}

/// Variable-length NUL-terminated string.
pub fn compile_string(field: &TableField) -> Vec<u8> {
    let mut bytes = field.value.as_bytes().to_vec();
    bytes.push(0);
    bytes
}

/// UTF-16LE string with a 16-bit terminator, sharing the AML encoder.
pub fn compile_unicode(field: &TableField) -> Vec<u8> {
    constants::encode_unicode(&field.value)
}

pub fn compile_uuid(
    session: &mut Session,
    field: &TableField,
) -> Result<Vec<u8>, CompilerError> {
    match constants::encode_uuid(&field.value) {
        Ok(bytes) => Ok(bytes.to_vec()),
        Err(e) => {
            session.error(ErrorKind::Table, e.message(), None, field.loc.clone())?;
            Ok(vec![0; 16])
        }
    }
}

/// Parse a hex byte list, normalizing `,` and `;` separators to spaces
/// before splitting.
pub fn compile_buffer(
    session: &mut Session,
    field: &TableField,
) -> Result<Vec<u8>, CompilerError> {
    let normalized: String = field
        .value
        .chars()
        .map(|c| if c == ',' || c == ';' { ' ' } else { c })
        .collect();
    let mut bytes = Vec::new();
    for token in normalized.split_whitespace() {
        match u8::from_str_radix(token, 16) {
            Ok(b) => bytes.push(b),
            Err(_) => {
                session.error(
                    ErrorKind::Table,
                    "Invalid hex byte in buffer field",
                    Some(token),
                    field.loc.clone(),
                )?;
            }
        }
    }
    Ok(bytes)
}

/// Fixed-width raw byte field: a hex list padded or truncated to `width`.
pub fn compile_fixed_bytes(
    session: &mut Session,
    field: &TableField,
    width: usize,
) -> Result<Vec<u8>, CompilerError> {
    let mut bytes = compile_buffer(session, field)?;
    if bytes.len() > width {
        let param = format!("{} bytes exceed the {width}-byte field", bytes.len());
        session.error(
            ErrorKind::Table,
            "Buffer is too long for its field",
            Some(&param),
            field.loc.clone(),
        )?;
        bytes.truncate(width);
    }
    bytes.resize(width, 0);
    Ok(bytes)
}

/// OR a flag value into an already-written flag group at `base`.
pub fn compile_flag(
    session: &mut Session,
    labels: &LabelMap,
    field: &TableField,
    bit: u8,
    width: u8,
    group: &mut [u8],
) -> Result<(), CompilerError> {
    let v = match resolve_integer(labels, field) {
        Ok(v) => v,
        Err(e) => {
            session.error(e.kind(), e.message(), None, field.loc.clone())?;
            0
        }
    };
    let max = (1u64 << width) - 1;
    let v = if v > max {
        let param = format!("0x{v:X} does not fit in {width} bit(s)");
        session.error(
            ErrorKind::Table,
            "Flag value is too large for its bit width",
            Some(&param),
            field.loc.clone(),
        )?;
        v & max
    } else {
        v
    };
    let mut packed = 0u64;
    for (i, b) in group.iter().enumerate() {
        packed |= u64::from(*b) << (i * 8);
    }
    packed |= v << bit;
    for (i, b) in group.iter_mut().enumerate() {
        *b = (packed >> (i * 8)) as u8;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::session::SessionConfig;

    fn session() -> Session {
        Session::new(SessionConfig::default())
    }

    fn field(name: &str, value: &str) -> TableField {
        TableField::new(name, value, 7, 1)
    }

    #[test]
    fn integer_range_check_truncates_and_reports() {
        let mut session = session();
        let labels = LabelMap::new();
        let v = compile_integer(&mut session, &labels, &field("Revision", "1FF"), 1).unwrap();
        assert_eq!(v, 0xFF);
        assert_eq!(session.diagnostics().error_count(), 1);
    }

    #[test]
    fn reserved_fields_are_forced_to_zero() {
        let mut session = session();
        let labels = LabelMap::new();
        let v = compile_integer(&mut session, &labels, &field("Reserved", "7"), 2).unwrap();
        assert_eq!(v, 0);
        assert_eq!(session.diagnostics().warning_count(), 1);
    }

    #[test]
    fn name_field_pads_and_truncates() {
        let mut session = session();
        let bytes = compile_name(&mut session, &field("Oem ID", "ACME"), 6).unwrap();
        assert_eq!(bytes, b"ACME\0\0");
        let bytes = compile_name(&mut session, &field("Oem ID", "TOOLONGNAME"), 6).unwrap();
        assert_eq!(bytes, b"TOOLON");
        assert_eq!(session.diagnostics().error_count(), 1);
    }

    #[test]
    fn buffer_accepts_mixed_separators() {
        let mut session = session();
        let bytes = compile_buffer(&mut session, &field("Buffer", "0A,0B 0C;0D")).unwrap();
        assert_eq!(bytes, vec![0x0A, 0x0B, 0x0C, 0x0D]);
        assert!(session.diagnostics().is_empty());
    }

    #[test]
    fn flag_packs_at_declared_bit_position() {
        let mut session = session();
        let labels = LabelMap::new();
        let mut group = vec![0u8; 4];
        compile_flag(&mut session, &labels, &field("Enabled", "1"), 0, 1, &mut group).unwrap();
        compile_flag(&mut session, &labels, &field("Polarity", "3"), 2, 2, &mut group).unwrap();
        assert_eq!(group, vec![0x0D, 0, 0, 0]);
    }

    #[test]
    fn flag_value_wider_than_declared_bits_is_masked() {
        let mut session = session();
        let labels = LabelMap::new();
        let mut group = vec![0u8; 1];
        compile_flag(&mut session, &labels, &field("Enabled", "2"), 0, 1, &mut group).unwrap();
        assert_eq!(group, vec![0]);
        assert_eq!(session.diagnostics().error_count(), 1);
    }
}
