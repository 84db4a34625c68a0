// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Field scanner for data-table source text.
//!
//! Input is one field per line in `Name : Value` form, as produced by the
//! table-template generator and the disassembler. A line is a field only if
//! it contains a colon preceded by a space outside any `[..]` tag; anything
//! else (comments, banners, blank lines) is skipped without diagnostics.

use crate::core::diagnostics::SourceLoc;

/// One scanned `Name : Value` line, with enough position information to
/// report diagnostics against the original text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableField {
    pub name: String,
    pub value: String,
    pub loc: SourceLoc,
}

impl TableField {
    pub fn new(name: &str, value: &str, line: u32, column: u32) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            loc: SourceLoc::new(line, column),
        }
    }
}

/// Find the byte index of the field separator: a colon at bracket depth
/// zero whose preceding character is a space.
fn separator_index(line: &str) -> Option<usize> {
    let bytes = line.as_bytes();
    let mut depth = 0u32;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'[' => depth += 1,
            b']' => depth = depth.saturating_sub(1),
            b':' if depth == 0 && i > 0 && bytes[i - 1] == b' ' => return Some(i),
            _ => {}
        }
    }
    None
}

/// Strip `[..]` tags (byte-offset annotations from the template generator)
/// out of a field name.
fn strip_tags(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut depth = 0u32;
    for c in name.chars() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out.trim().to_string()
}

/// Trim a raw value: cut at a trailing comment or a decoded-form marker,
/// then strip one surrounding quote pair.
fn clean_value(raw: &str) -> String {
    let mut v = raw;
    for marker in ["//", "(", "<"] {
        if let Some(at) = v.find(marker) {
            v = &v[..at];
        }
    }
    let v = v.trim();
    let v = v.strip_prefix('"').unwrap_or(v);
    let v = v.strip_suffix('"').unwrap_or(v);
    v.to_string()
}

fn is_comment(line: &str) -> bool {
    line.starts_with("//") || line.starts_with("/*") || line.starts_with('*')
}

/// Scan the whole source into an ordered field list. Non-field lines are
/// skipped; nothing here validates names or values.
pub fn scan_fields(source: &str) -> Vec<TableField> {
    let mut fields = Vec::new();
    for (index, raw) in source.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || is_comment(line) {
            continue;
        }
        let Some(colon) = separator_index(raw) else {
            continue;
        };
        let name = strip_tags(&raw[..colon]);
        if name.is_empty() {
            continue;
        }
        let value = clean_value(&raw[colon + 1..]);
        let column = (colon + 2).min(raw.len()) as u32;
        fields.push(TableField::new(&name, &value, index as u32 + 1, column));
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_name_value_lines_and_skips_noise() {
        let src = "\
/*\n\
 * template banner\n\
 */\n\
\n\
[0004] Signature : \"APIC\"\n\
[0004] Table Length : 00000000\n\
// trailing comment line\n\
[0001] Revision : 03\n";
        let fields = scan_fields(src);
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0].name, "Signature");
        assert_eq!(fields[0].value, "APIC");
        assert_eq!(fields[0].loc.line, 5);
        assert_eq!(fields[1].name, "Table Length");
        assert_eq!(fields[2].name, "Revision");
        assert_eq!(fields[2].value, "03");
    }

    #[test]
    fn colon_inside_brackets_is_not_a_separator() {
        let fields = scan_fields("[note: not a field] banner line\n[0004] Oem ID : \"INTEL\"\n");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].name, "Oem ID");
        assert_eq!(fields[0].value, "INTEL");
    }

    #[test]
    fn value_is_cut_at_decoded_form_and_comment() {
        let fields = scan_fields(
            " Flags (decoded below) : 00000001\n Address : 00000000FEE00000 // apic base\n",
        );
        assert_eq!(fields[0].name, "Flags (decoded below)");
        assert_eq!(fields[0].value, "00000001");
        assert_eq!(fields[1].value, "00000000FEE00000");
    }

    #[test]
    fn colon_without_leading_space_is_ignored() {
        let fields = scan_fields("timestamp 12:30 in a banner\n Subtable Type : 00\n");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].name, "Subtable Type");
    }
}
