// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Binary subtable tree assembled by the table driver.
//!
//! Length finalization propagates leaf lengths upward, re-writing any
//! subtable's own length field whenever its total changes; checksums are
//! solved afterwards over the finalized bytes. Flattening concatenates
//! every subtable's bytes in tree order.

use crate::core::diagnostics::{CompilerError, ErrorKind};

/// Location of a little-endian length field inside a subtable's own bytes.
#[derive(Debug, Clone, Copy)]
pub struct LengthField {
    pub offset: usize,
    pub width: usize,
    /// True when the field holds the whole table's length rather than its
    /// own subtable's.
    pub whole_table: bool,
}

/// Location of a checksum byte, solved over the whole finalized table.
#[derive(Debug, Clone, Copy)]
pub struct ChecksumField {
    pub offset: usize,
}

#[derive(Debug, Default)]
pub struct Subtable {
    pub bytes: Vec<u8>,
    pub length_field: Option<LengthField>,
    pub checksum_field: Option<ChecksumField>,
    pub children: Vec<Subtable>,
}

impl Subtable {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            ..Self::default()
        }
    }

    pub fn push_child(&mut self, child: Subtable) {
        self.children.push(child);
    }

    /// Own bytes plus all descendants'.
    pub fn total_length(&self) -> u32 {
        self.bytes.len() as u32 + self.children.iter().map(Subtable::total_length).sum::<u32>()
    }

    fn write_length(&mut self, value: u32) -> Result<bool, CompilerError> {
        let Some(lf) = self.length_field else {
            return Ok(false);
        };
        if lf.width < 4 && u64::from(value) >= 1u64 << (8 * lf.width) {
            let param = format!("{value} bytes exceeds a {}-byte length field", lf.width);
            return Err(CompilerError::new(
                ErrorKind::Table,
                "Subtable is too long for its length field",
                Some(&param),
            ));
        }
        let le = value.to_le_bytes();
        let slot = &mut self.bytes[lf.offset..lf.offset + lf.width];
        if slot[..] == le[..lf.width] {
            return Ok(false);
        }
        slot.copy_from_slice(&le[..lf.width]);
        Ok(true)
    }

    fn finalize_pass(&mut self, whole: u32) -> Result<bool, CompilerError> {
        let mut changed = false;
        for child in &mut self.children {
            changed |= child.finalize_pass(whole)?;
        }
        let value = match self.length_field {
            Some(lf) if lf.whole_table => whole,
            Some(_) => self.total_length(),
            None => return Ok(changed),
        };
        Ok(changed | self.write_length(value)?)
    }

    /// Propagate lengths bottom-up until no length field changes. Fixed
    /// whole-table fields depend on every subtable, so the pass repeats
    /// when any write lands.
    pub fn finalize_lengths(&mut self) -> Result<(), CompilerError> {
        loop {
            let whole = self.total_length();
            if !self.finalize_pass(whole)? {
                break;
            }
        }
        Ok(())
    }

    fn sum_bytes(&self) -> u8 {
        let own = self.bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
        self.children
            .iter()
            .fold(own, |acc, c| acc.wrapping_add(c.sum_bytes()))
    }

    /// Solve every checksum byte in the tree so the whole table sums to
    /// zero modulo 256. Depth-first, one solve per checksum field; root
    /// tables have one, most subtables none.
    pub fn apply_checksums(&mut self) {
        let total = self.sum_bytes();
        self.solve_checksums(total);
    }

    fn solve_checksums(&mut self, total: u8) {
        if let Some(cf) = self.checksum_field {
            let old = self.bytes[cf.offset];
            self.bytes[cf.offset] = old.wrapping_sub(total);
        }
        for child in &mut self.children {
            child.solve_checksums(total);
        }
    }

    /// Concatenate the tree's bytes in pre-order.
    pub fn flatten(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.total_length() as usize);
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.bytes);
        for child in &self.children {
            child.flatten_into(out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_sum_over_descendants() {
        let mut root = Subtable::new(vec![0; 10]);
        let mut unit = Subtable::new(vec![0; 4]);
        unit.push_child(Subtable::new(vec![0; 6]));
        root.push_child(unit);
        assert_eq!(root.total_length(), 20);
    }

    #[test]
    fn length_fields_cover_self_and_descendants() {
        let mut root = Subtable::new(vec![0; 8]);
        root.length_field = Some(LengthField {
            offset: 0,
            width: 4,
            whole_table: true,
        });
        let mut unit = Subtable::new(vec![0; 4]);
        unit.length_field = Some(LengthField {
            offset: 2,
            width: 2,
            whole_table: false,
        });
        unit.push_child(Subtable::new(vec![0; 6]));
        root.push_child(unit);
        root.finalize_lengths().unwrap();
        assert_eq!(&root.bytes[..4], &18u32.to_le_bytes());
        assert_eq!(&unitless(&root).bytes[2..4], &10u16.to_le_bytes());
    }

    #[test]
    fn length_overflowing_its_field_width_is_an_error() {
        let mut unit = Subtable::new(vec![0; 2]);
        unit.length_field = Some(LengthField {
            offset: 1,
            width: 1,
            whole_table: false,
        });
        unit.push_child(Subtable::new(vec![0; 300]));
        let err = unit.finalize_lengths().unwrap_err();
        assert!(err.message().contains("too long for its length field"));
        assert!(err.message().contains("302 bytes"));
    }

    fn unitless(root: &Subtable) -> &Subtable {
        &root.children[0]
    }

    #[test]
    fn checksum_zeroes_the_table_and_is_idempotent() {
        let mut root = Subtable::new(vec![0x11, 0x22, 0x00, 0x44]);
        root.checksum_field = Some(ChecksumField { offset: 2 });
        root.push_child(Subtable::new(vec![0x55, 0x66]));
        root.apply_checksums();
        let flat = root.flatten();
        let sum = flat.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
        assert_eq!(sum, 0);
        let solved = root.bytes[2];
        // A second solve over unmodified bytes must not move the byte.
        root.apply_checksums();
        assert_eq!(root.bytes[2], solved);
    }

    #[test]
    fn flatten_is_preorder() {
        let mut root = Subtable::new(vec![1]);
        let mut a = Subtable::new(vec![2]);
        a.push_child(Subtable::new(vec![3]));
        root.push_child(a);
        root.push_child(Subtable::new(vec![4]));
        assert_eq!(root.flatten(), vec![1, 2, 3, 4]);
    }
}
