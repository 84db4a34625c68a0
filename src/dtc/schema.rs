// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Field-layout schemas for the supported ACPI tables.
//!
//! A schema is a flat row list; the driver consumes source fields against
//! it in order. Tables with variable shapes (subtable lists, nested device
//! scopes) are stitched together in the driver from several schemas, with
//! a discriminator read out of the just-compiled bytes selecting the next
//! one. Generic (`OEMx`) tables have no fixed schema at all: each field's
//! type comes from its name, which is also the only place labels can occur.

use crate::dtc::TableKind;

/// Binary representation of one schema row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    U8,
    U16,
    U32,
    U64,
    /// Fixed-width character field, zero padded.
    Name(u8),
    /// Fixed-width raw byte field from a hex list.
    Bytes(u8),
    /// Variable-length hex byte list.
    Buffer,
    /// NUL-terminated string, width = length + 1.
    String,
    /// UTF-16LE string with 16-bit terminator.
    Unicode,
    Uuid,
    /// An integer that opens a flag group for following `Flag` rows.
    Flags(u8),
    /// Sub-field of the preceding `Flags` row. Occupies no bytes of its
    /// own; the value is OR'd in at `bit`.
    Flag { bit: u8, width: u8 },
    /// Named offset marker, zero width.
    Label,
}

impl FieldType {
    /// Encoded width in bytes; `None` when it depends on the value.
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            FieldType::U8 => Some(1),
            FieldType::U16 => Some(2),
            FieldType::U32 => Some(4),
            FieldType::U64 => Some(8),
            FieldType::Name(n) | FieldType::Bytes(n) | FieldType::Flags(n) => Some(n as usize),
            FieldType::Flag { .. } | FieldType::Label => Some(0),
            FieldType::Buffer | FieldType::String | FieldType::Unicode => None,
            FieldType::Uuid => Some(16),
        }
    }
}

/// What the compiled bytes of a row are later used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRole {
    Data,
    /// Receives the whole table's byte length during finalization.
    TableLength,
    /// Receives the enclosing subtable's byte length during finalization.
    SubtableLength,
    /// Solved last so the whole table sums to zero modulo 256.
    Checksum,
}

#[derive(Debug, Clone, Copy)]
pub struct SchemaRow {
    pub name: &'static str,
    pub ftype: FieldType,
    pub role: FieldRole,
}

const fn row(name: &'static str, ftype: FieldType) -> SchemaRow {
    SchemaRow {
        name,
        ftype,
        role: FieldRole::Data,
    }
}

const fn special(name: &'static str, ftype: FieldType, role: FieldRole) -> SchemaRow {
    SchemaRow { name, ftype, role }
}

/// The common 36-byte table header every supported table starts with.
pub static TABLE_HEADER: &[SchemaRow] = &[
    row("Signature", FieldType::Name(4)),
    special("Table Length", FieldType::U32, FieldRole::TableLength),
    row("Revision", FieldType::U8),
    special("Checksum", FieldType::U8, FieldRole::Checksum),
    row("Oem ID", FieldType::Name(6)),
    row("Oem Table ID", FieldType::Name(8)),
    row("Oem Revision", FieldType::U32),
    row("Asl Compiler ID", FieldType::Name(4)),
    row("Asl Compiler Revision", FieldType::U32),
];

pub static BERT_BODY: &[SchemaRow] = &[
    row("Boot Error Region Length", FieldType::U32),
    row("Boot Error Region Address", FieldType::U64),
];

pub static MADT_BODY: &[SchemaRow] = &[
    row("Local Apic Address", FieldType::U32),
    row("Flags (decoded below)", FieldType::Flags(4)),
    row("PC-AT Compatibility", FieldType::Flag { bit: 0, width: 1 }),
];

/// Every MADT subtable opens with a type code and its own byte length.
pub static MADT_SUBTABLE_HEADER: &[SchemaRow] = &[
    row("Subtable Type", FieldType::U8),
    special("Length", FieldType::U8, FieldRole::SubtableLength),
];

pub static MADT_LOCAL_APIC: &[SchemaRow] = &[
    row("Processor ID", FieldType::U8),
    row("Local Apic ID", FieldType::U8),
    row("Flags (decoded below)", FieldType::Flags(4)),
    row("Processor Enabled", FieldType::Flag { bit: 0, width: 1 }),
];

pub static MADT_IO_APIC: &[SchemaRow] = &[
    row("I/O Apic ID", FieldType::U8),
    row("Reserved", FieldType::U8),
    row("Address", FieldType::U32),
    row("Interrupt", FieldType::U32),
];

/// MADT subtable type code to body schema.
pub fn madt_subtable_body(type_code: u8) -> Option<&'static [SchemaRow]> {
    match type_code {
        0 => Some(MADT_LOCAL_APIC),
        1 => Some(MADT_IO_APIC),
        _ => None,
    }
}

pub static DMAR_BODY: &[SchemaRow] = &[
    row("Host Address Width", FieldType::U8),
    row("Flags", FieldType::U8),
    row("Reserved", FieldType::Bytes(10)),
];

pub static DMAR_SUBTABLE_HEADER: &[SchemaRow] = &[
    row("Subtable Type", FieldType::U16),
    special("Length", FieldType::U16, FieldRole::SubtableLength),
];

pub static DMAR_HARDWARE_UNIT: &[SchemaRow] = &[
    row("Flags", FieldType::U8),
    row("Reserved", FieldType::U8),
    row("PCI Segment Number", FieldType::U16),
    row("Register Base Address", FieldType::U64),
];

/// One device-scope entry nested inside a hardware-unit subtable; its PCI
/// path pairs follow as separate repeated fields.
pub static DMAR_DEVICE_SCOPE: &[SchemaRow] = &[
    row("Device Scope Type", FieldType::U8),
    special("Entry Length", FieldType::U8, FieldRole::SubtableLength),
    row("Reserved", FieldType::U16),
    row("Enumeration ID", FieldType::U8),
    row("PCI Bus Number", FieldType::U8),
];

pub static DMAR_PCI_PATH: SchemaRow = row("PCI Path", FieldType::Bytes(2));

/// DMAR subtable type code to body schema.
pub fn dmar_subtable_body(type_code: u16) -> Option<&'static [SchemaRow]> {
    match type_code {
        0 => Some(DMAR_HARDWARE_UNIT),
        _ => None,
    }
}

/// Select the table shape from the header signature. Signatures beginning
/// `OEM` compile as name-typed generic tables.
pub fn table_kind(signature: &str) -> Option<TableKind> {
    match signature {
        "BERT" => Some(TableKind::Bert),
        "APIC" => Some(TableKind::Madt),
        "DMAR" => Some(TableKind::Dmar),
        _ if signature.starts_with("OEM") => Some(TableKind::Generic),
        _ => None,
    }
}

/// Field types for generic tables, keyed by field name.
pub fn generic_type(name: &str) -> Option<FieldType> {
    match name {
        "UInt8" => Some(FieldType::U8),
        "UInt16" => Some(FieldType::U16),
        "UInt32" => Some(FieldType::U32),
        "UInt64" => Some(FieldType::U64),
        "String" => Some(FieldType::String),
        "Buffer" => Some(FieldType::Buffer),
        "Unicode" => Some(FieldType::Unicode),
        "Uuid" | "GUID" => Some(FieldType::Uuid),
        "Label" => Some(FieldType::Label),
        _ => None,
    }
}
