// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Data table compiler.
//!
//! An independent pipeline from the ASL compiler: `Name : Value` source
//! lines are scanned into a flat field list, a label pre-scan records
//! byte offsets for forward references, and the driver consumes fields
//! against per-table schemas into a tree of binary subtables. The common
//! header compiles first; its signature selects the table shape, and for
//! subtable lists a type code read back out of the just-compiled bytes
//! selects the next schema. Unknown signatures and unknown subtable type
//! codes are fatal for the table.

pub mod expr;
pub mod fields;
pub mod scan;
pub mod schema;
pub mod subtable;

use log::debug;

use crate::core::diagnostics::{CompilerError, ErrorKind};
use crate::core::session::Session;
use expr::LabelMap;
use scan::TableField;
use schema::{FieldRole, FieldType, SchemaRow};
use subtable::{ChecksumField, LengthField, Subtable};

/// Table shapes the driver knows how to stitch together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    /// Fixed body, no subtables.
    Bert,
    /// Body followed by a list of type-discriminated subtables.
    Madt,
    /// Subtables containing nested device-scope groups.
    Dmar,
    /// No fixed schema; each field's name selects its type.
    Generic,
}

struct FieldCursor<'a> {
    fields: &'a [TableField],
    pos: usize,
}

impl<'a> FieldCursor<'a> {
    fn new(fields: &'a [TableField]) -> Self {
        Self { fields, pos: 0 }
    }

    fn peek(&self) -> Option<&'a TableField> {
        self.fields.get(self.pos)
    }

    fn next_field(&mut self) -> Option<&'a TableField> {
        let field = self.fields.get(self.pos)?;
        self.pos += 1;
        Some(field)
    }
}

/// Encoded width of one field value, for offset accounting ahead of
/// compilation. Only variable-width types consult the value.
fn value_width(ftype: FieldType, value: &str) -> u64 {
    match ftype {
        FieldType::String => value.len() as u64 + 1,
        FieldType::Unicode => (value.encode_utf16().count() as u64 + 1) * 2,
        FieldType::Buffer => value
            .chars()
            .map(|c| if c == ',' || c == ';' { ' ' } else { c })
            .collect::<String>()
            .split_whitespace()
            .count() as u64,
        other => other.fixed_width().unwrap_or(0) as u64,
    }
}

/// Scan-ahead pass recording every label's table byte offset, enabling
/// forward references in integer expressions. Offsets come from the
/// schema-declared widths alone, so this runs before any compilation.
/// Labels only occur in generic tables; the shared header is accounted
/// for positionally and unrecognized names contribute nothing.
pub fn detect_all_labels(
    session: &mut Session,
    table_fields: &[TableField],
) -> Result<LabelMap, CompilerError> {
    let mut labels = LabelMap::new();
    let mut offset = 0u64;
    let mut header = schema::TABLE_HEADER.iter();
    for field in table_fields {
        if let Some(row) = header.next() {
            offset += row.ftype.fixed_width().unwrap_or(0) as u64;
            continue;
        }
        match schema::generic_type(&field.name) {
            Some(FieldType::Label) => {
                if labels.insert(field.value.clone(), offset).is_some() {
                    session.error(
                        ErrorKind::Table,
                        "Duplicate label",
                        Some(&field.value),
                        field.loc.clone(),
                    )?;
                }
            }
            Some(ftype) => offset += value_width(ftype, &field.value),
            None => {}
        }
    }
    Ok(labels)
}

/// Compile one field of a known type onto the end of `out`. `flag_base`
/// tracks the byte range of the most recent `Flags` row for the flag
/// sub-fields that follow it.
fn compile_one(
    session: &mut Session,
    labels: &LabelMap,
    field: &TableField,
    ftype: FieldType,
    out: &mut Vec<u8>,
    flag_base: &mut Option<(usize, usize)>,
) -> Result<(), CompilerError> {
    match ftype {
        FieldType::U8 | FieldType::U16 | FieldType::U32 | FieldType::U64 => {
            let width = ftype.fixed_width().unwrap_or(0);
            let v = fields::compile_integer(session, labels, field, width)?;
            fields::write_le(out, v, width);
        }
        FieldType::Flags(width) => {
            let width = width as usize;
            let v = fields::compile_integer(session, labels, field, width)?;
            *flag_base = Some((out.len(), width));
            fields::write_le(out, v, width);
        }
        FieldType::Flag { bit, width } => {
            let (base, group_width) = flag_base.ok_or_else(|| {
                CompilerError::internal("Flag field without a preceding flag group")
            })?;
            let group = &mut out[base..base + group_width];
            fields::compile_flag(session, labels, field, bit, width, group)?;
        }
        FieldType::Name(width) => {
            out.extend_from_slice(&fields::compile_name(session, field, width as usize)?);
        }
        FieldType::Bytes(width) => {
            out.extend_from_slice(&fields::compile_fixed_bytes(
                session,
                field,
                width as usize,
            )?);
        }
        FieldType::Buffer => out.extend_from_slice(&fields::compile_buffer(session, field)?),
        FieldType::String => out.extend_from_slice(&fields::compile_string(field)),
        FieldType::Unicode => out.extend_from_slice(&fields::compile_unicode(field)),
        FieldType::Uuid => out.extend_from_slice(&fields::compile_uuid(session, field)?),
        FieldType::Label => {}
    }
    Ok(())
}

/// Consume source fields against a schema, in order, into one subtable.
/// A missing or misnamed field is fatal for the table: the field stream
/// cannot be re-synchronized against the schema.
fn compile_schema(
    session: &mut Session,
    cursor: &mut FieldCursor<'_>,
    labels: &LabelMap,
    rows: &[SchemaRow],
) -> Result<Subtable, CompilerError> {
    let mut sub = Subtable::default();
    let mut flag_base: Option<(usize, usize)> = None;
    for row in rows {
        let Some(field) = cursor.next_field() else {
            return Err(CompilerError::new(
                ErrorKind::Table,
                "Required field is missing",
                Some(row.name),
            ));
        };
        if field.name != row.name {
            let param = format!("found \"{}\", expected \"{}\"", field.name, row.name);
            return Err(CompilerError::new(
                ErrorKind::Table,
                "Invalid field name",
                Some(&param),
            ));
        }
        let offset = sub.bytes.len();
        compile_one(session, labels, field, row.ftype, &mut sub.bytes, &mut flag_base)?;
        match row.role {
            FieldRole::Data => {}
            FieldRole::TableLength => {
                sub.length_field = Some(LengthField {
                    offset,
                    width: row.ftype.fixed_width().unwrap_or(0),
                    whole_table: true,
                });
            }
            FieldRole::SubtableLength => {
                sub.length_field = Some(LengthField {
                    offset,
                    width: row.ftype.fixed_width().unwrap_or(0),
                    whole_table: false,
                });
            }
            FieldRole::Checksum => {
                sub.checksum_field = Some(ChecksumField { offset });
            }
        }
    }
    Ok(sub)
}

fn compile_madt(
    session: &mut Session,
    cursor: &mut FieldCursor<'_>,
    labels: &LabelMap,
    root: &mut Subtable,
) -> Result<(), CompilerError> {
    root.push_child(compile_schema(session, cursor, labels, schema::MADT_BODY)?);
    while cursor.peek().is_some() {
        let mut sub = compile_schema(session, cursor, labels, schema::MADT_SUBTABLE_HEADER)?;
        let type_code = sub.bytes[0];
        let Some(body) = schema::madt_subtable_body(type_code) else {
            return Err(CompilerError::new(
                ErrorKind::Table,
                "Unknown subtable type",
                Some(&format!("0x{type_code:02X}")),
            ));
        };
        sub.push_child(compile_schema(session, cursor, labels, body)?);
        root.push_child(sub);
    }
    Ok(())
}

fn compile_dmar(
    session: &mut Session,
    cursor: &mut FieldCursor<'_>,
    labels: &LabelMap,
    root: &mut Subtable,
) -> Result<(), CompilerError> {
    root.push_child(compile_schema(session, cursor, labels, schema::DMAR_BODY)?);
    while cursor.peek().is_some() {
        let mut unit = compile_schema(session, cursor, labels, schema::DMAR_SUBTABLE_HEADER)?;
        let type_code = u16::from_le_bytes([unit.bytes[0], unit.bytes[1]]);
        let Some(body) = schema::dmar_subtable_body(type_code) else {
            return Err(CompilerError::new(
                ErrorKind::Table,
                "Unknown subtable type",
                Some(&format!("0x{type_code:04X}")),
            ));
        };
        unit.push_child(compile_schema(session, cursor, labels, body)?);
        // Nested device-scope groups, each terminated by the absence of a
        // further path field.
        while cursor.peek().is_some_and(|f| f.name == "Device Scope Type") {
            let mut scope =
                compile_schema(session, cursor, labels, schema::DMAR_DEVICE_SCOPE)?;
            while cursor.peek().is_some_and(|f| f.name == schema::DMAR_PCI_PATH.name) {
                let field = cursor.next_field().unwrap();
                let mut flag_base = None;
                compile_one(
                    session,
                    labels,
                    field,
                    schema::DMAR_PCI_PATH.ftype,
                    &mut scope.bytes,
                    &mut flag_base,
                )?;
            }
            unit.push_child(scope);
        }
        root.push_child(unit);
    }
    Ok(())
}

fn compile_generic(
    session: &mut Session,
    cursor: &mut FieldCursor<'_>,
    labels: &LabelMap,
    root: &mut Subtable,
) -> Result<(), CompilerError> {
    let mut body = Subtable::default();
    let mut flag_base = None;
    while let Some(field) = cursor.next_field() {
        let Some(ftype) = schema::generic_type(&field.name) else {
            session.error(
                ErrorKind::Table,
                "Unknown field type name",
                Some(&field.name),
                field.loc.clone(),
            )?;
            continue;
        };
        compile_one(session, labels, field, ftype, &mut body.bytes, &mut flag_base)?;
    }
    root.push_child(body);
    Ok(())
}

/// Compile one table source into its binary image.
pub fn compile_table(session: &mut Session, source: &str) -> Result<Vec<u8>, CompilerError> {
    let table_fields = scan::scan_fields(source);
    let Some(first) = table_fields.first() else {
        return Err(CompilerError::new(
            ErrorKind::Table,
            "No fields found in table source",
            None,
        ));
    };
    let signature = first.value.clone();
    let Some(kind) = schema::table_kind(&signature) else {
        return Err(CompilerError::new(
            ErrorKind::Table,
            "Unknown table signature",
            Some(&signature),
        ));
    };
    debug!("compiling {signature} table, {} fields", table_fields.len());

    let labels = detect_all_labels(session, &table_fields)?;
    let mut cursor = FieldCursor::new(&table_fields);
    let mut root = compile_schema(session, &mut cursor, &labels, schema::TABLE_HEADER)?;
    match kind {
        TableKind::Bert => {
            root.push_child(compile_schema(session, &mut cursor, &labels, schema::BERT_BODY)?);
        }
        TableKind::Madt => compile_madt(session, &mut cursor, &labels, &mut root)?,
        TableKind::Dmar => compile_dmar(session, &mut cursor, &labels, &mut root)?,
        TableKind::Generic => compile_generic(session, &mut cursor, &labels, &mut root)?,
    }
    root.finalize_lengths()?;
    root.apply_checksums();
    Ok(root.flatten())
}
