// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Integer expressions in data-table field values.
//!
//! A value is whitespace-split into alternating operand and operator
//! tokens, evaluated strictly left to right with no precedence. Operands
//! are hex literals (with or without a `0x` prefix) or `$label` references
//! resolved against the offsets recorded by the label pre-scan.

use std::collections::HashMap;

use crate::core::diagnostics::{CompilerError, ErrorKind};
use crate::dtc::scan::TableField;

/// Label name to table byte offset, filled by [`crate::dtc::detect_all_labels`].
pub type LabelMap = HashMap<String, u64>;

fn operand(labels: &LabelMap, token: &str) -> Result<u64, CompilerError> {
    if let Some(label) = token.strip_prefix('$') {
        return labels.get(label).copied().ok_or_else(|| {
            CompilerError::new(ErrorKind::Expression, "Unknown label", Some(label))
        });
    }
    let digits = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token);
    u64::from_str_radix(digits, 16).map_err(|_| {
        CompilerError::new(ErrorKind::Expression, "Invalid integer operand", Some(token))
    })
}

fn apply(acc: u64, op: &str, rhs: u64) -> Result<u64, CompilerError> {
    let v = match op {
        "+" => acc.wrapping_add(rhs),
        "-" => acc.wrapping_sub(rhs),
        "*" => acc.wrapping_mul(rhs),
        "/" | "%" if rhs == 0 => {
            return Err(CompilerError::new(
                ErrorKind::Expression,
                "Division by zero in expression",
                None,
            ))
        }
        "/" => acc / rhs,
        "%" => acc % rhs,
        "|" => acc | rhs,
        "&" => acc & rhs,
        "^" => acc ^ rhs,
        _ => {
            return Err(CompilerError::new(
                ErrorKind::Expression,
                "Expression operator is not supported",
                Some(op),
            ))
        }
    };
    Ok(v)
}

/// Evaluate a field value to an integer. Errors are returned, not reported:
/// the field compiler decides whether they are recoverable.
pub fn resolve_integer(labels: &LabelMap, field: &TableField) -> Result<u64, CompilerError> {
    let mut tokens = field.value.split_whitespace();
    let first = tokens.next().ok_or_else(|| {
        CompilerError::new(ErrorKind::Expression, "Field value is empty", Some(&field.name))
    })?;
    let mut acc = operand(labels, first)?;
    while let Some(op) = tokens.next() {
        let rhs_token = tokens.next().ok_or_else(|| {
            CompilerError::new(
                ErrorKind::Expression,
                "Expression is missing an operand",
                Some(op),
            )
        })?;
        let rhs = operand(labels, rhs_token)?;
        acc = apply(acc, op, rhs)?;
    }
    Ok(acc)
}
