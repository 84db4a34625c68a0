// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Shared compiler infrastructure: session state, diagnostics, and the
//! source-opcode registry.

pub mod cli;
pub mod diagnostics;
pub mod opcodes;
pub mod session;
