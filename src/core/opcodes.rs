// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Source-opcode registry.
//!
//! Maps every source opcode to its AML encoding, compile-time flags, the
//! object type it produces, and the capability classes its runtime operands
//! must satisfy. The registry is a single exhaustive `match`, so adding an
//! opcode without describing it fails to compile.

use bitflags::bitflags;

/// Source-language opcode, as delivered by the external parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AslOp {
    // Structure and named declarations
    DefinitionBlock,
    Scope,
    Device,
    Method,
    Name,
    Alias,
    External,
    Mutex,
    Event,
    OperationRegion,
    Field,
    BankField,
    IndexField,
    FieldUnit,
    Offset,
    AccessAs,
    Processor,
    PowerResource,
    ThermalZone,
    CreateBitField,
    CreateByteField,
    CreateWordField,
    CreateDWordField,
    CreateQWordField,
    CreateField,
    /// Named offset inside a compiled resource template. Carries the
    /// field's bit offset as its first child.
    ResourceTag,

    // Data objects
    Integer,
    String,
    Buffer,
    Package,
    VarPackage,
    Zero,
    One,
    Ones,
    Revision,
    Debug,

    // References
    NamePath,
    MethodCall,
    LocalRef(u8),
    ArgRef(u8),

    // Executable
    Store,
    Add,
    Subtract,
    Multiply,
    Divide,
    Mod,
    Increment,
    Decrement,
    And,
    Or,
    Xor,
    Nand,
    Nor,
    Not,
    ShiftLeft,
    ShiftRight,
    FindSetLeftBit,
    FindSetRightBit,
    Concatenate,
    ConcatenateResTemplate,
    Mid,
    Index,
    DerefOf,
    RefOf,
    CondRefOf,
    SizeOf,
    ObjectType,
    CopyObject,
    ToBuffer,
    ToInteger,
    ToString,
    ToDecimalString,
    ToHexString,
    FromBcd,
    ToBcd,
    LAnd,
    LOr,
    LNot,
    LEqual,
    LNotEqual,
    LGreater,
    LGreaterEqual,
    LLess,
    LLessEqual,
    If,
    Else,
    While,
    Break,
    Continue,
    Return,
    Noop,
    Breakpoint,
    Sleep,
    Stall,
    Notify,
    Fatal,
    Acquire,
    Release,
    Signal,
    Wait,
    Reset,
    Timer,

    // Compile-time macros
    Eisaid,
    ToUuid,
    Unicode,
}

bitflags! {
    /// Compile-time opcode flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OpFlags: u16 {
        /// Declares a name in the current scope.
        const NAMED = 1 << 0;
        /// Creates a named field (buffer fields, field units, resource tags).
        const CREATES_FIELD = 1 << 1;
        /// Opens a new namespace scope around its children.
        const SCOPE_OPEN = 1 << 2;
        /// Runtime-executable operator.
        const EXECUTABLE = 1 << 3;
        /// Control flow never continues past this construct.
        const NO_EXIT = 1 << 4;
        /// Compile-time constant.
        const CONSTANT = 1 << 5;
        /// A reference to a name, not a declaration.
        const NAME_REFERENCE = 1 << 6;
        /// Discarding this operator's result is fine; its side effect alone
        /// is meaningful.
        const RESULT_NOT_USED_OK = 1 << 7;
        /// Encoded with a variable-width package-length prefix.
        const PKG_LENGTH = 1 << 8;
    }
}

bitflags! {
    /// Object-type bitset used by the type lattice: inferred types, method
    /// return types, and per-operand capability classes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TypeBits: u32 {
        const INTEGER = 0x0000_0001;
        const STRING = 0x0000_0002;
        const BUFFER = 0x0000_0004;
        const PACKAGE = 0x0000_0008;
        const FIELD_UNIT = 0x0000_0010;
        const DEVICE = 0x0000_0020;
        const EVENT = 0x0000_0040;
        const METHOD = 0x0000_0080;
        const MUTEX = 0x0000_0100;
        const REGION = 0x0000_0200;
        const POWER = 0x0000_0400;
        const PROCESSOR = 0x0000_0800;
        const THERMAL = 0x0000_1000;
        const BUFFER_FIELD = 0x0000_2000;
        const DDB_HANDLE = 0x0000_4000;
        const DEBUG_OBJECT = 0x0000_8000;
        const REFERENCE = 0x0001_0000;
        const RESOURCE = 0x0002_0000;
        /// A method that returns no value.
        const NO_RETURN = 0x0004_0000;
    }
}

impl TypeBits {
    pub const COMPUTE_DATA: TypeBits = TypeBits::INTEGER
        .union(TypeBits::STRING)
        .union(TypeBits::BUFFER)
        .union(TypeBits::FIELD_UNIT)
        .union(TypeBits::BUFFER_FIELD);
    pub const DATA: TypeBits = TypeBits::COMPUTE_DATA.union(TypeBits::PACKAGE);
    pub const DATA_REFERENCE: TypeBits = TypeBits::DATA.union(TypeBits::REFERENCE);
    pub const DEVICE_OBJECTS: TypeBits = TypeBits::DEVICE
        .union(TypeBits::PROCESSOR)
        .union(TypeBits::THERMAL);
    /// Any object at all; Locals and Args match as wildcards.
    pub const ANY: TypeBits = TypeBits::all();
    /// The target position of an operator.
    pub const TARGET: TypeBits = TypeBits::ANY;

    /// Render a type bitset the way diagnostics name it, e.g.
    /// `"[Integer|String|Buffer]"`.
    pub fn describe(self) -> String {
        const NAMES: &[(TypeBits, &str)] = &[
            (TypeBits::INTEGER, "Integer"),
            (TypeBits::STRING, "String"),
            (TypeBits::BUFFER, "Buffer"),
            (TypeBits::PACKAGE, "Package"),
            (TypeBits::FIELD_UNIT, "FieldUnit"),
            (TypeBits::DEVICE, "Device"),
            (TypeBits::EVENT, "Event"),
            (TypeBits::METHOD, "Method"),
            (TypeBits::MUTEX, "Mutex"),
            (TypeBits::REGION, "OperationRegion"),
            (TypeBits::POWER, "PowerResource"),
            (TypeBits::PROCESSOR, "Processor"),
            (TypeBits::THERMAL, "ThermalZone"),
            (TypeBits::BUFFER_FIELD, "BufferField"),
            (TypeBits::DDB_HANDLE, "DdbHandle"),
            (TypeBits::DEBUG_OBJECT, "DebugObject"),
            (TypeBits::REFERENCE, "Reference"),
            (TypeBits::RESOURCE, "Resource"),
            (TypeBits::NO_RETURN, "NoReturnValue"),
        ];
        if self == TypeBits::ANY {
            return "[Any]".to_string();
        }
        let mut parts = Vec::new();
        for (bit, name) in NAMES {
            if self.contains(*bit) {
                parts.push(*name);
            }
        }
        if parts.is_empty() {
            "[None]".to_string()
        } else {
            format!("[{}]", parts.join("|"))
        }
    }
}

/// Registry entry for one source opcode.
#[derive(Debug, Clone, Copy)]
pub struct OpInfo {
    /// AML encoding bytes for the opcode itself. Empty for constructs with
    /// no opcode of their own (name references, literals with prefix bytes
    /// chosen at encode time, compile-time macros).
    pub aml: &'static [u8],
    pub flags: OpFlags,
    /// Type of the value this construct produces, empty for none.
    pub btype: TypeBits,
    /// Required capability class of each runtime operand, in child order.
    pub runtime_args: &'static [TypeBits],
    /// Bitmask over child positions that are write targets.
    pub target_mask: u8,
}

impl OpInfo {
    const fn plain(aml: &'static [u8], flags: OpFlags, btype: TypeBits) -> Self {
        Self {
            aml,
            flags,
            btype,
            runtime_args: &[],
            target_mask: 0,
        }
    }

    const fn exec(
        aml: &'static [u8],
        btype: TypeBits,
        runtime_args: &'static [TypeBits],
        target_mask: u8,
    ) -> Self {
        Self {
            aml,
            flags: OpFlags::EXECUTABLE,
            btype,
            runtime_args,
            target_mask,
        }
    }
}

use TypeBits as T;

// Shorthand capability classes. `CDAT` ("computational data") accepts any
// operand implicitly convertible to an integer/string/buffer.
const CDAT: TypeBits = T::COMPUTE_DATA;
const TGT: TypeBits = T::TARGET;
const STR_BUF: TypeBits = T::STRING.union(T::BUFFER);
const BUF_RES: TypeBits = T::BUFFER.union(T::RESOURCE);
const STR_BUF_PKG: TypeBits = STR_BUF.union(T::PACKAGE);

// Operand-class rows shared by the registry entries below. Named const
// slices so they get 'static promotion.
const ARGS_CDAT: &[TypeBits] = &[CDAT];
const ARGS_CDAT2: &[TypeBits] = &[CDAT, CDAT];
const ARGS_CDAT_TGT: &[TypeBits] = &[CDAT, TGT];
const ARGS_CDAT2_TGT: &[TypeBits] = &[CDAT, CDAT, TGT];
const ARGS_DIVIDE: &[TypeBits] = &[CDAT, CDAT, TGT, TGT];
const ARGS_STORE: &[TypeBits] = &[T::DATA_REFERENCE, TGT];
const ARGS_TGT: &[TypeBits] = &[TGT];
const ARGS_CONCAT_RES: &[TypeBits] = &[BUF_RES, BUF_RES, TGT];
const ARGS_MID: &[TypeBits] = &[STR_BUF, T::INTEGER, T::INTEGER, TGT];
const ARGS_INDEX: &[TypeBits] = &[STR_BUF_PKG, T::INTEGER, TGT];
const ARGS_DEREF: &[TypeBits] = &[T::REFERENCE.union(T::STRING)];
const ARGS_ANY: &[TypeBits] = &[T::ANY];
const ARGS_ANY_TGT: &[TypeBits] = &[T::ANY, TGT];
const ARGS_SIZEOF: &[TypeBits] = &[STR_BUF_PKG.union(T::REFERENCE)];
const ARGS_TO_STRING: &[TypeBits] = &[T::BUFFER, T::INTEGER, TGT];
const ARGS_INT: &[TypeBits] = &[T::INTEGER];
const ARGS_INT_TGT: &[TypeBits] = &[T::INTEGER, TGT];
const ARGS_FATAL: &[TypeBits] = &[T::INTEGER, T::INTEGER, T::INTEGER];
const ARGS_NOTIFY: &[TypeBits] = &[T::DEVICE_OBJECTS, T::INTEGER];
const ARGS_MUTEX: &[TypeBits] = &[T::MUTEX];
const ARGS_ACQUIRE: &[TypeBits] = &[T::MUTEX, T::INTEGER];
const ARGS_EVENT: &[TypeBits] = &[T::EVENT];
const ARGS_WAIT: &[TypeBits] = &[T::EVENT, T::INTEGER];

/// Look up the registry entry for a source opcode.
pub fn op_info(op: AslOp) -> OpInfo {
    const NAMED_SCOPE: OpFlags = OpFlags::NAMED
        .union(OpFlags::SCOPE_OPEN)
        .union(OpFlags::PKG_LENGTH);
    const EXEC_PKG: OpFlags = OpFlags::EXECUTABLE.union(OpFlags::PKG_LENGTH);
    const EXEC_SIDE_EFFECT: OpFlags = OpFlags::EXECUTABLE.union(OpFlags::RESULT_NOT_USED_OK);
    const EXEC_NO_EXIT: OpFlags = OpFlags::EXECUTABLE.union(OpFlags::NO_EXIT);

    match op {
        // Structure and named declarations
        AslOp::DefinitionBlock => OpInfo::plain(&[], OpFlags::SCOPE_OPEN, T::empty()),
        AslOp::Scope => OpInfo::plain(
            &[0x10],
            OpFlags::SCOPE_OPEN.union(OpFlags::PKG_LENGTH),
            T::empty(),
        ),
        AslOp::Device => OpInfo::plain(&[0x5B, 0x82], NAMED_SCOPE, T::DEVICE),
        AslOp::Method => OpInfo::plain(&[0x14], NAMED_SCOPE, T::METHOD),
        AslOp::Name => OpInfo::plain(&[0x08], OpFlags::NAMED, T::empty()),
        AslOp::Alias => OpInfo::plain(&[0x06], OpFlags::NAMED, T::empty()),
        AslOp::External => OpInfo::plain(&[0x15], OpFlags::NAMED, T::empty()),
        AslOp::Mutex => OpInfo::plain(&[0x5B, 0x01], OpFlags::NAMED, T::MUTEX),
        AslOp::Event => OpInfo::plain(&[0x5B, 0x02], OpFlags::NAMED, T::EVENT),
        AslOp::OperationRegion => OpInfo::plain(&[0x5B, 0x80], OpFlags::NAMED, T::REGION),
        AslOp::Field => OpInfo::plain(&[0x5B, 0x81], OpFlags::PKG_LENGTH, T::empty()),
        AslOp::BankField => OpInfo::plain(&[0x5B, 0x87], OpFlags::PKG_LENGTH, T::empty()),
        AslOp::IndexField => OpInfo::plain(&[0x5B, 0x86], OpFlags::PKG_LENGTH, T::empty()),
        AslOp::FieldUnit => OpInfo::plain(&[], OpFlags::CREATES_FIELD, T::FIELD_UNIT),
        AslOp::Offset => OpInfo::plain(&[], OpFlags::empty(), T::empty()),
        AslOp::AccessAs => OpInfo::plain(&[], OpFlags::empty(), T::empty()),
        AslOp::Processor => OpInfo::plain(&[0x5B, 0x83], NAMED_SCOPE, T::PROCESSOR),
        AslOp::PowerResource => OpInfo::plain(&[0x5B, 0x84], NAMED_SCOPE, T::POWER),
        AslOp::ThermalZone => OpInfo::plain(&[0x5B, 0x85], NAMED_SCOPE, T::THERMAL),
        AslOp::CreateBitField => OpInfo::plain(&[0x8D], OpFlags::CREATES_FIELD, T::BUFFER_FIELD),
        AslOp::CreateByteField => OpInfo::plain(&[0x8C], OpFlags::CREATES_FIELD, T::BUFFER_FIELD),
        AslOp::CreateWordField => OpInfo::plain(&[0x8B], OpFlags::CREATES_FIELD, T::BUFFER_FIELD),
        AslOp::CreateDWordField => OpInfo::plain(&[0x8A], OpFlags::CREATES_FIELD, T::BUFFER_FIELD),
        AslOp::CreateQWordField => OpInfo::plain(&[0x8F], OpFlags::CREATES_FIELD, T::BUFFER_FIELD),
        AslOp::CreateField => OpInfo::plain(&[0x5B, 0x13], OpFlags::CREATES_FIELD, T::BUFFER_FIELD),
        AslOp::ResourceTag => OpInfo::plain(&[], OpFlags::CREATES_FIELD, T::RESOURCE),

        // Data objects
        AslOp::Integer => OpInfo::plain(&[], OpFlags::CONSTANT, T::INTEGER),
        AslOp::String => OpInfo::plain(&[0x0D], OpFlags::CONSTANT, T::STRING),
        AslOp::Buffer => OpInfo::plain(&[0x11], OpFlags::PKG_LENGTH, T::BUFFER),
        AslOp::Package => OpInfo::plain(&[0x12], OpFlags::PKG_LENGTH, T::PACKAGE),
        AslOp::VarPackage => OpInfo::plain(&[0x13], OpFlags::PKG_LENGTH, T::PACKAGE),
        AslOp::Zero => OpInfo::plain(&[0x00], OpFlags::CONSTANT, T::INTEGER),
        AslOp::One => OpInfo::plain(&[0x01], OpFlags::CONSTANT, T::INTEGER),
        AslOp::Ones => OpInfo::plain(&[0xFF], OpFlags::CONSTANT, T::INTEGER),
        AslOp::Revision => OpInfo::plain(&[0x5B, 0x30], OpFlags::CONSTANT, T::INTEGER),
        AslOp::Debug => OpInfo::plain(&[0x5B, 0x31], OpFlags::empty(), T::DEBUG_OBJECT),

        // References
        AslOp::NamePath => OpInfo::plain(&[], OpFlags::NAME_REFERENCE, T::ANY),
        AslOp::MethodCall => OpInfo::plain(
            &[],
            OpFlags::NAME_REFERENCE.union(OpFlags::EXECUTABLE),
            T::ANY,
        ),
        AslOp::LocalRef(n) => OpInfo::plain(local_opcode(n), OpFlags::empty(), T::ANY),
        AslOp::ArgRef(n) => OpInfo::plain(arg_opcode(n), OpFlags::empty(), T::ANY),

        // Executable operators
        AslOp::Store => OpInfo {
            aml: &[0x70],
            flags: EXEC_SIDE_EFFECT,
            btype: T::DATA_REFERENCE,
            runtime_args: ARGS_STORE,
            target_mask: 0b10,
        },
        AslOp::Add => OpInfo::exec(&[0x72], T::INTEGER, ARGS_CDAT2_TGT, 0b100),
        AslOp::Subtract => OpInfo::exec(&[0x74], T::INTEGER, ARGS_CDAT2_TGT, 0b100),
        AslOp::Multiply => OpInfo::exec(&[0x77], T::INTEGER, ARGS_CDAT2_TGT, 0b100),
        AslOp::Divide => OpInfo::exec(&[0x78], T::INTEGER, ARGS_DIVIDE, 0b1100),
        AslOp::Mod => OpInfo::exec(&[0x85], T::INTEGER, ARGS_CDAT2_TGT, 0b100),
        AslOp::Increment => OpInfo {
            aml: &[0x75],
            flags: EXEC_SIDE_EFFECT,
            btype: T::INTEGER,
            runtime_args: ARGS_TGT,
            target_mask: 0b1,
        },
        AslOp::Decrement => OpInfo {
            aml: &[0x76],
            flags: EXEC_SIDE_EFFECT,
            btype: T::INTEGER,
            runtime_args: ARGS_TGT,
            target_mask: 0b1,
        },
        AslOp::And => OpInfo::exec(&[0x7B], T::INTEGER, ARGS_CDAT2_TGT, 0b100),
        AslOp::Or => OpInfo::exec(&[0x7D], T::INTEGER, ARGS_CDAT2_TGT, 0b100),
        AslOp::Xor => OpInfo::exec(&[0x7F], T::INTEGER, ARGS_CDAT2_TGT, 0b100),
        AslOp::Nand => OpInfo::exec(&[0x7C], T::INTEGER, ARGS_CDAT2_TGT, 0b100),
        AslOp::Nor => OpInfo::exec(&[0x7E], T::INTEGER, ARGS_CDAT2_TGT, 0b100),
        AslOp::Not => OpInfo::exec(&[0x80], T::INTEGER, ARGS_CDAT_TGT, 0b10),
        AslOp::ShiftLeft => OpInfo::exec(&[0x79], T::INTEGER, ARGS_CDAT2_TGT, 0b100),
        AslOp::ShiftRight => OpInfo::exec(&[0x7A], T::INTEGER, ARGS_CDAT2_TGT, 0b100),
        AslOp::FindSetLeftBit => OpInfo::exec(&[0x81], T::INTEGER, ARGS_CDAT_TGT, 0b10),
        AslOp::FindSetRightBit => OpInfo::exec(&[0x82], T::INTEGER, ARGS_CDAT_TGT, 0b10),
        AslOp::Concatenate => OpInfo::exec(&[0x73], T::COMPUTE_DATA, ARGS_CDAT2_TGT, 0b100),
        AslOp::ConcatenateResTemplate => OpInfo::exec(&[0x84], T::BUFFER, ARGS_CONCAT_RES, 0b100),
        AslOp::Mid => OpInfo::exec(&[0x9E], STR_BUF, ARGS_MID, 0b1000),
        AslOp::Index => OpInfo::exec(&[0x88], T::REFERENCE, ARGS_INDEX, 0b100),
        AslOp::DerefOf => OpInfo::exec(&[0x83], T::DATA, ARGS_DEREF, 0),
        AslOp::RefOf => OpInfo::exec(&[0x71], T::REFERENCE, ARGS_ANY, 0),
        AslOp::CondRefOf => OpInfo::exec(&[0x5B, 0x12], T::INTEGER, ARGS_ANY_TGT, 0b10),
        AslOp::SizeOf => OpInfo::exec(&[0x87], T::INTEGER, ARGS_SIZEOF, 0),
        AslOp::ObjectType => OpInfo::exec(&[0x8E], T::INTEGER, ARGS_ANY, 0),
        AslOp::CopyObject => OpInfo {
            aml: &[0x9D],
            flags: EXEC_SIDE_EFFECT,
            btype: T::DATA_REFERENCE,
            runtime_args: ARGS_ANY_TGT,
            target_mask: 0b10,
        },
        AslOp::ToBuffer => OpInfo::exec(&[0x96], T::BUFFER, ARGS_CDAT_TGT, 0b10),
        AslOp::ToInteger => OpInfo::exec(&[0x99], T::INTEGER, ARGS_CDAT_TGT, 0b10),
        AslOp::ToString => OpInfo::exec(&[0x9C], T::STRING, ARGS_TO_STRING, 0b100),
        AslOp::ToDecimalString => OpInfo::exec(&[0x97], T::STRING, ARGS_CDAT_TGT, 0b10),
        AslOp::ToHexString => OpInfo::exec(&[0x98], T::STRING, ARGS_CDAT_TGT, 0b10),
        AslOp::FromBcd => OpInfo::exec(&[0x5B, 0x28], T::INTEGER, ARGS_INT_TGT, 0b10),
        AslOp::ToBcd => OpInfo::exec(&[0x5B, 0x29], T::INTEGER, ARGS_INT_TGT, 0b10),
        AslOp::LAnd => OpInfo::exec(&[0x90], T::INTEGER, ARGS_CDAT2, 0),
        AslOp::LOr => OpInfo::exec(&[0x91], T::INTEGER, ARGS_CDAT2, 0),
        AslOp::LNot => OpInfo::exec(&[0x92], T::INTEGER, ARGS_CDAT, 0),
        AslOp::LEqual => OpInfo::exec(&[0x93], T::INTEGER, ARGS_CDAT2, 0),
        AslOp::LNotEqual => OpInfo::exec(&[0x92, 0x93], T::INTEGER, ARGS_CDAT2, 0),
        AslOp::LGreater => OpInfo::exec(&[0x94], T::INTEGER, ARGS_CDAT2, 0),
        AslOp::LGreaterEqual => OpInfo::exec(&[0x92, 0x95], T::INTEGER, ARGS_CDAT2, 0),
        AslOp::LLess => OpInfo::exec(&[0x95], T::INTEGER, ARGS_CDAT2, 0),
        AslOp::LLessEqual => OpInfo::exec(&[0x92, 0x94], T::INTEGER, ARGS_CDAT2, 0),

        // Control flow
        AslOp::If => OpInfo {
            aml: &[0xA0],
            flags: EXEC_PKG,
            btype: T::empty(),
            runtime_args: ARGS_INT,
            target_mask: 0,
        },
        AslOp::Else => OpInfo::plain(&[0xA1], EXEC_PKG, T::empty()),
        AslOp::While => OpInfo {
            aml: &[0xA2],
            flags: EXEC_PKG,
            btype: T::empty(),
            runtime_args: ARGS_INT,
            target_mask: 0,
        },
        AslOp::Break => OpInfo::plain(&[0xA5], EXEC_NO_EXIT, T::empty()),
        AslOp::Continue => OpInfo::plain(&[0x9F], EXEC_NO_EXIT, T::empty()),
        AslOp::Return => OpInfo::plain(&[0xA4], EXEC_NO_EXIT, T::empty()),
        AslOp::Noop => OpInfo::plain(&[0xA3], OpFlags::EXECUTABLE, T::empty()),
        AslOp::Breakpoint => OpInfo::plain(&[0xCC], OpFlags::EXECUTABLE, T::empty()),
        AslOp::Sleep => OpInfo::exec(&[0x5B, 0x22], T::empty(), ARGS_INT, 0),
        AslOp::Stall => OpInfo::exec(&[0x5B, 0x21], T::empty(), ARGS_INT, 0),
        AslOp::Notify => OpInfo::exec(&[0x86], T::empty(), ARGS_NOTIFY, 0),
        AslOp::Fatal => OpInfo {
            aml: &[0x5B, 0x32],
            flags: EXEC_NO_EXIT,
            btype: T::empty(),
            runtime_args: ARGS_FATAL,
            target_mask: 0,
        },
        AslOp::Acquire => OpInfo {
            aml: &[0x5B, 0x23],
            flags: EXEC_SIDE_EFFECT,
            btype: T::INTEGER,
            runtime_args: ARGS_ACQUIRE,
            target_mask: 0,
        },
        AslOp::Release => OpInfo::exec(&[0x5B, 0x27], T::empty(), ARGS_MUTEX, 0),
        AslOp::Signal => OpInfo::exec(&[0x5B, 0x24], T::empty(), ARGS_EVENT, 0),
        AslOp::Wait => OpInfo {
            aml: &[0x5B, 0x25],
            flags: EXEC_SIDE_EFFECT,
            btype: T::INTEGER,
            runtime_args: ARGS_WAIT,
            target_mask: 0,
        },
        AslOp::Reset => OpInfo::exec(&[0x5B, 0x26], T::empty(), ARGS_EVENT, 0),
        AslOp::Timer => OpInfo::plain(&[0x5B, 0x33], OpFlags::EXECUTABLE, T::INTEGER),

        // Compile-time macros, replaced by literals during code generation
        AslOp::Eisaid => OpInfo::plain(&[], OpFlags::CONSTANT, T::INTEGER),
        AslOp::ToUuid => OpInfo::plain(&[], OpFlags::CONSTANT, T::BUFFER),
        AslOp::Unicode => OpInfo::plain(&[], OpFlags::CONSTANT, T::BUFFER),
    }
}

static LOCAL_OPCODES: [[u8; 1]; 8] = [[0x60], [0x61], [0x62], [0x63], [0x64], [0x65], [0x66], [0x67]];
static ARG_OPCODES: [[u8; 1]; 7] = [[0x68], [0x69], [0x6A], [0x6B], [0x6C], [0x6D], [0x6E]];

// Out-of-range register numbers are a parser contract break; they map to an
// empty encoding here and are rejected before emission.
fn local_opcode(n: u8) -> &'static [u8] {
    LOCAL_OPCODES.get(n as usize).map_or(&[], |a| &a[..])
}

fn arg_opcode(n: u8) -> &'static [u8] {
    ARG_OPCODES.get(n as usize).map_or(&[], |a| &a[..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_scope_openers_carry_both_flags() {
        for op in [
            AslOp::Device,
            AslOp::Method,
            AslOp::Processor,
            AslOp::PowerResource,
            AslOp::ThermalZone,
        ] {
            let info = op_info(op);
            assert!(info.flags.contains(OpFlags::NAMED), "{op:?}");
            assert!(info.flags.contains(OpFlags::SCOPE_OPEN), "{op:?}");
        }
    }

    #[test]
    fn scope_opens_but_does_not_declare() {
        let info = op_info(AslOp::Scope);
        assert!(info.flags.contains(OpFlags::SCOPE_OPEN));
        assert!(!info.flags.contains(OpFlags::NAMED));
    }

    #[test]
    fn divide_has_two_targets() {
        let info = op_info(AslOp::Divide);
        assert_eq!(info.target_mask, 0b1100);
        assert_eq!(info.runtime_args.len(), 4);
    }

    #[test]
    fn lnotequal_encodes_as_lnot_lequal() {
        assert_eq!(op_info(AslOp::LNotEqual).aml, &[0x92, 0x93]);
    }

    #[test]
    fn locals_and_args_have_distinct_encodings() {
        for n in 0..8u8 {
            assert_eq!(op_info(AslOp::LocalRef(n)).aml, &[0x60 + n]);
        }
        for n in 0..7u8 {
            assert_eq!(op_info(AslOp::ArgRef(n)).aml, &[0x68 + n]);
        }
    }

    #[test]
    fn describe_type_bits() {
        assert_eq!(TypeBits::INTEGER.describe(), "[Integer]");
        assert_eq!(
            (TypeBits::INTEGER | TypeBits::STRING).describe(),
            "[Integer|String]"
        );
        assert_eq!(TypeBits::empty().describe(), "[None]");
        assert_eq!(TypeBits::ANY.describe(), "[Any]");
    }
}
