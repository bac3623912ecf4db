//! The decoded, in-memory instruction set.
//!
//! This is the VM's dispatch currency: [`crate::vm::bytecode::BytecodeWriter`]
//! serializes it to the wire format, [`crate::vm::bytecode::ByteReader`]
//! deserializes it back. Unlike a fixed-width bytecode, records here are
//! variable length (strings, `i64`, `f64` operands), so there is no
//! `#[repr]` layout guarantee — the wire encoding is what actually needs to
//! be exact, and that lives in `bytecode.rs`.
//!
//! Six opcodes have no counterpart in the lowering table of the original
//! design and are this implementation's own addition, needed to make class
//! instantiation and member access coherent end to end:
//! [`Instruction::CreateClassInstance`], [`Instruction::AddMember`],
//! [`Instruction::EndClassInstance`], [`Instruction::CreateNativeClassInstance`],
//! [`Instruction::LoadMember`] and [`Instruction::BindMethod`]. See
//! `DESIGN.md`.

use std::fmt;

/// Which auxiliary VM-wide stack an `OpPush`/`StackPopObject` targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StackId {
    FunctionParam = 0,
    FunctionCallback = 1,
    Reserved0 = 2,
    Reserved1 = 3,
}

impl StackId {
    pub fn from_u32(v: u32) -> Option<Self> {
        match v {
            0 => Some(Self::FunctionParam),
            1 => Some(Self::FunctionCallback),
            2 => Some(Self::Reserved0),
            3 => Some(Self::Reserved1),
            _ => None,
        }
    }
}

/// The block kind a `CreateBlock`/`IncreaseBlockLevel` pair introduces.
/// Mirrors `scope_stack::BlockType`; kept as a separate, wire-serializable
/// copy since the compile-time and run-time representations don't need to
/// evolve in lockstep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum BlockKind {
    Undefined = 0,
    IfStatement = 1,
    ElseStatement = 2,
    Label = 3,
    Function = 4,
}

impl BlockKind {
    pub fn from_i32(v: i32) -> Option<Self> {
        match v {
            0 => Some(Self::Undefined),
            1 => Some(Self::IfStatement),
            2 => Some(Self::ElseStatement),
            3 => Some(Self::Label),
            4 => Some(Self::Function),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    // ------------------------------------------------------------------
    // Level bookkeeping
    // ------------------------------------------------------------------
    IncreaseBlockLevel,
    DecreaseBlockLevel,
    IncreaseReadLevel,
    DecreaseReadLevel,

    // ------------------------------------------------------------------
    // Blocks, functions, labels
    // ------------------------------------------------------------------
    CreateBlock {
        id: i32,
        block_type: BlockKind,
        parent_id: i32,
        body_pos: u64,
    },
    CreateFunction {
        name: String,
        body_pos: u64,
    },
    GoToBlock {
        id: i32,
    },
    GoToIfTrue {
        id: i32,
    },
    GoToIfFalse {
        id: i32,
    },

    // ------------------------------------------------------------------
    // Variables
    // ------------------------------------------------------------------
    CreateVar {
        name: String,
    },
    LoadVariable {
        name: String,
    },
    ClearVar {
        name: String,
    },
    DeleteVar {
        name: String,
    },
    StackPopObject {
        stack_id: StackId,
        name: String,
    },

    // ------------------------------------------------------------------
    // Literals
    // ------------------------------------------------------------------
    LoadInteger(i64),
    LoadFloat(f64),
    LoadString(String),
    LoadNull,

    // ------------------------------------------------------------------
    // Auxiliary-stack / evaluator plumbing
    // ------------------------------------------------------------------
    OpPush {
        stack_id: StackId,
    },
    OpClear,

    // ------------------------------------------------------------------
    // Binary / unary operators. Each gets its own opcode, per the wire
    // format's `OP_*: (no operands)` note.
    // ------------------------------------------------------------------
    OpAdd,
    OpSub,
    OpMul,
    OpDiv,
    OpMod,
    OpPow,
    OpBitXor,
    OpBitAnd,
    OpBitOr,
    OpAnd,
    OpOr,
    OpEql,
    OpNeql,
    OpLt,
    OpGt,
    OpLte,
    OpGte,
    OpAssign,
    OpAddAssign,
    OpSubAssign,
    OpMulAssign,
    OpDivAssign,
    OpModAssign,
    OpPowAssign,
    OpBitXorAssign,
    OpBitAndAssign,
    OpBitOrAssign,
    OpUnaryNeg,
    OpUnaryNot,
    OpUnaryPos,

    // ------------------------------------------------------------------
    // Control flow
    // ------------------------------------------------------------------
    IfStatement,
    ElseStatement,
    CallFunction {
        name: String,
    },
    CallNativeFunction {
        block_id: i32,
        arity: i32,
        name: String,
    },
    InvokeMethod {
        name: String,
    },
    LeaveFunction,
    LeaveBlock,
    LoopBreak(i32),
    LoopContinue(i32),

    // ------------------------------------------------------------------
    // Classes
    // ------------------------------------------------------------------
    /// Begins constructing a script-defined class instance: pushes a fresh
    /// `ScriptObject` onto the VM's object-construction stack.
    /// `instance_name` is the mangled variable the finished object will
    /// eventually be assigned to by the surrounding `OpAssign`; it is
    /// carried here only so diagnostics can name the instance, not used to
    /// bind anything directly. Not in the original instruction table; added
    /// to give `New` a concrete runtime anchor (see module docs).
    CreateClassInstance {
        class_tag_name: String,
        instance_name: String,
    },
    AddMember {
        name: String,
    },
    /// Pops the object-construction stack. This implementation's own
    /// addition, paired with `CreateClassInstance` (see module docs).
    EndClassInstance,
    CreateNativeClassInstance {
        class_name: String,
    },
    /// Pops an object off the evaluator and pushes the value bound under
    /// `name` in its member table. Not in the original instruction table;
    /// added because plain field reads (`p.x`) have no other way to reach
    /// a `ScriptObject`'s members (see module docs).
    LoadMember {
        name: String,
    },
    /// Binds a compiled method into the object on top of the
    /// object-construction stack. Emitted once per method, right after
    /// `CreateClassInstance`, so `InvokeMethod` can resolve through
    /// `ScriptObject::get_method` instead of re-deriving a mangled name
    /// from scratch at the call site. This implementation's own addition
    /// (see module docs).
    BindMethod {
        name: String,
        function_name: String,
    },
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GoToBlock { id } => write!(f, "GoToBlock -> L{id}"),
            Self::GoToIfTrue { id } => write!(f, "GoToIfTrue -> L{id}"),
            Self::GoToIfFalse { id } => write!(f, "GoToIfFalse -> L{id}"),
            Self::CreateBlock { id, body_pos, .. } => {
                write!(f, "CreateBlock L{id} @ {body_pos:#x}")
            }
            Self::CreateFunction { name, body_pos } => {
                write!(f, "CreateFunction {name} @ {body_pos:#x}")
            }
            other => write!(f, "{other:?}"),
        }
    }
}
