//! The 32-bit opcode values used in the wire format. Kept separate from
//! [`crate::vm::instruction::Instruction`] (the decoded, dispatch-time
//! form) since the wire encoding is what must stay byte-exact across
//! writer/reader round trips.

#![allow(dead_code)]

// Level bookkeeping (0x00xx)
pub const INC_BLOCK_LEVEL: u32 = 0x0001;
pub const DEC_BLOCK_LEVEL: u32 = 0x0002;
pub const INC_READ_LEVEL: u32 = 0x0003;
pub const DEC_READ_LEVEL: u32 = 0x0004;

// Blocks, functions, labels (0x01xx)
pub const CREATE_BLOCK: u32 = 0x0100;
pub const CREATE_FUNCTION: u32 = 0x0101;
pub const GO_TO_BLOCK: u32 = 0x0102;
pub const GO_TO_IF_TRUE: u32 = 0x0103;
pub const GO_TO_IF_FALSE: u32 = 0x0104;

// Variables (0x02xx)
pub const CREATE_VAR: u32 = 0x0200;
pub const LOAD_VARIABLE: u32 = 0x0201;
pub const CLEAR_VAR: u32 = 0x0202;
pub const DELETE_VAR: u32 = 0x0203;
pub const STACK_POP_OBJECT: u32 = 0x0204;

// Literals (0x03xx)
pub const LOAD_INTEGER: u32 = 0x0300;
pub const LOAD_FLOAT: u32 = 0x0301;
pub const LOAD_STRING: u32 = 0x0302;
pub const LOAD_NULL: u32 = 0x0303;

// Evaluator / auxiliary-stack plumbing (0x04xx)
pub const OP_PUSH: u32 = 0x0400;
pub const OP_CLEAR: u32 = 0x0401;

// Binary / unary operators (0x05xx)
pub const OP_ADD: u32 = 0x0500;
pub const OP_SUB: u32 = 0x0501;
pub const OP_MUL: u32 = 0x0502;
pub const OP_DIV: u32 = 0x0503;
pub const OP_MOD: u32 = 0x0504;
pub const OP_POW: u32 = 0x0505;
pub const OP_BITXOR: u32 = 0x0506;
pub const OP_BITAND: u32 = 0x0507;
pub const OP_BITOR: u32 = 0x0508;
pub const OP_AND: u32 = 0x0509;
pub const OP_OR: u32 = 0x050A;
pub const OP_EQL: u32 = 0x050B;
pub const OP_NEQL: u32 = 0x050C;
pub const OP_LT: u32 = 0x050D;
pub const OP_GT: u32 = 0x050E;
pub const OP_LTE: u32 = 0x050F;
pub const OP_GTE: u32 = 0x0510;
pub const OP_ASSIGN: u32 = 0x0511;
pub const OP_ADD_ASSIGN: u32 = 0x0512;
pub const OP_SUB_ASSIGN: u32 = 0x0513;
pub const OP_MUL_ASSIGN: u32 = 0x0514;
pub const OP_DIV_ASSIGN: u32 = 0x0515;
pub const OP_MOD_ASSIGN: u32 = 0x0516;
pub const OP_POW_ASSIGN: u32 = 0x0517;
pub const OP_BITXOR_ASSIGN: u32 = 0x0518;
pub const OP_BITAND_ASSIGN: u32 = 0x0519;
pub const OP_BITOR_ASSIGN: u32 = 0x051A;
pub const OP_UNARY_NEG: u32 = 0x051B;
pub const OP_UNARY_NOT: u32 = 0x051C;
pub const OP_UNARY_POS: u32 = 0x051D;

// Control flow (0x06xx)
pub const IF_STATEMENT: u32 = 0x0600;
pub const ELSE_STATEMENT: u32 = 0x0601;
pub const CALL_FUNCTION: u32 = 0x0602;
pub const CALL_NATIVE_FUNCTION: u32 = 0x0603;
pub const INVOKE_METHOD: u32 = 0x0604;
pub const LEAVE_FUNCTION: u32 = 0x0605;
pub const LEAVE_BLOCK: u32 = 0x0606;
pub const LOOP_BREAK: u32 = 0x0607;
pub const LOOP_CONTINUE: u32 = 0x0608;

// Classes (0x07xx)
pub const CREATE_CLASS_INSTANCE: u32 = 0x0700;
pub const ADD_MEMBER: u32 = 0x0701;
pub const END_CLASS_INSTANCE: u32 = 0x0702;
pub const CREATE_NATIVE_CLASS_INSTANCE: u32 = 0x0703;
pub const LOAD_MEMBER: u32 = 0x0704;
pub const BIND_METHOD: u32 = 0x0705;
