//! The stack-machine interpreter.
//!
//! Every instruction's operands are always decoded, regardless of whether
//! the instruction is "live"; only whether its *effect* runs is gated.
//! Two instructions are special-cased because they still have to act while
//! skipped, to keep forward references (and functions defined inside a
//! skipped `if` branch) working: `CreateBlock` and `CreateFunction` always
//! register their label/body position. `IncreaseBlockLevel` always bumps
//! `block_level` and pushes a frame; `DecreaseBlockLevel` always pops the
//! frame and decrements `block_level`, but only also decrements
//! `read_level` if `read_level == block_level` held *before* the
//! decrement. Every other instruction is gated by the single rule: act only
//! when `read_level == block_level`.
//!
//! `IfStatement` bumps `read_level` itself when the popped condition is
//! truthy; `ElseStatement` bumps it when the prior `last_if_result` was
//! false. Combined with the following (unconditional) `IncreaseBlockLevel`,
//! this is what makes exactly one of the two branches line up with
//! `block_level` and become live. Return values cross a call boundary on
//! the `FUNCTION_CALLBACK` auxiliary stack, not the evaluator: `Return`
//! pushes there before unwinding, `LeaveFunction` pops from there into the
//! caller's evaluator, and a native call's result takes the same path.

use hashbrown::HashMap;
use std::rc::Rc;
use std::cell::RefCell;

use crate::api::options::RunOptions;
use crate::errors::RuntimeError;
use crate::module::Module;
use crate::native::NativeRegistry;
use crate::values::object::ScriptObject;
use crate::values::Value;

use super::bytecode::ByteReader;
use super::instruction::{BlockKind, Instruction, StackId};

pub struct Vm<'a> {
    reader: ByteReader<'a>,
    natives: &'a NativeRegistry,
    options: RunOptions,
    module: Module,
    block_level: i64,
    read_level: i64,
    function_param: Vec<Value>,
    function_callback: Vec<Value>,
    reserved0: Vec<Value>,
    reserved1: Vec<Value>,
    object_construction: Vec<(String, Rc<RefCell<ScriptObject>>)>,
    block_parents: HashMap<i32, i32>,
}

impl<'a> Vm<'a> {
    pub fn new(bytecode: &'a [u8], natives: &'a NativeRegistry, options: &RunOptions) -> Self {
        Self {
            reader: ByteReader::new(bytecode),
            natives,
            options: options.clone(),
            module: Module::new(),
            block_level: -1,
            read_level: -1,
            function_param: Vec::new(),
            function_callback: Vec::new(),
            reserved0: Vec::new(),
            reserved1: Vec::new(),
            object_construction: Vec::new(),
            block_parents: HashMap::new(),
        }
    }

    fn live(&self) -> bool {
        self.read_level == self.block_level
    }

    /// `LoadInteger`/`LoadFloat`/`LoadString`/`LoadNull` push a fresh const
    /// Value; `var x = 1;`'s copy-assignment into `x`'s slot is what clears
    /// it, so the literal being const never makes `x` itself immutable.
    fn const_literal(value: Value) -> Value {
        value.set_const(true);
        value
    }

    fn evaluator(&mut self) -> &mut crate::evaluator::Evaluator {
        &mut self.module.current_frame_mut().evaluator
    }

    fn aux_stack(&mut self, id: StackId) -> &mut Vec<Value> {
        match id {
            StackId::FunctionParam => &mut self.function_param,
            StackId::FunctionCallback => &mut self.function_callback,
            StackId::Reserved0 => &mut self.reserved0,
            StackId::Reserved1 => &mut self.reserved1,
        }
    }

    fn pop_aux(&mut self, id: StackId) -> Result<Value, RuntimeError> {
        self.aux_stack(id)
            .pop()
            .ok_or_else(|| RuntimeError::MalformedBytecode("auxiliary stack underflow".into()))
    }

    pub fn run(&mut self) -> Result<(), RuntimeError> {
        while !self.reader.at_end() {
            let instr = self.reader.decode_next()?;
            if let Err(error) = self.dispatch(instr) {
                tracing::error!(%error, "VM halted");
                return Err(error);
            }
        }
        Ok(())
    }

    fn dispatch(&mut self, instr: Instruction) -> Result<(), RuntimeError> {
        match instr {
            Instruction::IncreaseBlockLevel => {
                self.block_level += 1;
                self.module.push_frame();
                tracing::trace!(block_level = self.block_level, "enter block");
            }
            Instruction::DecreaseBlockLevel => {
                let was_live = self.live();
                self.module.pop_frame();
                self.block_level -= 1;
                if was_live {
                    self.read_level -= 1;
                }
                tracing::trace!(block_level = self.block_level, "leave block");
            }
            Instruction::IncreaseReadLevel => {
                if self.live() {
                    self.read_level += 1;
                }
            }
            Instruction::DecreaseReadLevel => {
                if self.live() {
                    self.read_level -= 1;
                }
            }

            Instruction::CreateBlock { id, parent_id, body_pos, .. } => {
                self.module.register_label(id, body_pos);
                self.block_parents.insert(id, parent_id);
            }
            Instruction::CreateFunction { name, body_pos } => {
                self.module.register_function(&name, body_pos);
            }
            Instruction::GoToBlock { id } => {
                if self.live() {
                    let pos = self.module.label_pos(id)?;
                    self.reader.seek(pos);
                }
            }
            Instruction::GoToIfTrue { id } => {
                if self.live() && self.module.current_frame().last_if_result {
                    let pos = self.module.label_pos(id)?;
                    self.reader.seek(pos);
                }
            }
            Instruction::GoToIfFalse { id } => {
                if self.live() && !self.module.current_frame().last_if_result {
                    let pos = self.module.label_pos(id)?;
                    self.reader.seek(pos);
                }
            }

            Instruction::CreateVar { name } => {
                if self.live() {
                    self.module.current_frame_mut().create_var(&name);
                }
            }
            Instruction::LoadVariable { name } => {
                if self.live() {
                    let value = self
                        .module
                        .find_var(&name)
                        .cloned()
                        .ok_or_else(|| RuntimeError::UndeclaredIdentifier(name.clone()))?;
                    self.evaluator().push(value);
                }
            }
            Instruction::ClearVar { name } => {
                if self.live() {
                    self.module.current_frame_mut().clear_var(&name)?;
                }
            }
            Instruction::DeleteVar { name } => {
                if self.live() {
                    self.module.current_frame_mut().delete_var(&name);
                }
            }
            Instruction::StackPopObject { stack_id, name } => {
                if self.live() {
                    let value = self.pop_aux(stack_id)?;
                    self.module.current_frame_mut().bind_reference(&name, value);
                }
            }

            Instruction::LoadInteger(v) => {
                if self.live() {
                    self.evaluator().push(Self::const_literal(Value::int(v)));
                }
            }
            Instruction::LoadFloat(v) => {
                if self.live() {
                    self.evaluator().push(Self::const_literal(Value::float(v)));
                }
            }
            Instruction::LoadString(s) => {
                if self.live() {
                    self.evaluator().push(Self::const_literal(Value::str(s)));
                }
            }
            Instruction::LoadNull => {
                if self.live() {
                    self.evaluator().push(Self::const_literal(Value::null()));
                }
            }

            Instruction::OpPush { stack_id } => {
                if self.live() {
                    let value = self.evaluator().pop()?;
                    self.aux_stack(stack_id).push(value);
                }
            }
            Instruction::OpClear => {
                if self.live() {
                    self.evaluator().clear();
                }
            }

            Instruction::OpAdd => self.binary(crate::values::add)?,
            Instruction::OpSub => self.binary(crate::values::sub)?,
            Instruction::OpMul => self.binary(crate::values::mul)?,
            Instruction::OpDiv => self.binary(crate::values::div)?,
            Instruction::OpMod => self.binary(crate::values::modulo)?,
            Instruction::OpPow => self.binary(crate::values::pow)?,
            Instruction::OpBitXor => self.binary(crate::values::bitxor)?,
            Instruction::OpBitAnd => self.binary(crate::values::bitand)?,
            Instruction::OpBitOr => self.binary(crate::values::bitor)?,
            Instruction::OpAnd => self.binary(crate::values::logand)?,
            Instruction::OpOr => self.binary(crate::values::logor)?,
            Instruction::OpEql => self.binary(crate::values::eql)?,
            Instruction::OpNeql => self.binary(crate::values::not_eql)?,
            Instruction::OpLt => self.binary(crate::values::less)?,
            Instruction::OpGt => self.binary(crate::values::greater)?,
            Instruction::OpLte => self.binary(crate::values::less_eql)?,
            Instruction::OpGte => self.binary(crate::values::greater_eql)?,
            Instruction::OpAssign => {
                if self.live() {
                    self.evaluator().assign()?;
                }
            }
            Instruction::OpAddAssign => self.assign_with(crate::values::add)?,
            Instruction::OpSubAssign => self.assign_with(crate::values::sub)?,
            Instruction::OpMulAssign => self.assign_with(crate::values::mul)?,
            Instruction::OpDivAssign => self.assign_with(crate::values::div)?,
            Instruction::OpModAssign => self.assign_with(crate::values::modulo)?,
            Instruction::OpPowAssign => self.assign_with(crate::values::pow)?,
            Instruction::OpBitXorAssign => self.assign_with(crate::values::bitxor)?,
            Instruction::OpBitAndAssign => self.assign_with(crate::values::bitand)?,
            Instruction::OpBitOrAssign => self.assign_with(crate::values::bitor)?,
            Instruction::OpUnaryNeg => self.unary(crate::values::u_minus)?,
            Instruction::OpUnaryNot => self.unary(crate::values::lognot)?,
            Instruction::OpUnaryPos => self.unary(crate::values::u_pos)?,

            Instruction::IfStatement => {
                if self.live() {
                    let cond = self.evaluator().pop()?;
                    let taken = cond.is_truthy();
                    self.module.current_frame_mut().last_if_result = taken;
                    if taken {
                        self.read_level += 1;
                    }
                }
            }
            Instruction::ElseStatement => {
                if self.live() && !self.module.current_frame().last_if_result {
                    self.read_level += 1;
                }
            }
            Instruction::CallFunction { name } => {
                if self.live() {
                    self.call_script_function(&name)?;
                }
            }
            Instruction::CallNativeFunction { arity, name, .. } => {
                if self.live() {
                    self.call_native_function(&name, arity as usize)?;
                }
            }
            Instruction::InvokeMethod { name } => {
                if self.live() {
                    self.invoke_method(&name)?;
                }
            }
            Instruction::LeaveFunction => {
                if self.live() {
                    self.leave_function()?;
                }
            }
            Instruction::LeaveBlock => {
                if self.live() {
                    self.module.pop_frame();
                    self.block_level -= 1;
                    self.read_level -= 1;
                }
            }
            Instruction::LoopBreak(n) => {
                if self.live() {
                    self.module.set_if_result_levels_up(n, false);
                    self.read_level -= n as i64;
                }
            }
            Instruction::LoopContinue(n) => {
                if self.live() {
                    self.module.set_if_result_levels_up(n, true);
                    self.read_level -= n as i64;
                }
            }

            Instruction::CreateClassInstance { class_tag_name, .. } => {
                if self.live() {
                    self.object_construction
                        .push((class_tag_name.clone(), Rc::new(RefCell::new(ScriptObject::new(class_tag_name)))));
                }
            }
            Instruction::AddMember { name } => {
                if self.live() {
                    let value = self.evaluator().pop()?;
                    let (_, obj) = self
                        .object_construction
                        .last()
                        .ok_or_else(|| RuntimeError::MalformedBytecode("AddMember with no instance under construction".into()))?;
                    obj.borrow_mut().add_member(name, value);
                }
            }
            Instruction::EndClassInstance => {
                if self.live() {
                    let (instance_name, obj) = self
                        .object_construction
                        .pop()
                        .ok_or_else(|| RuntimeError::MalformedBytecode("EndClassInstance with no instance under construction".into()))?;
                    self.module.rebind_var(&instance_name, Value::object(obj))?;
                }
            }
            Instruction::CreateNativeClassInstance { class_name } => {
                if self.live() {
                    let args = std::mem::take(&mut self.function_param);
                    let class = self.natives.class(&class_name)?;
                    let value = (class.construct)(&args)?;
                    self.evaluator().push(value);
                }
            }
            Instruction::LoadMember { name } => {
                if self.live() {
                    let receiver = self.evaluator().pop()?;
                    let obj = receiver
                        .as_object()
                        .ok_or(RuntimeError::NullValueUsedException)?;
                    let value = obj
                        .borrow()
                        .get_member(&name)
                        .ok_or_else(|| RuntimeError::UndeclaredMember(name.clone()))?;
                    self.evaluator().push(value);
                }
            }
            Instruction::BindMethod { name, function_name } => {
                if self.live() {
                    let pos = self.module.function_pos(&function_name)?;
                    let (_, obj) = self
                        .object_construction
                        .last()
                        .ok_or_else(|| RuntimeError::MalformedBytecode("BindMethod with no instance under construction".into()))?;
                    obj.borrow_mut().bind_method(name, pos);
                }
            }
        }
        Ok(())
    }

    fn binary(
        &mut self,
        op: impl FnOnce(&Value, &Value) -> Result<Value, RuntimeError>,
    ) -> Result<(), RuntimeError> {
        if self.live() {
            self.evaluator().binary(op)?;
        }
        Ok(())
    }

    fn unary(
        &mut self,
        op: impl FnOnce(&Value) -> Result<Value, RuntimeError>,
    ) -> Result<(), RuntimeError> {
        if self.live() {
            self.evaluator().unary(op)?;
        }
        Ok(())
    }

    fn assign_with(
        &mut self,
        op: impl FnOnce(&Value, &Value) -> Result<Value, RuntimeError>,
    ) -> Result<(), RuntimeError> {
        if self.live() {
            self.evaluator().assign_with(op)?;
        }
        Ok(())
    }

    fn call_script_function(&mut self, name: &str) -> Result<(), RuntimeError> {
        if self.module.call_depth() >= self.options.max_call_chain_depth {
            return Err(RuntimeError::CallChainDepthExceeded(self.options.max_call_chain_depth));
        }
        let target = self.module.function_pos(name)?;
        let return_pos = self.reader.position();
        self.module.push_return(return_pos);
        self.read_level += 1;
        self.reader.seek(target);
        Ok(())
    }

    fn invoke_method(&mut self, name: &str) -> Result<(), RuntimeError> {
        let receiver = self
            .function_param
            .last()
            .cloned()
            .ok_or_else(|| RuntimeError::MalformedBytecode("InvokeMethod with no receiver on FUNCTION_PARAM".into()))?;
        let obj = receiver.as_object().ok_or(RuntimeError::NullValueUsedException)?;
        let handle = obj
            .borrow()
            .get_method(name)
            .ok_or_else(|| RuntimeError::UndeclaredMember(name.to_string()))?;
        if self.module.call_depth() >= self.options.max_call_chain_depth {
            return Err(RuntimeError::CallChainDepthExceeded(self.options.max_call_chain_depth));
        }
        let return_pos = self.reader.position();
        self.module.push_return(return_pos);
        self.read_level += 1;
        self.reader.seek(handle);
        Ok(())
    }

    fn call_native_function(&mut self, name: &str, arity: usize) -> Result<(), RuntimeError> {
        tracing::debug!(name, arity, "native dispatch");
        let len = self.function_param.len();
        let start = len.saturating_sub(arity);
        let args: Vec<Value> = self.function_param.split_off(start);
        let native = self.natives.function(name)?;
        let result = (native.handler)(&args)?;
        self.function_callback.push(result);
        let callback = self.pop_aux(StackId::FunctionCallback)?;
        self.evaluator().push(callback);
        Ok(())
    }

    fn leave_function(&mut self) -> Result<(), RuntimeError> {
        let return_value = self.pop_aux(StackId::FunctionCallback)?;
        self.module.pop_frame();
        self.block_level -= 1;
        self.read_level -= 1;
        let return_pos = self.module.pop_return()?;
        self.reader.seek(return_pos);
        self.evaluator().push(return_value);
        Ok(())
    }
}
