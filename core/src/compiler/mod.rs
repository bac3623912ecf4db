//! The lowering pass: walks a [`crate::ast::ModuleAst`] and emits the
//! bytecode stream a [`crate::vm::runtime::Vm`] can run.
//!
//! Lowering never panics on malformed *source* (that's what
//! [`crate::diagnostics::Diagnostic`]s are for); it only panics on a scope
//! stack invariant it itself should be keeping (e.g. leaving a function's
//! level without having entered one), which would mean a bug in this pass.
//!
//! Two spots intentionally diverge from what a literal reading of the
//! lowering table anyone copies from would produce. Both are written up in
//! `DESIGN.md`:
//!
//! - Call arguments are pushed by the caller in left-to-right source order,
//!   not reversed; the callee still pops its parameters in reverse
//!   declaration order. Reversing both, as a too-literal reading suggests,
//!   binds `p0` to the last argument instead of the first.
//! - A bare call to an undeclared name is not a compile error: it is
//!   assumed to be a native function and resolved at runtime. This is what
//!   lets `print(x)` work without a `native fn print(n);` forward
//!   declaration anywhere in source. `new` on an unknown class type gets the
//!   same permissive treatment, assumed to be a native class.
//!
//! Method receivers travel over the same FUNCTION_PARAM stack as ordinary
//! arguments rather than a dedicated one: the caller pushes it last, and a
//! method's self-slot prologue pops first, ahead of its own parameter loop.

use hashbrown::{HashMap, HashSet};

use crate::ast::{BinaryOp, ClassMember, Expr, ExprNode, ImportTarget, ModuleAst, Stmt, StmtNode, UnaryOp};
use crate::diagnostics::{Diagnostic, DiagnosticSink, Span};
use crate::errors::CompileErrorKind;
use crate::mangle::mangle;
use crate::scope_stack::{BlockType, FnLookup, ScopeStack, SelfContext, VarSlot};
use crate::vm::instruction::{BlockKind, StackId};
use crate::vm::{BytecodeWriter, Instruction};

use crate::api::options::CompileOptions;

/// Lowers a parsed module into bytecode, or the diagnostics collected along
/// the way.
pub fn lower(ast: &ModuleAst, options: &CompileOptions) -> Result<Vec<u8>, Vec<Diagnostic>> {
    tracing::debug!(module = %ast.name, "lowering module");
    let mut lowering = Lowering::new(ast.name.clone(), options.clone());
    lowering.lower_module(ast);
    if lowering.sink.has_errors() {
        tracing::debug!(module = %ast.name, "lowering failed");
        Err(lowering.sink.into_sorted())
    } else {
        let bytecode = lowering.writer.into_bytes();
        tracing::debug!(module = %ast.name, bytes = bytecode.len(), "lowering succeeded");
        Ok(bytecode)
    }
}

struct Lowering {
    module: String,
    #[allow(dead_code)]
    options: CompileOptions,
    writer: BytecodeWriter,
    scope: ScopeStack,
    sink: DiagnosticSink,
    self_context: Option<SelfContext>,
    classes: HashMap<String, Vec<ClassMember>>,
    native_fn_names: HashSet<String>,
    imported_modules: HashSet<String>,
    next_block_id: i32,
    next_synthetic_instance: u64,
}

impl Lowering {
    fn new(module: String, options: CompileOptions) -> Self {
        Self {
            module,
            options,
            writer: BytecodeWriter::new(),
            scope: ScopeStack::new(),
            sink: DiagnosticSink::new(),
            self_context: None,
            classes: HashMap::new(),
            native_fn_names: HashSet::new(),
            imported_modules: HashSet::new(),
            next_block_id: 0,
            next_synthetic_instance: 0,
        }
    }

    /// Lowers one call argument wrapped in its own transient block, per the
    /// `FunctionCall` lowering rule: `IncreaseReadLevel; IncreaseBlockLevel;
    /// lower(arg); OpPush FUNCTION_PARAM; DecreaseBlockLevel`. The bracket is
    /// self-closing: `DecreaseBlockLevel`'s gated `read_level` decrement
    /// cancels the `IncreaseReadLevel` exactly when the call site itself is
    /// live, so nothing needs an explicit `DecreaseReadLevel` to match.
    fn lower_call_arg(&mut self, arg: &ExprNode) {
        self.writer.emit(&Instruction::IncreaseReadLevel);
        self.scope.increase_block(BlockType::Undefined);
        self.writer.emit(&Instruction::IncreaseBlockLevel);
        self.lower_expr(arg);
        self.writer.emit(&Instruction::OpPush { stack_id: StackId::FunctionParam });
        self.writer.emit(&Instruction::DecreaseBlockLevel);
        self.scope.decrease_block();
    }

    fn fresh_block_id(&mut self) -> i32 {
        let id = self.next_block_id;
        self.next_block_id += 1;
        id
    }

    fn error(&mut self, kind: CompileErrorKind, span: &Span) {
        self.sink.push(kind.to_diagnostic(span.clone()));
    }

    /// `self.self_context` resolved into the class tag `mangle()` expects,
    /// per the rule that any identifier mangled while a method body (or its
    /// own params/locals) is being lowered carries the enclosing class's
    /// `_C` segment, even though it isn't itself a field declaration.
    fn self_class_tag(&self) -> Option<&str> {
        self.self_context.as_ref().map(|ctx| ctx.class_tag.as_str())
    }

    fn mangle_var(&self, name: &str, arity: Option<usize>) -> String {
        mangle(&self.module, self.self_class_tag(), name, arity)
    }

    // ------------------------------------------------------------------
    // Module / top level
    // ------------------------------------------------------------------

    fn lower_module(&mut self, ast: &ModuleAst) {
        for stmt in &ast.children {
            self.lower_stmt(stmt);
        }
    }

    fn lower_block(&mut self, block_type: BlockType, body: &[StmtNode]) {
        self.scope.increase_block(block_type);
        self.writer.emit(&Instruction::IncreaseBlockLevel);
        for stmt in body {
            self.lower_stmt(stmt);
        }
        self.writer.emit(&Instruction::DecreaseBlockLevel);
        self.scope.decrease_block();
    }

    fn lower_stmt(&mut self, stmt: &StmtNode) {
        match &stmt.node {
            Stmt::Imports(imports) => {
                for import in imports {
                    self.lower_stmt(import);
                }
            }
            Stmt::Import { target, local_path } => self.lower_import(target, local_path.as_deref()),
            Stmt::Block(body) => self.lower_block(BlockType::Undefined, body),
            Stmt::VarDecl { name, init } => self.lower_var_decl(name, init.as_ref()),
            Stmt::FnDef { name, args, body, is_native } => {
                self.lower_fn_def(name, args, body, *is_native, &stmt.span)
            }
            Stmt::ClassDef { name, members } => self.lower_class_def(name, members, &stmt.span),
            Stmt::ExprStmt { value, clear } => {
                self.lower_expr(value);
                if *clear {
                    self.writer.emit(&Instruction::OpClear);
                }
            }
            Stmt::If { cond, then_block, else_block } => {
                self.lower_if(cond, then_block, else_block.as_deref())
            }
            Stmt::For { init, cond, inc, body } => {
                self.lower_for(init.as_deref(), cond.as_ref(), inc.as_deref(), body)
            }
            Stmt::Return { value } => self.lower_return(value.as_ref()),
            Stmt::Break { levels } => {
                self.writer.emit(&Instruction::LoopBreak(*levels));
            }
            Stmt::Continue { levels } => {
                self.writer.emit(&Instruction::LoopContinue(*levels));
            }
        }
    }

    fn lower_import(&mut self, target: &ImportTarget, local_path: Option<&str>) {
        if !self.scope.is_global() {
            // no span carried on Stmt::Import itself; use a synthetic one.
            self.error(CompileErrorKind::ImportOutsideGlobal, &Span::synthetic(&self.module));
            return;
        }
        let name = match target {
            ImportTarget::Module(m) => m.clone(),
            ImportTarget::File(f) => f.clone(),
        };
        let alias = local_path.unwrap_or(&name);
        self.imported_modules.insert(alias.to_string());
    }

    // ------------------------------------------------------------------
    // Variables
    // ------------------------------------------------------------------

    fn lower_var_decl(&mut self, name: &str, init: Option<&ExprNode>) {
        let mangled = self.mangle_var(name, None);
        if !self.scope.declare_variable(&mangled, VarSlot::plain()) {
            self.error(
                CompileErrorKind::RedeclaredIdentifier(name.to_string()),
                &Span::synthetic(&self.module),
            );
        }
        self.writer.emit(&Instruction::CreateVar { name: mangled.clone() });
        if let Some(init) = init {
            self.writer.emit(&Instruction::LoadVariable { name: mangled });
            self.lower_expr(init);
            self.writer.emit(&Instruction::OpAssign);
            self.writer.emit(&Instruction::OpClear);
        }
    }

    // ------------------------------------------------------------------
    // Functions
    // ------------------------------------------------------------------

    fn lower_fn_def(&mut self, name: &str, args: &[String], body: &[StmtNode], is_native: bool, span: &Span) {
        let mangled_no_arity = self.mangle_var(name, None);
        if !self.scope.declare_function(&mangled_no_arity, args.len()) {
            self.error(CompileErrorKind::AlreadyDefined(name.to_string()), span);
            return;
        }
        if is_native {
            // Native forward declarations carry no body and emit no
            // CreateFunction; the VM resolves them through NativeRegistry
            // by their plain name at CallNativeFunction time.
            tracing::trace!(name, "declared native function");
            self.native_fn_names.insert(name.to_string());
            return;
        }
        let mangled = self.mangle_var(name, Some(args.len()));
        tracing::trace!(name, mangled, arity = args.len(), "registering function");
        self.emit_function_body(&mangled, args, body, None);
    }

    /// Shared by top-level functions and class methods. `self_slot` is
    /// `Some(mangled_self_name)` inside a method body.
    ///
    /// The body is emitted inline, right where the `CreateFunction` record
    /// is, and needs no jump over itself: straight-line execution reaches
    /// the following `IncreaseBlockLevel` with `read_level` unchanged, so
    /// `read_level < block_level` holds for the whole body and every
    /// instruction in it decodes without acting, exactly like a skipped
    /// `if` branch. `CallFunction` is what actually runs it, by seeking the
    /// stream to `body_pos` and bumping `read_level` first.
    fn emit_function_body(&mut self, mangled: &str, args: &[String], body: &[StmtNode], self_slot: Option<String>) {
        let body_pos = self.writer.create_function_body_pos(mangled);
        self.writer.emit(&Instruction::CreateFunction {
            name: mangled.to_string(),
            body_pos,
        });
        debug_assert_eq!(self.writer.position(), body_pos);

        self.scope.increase_block(BlockType::Function);
        self.writer.emit(&Instruction::IncreaseBlockLevel);

        if let Some(self_slot) = &self_slot {
            // The receiver is pushed onto FUNCTION_PARAM last by the caller
            // (after every ordinary argument), so it is the first thing
            // popped here, ahead of the argument loop below.
            self.writer.emit(&Instruction::CreateVar { name: self_slot.clone() });
            self.writer.emit(&Instruction::StackPopObject {
                stack_id: StackId::FunctionParam,
                name: self_slot.clone(),
            });
        }

        let mangled_args: Vec<String> = args
            .iter()
            .map(|a| {
                let m = self.mangle_var(a, None);
                self.scope.declare_variable(&m, VarSlot::plain());
                m
            })
            .collect();
        for mangled_arg in mangled_args.iter().rev() {
            self.writer.emit(&Instruction::CreateVar { name: mangled_arg.clone() });
            self.writer.emit(&Instruction::StackPopObject {
                stack_id: StackId::FunctionParam,
                name: mangled_arg.clone(),
            });
        }

        for stmt in body {
            self.lower_stmt(stmt);
        }

        self.writer.emit(&Instruction::DecreaseBlockLevel);
        self.scope.decrease_block();
    }

    // ------------------------------------------------------------------
    // Classes
    // ------------------------------------------------------------------

    fn lower_class_def(&mut self, name: &str, members: &[ClassMember], span: &Span) {
        let mangled_class = self.mangle_var(name, None);
        if !self.scope.declare_class(&mangled_class) {
            self.error(CompileErrorKind::AlreadyDefined(name.to_string()), span);
            return;
        }
        self.classes.insert(name.to_string(), members.to_vec());
        tracing::trace!(name, members = members.len(), "registering class");

        let self_slot = mangle(&self.module, Some(name), "self", None);
        let outer_self = self.self_context.replace(SelfContext {
            class_tag: name.to_string(),
            mangled_name: self_slot.clone(),
            class_members: members.to_vec(),
        });

        for member in members {
            if let ClassMember::Method { name: method_name, args, body, is_native } = member {
                if *is_native {
                    continue;
                }
                let mangled_method = mangle(&self.module, Some(name), method_name, Some(args.len()));
                self.emit_function_body(&mangled_method, args, body, Some(self_slot.clone()));
            }
        }

        self.self_context = outer_self;
    }

    /// `Expr::New`. Always constructs, field-by-field and method-by-method,
    /// in class-member declaration order.
    fn lower_new(&mut self, var_ident: Option<&str>, constructor: &ExprNode, span: &Span) {
        let (class_name, ctor_args) = match &constructor.node {
            Expr::FunctionCall { name, args } => (name.clone(), args.clone()),
            _ => {
                self.error(CompileErrorKind::InvalidConstructor, span);
                return;
            }
        };
        let instance_src_name = var_ident.map(str::to_string).unwrap_or_else(|| {
            let n = self.next_synthetic_instance;
            self.next_synthetic_instance += 1;
            format!("{class_name}{n}")
        });
        let mangled_instance = self.mangle_var(&instance_src_name, None);
        if !self.scope.declare_variable(
            &mangled_instance,
            VarSlot {
                is_class: true,
                class_name: Some(class_name.clone()),
            },
        ) {
            self.error(CompileErrorKind::RedeclaredIdentifier(instance_src_name), span);
            return;
        }

        let Some(members) = self.classes.get(&class_name).cloned() else {
            // Permissively assume a native class, same rationale as an
            // undeclared call target: the NativeRegistry raises
            // UnboundNativeClass at runtime if `class_name` truly isn't one.
            self.writer.emit(&Instruction::CreateVar { name: mangled_instance.clone() });
            self.writer.emit(&Instruction::LoadVariable { name: mangled_instance.clone() });
            for arg in &ctor_args {
                self.lower_call_arg(arg);
            }
            self.writer.emit(&Instruction::CreateNativeClassInstance { class_name });
            self.writer.emit(&Instruction::OpAssign);
            self.writer.emit(&Instruction::OpClear);
            self.writer.emit(&Instruction::LoadVariable { name: mangled_instance });
            return;
        };

        // Script classes have no parameterized constructor: field
        // initializers are the fixed expressions written in the class body,
        // so any `new Point(...)` arguments here are simply not consulted.

        self.writer.emit(&Instruction::CreateVar { name: mangled_instance.clone() });
        self.writer.emit(&Instruction::CreateClassInstance {
            class_tag_name: class_name.clone(),
            instance_name: mangled_instance.clone(),
        });

        let self_slot = mangle(&self.module, Some(&class_name), "self", None);
        let outer_self = self.self_context.replace(SelfContext {
            class_tag: class_name.clone(),
            mangled_name: self_slot,
            class_members: members.clone(),
        });

        for member in &members {
            match member {
                ClassMember::Field { name, init } => {
                    match init {
                        Some(init) => self.lower_expr(init),
                        None => {
                            self.writer.emit(&Instruction::LoadNull);
                        }
                    }
                    self.writer.emit(&Instruction::AddMember { name: name.clone() });
                }
                ClassMember::Method { name, args, is_native, .. } => {
                    if *is_native {
                        continue;
                    }
                    let function_name = mangle(&self.module, Some(&class_name), name, Some(args.len()));
                    self.writer.emit(&Instruction::BindMethod {
                        name: name.clone(),
                        function_name,
                    });
                }
            }
        }

        self.self_context = outer_self;
        self.writer.emit(&Instruction::EndClassInstance);
        self.writer.emit(&Instruction::LoadVariable { name: mangled_instance });
    }

    // ------------------------------------------------------------------
    // Control flow
    // ------------------------------------------------------------------

    fn lower_if(&mut self, cond: &ExprNode, then_block: &[StmtNode], else_block: Option<&[StmtNode]>) {
        self.lower_expr(cond);
        self.writer.emit(&Instruction::IfStatement);
        let if_id = self.fresh_block_id();
        let body_pos = self.writer.create_block_body_pos();
        self.writer.emit(&Instruction::CreateBlock {
            id: if_id,
            block_type: BlockKind::IfStatement,
            parent_id: -1,
            body_pos,
        });
        self.lower_block(BlockType::IfStatement, then_block);
        if let Some(else_block) = else_block {
            self.writer.emit(&Instruction::ElseStatement);
            self.lower_block(BlockType::ElseStatement, else_block);
        }
    }

    fn lower_for(&mut self, init: Option<&StmtNode>, cond: Option<&ExprNode>, inc: Option<&StmtNode>, body: &[StmtNode]) {
        self.writer.emit(&Instruction::IncreaseReadLevel);
        self.scope.increase_block(BlockType::Undefined);
        self.writer.emit(&Instruction::IncreaseBlockLevel);

        if let Some(init) = init {
            self.lower_stmt(init);
        }

        let label_id = self.fresh_block_id();
        let body_pos = self.writer.create_block_body_pos();
        self.writer.emit(&Instruction::CreateBlock {
            id: label_id,
            block_type: BlockKind::Label,
            parent_id: -1,
            body_pos,
        });

        match cond {
            Some(cond) => self.lower_expr(cond),
            None => {
                self.writer.emit(&Instruction::LoadInteger(1));
            }
        }
        self.writer.emit(&Instruction::IfStatement);

        self.scope.increase_block(BlockType::IfStatement);
        self.writer.emit(&Instruction::IncreaseBlockLevel);
        for stmt in body {
            self.lower_stmt(stmt);
        }
        if let Some(inc) = inc {
            self.lower_stmt(inc);
            self.writer.emit(&Instruction::OpClear);
        }
        self.writer.emit(&Instruction::DecreaseBlockLevel);
        self.scope.decrease_block();

        self.writer.emit(&Instruction::GoToIfTrue { id: label_id });

        self.writer.emit(&Instruction::DecreaseBlockLevel);
        self.scope.decrease_block();
    }

    fn lower_return(&mut self, value: Option<&ExprNode>) {
        match value {
            Some(value) => self.lower_expr(value),
            None => {
                self.writer.emit(&Instruction::LoadNull);
            }
        }
        self.writer.emit(&Instruction::OpPush { stack_id: StackId::FunctionCallback });
        let leave_blocks = self.scope.non_function_levels_since_function();
        for _ in 0..leave_blocks {
            self.writer.emit(&Instruction::LeaveBlock);
        }
        self.writer.emit(&Instruction::LeaveFunction);
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn lower_expr(&mut self, expr: &ExprNode) {
        match &expr.node {
            Expr::Integer(v) => {
                self.writer.emit(&Instruction::LoadInteger(*v));
            }
            Expr::Float(v) => {
                self.writer.emit(&Instruction::LoadFloat(v.0));
            }
            Expr::Str(s) => {
                self.writer.emit(&Instruction::LoadString(s.clone()));
            }
            Expr::True => {
                self.writer.emit(&Instruction::LoadInteger(1));
            }
            Expr::False => {
                self.writer.emit(&Instruction::LoadInteger(0));
            }
            Expr::Null => {
                self.writer.emit(&Instruction::LoadNull);
            }
            Expr::Variable(name) => {
                let mangled = self.resolve_variable_name(name, &expr.span);
                self.writer.emit(&Instruction::LoadVariable { name: mangled });
            }
            Expr::SelfExpr => match &self.self_context {
                Some(ctx) => {
                    let mangled = ctx.mangled_name.clone();
                    self.writer.emit(&Instruction::LoadVariable { name: mangled });
                }
                None => self.error(CompileErrorKind::SelfNotDefined, &expr.span),
            },
            Expr::Unary { op, operand } => self.lower_unary(*op, operand),
            Expr::Binary { op, left, right } => self.lower_binary(*op, left, right, &expr.span),
            Expr::MemberAccess { left, right } => self.lower_member_access(left, right.as_deref(), &expr.span, false),
            Expr::FunctionCall { name, args } => self.lower_call(name, args, &expr.span),
            Expr::New { var_ident, constructor } => {
                self.lower_new(var_ident.as_deref(), constructor, &expr.span)
            }
        }
    }

    fn resolve_variable_name(&mut self, name: &str, span: &Span) -> String {
        // Walk self-context first (method locals/params/fields), then fall
        // back to the module-global mangling; both are tried against the
        // scope stack so diagnostics reflect what is actually visible.
        let with_self = self.mangle_var(name, None);
        if self.scope.var_in_scope(&with_self).is_some() {
            return with_self;
        }
        let plain = mangle(&self.module, None, name, None);
        if self.scope.var_in_scope(&plain).is_some() {
            return plain;
        }
        self.error(CompileErrorKind::UndeclaredIdentifier(name.to_string()), span);
        with_self
    }

    fn lower_unary(&mut self, op: UnaryOp, operand: &ExprNode) {
        self.lower_expr(operand);
        let instr = match op {
            UnaryOp::Neg => Instruction::OpUnaryNeg,
            UnaryOp::Pos => Instruction::OpUnaryPos,
            UnaryOp::Not => Instruction::OpUnaryNot,
            UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec => {
                // Not wired to any token in the current grammar.
                Instruction::OpUnaryPos
            }
        };
        self.writer.emit(&instr);
    }

    fn lower_binary(&mut self, op: BinaryOp, left: &ExprNode, right: &ExprNode, span: &Span) {
        if op.is_assignment() {
            self.lower_assignment_target(left, span);
            self.lower_expr(right);
            match op.compound_op() {
                None => self.writer.emit(&Instruction::OpAssign),
                Some(BinaryOp::Add) => self.writer.emit(&Instruction::OpAddAssign),
                Some(BinaryOp::Sub) => self.writer.emit(&Instruction::OpSubAssign),
                Some(BinaryOp::Mul) => self.writer.emit(&Instruction::OpMulAssign),
                Some(BinaryOp::Div) => self.writer.emit(&Instruction::OpDivAssign),
                Some(BinaryOp::Mod) => self.writer.emit(&Instruction::OpModAssign),
                Some(BinaryOp::Pow) => self.writer.emit(&Instruction::OpPowAssign),
                Some(BinaryOp::BitXor) => self.writer.emit(&Instruction::OpBitXorAssign),
                Some(BinaryOp::BitAnd) => self.writer.emit(&Instruction::OpBitAndAssign),
                Some(BinaryOp::BitOr) => self.writer.emit(&Instruction::OpBitOrAssign),
                Some(_) => unreachable!("compound_op only returns plain arithmetic/bitwise ops"),
            };
            return;
        }

        self.lower_expr(left);
        self.lower_expr(right);
        let instr = match op {
            BinaryOp::Add => Instruction::OpAdd,
            BinaryOp::Sub => Instruction::OpSub,
            BinaryOp::Mul => Instruction::OpMul,
            BinaryOp::Div => Instruction::OpDiv,
            BinaryOp::Mod => Instruction::OpMod,
            BinaryOp::Pow => Instruction::OpPow,
            BinaryOp::BitXor => Instruction::OpBitXor,
            BinaryOp::BitAnd => Instruction::OpBitAnd,
            BinaryOp::BitOr => Instruction::OpBitOr,
            BinaryOp::LogAnd => Instruction::OpAnd,
            BinaryOp::LogOr => Instruction::OpOr,
            BinaryOp::Eq => Instruction::OpEql,
            BinaryOp::NotEq => Instruction::OpNeql,
            BinaryOp::Lt => Instruction::OpLt,
            BinaryOp::Gt => Instruction::OpGt,
            BinaryOp::Lte => Instruction::OpLte,
            BinaryOp::Gte => Instruction::OpGte,
            _ => unreachable!("assignment forms handled above"),
        };
        self.writer.emit(&instr);
    }

    /// An assignment's left-hand side must be a `Variable` or a
    /// `MemberAccess` whose tail is a `Variable`; anything else (including a
    /// `MemberAccess` whose tail is a method call) is `IllegalExpression`.
    fn lower_assignment_target(&mut self, left: &ExprNode, span: &Span) {
        match &left.node {
            Expr::Variable(_) | Expr::SelfExpr => self.lower_expr(left),
            Expr::MemberAccess { right: Some(tail), .. } if matches!(tail.node, Expr::FunctionCall { .. }) => {
                self.error(CompileErrorKind::IllegalExpression, span);
            }
            Expr::MemberAccess { .. } => self.lower_expr(left),
            _ => self.error(CompileErrorKind::IllegalExpression, span),
        }
    }

    /// `p.x`, `p.foo()`, `self.x`, and module-qualified `mod.fn()` all come
    /// through here. Deeper nested module chains (`a.b.c`) are not
    /// supported: only a single leading module-qualifier segment is
    /// recognized, matching what the grammar's flat `postfix_suffix*` chain
    /// actually needs for the scenarios this language targets.
    fn lower_member_access(&mut self, left: &ExprNode, right: Option<&ExprNode>, span: &Span, _as_target: bool) {
        let tail = match right {
            Some(tail) => tail,
            None => {
                self.lower_expr(left);
                return;
            }
        };

        if let Expr::Variable(module_name) = &left.node {
            if self.imported_modules.contains(module_name) {
                self.lower_module_qualified(module_name, tail);
                return;
            }
        }

        self.lower_expr(left);
        match &tail.node {
            Expr::Variable(member) => {
                self.writer.emit(&Instruction::LoadMember { name: member.clone() });
            }
            Expr::FunctionCall { name, args } => {
                // `left` was already lowered onto the evaluator above; hold
                // it there while the arguments are pushed, then push it to
                // FUNCTION_PARAM last so the callee's self-slot prologue
                // (which pops first) picks it up ahead of its own params.
                for arg in args {
                    self.lower_call_arg(arg);
                }
                self.writer.emit(&Instruction::OpPush { stack_id: StackId::FunctionParam });
                self.writer.emit(&Instruction::InvokeMethod { name: name.clone() });
            }
            Expr::MemberAccess { left: inner_left, right: inner_right } => {
                self.lower_member_access(inner_left, inner_right.as_deref(), span, false);
            }
            _ => self.error(CompileErrorKind::IllegalExpression, span),
        }
    }

    fn lower_module_qualified(&mut self, module_name: &str, tail: &ExprNode) {
        match &tail.node {
            Expr::Variable(name) => {
                let mangled = mangle(module_name, None, name, None);
                self.writer.emit(&Instruction::LoadVariable { name: mangled });
            }
            Expr::FunctionCall { name, args } => {
                for arg in args {
                    self.lower_call_arg(arg);
                }
                let mangled = mangle(module_name, None, name, Some(args.len()));
                self.writer.emit(&Instruction::CallFunction { name: mangled });
            }
            _ => {}
        }
    }

    fn lower_call(&mut self, name: &str, args: &[ExprNode], span: &Span) {
        let mangled_no_arity = self.mangle_var(name, None);
        let lookup = self.scope.fn_in_scope(&mangled_no_arity, args.len());

        match lookup {
            FnLookup::Found => {
                for arg in args {
                    self.lower_call_arg(arg);
                }
                if self.native_fn_names.contains(name) {
                    let block_id = self.fresh_block_id();
                    self.writer.emit(&Instruction::CallNativeFunction {
                        block_id,
                        arity: args.len() as i32,
                        name: name.to_string(),
                    });
                } else {
                    let mangled = self.mangle_var(name, Some(args.len()));
                    self.writer.emit(&Instruction::CallFunction { name: mangled });
                }
            }
            FnLookup::TooFewArgs { expected } => {
                self.error(
                    CompileErrorKind::TooFewArgs {
                        name: name.to_string(),
                        expected,
                        got: args.len(),
                    },
                    span,
                );
            }
            FnLookup::TooManyArgs { expected } => {
                self.error(
                    CompileErrorKind::TooManyArgs {
                        name: name.to_string(),
                        expected,
                        got: args.len(),
                    },
                    span,
                );
            }
            FnLookup::NotFound => {
                // Permissively assume native; NativeRegistry raises
                // UnboundNativeFunction at runtime if it truly doesn't exist.
                for arg in args {
                    self.lower_call_arg(arg);
                }
                let block_id = self.fresh_block_id();
                self.writer.emit(&Instruction::CallNativeFunction {
                    block_id,
                    arity: args.len() as i32,
                    name: name.to_string(),
                });
            }
        }
    }
}
