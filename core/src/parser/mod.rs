//! The front end: a `pest` grammar (`vela.pest`) tokenizes and shapes
//! source text into parse pairs; this module walks those pairs into the
//! [`crate::ast`] types the lowering pass consumes.
//!
//! Precedence is entirely baked into the grammar's rule nesting (lowest to
//! highest: assignment, `||`, `&&`, `|`, `^`, `&`, `==`/`!=`, relational,
//! `+`/`-`, `*`/`/`/`%`, `**`, unary, postfix), so this module is a plain
//! recursive walk rather than a Pratt parser: each precedence level's rule
//! already tells us whether an operator was present.

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use crate::ast::{
    BinaryOp, ClassMember, Expr, ExprNode, ImportTarget, ModuleAst, OrderedFloat, Spanned, Stmt,
    StmtNode, UnaryOp,
};
use crate::diagnostics::{Diagnostic, Span};
use crate::errors::CompileErrorKind;

#[derive(Parser)]
#[grammar = "parser/vela.pest"]
struct VelaParser;

/// Parses one source file into a [`ModuleAst`]. `file` names the source for
/// diagnostics; it never touches the filesystem.
pub fn parse(source: &str, file: &str) -> Result<ModuleAst, Diagnostic> {
    let mut pairs = VelaParser::parse(Rule::file, source).map_err(|e| pest_error(e, file))?;
    let file_pair = pairs.next().expect("Rule::file always produces one pair");
    build_file(file_pair, file)
}

fn pest_error(err: pest::error::Error<Rule>, file: &str) -> Diagnostic {
    let (line, column) = match err.line_col {
        pest::error::LineColLocation::Pos((l, c)) => (l, c),
        pest::error::LineColLocation::Span((l, c), _) => (l, c),
    };
    let span = Span::new(file, 0, 0, line as u32, column as u32);
    CompileErrorKind::IllegalSyntax
        .to_diagnostic(span)
        .with_help(err.to_string())
}

fn span_of(pair: &Pair<Rule>, file: &str) -> Span {
    let s = pair.as_span();
    let (line, column) = s.start_pos().line_col();
    Span::new(file, s.start(), s.end(), line as u32, column as u32)
}

fn build_file(pair: Pair<Rule>, file: &str) -> Result<ModuleAst, Diagnostic> {
    let span = span_of(&pair, file);
    let mut inner = pair.into_inner();
    let module_decl = inner.next().expect("file always has a module_decl");
    let name = build_module_decl(module_decl);

    let mut children = Vec::new();
    for p in inner {
        match p.as_rule() {
            Rule::stmt => children.push(build_stmt(p, file)?),
            Rule::EOI => {}
            other => unreachable!("unexpected top-level rule {other:?}"),
        }
    }

    Ok(ModuleAst { name, span, children })
}

fn build_module_decl(pair: Pair<Rule>) -> String {
    pair.into_inner()
        .find(|p| p.as_rule() == Rule::ident)
        .expect("module_decl always has a name")
        .as_str()
        .to_string()
}

// ---------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------

fn build_stmt(pair: Pair<Rule>, file: &str) -> Result<StmtNode, Diagnostic> {
    let span = span_of(&pair, file);
    let inner = pair
        .into_inner()
        .next()
        .expect("stmt always wraps exactly one alternative");
    let node = match inner.as_rule() {
        Rule::import_stmt => build_import_stmt(inner, file)?,
        Rule::var_decl => build_var_decl(inner, file)?,
        Rule::fn_def => build_fn_def(inner, file)?,
        Rule::class_def => build_class_def(inner, file)?,
        Rule::if_stmt => build_if_stmt(inner, file)?,
        Rule::for_stmt => build_for_stmt(inner, file)?,
        Rule::return_stmt => build_return_stmt(inner, file)?,
        Rule::break_stmt => Stmt::Break { levels: 1 },
        Rule::continue_stmt => Stmt::Continue { levels: 1 },
        Rule::block => Stmt::Block(build_block(inner, file)?),
        Rule::expr_stmt => build_expr_stmt(inner, file)?,
        other => unreachable!("unexpected stmt alternative {other:?}"),
    };
    Ok(Spanned::new(node, span))
}

fn build_block(pair: Pair<Rule>, file: &str) -> Result<Vec<StmtNode>, Diagnostic> {
    pair.into_inner().map(|p| build_stmt(p, file)).collect()
}

/// Appends a synthetic `return;` if the body doesn't already end in one.
fn ensure_trailing_return(body: &mut Vec<StmtNode>, file: &str) {
    let already_returns = matches!(
        body.last(),
        Some(Spanned {
            node: Stmt::Return { .. },
            ..
        })
    );
    if !already_returns {
        body.push(Spanned::new(Stmt::Return { value: None }, Span::synthetic(file)));
    }
}

fn build_import_stmt(pair: Pair<Rule>, file: &str) -> Result<Stmt, Diagnostic> {
    let mut inner = pair.into_inner();
    let _kw_import = inner.next();
    let target = build_import_target(inner.next().expect("import_stmt always has a target"), file)?;
    let local_path = inner.find(|p| p.as_rule() == Rule::ident).map(|id| id.as_str().to_string());
    Ok(Stmt::Import { target, local_path })
}

fn build_import_target(pair: Pair<Rule>, file: &str) -> Result<ImportTarget, Diagnostic> {
    let inner = pair
        .into_inner()
        .next()
        .expect("import_target always has one child");
    Ok(match inner.as_rule() {
        Rule::string => ImportTarget::File(build_string_literal(inner, file)?),
        Rule::ident => ImportTarget::Module(inner.as_str().to_string()),
        other => unreachable!("unexpected import_target alternative {other:?}"),
    })
}

fn build_var_decl(pair: Pair<Rule>, file: &str) -> Result<Stmt, Diagnostic> {
    let mut inner = pair.into_inner();
    let _kw_var = inner.next();
    let name = inner.next().expect("var_decl always has a name").as_str().to_string();
    let init = match inner.next() {
        Some(e) => Some(build_expr(e, file)?),
        None => None,
    };
    Ok(Stmt::VarDecl { name, init })
}

fn build_fn_def(pair: Pair<Rule>, file: &str) -> Result<Stmt, Diagnostic> {
    let (is_native, name, args, body_pair) = split_fn_shape(pair);
    let mut body = build_block(body_pair, file)?;
    ensure_trailing_return(&mut body, file);
    Ok(Stmt::FnDef { name, args, body, is_native })
}

/// Shared by `fn_def` and `method_member`: both are
/// `kw_native? ~ kw_fn ~ ident ~ "(" ~ param_list? ~ ")" ~ block`.
fn split_fn_shape(pair: Pair<Rule>) -> (bool, String, Vec<String>, Pair<Rule>) {
    let mut parts: Vec<Pair<Rule>> = pair.into_inner().collect();
    let is_native = matches!(parts.first().map(|p| p.as_rule()), Some(Rule::kw_native));
    if is_native {
        parts.remove(0);
    }
    let mut iter = parts.into_iter();
    let _kw_fn = iter.next().expect("fn shape always has kw_fn");
    let name = iter.next().expect("fn shape always has a name").as_str().to_string();

    let mut args = Vec::new();
    let mut body_pair = None;
    for p in iter {
        match p.as_rule() {
            Rule::param_list => args = build_param_list(p),
            Rule::block => body_pair = Some(p),
            other => unreachable!("unexpected fn shape part {other:?}"),
        }
    }
    (is_native, name, args, body_pair.expect("fn shape always has a body block"))
}

fn build_param_list(pair: Pair<Rule>) -> Vec<String> {
    pair.into_inner().map(|p| p.as_str().to_string()).collect()
}

fn build_class_def(pair: Pair<Rule>, file: &str) -> Result<Stmt, Diagnostic> {
    let mut inner = pair.into_inner();
    let _kw_class = inner.next();
    let name = inner.next().expect("class_def always has a name").as_str().to_string();
    let members = inner
        .map(|p| build_class_member(p, file))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Stmt::ClassDef { name, members })
}

fn build_class_member(pair: Pair<Rule>, file: &str) -> Result<ClassMember, Diagnostic> {
    let inner = pair
        .into_inner()
        .next()
        .expect("class_member always wraps one alternative");
    match inner.as_rule() {
        Rule::field_member => build_field_member(inner, file),
        Rule::method_member => build_method_member(inner, file),
        other => unreachable!("unexpected class_member alternative {other:?}"),
    }
}

fn build_field_member(pair: Pair<Rule>, file: &str) -> Result<ClassMember, Diagnostic> {
    let mut inner = pair.into_inner();
    let _kw_var = inner.next();
    let name = inner.next().expect("field_member always has a name").as_str().to_string();
    let init = match inner.next() {
        Some(e) => Some(build_expr(e, file)?),
        None => None,
    };
    Ok(ClassMember::Field { name, init })
}

fn build_method_member(pair: Pair<Rule>, file: &str) -> Result<ClassMember, Diagnostic> {
    let (is_native, name, args, body_pair) = split_fn_shape(pair);
    let mut body = build_block(body_pair, file)?;
    ensure_trailing_return(&mut body, file);
    Ok(ClassMember::Method { name, args, body, is_native })
}

fn build_if_stmt(pair: Pair<Rule>, file: &str) -> Result<Stmt, Diagnostic> {
    let mut inner = pair.into_inner();
    let _kw_if = inner.next();
    let cond = build_expr(inner.next().expect("if_stmt always has a condition"), file)?;
    let then_block = build_block(inner.next().expect("if_stmt always has a then block"), file)?;

    let else_block = match inner.next() {
        Some(kw_else) => {
            debug_assert_eq!(kw_else.as_rule(), Rule::kw_else);
            let branch = inner.next().expect("kw_else is always followed by its branch");
            Some(match branch.as_rule() {
                Rule::if_stmt => {
                    let span = span_of(&branch, file);
                    vec![Spanned::new(build_if_stmt(branch, file)?, span)]
                }
                Rule::block => build_block(branch, file)?,
                other => unreachable!("unexpected else branch {other:?}"),
            })
        }
        None => None,
    };

    Ok(Stmt::If { cond, then_block, else_block })
}

fn build_for_stmt(pair: Pair<Rule>, file: &str) -> Result<Stmt, Diagnostic> {
    let mut init = None;
    let mut cond = None;
    let mut inc = None;
    let mut body = None;

    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::kw_for => {}
            Rule::for_init => init = Some(Box::new(build_for_init(p, file)?)),
            Rule::for_cond => {
                let e = p.into_inner().next().expect("for_cond always wraps an expr");
                cond = Some(build_expr(e, file)?);
            }
            Rule::for_inc => {
                let span = span_of(&p, file);
                let e = p.into_inner().next().expect("for_inc always wraps an expr");
                let node = Stmt::ExprStmt { value: build_expr(e, file)?, clear: false };
                inc = Some(Box::new(Spanned::new(node, span)));
            }
            Rule::block => body = Some(build_block(p, file)?),
            other => unreachable!("unexpected for_stmt part {other:?}"),
        }
    }

    Ok(Stmt::For {
        init,
        cond,
        inc,
        body: body.expect("for_stmt always has a body block"),
    })
}

fn build_for_init(pair: Pair<Rule>, file: &str) -> Result<StmtNode, Diagnostic> {
    let span = span_of(&pair, file);
    let mut inner = pair.into_inner().peekable();
    let node = if matches!(inner.peek().map(|p| p.as_rule()), Some(Rule::kw_var)) {
        inner.next();
        let name = inner.next().expect("var for_init always has a name").as_str().to_string();
        let init = match inner.next() {
            Some(e) => Some(build_expr(e, file)?),
            None => None,
        };
        Stmt::VarDecl { name, init }
    } else {
        let e = inner.next().expect("for_init always has a value");
        Stmt::ExprStmt { value: build_expr(e, file)?, clear: false }
    };
    Ok(Spanned::new(node, span))
}

fn build_return_stmt(pair: Pair<Rule>, file: &str) -> Result<Stmt, Diagnostic> {
    let mut inner = pair.into_inner();
    let _kw_return = inner.next();
    let value = match inner.next() {
        Some(e) => Some(build_expr(e, file)?),
        None => None,
    };
    Ok(Stmt::Return { value })
}

fn build_expr_stmt(pair: Pair<Rule>, file: &str) -> Result<Stmt, Diagnostic> {
    let e = pair.into_inner().next().expect("expr_stmt always wraps an expr");
    Ok(Stmt::ExprStmt { value: build_expr(e, file)?, clear: true })
}

// ---------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------

fn build_expr(pair: Pair<Rule>, file: &str) -> Result<ExprNode, Diagnostic> {
    let inner = pair.into_inner().next().expect("expr always wraps an assign_expr");
    build_assign_expr(inner, file)
}

fn assign_op(pair: &Pair<Rule>) -> BinaryOp {
    match pair.as_str() {
        "=" => BinaryOp::Assign,
        "+=" => BinaryOp::AddAssign,
        "-=" => BinaryOp::SubAssign,
        "*=" => BinaryOp::MulAssign,
        "/=" => BinaryOp::DivAssign,
        "%=" => BinaryOp::ModAssign,
        "**=" => BinaryOp::PowAssign,
        "^=" => BinaryOp::BitXorAssign,
        "&=" => BinaryOp::BitAndAssign,
        "|=" => BinaryOp::BitOrAssign,
        other => unreachable!("unexpected assign_op text {other:?}"),
    }
}

/// `assign_expr = { or_expr ~ (assign_op ~ assign_expr)? }`, right-associative.
fn build_assign_expr(pair: Pair<Rule>, file: &str) -> Result<ExprNode, Diagnostic> {
    let span = span_of(&pair, file);
    let mut inner = pair.into_inner();
    let left = build_or_expr(inner.next().expect("assign_expr always has a left side"), file)?;
    match inner.next() {
        None => Ok(left),
        Some(op_pair) => {
            let op = assign_op(&op_pair);
            let right = build_assign_expr(inner.next().expect("assign_op always has a right side"), file)?;
            Ok(Spanned::new(
                Expr::Binary { op, left: Box::new(left), right: Box::new(right) },
                span,
            ))
        }
    }
}

/// Builds one left-associative binary level: `head ~ (op ~ head)*`.
macro_rules! left_assoc_level {
    ($fn_name:ident, $child:ident, $op_rule:path, $map_op:expr) => {
        fn $fn_name(pair: Pair<Rule>, file: &str) -> Result<ExprNode, Diagnostic> {
            let span = span_of(&pair, file);
            let mut inner = pair.into_inner();
            let mut left = $child(inner.next().expect("binary level always has a left side"), file)?;
            while let Some(op_pair) = inner.next() {
                debug_assert_eq!(op_pair.as_rule(), $op_rule);
                let op = $map_op(&op_pair);
                let right = $child(
                    inner.next().expect("binary operator is always followed by a right side"),
                    file,
                )?;
                left = Spanned::new(
                    Expr::Binary { op, left: Box::new(left), right: Box::new(right) },
                    span.clone(),
                );
            }
            Ok(left)
        }
    };
}

left_assoc_level!(build_or_expr, build_and_expr, Rule::or_op, |_: &Pair<Rule>| BinaryOp::LogOr);
left_assoc_level!(build_and_expr, build_bitor_expr, Rule::and_op, |_: &Pair<Rule>| BinaryOp::LogAnd);
left_assoc_level!(build_bitor_expr, build_bitxor_expr, Rule::bitor_op, |_: &Pair<Rule>| BinaryOp::BitOr);
left_assoc_level!(build_bitxor_expr, build_bitand_expr, Rule::bitxor_op, |_: &Pair<Rule>| BinaryOp::BitXor);
left_assoc_level!(build_bitand_expr, build_eq_expr, Rule::bitand_op, |_: &Pair<Rule>| BinaryOp::BitAnd);
left_assoc_level!(build_eq_expr, build_rel_expr, Rule::eq_op, |p: &Pair<Rule>| match p.as_str() {
    "==" => BinaryOp::Eq,
    "!=" => BinaryOp::NotEq,
    other => unreachable!("unexpected eq_op text {other:?}"),
});
left_assoc_level!(build_rel_expr, build_add_expr, Rule::rel_op, |p: &Pair<Rule>| match p.as_str() {
    "<=" => BinaryOp::Lte,
    ">=" => BinaryOp::Gte,
    "<" => BinaryOp::Lt,
    ">" => BinaryOp::Gt,
    other => unreachable!("unexpected rel_op text {other:?}"),
});
left_assoc_level!(build_add_expr, build_mul_expr, Rule::add_op, |p: &Pair<Rule>| match p.as_str() {
    "+" => BinaryOp::Add,
    "-" => BinaryOp::Sub,
    other => unreachable!("unexpected add_op text {other:?}"),
});
left_assoc_level!(build_mul_expr, build_pow_expr, Rule::mul_op, |p: &Pair<Rule>| match p.as_str() {
    "*" => BinaryOp::Mul,
    "/" => BinaryOp::Div,
    "%" => BinaryOp::Mod,
    other => unreachable!("unexpected mul_op text {other:?}"),
});

/// `pow_expr = { unary_expr ~ ("**" ~ pow_expr)? }`, right-associative; `**`
/// itself is an anonymous literal so only the two operand pairs appear.
fn build_pow_expr(pair: Pair<Rule>, file: &str) -> Result<ExprNode, Diagnostic> {
    let span = span_of(&pair, file);
    let mut inner = pair.into_inner();
    let base = build_unary_expr(inner.next().expect("pow_expr always has a base"), file)?;
    match inner.next() {
        None => Ok(base),
        Some(rhs) => {
            let exponent = build_pow_expr(rhs, file)?;
            Ok(Spanned::new(
                Expr::Binary { op: BinaryOp::Pow, left: Box::new(base), right: Box::new(exponent) },
                span,
            ))
        }
    }
}

/// `unary_expr = { unary_op* ~ postfix_expr }`. Operators are listed
/// outermost-first in source order (`!-x` means `!(-(x))`), so they're
/// applied in reverse once the innermost operand is built.
fn build_unary_expr(pair: Pair<Rule>, file: &str) -> Result<ExprNode, Diagnostic> {
    let span = span_of(&pair, file);
    let mut ops = Vec::new();
    let mut operand_pair = None;
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::unary_op => ops.push(match p.as_str() {
                "!" => UnaryOp::Not,
                "-" => UnaryOp::Neg,
                "+" => UnaryOp::Pos,
                other => unreachable!("unexpected unary_op text {other:?}"),
            }),
            Rule::postfix_expr => operand_pair = Some(p),
            other => unreachable!("unexpected unary_expr part {other:?}"),
        }
    }
    let mut node = build_postfix_expr(operand_pair.expect("unary_expr always has an operand"), file)?;
    for op in ops.into_iter().rev() {
        node = Spanned::new(Expr::Unary { op, operand: Box::new(node) }, span.clone());
    }
    Ok(node)
}

/// `postfix_expr = { primary ~ postfix_suffix* }`.
///
/// A `call_suffix` right after the `primary` (no preceding
/// `member_suffix`) is a bare call and becomes `Expr::FunctionCall`. A
/// `call_suffix` following a `member_suffix` turns that member's tail
/// (`Variable`) into a `FunctionCall`, since [`crate::ast::Expr::MemberAccess`]
/// has no generic "receiver" slot to hang a call off of.
fn build_postfix_expr(pair: Pair<Rule>, file: &str) -> Result<ExprNode, Diagnostic> {
    let span = span_of(&pair, file);
    let mut inner = pair.into_inner();
    let primary_pair = inner.next().expect("postfix_expr always has a primary");
    let mut node = build_primary(primary_pair, file)?;

    for suffix in inner {
        let suffix_span = span_of(&suffix, file);
        let part = suffix.into_inner().next().expect("postfix_suffix always wraps one alternative");
        match part.as_rule() {
            Rule::member_suffix => {
                let name_pair = part.into_inner().next().expect("member_suffix always has a name");
                let name_span = span_of(&name_pair, file);
                let tail = Spanned::new(Expr::Variable(name_pair.as_str().to_string()), name_span);
                node = Spanned::new(
                    Expr::MemberAccess { left: Box::new(node), right: Some(Box::new(tail)) },
                    suffix_span,
                );
            }
            Rule::call_suffix => {
                let args = match part.into_inner().next() {
                    Some(arg_list) => build_arg_list(arg_list, file)?,
                    None => Vec::new(),
                };
                node = attach_call(node, args, suffix_span, file)?;
            }
            other => unreachable!("unexpected postfix_suffix alternative {other:?}"),
        }
    }

    Ok(node)
}

/// Turns `node(args)` into a call. `node` is either a bare `Variable`
/// (becomes a plain `FunctionCall`) or a `MemberAccess` whose tail is a
/// `Variable` (that tail becomes the `FunctionCall`, i.e. a method call).
/// Anything else being called (e.g. a call result) has no receiver slot to
/// carry the name, so it's reported as an illegal expression.
fn attach_call(
    node: ExprNode,
    args: Vec<ExprNode>,
    span: Span,
    _file: &str,
) -> Result<ExprNode, Diagnostic> {
    match node.node {
        Expr::Variable(name) => Ok(Spanned::new(Expr::FunctionCall { name, args }, span)),
        Expr::MemberAccess { left, right: Some(tail) } => match tail.node {
            Expr::Variable(name) => {
                let call = Spanned::new(Expr::FunctionCall { name, args }, span.clone());
                Ok(Spanned::new(
                    Expr::MemberAccess { left, right: Some(Box::new(call)) },
                    span,
                ))
            }
            _ => Err(CompileErrorKind::IllegalExpression.to_diagnostic(span)),
        },
        _ => Err(CompileErrorKind::IllegalExpression.to_diagnostic(span)),
    }
}

fn build_arg_list(pair: Pair<Rule>, file: &str) -> Result<Vec<ExprNode>, Diagnostic> {
    pair.into_inner().map(|p| build_expr(p, file)).collect()
}

fn build_primary(pair: Pair<Rule>, file: &str) -> Result<ExprNode, Diagnostic> {
    let span = span_of(&pair, file);
    let p = pair.into_inner().next().expect("primary always wraps one alternative");
    let node = match p.as_rule() {
        Rule::expr => return build_expr(p, file),
        Rule::new_expr => build_new_expr(p, file)?,
        Rule::kw_self => Expr::SelfExpr,
        Rule::kw_true => Expr::True,
        Rule::kw_false => Expr::False,
        Rule::kw_null => Expr::Null,
        Rule::float => Expr::Float(OrderedFloat(
            p.as_str().parse().expect("float rule only matches valid float text"),
        )),
        Rule::integer => {
            let text = p.as_str();
            let value = text
                .parse()
                .map_err(|_| CompileErrorKind::IllegalExpression.to_diagnostic(span_of(&p, file)))?;
            Expr::Integer(value)
        }
        Rule::string => Expr::Str(build_string_literal(p, file)?),
        Rule::ident => Expr::Variable(p.as_str().to_string()),
        other => unreachable!("unexpected primary alternative {other:?}"),
    };
    Ok(Spanned::new(node, span))
}

fn build_string_literal(pair: Pair<Rule>, file: &str) -> Result<String, Diagnostic> {
    let span = span_of(&pair, file);
    let inner = pair.into_inner().next().expect("string always wraps string_inner");
    unescape(inner.as_str(), span)
}

fn unescape(raw: &str, span: Span) -> Result<String, Diagnostic> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some('0') => out.push('\0'),
            Some(other) => {
                return Err(CompileErrorKind::UnrecognizedEscapeSequence(other).to_diagnostic(span));
            }
            None => {
                return Err(CompileErrorKind::UnterminatedStringLiteral.to_diagnostic(span));
            }
        }
    }
    Ok(out)
}

/// `new_expr = { kw_new ~ (ident ~ "=")? ~ ident ~ "(" ~ arg_list? ~ ")" }`.
/// Two bare `ident`s in a row means the first is the destination variable
/// name; one `ident` means the parser should synthesize one.
fn build_new_expr(pair: Pair<Rule>, file: &str) -> Result<Expr, Diagnostic> {
    let mut idents = Vec::new();
    let mut args_pair = None;
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::kw_new => {}
            Rule::ident => idents.push(p),
            Rule::arg_list => args_pair = Some(p),
            other => unreachable!("unexpected new_expr part {other:?}"),
        }
    }

    let (var_ident, class_ident) = match idents.len() {
        2 => (Some(idents[0].as_str().to_string()), &idents[1]),
        1 => (None, &idents[0]),
        other => unreachable!("new_expr always has one or two idents, got {other}"),
    };

    let args = match args_pair {
        Some(p) => build_arg_list(p, file)?,
        None => Vec::new(),
    };
    let class_span = span_of(class_ident, file);
    let constructor = Spanned::new(
        Expr::FunctionCall { name: class_ident.as_str().to_string(), args },
        class_span,
    );

    Ok(Expr::New { var_ident, constructor: Box::new(constructor) })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_module() {
        let ast = parse("module main\n", "test.vela").unwrap();
        assert_eq!(ast.name, "main");
        assert!(ast.children.is_empty());
    }

    #[test]
    fn parses_a_for_loop_with_all_three_clauses() {
        let ast = parse(
            r#"
            module main
            for (var i = 0; i < 10; i = i + 1) {
                print(i);
            }
            "#,
            "test.vela",
        )
        .unwrap();
        match &ast.children[0].node {
            Stmt::For { init, cond, inc, body } => {
                assert!(init.is_some());
                assert!(cond.is_some());
                assert!(matches!(
                    inc.as_deref().map(|s| &s.node),
                    Some(Stmt::ExprStmt { clear: false, .. })
                ));
                assert_eq!(body.len(), 1);
            }
            other => panic!("expected a for loop, got {other:?}"),
        }
    }

    #[test]
    fn parses_an_import_with_an_alias() {
        let ast = parse(
            r#"
            module main
            import "other.vela" as helpers;
            "#,
            "test.vela",
        )
        .unwrap();
        match &ast.children[0].node {
            Stmt::Import { target, local_path } => {
                assert_eq!(target, &ImportTarget::File("other.vela".to_string()));
                assert_eq!(local_path.as_deref(), Some("helpers"));
            }
            other => panic!("expected an import, got {other:?}"),
        }
    }

    #[test]
    fn parses_a_class_with_a_field_and_a_method() {
        let ast = parse(
            r#"
            module main
            class Point {
                var x = 1;
                fn sum() {
                    return self.x;
                }
            }
            "#,
            "test.vela",
        )
        .unwrap();
        match &ast.children[0].node {
            Stmt::ClassDef { name, members } => {
                assert_eq!(name, "Point");
                assert_eq!(members.len(), 2);
            }
            other => panic!("expected a class definition, got {other:?}"),
        }
    }

    #[test]
    fn rejects_an_undeclared_token() {
        let err = parse("module main\n@@@\n", "test.vela").unwrap_err();
        assert_eq!(err.code, Some("ILLEGAL_SYNTAX"));
    }
}
