//! The dynamically-typed runtime value.
//!
//! Every value is a tagged, reference-counted cell. Copy-assignment
//! (`copy_assign`) mutates the payload in place: scalar payloads are
//! deep-copied by value, `Object`/`Native` payloads only `Rc`-clone their
//! inner handle, so two names that were copy-assigned from each other still
//! observe the same mutable object underneath. Reference-assignment (used
//! for `StackPopObject` and friends) is just `Value::clone`, which clones
//! the outer `Rc<RefCell<Inner>>` itself, making the two names fully
//! identical.

pub mod object;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::errors::RuntimeError;
use object::ScriptObject;

/// A native object bound in from the host. Opaque to the VM beyond its
/// type name; everything else goes through the binding table in
/// [`crate::native`].
pub trait NativeHandle: fmt::Debug {
    fn type_name(&self) -> &str;
}

#[derive(Debug)]
pub enum Payload {
    Null,
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Object(Rc<RefCell<ScriptObject>>),
    Function(u64),
    Native(Rc<RefCell<dyn NativeHandle>>),
}

impl Clone for Payload {
    fn clone(&self) -> Self {
        match self {
            Self::Null => Self::Null,
            Self::Int(v) => Self::Int(*v),
            Self::Float(v) => Self::Float(*v),
            Self::Str(v) => Self::Str(v.clone()),
            Self::Object(v) => Self::Object(v.clone()),
            Self::Function(v) => Self::Function(*v),
            Self::Native(v) => Self::Native(v.clone()),
        }
    }
}

#[derive(Debug)]
struct Inner {
    payload: Payload,
    is_const: bool,
}

/// A handle to a runtime value. Cheap to clone; cloning shares the same
/// underlying cell (see the module docs for why that's exactly the
/// reference-assignment semantics the lowering pass needs).
#[derive(Debug, Clone)]
pub struct Value(Rc<RefCell<Inner>>);

impl Value {
    fn new(payload: Payload) -> Self {
        Self(Rc::new(RefCell::new(Inner {
            payload,
            is_const: false,
        })))
    }

    pub fn null() -> Self {
        Self::new(Payload::Null)
    }

    pub fn int(v: i64) -> Self {
        Self::new(Payload::Int(v))
    }

    pub fn float(v: f64) -> Self {
        Self::new(Payload::Float(v))
    }

    pub fn str(v: impl Into<Rc<str>>) -> Self {
        Self::new(Payload::Str(v.into()))
    }

    pub fn bool(v: bool) -> Self {
        Self::int(if v { 1 } else { 0 })
    }

    pub fn object(obj: Rc<RefCell<ScriptObject>>) -> Self {
        Self::new(Payload::Object(obj))
    }

    pub fn function(handle: u64) -> Self {
        Self::new(Payload::Function(handle))
    }

    pub fn native(handle: Rc<RefCell<dyn NativeHandle>>) -> Self {
        Self::new(Payload::Native(handle))
    }

    pub fn is_const(&self) -> bool {
        self.0.borrow().is_const
    }

    pub fn set_const(&self, is_const: bool) {
        self.0.borrow_mut().is_const = is_const;
    }

    pub fn is_null(&self) -> bool {
        matches!(self.0.borrow().payload, Payload::Null)
    }

    pub fn is_native(&self) -> bool {
        matches!(self.0.borrow().payload, Payload::Native(_))
    }

    fn payload(&self) -> Payload {
        self.0.borrow().payload.clone()
    }

    /// Copies `other`'s payload into `self` in place (the `=` operator).
    /// Fails if `self` is currently marked `const`.
    pub fn copy_assign(&self, other: &Value) -> Result<(), RuntimeError> {
        let mut inner = self.0.borrow_mut();
        if inner.is_const {
            return Err(RuntimeError::ConstValueChangedException);
        }
        inner.payload = other.payload();
        inner.is_const = false;
        Ok(())
    }

    pub fn type_str(&self) -> &'static str {
        match &self.0.borrow().payload {
            Payload::Null => "null",
            Payload::Int(_) => "int",
            Payload::Float(_) => "float",
            Payload::Str(_) => "string",
            Payload::Object(_) => "object",
            Payload::Function(_) => "function",
            Payload::Native(_) => "native",
        }
    }

    pub fn str_value(&self) -> String {
        match &self.0.borrow().payload {
            Payload::Null => "null".to_string(),
            Payload::Int(v) => v.to_string(),
            Payload::Float(v) => format_float(*v),
            Payload::Str(v) => v.to_string(),
            Payload::Object(o) => o.borrow().class_name.clone(),
            Payload::Function(h) => format!("<function {h:#x}>"),
            Payload::Native(n) => format!("<native {}>", n.borrow().type_name()),
        }
    }

    pub fn is_truthy(&self) -> bool {
        match &self.0.borrow().payload {
            Payload::Null => false,
            Payload::Int(v) => *v != 0,
            Payload::Float(v) => *v != 0.0,
            Payload::Str(v) => !v.is_empty(),
            Payload::Object(_) | Payload::Function(_) | Payload::Native(_) => true,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match &self.0.borrow().payload {
            Payload::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Either payload coerced to `f64`; `None` for anything non-numeric.
    pub fn as_float(&self) -> Option<f64> {
        match &self.0.borrow().payload {
            Payload::Int(v) => Some(*v as f64),
            Payload::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<Rc<str>> {
        match &self.0.borrow().payload {
            Payload::Str(v) => Some(v.clone()),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<Rc<RefCell<ScriptObject>>> {
        match &self.0.borrow().payload {
            Payload::Object(o) => Some(o.clone()),
            _ => None,
        }
    }

    pub fn as_function_handle(&self) -> Option<u64> {
        match &self.0.borrow().payload {
            Payload::Function(h) => Some(*h),
            _ => None,
        }
    }
}

fn format_float(v: f64) -> String {
    if v.fract() == 0.0 && v.is_finite() {
        format!("{v:.1}")
    } else {
        v.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Numeric {
    Int,
    Float,
}

fn numeric_kind(a: &Payload, b: &Payload) -> Option<Numeric> {
    match (a, b) {
        (Payload::Int(_), Payload::Int(_)) => Some(Numeric::Int),
        (Payload::Int(_) | Payload::Float(_), Payload::Int(_) | Payload::Float(_)) => {
            Some(Numeric::Float)
        }
        _ => None,
    }
}

fn as_f64(p: &Payload) -> f64 {
    match p {
        Payload::Int(v) => *v as f64,
        Payload::Float(v) => *v,
        _ => unreachable!("as_f64 called on a non-numeric payload"),
    }
}

fn type_exc(left: &Value, right: &Value) -> RuntimeError {
    RuntimeError::BinaryOperatorException {
        left_type: left.type_str().to_string(),
        right_type: right.type_str().to_string(),
    }
}

macro_rules! arith_int_preserving {
    ($name:ident, $op:tt) => {
        pub fn $name(left: &Value, right: &Value) -> Result<Value, RuntimeError> {
            let (lp, rp) = (left.payload(), right.payload());
            match numeric_kind(&lp, &rp) {
                Some(Numeric::Int) => {
                    let (a, b) = (as_f64(&lp) as i64, as_f64(&rp) as i64);
                    Ok(Value::int(a $op b))
                }
                Some(Numeric::Float) => Ok(Value::float(as_f64(&lp) $op as_f64(&rp))),
                None => Err(type_exc(left, right)),
            }
        }
    };
}

/// `+`. Strings take priority: if the left operand is a string, the right
/// operand is coerced through `str_value()` and concatenated.
pub fn add(left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    if matches!(left.0.borrow().payload, Payload::Str(_)) {
        let mut s = left.str_value();
        s.push_str(&right.str_value());
        return Ok(Value::str(s));
    }
    let (lp, rp) = (left.payload(), right.payload());
    match numeric_kind(&lp, &rp) {
        Some(Numeric::Int) => {
            let (a, b) = (as_f64(&lp) as i64, as_f64(&rp) as i64);
            Ok(Value::int(a + b))
        }
        Some(Numeric::Float) => Ok(Value::float(as_f64(&lp) + as_f64(&rp))),
        None => Err(type_exc(left, right)),
    }
}

arith_int_preserving!(sub, -);
arith_int_preserving!(mul, *);

/// `/`. Integer/integer division truncates toward zero (`7 / 2 == 3`);
/// either operand being a float promotes to `f64` division.
pub fn div(left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    let (lp, rp) = (left.payload(), right.payload());
    match numeric_kind(&lp, &rp) {
        Some(Numeric::Int) => {
            let (a, b) = (as_f64(&lp) as i64, as_f64(&rp) as i64);
            if b == 0 {
                return Err(type_exc(left, right));
            }
            Ok(Value::int(a / b))
        }
        Some(Numeric::Float) => Ok(Value::float(as_f64(&lp) / as_f64(&rp))),
        None => Err(type_exc(left, right)),
    }
}

/// `%`. Integer operands take the integer remainder; any float operand
/// promotes to `f64::rem`.
pub fn modulo(left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    let (lp, rp) = (left.payload(), right.payload());
    match numeric_kind(&lp, &rp) {
        Some(Numeric::Int) => {
            let (a, b) = (as_f64(&lp) as i64, as_f64(&rp) as i64);
            if b == 0 {
                return Err(type_exc(left, right));
            }
            Ok(Value::int(a % b))
        }
        Some(Numeric::Float) => Ok(Value::float(as_f64(&lp) % as_f64(&rp))),
        None => Err(type_exc(left, right)),
    }
}

/// `**`. Integer operands with a non-negative exponent stay integer
/// (overflow falls back to float); any float operand, or a negative
/// integer exponent, promotes to `f64::powf`.
pub fn pow(left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    let (lp, rp) = (left.payload(), right.payload());
    match numeric_kind(&lp, &rp) {
        Some(Numeric::Int) => {
            let (a, b) = (as_f64(&lp) as i64, as_f64(&rp) as i64);
            if let Ok(exp) = u32::try_from(b) {
                if let Some(v) = a.checked_pow(exp) {
                    return Ok(Value::int(v));
                }
            }
            Ok(Value::float((a as f64).powf(b as f64)))
        }
        Some(Numeric::Float) => Ok(Value::float(as_f64(&lp).powf(as_f64(&rp)))),
        None => Err(type_exc(left, right)),
    }
}

fn as_int_strict(left: &Value, right: &Value) -> Result<(i64, i64), RuntimeError> {
    match (left.as_int(), right.as_int()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(type_exc(left, right)),
    }
}

pub fn bitxor(left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    let (a, b) = as_int_strict(left, right)?;
    Ok(Value::int(a ^ b))
}

pub fn bitand(left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    let (a, b) = as_int_strict(left, right)?;
    Ok(Value::int(a & b))
}

pub fn bitor(left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    let (a, b) = as_int_strict(left, right)?;
    Ok(Value::int(a | b))
}

pub fn logand(left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    Ok(Value::bool(left.is_truthy() && right.is_truthy()))
}

pub fn logor(left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    Ok(Value::bool(left.is_truthy() || right.is_truthy()))
}

fn cmp(left: &Value, right: &Value) -> Result<std::cmp::Ordering, RuntimeError> {
    let (lp, rp) = (left.payload(), right.payload());
    match numeric_kind(&lp, &rp) {
        Some(_) => Ok(as_f64(&lp)
            .partial_cmp(&as_f64(&rp))
            .unwrap_or(std::cmp::Ordering::Equal)),
        None => match (&lp, &rp) {
            (Payload::Str(a), Payload::Str(b)) => Ok(a.as_ref().cmp(b.as_ref())),
            _ => Err(type_exc(left, right)),
        },
    }
}

pub fn eql(left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    let (lp, rp) = (left.payload(), right.payload());
    let result = match (&lp, &rp) {
        (Payload::Null, Payload::Null) => true,
        (Payload::Str(a), Payload::Str(b)) => a == b,
        _ if numeric_kind(&lp, &rp).is_some() => as_f64(&lp) == as_f64(&rp),
        _ => false,
    };
    Ok(Value::bool(result))
}

pub fn not_eql(left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    let equal = eql(left, right)?;
    Ok(Value::bool(!equal.is_truthy()))
}

pub fn less(left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    Ok(Value::bool(cmp(left, right)? == std::cmp::Ordering::Less))
}

pub fn greater(left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    Ok(Value::bool(
        cmp(left, right)? == std::cmp::Ordering::Greater,
    ))
}

pub fn less_eql(left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    Ok(Value::bool(cmp(left, right)? != std::cmp::Ordering::Greater))
}

pub fn greater_eql(left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    Ok(Value::bool(cmp(left, right)? != std::cmp::Ordering::Less))
}

/// Unary `!`. `lognot` on `null` yields `1` (null is falsy, so its
/// negation is true), matching the truthiness table above.
pub fn lognot(operand: &Value) -> Result<Value, RuntimeError> {
    Ok(Value::bool(!operand.is_truthy()))
}

pub fn u_minus(operand: &Value) -> Result<Value, RuntimeError> {
    match operand.payload() {
        Payload::Int(v) => Ok(Value::int(-v)),
        Payload::Float(v) => Ok(Value::float(-v)),
        _ => Err(RuntimeError::UnaryOperatorException {
            operand_type: operand.type_str().to_string(),
        }),
    }
}

pub fn u_pos(operand: &Value) -> Result<Value, RuntimeError> {
    match operand.payload() {
        Payload::Int(_) | Payload::Float(_) => Ok(Value::new(operand.payload())),
        _ => Err(RuntimeError::UnaryOperatorException {
            operand_type: operand.type_str().to_string(),
        }),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.str_value())
    }
}
