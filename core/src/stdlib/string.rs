//! String helpers, bound under their bare names like [`super::math`]. `Len`
//! counts codepoints rather than bytes; `upper`/`lower` are ASCII-only,
//! matching the teacher's own string package.

use crate::errors::RuntimeError;
use crate::native::NativeRegistry;
use crate::values::Value;

fn arg_str(function: &'static str, args: &[Value], index: usize) -> Result<std::rc::Rc<str>, RuntimeError> {
    args.get(index)
        .and_then(Value::as_str)
        .ok_or(RuntimeError::NativeArgumentType {
            function,
            expected: "a string",
        })
}

pub fn install(registry: &mut NativeRegistry) {
    // === Inspection ===
    registry.bind_function("len", 1, |args| {
        let s = arg_str("len", args, 0)?;
        Ok(Value::int(s.chars().count() as i64))
    });
    registry.bind_function("contains", 2, |args| {
        let haystack = arg_str("contains", args, 0)?;
        let needle = arg_str("contains", args, 1)?;
        Ok(Value::bool(haystack.contains(needle.as_ref())))
    });

    // === Transformation (ASCII-only, kept minimal like the teacher's) ===
    registry.bind_function("upper", 1, |args| {
        Ok(Value::str(arg_str("upper", args, 0)?.to_ascii_uppercase()))
    });
    registry.bind_function("lower", 1, |args| {
        Ok(Value::str(arg_str("lower", args, 0)?.to_ascii_lowercase()))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn len_counts_codepoints_not_bytes() {
        let mut registry = NativeRegistry::new();
        install(&mut registry);
        let f = registry.function("len").unwrap();
        let result = (f.handler)(&[Value::str("héllo")]).unwrap();
        assert_eq!(result.as_int(), Some(5));
    }

    #[test]
    fn contains_rejects_non_string_argument() {
        let mut registry = NativeRegistry::new();
        install(&mut registry);
        let f = registry.function("contains").unwrap();
        assert!((f.handler)(&[Value::int(1), Value::str("a")]).is_err());
    }
}
