//! Numeric helpers bound under their bare names (`abs`, `sqrt`, ...) rather
//! than namespaced under a `Math` record, since `CallNativeFunction`
//! dispatches by plain name with no module-qualified lookup of its own.
//!
//! Every function here coerces both `int` and `float` arguments through
//! [`Value::as_float`] and always returns a `float`, mirroring the
//! teacher's own math package.

use crate::errors::RuntimeError;
use crate::native::NativeRegistry;
use crate::values::Value;

fn arg(function: &'static str, args: &[Value], index: usize) -> Result<f64, RuntimeError> {
    args.get(index)
        .and_then(Value::as_float)
        .ok_or(RuntimeError::NativeArgumentType {
            function,
            expected: "a number",
        })
}

pub fn install(registry: &mut NativeRegistry) {
    // === Basic operations ===
    registry.bind_function("abs", 1, |args| {
        Ok(Value::float(arg("abs", args, 0)?.abs()))
    });
    registry.bind_function("min", 2, |args| {
        Ok(Value::float(arg("min", args, 0)?.min(arg("min", args, 1)?)))
    });
    registry.bind_function("max", 2, |args| {
        Ok(Value::float(arg("max", args, 0)?.max(arg("max", args, 1)?)))
    });

    // === Rounding ===
    registry.bind_function("floor", 1, |args| {
        Ok(Value::float(arg("floor", args, 0)?.floor()))
    });
    registry.bind_function("ceil", 1, |args| {
        Ok(Value::float(arg("ceil", args, 0)?.ceil()))
    });
    registry.bind_function("round", 1, |args| {
        Ok(Value::float(arg("round", args, 0)?.round()))
    });

    // === Exponentiation ===
    registry.bind_function("sqrt", 1, |args| {
        Ok(Value::float(arg("sqrt", args, 0)?.sqrt()))
    });
    registry.bind_function("pow", 2, |args| {
        Ok(Value::float(arg("pow", args, 0)?.powf(arg("pow", args, 1)?)))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abs_coerces_int_to_float() {
        let mut registry = NativeRegistry::new();
        install(&mut registry);
        let f = registry.function("abs").unwrap();
        let result = (f.handler)(&[Value::int(-4)]).unwrap();
        assert_eq!(result.as_float(), Some(4.0));
    }

    #[test]
    fn pow_rejects_non_numeric_argument() {
        let mut registry = NativeRegistry::new();
        install(&mut registry);
        let f = registry.function("pow").unwrap();
        assert!((f.handler)(&[Value::str("x"), Value::int(2)]).is_err());
    }
}
