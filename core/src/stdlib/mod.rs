//! The native functions a running program can see without any `native fn`
//! forward declaration of its own: `print`, plus a handful of numeric and
//! string helpers. Grounded in the teacher's math package layout, but
//! registered by name into a [`NativeRegistry`] rather than built up as a
//! record value, matching the dynamically-typed, name-resolved binding
//! surface `CallNativeFunction` actually dispatches through.

pub mod math;
pub mod string;

use crate::native::NativeRegistry;

/// Binds every stdlib function into `registry`. Called once by a host
/// before [`crate::api::run`].
pub fn install(registry: &mut NativeRegistry) {
    registry.bind_function("print", 1, |args| {
        println!("{}", args[0].str_value());
        Ok(crate::values::Value::null())
    });

    math::install(registry);
    string::install(registry);
}
