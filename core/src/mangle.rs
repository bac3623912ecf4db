//! Identifier mangling: flattens the scoped, qualified lowering-time name
//! space (module, optional class, arity) into the single flat string
//! namespace the VM operates on.
//!
//! ```text
//! $_M<module>[_C<class-identifier>]_I<original>[_A<arity>]
//! ```

use std::fmt;

/// The decoded parts of a mangled name, produced by [`unmangle`]. Used only
/// to render diagnostic text; never round-tripped back through [`mangle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unmangled {
    pub module: String,
    pub class: Option<String>,
    pub original: String,
    pub arity: Option<usize>,
}

impl fmt::Display for Unmangled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.class {
            Some(class) => write!(f, "{}::{}.{}", self.module, class, self.original),
            None => write!(f, "{}::{}", self.module, self.original),
        }?;
        if let Some(arity) = self.arity {
            write!(f, "/{arity}")?;
        }
        Ok(())
    }
}

/// Functions always carry an arity suffix; plain variables pass `arity =
/// None`. `class` is `None` exactly when the compile-time `self` pair is
/// the global pseudo-class.
pub fn mangle(module: &str, class: Option<&str>, original: &str, arity: Option<usize>) -> String {
    let mut out = String::with_capacity(module.len() + original.len() + 16);
    out.push_str("$_M");
    out.push_str(module);
    if let Some(class) = class {
        out.push_str("_C");
        out.push_str(class);
    }
    out.push_str("_I");
    out.push_str(original);
    if let Some(arity) = arity {
        out.push_str("_A");
        out.push_str(&arity.to_string());
    }
    out
}

/// Appends `_I<original>[_A<arity>]` to an already-built module[-class] tag
/// (e.g. the `class_tag_name` a `CreateClassInstance`/`New` lowering
/// already carries). Lets method dispatch reconstruct a mangled function
/// name from a `ScriptObject`'s class tag without re-splitting it.
pub fn mangle_suffix(class_tag: &str, original: &str, arity: Option<usize>) -> String {
    let mut out = String::with_capacity(class_tag.len() + original.len() + 8);
    out.push_str(class_tag);
    out.push_str("_I");
    out.push_str(original);
    if let Some(arity) = arity {
        out.push_str("_A");
        out.push_str(&arity.to_string());
    }
    out
}

/// Best-effort inverse of [`mangle`], for diagnostic text only. Scans for
/// the rightmost `_A<digits>` suffix (unambiguous because it must be
/// all-digits to end of string), then the rightmost remaining `_I` marker
/// for the original name, then an optional `_C` marker before it for the
/// class. An identifier that itself contains one of these two-character
/// marker sequences can defeat this; that's acceptable since mangled names
/// are never parsed back into program state.
pub fn unmangle(mangled: &str) -> Option<Unmangled> {
    let rest = mangled.strip_prefix("$_M")?;

    let (rest, arity) = match rest.rfind("_A") {
        Some(idx) if rest[idx + 2..].chars().all(|c| c.is_ascii_digit()) && idx + 2 < rest.len() => {
            (&rest[..idx], rest[idx + 2..].parse::<usize>().ok())
        }
        _ => (rest, None),
    };

    let i_idx = rest.rfind("_I")?;
    let before_i = &rest[..i_idx];
    let original = rest[i_idx + 2..].to_string();

    let (module, class) = match before_i.find("_C") {
        Some(c_idx) => (
            before_i[..c_idx].to_string(),
            Some(before_i[c_idx + 2..].to_string()),
        ),
        None => (before_i.to_string(), None),
    };

    Some(Unmangled {
        module,
        class,
        original,
        arity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mangles_a_global_variable() {
        assert_eq!(mangle("main", None, "x", None), "$_Mmain_Ix");
    }

    #[test]
    fn mangles_a_global_function_with_arity() {
        assert_eq!(mangle("main", None, "add", Some(2)), "$_Mmain_Iadd_A2");
    }

    #[test]
    fn mangles_a_class_member() {
        assert_eq!(
            mangle("main", Some("Point"), "x", None),
            "$_Mmain_CPoint_Ix"
        );
    }

    #[test]
    fn mangles_a_class_method_with_arity() {
        assert_eq!(
            mangle("geometry", Some("Point"), "dist", Some(1)),
            "$_Mgeometry_CPoint_Idist_A1"
        );
    }

    #[test]
    fn unmangle_round_trips_readable_parts() {
        let mangled = mangle("main", Some("Point"), "x", Some(0));
        let parts = unmangle(&mangled).unwrap();
        assert_eq!(parts.module, "main");
        assert_eq!(parts.class.as_deref(), Some("Point"));
        assert_eq!(parts.original, "x");
        assert_eq!(parts.arity, Some(0));
    }

    #[test]
    fn unmangle_without_class_or_arity() {
        let mangled = mangle("main", None, "y", None);
        let parts = unmangle(&mangled).unwrap();
        assert_eq!(parts.module, "main");
        assert_eq!(parts.class, None);
        assert_eq!(parts.original, "y");
        assert_eq!(parts.arity, None);
    }

    #[test]
    fn unmangle_rejects_non_mangled_input() {
        assert!(unmangle("not_mangled").is_none());
    }

    #[test]
    fn display_renders_human_readable_form() {
        let parts = unmangle(&mangle("geometry", Some("Point"), "dist", Some(1))).unwrap();
        assert_eq!(parts.to_string(), "geometry::Point.dist/1");
    }
}
