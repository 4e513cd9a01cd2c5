//! Built-in scalar type names
//!
//! Go's predeclared types as accepted in `.api` struct fields. A name from
//! this list never becomes a type reference and never needs resolving.

/// Every predeclared scalar type name.
pub const BUILTIN_TYPES: &[&str] = &[
    "bool",
    "int",
    "int8",
    "int16",
    "int32",
    "int64",
    "uint",
    "uint8",
    "uint16",
    "uint32",
    "uint64",
    "uintptr",
    "float32",
    "float64",
    "complex64",
    "complex128",
    "string",
    "byte",
    "rune",
    "any",
];

/// Returns `true` if `name` is a predeclared scalar type.
pub fn is_builtin(name: &str) -> bool {
    BUILTIN_TYPES.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_builtin() {
        assert!(is_builtin("string"));
        assert!(is_builtin("int64"));
        assert!(!is_builtin("String"));
        assert!(!is_builtin("User"));
        assert!(!is_builtin("time.Time"));
    }
}
