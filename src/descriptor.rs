//! Resolution of raw type descriptors (`I`, `Ljava/lang/Object;`, `[[Z`)
//! into Java-style display names (`int`, `java.lang.Object`, `boolean[][]`).

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::error::{DexError, Result};

static PRIMITIVES: Lazy<HashMap<char, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ('V', "void"),
        ('Z', "boolean"),
        ('B', "byte"),
        ('S', "short"),
        ('C', "char"),
        ('I', "int"),
        ('J', "long"),
        ('F', "float"),
        ('D', "double"),
    ])
});

/// Converts a descriptor into its display name.
///
/// A leading `[` strips one array dimension and recurses, appending `[]`;
/// `L...;` becomes the Java binary name with `/` replaced by `.`; a single
/// primitive code maps through the fixed table. Anything else is
/// [`DexError::UnknownPrimitive`] - a hard error, since it means either a
/// corrupt descriptor or a format version this engine does not know.
pub fn resolve_descriptor(descriptor: &str) -> Result<String> {
    if let Some(inner) = descriptor.strip_prefix('[') {
        let mut name = resolve_descriptor(inner)?;
        name.push_str("[]");
        return Ok(name);
    }
    if let Some(body) = descriptor.strip_prefix('L') {
        let body = body.strip_suffix(';').unwrap_or(body);
        return Ok(body.replace('/', "."));
    }
    let mut chars = descriptor.chars();
    match (chars.next(), chars.next()) {
        (Some(code), None) => PRIMITIVES
            .get(&code)
            .map(|name| (*name).to_string())
            .ok_or_else(|| DexError::UnknownPrimitive(descriptor.to_string())),
        _ => Err(DexError::UnknownPrimitive(descriptor.to_string())),
    }
}
