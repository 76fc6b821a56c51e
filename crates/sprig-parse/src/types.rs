/// Normalise a written type to its erased form: whitespace, generic arguments,
/// array and varargs suffixes are dropped, qualification is kept.
///
/// `java.util.List<com.x.Foo>[]` becomes `java.util.List`.
pub fn erase_type(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut depth = 0u32;
    for ch in raw.chars() {
        match ch {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            _ if depth > 0 || ch.is_whitespace() => {}
            _ => out.push(ch),
        }
    }

    let mut erased = out.as_str();
    loop {
        let trimmed = erased
            .trim_end_matches("[]")
            .trim_end_matches("...");
        if trimmed.len() == erased.len() {
            break;
        }
        erased = trimmed;
    }
    erased.trim_matches('.').to_string()
}

/// The trailing component of an erased type name.
pub fn simple_type_name(ty: &str) -> &str {
    ty.rsplit('.').next().unwrap_or(ty)
}
