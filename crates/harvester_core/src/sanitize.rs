/// Reduce arbitrary text to a filesystem-safe token.
///
/// Keeps ASCII word characters (`[A-Za-z0-9_]`), turns every run of
/// whitespace and hyphens into one underscore, drops everything else and
/// trims underscores from both ends. Non-ASCII letters are dropped, so
/// `"Café, Arles (1888)"` becomes `"Caf_Arles_1888"`.
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_separator_run = false;
    for c in text.chars() {
        if c.is_whitespace() || c == '-' {
            if !in_separator_run {
                out.push('_');
                in_separator_run = true;
            }
        } else if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c);
            in_separator_run = false;
        }
        // Anything else is stripped without breaking a separator run.
    }
    out.trim_matches('_').to_string()
}

/// Deterministic dedup key for an item; doubles as the asset filename.
///
/// `extension` is appended verbatim and should carry its leading dot.
pub fn record_key(owner: &str, title: &str, extension: &str) -> String {
    format!("{}_{}{}", sanitize(owner), sanitize(title), extension)
}
