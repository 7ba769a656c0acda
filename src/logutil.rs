//! Log sanitising for text that players type.
//! Command lines and speech go into log records verbatim otherwise, so a
//! stray newline or escape sequence could forge or split a log line.

/// Longest preview of player text kept in a single log record.
pub const MAX_LOG_PREVIEW: usize = 160;

/// Render a player-supplied string as one log-safe line.
///
/// Control characters use Rust's debug escapes (`\n`, `\u{1b}`), and a
/// backslash is doubled so a typed `\n` stays distinguishable. Quotes and
/// other printable text pass through. Anything past [`MAX_LOG_PREVIEW`]
/// characters is replaced by a count of what was cut.
pub fn escape_log(s: &str) -> String {
    let mut out = String::with_capacity(s.len().min(MAX_LOG_PREVIEW) + 16);
    let mut chars = s.chars();
    for ch in chars.by_ref().take(MAX_LOG_PREVIEW) {
        match ch {
            '\\' => out.push_str("\\\\"),
            c if c.is_control() => out.extend(c.escape_debug()),
            c => out.push(c),
        }
    }
    let cut = chars.count();
    if cut > 0 {
        out.push_str(&format!("… (+{} chars)", cut));
    }
    out
}
