//! Source diagnostics: byte-to-line mapping and human-readable rendering.

use crate::error::Error;

/// Converts a byte offset within `source` to a 1-based `(line, col)` pair.
pub fn byte_to_line_col(source: &str, byte: u32) -> (u32, u32) {
    let byte = byte as usize;
    let mut line = 1u32;
    let mut col = 1u32;
    for (i, ch) in source.char_indices() {
        if i >= byte {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}

/// Renders an error with its source location and the offending text:
///
/// ```text
/// app.ujs:3: >>>r <- f(cb)<<<
/// error: cannot bind in global scope; wrap the statement in a function
/// ```
///
/// Errors without a known span render as the message line alone.
pub fn render_error(filename: &str, source: &str, err: &Error) -> String {
    let mut out = String::new();
    if let Some(span) = err.span() {
        let (line, _) = byte_to_line_col(source, span.start.0);
        let fragment = source
            .get(span.start.0 as usize..span.end.0 as usize)
            .filter(|f| !f.is_empty())
            .unwrap_or("<unknown fragment>");
        out.push_str(&format!("{}:{}: >>>{}<<<\n", filename, line, fragment));
    }
    out.push_str(&format!("error: {}", err));
    out
}
