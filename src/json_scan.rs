//! Helpers for digging structured payloads out of free-text model output.
//! Models are asked for bare JSON but routinely wrap it in prose or markdown
//! fences, so extraction scans for the first balanced object or array
//! instead of parsing the whole body.

/// Strips a single surrounding ```json / ``` fence pair, if present.
pub fn strip_code_fences(text: &str) -> &str {
    let mut stripped = text.trim();
    if let Some(rest) = stripped.strip_prefix("```json") {
        stripped = rest;
    } else if let Some(rest) = stripped.strip_prefix("```") {
        stripped = rest;
    }
    if let Some(rest) = stripped.strip_suffix("```") {
        stripped = rest;
    }
    stripped.trim()
}

/// Returns the first balanced `{...}` in `text`, including nested braces and
/// braces inside string literals.
pub fn extract_json_object(text: &str) -> Option<&str> {
    extract_balanced(text, b'{', b'}')
}

/// Returns the first balanced `[...]` in `text`.
pub fn extract_json_array(text: &str) -> Option<&str> {
    extract_balanced(text, b'[', b']')
}

fn extract_balanced(text: &str, open: u8, close: u8) -> Option<&str> {
    let start = text.bytes().position(|b| b == open)?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        if byte == b'"' {
            in_string = true;
        } else if byte == open {
            depth += 1;
        } else if byte == close {
            depth -= 1;
            if depth == 0 {
                return Some(&text[start..start + offset + 1]);
            }
        }
    }
    None
}
