//! Logging helpers for untrusted payloads and state values.
//! Content authors control every string that reaches these logs, so values are
//! escaped onto a single line and truncated before they are written.

use serde_json::Value;

const MAX_PREVIEW: usize = 300;

/// Flatten a content-supplied string onto one log line.
///
/// Line breaks, tabs and backslashes get their usual escapes and any other
/// control character is written as `\xNN`. Only the first `MAX_PREVIEW`
/// characters are kept; a trailing `…` marks the cut.
pub fn escape_log(s: &str) -> String {
    let mut out = String::with_capacity(s.len().min(MAX_PREVIEW) + 8);
    let mut chars = s.chars();
    for ch in chars.by_ref().take(MAX_PREVIEW) {
        push_escaped(&mut out, ch);
    }
    if chars.next().is_some() {
        out.push('…');
    }
    out
}

fn push_escaped(out: &mut String, ch: char) {
    match ch {
        '\\' => out.push_str(r"\\"),
        '\n' => out.push_str(r"\n"),
        '\r' => out.push_str(r"\r"),
        '\t' => out.push_str(r"\t"),
        c if c.is_control() => out.push_str(&format!("\\x{:02X}", u32::from(c))),
        c => out.push(c),
    }
}

/// Render a raw inbound message for diagnostics.
pub fn preview_payload(payload: &Value) -> String {
    escape_log(&payload.to_string())
}

/// Render a state slot; deleted or missing entries show as `<absent>`.
pub fn preview_value(value: Option<&Value>) -> String {
    match value {
        Some(v) => escape_log(&v.to_string()),
        None => "<absent>".to_string(),
    }
}
