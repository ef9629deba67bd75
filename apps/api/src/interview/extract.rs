//! Structured-output extraction — best-effort recovery of a JSON value from
//! free-form model text.
//!
//! Models asked for "JSON only" still wrap output in prose, code fences,
//! quotes, or an extra layer of string escaping. `extract_json` tries a
//! fixed sequence of recovery strategies and returns `None` when all fail;
//! `None` is not an error, it tells the caller to use its fallback record.

use serde_json::Value;

/// Attempt order, first success wins:
/// 1. parse the whole text directly;
/// 2. if the parsed value is itself a string, parse that string;
/// 3. strip a single layer of wrapping quotes, unescape, and parse;
/// 4. parse the greedy brace-delimited span (first `{` to last `}`),
///    retrying once with one level of unescaping.
pub fn extract_json(text: &str) -> Option<Value> {
    let text = strip_code_fences(text.trim());
    if text.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return match value {
            // Double-encoded output: a JSON string whose payload is the
            // actual object. If the payload is not JSON either, there is
            // nothing structured here.
            Value::String(inner) => serde_json::from_str(&inner).ok(),
            other => Some(other),
        };
    }

    if let Some(unquoted) = strip_wrapping_quotes(text) {
        if let Ok(value) = serde_json::from_str::<Value>(&unescape(unquoted)) {
            return Some(value);
        }
    }

    let span = brace_span(text)?;
    if let Ok(value) = serde_json::from_str::<Value>(span) {
        return Some(value);
    }
    serde_json::from_str(&unescape(span)).ok()
}

/// Strips one layer of ```json ... ``` or ``` ... ``` code fences.
fn strip_code_fences(text: &str) -> &str {
    let stripped = if let Some(rest) = text.strip_prefix("```json") {
        rest
    } else if let Some(rest) = text.strip_prefix("```") {
        rest
    } else {
        return text;
    };
    stripped
        .trim_start()
        .strip_suffix("```")
        .map(str::trim)
        .unwrap_or_else(|| stripped.trim_start())
}

/// Returns the inner text when the whole span is wrapped in one layer of
/// matching quote characters.
fn strip_wrapping_quotes(text: &str) -> Option<&str> {
    for quote in ['"', '\''] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            return Some(&text[1..text.len() - 1]);
        }
    }
    None
}

/// The greedy `{...}` span: from the first `{` to the last `}`.
fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Removes one level of backslash escaping for the escapes models actually
/// emit. Unknown escapes are preserved verbatim.
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
