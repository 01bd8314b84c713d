//! Docblock extraction for script pages.
//!
//! A docblock is the first block comment of a file. Lines of the form
//! `@key value` are pragmas, possibly continued on the following lines;
//! everything else is comment body and is dropped.

use serde_json::{Map, Value};

/// Return the leading block comment of `source`, delimiters included.
///
/// Only whitespace may precede the comment. Returns `None` when the file does
/// not start with a block comment, or the comment is never closed.
pub fn extract(source: &str) -> Option<&str> {
    let trimmed = source.trim_start();
    if !trimmed.starts_with("/*") {
        return None;
    }

    let close = trimmed[2..].find("*/")?;
    Some(&trimmed[..close + 4])
}

/// Parse the pragmas of a docblock into a key/value record.
///
/// Values are strings. A pragma without a value maps to `""`, and a pragma
/// that appears more than once maps to an array of its values in order.
///
/// A line directly below a pragma continues its value when it has no `@` and
/// no `//` in it; the lines are joined with a space. A blank line ends the
/// pragma. A trailing `// comment` is cut from every value.
pub fn parse(docblock: &str) -> Map<String, Value> {
    let inner = docblock.trim();
    let inner = inner
        .strip_prefix("/**")
        .or_else(|| inner.strip_prefix("/*"))
        .unwrap_or(inner);
    let inner = inner.strip_suffix("*/").unwrap_or(inner);

    let mut found: Vec<(&str, String)> = Vec::new();
    let mut open = false;

    for line in inner.lines() {
        let line = line.trim_start();
        let line = line.strip_prefix('*').unwrap_or(line).trim();

        if let Some(pragma) = line.strip_prefix('@') {
            let (key, value) = match pragma.find(char::is_whitespace) {
                Some(idx) => (&pragma[..idx], pragma[idx..].trim()),
                None => (pragma, ""),
            };
            open = !key.is_empty();
            if open {
                found.push((key, value.to_string()));
            }
            continue;
        }

        match found.last_mut() {
            Some((_, value)) if open && is_continuation(line) => {
                if !value.is_empty() {
                    value.push(' ');
                }
                value.push_str(line);
            }
            _ => open = false,
        }
    }

    let mut pragmas = Map::new();

    for (key, value) in found {
        let value = Value::String(strip_line_comment(&value).to_string());
        match pragmas.get_mut(key) {
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                pragmas.insert(key.to_string(), value);
            }
        }
    }

    pragmas
}

fn is_continuation(line: &str) -> bool {
    line.chars().nth(1).is_some() && !line.contains('@') && !line.contains("//")
}

/// Cut a `//` comment that starts the value or follows whitespace.
fn strip_line_comment(value: &str) -> &str {
    let mut search = 0;
    while let Some(pos) = value[search..].find("//").map(|p| p + search) {
        let starts_comment = value[..pos]
            .chars()
            .next_back()
            .map_or(true, char::is_whitespace);
        if starts_comment {
            return value[..pos].trim_end();
        }
        search = pos + 2;
    }
    value
}
