//! Frontmatter extraction and parsing.

use serde_json::{Map, Value};

/// A source file split into its frontmatter record and the remaining body.
#[derive(Debug, Clone, PartialEq)]
pub struct Frontmatter<'a> {
    /// Frontmatter key/values (empty when the file has no frontmatter block)
    pub data: Map<String, Value>,

    /// Content after the frontmatter block
    pub content: &'a str,
}

/// Split a markdown source into its YAML frontmatter and body.
///
/// The frontmatter block must be the first thing in the file, delimited by
/// `---` lines. The opening fence is exactly `---` at the very start, ending
/// the line, so a leading `-----` rule or indented fence is body content.
/// Any YAML mapping is accepted; values keep their YAML type.
pub fn split_frontmatter(source: &str) -> Result<Frontmatter<'_>, FrontmatterError> {
    let after_open = match source.strip_prefix("---") {
        Some(rest) if rest.is_empty() || rest.starts_with('\n') || rest.starts_with("\r\n") => {
            rest
        }
        _ => {
            return Ok(Frontmatter {
                data: Map::new(),
                content: source,
            });
        }
    };

    // Find the closing ---
    let Some(close_pos) = after_open.find("\n---") else {
        return Err(FrontmatterError::Unclosed);
    };

    let yaml_content = after_open[..close_pos].trim();
    let remaining = &after_open[close_pos + 4..];

    let data = if yaml_content.is_empty() {
        Map::new()
    } else {
        match serde_yaml::from_str::<Value>(yaml_content)
            .map_err(|e| FrontmatterError::InvalidYaml(e.to_string()))?
        {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => return Err(FrontmatterError::NotAMapping(type_name(&other))),
        }
    };

    Ok(Frontmatter {
        data,
        content: remaining.trim_start(),
    })
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

/// Errors that can occur when parsing frontmatter.
#[derive(Debug, thiserror::Error)]
pub enum FrontmatterError {
    #[error("Unclosed frontmatter block - missing closing ---")]
    Unclosed,

    #[error("Invalid YAML in frontmatter: {0}")]
    InvalidYaml(String),

    #[error("Frontmatter must be a mapping, found a {0}")]
    NotAMapping(&'static str),
}
