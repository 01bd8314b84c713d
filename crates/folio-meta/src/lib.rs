//! Static page metadata extraction.
//!
//! Pages carry metadata next to their content: markdown pages in a YAML
//! frontmatter block, script pages in a leading docblock. This crate turns
//! either into a flat key/value record tagged with its `sourceType`.

pub mod docblock;
pub mod frontmatter;

use std::path::Path;

use serde_json::{Map, Value};

pub use frontmatter::{split_frontmatter, Frontmatter, FrontmatterError};

/// Metadata record extracted from a page source file.
pub type StaticData = Map<String, Value>;

/// Key under which the source kind tag is stored in every record.
pub const SOURCE_TYPE_KEY: &str = "sourceType";

/// Kind of page source, selected by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Markdown and MDX
    Markdown,
    /// JavaScript, TypeScript and their JSX variants
    Script,
}

impl SourceKind {
    /// Map a file extension (without the dot) to a source kind.
    pub fn from_extension(ext: &str) -> Result<Self, MetaError> {
        match ext {
            "md" | "mdx" => Ok(Self::Markdown),
            "js" | "jsx" | "ts" | "tsx" => Ok(Self::Script),
            other => Err(MetaError::UnsupportedExtension(other.to_string())),
        }
    }

    /// Map a file path to a source kind using its extension.
    pub fn from_path(path: &Path) -> Result<Self, MetaError> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        Self::from_extension(ext)
    }

    /// The `sourceType` tag written into extracted records.
    pub fn source_type(&self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Script => "js",
        }
    }
}

/// Errors that can occur when extracting static data.
#[derive(Debug, thiserror::Error)]
pub enum MetaError {
    #[error("Unsupported page extension \"{0}\"")]
    UnsupportedExtension(String),

    #[error("Frontmatter error: {0}")]
    Frontmatter(#[from] FrontmatterError),
}

/// Extract the static data record from a page source.
pub fn extract_static_data(content: &str, kind: SourceKind) -> Result<StaticData, MetaError> {
    let mut data = match kind {
        SourceKind::Markdown => split_frontmatter(content)?.data,
        SourceKind::Script => docblock::extract(content)
            .map(docblock::parse)
            .unwrap_or_default(),
    };

    data.insert(
        SOURCE_TYPE_KEY.to_string(),
        Value::String(kind.source_type().to_string()),
    );

    Ok(data)
}
