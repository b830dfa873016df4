use serde::{Deserialize, Serialize};

/// One addressable segment of a source document. Read-only to the pipelines,
/// except for `translated_text` which the translation pipeline attaches.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ContentUnit {
    pub id: String,
    pub document_id: String,
    pub order_index: i64,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translated_text: Option<String>,
    /// `translated_text` holds the original text because translation failed.
    #[serde(default)]
    pub translation_fallback: bool,
    #[serde(default)]
    pub kind: ContentKind,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    #[default]
    Paragraph,
    Heading,
    Caption,
    Table,
}

/// Inclusive range of `order_index` values covered by a chunk or artifact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct OrderRange {
    pub first: i64,
    pub last: i64,
}

impl OrderRange {
    pub fn label(&self) -> String {
        format!("{}-{}", self.first, self.last)
    }
}

impl ContentUnit {
    pub fn new(document_id: &str, order_index: i64, text: &str) -> Self {
        ContentUnit {
            id: uuid::Uuid::new_v4().to_string(),
            document_id: document_id.to_string(),
            order_index,
            text: text.to_string(),
            translated_text: None,
            translation_fallback: false,
            kind: ContentKind::Paragraph,
        }
    }

    /// No translation yet, or only the fallback copy of the original.
    pub fn needs_translation(&self) -> bool {
        self.translated_text.is_none() || self.translation_fallback
    }
}
