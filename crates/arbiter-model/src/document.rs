//! Ingested documents

use crate::error::EntityError;
use crate::{is_non_blank, Metadata};
use serde::{Deserialize, Serialize};

const ENTITY: &str = "document";

/// Raw ingested content
///
/// # Invariants
/// - `content` is non-blank text
/// - `metadata` has string keys (guaranteed by [`Metadata`])
/// - `embedding`, when present, is non-empty and finite
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DocumentRecord")]
pub struct Document {
    content: String,
    metadata: Metadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    embedding: Option<Vec<f32>>,
}

#[derive(Deserialize)]
struct DocumentRecord {
    content: String,
    #[serde(default)]
    metadata: Metadata,
    #[serde(default)]
    embedding: Option<Vec<f32>>,
}

impl TryFrom<DocumentRecord> for Document {
    type Error = EntityError;

    fn try_from(record: DocumentRecord) -> Result<Self, Self::Error> {
        let doc = Self::new(record.content, record.metadata)?;
        match record.embedding {
            Some(embedding) => doc.with_embedding(embedding),
            None => Ok(doc),
        }
    }
}

impl Document {
    /// Create a document without an embedding
    ///
    /// # Errors
    /// Returns [`EntityError::InvalidEntity`] if `content` is blank
    pub fn new(content: impl Into<String>, metadata: Metadata) -> Result<Self, EntityError> {
        let content = content.into();
        if !is_non_blank(&content) {
            return Err(EntityError::invalid(ENTITY, "content must be non-empty text"));
        }
        Ok(Self {
            content,
            metadata,
            embedding: None,
        })
    }

    /// Attach a vector embedding, producing a new document
    ///
    /// # Errors
    /// Returns [`EntityError::InvalidEntity`] if the vector is empty or has
    /// non-finite components
    pub fn with_embedding(self, embedding: Vec<f32>) -> Result<Self, EntityError> {
        if embedding.is_empty() {
            return Err(EntityError::invalid(ENTITY, "embedding must be non-empty"));
        }
        if embedding.iter().any(|v| !v.is_finite()) {
            return Err(EntityError::invalid(ENTITY, "embedding must be finite"));
        }
        Ok(Self {
            embedding: Some(embedding),
            ..self
        })
    }

    /// Document text
    #[inline]
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Open metadata mapping
    #[inline]
    #[must_use]
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Look up a string-valued metadata entry
    #[inline]
    #[must_use]
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(serde_json::Value::as_str)
    }

    /// Embedding, present only after indexing
    #[inline]
    #[must_use]
    pub fn embedding(&self) -> Option<&[f32]> {
        self.embedding.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn meta() -> Metadata {
        let mut m = Metadata::new();
        m.insert("risk".into(), json!("low"));
        m
    }

    #[test]
    fn document_creation() {
        let doc = Document::new("Bond fund, low risk", meta()).unwrap();
        assert_eq!(doc.content(), "Bond fund, low risk");
        assert_eq!(doc.metadata_str("risk"), Some("low"));
        assert!(doc.embedding().is_none());
    }

    #[test]
    fn document_rejects_blank_content() {
        for content in ["", "   ", "\n\t"] {
            let err = Document::new(content, Metadata::new()).unwrap_err();
            assert_eq!(err.rule(), Some("content must be non-empty text"));
        }
    }

    #[test]
    fn document_embedding_validation() {
        let doc = Document::new("x", Metadata::new()).unwrap();
        assert!(doc.clone().with_embedding(vec![]).is_err());
        assert!(doc.clone().with_embedding(vec![0.1, f32::NAN]).is_err());

        let doc = doc.with_embedding(vec![0.1, 0.2, 0.3]).unwrap();
        assert_eq!(doc.embedding(), Some(&[0.1, 0.2, 0.3][..]));
    }

    #[test]
    fn deserialization_revalidates() {
        let ok: Document =
            serde_json::from_value(json!({ "content": "Index fund", "metadata": { "id": "idx" } }))
                .unwrap();
        assert_eq!(ok.metadata_str("id"), Some("idx"));

        let bad = serde_json::from_value::<Document>(json!({ "content": "" }));
        assert!(bad.is_err());

        let bad_embedding =
            serde_json::from_value::<Document>(json!({ "content": "x", "embedding": [] }));
        assert!(bad_embedding.is_err());
    }

    #[test]
    fn serialization_omits_missing_embedding() {
        let doc = Document::new("x", Metadata::new()).unwrap();
        let value = serde_json::to_value(&doc).unwrap();
        assert!(value.get("embedding").is_none());
    }
}
