use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// Bookkeeping for the document currently shown to the user: display name
/// plus the URL it was fetched from, if any.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Partial update applied to the stored [`DocumentInfo`]; fields left as
/// `None` keep their current value.
#[derive(Debug, Clone, Default)]
pub struct DocumentPatch {
    pub file_name: Option<String>,
    pub url: Option<String>,
}

/// Shared store for the current document bookkeeping.
///
/// Readers get a snapshot clone, writers merge a [`DocumentPatch`]; holders
/// of a snapshot never observe later mutations.
#[derive(Debug, Default)]
pub struct DocumentStore {
    inner: RwLock<DocumentInfo>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> DocumentInfo {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn set(&self, info: DocumentInfo) {
        *self.inner.write().unwrap_or_else(|e| e.into_inner()) = info;
    }

    pub fn update(&self, patch: DocumentPatch) {
        let mut info = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if let Some(file_name) = patch.file_name {
            info.file_name = file_name;
        }
        if let Some(url) = patch.url {
            info.url = Some(url);
        }
    }

    pub fn clear(&self) {
        self.set(DocumentInfo::default());
    }
}
