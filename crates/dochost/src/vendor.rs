//! Capabilities supplied by (or owed to) the external editor library: the
//! raw instance handle, the script loader, and the instance factory.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use doccore::FileType;

/// Instructions understood by a running widget instance. Command names and
/// payload shapes are fixed by the vendor protocol.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorCommand {
    SetPermissions { edit: bool },
    Print,
    RightsChange { enabled: bool, message: String },
}

impl EditorCommand {
    pub fn name(&self) -> &'static str {
        match self {
            EditorCommand::SetPermissions { .. } => "asc_setPermissions",
            EditorCommand::Print => "asc_print",
            EditorCommand::RightsChange { .. } => "processRightsChange",
        }
    }

    pub fn data(&self) -> Value {
        match self {
            EditorCommand::SetPermissions { edit } => json!({ "edit": edit }),
            EditorCommand::Print => json!({}),
            EditorCommand::RightsChange { enabled, message } => {
                json!({ "enabled": enabled, "message": message })
            }
        }
    }
}

/// Document bytes as the vendor hands them around: either an already-decoded
/// text body or raw binary. Binary is carried as base64 in serialized form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinaryContent {
    Text(String),
    Bytes(#[serde(with = "base64_bytes")] Vec<u8>),
}

impl BinaryContent {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            BinaryContent::Text(text) => text.as_bytes(),
            BinaryContent::Bytes(bytes) => bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

/// Immutable snapshot passed at (re)creation time. The manager retains the
/// most recent one so a read-only session can still export and a mode switch
/// can recreate the widget with identical content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorConfig {
    pub file_name: String,
    pub file_type: FileType,
    pub content: BinaryContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<Value>,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// The result of exporting a document out of the editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedDocument {
    pub file_name: String,
    pub file_type: FileType,
    pub content: BinaryContent,
}

impl From<&EditorConfig> for ExportedDocument {
    fn from(config: &EditorConfig) -> Self {
        Self {
            file_name: config.file_name.clone(),
            file_type: config.file_type,
            content: config.content.clone(),
        }
    }
}

/// The raw capability representing one running widget instance, supplied by
/// the vendor factory. The manager never constructs one itself.
pub trait EditorHandle: Send + Sync {
    /// Fire-and-forget instruction to the running widget.
    fn send_command(&self, command: EditorCommand);

    /// Idempotent teardown request. Failures are logged and swallowed by the
    /// manager; teardown never blocks the next create.
    fn destroy_editor(&self) -> anyhow::Result<()>;

    /// Vendor extension that triggers the widget's save/download protocol.
    /// The exported bytes come back over the bus as a `saveDocument` event.
    fn download_as(&self);
}

/// Injects the vendor script and resolves once its global entry point is
/// available.
#[async_trait]
pub trait ApiLoader: Send + Sync {
    async fn load(&self, url: &str) -> anyhow::Result<()>;
}

#[async_trait]
impl<T: ApiLoader + ?Sized> ApiLoader for Arc<T> {
    async fn load(&self, url: &str) -> anyhow::Result<()> {
        (**self).load(url).await
    }
}

/// External pipeline that materializes a brand-new widget instance.
///
/// `spawn_editor` is fire-and-forget: the factory is expected to install the
/// new raw handle through [`EditorManager::create`] and announce completion
/// with a `documentReady` event.
///
/// [`EditorManager::create`]: crate::manager::EditorManager::create
pub trait EditorFactory: Send + Sync {
    fn spawn_editor(&self, config: EditorConfig);
}

impl<T: EditorFactory + ?Sized> EditorFactory for Arc<T> {
    fn spawn_editor(&self, config: EditorConfig) {
        (**self).spawn_editor(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_wire_names() {
        assert_eq!(
            EditorCommand::SetPermissions { edit: true }.name(),
            "asc_setPermissions"
        );
        assert_eq!(EditorCommand::Print.name(), "asc_print");
        assert_eq!(
            EditorCommand::RightsChange {
                enabled: false,
                message: String::new()
            }
            .name(),
            "processRightsChange"
        );
    }

    #[test]
    fn test_command_payload_shapes() {
        assert_eq!(
            EditorCommand::SetPermissions { edit: false }.data(),
            json!({ "edit": false })
        );
        assert_eq!(EditorCommand::Print.data(), json!({}));
        assert_eq!(
            EditorCommand::RightsChange {
                enabled: false,
                message: "locked".to_string()
            }
            .data(),
            json!({ "enabled": false, "message": "locked" })
        );
    }

    #[test]
    fn test_binary_content_base64_round_trip() {
        let content = BinaryContent::Bytes(vec![0x00, 0xFF, 0x10, 0x20]);
        let serialized = serde_json::to_string(&content).unwrap();
        assert!(serialized.contains("AP8QIA=="));

        let decoded: BinaryContent = serde_json::from_str(&serialized).unwrap();
        assert_eq!(decoded, content);
    }

    #[test]
    fn test_editor_config_defaults() {
        let json = r#"{
            "file_name": "a.docx",
            "file_type": "DOCX",
            "content": { "text": "hello" }
        }"#;
        let config: EditorConfig = serde_json::from_str(json).unwrap();
        assert!(!config.read_only);
        assert!(config.language.is_none());
        assert!(config.media.is_none());
        assert_eq!(config.content.as_bytes(), b"hello");
    }
}
