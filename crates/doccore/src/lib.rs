pub mod document;
pub mod filetype;

pub use document::{DocumentInfo, DocumentPatch, DocumentStore};
pub use filetype::{extensions_for_mime, DocumentKind, FileType};
