use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Document formats accepted by the embedded editor.
///
/// The serialized form is the vendor's uppercase token (`"DOCX"`, `"XLSX"`,
/// ...) as required by the create-instance protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FileType {
    Docx,
    Doc,
    Odt,
    Rtf,
    Txt,
    Xlsx,
    Xls,
    Ods,
    Csv,
    Pptx,
    Ppt,
    Odp,
}

/// Broad editor family a format belongs to (word processor, spreadsheet,
/// presentation). The vendor selects its rendering module from this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Word,
    Cell,
    Slide,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Docx => "DOCX",
            FileType::Doc => "DOC",
            FileType::Odt => "ODT",
            FileType::Rtf => "RTF",
            FileType::Txt => "TXT",
            FileType::Xlsx => "XLSX",
            FileType::Xls => "XLS",
            FileType::Ods => "ODS",
            FileType::Csv => "CSV",
            FileType::Pptx => "PPTX",
            FileType::Ppt => "PPT",
            FileType::Odp => "ODP",
        }
    }

    /// Lowercase file extension without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            FileType::Docx => "docx",
            FileType::Doc => "doc",
            FileType::Odt => "odt",
            FileType::Rtf => "rtf",
            FileType::Txt => "txt",
            FileType::Xlsx => "xlsx",
            FileType::Xls => "xls",
            FileType::Ods => "ods",
            FileType::Csv => "csv",
            FileType::Pptx => "pptx",
            FileType::Ppt => "ppt",
            FileType::Odp => "odp",
        }
    }

    pub fn kind(&self) -> DocumentKind {
        match self {
            FileType::Docx | FileType::Doc | FileType::Odt | FileType::Rtf | FileType::Txt => {
                DocumentKind::Word
            }
            FileType::Xlsx | FileType::Xls | FileType::Ods | FileType::Csv => DocumentKind::Cell,
            FileType::Pptx | FileType::Ppt | FileType::Odp => DocumentKind::Slide,
        }
    }

    pub fn from_extension(ext: &str) -> Option<FileType> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        match ext.as_str() {
            "docx" => Some(FileType::Docx),
            "doc" => Some(FileType::Doc),
            "odt" => Some(FileType::Odt),
            "rtf" => Some(FileType::Rtf),
            "txt" => Some(FileType::Txt),
            "xlsx" => Some(FileType::Xlsx),
            "xls" => Some(FileType::Xls),
            "ods" => Some(FileType::Ods),
            "csv" => Some(FileType::Csv),
            "pptx" => Some(FileType::Pptx),
            "ppt" => Some(FileType::Ppt),
            "odp" => Some(FileType::Odp),
            _ => None,
        }
    }

    pub fn from_mime(mime: &str) -> Option<FileType> {
        extensions_for_mime(mime)
            .first()
            .and_then(|ext| FileType::from_extension(ext))
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

lazy_static! {
    static ref MIME_EXTENSIONS: HashMap<&'static str, &'static [&'static str]> = {
        let mut table: HashMap<&'static str, &'static [&'static str]> = HashMap::new();
        table.insert(
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            &["docx"],
        );
        table.insert("application/msword", &["doc"]);
        table.insert("application/vnd.oasis.opendocument.text", &["odt"]);
        table.insert("application/rtf", &["rtf"]);
        table.insert("text/plain", &["txt"]);
        table.insert(
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            &["xlsx"],
        );
        table.insert("application/vnd.ms-excel", &["xls"]);
        table.insert("application/vnd.oasis.opendocument.spreadsheet", &["ods"]);
        table.insert("text/csv", &["csv"]);
        table.insert(
            "application/vnd.openxmlformats-officedocument.presentationml.presentation",
            &["pptx"],
        );
        table.insert("application/vnd.ms-powerpoint", &["ppt"]);
        table.insert("application/vnd.oasis.opendocument.presentation", &["odp"]);
        table
    };
}

/// Known file extensions for a MIME type, empty when the type is unknown.
pub fn extensions_for_mime(mime: &str) -> &'static [&'static str] {
    MIME_EXTENSIONS.get(mime).copied().unwrap_or(&[])
}
