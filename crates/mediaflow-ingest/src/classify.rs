//! Extension-based classification of routed objects.

use mediaflow_core::keys::normalize_extension;
use mediaflow_core::WorkflowKind;

/// Extensions whose content is stored as-is.
pub const DIRECT_STORE_EXTENSIONS: &[&str] = &[".md", ".csv"];

/// Extensions handed to the text-extraction workflow.
pub const EXTRACT_TEXT_EXTENSIONS: &[&str] = &[
    ".pdf", ".png", ".jpg", ".jpeg", ".tiff", ".tif", ".doc", ".docx", ".txt",
];

/// Extensions handed to the media-transcription workflow.
pub const TRANSCRIBE_MEDIA_EXTENSIONS: &[&str] = &[".mp4", ".mov", ".avi", ".mkv"];

/// What the dispatcher does with an object of a given extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    DirectStore,
    ExtractTextWorkflow,
    TranscribeMediaWorkflow,
    Unsupported,
}

impl Classification {
    /// The workflow started for this classification, if any.
    pub fn workflow(&self) -> Option<WorkflowKind> {
        match self {
            Classification::ExtractTextWorkflow => Some(WorkflowKind::ExtractText),
            Classification::TranscribeMediaWorkflow => Some(WorkflowKind::TranscribeMedia),
            Classification::DirectStore | Classification::Unsupported => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::DirectStore => "direct_store",
            Classification::ExtractTextWorkflow => "extract_text",
            Classification::TranscribeMediaWorkflow => "transcribe_media",
            Classification::Unsupported => "unsupported",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ordered classification table. Rows are checked top to bottom and the
/// first row listing the extension wins.
#[derive(Debug, Clone)]
pub struct ClassificationTable {
    rows: Vec<(Classification, Vec<&'static str>)>,
}

impl ClassificationTable {
    /// Direct store first, so `.md` and `.csv` never reach a workflow.
    pub fn standard() -> Self {
        Self {
            rows: vec![
                (Classification::DirectStore, DIRECT_STORE_EXTENSIONS.to_vec()),
                (Classification::ExtractTextWorkflow, EXTRACT_TEXT_EXTENSIONS.to_vec()),
                (
                    Classification::TranscribeMediaWorkflow,
                    TRANSCRIBE_MEDIA_EXTENSIONS.to_vec(),
                ),
            ],
        }
    }

    /// Table with no direct-store row: `.md` and `.csv` go to text extraction.
    pub fn without_direct_store() -> Self {
        let mut extract = EXTRACT_TEXT_EXTENSIONS.to_vec();
        extract.extend_from_slice(DIRECT_STORE_EXTENSIONS);
        Self {
            rows: vec![
                (Classification::ExtractTextWorkflow, extract),
                (
                    Classification::TranscribeMediaWorkflow,
                    TRANSCRIBE_MEDIA_EXTENSIONS.to_vec(),
                ),
            ],
        }
    }

    pub fn for_direct_store(enabled: bool) -> Self {
        if enabled {
            Self::standard()
        } else {
            Self::without_direct_store()
        }
    }

    /// Classify an extension. Case-insensitive; the leading dot is optional.
    pub fn classify(&self, extension: &str) -> Classification {
        let extension = normalize_extension(extension);
        if extension.is_empty() {
            return Classification::Unsupported;
        }

        self.rows
            .iter()
            .find(|(_, extensions)| extensions.contains(&extension.as_str()))
            .map(|(decision, _)| *decision)
            .unwrap_or(Classification::Unsupported)
    }

    pub fn rows(&self) -> impl Iterator<Item = (Classification, &[&'static str])> {
        self.rows.iter().map(|(c, e)| (*c, e.as_slice()))
    }
}

impl Default for ClassificationTable {
    fn default() -> Self {
        Self::standard()
    }
}
