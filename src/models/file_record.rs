use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    #[default]
    Pending,
    Keep,
    Delete,
    Skip,
    Move,
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Keep => write!(f, "keep"),
            Self::Delete => write!(f, "delete"),
            Self::Skip => write!(f, "skip"),
            Self::Move => write!(f, "move"),
        }
    }
}

impl std::str::FromStr for Decision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "keep" => Ok(Self::Keep),
            "delete" => Ok(Self::Delete),
            "skip" => Ok(Self::Skip),
            "move" => Ok(Self::Move),
            _ => Err(format!("unknown decision: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentCategory {
    Image,
    Video,
    Audio,
    Document,
    Archive,
    Other,
}

const DOCUMENT_SUBTYPES: &[&str] = &[
    "pdf",
    "msword",
    "rtf",
    "vnd.ms-excel",
    "vnd.ms-powerpoint",
    "vnd.openxmlformats-officedocument",
    "vnd.oasis.opendocument",
    "epub+zip",
    "json",
    "xml",
];

const ARCHIVE_SUBTYPES: &[&str] = &[
    "zip",
    "x-tar",
    "gzip",
    "x-gzip",
    "x-bzip2",
    "x-xz",
    "x-7z-compressed",
    "vnd.rar",
    "x-rar-compressed",
    "zstd",
    "x-apple-diskimage",
];

impl ContentCategory {
    pub fn from_mime(mime: &str) -> Self {
        let mime = mime.to_ascii_lowercase();
        let (top, sub) = mime.split_once('/').unwrap_or((mime.as_str(), ""));
        match top {
            "image" => Self::Image,
            "video" => Self::Video,
            "audio" => Self::Audio,
            "text" => Self::Document,
            "application" if ARCHIVE_SUBTYPES.iter().any(|s| sub.starts_with(s)) => {
                Self::Archive
            }
            "application" if DOCUMENT_SUBTYPES.iter().any(|s| sub.starts_with(s)) => {
                Self::Document
            }
            _ => Self::Other,
        }
    }

    pub fn from_extension(extension: Option<&str>) -> (Self, Option<String>) {
        let mime = extension
            .and_then(|ext| mime_guess::from_ext(ext).first())
            .map(|m| m.to_string());
        let category = mime
            .as_deref()
            .map(Self::from_mime)
            .unwrap_or(Self::Other);
        (category, mime)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Document => "document",
            Self::Archive => "archive",
            Self::Other => "other",
        }
    }
}

/// One entry of the scanned source folder and the decision taken on it.
///
/// `decision` and `destination_folder` are private so the pair can only change
/// through [`FileRecord::set_decision`], which keeps the destination present
/// exactly when the decision is `Move`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: String,
    pub name: String,
    pub extension: Option<String>,
    pub mime_type: Option<String>,
    pub size_bytes: u64,
    pub modified_at: Option<chrono::DateTime<chrono::Utc>>,
    pub category: ContentCategory,
    pub is_directory: bool,
    decision: Decision,
    destination_folder: Option<String>,
}

impl FileRecord {
    pub fn new(
        path: String,
        name: String,
        extension: Option<String>,
        size_bytes: u64,
        modified_at: Option<chrono::DateTime<chrono::Utc>>,
        is_directory: bool,
    ) -> Self {
        let (category, mime_type) = if is_directory {
            (ContentCategory::Other, None)
        } else {
            ContentCategory::from_extension(extension.as_deref())
        };
        Self {
            path,
            name,
            extension,
            mime_type,
            size_bytes,
            modified_at,
            category,
            is_directory,
            decision: Decision::Pending,
            destination_folder: None,
        }
    }

    pub fn decision(&self) -> Decision {
        self.decision
    }

    pub fn destination_folder(&self) -> Option<&str> {
        self.destination_folder.as_deref()
    }

    pub fn is_pending(&self) -> bool {
        self.decision == Decision::Pending
    }

    /// Returns `false` and leaves the record untouched for a `Move` without a
    /// non-empty destination. The destination is dropped for other decisions.
    pub(crate) fn set_decision(&mut self, decision: Decision, destination: Option<&str>) -> bool {
        if decision == Decision::Move {
            match destination.filter(|d| !d.trim().is_empty()) {
                Some(dest) => self.destination_folder = Some(dest.to_string()),
                None => return false,
            }
        } else {
            self.destination_folder = None;
        }
        self.decision = decision;
        true
    }
}

/// Running counters for every non-pending decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionTally {
    pub keep: usize,
    pub delete: usize,
    pub skip: usize,
    #[serde(rename = "move")]
    pub moved: usize,
}

impl DecisionTally {
    /// Decrement for `old`, then increment for `new`. Pending is not counted.
    pub fn record_change(&mut self, old: Decision, new: Decision) {
        if let Some(counter) = self.counter_mut(old) {
            *counter = counter.saturating_sub(1);
        }
        if let Some(counter) = self.counter_mut(new) {
            *counter += 1;
        }
    }

    pub fn reviewed(&self) -> usize {
        self.keep + self.delete + self.skip + self.moved
    }

    pub fn get(&self, decision: Decision) -> usize {
        match decision {
            Decision::Pending => 0,
            Decision::Keep => self.keep,
            Decision::Delete => self.delete,
            Decision::Skip => self.skip,
            Decision::Move => self.moved,
        }
    }

    fn counter_mut(&mut self, decision: Decision) -> Option<&mut usize> {
        match decision {
            Decision::Pending => None,
            Decision::Keep => Some(&mut self.keep),
            Decision::Delete => Some(&mut self.delete),
            Decision::Skip => Some(&mut self.skip),
            Decision::Move => Some(&mut self.moved),
        }
    }
}
