use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::file_record::{ContentCategory, FileRecord};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum FileTypeFilter {
    #[default]
    All,
    Category(ContentCategory),
    /// Lowercase extensions without the leading dot.
    Extensions(BTreeSet<String>),
}

impl FileTypeFilter {
    pub fn extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::Extensions(
            extensions
                .into_iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Name,
    Size,
    Type,
    Modified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterSpec {
    pub file_type: FileTypeFilter,
    pub include_directories: bool,
    pub sort: SortKey,
    pub direction: SortDirection,
}

impl FilterSpec {
    pub fn matches(&self, record: &FileRecord) -> bool {
        if record.is_directory {
            // Directories carry no media type, so only the "All" view can show them.
            return self.include_directories && self.file_type == FileTypeFilter::All;
        }
        match &self.file_type {
            FileTypeFilter::All => true,
            FileTypeFilter::Category(category) => record.category == *category,
            FileTypeFilter::Extensions(set) => record
                .extension
                .as_deref()
                .map(|ext| set.contains(&ext.to_ascii_lowercase()))
                .unwrap_or(false),
        }
    }

    /// Indices of `records` that match, ordered by the sort key. Ties fall back
    /// to the path so a given spec always yields the same sequence.
    pub fn apply(&self, records: &[FileRecord]) -> Vec<usize> {
        let mut indices: Vec<usize> = records
            .iter()
            .enumerate()
            .filter(|(_, r)| self.matches(r))
            .map(|(i, _)| i)
            .collect();

        indices.sort_by(|&a, &b| {
            let (ra, rb) = (&records[a], &records[b]);
            let primary = self.compare(ra, rb);
            let primary = match self.direction {
                SortDirection::Ascending => primary,
                SortDirection::Descending => primary.reverse(),
            };
            primary.then_with(|| ra.path.cmp(&rb.path))
        });
        indices
    }

    fn compare(&self, a: &FileRecord, b: &FileRecord) -> Ordering {
        match self.sort {
            SortKey::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SortKey::Size => a.size_bytes.cmp(&b.size_bytes),
            SortKey::Type => {
                let ea = a.extension.as_deref().unwrap_or("").to_ascii_lowercase();
                let eb = b.extension.as_deref().unwrap_or("").to_ascii_lowercase();
                ea.cmp(&eb)
                    .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
            }
            SortKey::Modified => a.modified_at.cmp(&b.modified_at),
        }
    }
}
