//! Entry path handling: segment splitting, platform artifact filtering and
//! file classification by name.

use crate::error::ZiptreeError;
use crate::types::{FileFamily, FileKind};
use globset::{Glob, GlobSet, GlobSetBuilder};

/// Resource-fork directory macOS adds to archives it creates.
pub const MACOS_RESOURCE_DIR: &str = "__MACOSX";
/// Finder metadata file name; matched as a substring so `._.DS_Store` is caught too.
pub const FINDER_METADATA: &str = ".DS_Store";

/// Splits a raw entry path into its non-empty segments.
///
/// Backslashes count as separators so archives written on Windows produce the
/// same tree. Doubled and trailing separators yield no empty segments.
pub fn segments(raw: &str) -> Vec<String> {
    raw.split(['/', '\\'])
        .filter(|part| !part.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// Whether the raw path ends with a separator, which marks a directory entry.
pub fn has_trailing_separator(raw: &str) -> bool {
    raw.ends_with('/') || raw.ends_with('\\')
}

pub fn join(segments: &[String]) -> String {
    segments.join("/")
}

/// Appends `name` to `parent`, treating an empty parent as the root.
pub fn child_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

/// Classifies a file by its suffix, ignoring case.
pub fn classify(name: &str) -> FileKind {
    let lower = name.to_lowercase();
    if lower.ends_with(".zip") {
        FileKind::NestedArchive
    } else if lower.ends_with(".pdf") {
        FileKind::Pdf
    } else {
        FileKind::Generic
    }
}

pub fn family(name: &str) -> FileFamily {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "doc" | "docx" => FileFamily::WordProcessing,
        "xls" | "xlsx" => FileFamily::Spreadsheet,
        "ppt" | "pptx" => FileFamily::Presentation,
        "jpg" | "jpeg" | "png" | "gif" => FileFamily::Image,
        "txt" => FileFamily::Text,
        _ => FileFamily::Other,
    }
}

/// Decides which entries are platform artifacts and must never reach a tree.
#[derive(Debug, Clone, Default)]
pub struct ArtifactFilter {
    extra: Option<GlobSet>,
}

impl ArtifactFilter {
    /// Builds a filter from additional glob patterns on top of the built-in
    /// macOS rules.
    pub fn new(patterns: &[String]) -> Result<Self, ZiptreeError> {
        if patterns.is_empty() {
            return Ok(Self::default());
        }
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern).map_err(|e| {
                ZiptreeError::InvalidPattern(format!("'{}': {}", pattern, e))
            })?;
            builder.add(glob);
        }
        let set = builder
            .build()
            .map_err(|e| ZiptreeError::InvalidPattern(format!("failed to build glob set: {}", e)))?;
        Ok(Self { extra: Some(set) })
    }

    pub fn is_artifact(&self, segments: &[String]) -> bool {
        let builtin = segments
            .iter()
            .any(|s| s == MACOS_RESOURCE_DIR || s.contains(FINDER_METADATA));
        if builtin {
            return true;
        }
        match &self.extra {
            Some(set) => set.is_match(join(segments)),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_drop_empty_parts() {
        assert_eq!(segments("a//b/c.txt"), vec!["a", "b", "c.txt"]);
        assert_eq!(segments("/docs/"), vec!["docs"]);
        assert!(segments("/").is_empty());
        assert_eq!(segments("win\\style\\x.pdf"), vec!["win", "style", "x.pdf"]);
    }

    #[test]
    fn classification_ignores_case() {
        assert_eq!(classify("REPORT.PDF"), FileKind::Pdf);
        assert_eq!(classify("archive.ZIP"), FileKind::NestedArchive);
        assert_eq!(classify("notes.txt"), FileKind::Generic);
        assert_eq!(classify("pdf"), FileKind::Generic);
    }

    #[test]
    fn family_from_extension() {
        assert_eq!(family("budget.XLSX"), FileFamily::Spreadsheet);
        assert_eq!(family("photo.jpeg"), FileFamily::Image);
        assert_eq!(family("Makefile"), FileFamily::Other);
    }

    #[test]
    fn builtin_artifacts() {
        let filter = ArtifactFilter::default();
        assert!(filter.is_artifact(&segments("__MACOSX/._a.pdf")));
        assert!(filter.is_artifact(&segments("docs/.DS_Store")));
        assert!(filter.is_artifact(&segments("docs/__MACOSX/x")));
        assert!(!filter.is_artifact(&segments("docs/a.pdf")));
    }

    #[test]
    fn extra_patterns() {
        let filter = ArtifactFilter::new(&["**/Thumbs.db".to_string()]).unwrap();
        assert!(filter.is_artifact(&segments("img/Thumbs.db")));
        assert!(!filter.is_artifact(&segments("img/c.png")));
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let err = ArtifactFilter::new(&["[".to_string()]).unwrap_err();
        assert!(matches!(err, ZiptreeError::InvalidPattern(_)));
    }
}
