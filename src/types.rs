use crate::error::ZiptreeError;
use crate::path;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Something that can produce the bytes of an entry on demand.
///
/// Implementations must be cheap to hold: bytes are only materialized when a
/// file is previewed, exported or expanded as a nested archive.
pub trait ByteSource: fmt::Debug + Send + Sync {
    fn read_bytes(&self) -> Result<Vec<u8>, ZiptreeError>;
    /// Size in bytes, when known without reading.
    fn len_hint(&self) -> Option<u64> {
        None
    }
}

/// Shared handle to an entry's lazily read content.
#[derive(Debug, Clone)]
pub struct Payload(Arc<dyn ByteSource>);

impl Payload {
    pub fn new(source: impl ByteSource + 'static) -> Self {
        Self(Arc::new(source))
    }
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(crate::source::MemorySource::new(bytes))
    }
    pub fn read(&self) -> Result<Vec<u8>, ZiptreeError> {
        self.0.read_bytes()
    }
    pub fn len_hint(&self) -> Option<u64> {
        self.0.len_hint()
    }
}

/// One path record found inside an archive or a folder selection.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    /// Path as stored in the source, separators included.
    pub path: String,
    pub is_directory: bool,
    /// Absent for directories.
    pub payload: Option<Payload>,
}

impl ArchiveEntry {
    /// A file entry, or a directory entry when `path` ends with a separator.
    pub fn new(path: impl Into<String>, payload: Option<Payload>) -> Self {
        let path = path.into();
        let is_directory = path::has_trailing_separator(&path);
        Self {
            path,
            is_directory,
            payload: if is_directory { None } else { payload },
        }
    }
    pub fn file(path: impl Into<String>, payload: Payload) -> Self {
        Self {
            path: path.into(),
            is_directory: false,
            payload: Some(payload),
        }
    }
    pub fn directory(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_directory: true,
            payload: None,
        }
    }
    pub fn segments(&self) -> Vec<String> {
        path::segments(&self.path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Pdf,
    NestedArchive,
    Generic,
}

/// Coarse document family of a generic file, used by renderers to pick an icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileFamily {
    WordProcessing,
    Spreadsheet,
    Presentation,
    Image,
    Text,
    Other,
}

/// Inline marker left on a file whose nested archive could not be expanded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Annotation {
    CorruptArchive { detail: String },
    EmptyArchive,
    TooDeeplyNested { limit: usize },
    /// The archive's path is already a folder built from other entries.
    PathConflict,
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Annotation::CorruptArchive { .. } => write!(f, "could not extract"),
            Annotation::EmptyArchive => write!(f, "empty or invalid archive"),
            Annotation::TooDeeplyNested { limit } => {
                write!(f, "nested deeper than {} levels", limit)
            }
            Annotation::PathConflict => write!(f, "a folder with this path already exists"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FileNode {
    pub name: String,
    pub full_path: String,
    pub kind: FileKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<Annotation>,
    #[serde(skip)]
    pub payload: Option<Payload>,
}

impl FileNode {
    pub fn family(&self) -> FileFamily {
        path::family(&self.name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FolderNode {
    pub name: String,
    pub full_path: String,
    pub expanded: bool,
    pub children: Vec<TreeNode>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TreeNode {
    Folder(FolderNode),
    File(FileNode),
}

impl TreeNode {
    pub fn name(&self) -> &str {
        match self {
            TreeNode::Folder(folder) => &folder.name,
            TreeNode::File(file) => &file.name,
        }
    }
    pub fn full_path(&self) -> &str {
        match self {
            TreeNode::Folder(folder) => &folder.full_path,
            TreeNode::File(file) => &file.full_path,
        }
    }
    pub fn as_folder(&self) -> Option<&FolderNode> {
        match self {
            TreeNode::Folder(folder) => Some(folder),
            TreeNode::File(_) => None,
        }
    }
    pub fn as_file(&self) -> Option<&FileNode> {
        match self {
            TreeNode::File(file) => Some(file),
            TreeNode::Folder(_) => None,
        }
    }
    pub fn is_pdf(&self) -> bool {
        matches!(self, TreeNode::File(file) if file.kind == FileKind::Pdf)
    }
    fn rebase(&mut self, prefix: &str) {
        match self {
            TreeNode::Folder(folder) => folder.rebase(prefix),
            TreeNode::File(file) => file.full_path = path::child_path(prefix, &file.full_path),
        }
    }
}

impl FolderNode {
    pub fn new(name: impl Into<String>, full_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            full_path: full_path.into(),
            expanded: false,
            children: Vec::new(),
        }
    }

    /// Looks up a descendant (or `self`) by its full path.
    pub fn find(&self, full_path: &str) -> Option<&TreeNode> {
        let mut current = self;
        loop {
            let mut next = None;
            for child in &current.children {
                if child.full_path() == full_path {
                    return Some(child);
                }
                if let TreeNode::Folder(folder) = child {
                    if is_descendant(full_path, &folder.full_path) {
                        next = Some(folder);
                        break;
                    }
                }
            }
            current = next?;
        }
    }

    pub fn find_folder(&self, full_path: &str) -> Option<&FolderNode> {
        if self.full_path == full_path {
            return Some(self);
        }
        self.find(full_path).and_then(TreeNode::as_folder)
    }

    pub fn find_folder_mut(&mut self, full_path: &str) -> Option<&mut FolderNode> {
        if self.full_path == full_path {
            return Some(self);
        }
        for child in &mut self.children {
            if let TreeNode::Folder(folder) = child {
                if folder.full_path == full_path || is_descendant(full_path, &folder.full_path) {
                    return folder.find_folder_mut(full_path);
                }
            }
        }
        None
    }

    /// Pre-order traversal over every descendant node.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            stack: self.children.iter().rev().collect(),
        }
    }

    /// Every file node, in tree order.
    pub fn files(&self) -> impl Iterator<Item = &FileNode> {
        self.walk().filter_map(TreeNode::as_file)
    }

    /// PDFs directly inside this folder, the set a per-folder "select all" acts on.
    pub fn direct_pdfs(&self) -> impl Iterator<Item = &FileNode> {
        self.children
            .iter()
            .filter_map(TreeNode::as_file)
            .filter(|file| file.kind == FileKind::Pdf)
    }

    /// Applies `f` to this folder and every folder below it.
    pub fn for_each_folder_mut(&mut self, f: &mut impl FnMut(&mut FolderNode)) {
        f(self);
        for child in &mut self.children {
            if let TreeNode::Folder(folder) = child {
                folder.for_each_folder_mut(f);
            }
        }
    }

    /// Prefixes the full path of this folder and everything below it.
    pub(crate) fn rebase(&mut self, prefix: &str) {
        self.full_path = path::child_path(prefix, &self.full_path);
        for child in &mut self.children {
            child.rebase(prefix);
        }
    }
}

fn is_descendant(path: &str, ancestor: &str) -> bool {
    if ancestor.is_empty() {
        return !path.is_empty();
    }
    path.len() > ancestor.len()
        && path.starts_with(ancestor)
        && path.as_bytes()[ancestor.len()] == b'/'
}

pub struct Walk<'a> {
    stack: Vec<&'a TreeNode>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a TreeNode;
    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        if let TreeNode::Folder(folder) = node {
            self.stack.extend(folder.children.iter().rev());
        }
        Some(node)
    }
}

/// Counters collected while building one tree, nested archives included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeStats {
    pub folders: usize,
    pub files: usize,
    pub pdfs: usize,
    pub nested_expanded: usize,
    pub nested_failed: usize,
    pub artifacts_skipped: usize,
}

impl TreeStats {
    pub(crate) fn absorb(&mut self, nested: &TreeStats) {
        self.folders += nested.folders;
        self.files += nested.files;
        self.pdfs += nested.pdfs;
        self.nested_expanded += nested.nested_expanded;
        self.nested_failed += nested.nested_failed;
        self.artifacts_skipped += nested.artifacts_skipped;
    }
}

/// A fully materialized tree for one input.
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveTree {
    /// Synthetic root; its `name` is the label the tree was built with and its
    /// `full_path` is empty.
    pub root: FolderNode,
    pub stats: TreeStats,
}

impl ArchiveTree {
    pub fn label(&self) -> &str {
        &self.root.name
    }
    pub fn find(&self, full_path: &str) -> Option<&TreeNode> {
        self.root.find(full_path)
    }
    /// Turns the tree into a folder mounted at `full_path`, prefixing every
    /// descendant path.
    pub fn into_folder(self, name: impl Into<String>, full_path: &str) -> FolderNode {
        let mut root = self.root;
        root.name = name.into();
        for child in &mut root.children {
            child.rebase(full_path);
        }
        root.full_path = full_path.to_string();
        root
    }
}
