//! Internal construction state for one tree: folders live in an arena indexed
//! by full path so ancestors are found in O(1), files wait in buckets until
//! they are classified, and [`TreeArena::into_root`] turns it all into owned
//! nodes.

use crate::path;
use crate::types::{FolderNode, Payload, TreeNode};
use std::collections::HashMap;

const ROOT: usize = 0;

#[derive(Debug)]
enum Slot {
    Folder(usize),
    File(usize),
}

#[derive(Debug)]
struct FolderSlot {
    name: String,
    full_path: String,
    children: Vec<Slot>,
}

/// A file seen during the entry phase, not yet turned into a node.
#[derive(Debug)]
pub(crate) struct PendingFile {
    pub name: String,
    pub full_path: String,
    pub payload: Option<Payload>,
}

/// Files sharing one parent folder.
#[derive(Debug)]
pub(crate) struct Bucket {
    pub parent_path: String,
    pub files: Vec<usize>,
}

#[derive(Debug)]
pub(crate) struct TreeArena {
    folders: Vec<FolderSlot>,
    index: HashMap<String, usize>,
    pending: Vec<Option<PendingFile>>,
    resolved: Vec<Option<TreeNode>>,
    buckets: Vec<Bucket>,
    bucket_index: HashMap<String, usize>,
}

impl TreeArena {
    pub(crate) fn new(root_label: &str) -> Self {
        Self {
            folders: vec![FolderSlot {
                name: root_label.to_string(),
                full_path: String::new(),
                children: Vec::new(),
            }],
            index: HashMap::new(),
            pending: Vec::new(),
            resolved: Vec::new(),
            buckets: Vec::new(),
            bucket_index: HashMap::new(),
        }
    }

    /// Returns the folder for `segments`, creating each missing prefix and
    /// attaching it to its parent. Existing prefixes are only looked up.
    pub(crate) fn ensure_folder(&mut self, segments: &[String]) -> usize {
        let mut parent = ROOT;
        let mut current = String::new();
        for segment in segments {
            current = path::child_path(&current, segment);
            parent = match self.index.get(&current) {
                Some(&existing) => existing,
                None => {
                    let id = self.folders.len();
                    self.folders.push(FolderSlot {
                        name: segment.clone(),
                        full_path: current.clone(),
                        children: Vec::new(),
                    });
                    self.folders[parent].children.push(Slot::Folder(id));
                    self.index.insert(current.clone(), id);
                    id
                }
            };
        }
        parent
    }

    /// Records a file under `parent_segments`, reserving its place among the
    /// parent's children so encounter order survives the bucket phase.
    pub(crate) fn add_file(&mut self, parent_segments: &[String], name: &str, payload: Option<Payload>) {
        let folder = self.ensure_folder(parent_segments);
        let parent_path = self.folders[folder].full_path.clone();
        let id = self.pending.len();
        self.pending.push(Some(PendingFile {
            name: name.to_string(),
            full_path: path::child_path(&parent_path, name),
            payload,
        }));
        self.resolved.push(None);
        self.folders[folder].children.push(Slot::File(id));
        let bucket = match self.bucket_index.get(&parent_path) {
            Some(&bucket) => bucket,
            None => {
                self.buckets.push(Bucket {
                    parent_path: parent_path.clone(),
                    files: Vec::new(),
                });
                self.bucket_index.insert(parent_path, self.buckets.len() - 1);
                self.buckets.len() - 1
            }
        };
        self.buckets[bucket].files.push(id);
    }

    pub(crate) fn has_folder(&self, full_path: &str) -> bool {
        self.index.contains_key(full_path)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.folders.len() == 1 && self.pending.is_empty()
    }

    pub(crate) fn folder_count(&self) -> usize {
        self.folders.len() - 1
    }

    /// Hands the buckets over for finalization, in first-encountered order.
    pub(crate) fn take_buckets(&mut self) -> Vec<Bucket> {
        self.bucket_index.clear();
        std::mem::take(&mut self.buckets)
    }

    pub(crate) fn take_pending(&mut self, id: usize) -> Option<PendingFile> {
        self.pending.get_mut(id).and_then(Option::take)
    }

    pub(crate) fn resolve(&mut self, id: usize, node: TreeNode) {
        if let Some(slot) = self.resolved.get_mut(id) {
            *slot = Some(node);
        }
    }

    pub(crate) fn into_root(mut self) -> FolderNode {
        self.materialize(ROOT)
    }

    fn materialize(&mut self, id: usize) -> FolderNode {
        let slots = std::mem::take(&mut self.folders[id].children);
        let mut children = Vec::with_capacity(slots.len());
        for slot in slots {
            match slot {
                Slot::Folder(child) => children.push(TreeNode::Folder(self.materialize(child))),
                Slot::File(file) => {
                    if let Some(node) = self.resolved[file].take() {
                        children.push(node);
                    }
                }
            }
        }
        let folder = &mut self.folders[id];
        FolderNode {
            name: std::mem::take(&mut folder.name),
            full_path: std::mem::take(&mut folder.full_path),
            expanded: false,
            children,
        }
    }
}
