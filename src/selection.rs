//! Which PDFs are selected for export, plus the tri-state "select all"
//! aggregates per folder and for the whole tree.
//!
//! Bulk operations and aggregates only consider visible PDFs, so a search
//! filter narrows what "select all" touches.

use crate::error::ZiptreeError;
use crate::types::{FileNode, FolderNode};
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckState {
    Unchecked,
    Checked,
    /// Some but not all of the considered PDFs are selected.
    Indeterminate,
}

#[derive(Debug, Clone, Default)]
pub struct Selection {
    selected: HashSet<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn is_selected(&self, full_path: &str) -> bool {
        self.selected.contains(full_path)
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Selects or deselects a single PDF.
    pub fn set(&mut self, root: &FolderNode, full_path: &str, checked: bool) -> Result<(), ZiptreeError> {
        let node = root
            .find(full_path)
            .ok_or_else(|| ZiptreeError::UnknownNode(full_path.to_string()))?;
        if !node.is_pdf() {
            return Err(ZiptreeError::NotAPdf(full_path.to_string()));
        }
        if checked {
            self.selected.insert(full_path.to_string());
        } else {
            self.selected.remove(full_path);
        }
        Ok(())
    }

    /// Flips a PDF's selection and returns the new state.
    pub fn toggle(&mut self, root: &FolderNode, full_path: &str) -> Result<bool, ZiptreeError> {
        let checked = !self.is_selected(full_path);
        self.set(root, full_path, checked)?;
        Ok(checked)
    }

    /// Applies `checked` to the visible PDFs directly inside a folder.
    pub fn set_folder(
        &mut self,
        root: &FolderNode,
        folder_path: &str,
        checked: bool,
        visible: impl Fn(&str) -> bool,
    ) -> Result<usize, ZiptreeError> {
        let folder = root
            .find_folder(folder_path)
            .ok_or_else(|| ZiptreeError::UnknownNode(folder_path.to_string()))?;
        let targets: Vec<&FileNode> = folder
            .direct_pdfs()
            .filter(|f| visible(&f.full_path))
            .collect();
        Ok(self.apply(targets, checked))
    }

    /// Applies `checked` to every visible PDF in the tree.
    pub fn set_all(&mut self, root: &FolderNode, checked: bool, visible: impl Fn(&str) -> bool) -> usize {
        let targets: Vec<&FileNode> = pdfs(root).filter(|f| visible(&f.full_path)).collect();
        self.apply(targets, checked)
    }

    pub fn folder_state(
        &self,
        root: &FolderNode,
        folder_path: &str,
        visible: impl Fn(&str) -> bool,
    ) -> Option<CheckState> {
        let folder = root.find_folder(folder_path)?;
        Some(self.aggregate(folder.direct_pdfs().filter(|f| visible(&f.full_path))))
    }

    pub fn global_state(&self, root: &FolderNode, visible: impl Fn(&str) -> bool) -> CheckState {
        self.aggregate(pdfs(root).filter(|f| visible(&f.full_path)))
    }

    /// Selected PDFs in tree order.
    pub fn selected_files<'t>(&self, root: &'t FolderNode) -> Vec<&'t FileNode> {
        pdfs(root)
            .filter(|f| self.selected.contains(&f.full_path))
            .collect()
    }

    fn apply(&mut self, targets: Vec<&FileNode>, checked: bool) -> usize {
        let count = targets.len();
        for file in targets {
            if checked {
                self.selected.insert(file.full_path.clone());
            } else {
                self.selected.remove(&file.full_path);
            }
        }
        count
    }

    fn aggregate<'t>(&self, files: impl Iterator<Item = &'t FileNode>) -> CheckState {
        let mut total = 0;
        let mut checked = 0;
        for file in files {
            total += 1;
            if self.selected.contains(&file.full_path) {
                checked += 1;
            }
        }
        match checked {
            0 => CheckState::Unchecked,
            n if n == total => CheckState::Checked,
            _ => CheckState::Indeterminate,
        }
    }
}

fn pdfs(root: &FolderNode) -> impl Iterator<Item = &FileNode> {
    root.files().filter(|f| f.kind == crate::types::FileKind::Pdf)
}
