//! Accent- and case-insensitive search over a tree.
//!
//! A node matches when its name contains the search term. Matching nodes stay
//! visible together with every folder above them, and those folders are
//! expanded so the match can be seen. Children of a matching folder are not
//! revealed unless they match too.

use crate::types::{FolderNode, TreeNode};
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

/// Lowercases, trims and strips combining diacritics (U+0300..=U+036F) after
/// canonical decomposition, so `"Relatório"` and `"relatorio"` compare equal.
pub fn fold(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .nfd()
        .filter(|c| !('\u{0300}'..='\u{036f}').contains(c))
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    pub term: String,
    pub matches: usize,
    visible: HashSet<String>,
    expanded: HashSet<String>,
}

impl FilterOutcome {
    pub fn is_visible(&self, full_path: &str) -> bool {
        self.visible.contains(full_path)
    }
    pub fn is_expanded(&self, full_path: &str) -> bool {
        self.expanded.contains(full_path)
    }
    pub fn has_matches(&self) -> bool {
        self.matches > 0
    }
}

/// Runs `term` against every node below `root`. Returns `None` for a blank
/// term, which means "show everything".
pub fn search(root: &FolderNode, term: &str) -> Option<FilterOutcome> {
    let folded = fold(term);
    if folded.is_empty() {
        return None;
    }
    let mut outcome = FilterOutcome {
        term: folded,
        ..Default::default()
    };
    let mut ancestors = Vec::new();
    visit(root, &mut ancestors, &mut outcome);
    Some(outcome)
}

fn visit<'t>(folder: &'t FolderNode, ancestors: &mut Vec<&'t str>, outcome: &mut FilterOutcome) {
    for child in &folder.children {
        if fold(child.name()).contains(&outcome.term) {
            outcome.matches += 1;
            outcome.visible.insert(child.full_path().to_string());
            for ancestor in ancestors.iter() {
                outcome.visible.insert(ancestor.to_string());
                outcome.expanded.insert(ancestor.to_string());
            }
        }
        if let TreeNode::Folder(sub) = child {
            ancestors.push(&sub.full_path);
            visit(sub, ancestors, outcome);
            ancestors.pop();
        }
    }
}
