//! Output formatting for a session's tree.
//!
//! Renders the combined tree as an ASCII outline, a flat list of file paths,
//! or JSON. When a filter is active only visible nodes are rendered.

use crate::filter::FilterOutcome;
use crate::selection::Selection;
use crate::types::{FileKind, FolderNode, TreeNode};
use crate::ZiptreeError;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Tree,
    Paths,
    Json,
}

/// Session state that decorates the rendered tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderContext<'a> {
    pub selection: Option<&'a Selection>,
    pub filter: Option<&'a FilterOutcome>,
}

impl RenderContext<'_> {
    fn is_visible(&self, full_path: &str) -> bool {
        self.filter.is_none_or(|f| f.is_visible(full_path))
    }
    fn is_selected(&self, full_path: &str) -> bool {
        self.selection.is_some_and(|s| s.is_selected(full_path))
    }
}

/// Formats the tree below `root` into a string.
pub fn format_tree(
    root: &FolderNode,
    format: OutputFormat,
    context: &RenderContext<'_>,
    pretty: bool,
) -> Result<String, ZiptreeError> {
    match format {
        OutputFormat::Tree => Ok(format_outline(root, context)),
        OutputFormat::Paths => Ok(format_paths(root, context)),
        OutputFormat::Json => format_json(root, context, pretty),
    }
}

/// Writes the formatted tree to a file.
pub fn write_tree_to_file(
    root: &FolderNode,
    format: OutputFormat,
    context: &RenderContext<'_>,
    path: impl AsRef<Path>,
    pretty: bool,
) -> Result<(), ZiptreeError> {
    let content = format_tree(root, format, context, pretty)?;
    fs::write(&path, content).map_err(|e| ZiptreeError::io(path.as_ref(), e))?;
    Ok(())
}

fn format_outline(root: &FolderNode, context: &RenderContext<'_>) -> String {
    let mut lines = vec![format!(".  # {}", root.name)];
    outline(root, 0, context, &mut lines);
    lines.join("\n")
}

fn outline(folder: &FolderNode, depth: usize, context: &RenderContext<'_>, lines: &mut Vec<String>) {
    let prefix = "│   ".repeat(depth) + "├── ";
    for child in &folder.children {
        if !context.is_visible(child.full_path()) {
            continue;
        }
        match child {
            TreeNode::Folder(sub) => {
                lines.push(format!("{}{}/", prefix, sub.name));
                outline(sub, depth + 1, context, lines);
            }
            TreeNode::File(file) => {
                let mut line = format!("{}{}", prefix, file.name);
                if file.kind == FileKind::Pdf && context.is_selected(&file.full_path) {
                    line.push_str("  [x]");
                }
                if let Some(annotation) = &file.annotation {
                    line.push_str(&format!("  ({})", annotation));
                }
                lines.push(line);
            }
        }
    }
}

fn format_paths(root: &FolderNode, context: &RenderContext<'_>) -> String {
    let mut out = String::new();
    for file in root.files().filter(|f| context.is_visible(&f.full_path)) {
        out.push_str(&file.full_path);
        out.push('\n');
    }
    out
}

#[derive(Serialize)]
struct JsonView<'a> {
    root: &'a FolderNode,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    selected: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    matches: Option<usize>,
}

fn format_json(root: &FolderNode, context: &RenderContext<'_>, pretty: bool) -> Result<String, ZiptreeError> {
    let view = JsonView {
        root,
        selected: context
            .selection
            .map(|s| {
                s.selected_files(root)
                    .into_iter()
                    .map(|f| f.full_path.as_str())
                    .collect()
            })
            .unwrap_or_default(),
        filter: context.filter.map(|f| f.term.as_str()),
        matches: context.filter.map(|f| f.matches),
    };
    let json = if pretty {
        serde_json::to_string_pretty(&view)?
    } else {
        serde_json::to_string(&view)?
    };
    Ok(json)
}
