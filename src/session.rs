//! The state of one browsing session: the combined tree of every loaded
//! input, the search filter, the PDF selection and the open preview.
//!
//! Loading a new batch tears the previous one down. Inputs in a batch are
//! built strictly one after another and grafted under their own top-level
//! folder, in input order.

use crate::archive::{ArchiveDecoder, ZipDecoder};
use crate::blob::{Blob, BlobRegistry, PDF_MIME, ZIP_MIME};
use crate::cancel::CancelFlag;
use crate::engine::TreeBuilder;
use crate::error::ZiptreeError;
use crate::export::{ArchiveExporter, ExportItem, ZipExporter};
use crate::filter::{self, FilterOutcome};
use crate::notify::{Notification, Notifier, OversizeWarning, Severity, Silent};
use crate::options::BuildOptions;
use crate::path;
use crate::progress::{NoProgress, ProgressSink, ProgressTracker, ProgressUpdate, Stage};
use crate::selection::{CheckState, Selection};
use crate::source::{FolderFile, InputArchive};
use crate::types::{ArchiveEntry, ArchiveTree, FileKind, FolderNode, Payload, TreeNode, TreeStats};
use std::collections::HashMap;

/// Label of the session's synthetic root folder.
pub const SESSION_ROOT: &str = "root";

/// What happened to each input of a batch.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Top-level folder names of the inputs that were grafted.
    pub loaded: Vec<String>,
    pub failed: Vec<(String, ZiptreeError)>,
    /// The user refused the oversize warning; nothing was loaded.
    pub declined: bool,
    pub cancelled: bool,
}

impl LoadReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && !self.declined && !self.cancelled
    }
}

/// The PDF currently shown in the preview.
#[derive(Debug)]
pub struct PdfPreview {
    pub full_path: String,
    pub name: String,
    pub blob: Blob,
}

/// A generated export, ready to be saved.
#[derive(Debug)]
pub struct ExportArchive {
    /// Suggested download name, e.g. `PDFs_2024-05-01.zip`.
    pub file_name: String,
    pub blob: Blob,
    /// Source paths of the exported PDFs, in archive order.
    pub included: Vec<String>,
    pub skipped: Vec<(String, ZiptreeError)>,
}

enum PreparedInput {
    Archive(InputArchive),
    Folder {
        label: String,
        entries: Vec<ArchiveEntry>,
    },
}

impl PreparedInput {
    fn label(&self) -> &str {
        match self {
            PreparedInput::Archive(archive) => &archive.name,
            PreparedInput::Folder { label, .. } => label,
        }
    }
}

pub struct Session<D: ArchiveDecoder = ZipDecoder, E: ArchiveExporter = ZipExporter> {
    options: BuildOptions,
    decoder: D,
    exporter: E,
    progress: Box<dyn ProgressSink>,
    notifier: Box<dyn Notifier>,
    cancel: CancelFlag,
    blobs: BlobRegistry,
    tree: FolderNode,
    stats: TreeStats,
    selection: Selection,
    filter: Option<FilterOutcome>,
    preview: Option<PdfPreview>,
}

impl Session {
    pub fn new(options: BuildOptions) -> Self {
        let exporter = ZipExporter {
            compression_level: options.export_compression_level,
        };
        Self {
            options,
            decoder: ZipDecoder,
            exporter,
            progress: Box::new(NoProgress),
            notifier: Box::new(Silent),
            cancel: CancelFlag::new(),
            blobs: BlobRegistry::new(),
            tree: FolderNode::new(SESSION_ROOT, ""),
            stats: TreeStats::default(),
            selection: Selection::new(),
            filter: None,
            preview: None,
        }
    }
}

impl<D: ArchiveDecoder, E: ArchiveExporter> Session<D, E> {
    pub fn with_decoder<D2: ArchiveDecoder>(self, decoder: D2) -> Session<D2, E> {
        Session {
            options: self.options,
            decoder,
            exporter: self.exporter,
            progress: self.progress,
            notifier: self.notifier,
            cancel: self.cancel,
            blobs: self.blobs,
            tree: self.tree,
            stats: self.stats,
            selection: self.selection,
            filter: self.filter,
            preview: self.preview,
        }
    }

    pub fn with_exporter<E2: ArchiveExporter>(self, exporter: E2) -> Session<D, E2> {
        Session {
            options: self.options,
            decoder: self.decoder,
            exporter,
            progress: self.progress,
            notifier: self.notifier,
            cancel: self.cancel,
            blobs: self.blobs,
            tree: self.tree,
            stats: self.stats,
            selection: self.selection,
            filter: self.filter,
            preview: self.preview,
        }
    }

    pub fn with_progress(mut self, sink: impl ProgressSink + 'static) -> Self {
        self.progress = Box::new(sink);
        self
    }

    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Box::new(notifier);
        self
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// The combined tree; each loaded input is a top-level folder.
    pub fn tree(&self) -> &FolderNode {
        &self.tree
    }

    /// Counters summed over every input of the current batch.
    pub fn stats(&self) -> &TreeStats {
        &self.stats
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn filter(&self) -> Option<&FilterOutcome> {
        self.filter.as_ref()
    }

    pub fn preview(&self) -> Option<&PdfPreview> {
        self.preview.as_ref()
    }

    pub fn blobs(&self) -> &BlobRegistry {
        &self.blobs
    }

    /// A handle that cancels the running batch or export when raised.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Discards the tree, selection, filter and preview.
    pub fn reset(&mut self) {
        self.tree = FolderNode::new(SESSION_ROOT, "");
        self.stats = TreeStats::default();
        self.selection.clear();
        self.filter = None;
        self.preview = None;
        self.cancel.reset();
    }

    /// Loads a batch of archives, replacing whatever was loaded before.
    pub async fn load_archives(&mut self, inputs: Vec<InputArchive>) -> LoadReport {
        if inputs.is_empty() {
            return LoadReport::default();
        }
        let total = inputs.iter().filter_map(|i| i.payload.len_hint()).sum();
        if !self.confirm_size(total) {
            return LoadReport {
                declined: true,
                ..Default::default()
            };
        }
        let prepared = inputs.into_iter().map(PreparedInput::Archive).collect();
        self.run_batch(prepared).await
    }

    /// Loads files picked through a folder selection, replacing whatever was
    /// loaded before. Files are grouped by the selected folder they belong to
    /// (their first path segment) and each folder becomes one input.
    pub async fn load_folder(&mut self, files: Vec<FolderFile>) -> LoadReport {
        if files.is_empty() {
            return LoadReport::default();
        }
        let total = files.iter().filter_map(|f| f.payload.len_hint()).sum();
        if !self.confirm_size(total) {
            return LoadReport {
                declined: true,
                ..Default::default()
            };
        }
        let mut groups: Vec<(String, Vec<ArchiveEntry>)> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for file in files {
            let segments = path::segments(&file.relative_path);
            let Some((root, rest)) = segments.split_first() else {
                continue;
            };
            if rest.is_empty() {
                continue;
            }
            let slot = *index.entry(root.clone()).or_insert_with(|| {
                groups.push((root.clone(), Vec::new()));
                groups.len() - 1
            });
            groups[slot]
                .1
                .push(ArchiveEntry::file(path::join(rest), file.payload));
        }
        let prepared = groups
            .into_iter()
            .map(|(label, entries)| PreparedInput::Folder { label, entries })
            .collect();
        self.run_batch(prepared).await
    }

    async fn run_batch(&mut self, inputs: Vec<PreparedInput>) -> LoadReport {
        self.reset();
        let mut report = LoadReport::default();
        let count = inputs.len();
        for (i, input) in inputs.into_iter().enumerate() {
            let label = input.label().to_string();
            self.progress.report(&ProgressUpdate {
                stage: Stage::LoadingInput,
                percent: 100.0 * i as f64 / count as f64,
                detail: format!("Input {} of {}: {}", i + 1, count, label),
            });
            match self.build_input(input).await {
                Ok(tree) => {
                    let mounted = self.graft(tree);
                    tracing::debug!("Loaded {} as {}", label, mounted);
                    report.loaded.push(mounted);
                }
                Err(e) => {
                    tracing::warn!("Failed to load {}: {}", label, e);
                    self.notifier.notify(&e.notification(&label));
                    let cancelled = e.is_cancellation();
                    report.failed.push((label, e));
                    if cancelled {
                        report.cancelled = true;
                        break;
                    }
                }
            }
        }
        if !report.loaded.is_empty() {
            self.notifier.notify(&Notification::new(
                Severity::Success,
                "Processing complete",
                format!("{} input(s) processed successfully.", report.loaded.len()),
            ));
        }
        report
    }

    async fn build_input(&self, input: PreparedInput) -> Result<ArchiveTree, ZiptreeError> {
        let (label, entries) = match input {
            PreparedInput::Archive(archive) => {
                self.cancel.check()?;
                let entries = match self.decoder.decode(&archive.name, &archive.payload).await {
                    Err(ZiptreeError::EmptyArchive { name }) => {
                        return Err(ZiptreeError::EmptyInput { label: name });
                    }
                    other => other?,
                };
                (archive.name, entries)
            }
            PreparedInput::Folder { label, entries } => (label, entries),
        };
        TreeBuilder::new(&self.options, &self.decoder)?
            .with_progress(&*self.progress)
            .with_cancel(self.cancel.clone())
            .build_tree(entries, &label)
            .await
    }

    /// Mounts a built tree as a new top-level folder and returns its path.
    fn graft(&mut self, tree: ArchiveTree) -> String {
        let label = self.unique_label(tree.label());
        self.stats.absorb(&tree.stats);
        let folder = tree.into_folder(label.clone(), &label);
        self.tree.children.push(TreeNode::Folder(folder));
        label
    }

    fn unique_label(&self, label: &str) -> String {
        let taken = |candidate: &str| self.tree.children.iter().any(|c| c.name() == candidate);
        if !taken(label) {
            return label.to_string();
        }
        (2..)
            .map(|n| format!("{} ({})", label, n))
            .find(|candidate| !taken(candidate.as_str()))
            .unwrap_or_else(|| label.to_string())
    }

    fn confirm_size(&self, total_bytes: u64) -> bool {
        if total_bytes <= self.options.oversize_threshold {
            return true;
        }
        let warning = OversizeWarning {
            total_bytes,
            threshold: self.options.oversize_threshold,
        };
        let accepted = self.notifier.confirm(&warning.notification());
        if !accepted {
            tracing::info!("Oversize batch of {} bytes declined", total_bytes);
        }
        accepted
    }

    /// Applies a search term; a blank term clears the filter and collapses
    /// every folder. Returns the number of matching nodes.
    pub fn apply_filter(&mut self, term: &str) -> usize {
        match filter::search(&self.tree, term) {
            None => {
                self.filter = None;
                self.tree.for_each_folder_mut(&mut |folder| folder.expanded = false);
                0
            }
            Some(outcome) => {
                self.tree
                    .for_each_folder_mut(&mut |folder| folder.expanded = outcome.is_expanded(&folder.full_path));
                if !outcome.has_matches() {
                    self.notifier.notify(&Notification::new(
                        Severity::Info,
                        "No results found",
                        "No file or folder matches the search.",
                    ));
                }
                let matches = outcome.matches;
                self.filter = Some(outcome);
                matches
            }
        }
    }

    pub fn is_visible(&self, full_path: &str) -> bool {
        visible(&self.filter, full_path)
    }

    /// Opens or closes a folder and returns whether it is now expanded.
    pub fn toggle_folder(&mut self, full_path: &str) -> Result<bool, ZiptreeError> {
        let folder = self
            .tree
            .find_folder_mut(full_path)
            .ok_or_else(|| ZiptreeError::UnknownNode(full_path.to_string()))?;
        folder.expanded = !folder.expanded;
        Ok(folder.expanded)
    }

    pub fn select(&mut self, full_path: &str, checked: bool) -> Result<(), ZiptreeError> {
        self.selection.set(&self.tree, full_path, checked)
    }

    pub fn toggle_selection(&mut self, full_path: &str) -> Result<bool, ZiptreeError> {
        self.selection.toggle(&self.tree, full_path)
    }

    pub fn select_folder(&mut self, folder_path: &str, checked: bool) -> Result<usize, ZiptreeError> {
        let filter = &self.filter;
        self.selection
            .set_folder(&self.tree, folder_path, checked, |p| visible(filter, p))
    }

    pub fn select_all(&mut self, checked: bool) -> usize {
        let filter = &self.filter;
        self.selection
            .set_all(&self.tree, checked, |p| visible(filter, p))
    }

    pub fn folder_state(&self, folder_path: &str) -> Option<CheckState> {
        self.selection
            .folder_state(&self.tree, folder_path, |p| self.is_visible(p))
    }

    pub fn global_state(&self) -> CheckState {
        self.selection.global_state(&self.tree, |p| self.is_visible(p))
    }

    /// Reads a PDF into a preview blob, releasing the previous preview.
    pub fn open_pdf(&mut self, full_path: &str) -> Result<&PdfPreview, ZiptreeError> {
        let (name, payload) = match self.tree.find(full_path).and_then(TreeNode::as_file) {
            Some(file) if file.kind == FileKind::Pdf => (file.name.clone(), file.payload.clone()),
            Some(_) => return Err(ZiptreeError::NotAPdf(full_path.to_string())),
            None => return Err(ZiptreeError::UnknownNode(full_path.to_string())),
        };
        let bytes = payload
            .ok_or_else(|| ZiptreeError::payload(&name, "entry has no content"))
            .and_then(|p| p.read());
        let bytes = match bytes {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Could not open {}: {}", full_path, e);
                self.notifier.notify(&e.notification(&name));
                return Err(e);
            }
        };
        self.preview = None;
        let blob = self.blobs.register(bytes, PDF_MIME);
        Ok(&*self.preview.insert(PdfPreview {
            full_path: full_path.to_string(),
            name,
            blob,
        }))
    }

    pub fn close_preview(&mut self) {
        self.preview = None;
    }

    /// Bundles the selected PDFs, in tree order, into a new archive. PDFs whose
    /// content cannot be read are skipped; the rest are numbered
    /// consecutively.
    pub async fn export_selected(&self) -> Result<ExportArchive, ZiptreeError> {
        match self.export_inner().await {
            Ok(archive) => {
                self.notifier.notify(&Notification::new(
                    Severity::Success,
                    "Download ready",
                    format!("{} file(s) were exported.", archive.included.len()),
                ));
                Ok(archive)
            }
            Err(e) => {
                tracing::warn!("Export failed: {}", e);
                self.notifier.notify(&e.notification("the export"));
                Err(e)
            }
        }
    }

    async fn export_inner(&self) -> Result<ExportArchive, ZiptreeError> {
        let selected: Vec<(String, String, Option<Payload>)> = self
            .selection
            .selected_files(&self.tree)
            .into_iter()
            .map(|f| (f.full_path.clone(), f.name.clone(), f.payload.clone()))
            .collect();
        if selected.is_empty() {
            return Err(ZiptreeError::NothingSelected);
        }
        let tracker = ProgressTracker::new(&*self.progress);
        let total = selected.len();
        tracker.report(Stage::PreparingExport, 0.0, format!("0 of {} files", total));

        let mut items = Vec::with_capacity(total);
        let mut included = Vec::with_capacity(total);
        let mut skipped = Vec::new();
        for (done, (full_path, name, payload)) in selected.into_iter().enumerate() {
            self.cancel.check()?;
            let bytes = payload
                .ok_or_else(|| ZiptreeError::payload(&name, "entry has no content"))
                .and_then(|p| p.read());
            match bytes {
                Ok(bytes) => {
                    items.push(ExportItem {
                        name: format!("{}_{}.pdf", self.options.export_entry_prefix, items.len() + 1),
                        bytes,
                    });
                    included.push(full_path);
                }
                Err(e) => {
                    tracing::warn!("Skipping {} in export: {}", full_path, e);
                    skipped.push((full_path, e));
                }
            }
            tracker.report(
                Stage::PreparingExport,
                90.0 * (done + 1) as f64 / total as f64,
                format!("{} of {} files", done + 1, total),
            );
            tokio::task::yield_now().await;
        }

        tracker.report(Stage::GeneratingArchive, 95.0, "Generating ZIP archive");
        let output = self.exporter.export(items).await?;
        tracker.report(Stage::Done, 100.0, "Export complete");

        let file_name = format!(
            "{}_{}.zip",
            self.options.export_archive_prefix,
            chrono::Local::now().format("%Y-%m-%d")
        );
        Ok(ExportArchive {
            file_name,
            blob: self.blobs.register(output.bytes, ZIP_MIME),
            included,
            skipped,
        })
    }
}

fn visible(filter: &Option<FilterOutcome>, full_path: &str) -> bool {
    filter.as_ref().is_none_or(|f| f.is_visible(full_path))
}
