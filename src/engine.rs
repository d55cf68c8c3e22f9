use crate::archive::{ArchiveDecoder, ZipDecoder};
use crate::cancel::CancelFlag;
use crate::error::ZiptreeError;
use crate::options::BuildOptions;
use crate::path::{self, ArtifactFilter};
use crate::progress::{NoProgress, ProgressSink, ProgressTracker, Stage};
use crate::tree::{PendingFile, TreeArena};
use crate::types::{Annotation, ArchiveEntry, ArchiveTree, FileKind, FileNode, TreeNode, TreeStats};
use std::future::Future;
use std::pin::Pin;

type NestedBuild<'b> = Pin<Box<dyn Future<Output = Result<ArchiveTree, ZiptreeError>> + 'b>>;

/// Builds [`ArchiveTree`]s from flat entry lists, expanding nested archives
/// through its decoder.
///
/// Work is split into chunks; after each chunk the builder reports progress,
/// checks its [`CancelFlag`] and yields to the runtime so other tasks on the
/// same thread get to run.
pub struct TreeBuilder<'a, D: ArchiveDecoder = ZipDecoder> {
    options: &'a BuildOptions,
    decoder: &'a D,
    filter: ArtifactFilter,
    progress: &'a dyn ProgressSink,
    cancel: CancelFlag,
}

impl<'a, D: ArchiveDecoder> TreeBuilder<'a, D> {
    pub fn new(options: &'a BuildOptions, decoder: &'a D) -> Result<Self, ZiptreeError> {
        Ok(Self {
            options,
            decoder,
            filter: ArtifactFilter::new(&options.ignore_patterns)?,
            progress: &NoProgress,
            cancel: CancelFlag::new(),
        })
    }

    pub fn with_progress(mut self, sink: &'a dyn ProgressSink) -> Self {
        self.progress = sink;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Builds the tree for one input, labelling its synthetic root `root_label`.
    ///
    /// # Errors
    ///
    /// [`ZiptreeError::EmptyInput`] when `entries` is empty or nothing usable is
    /// left after filtering, [`ZiptreeError::Cancelled`] when the flag is raised.
    /// Nested archives that fail to expand are annotated in place instead.
    pub async fn build_tree(
        &self,
        entries: Vec<ArchiveEntry>,
        root_label: &str,
    ) -> Result<ArchiveTree, ZiptreeError> {
        let tracker = ProgressTracker::new(self.progress);
        let tree = self.build_level(entries, root_label, 0, Some(&tracker)).await?;
        if !self.options.milestone_pause.is_zero() {
            tokio::time::sleep(self.options.milestone_pause).await;
        }
        Ok(tree)
    }

    async fn build_level(
        &self,
        entries: Vec<ArchiveEntry>,
        root_label: &str,
        depth: usize,
        tracker: Option<&ProgressTracker<'_>>,
    ) -> Result<ArchiveTree, ZiptreeError> {
        let total = entries.len();
        if total == 0 {
            return Err(ZiptreeError::EmptyInput {
                label: root_label.to_string(),
            });
        }
        tracing::debug!("Building tree {} from {} entries (depth {})", root_label, total, depth);
        emit(tracker, Stage::Analyzing, 0.0, || {
            format!("0 of {} entries processed", total)
        });

        let chunk = self.options.chunk_size(total);
        let mut arena = TreeArena::new(root_label);
        let mut stats = TreeStats::default();
        let mut processed = 0;
        for batch in entries.chunks(chunk) {
            for entry in batch {
                self.place_entry(&mut arena, entry, &mut stats);
            }
            processed += batch.len();
            emit(
                tracker,
                Stage::ProcessingEntries,
                90.0 * processed as f64 / total as f64,
                || format!("{} of {} entries processed", processed, total),
            );
            self.yield_point().await?;
        }
        drop(entries);

        if arena.is_empty() {
            return Err(ZiptreeError::EmptyInput {
                label: root_label.to_string(),
            });
        }

        let buckets = arena.take_buckets();
        let total_buckets = buckets.len();
        let bucket_chunk = self.options.chunk_size(total_buckets);
        emit(tracker, Stage::BuildingInterface, 90.0, || {
            "Organizing files and folders".to_string()
        });
        for (i, bucket) in buckets.into_iter().enumerate() {
            tracing::trace!("Finalizing {} file(s) in '{}'", bucket.files.len(), bucket.parent_path);
            for id in bucket.files {
                if let Some(pending) = arena.take_pending(id) {
                    let shadowed = arena.has_folder(&pending.full_path);
                    let node = self.finalize_file(pending, depth, shadowed, &mut stats).await?;
                    arena.resolve(id, node);
                }
            }
            let done = i + 1;
            if done % bucket_chunk == 0 || done == total_buckets {
                emit(
                    tracker,
                    Stage::BuildingInterface,
                    90.0 + 10.0 * done as f64 / total_buckets as f64,
                    || format!("{} of {} folders processed", done, total_buckets),
                );
                self.yield_point().await?;
            }
        }

        stats.folders += arena.folder_count();
        let root = arena.into_root();
        emit(tracker, Stage::Done, 100.0, || "Processing complete".to_string());
        Ok(ArchiveTree { root, stats })
    }

    fn place_entry(&self, arena: &mut TreeArena, entry: &ArchiveEntry, stats: &mut TreeStats) {
        let segments = entry.segments();
        if self.filter.is_artifact(&segments) {
            stats.artifacts_skipped += 1;
            return;
        }
        let Some((name, parent)) = segments.split_last() else {
            return;
        };
        if entry.is_directory {
            arena.ensure_folder(&segments);
        } else {
            arena.add_file(parent, name, entry.payload.clone());
        }
    }

    /// Turns a pending file into its node. `shadowed` means other entries
    /// already built a folder at the file's path; a nested archive there is
    /// left unexpanded so the folder path stays unique.
    async fn finalize_file(
        &self,
        pending: PendingFile,
        depth: usize,
        shadowed: bool,
        stats: &mut TreeStats,
    ) -> Result<TreeNode, ZiptreeError> {
        let mut kind = path::classify(&pending.name);
        let mut annotation = None;
        if kind == FileKind::NestedArchive && shadowed {
            tracing::warn!("Not expanding {}: a folder with that path already exists", pending.full_path);
            stats.nested_failed += 1;
            kind = FileKind::Generic;
            annotation = Some(Annotation::PathConflict);
        } else if kind == FileKind::NestedArchive {
            match self.expand_nested(&pending, depth + 1).await {
                Ok(nested) => {
                    stats.nested_expanded += 1;
                    stats.folders += 1;
                    stats.absorb(&nested.stats);
                    let folder = nested.into_folder(pending.name.clone(), &pending.full_path);
                    return Ok(TreeNode::Folder(folder));
                }
                Err(e) if e.is_cancellation() => return Err(e),
                Err(e) => {
                    tracing::warn!("Could not expand nested archive {}: {}", pending.full_path, e);
                    stats.nested_failed += 1;
                    kind = FileKind::Generic;
                    annotation = Some(annotation_for(&e));
                }
            }
        }
        stats.files += 1;
        if kind == FileKind::Pdf {
            stats.pdfs += 1;
        }
        Ok(TreeNode::File(FileNode {
            name: pending.name,
            full_path: pending.full_path,
            kind,
            annotation,
            payload: pending.payload,
        }))
    }

    fn expand_nested<'b>(&'b self, pending: &'b PendingFile, depth: usize) -> NestedBuild<'b> {
        Box::pin(async move {
            if depth > self.options.max_nesting {
                return Err(ZiptreeError::TooDeeplyNested {
                    name: pending.full_path.clone(),
                    limit: self.options.max_nesting,
                });
            }
            self.cancel.check()?;
            let payload = pending
                .payload
                .as_ref()
                .ok_or_else(|| ZiptreeError::payload(&pending.full_path, "entry has no content"))?;
            let entries = self.decoder.decode(&pending.name, payload).await?;
            if entries.is_empty() {
                return Err(ZiptreeError::EmptyArchive {
                    name: pending.name.clone(),
                });
            }
            self.cancel.check()?;
            match self.build_level(entries, &pending.name, depth, None).await {
                Err(ZiptreeError::EmptyInput { .. }) => Err(ZiptreeError::EmptyArchive {
                    name: pending.name.clone(),
                }),
                other => other,
            }
        })
    }

    async fn yield_point(&self) -> Result<(), ZiptreeError> {
        self.cancel.check()?;
        tokio::task::yield_now().await;
        self.cancel.check()
    }
}

fn emit(tracker: Option<&ProgressTracker<'_>>, stage: Stage, percent: f64, detail: impl FnOnce() -> String) {
    if let Some(tracker) = tracker {
        tracker.report(stage, percent, detail());
    }
}

fn annotation_for(error: &ZiptreeError) -> Annotation {
    match error {
        ZiptreeError::EmptyArchive { .. } | ZiptreeError::EmptyInput { .. } => Annotation::EmptyArchive,
        ZiptreeError::TooDeeplyNested { limit, .. } => Annotation::TooDeeplyNested { limit: *limit },
        other => Annotation::CorruptArchive {
            detail: other.to_string(),
        },
    }
}

/// Builds a tree with default options, decoding nested archives as ZIP.
pub async fn build_tree(
    entries: Vec<ArchiveEntry>,
    root_label: &str,
) -> Result<ArchiveTree, ZiptreeError> {
    let options = BuildOptions::default();
    TreeBuilder::new(&options, &ZipDecoder)?
        .build_tree(entries, root_label)
        .await
}
