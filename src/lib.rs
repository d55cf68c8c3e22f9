//! # Ziptree
//!
//! `ziptree` turns ZIP archives and folder selections into a browsable tree of
//! folders and files. Nested `.zip` files found inside an archive are expanded
//! in place, PDFs can be searched, selected, previewed and bundled into a new
//! archive, and macOS metadata (`__MACOSX`, `.DS_Store`) is ignored.
//!
//! Trees are built cooperatively: long inputs are processed in chunks with a
//! yield between them, progress is reported through a [`ProgressSink`], and a
//! [`CancelFlag`] stops the work between chunks.
//!
//! # Example
//!
//! ```no_run
//! use ziptree::{BuildOptionsBuilder, InputArchive, Session};
//!
//! # async fn run() {
//! let options = BuildOptionsBuilder::new().max_nesting(4).build();
//! let mut session = Session::new(options);
//!
//! let report = session
//!     .load_archives(vec![InputArchive::from_path("documents.zip")])
//!     .await;
//! println!("loaded: {:?}", report.loaded);
//!
//! session.apply_filter("invoice");
//! session.select_all(true);
//! let export = session.export_selected().await.expect("nothing to export");
//! println!("{} ({} bytes)", export.file_name, export.blob.len());
//! # }
//! ```

mod archive;
mod blob;
mod cancel;
mod engine;
mod error;
mod export;
mod filter;
mod notify;
mod options;
pub mod output;
pub mod path;
mod progress;
mod selection;
mod session;
mod source;
mod tree;
mod types;

pub use archive::{ArchiveDecoder, ZipDecoder, decode_zip};
pub use blob::{Blob, BlobRegistry, PDF_MIME, ZIP_MIME};
pub use cancel::CancelFlag;
pub use engine::{TreeBuilder, build_tree};
pub use error::ZiptreeError;
pub use export::{ArchiveExporter, ExportItem, ExportOutput, ZipExporter};
pub use filter::{FilterOutcome, fold, search};
pub use notify::{Notification, Notifier, OversizeWarning, Severity, Silent};
pub use options::{BuildOptions, BuildOptionsBuilder, DEFAULT_OVERSIZE_THRESHOLD};
pub use progress::{NoProgress, ProgressSink, ProgressUpdate, Stage};
pub use selection::{CheckState, Selection};
pub use session::{ExportArchive, LoadReport, PdfPreview, SESSION_ROOT, Session};
pub use source::{FileSource, FolderFile, InputArchive, MemorySource, ZipEntrySource, collect_folder};
pub use types::{
    Annotation, ArchiveEntry, ArchiveTree, ByteSource, FileFamily, FileKind, FileNode, FolderNode, Payload,
    TreeNode, TreeStats, Walk,
};
