//! Byte sources backing [`Payload`]s, and collection of folder inputs from disk.

use crate::error::ZiptreeError;
use crate::types::{ByteSource, Payload};
use ignore::WalkBuilder;
use std::fmt;
use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Bytes already held in memory.
#[derive(Debug, Clone)]
pub struct MemorySource {
    bytes: Arc<[u8]>,
}

impl MemorySource {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        let bytes: Vec<u8> = bytes.into();
        Self {
            bytes: bytes.into(),
        }
    }
}

impl ByteSource for MemorySource {
    fn read_bytes(&self) -> Result<Vec<u8>, ZiptreeError> {
        Ok(self.bytes.to_vec())
    }
    fn len_hint(&self) -> Option<u64> {
        Some(self.bytes.len() as u64)
    }
}

/// A file on disk, read when first needed.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    len: Option<u64>,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let len = fs::metadata(&path).ok().map(|m| m.len());
        Self { path, len }
    }
}

impl ByteSource for FileSource {
    fn read_bytes(&self) -> Result<Vec<u8>, ZiptreeError> {
        fs::read(&self.path).map_err(|e| ZiptreeError::payload(self.path.display().to_string(), e))
    }
    fn len_hint(&self) -> Option<u64> {
        self.len
    }
}

/// A parsed ZIP archive held in memory. Clones share the buffer and the
/// central directory.
pub(crate) type SharedZip = zip::ZipArchive<Cursor<Arc<[u8]>>>;

/// Upper bound on the buffer reserved up front for one entry. Header sizes
/// are untrusted, so anything above this grows as data actually arrives.
const MAX_PREALLOC: u64 = 1 << 20;

/// One entry of a ZIP archive whose bytes are held in memory.
///
/// Every entry of an archive shares one parsed copy of it, so reading an
/// entry only decompresses that entry.
#[derive(Clone)]
pub struct ZipEntrySource {
    archive: SharedZip,
    index: usize,
    name: String,
    size: u64,
}

impl ZipEntrySource {
    pub(crate) fn new(archive: SharedZip, index: usize, name: String, size: u64) -> Self {
        Self {
            archive,
            index,
            name,
            size,
        }
    }
}

impl fmt::Debug for ZipEntrySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZipEntrySource")
            .field("index", &self.index)
            .field("name", &self.name)
            .field("size", &self.size)
            .finish()
    }
}

impl ByteSource for ZipEntrySource {
    fn read_bytes(&self) -> Result<Vec<u8>, ZiptreeError> {
        let mut archive = self.archive.clone();
        let mut file = archive
            .by_index(self.index)
            .map_err(|e| ZiptreeError::payload(&self.name, e))?;
        let mut out = Vec::with_capacity(self.size.min(MAX_PREALLOC) as usize);
        file.read_to_end(&mut out)
            .map_err(|e| ZiptreeError::payload(&self.name, e))?;
        Ok(out)
    }
    fn len_hint(&self) -> Option<u64> {
        Some(self.size)
    }
}

/// A file picked through a folder selection, with its path relative to the
/// directory the selection was made from (the selected folder's own name is
/// the first segment).
#[derive(Debug, Clone)]
pub struct FolderFile {
    pub relative_path: String,
    pub payload: Payload,
}

/// A top-level archive handed to a session.
#[derive(Debug, Clone)]
pub struct InputArchive {
    pub name: String,
    pub payload: Payload,
}

impl InputArchive {
    pub fn new(name: impl Into<String>, payload: Payload) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }

    /// An archive file on disk, named after its file name.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::new(name, Payload::new(FileSource::new(path)))
    }
}

/// Collects every file below `root` the way a browser folder picker reports
/// them: paths relative to `root`'s parent, so the first segment is the
/// folder's own name.
///
/// Nothing is skipped here; platform artifacts are filtered by the builder.
pub fn collect_folder(root: impl AsRef<Path>) -> Result<Vec<FolderFile>, ZiptreeError> {
    let root = root.as_ref();
    let folder_name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| ZiptreeError::Walk(format!("{} has no folder name", root.display())))?;
    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();
    let mut files = Vec::new();
    for result in walker {
        let entry = result.map_err(|e| ZiptreeError::Walk(e.to_string()))?;
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let relative = entry.path().strip_prefix(root).map_err(|e| {
            ZiptreeError::Walk(format!("{}: {}", entry.path().display(), e))
        })?;
        let mut relative_path = folder_name.clone();
        for component in relative.components() {
            relative_path.push('/');
            relative_path.push_str(&component.as_os_str().to_string_lossy());
        }
        files.push(FolderFile {
            relative_path,
            payload: Payload::new(FileSource::new(entry.path())),
        });
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_source_reports_missing_file() {
        let source = FileSource::new("/definitely/not/here.pdf");
        let err = source.read_bytes().unwrap_err();
        assert!(matches!(err, ZiptreeError::PayloadRead { .. }));
        assert_eq!(source.len_hint(), None);
    }

    fn one_entry_zip(name: &str, content: &[u8]) -> SharedZip {
        use std::io::Write;
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file(name, zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(content).unwrap();
        let bytes: Arc<[u8]> = writer.finish().unwrap().into_inner().into();
        zip::ZipArchive::new(Cursor::new(bytes)).unwrap()
    }

    #[test]
    fn bogus_header_size_does_not_reserve_memory() {
        let source = ZipEntrySource::new(one_entry_zip("a.pdf", b"%PDF-1.7"), 0, "a.pdf".into(), u64::MAX);
        assert_eq!(source.len_hint(), Some(u64::MAX));
        assert_eq!(source.read_bytes().unwrap(), b"%PDF-1.7");
    }

    #[test]
    fn entries_of_one_archive_read_independently() {
        let archive = one_entry_zip("a.pdf", b"%PDF-a");
        let first = ZipEntrySource::new(archive.clone(), 0, "a.pdf".into(), 6);
        let second = ZipEntrySource::new(archive, 0, "a.pdf".into(), 6);
        assert_eq!(first.read_bytes().unwrap(), b"%PDF-a");
        assert_eq!(second.read_bytes().unwrap(), b"%PDF-a");
        assert_eq!(first.read_bytes().unwrap(), b"%PDF-a");
        let missing = ZipEntrySource::new(one_entry_zip("b.pdf", b"x"), 3, "b.pdf".into(), 1);
        assert!(matches!(missing.read_bytes(), Err(ZiptreeError::PayloadRead { .. })));
    }

    #[test]
    fn collect_folder_prefixes_folder_name() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("scans");
        fs::create_dir_all(root.join("2020")).unwrap();
        fs::write(root.join("a.pdf"), b"%PDF-a").unwrap();
        fs::write(root.join("2020/b.pdf"), b"%PDF-b").unwrap();
        let files = collect_folder(&root).unwrap();
        let paths: Vec<_> = files.iter().map(|f| f.relative_path.as_str()).collect();
        assert_eq!(paths, vec!["scans/2020/b.pdf", "scans/a.pdf"]);
        assert_eq!(files[1].payload.read().unwrap(), b"%PDF-a");
    }
}
