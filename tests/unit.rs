use std::cell::RefCell;
use std::io::{Cursor, Write};
use std::rc::Rc;
use zip::{CompressionMethod, ZipWriter};
use zip::write::SimpleFileOptions;
use ziptree::{
    Annotation, ArchiveDecoder, ArchiveEntry, BuildOptionsBuilder, CancelFlag, FileKind, FolderNode,
    Payload, ProgressUpdate, Stage, TreeBuilder, TreeNode, ZipDecoder, ZiptreeError, build_tree,
    decode_zip, path,
};

fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, SimpleFileOptions::default()).unwrap();
        } else {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(data).unwrap();
        }
    }
    writer.finish().unwrap().into_inner()
}

fn entries(paths: &[&str]) -> Vec<ArchiveEntry> {
    paths
        .iter()
        .map(|p| ArchiveEntry::new(*p, Some(Payload::from_bytes(p.as_bytes().to_vec()))))
        .collect()
}

fn names(folder: &FolderNode) -> Vec<&str> {
    folder.children.iter().map(TreeNode::name).collect()
}

#[tokio::test]
async fn test_scenario_tree() {
    let tree = build_tree(
        entries(&["docs/a.pdf", "docs/sub/b.pdf", "img/c.png", "__MACOSX/._a.pdf"]),
        "bundle.zip",
    )
    .await
    .unwrap();
    assert_eq!(tree.label(), "bundle.zip");
    assert_eq!(names(&tree.root), vec!["docs", "img"]);
    assert_eq!(names(tree.root.find_folder("docs").unwrap()), vec!["a.pdf", "sub"]);
    assert!(tree.find("docs/a.pdf").unwrap().is_pdf());
    assert!(tree.find("docs/sub/b.pdf").unwrap().is_pdf());
    let png = tree.find("img/c.png").unwrap().as_file().unwrap();
    assert_eq!(png.kind, FileKind::Generic);
    assert!(tree.root.walk().all(|n| !n.full_path().contains("__MACOSX")));
    assert_eq!(tree.stats.artifacts_skipped, 1);
    assert_eq!(tree.stats.pdfs, 2);
}

#[tokio::test]
async fn test_folders_are_deduplicated() {
    let tree = build_tree(entries(&["a/b/c.txt", "a/", "a/b/d.txt", "a/b/"]), "x")
        .await
        .unwrap();
    let folders: Vec<_> = tree
        .root
        .walk()
        .filter_map(TreeNode::as_folder)
        .map(|f| f.full_path.as_str())
        .collect();
    assert_eq!(folders, vec!["a", "a/b"]);
    assert_eq!(names(tree.root.find_folder("a/b").unwrap()), vec!["c.txt", "d.txt"]);
}

#[tokio::test]
async fn test_children_keep_encounter_order() {
    let tree = build_tree(
        entries(&["top/z.pdf", "top/m/", "top/a.txt", "top/b/x.pdf", "top/m/y.pdf"]),
        "x",
    )
    .await
    .unwrap();
    assert_eq!(
        names(tree.root.find_folder("top").unwrap()),
        vec!["z.pdf", "m", "a.txt", "b"]
    );
}

#[tokio::test]
async fn test_artifacts_never_reach_the_tree() {
    let tree = build_tree(
        entries(&[
            "__MACOSX/docs/._a.pdf",
            "docs/.DS_Store",
            "docs/a.pdf",
            "docs/__MACOSX/b.pdf",
        ]),
        "x",
    )
    .await
    .unwrap();
    let paths: Vec<_> = tree.root.walk().map(TreeNode::full_path).collect();
    assert_eq!(paths, vec!["docs", "docs/a.pdf"]);
    assert_eq!(tree.stats.artifacts_skipped, 3);
}

#[tokio::test]
async fn test_ignore_patterns() {
    let options = BuildOptionsBuilder::new()
        .ignore_patterns(vec!["*.tmp".into()])
        .build();
    let tree = TreeBuilder::new(&options, &ZipDecoder)
        .unwrap()
        .build_tree(entries(&["docs/a.pdf", "docs/scratch.tmp"]), "x")
        .await
        .unwrap();
    assert!(tree.find("docs/scratch.tmp").is_none());
    assert!(tree.find("docs/a.pdf").is_some());
}

#[test]
fn test_invalid_ignore_pattern() {
    let options = BuildOptionsBuilder::new()
        .ignore_patterns(vec!["[".into()])
        .build();
    assert!(matches!(
        TreeBuilder::new(&options, &ZipDecoder),
        Err(ZiptreeError::InvalidPattern(_))
    ));
}

#[test]
fn test_classification() {
    assert_eq!(path::classify("REPORT.PDF"), FileKind::Pdf);
    assert_eq!(path::classify("archive.ZIP"), FileKind::NestedArchive);
    assert_eq!(path::classify("notes.txt"), FileKind::Generic);
}

#[tokio::test]
async fn test_nested_archive_becomes_folder() {
    let inner = zip_bytes(&[("one.pdf", b"%PDF-1"), ("two.pdf", b"%PDF-2")]);
    let outer = zip_bytes(&[("docs/inner.zip", &inner), ("docs/readme.txt", b"hi")]);
    let tree = build_tree(decode_zip("outer.zip", outer.into()).unwrap(), "outer.zip")
        .await
        .unwrap();

    let nested = tree.root.find_folder("docs/inner.zip").unwrap();
    assert_eq!(nested.name, "inner.zip");
    assert_eq!(nested.children.len(), 2);
    assert!(nested.children.iter().all(TreeNode::is_pdf));
    let two = tree.find("docs/inner.zip/two.pdf").unwrap().as_file().unwrap();
    assert_eq!(two.payload.as_ref().unwrap().read().unwrap(), b"%PDF-2");
    assert_eq!(names(tree.root.find_folder("docs").unwrap()), vec!["inner.zip", "readme.txt"]);
    assert_eq!(tree.stats.nested_expanded, 1);
}

#[tokio::test]
async fn test_empty_input_fails() {
    assert!(matches!(
        build_tree(Vec::new(), "empty.zip").await,
        Err(ZiptreeError::EmptyInput { .. })
    ));
    assert!(matches!(
        build_tree(entries(&["__MACOSX/._x", ".DS_Store"]), "junk.zip").await,
        Err(ZiptreeError::EmptyInput { .. })
    ));
}

#[tokio::test]
async fn test_corrupt_nested_archive_is_annotated() {
    let tree = build_tree(
        vec![
            ArchiveEntry::file("docs/a.pdf", Payload::from_bytes(b"%PDF".to_vec())),
            ArchiveEntry::file("docs/broken.zip", Payload::from_bytes(b"not a zip".to_vec())),
            ArchiveEntry::file("docs/b.pdf", Payload::from_bytes(b"%PDF".to_vec())),
        ],
        "x",
    )
    .await
    .unwrap();
    assert_eq!(
        names(tree.root.find_folder("docs").unwrap()),
        vec!["a.pdf", "broken.zip", "b.pdf"]
    );
    let broken = tree.find("docs/broken.zip").unwrap().as_file().unwrap();
    assert!(matches!(broken.annotation, Some(Annotation::CorruptArchive { .. })));
    assert_eq!(tree.stats.nested_failed, 1);
}

#[tokio::test]
async fn test_empty_nested_archive_is_annotated() {
    let empty = zip_bytes(&[]);
    let only_junk = zip_bytes(&[("__MACOSX/._a.pdf", b"x")]);
    let tree = build_tree(
        vec![
            ArchiveEntry::file("empty.zip", Payload::from_bytes(empty)),
            ArchiveEntry::file("junk.zip", Payload::from_bytes(only_junk)),
        ],
        "x",
    )
    .await
    .unwrap();
    for path in ["empty.zip", "junk.zip"] {
        let file = tree.find(path).unwrap().as_file().unwrap();
        assert_eq!(file.annotation, Some(Annotation::EmptyArchive));
    }
}

#[tokio::test]
async fn test_nesting_limit() {
    let level2 = zip_bytes(&[("deep.pdf", b"%PDF")]);
    let level1 = zip_bytes(&[("level2.zip", &level2), ("shallow.pdf", b"%PDF")]);
    let options = BuildOptionsBuilder::new().max_nesting(1).build();
    let tree = TreeBuilder::new(&options, &ZipDecoder)
        .unwrap()
        .build_tree(
            vec![ArchiveEntry::file("level1.zip", Payload::from_bytes(level1))],
            "x",
        )
        .await
        .unwrap();
    assert!(tree.find("level1.zip/shallow.pdf").unwrap().is_pdf());
    let capped = tree.find("level1.zip/level2.zip").unwrap().as_file().unwrap();
    assert_eq!(capped.annotation, Some(Annotation::TooDeeplyNested { limit: 1 }));
    assert!(tree.find("level1.zip/level2.zip/deep.pdf").is_none());
}

#[tokio::test]
async fn test_archive_shadowed_by_folder_stays_a_file() {
    let inner = zip_bytes(&[("one.pdf", b"%PDF-1")]);
    let tree = build_tree(
        vec![
            ArchiveEntry::file("docs/x.zip", Payload::from_bytes(inner)),
            ArchiveEntry::file("docs/x.zip/a.pdf", Payload::from_bytes(b"%PDF-a".to_vec())),
        ],
        "x",
    )
    .await
    .unwrap();
    let folders = tree
        .root
        .walk()
        .filter(|n| matches!(n, TreeNode::Folder(_)) && n.full_path() == "docs/x.zip")
        .count();
    assert_eq!(folders, 1);
    assert!(tree.find("docs/x.zip/a.pdf").unwrap().is_pdf());
    assert!(tree.find("docs/x.zip/one.pdf").is_none());
    let archive = tree
        .root
        .walk()
        .filter_map(TreeNode::as_file)
        .find(|f| f.full_path == "docs/x.zip")
        .unwrap();
    assert_eq!(archive.kind, FileKind::Generic);
    assert_eq!(archive.annotation, Some(Annotation::PathConflict));
    assert_eq!(tree.stats.nested_failed, 1);
}

/// A stored ZIP64 entry whose extra fields claim `claimed` uncompressed bytes.
fn zip64_claiming(name: &str, data: &[u8], claimed: u64) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .large_file(true);
    writer.start_file(name, options).unwrap();
    writer.write_all(data).unwrap();
    let mut bytes = writer.finish().unwrap().into_inner();
    // ZIP64 extra field: id 0x0001, data length, then the uncompressed size.
    let actual = (data.len() as u64).to_le_bytes();
    let mut patched = 0;
    let mut i = 0;
    while i + 12 <= bytes.len() {
        if bytes[i..i + 2] == [0x01, 0x00] && bytes[i + 2] >= 8 && bytes[i + 3] == 0 && bytes[i + 4..i + 12] == actual {
            bytes[i + 4..i + 12].copy_from_slice(&claimed.to_le_bytes());
            patched += 1;
            i += 12;
        } else {
            i += 1;
        }
    }
    assert!(patched >= 1);
    bytes
}

#[tokio::test]
async fn test_absurd_entry_size_is_contained() {
    let claimed = 0x7fff_ffff_ffff_ffff;
    let bytes = zip64_claiming("deeper.zip", &[0x2a; 300], claimed);

    if let Ok(entries) = decode_zip("holder.zip", bytes.clone().into()) {
        let payload = entries[0].payload.as_ref().unwrap();
        match payload.read() {
            Ok(data) => assert_eq!(data.len(), 300),
            Err(e) => assert!(matches!(e, ZiptreeError::PayloadRead { .. })),
        }
    }

    let tree = build_tree(
        vec![
            ArchiveEntry::file("bundle/inner.zip", Payload::from_bytes(bytes)),
            ArchiveEntry::file("bundle/keep.pdf", Payload::from_bytes(b"%PDF".to_vec())),
        ],
        "x",
    )
    .await
    .unwrap();
    let broken = tree
        .find("bundle/inner.zip/deeper.zip")
        .or_else(|| tree.find("bundle/inner.zip"))
        .and_then(TreeNode::as_file)
        .unwrap();
    assert!(matches!(broken.annotation, Some(Annotation::CorruptArchive { .. })));
    assert!(tree.find("bundle/keep.pdf").unwrap().is_pdf());
}

#[derive(Default)]
struct CountingDecoder {
    calls: RefCell<Vec<String>>,
}

impl ArchiveDecoder for CountingDecoder {
    async fn decode(&self, name: &str, _payload: &Payload) -> Result<Vec<ArchiveEntry>, ZiptreeError> {
        self.calls.borrow_mut().push(name.to_string());
        Ok(vec![ArchiveEntry::file(
            "inside.pdf",
            Payload::from_bytes(b"%PDF".to_vec()),
        )])
    }
}

#[tokio::test]
async fn test_custom_decoder_expands_nested() {
    let decoder = CountingDecoder::default();
    let options = BuildOptionsBuilder::new().build();
    let tree = TreeBuilder::new(&options, &decoder)
        .unwrap()
        .build_tree(entries(&["a/first.zip", "b/second.ZIP"]), "x")
        .await
        .unwrap();
    assert_eq!(*decoder.calls.borrow(), vec!["first.zip", "second.ZIP"]);
    assert!(tree.find("b/second.ZIP/inside.pdf").unwrap().is_pdf());
}

#[tokio::test]
async fn test_progress_is_monotonic() {
    let paths: Vec<String> = (0..250).map(|i| format!("dir{}/file{}.pdf", i % 7, i)).collect();
    let refs: Vec<&str> = paths.iter().map(String::as_str).collect();
    let seen: Rc<RefCell<Vec<ProgressUpdate>>> = Rc::default();
    let sink = {
        let seen = Rc::clone(&seen);
        move |u: &ProgressUpdate| seen.borrow_mut().push(u.clone())
    };
    let options = BuildOptionsBuilder::new().build();
    TreeBuilder::new(&options, &ZipDecoder)
        .unwrap()
        .with_progress(&sink)
        .build_tree(entries(&refs), "x")
        .await
        .unwrap();

    let seen = seen.borrow();
    assert_eq!(seen.first().unwrap().stage, Stage::Analyzing);
    assert_eq!(seen.first().unwrap().percent, 0.0);
    let last = seen.last().unwrap();
    assert_eq!(last.stage, Stage::Done);
    assert_eq!(last.percent, 100.0);
    assert!(seen.windows(2).all(|w| w[0].percent <= w[1].percent));
    // 250 entries in chunks of 12.
    let processing = seen.iter().filter(|u| u.stage == Stage::ProcessingEntries).count();
    assert_eq!(processing, 21);
    assert!(seen.iter().any(|u| u.stage == Stage::BuildingInterface));
}

#[tokio::test]
async fn test_cancel_between_chunks() {
    let paths: Vec<String> = (0..100).map(|i| format!("docs/{}.pdf", i)).collect();
    let refs: Vec<&str> = paths.iter().map(String::as_str).collect();
    let cancel = CancelFlag::new();
    let sink = {
        let cancel = cancel.clone();
        move |u: &ProgressUpdate| {
            if u.stage == Stage::ProcessingEntries && u.percent >= 45.0 {
                cancel.cancel();
            }
        }
    };
    let options = BuildOptionsBuilder::new().build();
    let result = TreeBuilder::new(&options, &ZipDecoder)
        .unwrap()
        .with_progress(&sink)
        .with_cancel(cancel.clone())
        .build_tree(entries(&refs), "x")
        .await;
    assert!(matches!(result, Err(ZiptreeError::Cancelled)));
    assert!(cancel.is_cancelled());
}

#[test]
fn test_chunk_size_bounds() {
    let options = BuildOptionsBuilder::new().build();
    assert_eq!(options.chunk_size(0), 10);
    assert_eq!(options.chunk_size(250), 12);
    assert_eq!(options.chunk_size(100_000), 100);
}

#[test]
fn test_decode_rejects_garbage() {
    assert!(matches!(
        decode_zip("bad.zip", b"definitely not a zip".to_vec().into()),
        Err(ZiptreeError::CorruptArchive { .. })
    ));
    assert!(matches!(
        decode_zip("empty.zip", zip_bytes(&[]).into()),
        Err(ZiptreeError::EmptyArchive { .. })
    ));
}
