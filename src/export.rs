use std::io::{Cursor, Seek, Write};
use std::path::Path;

use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::Result;
use crate::tree::FileNode;

/// Archive entry name for a tree path: the root marker is stripped.
fn entry_name(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}

/// Write every non-empty file of `tree` into a zip archive. Folders produce no
/// entries of their own. Returns the number of entries written.
pub fn write_zip<W: Write + Seek>(tree: &FileNode, writer: W) -> Result<usize> {
    let mut zip = ZipWriter::new(writer);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut written = 0;
    for node in tree.flatten() {
        let Some(content) = node.content().filter(|c| !c.is_empty()) else {
            continue;
        };
        zip.start_file(entry_name(node.path()), options)?;
        zip.write_all(content.as_bytes())?;
        written += 1;
    }
    zip.finish()?;

    debug!(entries = written, "wrote project archive");
    Ok(written)
}

pub fn to_bytes(tree: &FileNode) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    write_zip(tree, &mut cursor)?;
    Ok(cursor.into_inner())
}

pub fn to_file(tree: &FileNode, path: &Path) -> Result<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    write_zip(tree, file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    fn read_entries(bytes: Vec<u8>) -> Vec<(String, String)> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        (0..archive.len())
            .map(|i| {
                let mut entry = archive.by_index(i).unwrap();
                let mut content = String::new();
                entry.read_to_string(&mut content).unwrap();
                (entry.name().to_string(), content)
            })
            .collect()
    }

    #[test]
    fn exports_files_with_root_marker_stripped() {
        let tree = FileNode::root()
            .update_content("/src/index.html", "<h1>Hi</h1>")
            .unwrap()
            .update_content("/src/App.tsx", "export default 1;")
            .unwrap();

        let entries = read_entries(to_bytes(&tree).unwrap());
        assert_eq!(
            entries,
            [
                ("src/index.html".to_string(), "<h1>Hi</h1>".to_string()),
                ("src/App.tsx".to_string(), "export default 1;".to_string()),
            ]
        );
    }

    #[test]
    fn skips_empty_files_and_bare_folders() {
        let tree = FileNode::root()
            .update_content("/empty/blank.txt", "")
            .unwrap()
            .update_content("/notes.md", "n")
            .unwrap();

        let entries = read_entries(to_bytes(&tree).unwrap());
        assert_eq!(entries, [("notes.md".to_string(), "n".to_string())]);
    }

    #[test]
    fn writes_archive_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out").join("project.zip");
        let tree = FileNode::root().update_content("/a.txt", "a").unwrap();

        assert_eq!(to_file(&tree, &out).unwrap(), 1);
        assert_eq!(read_entries(std::fs::read(&out).unwrap()).len(), 1);
    }
}
