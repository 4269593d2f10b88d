use crate::templates::{preview_placeholder, PREVIEW_ENTRY_PATH};
use crate::tree::FileNode;

/// The HTML document the preview frame should render: the entry file's
/// content when it exists and is non-empty, the placeholder page otherwise.
pub fn document(tree: &FileNode) -> &str {
    tree.find_by_path(PREVIEW_ENTRY_PATH)
        .and_then(FileNode::content)
        .filter(|c| !c.trim().is_empty())
        .unwrap_or(preview_placeholder())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_entry_document() {
        let tree = FileNode::root()
            .update_content(PREVIEW_ENTRY_PATH, "<h1>Hi</h1>")
            .unwrap();
        assert_eq!(document(&tree), "<h1>Hi</h1>");
    }

    #[test]
    fn falls_back_to_placeholder() {
        assert_eq!(document(&FileNode::root()), preview_placeholder());

        let blank = FileNode::root().update_content(PREVIEW_ENTRY_PATH, "  ").unwrap();
        assert_eq!(document(&blank), preview_placeholder());
    }
}
