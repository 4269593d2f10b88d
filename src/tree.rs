//! Virtual file tree keyed by absolute, slash-delimited paths.
//!
//! Nodes are never mutated in place. [`FileNode::update_content`] returns a new
//! root; only the folders on the way to the changed file are reallocated and
//! every other subtree is shared with the previous tree through `Arc`.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StudioError};

/// Path (and name) of the single root folder.
pub const ROOT_PATH: &str = "/";

/// Most segments a path may have. Keeps recursion shallow and every
/// buildable tree within the JSON nesting limit of a saved snapshot.
pub const MAX_PATH_DEPTH: usize = 32;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileNode {
    path: String,
    name: String,
    #[serde(flatten)]
    kind: NodeKind,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeKind {
    File {
        #[serde(default)]
        content: String,
    },
    Folder {
        #[serde(default)]
        children: Vec<Arc<FileNode>>,
    },
}

impl FileNode {
    /// An empty root folder.
    pub fn root() -> Self {
        Self::folder(ROOT_PATH, ROOT_PATH, Vec::new())
    }

    pub(crate) fn folder(
        path: impl Into<String>,
        name: impl Into<String>,
        children: Vec<FileNode>,
    ) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            kind: NodeKind::Folder {
                children: children.into_iter().map(Arc::new).collect(),
            },
        }
    }

    pub(crate) fn file(
        path: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            kind: NodeKind::File {
                content: content.into(),
            },
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, NodeKind::File { .. })
    }

    pub fn is_folder(&self) -> bool {
        matches!(self.kind, NodeKind::Folder { .. })
    }

    /// File content, or `None` for folders.
    pub fn content(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::File { content } => Some(content),
            NodeKind::Folder { .. } => None,
        }
    }

    /// Children in display order. Empty for files.
    pub fn children(&self) -> &[Arc<FileNode>] {
        match &self.kind {
            NodeKind::Folder { children } => children,
            NodeKind::File { .. } => &[],
        }
    }

    /// Depth-first search for the node whose path equals `path`.
    ///
    /// A missing path is a normal outcome, not an error.
    pub fn find_by_path(&self, path: &str) -> Option<&FileNode> {
        if self.path == path {
            return Some(self);
        }
        self.children()
            .iter()
            .find_map(|child| child.find_by_path(path))
    }

    /// Every node reachable from `self` in pre-order, folders before their
    /// children and children in stored order.
    pub fn flatten(&self) -> Vec<&FileNode> {
        let mut out = Vec::new();
        self.collect_pre_order(&mut out);
        out
    }

    fn collect_pre_order<'a>(&'a self, out: &mut Vec<&'a FileNode>) {
        out.push(self);
        for child in self.children() {
            child.collect_pre_order(out);
        }
    }

    /// Write `content` to the file at `path`, creating any missing folders on
    /// the way. Returns the new root; `self` is left untouched.
    ///
    /// Fails with `InvalidPath` for malformed paths and with `PathConflict`
    /// when a segment names a file where a folder is needed or the reverse.
    pub fn update_content(&self, path: &str, content: impl Into<String>) -> Result<FileNode> {
        let segments = split_path(path)?;
        upsert(self, &segments, content.into())
    }

    /// Check the structural invariants of a tree loaded from outside, such as
    /// a persisted snapshot.
    pub fn validate(&self) -> Result<()> {
        if self.path != ROOT_PATH || self.name != ROOT_PATH || !self.is_folder() {
            return Err(StudioError::InvalidPath(self.path.clone()));
        }
        validate_children(self, 1)
    }
}

fn validate_children(folder: &FileNode, depth: usize) -> Result<()> {
    let mut seen = HashSet::new();
    for child in folder.children() {
        if depth > MAX_PATH_DEPTH {
            return Err(StudioError::InvalidPath(child.path.clone()));
        }
        let bad_name = child.name.is_empty()
            || child.name.contains('/')
            || child.name == "."
            || child.name == "..";
        if bad_name || child.path != join_path(&folder.path, &child.name) {
            return Err(StudioError::InvalidPath(child.path.clone()));
        }
        if !seen.insert(child.name.as_str()) {
            return Err(StudioError::Custom(format!(
                "Duplicate entry {} in tree snapshot",
                child.path
            )));
        }
        validate_children(child, depth + 1)?;
    }
    Ok(())
}

/// Split an absolute path into its segments, rejecting anything that cannot
/// name a file below the root.
pub fn split_path(path: &str) -> Result<Vec<&str>> {
    let invalid = || StudioError::InvalidPath(path.to_string());
    let rest = path.strip_prefix('/').ok_or_else(invalid)?;
    if rest.is_empty() {
        return Err(invalid());
    }
    let segments: Vec<&str> = rest.split('/').take(MAX_PATH_DEPTH + 1).collect();
    if segments.len() > MAX_PATH_DEPTH
        || segments
            .iter()
            .any(|s| s.is_empty() || *s == "." || *s == "..")
    {
        return Err(invalid());
    }
    Ok(segments)
}

/// Path of the child `name` under the folder at `parent`.
pub fn join_path(parent: &str, name: &str) -> String {
    if parent == ROOT_PATH {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}

fn conflict(path: &str, expected: &'static str, found: &'static str) -> StudioError {
    StudioError::PathConflict {
        path: path.to_string(),
        expected,
        found,
    }
}

fn upsert(folder: &FileNode, segments: &[&str], content: String) -> Result<FileNode> {
    let children = match &folder.kind {
        NodeKind::Folder { children } => children,
        NodeKind::File { .. } => return Err(conflict(&folder.path, "folder", "file")),
    };
    let Some((name, rest)) = segments.split_first() else {
        return Err(StudioError::InvalidPath(folder.path.clone()));
    };

    let child_path = join_path(&folder.path, name);
    let existing = children.iter().position(|c| c.name == *name);

    let replacement = if rest.is_empty() {
        if existing.is_some_and(|i| children[i].is_folder()) {
            return Err(conflict(&child_path, "file", "folder"));
        }
        FileNode::file(child_path, *name, content)
    } else {
        match existing {
            Some(i) => upsert(&children[i], rest, content)?,
            None => upsert(&FileNode::folder(child_path, *name, Vec::new()), rest, content)?,
        }
    };

    let mut children = children.clone();
    match existing {
        Some(i) => children[i] = Arc::new(replacement),
        None => children.push(Arc::new(replacement)),
    }
    Ok(FileNode {
        path: folder.path.clone(),
        name: folder.name.clone(),
        kind: NodeKind::Folder { children },
    })
}
