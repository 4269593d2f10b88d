//! Classification of raw model output.
//!
//! Text that decodes as a JSON object with a `files` array is a file set;
//! anything else, malformed JSON included, is a plain chat reply.

use serde_json::Value;

use crate::tree::FileNode;

/// Reply shown when a file set carries no description.
pub const DEFAULT_REPLY: &str = "Project generated successfully! Check the preview and code tabs.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedFile {
    pub path: String,
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileSet {
    pub files: Vec<GeneratedFile>,
    pub description: Option<String>,
    /// Entries of the `files` array without a string `path` and `content`.
    pub skipped: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Interpretation {
    FileSet(FileSet),
    PlainText(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RejectedFile {
    pub path: String,
    pub reason: String,
}

/// Result of folding a file set into a tree.
#[derive(Clone, Debug)]
pub struct AppliedFiles {
    pub tree: FileNode,
    pub written: Vec<String>,
    pub rejected: Vec<RejectedFile>,
}

pub fn classify(raw: &str) -> Interpretation {
    let plain = || Interpretation::PlainText(raw.to_string());

    let Ok(value) = serde_json::from_str::<Value>(raw) else {
        return plain();
    };
    let Some(entries) = value.get("files").and_then(Value::as_array) else {
        return plain();
    };

    let mut files = Vec::with_capacity(entries.len());
    let mut skipped = 0;
    for entry in entries {
        match (entry["path"].as_str(), entry["content"].as_str()) {
            (Some(path), Some(content)) => files.push(GeneratedFile {
                path: path.to_string(),
                content: content.to_string(),
            }),
            _ => skipped += 1,
        }
    }

    let description = value["description"]
        .as_str()
        .filter(|d| !d.trim().is_empty())
        .map(str::to_string);

    Interpretation::FileSet(FileSet {
        files,
        description,
        skipped,
    })
}

impl FileSet {
    pub fn reply_text(&self) -> &str {
        self.description.as_deref().unwrap_or(DEFAULT_REPLY)
    }

    /// Write every file into `tree` in order, so a later entry for the same
    /// path wins. An entry the tree refuses is recorded and skipped; the rest
    /// still apply.
    pub fn apply(&self, tree: &FileNode) -> AppliedFiles {
        let mut current = tree.clone();
        let mut written = Vec::with_capacity(self.files.len());
        let mut rejected = Vec::new();

        for file in &self.files {
            match current.update_content(&file.path, file.content.as_str()) {
                Ok(next) => {
                    current = next;
                    written.push(file.path.clone());
                }
                Err(e) => rejected.push(RejectedFile {
                    path: file.path.clone(),
                    reason: e.to_string(),
                }),
            }
        }

        AppliedFiles {
            tree: current,
            written,
            rejected,
        }
    }
}
