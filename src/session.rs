//! Session controller: the only writer of session state.
//!
//! Views read through the accessors and learn about changes from
//! [`Session::subscribe`]. At most one generation is in flight; a second
//! `send_message` meanwhile is refused with [`StudioError::Busy`].

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info};

use crate::config::Theme;
use crate::console::{ConsoleEntry, ConsoleLog};
use crate::error::{Result, StudioError};
use crate::export;
use crate::generation::{GenerationRequest, Generator, PriorMessage, Role};
use crate::interpret::{classify, Interpretation, RejectedFile};
use crate::preview;
use crate::store::StudioStore;
use crate::templates::default_file_system;
use crate::tree::FileNode;

const EVENT_CAPACITY: usize = 64;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// Apologies for failed generations; never sent back as history.
    #[serde(default)]
    pub is_error: bool,
}

impl ChatMessage {
    fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into(), is_error: false }
    }

    fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into(), is_error: false }
    }

    fn apology(error: &str) -> Self {
        Self {
            role: Role::Assistant,
            content: format!("Sorry, I encountered an error: {error}"),
            is_error: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "event", content = "data")]
pub enum SessionEvent {
    TreeChanged,
    TranscriptChanged,
    ConsoleChanged,
    GeneratingChanged { generating: bool },
    ThemeChanged { theme: Theme },
    #[serde(rename_all = "camelCase")]
    PreviewRefreshed { refresh_key: u64 },
}

/// What a submitted prompt produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    /// The model returned a file set and it was written to the tree.
    Generated {
        message: String,
        written: Vec<String>,
        rejected: Vec<RejectedFile>,
    },
    /// The model answered in plain text; the tree is unchanged.
    Chat { message: String },
    /// The request failed; the tree is unchanged.
    Failed { message: String },
}

struct SessionState {
    tree: FileNode,
    messages: Vec<ChatMessage>,
    console: ConsoleLog,
    api_key: Option<String>,
    theme: Theme,
    refresh_key: u64,
}

impl SessionState {
    fn history(&self) -> Vec<PriorMessage> {
        self.messages
            .iter()
            .filter(|m| !m.is_error)
            .map(|m| PriorMessage { role: m.role, content: m.content.clone() })
            .collect()
    }

    fn apply_response(&mut self, raw: &str, events: &mut Vec<SessionEvent>) -> Reply {
        match classify(raw) {
            Interpretation::FileSet(set) => {
                for file in &set.files {
                    self.console.info(format!("Creating file: {}", file.path));
                }
                if set.skipped > 0 {
                    self.console
                        .warning(format!("Skipped {} malformed file entries", set.skipped));
                }

                // Applied to the tree as it is now, so edits made while the
                // request was in flight survive.
                let applied = set.apply(&self.tree);
                for rejected in &applied.rejected {
                    self.console
                        .warning(format!("Rejected {}: {}", rejected.path, rejected.reason));
                }
                self.tree = applied.tree;

                let message = set.reply_text().to_string();
                self.messages.push(ChatMessage::assistant(message.clone()));
                self.console.success("Project generated successfully");
                info!(
                    written = applied.written.len(),
                    rejected = applied.rejected.len(),
                    "applied generated files"
                );

                if !applied.written.is_empty() {
                    self.refresh_key += 1;
                    events.push(SessionEvent::TreeChanged);
                    events.push(SessionEvent::PreviewRefreshed { refresh_key: self.refresh_key });
                }
                Reply::Generated {
                    message,
                    written: applied.written,
                    rejected: applied.rejected,
                }
            }
            Interpretation::PlainText(text) => {
                self.messages.push(ChatMessage::assistant(text.clone()));
                self.console.warning("Received text response instead of project files");
                Reply::Chat { message: text }
            }
        }
    }
}

/// Clears the in-flight flag however the generation ends.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct Session<G> {
    generator: G,
    store: StudioStore,
    state: Mutex<SessionState>,
    generating: AtomicBool,
    events: broadcast::Sender<SessionEvent>,
}

impl<G: Generator> Session<G> {
    pub fn new(
        generator: G,
        store: StudioStore,
        tree: FileNode,
        api_key: Option<String>,
        theme: Theme,
    ) -> Self {
        Self::with_transcript(generator, store, tree, Vec::new(), api_key, theme)
    }

    fn with_transcript(
        generator: G,
        store: StudioStore,
        tree: FileNode,
        messages: Vec<ChatMessage>,
        api_key: Option<String>,
        theme: Theme,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let mut console = ConsoleLog::default();
        console.info("AI Coding Studio initialized");
        Self {
            generator,
            store,
            state: Mutex::new(SessionState {
                tree,
                messages,
                console,
                api_key,
                theme,
                refresh_key: 0,
            }),
            generating: AtomicBool::new(false),
            events,
        }
    }

    /// Start a session from whatever the store holds, falling back to the
    /// default skeleton, an empty transcript and no credential.
    pub fn open(generator: G, store: StudioStore, theme: Theme) -> Self {
        let tree = store.load_tree().unwrap_or_else(default_file_system);
        let messages = store.load_transcript();
        let api_key = store.load_api_key();
        debug!(
            has_key = api_key.is_some(),
            messages = messages.len(),
            "opening session"
        );
        Self::with_transcript(generator, store, tree, messages, api_key, theme)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn notify(&self, events: impl IntoIterator<Item = SessionEvent>) {
        for event in events {
            // No subscribers is fine.
            let _ = self.events.send(event);
        }
    }

    /// Submit a prompt. Fails without side effects when no credential is set
    /// or another generation is in flight; every other failure is recorded in
    /// the transcript and console and returned as [`Reply::Failed`].
    pub async fn send_message(&self, prompt: &str) -> Result<Reply> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(StudioError::Custom("Prompt is empty".into()));
        }
        let api_key = self
            .state
            .lock()
            .await
            .api_key
            .clone()
            .ok_or(StudioError::MissingApiKey)?;
        let in_flight = InFlight::acquire(&self.generating).ok_or(StudioError::Busy)?;
        self.notify([SessionEvent::GeneratingChanged { generating: true }]);

        let history = {
            let mut state = self.state.lock().await;
            let history = state.history();
            state.messages.push(ChatMessage::user(prompt));
            state.console.info(format!("User: {prompt}"));
            history
        };
        self.notify([SessionEvent::TranscriptChanged, SessionEvent::ConsoleChanged]);

        let result = self
            .generator
            .generate(GenerationRequest {
                prompt,
                api_key: &api_key,
                prior_messages: &history,
            })
            .await;

        let mut events = vec![SessionEvent::TranscriptChanged, SessionEvent::ConsoleChanged];
        let reply = {
            let mut state = self.state.lock().await;
            match result {
                Ok(raw) => {
                    state.console.success("AI response received");
                    state.apply_response(&raw, &mut events)
                }
                Err(e) => {
                    let message = e.to_string();
                    state.console.error(format!("Generation failed: {message}"));
                    state.messages.push(ChatMessage::apology(&message));
                    Reply::Failed { message }
                }
            }
        };

        drop(in_flight);
        events.push(SessionEvent::GeneratingChanged { generating: false });
        self.notify(events);
        Ok(reply)
    }

    /// Replace the content of one file, creating it (and its folders) if needed.
    pub async fn edit_file(&self, path: &str, content: &str) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            state.tree = state.tree.update_content(path, content)?;
            state.console.info(format!("File modified: {path}"));
        }
        self.notify([SessionEvent::TreeChanged, SessionEvent::ConsoleChanged]);
        Ok(())
    }

    /// Persist the current tree and transcript.
    pub async fn save(&self) -> Result<()> {
        let result = {
            let mut state = self.state.lock().await;
            let result = self
                .store
                .save_tree(&state.tree)
                .and_then(|()| self.store.save_transcript(&state.messages));
            match &result {
                Ok(()) => state.console.success("Progress saved to local storage"),
                Err(e) => state.console.error(format!("Save failed: {e}")),
            }
            result
        };
        self.notify([SessionEvent::ConsoleChanged]);
        result
    }

    /// Set the credential. A blank key clears it for this session only.
    pub async fn set_api_key(&self, key: &str) -> Result<()> {
        let key = key.trim();
        if !key.is_empty() {
            self.store.save_api_key(key)?;
        }
        self.state.lock().await.api_key = (!key.is_empty()).then(|| key.to_string());
        Ok(())
    }

    pub async fn has_api_key(&self) -> bool {
        self.state.lock().await.api_key.is_some()
    }

    pub async fn toggle_theme(&self) -> Theme {
        let theme = {
            let mut state = self.state.lock().await;
            state.theme = state.theme.toggled();
            state.theme
        };
        self.notify([SessionEvent::ThemeChanged { theme }]);
        theme
    }

    /// Bump the refresh counter so the preview re-renders.
    pub async fn refresh_preview(&self) -> u64 {
        let refresh_key = {
            let mut state = self.state.lock().await;
            state.refresh_key += 1;
            state.console.info("Preview refreshed");
            state.refresh_key
        };
        self.notify([
            SessionEvent::PreviewRefreshed { refresh_key },
            SessionEvent::ConsoleChanged,
        ]);
        refresh_key
    }

    /// Write the project as a zip archive at `path`.
    pub async fn export_zip(&self, path: &Path) -> Result<usize> {
        let tree = self.tree().await;
        let entries = export::to_file(&tree, path)?;
        self.state
            .lock()
            .await
            .console
            .success(format!("Project exported to {}", path.display()));
        self.notify([SessionEvent::ConsoleChanged]);
        Ok(entries)
    }

    pub async fn clear_console(&self) {
        self.state.lock().await.console.clear();
        self.notify([SessionEvent::ConsoleChanged]);
    }

    /// Snapshot of the tree. Cheap: subtrees are shared.
    pub async fn tree(&self) -> FileNode {
        self.state.lock().await.tree.clone()
    }

    pub async fn find(&self, path: &str) -> Option<FileNode> {
        self.state.lock().await.tree.find_by_path(path).cloned()
    }

    pub async fn preview_document(&self) -> String {
        preview::document(&self.state.lock().await.tree).to_string()
    }

    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.state.lock().await.messages.clone()
    }

    pub async fn console(&self) -> Vec<ConsoleEntry> {
        self.state.lock().await.console.entries().to_vec()
    }

    pub async fn theme(&self) -> Theme {
        self.state.lock().await.theme
    }

    pub async fn refresh_key(&self) -> u64 {
        self.state.lock().await.refresh_key
    }

    pub fn is_generating(&self) -> bool {
        self.generating.load(Ordering::SeqCst)
    }
}
