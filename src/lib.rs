//! CodeStudio: turn a natural-language project description into a virtual
//! file tree via a remote model, then edit, preview, persist and export it.

pub mod config;
pub mod console;
pub mod error;
pub mod export;
pub mod generation;
pub mod interpret;
pub mod logging;
pub mod preview;
pub mod session;
pub mod store;
pub mod templates;
pub mod tree;
pub mod util;

pub use error::{Result, StudioError};
pub use session::{Reply, Session, SessionEvent};
pub use tree::FileNode;
