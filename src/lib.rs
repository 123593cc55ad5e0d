//! Roki: page-oriented wiki publisher
//!
//! Pages, their revisions and their attachments live on a virtual
//! filesystem, either a local directory or a content-addressed remote object
//! store reached over the git-data protocol. A generation pass walks the
//! pages and writes a static site to a second filesystem.

pub mod cli;
pub mod config;
pub mod error;
pub mod fs;
pub mod logging;
pub mod page;
pub mod printer;
pub mod remote;
pub mod render;
pub mod roki;
pub mod theme;
pub mod types;

pub use error::{FsError, RokiError};
pub use fs::{Backend, Entry, Filesystem, SyncOptions, WriteOp};
pub use page::{Attachment, Page, Revision};
pub use roki::Roki;
