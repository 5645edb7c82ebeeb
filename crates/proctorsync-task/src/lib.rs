//! proctorsync Task Library
//!
//! Building blocks for the reconciliation task:
//! - Remote proctoring API client (participant fetch, session close)
//! - Host platform collaborator traits and their SQLite-backed implementation
//! - Status-change notification dispatch
//! - The completion-state reconciliation engine

pub mod host;
pub mod notify;
pub mod remote;
pub mod sync;
