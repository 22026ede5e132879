//! # dirsync engine
//!
//! The reconciliation core: computes and applies the membership and media
//! differences between the directory service and the target system, one
//! configured group at a time.
//!
//! The engine performs no I/O of its own; everything goes through the
//! [`DirectoryClient`](dirsync_core::DirectoryClient) and
//! [`TargetClient`](dirsync_core::TargetClient) capabilities, which makes
//! the whole algorithm testable against in-memory fakes.

pub mod engine;
pub mod summary;

// Re-exports
pub use engine::ReconciliationEngine;
pub use summary::RunSummary;
