//! Identifier and document-storage plumbing shared by the application crates.

pub mod ids;
pub mod persistence;
pub mod untyped_ids;
