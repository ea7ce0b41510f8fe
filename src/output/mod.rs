//! Output formatters for scan results.
//!
//! This module provides:
//! - Text and JSON end-of-run summaries ([`summary`])
//! - Batch and POSIX scripts for deferred elimination ([`script`])

pub mod script;
pub mod summary;

pub use script::{ScriptType, ScriptWriter};
pub use summary::{write_hardlink_groups, write_text, JsonReport};
