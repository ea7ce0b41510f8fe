//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Signature-keyed grouping of probed files ([`groups`])
//! - Byte-exact verification of signature matches ([`verify`])
//! - The single-pass scan loop and its counters ([`finder`])
//! - Reporting of existing hard-link clusters ([`hardlinks`])

pub mod finder;
pub mod groups;
pub mod hardlinks;
pub mod verify;

pub use finder::{EngineConfig, FinderError, ScanReport, ScanSession, ScanSummary, Source};
pub use groups::{FileRecord, GroupKey, Placement, RecordId, Resolution, SignatureIndex};
pub use hardlinks::{collect_hardlink_groups, HardlinkGroup};
pub use verify::{Verdict, Verifier};
