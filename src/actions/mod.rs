//! File actions module.
//!
//! The [`eliminate`] module decides what happens to a confirmed duplicate
//! and carries it out:
//! - Replacement with a hard link to the kept copy
//! - Deletion
//! - Emission of the equivalent script commands
//!
//! ```no_run
//! use finddupe::actions::{EliminationPolicy, Mode, Remedy};
//!
//! let policy = EliminationPolicy::new(Mode::Eliminate(Remedy::Hardlink))
//!     .with_allow_readonly(false)
//!     .with_link_limit(1023);
//! ```

pub mod eliminate;

pub use eliminate::{
    EliminateError, EliminationPolicy, Mode, Outcome, Remedy, DEFAULT_LINK_LIMIT,
};
