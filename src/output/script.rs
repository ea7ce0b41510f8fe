//! Script generation for deferred elimination.
//!
//! Instead of touching the filesystem, script mode writes the commands that
//! would carry out each elimination so they can be reviewed and run later.
//!
//! # Formats
//!
//! * **Batch** (`.bat`): `del`, `fsutil hardlink create`, `attrib +r`.
//!   `%` is doubled so paths survive `cmd.exe` variable expansion.
//! * **Posix** (`sh`): `rm -f`, `ln`, `chmod a-w`, single-quoted paths.
//!
//! # Usage
//!
//! ```
//! use finddupe::output::script::{ScriptType, ScriptWriter};
//! use std::path::Path;
//!
//! let mut script = ScriptWriter::new(Vec::new(), ScriptType::Posix);
//! script.write_header().unwrap();
//! script
//!     .link(Path::new("/photos/a.jpg"), Path::new("/photos/copy of a.jpg"), false)
//!     .unwrap();
//! let text = String::from_utf8(script.finish().unwrap()).unwrap();
//! assert!(text.contains("ln '/photos/a.jpg' '/photos/copy of a.jpg'"));
//! ```

use std::io::{self, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Type of script to generate.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ScriptType {
    /// Windows batch file for `cmd.exe`
    Batch,
    /// POSIX-compliant shell script (sh/bash/zsh)
    Posix,
}

impl Default for ScriptType {
    fn default() -> Self {
        Self::detect()
    }
}

impl ScriptType {
    /// Detect the appropriate script type for the current platform.
    #[must_use]
    pub fn detect() -> Self {
        if cfg!(windows) {
            Self::Batch
        } else {
            Self::Posix
        }
    }
}

/// Streaming writer of elimination commands.
#[derive(Debug)]
pub struct ScriptWriter<W: Write> {
    out: W,
    script_type: ScriptType,
    commands: usize,
}

impl<W: Write> ScriptWriter<W> {
    /// Wrap `out`; nothing is written until [`write_header`](Self::write_header).
    pub fn new(out: W, script_type: ScriptType) -> Self {
        Self {
            out,
            script_type,
            commands: 0,
        }
    }

    /// Format being written.
    #[must_use]
    pub fn script_type(&self) -> ScriptType {
        self.script_type
    }

    /// Number of eliminations written so far.
    #[must_use]
    pub fn commands(&self) -> usize {
        self.commands
    }

    /// Write the script preamble.
    ///
    /// # Errors
    ///
    /// Propagates write failures.
    pub fn write_header(&mut self) -> io::Result<()> {
        let generated = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        match self.script_type {
            ScriptType::Batch => {
                writeln!(self.out, "@echo off")?;
                writeln!(self.out, "REM Batch file for replacing duplicates with hard links")?;
                writeln!(self.out, "REM created by finddupe on {}", generated)?;
            }
            ScriptType::Posix => {
                writeln!(self.out, "#!/bin/sh")?;
                writeln!(self.out, "# Script for replacing duplicates with hard links")?;
                writeln!(self.out, "# created by finddupe on {}", generated)?;
            }
        }
        writeln!(self.out)
    }

    /// Emit the removal of `duplicate`, noting the copy that is kept.
    ///
    /// Returns `false`, writing nothing, when either path is not valid
    /// UTF-8 and so cannot be quoted faithfully.
    ///
    /// # Errors
    ///
    /// Propagates write failures.
    pub fn delete(&mut self, kept: &Path, duplicate: &Path, readonly: bool) -> io::Result<bool> {
        let (Some(dup), Some(existing)) = (self.quote(duplicate), self.quote(kept)) else {
            return Ok(false);
        };
        self.write_remove(&dup, readonly)?;
        match self.script_type {
            ScriptType::Batch => writeln!(self.out, "rem duplicate of {}", existing)?,
            ScriptType::Posix => writeln!(self.out, "# duplicate of {}", existing)?,
        }
        self.commands += 1;
        Ok(true)
    }

    /// Emit the replacement of `duplicate` by a hard link to `kept`.
    ///
    /// A read-only `duplicate` gets its read-only state back after relinking.
    /// Returns `false` like [`delete`](Self::delete) for unquotable paths.
    ///
    /// # Errors
    ///
    /// Propagates write failures.
    pub fn link(&mut self, kept: &Path, duplicate: &Path, readonly: bool) -> io::Result<bool> {
        let (Some(new), Some(existing)) = (self.quote(duplicate), self.quote(kept)) else {
            return Ok(false);
        };
        self.write_remove(&new, readonly)?;
        match self.script_type {
            ScriptType::Batch => {
                writeln!(self.out, "fsutil hardlink create {} {}", new, existing)?;
                if readonly {
                    writeln!(self.out, "attrib +r {}", new)?;
                }
            }
            ScriptType::Posix => {
                writeln!(self.out, "ln {} {}", existing, new)?;
                if readonly {
                    writeln!(self.out, "chmod a-w {}", new)?;
                }
            }
        }
        self.commands += 1;
        Ok(true)
    }

    /// Flush and hand back the underlying writer.
    ///
    /// # Errors
    ///
    /// Propagates flush failures.
    pub fn finish(mut self) -> io::Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }

    fn write_remove(&mut self, quoted: &str, readonly: bool) -> io::Result<()> {
        match self.script_type {
            ScriptType::Batch if readonly => writeln!(self.out, "del /F {}", quoted),
            ScriptType::Batch => writeln!(self.out, "del {}", quoted),
            ScriptType::Posix => writeln!(self.out, "rm -f {}", quoted),
        }
    }

    fn quote(&self, path: &Path) -> Option<String> {
        let quoted = match self.script_type {
            ScriptType::Batch => escape_batch(path),
            ScriptType::Posix => escape_posix(path),
        };
        if quoted.is_none() {
            log::warn!(
                "Leaving '{}' out of the script: path is not valid UTF-8",
                path.display()
            );
        }
        quoted
    }
}

fn escape_batch(path: &Path) -> Option<String> {
    let s = path.to_str()?;
    // Double-quoted; a literal % must be written as %% in a batch file
    Some(format!("\"{}\"", s.replace('%', "%%")))
}

fn escape_posix(path: &Path) -> Option<String> {
    let s = path.to_str()?;
    // Wrap in single quotes, escape single quotes as '\''
    Some(format!("'{}'", s.replace('\'', "'\\''")))
}
